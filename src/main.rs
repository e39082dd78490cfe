//! CLI entry point for the political ads report.
//!
//! Provides subcommands for producing the campaign comparison report, listing
//! the campaigns present in a dataset, and previewing one campaign's ads with
//! their derived fields.

use ads_report::analyzers::aggregate::count_campaigns;
use ads_report::config::ReportConfig;
use ads_report::loader::{DatasetSource, load_dataset};
use ads_report::output::{PreviewRow, print_table};
use ads_report::pipeline::{RunOptions, run_report};
use ads_report::publish::upload_artifacts;
use ads_report::render::ChartFormat;
use ads_report::transform::prepare_campaign;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ads_report")]
#[command(about = "Compare political ad campaigns by frequency, spend, reach and wording", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Directory or file of JSON ad records, or an http(s) URL to one file
    #[arg(value_name = "PATH_OR_URL")]
    source: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate each campaign, print previews, write tables, report and charts
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory to write report.json, CSV tables and charts into
        #[arg(short = 'd', long, default_value = "report")]
        output_dir: PathBuf,

        /// JSON file with report settings; flags below override it
        #[arg(long)]
        config: Option<String>,

        /// Campaign (page name) to include; repeat for several
        #[arg(short, long = "campaign")]
        campaigns: Vec<String>,

        /// Number of most frequent words kept per campaign
        #[arg(long)]
        top_words: Option<usize>,

        /// Number of ads kept in the max-spend table
        #[arg(long)]
        max_spend_limit: Option<usize>,

        /// Chart resolution in dots per inch (1-1200)
        #[arg(long)]
        dpi: Option<u32>,

        /// Chart image format
        #[arg(short, long, value_enum, default_value_t = ChartFormat::Png)]
        format: ChartFormat,

        /// Skip chart rendering
        #[arg(long, default_value_t = false)]
        no_charts: bool,

        /// Do not print table previews to stdout
        #[arg(short, long, default_value_t = false)]
        quiet: bool,

        /// Optional: S3 bucket to upload the report artifacts to
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Key prefix for uploaded artifacts
        #[arg(long, default_value = "")]
        s3_prefix: String,

        /// Gzip compress artifacts before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List page names in the dataset with their ad counts
    Campaigns {
        #[command(flatten)]
        source: SourceArgs,

        /// Maximum number of page names to print
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Preview one campaign's ads with their derived date, spend and period
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Campaign (page name) to preview
        #[arg(short, long)]
        campaign: String,

        /// Number of rows to print
        #[arg(short = 'n', long, default_value_t = 20)]
        rows: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;

    let cli = Cli::parse();
    let token = std::env::var("ADS_DATASET_TOKEN").ok();

    match cli.command {
        Commands::Report {
            source,
            output_dir,
            config,
            campaigns,
            top_words,
            max_spend_limit,
            dpi,
            format,
            no_charts,
            quiet,
            s3_bucket,
            s3_prefix,
            gzip,
        } => {
            let mut report_config = match config {
                Some(path) => ReportConfig::load(&path)?,
                None => ReportConfig::default(),
            };
            if !campaigns.is_empty() {
                report_config.campaigns = campaigns;
            }
            if let Some(limit) = top_words {
                report_config.top_words_limit = limit;
            }
            if let Some(limit) = max_spend_limit {
                report_config.max_spend_limit = limit;
            }
            if let Some(dpi) = dpi {
                report_config.dpi = dpi;
            }
            report_config.validate()?;

            let source = DatasetSource::parse(&source.source);
            let dataset = load_dataset(&source, token.as_deref()).await?;

            let options = RunOptions {
                output_dir,
                charts: (!no_charts).then_some(format),
                print_previews: !quiet,
            };
            let run = run_report(&dataset, &source.to_string(), &report_config, &options)?;

            match s3_bucket {
                Some(bucket) => {
                    info!(bucket = %bucket, gzip, "S3 upload enabled");
                    let config = aws_config::load_from_env().await;
                    let s3 = aws_sdk_s3::Client::new(&config);
                    upload_artifacts(&s3, &bucket, &s3_prefix, &run.artifacts, gzip).await?;
                }
                None => info!("S3 bucket not specified, skipping upload"),
            }

            info!(
                output_dir = %options.output_dir.display(),
                campaigns = run.report.campaigns.len(),
                "Report complete"
            );
        }
        Commands::Campaigns { source, limit } => {
            let source = DatasetSource::parse(&source.source);
            let dataset = load_dataset(&source, token.as_deref()).await?;
            let counts = count_campaigns(&dataset.records);

            info!(
                total = counts.len(),
                rows = dataset.records.len(),
                "Campaign list computed"
            );
            print_table("campaigns", &counts, limit)?;
        }
        Commands::Inspect {
            source,
            campaign,
            rows,
        } => {
            let source = DatasetSource::parse(&source.source);
            let dataset = load_dataset(&source, token.as_deref()).await?;
            let ads = prepare_campaign(&dataset.records, &campaign);
            if ads.is_empty() {
                warn!(campaign = %campaign, "No ads found for campaign");
            }

            let preview: Vec<PreviewRow> = ads.iter().map(PreviewRow::from).collect();
            print_table(&campaign, &preview, rows)?;
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the program.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ads_report.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ads_report.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}
