//! The report run: aggregate every campaign, print previews, write artifacts
//! and render charts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::analyzer::build_report;
use crate::analyzers::types::ReportDocument;
use crate::config::ReportConfig;
use crate::loader::Dataset;
use crate::output::{print_campaign, write_campaign_tables, write_report_json};
use crate::render::{ChartFormat, render_charts};

/// What a run should emit besides the aggregates themselves.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub output_dir: PathBuf,
    /// `None` skips chart rendering.
    pub charts: Option<ChartFormat>,
    pub print_previews: bool,
}

/// The aggregates of a run and every file it wrote.
#[derive(Debug)]
pub struct RunOutput {
    pub report: ReportDocument,
    pub artifacts: Vec<PathBuf>,
}

/// Aggregates `dataset` per configured campaign and writes the results to
/// `options.output_dir`, creating it if needed.
#[tracing::instrument(skip(dataset, config, options), fields(output_dir = %options.output_dir.display()))]
pub fn run_report(
    dataset: &Dataset,
    source: &str,
    config: &ReportConfig,
    options: &RunOptions,
) -> Result<RunOutput> {
    config.validate()?;
    let report = build_report(dataset, source, config);

    if options.print_previews {
        for campaign in &report.campaigns {
            print_campaign(campaign, config.daily_preview_limit)?;
        }
    }

    let artifacts = write_artifacts(&report, &options.output_dir, options.charts, config)?;
    info!(artifacts = artifacts.len(), "Report written");

    Ok(RunOutput { report, artifacts })
}

fn write_artifacts(
    report: &ReportDocument,
    dir: &Path,
    charts: Option<ChartFormat>,
    config: &ReportConfig,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut artifacts = vec![write_report_json(dir, report)?];
    for campaign in &report.campaigns {
        artifacts.extend(write_campaign_tables(dir, campaign)?);
    }
    if let Some(format) = charts {
        artifacts.extend(render_charts(&report.campaigns, dir, format, config)?);
    }

    Ok(artifacts)
}
