//! Tabular previews and report artifacts.
//!
//! Previews go to stdout as CSV, capped at a row limit. Artifacts are CSV
//! tables per campaign and a `report.json` written into the output directory.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::{
    AgeBandAverage, CampaignCount, CampaignReport, DailyCount, MaxSpend, ReportDocument, WordCount,
};
use crate::transform::PreparedAd;

/// A row type that can be written as a CSV table.
///
/// `HEADERS` lists the serialized field names in declaration order, so an
/// empty table still gets its header line.
pub trait TableRow: Serialize {
    const HEADERS: &'static [&'static str];
}

impl TableRow for DailyCount {
    const HEADERS: &'static [&'static str] = &["date", "count"];
}

impl TableRow for MaxSpend {
    const HEADERS: &'static [&'static str] = &["id", "max_average_spend"];
}

impl TableRow for AgeBandAverage {
    const HEADERS: &'static [&'static str] = &["year_month", "age", "average_percentage"];
}

impl TableRow for WordCount {
    const HEADERS: &'static [&'static str] = &["word", "count"];
}

impl TableRow for CampaignCount {
    const HEADERS: &'static [&'static str] = &["page_name", "ads"];
}

/// Flattened view of a [`PreparedAd`] for previews.
#[derive(Debug, Serialize)]
pub struct PreviewRow<'a> {
    pub id: Option<&'a str>,
    pub date: Option<String>,
    pub spend_midpoint: Option<f64>,
    pub year_month: Option<&'a str>,
    pub demographic_entries: usize,
    pub ad_creative_body: Option<&'a str>,
}

impl TableRow for PreviewRow<'_> {
    const HEADERS: &'static [&'static str] = &[
        "id",
        "date",
        "spend_midpoint",
        "year_month",
        "demographic_entries",
        "ad_creative_body",
    ];
}

impl<'a> From<&'a PreparedAd> for PreviewRow<'a> {
    fn from(ad: &'a PreparedAd) -> Self {
        Self {
            id: ad.id.as_deref(),
            date: ad.date.map(|d| d.to_string()),
            spend_midpoint: ad.spend_midpoint,
            year_month: ad.year_month.as_deref(),
            demographic_entries: ad.demographics.len(),
            ad_creative_body: ad.body.as_deref(),
        }
    }
}

/// Serializes at most `limit` rows as CSV (with a header) into `writer`.
pub fn write_table<W: Write, T: TableRow>(writer: W, rows: &[T], limit: usize) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(T::HEADERS)?;
    for row in rows.iter().take(limit) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints a titled preview of `rows` to stdout.
pub fn print_table<T: TableRow>(title: &str, rows: &[T], limit: usize) -> Result<()> {
    info!(table = title, rows = rows.len(), shown = rows.len().min(limit), "Table preview");
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "# {title}")?;
    write_table(&mut handle, rows, limit)?;
    writeln!(handle)?;
    Ok(())
}

/// Prints every table of a campaign report.
pub fn print_campaign(report: &CampaignReport, daily_limit: usize) -> Result<()> {
    let name = &report.campaign;
    print_table(&format!("{name}: ads per day"), &report.daily_counts, daily_limit)?;
    print_table(&format!("{name}: max average spend"), &report.max_spend, report.max_spend.len())?;
    print_table(
        &format!("{name}: average percentage by age"),
        &report.demographics,
        report.demographics.len(),
    )?;
    print_table(&format!("{name}: top words"), &report.top_words, report.top_words.len())?;
    Ok(())
}

/// Lower-case file-name form of a campaign name: runs of characters other
/// than ASCII letters and digits collapse to a single `_`.
pub fn campaign_slug(campaign: &str) -> String {
    let mut slug = String::with_capacity(campaign.len());
    for c in campaign.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "campaign".to_string()
    } else {
        slug.to_string()
    }
}

/// Writes `rows` to a new CSV file at `path`, replacing any existing file.
pub fn write_csv<T: TableRow>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV table");
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_table(file, rows, rows.len())
}

/// Writes the four tables of `report` as `{slug}_{table}.csv` into `dir`.
pub fn write_campaign_tables(dir: &Path, report: &CampaignReport) -> Result<Vec<PathBuf>> {
    let slug = campaign_slug(&report.campaign);
    let paths = [
        dir.join(format!("{slug}_daily_counts.csv")),
        dir.join(format!("{slug}_max_spend.csv")),
        dir.join(format!("{slug}_demographics.csv")),
        dir.join(format!("{slug}_top_words.csv")),
    ];

    write_csv(&paths[0], &report.daily_counts)?;
    write_csv(&paths[1], &report.max_spend)?;
    write_csv(&paths[2], &report.demographics)?;
    write_csv(&paths[3], &report.top_words)?;

    Ok(paths.to_vec())
}

/// Writes the report as pretty-printed JSON to `dir/report.json`.
pub fn write_report_json(dir: &Path, report: &ReportDocument) -> Result<PathBuf> {
    let path = dir.join("report.json");
    let body = serde_json::to_vec_pretty(report)?;
    fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
