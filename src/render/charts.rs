use anyhow::Result;
use chrono::Duration;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontTransform;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analyzers::types::CampaignReport;
use crate::config::ReportConfig;
use crate::render::prepare::{category_label, date_bounds, figure_size, histogram, pivot_demographics};

/// Image format of rendered charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ChartFormat {
    Png,
    Svg,
}

impl ChartFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ChartFormat::Png => "png",
            ChartFormat::Svg => "svg",
        }
    }
}

/// The comparison charts of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    DailyCounts,
    MaxSpendHistogram,
    Demographics,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::DailyCounts,
        ChartKind::MaxSpendHistogram,
        ChartKind::Demographics,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::DailyCounts => "daily_counts",
            ChartKind::MaxSpendHistogram => "max_spend_histogram",
            ChartKind::Demographics => "demographics",
        }
    }

    /// Figure size in inches.
    pub fn figure_inches(self) -> (f64, f64) {
        match self {
            ChartKind::DailyCounts => (10.0, 6.0),
            ChartKind::MaxSpendHistogram => (12.0, 6.0),
            ChartKind::Demographics => (16.0, 6.0),
        }
    }
}

/// Font and spacing sizes scaled from a 100 DPI baseline.
#[derive(Clone, Copy)]
struct Scale(f64);

impl Scale {
    fn font(self, size: f64) -> f64 {
        size * self.0
    }

    fn px(self, size: u32) -> u32 {
        (size as f64 * self.0).round() as u32
    }
}

/// Renders every chart into `dir` and returns the written paths.
#[tracing::instrument(skip(reports, dir, config), fields(dir = %dir.display()))]
pub fn render_charts(
    reports: &[CampaignReport],
    dir: &Path,
    format: ChartFormat,
    config: &ReportConfig,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(ChartKind::ALL.len());

    for kind in ChartKind::ALL {
        let path = dir.join(format!("{}.{}", kind.file_stem(), format.extension()));
        let size = figure_size(kind.figure_inches(), config.dpi);
        match format {
            ChartFormat::Png => draw(kind, BitMapBackend::new(&path, size).into_drawing_area(), reports, config)?,
            ChartFormat::Svg => draw(kind, SVGBackend::new(&path, size).into_drawing_area(), reports, config)?,
        }
        info!(chart = kind.file_stem(), path = %path.display(), width = size.0, height = size.1, "Chart rendered");
        written.push(path);
    }

    Ok(written)
}

fn draw<DB: DrawingBackend>(
    kind: ChartKind,
    root: DrawingArea<DB, Shift>,
    reports: &[CampaignReport],
    config: &ReportConfig,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let scale = Scale(config.dpi as f64 / 100.0);
    root.fill(&WHITE)?;
    match kind {
        ChartKind::DailyCounts => draw_daily_counts(&root, reports, scale)?,
        ChartKind::MaxSpendHistogram => draw_spend_histograms(&root, reports, config.histogram_bins, scale)?,
        ChartKind::Demographics => draw_demographics(&root, reports, scale)?,
    }
    root.present()?;
    Ok(())
}

/// One line per campaign of ads started per day, on a shared date axis.
fn draw_daily_counts<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reports: &[CampaignReport],
    scale: Scale,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let bounds = date_bounds(reports.iter().map(|r| r.daily_counts.as_slice()));
    let first = bounds.map(|(lo, _)| lo).unwrap_or_default();
    let span = bounds.map_or(1, |(lo, hi)| (hi - lo).num_days().max(1)) as f64;
    let max_count = reports
        .iter()
        .flat_map(|r| r.daily_counts.iter().map(|d| d.count))
        .max()
        .unwrap_or(1)
        .max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(
            "Frequencies of advertisements in the pre-election period",
            ("sans-serif", scale.font(20.0)).into_font(),
        )
        .margin(scale.px(10))
        .x_label_area_size(scale.px(40))
        .y_label_area_size(scale.px(60))
        .build_cartesian_2d(0f64..span, 0f64..max_count * 1.05)?;

    chart
        .configure_mesh()
        .x_desc("Year-Month")
        .y_desc("Count")
        .x_label_formatter(&|x| (first + Duration::days(x.round() as i64)).format("%Y-%m-%d").to_string())
        .label_style(("sans-serif", scale.font(12.0)).into_font())
        .draw()?;

    for (idx, report) in reports.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        let points = report
            .daily_counts
            .iter()
            .map(|d| ((d.date - first).num_days() as f64, d.count as f64));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))?
            .label(report.campaign.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .label_font(("sans-serif", scale.font(12.0)).into_font())
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// One panel per campaign with the density histogram of its largest spends.
fn draw_spend_histograms<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reports: &[CampaignReport],
    bins: usize,
    scale: Scale,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let root = root.titled(
        "The distribution of the greatest average spends",
        ("sans-serif", scale.font(22.0)).into_font(),
    )?;
    let panels = root.split_evenly((1, reports.len().max(1)));

    for (report, panel) in reports.iter().zip(panels.iter()) {
        let values: Vec<f64> = report.max_spend.iter().map(|r| r.max_average_spend).collect();
        let hist = histogram(&values, bins);
        let (x_range, y_max) = match &hist {
            Some(h) => (h.start()..h.end(), h.max_density() * 1.1),
            None => (0.0..1.0, 1.0),
        };

        let mut chart = ChartBuilder::on(panel)
            .caption(&report.campaign, ("sans-serif", scale.font(16.0)).into_font())
            .margin(scale.px(15))
            .x_label_area_size(scale.px(40))
            .y_label_area_size(scale.px(80))
            .build_cartesian_2d(x_range, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Average Spend in USD")
            .y_desc("Relative Frequency")
            .y_label_formatter(&|y| format!("{y:.5}"))
            .label_style(("sans-serif", scale.font(11.0)).into_font())
            .draw()?;

        if let Some(hist) = hist {
            chart.draw_series(hist.bins.iter().map(|b| {
                Rectangle::new([(b.start, 0.0), (b.end, b.density)], BLUE.mix(0.5).filled())
            }))?;
        }
    }

    Ok(())
}

/// One panel per campaign with a line per age band across months.
fn draw_demographics<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    reports: &[CampaignReport],
    scale: Scale,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let root = root.titled(
        "Average percentage of each age group in the pre-election period",
        ("sans-serif", scale.font(22.0)).into_font(),
    )?;
    let panels = root.split_evenly((1, reports.len().max(1)));

    for (report, panel) in reports.iter().zip(panels.iter()) {
        let pivot = pivot_demographics(&report.demographics);
        let periods = &pivot.periods;
        let x_max = (periods.len().max(2) - 1) as f64;
        let y_max = pivot.max_value().max(0.01) * 1.1;

        let mut chart = ChartBuilder::on(panel)
            .caption(&report.campaign, ("sans-serif", scale.font(16.0)).into_font())
            .margin(scale.px(15))
            .x_label_area_size(scale.px(70))
            .y_label_area_size(scale.px(60))
            .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Year-Month")
            .y_desc("Average Percentage")
            .x_labels(periods.len().max(1))
            .x_label_formatter(&|x| category_label(periods, *x))
            .x_label_style(
                ("sans-serif", scale.font(11.0))
                    .into_font()
                    .transform(FontTransform::Rotate90),
            )
            .y_label_style(("sans-serif", scale.font(11.0)).into_font())
            .draw()?;

        for (idx, (band, values)) in pivot.series.iter().enumerate() {
            let color = Palette99::pick(idx).to_rgba();
            let points = values.iter().enumerate().map(|(i, v)| (i as f64, *v));
            chart
                .draw_series(LineSeries::new(points, color.stroke_width(2)))?
                .label(band.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if !pivot.series.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerLeft)
                .label_font(("sans-serif", scale.font(11.0)).into_font())
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }
    }

    Ok(())
}
