//! Chart-ready shapes of the aggregate tables.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::analyzers::types::{AgeBandAverage, DailyCount};

/// One histogram bar covering `[start, end)` (the last bar also includes `end`).
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
    /// `count / (total * width)`, so bar areas sum to 1.
    pub density: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub bins: Vec<HistogramBin>,
}

impl Histogram {
    pub fn start(&self) -> f64 {
        self.bins.first().map_or(0.0, |b| b.start)
    }

    pub fn end(&self) -> f64 {
        self.bins.last().map_or(1.0, |b| b.end)
    }

    pub fn max_density(&self) -> f64 {
        self.bins.iter().map(|b| b.density).fold(0.0, f64::max)
    }
}

/// Density-normalized histogram of `values` with `bins` equal-width bins over
/// their range. A range of zero width is widened to one unit centered on the
/// value. Returns `None` when there is nothing to plot.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return None;
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in &finite {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let total = finite.len() as f64;
    let bins = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + width * i as f64,
            end: lo + width * (i + 1) as f64,
            count,
            density: count as f64 / (total * width),
        })
        .collect();

    Some(Histogram { bins })
}

/// Average percentages laid out as one series per age band over a shared,
/// lexically ordered list of periods. Missing cells are 0.
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicPivot {
    pub periods: Vec<String>,
    pub series: Vec<(String, Vec<f64>)>,
}

impl DemographicPivot {
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|(_, values)| values.iter().copied())
            .fold(0.0, f64::max)
    }
}

pub fn pivot_demographics(rows: &[AgeBandAverage]) -> DemographicPivot {
    let periods: Vec<String> = rows
        .iter()
        .map(|r| r.year_month.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let position: BTreeMap<&str, usize> = periods
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    let mut by_band: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let values = by_band
            .entry(row.age.clone())
            .or_insert_with(|| vec![0.0; periods.len()]);
        if let Some(&i) = position.get(row.year_month.as_str()) {
            values[i] = row.average_percentage.unwrap_or(0.0);
        }
    }

    DemographicPivot {
        periods,
        series: by_band.into_iter().collect(),
    }
}

/// Earliest and latest date across several daily-count series.
pub fn date_bounds<'a, I>(series: I) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = &'a [DailyCount]>,
{
    let mut bounds: Option<(NaiveDate, NaiveDate)> = None;
    for rows in series {
        for row in rows {
            bounds = Some(match bounds {
                None => (row.date, row.date),
                Some((lo, hi)) => (lo.min(row.date), hi.max(row.date)),
            });
        }
    }
    bounds
}

/// Label for a categorical axis position, empty between categories.
pub fn category_label(categories: &[String], x: f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
        return String::new();
    }
    categories
        .get(rounded as usize)
        .cloned()
        .unwrap_or_default()
}

/// Pixel size of a figure given in inches at `dpi`.
pub fn figure_size(inches: (f64, f64), dpi: u32) -> (u32, u32) {
    (
        (inches.0 * dpi as f64).round() as u32,
        (inches.1 * dpi as f64).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg(year_month: &str, age: &str, pct: f64) -> AgeBandAverage {
        AgeBandAverage {
            year_month: year_month.into(),
            age: age.into(),
            average_percentage: Some(pct),
        }
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0, 10.0];
        let hist = histogram(&values, 5).unwrap();

        assert_eq!(hist.bins.len(), 5);
        assert_eq!(hist.start(), 0.0);
        assert_eq!(hist.end(), 10.0);
        let area: f64 = hist.bins.iter().map(|b| b.density * (b.end - b.start)).sum();
        assert!((area - 1.0).abs() < 1e-9);
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 6);
    }

    #[test]
    fn test_histogram_max_value_lands_in_last_bin() {
        let hist = histogram(&[0.0, 10.0], 2).unwrap();
        assert_eq!(hist.bins[0].count, 1);
        assert_eq!(hist.bins[1].count, 1);
    }

    #[test]
    fn test_histogram_single_value_widens_range() {
        let hist = histogram(&[5.0, 5.0], 50).unwrap();
        assert_eq!(hist.start(), 4.5);
        assert_eq!(hist.end(), 5.5);
        assert_eq!(hist.bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_histogram_empty_is_none() {
        assert!(histogram(&[], 50).is_none());
        assert!(histogram(&[1.0], 0).is_none());
    }

    #[test]
    fn test_pivot_fills_missing_with_zero() {
        let rows = vec![
            avg("2020-10", "18-24", 0.1),
            avg("2020-9", "18-24", 0.2),
            avg("2020-9", "65+", 0.3),
        ];
        let pivot = pivot_demographics(&rows);

        assert_eq!(pivot.periods, vec!["2020-10", "2020-9"]);
        assert_eq!(
            pivot.series,
            vec![
                ("18-24".to_string(), vec![0.1, 0.2]),
                ("65+".to_string(), vec![0.0, 0.3]),
            ]
        );
        assert_eq!(pivot.max_value(), 0.3);
    }

    #[test]
    fn test_pivot_null_average_plots_as_zero() {
        let rows = vec![
            avg("2020-9", "18-24", 0.2),
            AgeBandAverage {
                year_month: "2020-9".into(),
                age: "25-34".into(),
                average_percentage: None,
            },
        ];
        let pivot = pivot_demographics(&rows);
        assert_eq!(pivot.series[1], ("25-34".to_string(), vec![0.0]));
    }

    #[test]
    fn test_date_bounds() {
        let a = vec![DailyCount { date: NaiveDate::from_ymd_opt(2020, 9, 3).unwrap(), count: 1 }];
        let b = vec![
            DailyCount { date: NaiveDate::from_ymd_opt(2020, 8, 1).unwrap(), count: 2 },
            DailyCount { date: NaiveDate::from_ymd_opt(2020, 9, 1).unwrap(), count: 2 },
        ];
        let bounds = date_bounds([a.as_slice(), b.as_slice()]).unwrap();
        assert_eq!(bounds.0, NaiveDate::from_ymd_opt(2020, 8, 1).unwrap());
        assert_eq!(bounds.1, NaiveDate::from_ymd_opt(2020, 9, 3).unwrap());
        assert!(date_bounds(std::iter::empty()).is_none());
    }

    #[test]
    fn test_category_label() {
        let cats = vec!["2020-10".to_string(), "2020-9".to_string()];
        assert_eq!(category_label(&cats, 0.0), "2020-10");
        assert_eq!(category_label(&cats, 1.0), "2020-9");
        assert_eq!(category_label(&cats, 0.5), "");
        assert_eq!(category_label(&cats, 5.0), "");
    }

    #[test]
    fn test_figure_size() {
        assert_eq!(figure_size((10.0, 6.0), 100), (1000, 600));
        assert_eq!(figure_size((12.0, 6.0), 600), (7200, 3600));
    }
}
