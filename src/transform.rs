//! Campaign partitioning and the per-row derived fields.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::record::{AdRecord, DemographicEntry, cast_int};

/// An ad of one campaign with its derived date, spend midpoint and
/// year-month key. Derived fields are `None` when their cast fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedAd {
    pub id: Option<String>,
    pub date: Option<NaiveDate>,
    pub spend_midpoint: Option<f64>,
    pub year_month: Option<String>,
    pub body: Option<String>,
    pub demographics: Vec<DemographicEntry>,
}

/// Returns the records whose page name equals `campaign` exactly.
pub fn filter_campaign<'a>(records: &'a [AdRecord], campaign: &str) -> Vec<&'a AdRecord> {
    records
        .iter()
        .filter(|r| r.campaign() == Some(campaign))
        .collect()
}

/// Derives the normalized fields of a single record.
pub fn prepare(record: &AdRecord) -> PreparedAd {
    let date = record
        .ad_delivery_start_time
        .as_deref()
        .and_then(parse_delivery_date);

    let spend_midpoint = record.spend.as_ref().and_then(|s| {
        spend_midpoint(s.lower_bound.as_deref()?, s.upper_bound.as_deref()?)
    });

    PreparedAd {
        id: record.id.clone(),
        date,
        spend_midpoint,
        year_month: date.map(year_month_key),
        body: record.ad_creative_body.clone(),
        demographics: record.demographic_distribution.clone().unwrap_or_default(),
    }
}

/// Filters `records` to `campaign` and derives the normalized fields.
pub fn prepare_campaign(records: &[AdRecord], campaign: &str) -> Vec<PreparedAd> {
    filter_campaign(records, campaign)
        .into_iter()
        .map(prepare)
        .collect()
}

/// Truncates a delivery timestamp to its calendar date.
///
/// The date is taken as written, in the timestamp's own offset. Accepts plain
/// dates, RFC 3339, ISO 8601 with a compact offset (`+0000`), and naive
/// date-times with a `T` or space separator.
pub fn parse_delivery_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.date_naive());
        }
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// `(lower + upper) / 2` with both bounds cast to integers.
///
/// Returns `None` if either bound is not numeric.
pub fn spend_midpoint(lower: &str, upper: &str) -> Option<f64> {
    let lower = cast_int(lower)?;
    let upper = cast_int(upper)?;
    Some((lower as f64 + upper as f64) / 2.0)
}

/// `"{year}-{month}"` without zero padding, e.g. `"2020-9"`.
pub fn year_month_key(date: NaiveDate) -> String {
    format!("{}-{}", date.year(), date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SpendRange;

    fn ad(page: &str, start: &str, lower: &str, upper: &str) -> AdRecord {
        AdRecord {
            id: Some("1".to_string()),
            page_name: Some(page.to_string()),
            ad_delivery_start_time: Some(start.to_string()),
            spend: Some(SpendRange {
                lower_bound: Some(lower.to_string()),
                upper_bound: Some(upper.to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_is_exact_and_case_sensitive() {
        let records = vec![
            ad("Joe Biden", "2020-09-01", "0", "99"),
            ad("joe biden", "2020-09-01", "0", "99"),
            ad("Joe Biden ", "2020-09-01", "0", "99"),
            ad("Donald J. Trump", "2020-09-01", "0", "99"),
        ];
        assert_eq!(filter_campaign(&records, "Joe Biden").len(), 1);
        assert_eq!(filter_campaign(&records, "Donald J. Trump").len(), 1);
        assert!(filter_campaign(&records, "Biden").is_empty());
    }

    #[test]
    fn test_spend_midpoint() {
        assert_eq!(spend_midpoint("10", "20"), Some(15.0));
        assert_eq!(spend_midpoint("0", "99"), Some(49.5));
        assert_eq!(spend_midpoint("abc", "20"), None);
        assert_eq!(spend_midpoint("10", ""), None);
        assert_eq!(spend_midpoint("1000", "3000000000"), None);
    }

    #[test]
    fn test_prepare_missing_upper_bound_gives_no_midpoint() {
        let mut record = ad("Joe Biden", "2020-09-01", "1000000", "0");
        record.spend = Some(SpendRange {
            lower_bound: Some("1000000".to_string()),
            upper_bound: None,
        });
        assert_eq!(prepare(&record).spend_midpoint, None);
    }

    #[test]
    fn test_parse_delivery_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 9, 1);
        assert_eq!(parse_delivery_date("2020-09-01"), expected);
        assert_eq!(parse_delivery_date("2020-09-01T23:30:00+0000"), expected);
        assert_eq!(parse_delivery_date("2020-09-01T23:30:00-07:00"), expected);
        assert_eq!(parse_delivery_date("2020-09-01T08:00:00"), expected);
        assert_eq!(parse_delivery_date("2020-09-01 08:00:00"), expected);
        assert_eq!(parse_delivery_date("not a date"), None);
    }

    #[test]
    fn test_year_month_key_has_no_padding() {
        let date = NaiveDate::from_ymd_opt(2020, 9, 30).unwrap();
        assert_eq!(year_month_key(date), "2020-9");
        let date = NaiveDate::from_ymd_opt(2020, 10, 1).unwrap();
        assert_eq!(year_month_key(date), "2020-10");
    }

    #[test]
    fn test_prepare_derives_all_fields() {
        let prepared = prepare(&ad("Joe Biden", "2020-09-15T10:00:00+0000", "100", "199"));
        assert_eq!(prepared.date, NaiveDate::from_ymd_opt(2020, 9, 15));
        assert_eq!(prepared.spend_midpoint, Some(149.5));
        assert_eq!(prepared.year_month.as_deref(), Some("2020-9"));
    }

    #[test]
    fn test_prepare_bad_date_has_no_year_month() {
        let prepared = prepare(&ad("Joe Biden", "yesterday", "1", "3"));
        assert_eq!(prepared.date, None);
        assert_eq!(prepared.year_month, None);
        assert_eq!(prepared.spend_midpoint, Some(2.0));
    }
}
