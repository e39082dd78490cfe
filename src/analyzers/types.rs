//! Data types produced by the aggregation pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::loader::LoadStats;

/// Number of ads whose delivery started on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Largest spend midpoint seen for one ad id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaxSpend {
    pub id: String,
    pub max_average_spend: f64,
}

/// Mean audience share of one age band within one month.
///
/// `year_month` is empty for ads whose start time did not parse, and
/// `average_percentage` is `None` when no entry of the group had a numeric
/// percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgeBandAverage {
    pub year_month: String,
    pub age: String,
    pub average_percentage: Option<f64>,
}

/// Occurrences of one lower-cased token across a campaign's ad text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

/// All aggregates for a single campaign.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignReport {
    pub campaign: String,
    pub ads: usize,
    /// Ads whose start time did not parse. They are left out of `daily_counts`
    /// and grouped under an empty `year_month` in `demographics`.
    pub undated_ads: usize,
    /// Ads left out of the spend table because a bound was missing or non-numeric.
    pub unpriced_ads: usize,
    pub daily_counts: Vec<DailyCount>,
    pub max_spend: Vec<MaxSpend>,
    pub demographics: Vec<AgeBandAverage>,
    pub top_words: Vec<WordCount>,
}

/// Complete result of one run, written as `report.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ReportDocument {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub load: LoadStats,
    pub campaigns: Vec<CampaignReport>,
}

/// Row count of one distinct page name, for the `campaigns` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignCount {
    pub page_name: String,
    pub ads: usize,
}
