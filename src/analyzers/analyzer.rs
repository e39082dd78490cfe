use crate::analyzers::aggregate::{average_by_age_band, count_by_day, max_spend_by_ad, top_words};
use crate::analyzers::types::{CampaignReport, ReportDocument};
use crate::config::ReportConfig;
use crate::loader::Dataset;
use crate::transform::prepare_campaign;
use chrono::Utc;
use tracing::{info, warn};

/// Current layout version of `report.json`.
pub const SCHEMA_VERSION: u8 = 1;

/// Builds every aggregate for one campaign.
#[tracing::instrument(skip(dataset, config))]
pub fn campaign_report(dataset: &Dataset, campaign: &str, config: &ReportConfig) -> CampaignReport {
    let ads = prepare_campaign(&dataset.records, campaign);
    if ads.is_empty() {
        warn!(campaign, "No ads found for campaign");
    }

    let undated_ads = ads.iter().filter(|ad| ad.date.is_none()).count();
    let unpriced_ads = ads.iter().filter(|ad| ad.spend_midpoint.is_none()).count();
    if undated_ads > 0 {
        warn!(campaign, undated_ads, "Ads with unparseable delivery start time left out of daily counts");
    }

    let report = CampaignReport {
        campaign: campaign.to_string(),
        ads: ads.len(),
        undated_ads,
        unpriced_ads,
        daily_counts: count_by_day(&ads),
        max_spend: max_spend_by_ad(&ads, config.max_spend_limit),
        demographics: average_by_age_band(&ads, &config.excluded_age_band, config.demographic_limit),
        top_words: top_words(&ads, config.top_words_limit),
    };

    info!(
        campaign,
        ads = report.ads,
        unpriced_ads,
        days = report.daily_counts.len(),
        spend_rows = report.max_spend.len(),
        demographic_rows = report.demographics.len(),
        words = report.top_words.len(),
        "Campaign aggregated"
    );

    report
}

/// Runs [`campaign_report`] for each configured campaign.
pub fn build_report(dataset: &Dataset, source: &str, config: &ReportConfig) -> ReportDocument {
    let campaigns = config
        .campaigns
        .iter()
        .map(|campaign| campaign_report(dataset, campaign, config))
        .collect();

    ReportDocument {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        source: source.to_string(),
        load: dataset.stats.clone(),
        campaigns,
    }
}
