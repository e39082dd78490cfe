use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::output::campaign_slug;

/// Default campaigns compared by the report.
pub const DEFAULT_CAMPAIGNS: [&str; 2] = ["Donald J. Trump", "Joe Biden"];

/// Highest accepted chart resolution.
pub const MAX_DPI: u32 = 1200;

/// Every tunable literal of the report, with defaults matching the 2020
/// election analysis.
///
/// Can be stored as a JSON object on disk; missing keys fall back to their
/// defaults:
/// ```json
/// {
///   "campaigns": ["Donald J. Trump", "Joe Biden"],
///   "top_words_limit": 25
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    pub campaigns: Vec<String>,
    pub excluded_age_band: String,
    pub max_spend_limit: usize,
    pub demographic_limit: usize,
    pub top_words_limit: usize,
    pub daily_preview_limit: usize,
    pub histogram_bins: usize,
    pub dpi: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            campaigns: DEFAULT_CAMPAIGNS.iter().map(|c| c.to_string()).collect(),
            excluded_age_band: "13-17".to_string(),
            max_spend_limit: 1000,
            demographic_limit: 1000,
            top_words_limit: 50,
            daily_preview_limit: 1000,
            histogram_bins: 50,
            dpi: 100,
        }
    }
}

impl ReportConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("invalid config {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no report can be produced with.
    pub fn validate(&self) -> Result<()> {
        if self.campaigns.is_empty() {
            anyhow::bail!("at least one campaign is required");
        }
        if self.histogram_bins == 0 {
            anyhow::bail!("histogram_bins must be positive");
        }
        if self.dpi == 0 || self.dpi > MAX_DPI {
            anyhow::bail!("dpi must be between 1 and {MAX_DPI}, got {}", self.dpi);
        }

        let mut slugs: HashMap<String, &str> = HashMap::new();
        for campaign in &self.campaigns {
            if let Some(previous) = slugs.insert(campaign_slug(campaign), campaign) {
                anyhow::bail!("campaigns {previous:?} and {campaign:?} would write to the same output files");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_defaults_match_election_report() {
        let config = ReportConfig::default();
        assert_eq!(config.campaigns, vec!["Donald J. Trump", "Joe Biden"]);
        assert_eq!(config.excluded_age_band, "13-17");
        assert_eq!(config.max_spend_limit, 1000);
        assert_eq!(config.demographic_limit, 1000);
        assert_eq!(config.top_words_limit, 50);
        assert_eq!(config.histogram_bins, 50);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let path = format!("{}/ads_report_config_partial.json", env::temp_dir().display());
        fs::write(&path, r#"{"top_words_limit": 10}"#).unwrap();

        let config = ReportConfig::load(&path).unwrap();
        assert_eq!(config.top_words_limit, 10);
        assert_eq!(config.max_spend_limit, 1000);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_validate_rejects_empty_campaigns() {
        let config = ReportConfig {
            campaigns: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_campaigns_sharing_a_slug() {
        let config = ReportConfig {
            campaigns: vec!["Joe Biden".into(), "joe biden".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("same output files"));

        let repeated = ReportConfig {
            campaigns: vec!["Joe Biden".into(), "Joe Biden".into()],
            ..Default::default()
        };
        assert!(repeated.validate().is_err());
    }

    #[test]
    fn test_validate_caps_dpi() {
        let at_cap = ReportConfig {
            dpi: MAX_DPI,
            ..Default::default()
        };
        assert!(at_cap.validate().is_ok());

        for dpi in [0, MAX_DPI + 1, u32::MAX] {
            let config = ReportConfig { dpi, ..Default::default() };
            assert!(config.validate().is_err(), "dpi {dpi} accepted");
        }
    }
}
