//! Per-campaign aggregation.
//!
//! Each campaign's ads are reduced to four tables: ads per delivery day, the
//! largest spend midpoints per ad, average audience share per month and age
//! band, and the most frequent words of the ad text. [`analyzer`] assembles
//! them into a [`types::CampaignReport`] and the whole run into a
//! [`types::ReportDocument`].

pub mod aggregate;
pub mod analyzer;
pub mod types;
pub mod utility;
