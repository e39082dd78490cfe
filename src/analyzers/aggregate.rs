use crate::analyzers::types::{AgeBandAverage, CampaignCount, DailyCount, MaxSpend, WordCount};
use crate::analyzers::utility::{desc_f64, mean};
use crate::record::{AdRecord, cast_float};
use crate::transform::PreparedAd;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

/// Counts ads per delivery date, ascending by date.
///
/// Ads without a parsed date are left out. Days with no ads are not filled in.
pub fn count_by_day(ads: &[PreparedAd]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in ads.iter().filter_map(|ad| ad.date) {
        *counts.entry(date).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Largest spend midpoint per ad id, descending, keeping the first `limit`.
///
/// Ads without an id or without a midpoint are left out. Equal spends are
/// ordered by ascending id.
pub fn max_spend_by_ad(ads: &[PreparedAd], limit: usize) -> Vec<MaxSpend> {
    let mut max_by_id: HashMap<&str, f64> = HashMap::new();
    for ad in ads {
        let (Some(id), Some(spend)) = (ad.id.as_deref(), ad.spend_midpoint) else {
            continue;
        };
        max_by_id
            .entry(id)
            .and_modify(|current| *current = current.max(spend))
            .or_insert(spend);
    }

    let mut rows: Vec<MaxSpend> = max_by_id
        .into_iter()
        .map(|(id, max_average_spend)| MaxSpend {
            id: id.to_string(),
            max_average_spend,
        })
        .collect();

    rows.sort_by(|a, b| desc_f64(a.max_average_spend, b.max_average_spend).then_with(|| a.id.cmp(&b.id)));
    rows.truncate(limit);
    rows
}

/// Mean audience percentage per (year-month, age band), ordered by both keys.
///
/// Every demographic entry of every ad contributes one sample. Entries in
/// `excluded_age` or with no age band are dropped. Ads without a parsed date
/// fall under an empty year-month. A non-numeric percentage keeps its group
/// but adds no sample, so a group with none averages to `None`.
pub fn average_by_age_band(ads: &[PreparedAd], excluded_age: &str, limit: usize) -> Vec<AgeBandAverage> {
    let mut samples: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();

    for ad in ads {
        let year_month = ad.year_month.as_deref().unwrap_or_default();
        for entry in &ad.demographics {
            let Some(age) = entry.age.as_deref() else {
                continue;
            };
            if age == excluded_age {
                continue;
            }
            let group = samples.entry((year_month, age)).or_default();
            if let Some(pct) = entry.percentage.as_deref().and_then(cast_float) {
                group.push(pct);
            }
        }
    }

    samples
        .into_iter()
        .take(limit)
        .map(|((year_month, age), values)| AgeBandAverage {
            year_month: year_month.to_string(),
            age: age.to_string(),
            average_percentage: (!values.is_empty()).then(|| mean(&values)),
        })
        .collect()
}

/// Splits lower-cased text on single spaces.
///
/// Consecutive spaces yield empty tokens; punctuation is kept.
pub fn tokenize(body: &str) -> Vec<String> {
    body.to_lowercase().split(' ').map(str::to_string).collect()
}

/// Most frequent tokens across all ad bodies, descending by count, keeping
/// the first `limit`. Equal counts are ordered by ascending token.
pub fn top_words(ads: &[PreparedAd], limit: usize) -> Vec<WordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for body in ads.iter().filter_map(|ad| ad.body.as_deref()) {
        for token in tokenize(body) {
            *counts.entry(token).or_default() += 1;
        }
    }

    let mut rows: Vec<WordCount> = counts
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();

    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    rows.truncate(limit);
    rows
}

/// Ads per distinct page name, descending by count then ascending by name.
/// Records without a page name are not listed.
pub fn count_campaigns(records: &[AdRecord]) -> Vec<CampaignCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in records.iter().filter_map(AdRecord::campaign) {
        *counts.entry(name).or_default() += 1;
    }

    let mut rows: Vec<CampaignCount> = counts
        .into_iter()
        .map(|(name, ads)| CampaignCount {
            page_name: name.to_string(),
            ads,
        })
        .collect();
    rows.sort_by(|a, b| b.ads.cmp(&a.ads).then_with(|| a.page_name.cmp(&b.page_name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DemographicEntry;

    fn ad(id: &str, date: Option<(i32, u32, u32)>, spend: Option<f64>) -> PreparedAd {
        let date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        PreparedAd {
            id: Some(id.to_string()),
            date,
            spend_midpoint: spend,
            year_month: date.map(crate::transform::year_month_key),
            body: None,
            demographics: vec![],
        }
    }

    fn with_body(body: &str) -> PreparedAd {
        PreparedAd {
            body: Some(body.to_string()),
            ..ad("x", None, None)
        }
    }

    fn demo(age: &str, pct: &str) -> DemographicEntry {
        DemographicEntry {
            age: Some(age.to_string()),
            gender: Some("female".to_string()),
            percentage: Some(pct.to_string()),
        }
    }

    #[test]
    fn test_count_by_day_sorted_and_unique() {
        let ads = vec![
            ad("1", Some((2020, 9, 2)), None),
            ad("2", Some((2020, 9, 1)), None),
            ad("3", Some((2020, 9, 2)), None),
            ad("4", None, None),
            ad("5", Some((2020, 8, 30)), None),
        ];
        let counts = count_by_day(&ads);

        let dates: Vec<_> = counts.iter().map(|c| c.date.to_string()).collect();
        assert_eq!(dates, vec!["2020-08-30", "2020-09-01", "2020-09-02"]);
        assert_eq!(counts.iter().map(|c| c.count).collect::<Vec<_>>(), vec![1, 1, 2]);
        assert!(counts.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_max_spend_takes_max_per_id_and_sorts() {
        let ads = vec![
            ad("a", None, Some(15.0)),
            ad("a", None, Some(49.5)),
            ad("b", None, Some(100.0)),
            ad("c", None, None),
        ];
        let rows = max_spend_by_ad(&ads, 1000);

        assert_eq!(
            rows,
            vec![
                MaxSpend { id: "b".into(), max_average_spend: 100.0 },
                MaxSpend { id: "a".into(), max_average_spend: 49.5 },
            ]
        );
    }

    #[test]
    fn test_max_spend_ties_break_by_id_and_truncate() {
        let ads = vec![
            ad("z", None, Some(10.0)),
            ad("m", None, Some(10.0)),
            ad("a", None, Some(10.0)),
        ];
        let rows = max_spend_by_ad(&ads, 2);
        let ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "m"]);
    }

    #[test]
    fn test_average_by_age_band_excludes_minors() {
        let mut first = ad("1", Some((2020, 9, 1)), None);
        first.demographics = vec![demo("13-17", "0.9"), demo("18-24", "0.2"), demo("25-34", "0.4")];
        let mut second = ad("2", Some((2020, 9, 20)), None);
        second.demographics = vec![demo("18-24", "0.4"), demo("13-17", "0.1")];
        let mut third = ad("3", Some((2020, 10, 1)), None);
        third.demographics = vec![demo("18-24", "0.6")];

        let rows = average_by_age_band(&[first, second, third], "13-17", 1000);

        assert!(rows.iter().all(|r| r.age != "13-17"));
        let keys: Vec<_> = rows.iter().map(|r| (r.year_month.as_str(), r.age.as_str())).collect();
        // lexical ordering puts "2020-10" before "2020-9"
        assert_eq!(keys, vec![("2020-10", "18-24"), ("2020-9", "18-24"), ("2020-9", "25-34")]);
        assert!((rows[1].average_percentage.unwrap() - 0.3).abs() < 1e-9);
        assert!((rows[2].average_percentage.unwrap() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_average_by_age_band_non_numeric_samples() {
        let mut first = ad("1", Some((2020, 9, 1)), None);
        first.demographics = vec![demo("18-24", "n/a"), demo("25-34", "0.5"), demo("25-34", "x")];

        let rows = average_by_age_band(&[first], "13-17", 1000);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].age, "18-24");
        assert_eq!(rows[0].average_percentage, None);
        assert_eq!(rows[1].average_percentage, Some(0.5));
    }

    #[test]
    fn test_average_by_age_band_groups_undated_under_empty_period() {
        let mut dated = ad("1", Some((2020, 9, 1)), None);
        dated.demographics = vec![demo("25-34", "0.5")];
        let undated = PreparedAd {
            demographics: vec![demo("18-24", "0.2"), demo("18-24", "0.4"), demo("13-17", "0.9")],
            ..ad("2", None, None)
        };

        let ads = [dated, undated];

        let rows = average_by_age_band(&ads, "13-17", 1000);
        let keys: Vec<_> = rows.iter().map(|r| (r.year_month.as_str(), r.age.as_str())).collect();
        assert_eq!(keys, vec![("", "18-24"), ("2020-9", "25-34")]);
        assert!((rows[0].average_percentage.unwrap() - 0.3).abs() < 1e-9);

        let truncated = average_by_age_band(&ads, "13-17", 1);
        assert_eq!(truncated, rows[..1]);
    }

    #[test]
    fn test_tokenize_splits_on_single_spaces() {
        assert_eq!(tokenize("Vote For Us Vote"), vec!["vote", "for", "us", "vote"]);
        assert_eq!(tokenize("a  b"), vec!["a", "", "b"]);
        assert_eq!(tokenize("Hello, World!"), vec!["hello,", "world!"]);
    }

    #[test]
    fn test_top_words_counts_and_orders() {
        let ads = vec![with_body("Vote For Us Vote"), with_body("vote now"), ad("y", None, None)];
        let rows = top_words(&ads, 50);

        assert_eq!(rows[0], WordCount { word: "vote".into(), count: 3 });
        let rest: Vec<_> = rows[1..].iter().map(|r| r.word.as_str()).collect();
        assert_eq!(rest, vec!["for", "now", "us"]);
    }

    #[test]
    fn test_top_words_never_exceeds_limit() {
        let body: Vec<String> = (0..120).map(|i| format!("w{i}")).collect();
        let ads = vec![with_body(&body.join(" ")), with_body("w7 w7")];
        let rows = top_words(&ads, 50);

        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].word, "w7");
        assert!(rows.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn test_count_campaigns() {
        let records = vec![
            AdRecord { page_name: Some("B".into()), ..Default::default() },
            AdRecord { page_name: Some("A".into()), ..Default::default() },
            AdRecord { page_name: Some("B".into()), ..Default::default() },
            AdRecord { page_name: Some("C".into()), ..Default::default() },
            AdRecord::default(),
        ];
        let rows = count_campaigns(&records);
        assert_eq!(
            rows,
            vec![
                CampaignCount { page_name: "B".into(), ads: 2 },
                CampaignCount { page_name: "A".into(), ads: 1 },
                CampaignCount { page_name: "C".into(), ads: 1 },
            ]
        );
    }
}
