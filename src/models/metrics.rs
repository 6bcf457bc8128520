use crate::basis::types::BasisStatsRecord;
use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;

/// Flat view of a stats record, shaped after the pacing report.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetrics {
    /// When the data was pulled locally, not a server timestamp.
    pub date_updated: NaiveDateTime,
    pub data_through_date: Option<String>,
    pub impressions: Option<u64>,
    pub clicks: Option<u64>,
    pub viewability_pct: f64,
    pub pacing_pct: Option<f64>,
    pub spend: Option<Decimal>,
    pub auctions_won: Option<u64>,
    pub click_through_rate: Option<f64>,
}

impl NormalizedMetrics {
    /// Normalize a raw stats record, stamping it with the current local time.
    pub fn extract(stats: Option<&BasisStatsRecord>) -> Option<Self> {
        Self::extract_at(stats, Local::now().naive_local())
    }

    pub fn extract_at(stats: Option<&BasisStatsRecord>, now: NaiveDateTime) -> Option<Self> {
        let stats = stats?;
        let delivery = stats.delivery_metrics.clone().unwrap_or_default();
        let performance = stats.performance_metrics.clone().unwrap_or_default();

        let viewable = delivery.delivered_viewable_impressions.unwrap_or(0);
        // Missing measurable counts as 1; an explicit zero reports 0%.
        let measurable = delivery.delivered_measurable_impressions.unwrap_or(1);
        let viewability_pct = match measurable {
            0 => 0.0,
            m => viewable as f64 / m as f64 * 100.0,
        };

        Some(NormalizedMetrics {
            date_updated: now,
            data_through_date: stats.data_through_date.clone(),
            impressions: delivery.delivered_impressions,
            clicks: delivery.delivered_clicks,
            viewability_pct,
            pacing_pct: performance.pacing_pct_spend,
            spend: delivery.total_spend,
            auctions_won: delivery.auctions_won,
            click_through_rate: performance.click_through_rate,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_helpers::mock_now;
    use super::*;
    use rust_decimal::prelude::dec;

    fn record(json: &str) -> BasisStatsRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_extract_none() {
        assert_eq!(NormalizedMetrics::extract(None), None);
    }

    #[test]
    fn test_extract_empty_record() {
        let stats = record("{}");
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(metrics.date_updated, mock_now());
        assert_eq!(metrics.data_through_date, None);
        assert_eq!(metrics.impressions, None);
        assert_eq!(metrics.clicks, None);
        assert_eq!(metrics.viewability_pct, 0.0);
        assert_eq!(metrics.pacing_pct, None);
        assert_eq!(metrics.spend, None);
        assert_eq!(metrics.auctions_won, None);
        assert_eq!(metrics.click_through_rate, None);
    }

    #[test]
    fn test_extract_stamps_current_time() {
        let before = Local::now().naive_local();
        let metrics = NormalizedMetrics::extract(Some(&record("{}"))).unwrap();
        let after = Local::now().naive_local();

        assert!(metrics.date_updated >= before && metrics.date_updated <= after);
    }

    #[test]
    fn test_viewability_zero_measurable() {
        let stats = record(
            r#"{"delivery_metrics": {
                "delivered_viewable_impressions": 50,
                "delivered_measurable_impressions": 0
            }}"#,
        );
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(metrics.viewability_pct, 0.0);
    }

    #[test]
    fn test_viewability_ratio() {
        let stats = record(
            r#"{"delivery_metrics": {
                "delivered_viewable_impressions": 50,
                "delivered_measurable_impressions": 200
            }}"#,
        );
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(metrics.viewability_pct, 25.0);
    }

    #[test]
    fn test_viewability_missing_measurable() {
        let stats = record(r#"{"delivery_metrics": {"delivered_viewable_impressions": 3}}"#);
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(metrics.viewability_pct, 300.0);
    }

    #[test]
    fn test_extract_full_record() {
        let stats = record(
            r#"{
                "line_item_id": 1,
                "data_through_date": "2025-03-31",
                "delivery_metrics": {
                    "delivered_impressions": 1000,
                    "delivered_clicks": 12,
                    "delivered_viewable_impressions": 600,
                    "delivered_measurable_impressions": 800,
                    "total_spend": 250.75,
                    "auctions_won": 1400
                },
                "performance_metrics": {
                    "pacing_pct_spend": 98.4,
                    "click_through_rate": 1.2
                }
            }"#,
        );
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(
            metrics,
            NormalizedMetrics {
                date_updated: mock_now(),
                data_through_date: Some("2025-03-31".to_string()),
                impressions: Some(1000),
                clicks: Some(12),
                viewability_pct: 75.0,
                pacing_pct: Some(98.4),
                spend: Some(dec!(250.75)),
                auctions_won: Some(1400),
                click_through_rate: Some(1.2),
            }
        );
    }

    #[test]
    fn test_null_sections_treated_as_empty() {
        let stats = record(r#"{"delivery_metrics": null, "performance_metrics": null}"#);
        let metrics = NormalizedMetrics::extract_at(Some(&stats), mock_now()).unwrap();

        assert_eq!(metrics.impressions, None);
        assert_eq!(metrics.pacing_pct, None);
    }
}
