mod client;
pub mod types;
pub use client::BasisClient;

use crate::error::Result;
use crate::models::{LineItem, LineItemId};
use types::BasisStatsRecord;

use async_trait::async_trait;

#[async_trait]
pub trait CampaignOperations {
    async fn list_line_items(&self, campaign_id: &str) -> Result<Vec<LineItem>>;

    /// Fetch the stats collection for every line item of a campaign.
    async fn list_stats(&self, campaign_id: &str) -> Result<Vec<BasisStatsRecord>>;

    /// Fetch the stats of a single line item.
    ///
    /// The API offers no per-line-item filter, so the whole campaign
    /// collection is fetched and searched. Callers handling many line items
    /// should fetch once with [`CampaignOperations::list_stats`] and use a
    /// [`StatsIndex`].
    async fn line_item_stats(
        &self,
        campaign_id: &str,
        line_item_id: &LineItemId,
    ) -> Result<Option<BasisStatsRecord>> {
        let stats = self.list_stats(campaign_id).await?;
        Ok(StatsIndex::new(stats).take(line_item_id))
    }
}

/// Stats records of one campaign keyed by line item id.
///
/// The first record for an id wins, matching a linear search of the
/// collection.
#[derive(Debug, Default)]
pub struct StatsIndex {
    records: std::collections::HashMap<LineItemId, BasisStatsRecord>,
}

impl StatsIndex {
    pub fn new(stats: Vec<BasisStatsRecord>) -> Self {
        let mut records = std::collections::HashMap::new();
        for record in stats {
            if let Some(id) = record.line_item_id.clone() {
                records.entry(id).or_insert(record);
            }
        }
        Self { records }
    }

    pub fn get(&self, line_item_id: &LineItemId) -> Option<&BasisStatsRecord> {
        self.records.get(line_item_id)
    }

    fn take(mut self, line_item_id: &LineItemId) -> Option<BasisStatsRecord> {
        self.records.remove(line_item_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::DeliveryMetrics;

    fn stats(id: Option<&str>, impressions: u64) -> BasisStatsRecord {
        BasisStatsRecord {
            line_item_id: id.map(LineItemId::new),
            delivery_metrics: Some(DeliveryMetrics {
                delivered_impressions: Some(impressions),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn impressions(record: Option<&BasisStatsRecord>) -> Option<u64> {
        record
            .and_then(|r| r.delivery_metrics.as_ref())
            .and_then(|d| d.delivered_impressions)
    }

    #[test]
    fn test_index_first_record_wins() {
        let index = StatsIndex::new(vec![
            stats(Some("1"), 10),
            stats(Some("2"), 20),
            stats(Some("1"), 30),
        ]);

        assert_eq!(index.len(), 2);
        assert_eq!(impressions(index.get(&LineItemId::new("1"))), Some(10));
        assert_eq!(impressions(index.get(&LineItemId::new("2"))), Some(20));
    }

    #[test]
    fn test_index_skips_records_without_id() {
        let index = StatsIndex::new(vec![stats(None, 10)]);

        assert!(index.is_empty());
        assert!(index.get(&LineItemId::new("")).is_none());
    }
}
