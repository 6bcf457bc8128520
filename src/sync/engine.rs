use crate::basis::{CampaignOperations, StatsIndex};
use crate::config::ClientConfig;
use crate::error::{AppError, Result};
use crate::models::{LineItem, NormalizedMetrics};
use crate::report::{ReportOperations, UpdateOutcome, apply_metrics};
use chrono::{Local, NaiveDate};
use indicatif::ProgressStyle;
use std::ops::AddAssign;
use tracing::{Span, debug, error, info, instrument, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Counts of what a sync run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub updated: usize,
    pub skipped: usize,
    pub failed_clients: usize,
}

impl AddAssign for SyncSummary {
    fn add_assign(&mut self, other: Self) {
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.failed_clients += other.failed_clients;
    }
}

pub struct SyncEngine<BC, RS> {
    clients: Vec<ClientConfig>,
    campaign_client: BC,
    reports: RS,
}

impl<BC, RS> SyncEngine<BC, RS>
where
    BC: CampaignOperations + Sync,
    RS: ReportOperations + Sync,
{
    pub fn new(clients: Vec<ClientConfig>, campaign_client: BC, reports: RS) -> Self {
        Self {
            clients,
            campaign_client,
            reports,
        }
    }

    /// Mirror every client's line item stats into its pacing report.
    ///
    /// Failures are logged and skipped; a run never aborts part-way.
    #[instrument(name = "Sync", skip_all)]
    pub async fn sync(&self) -> SyncSummary {
        self.sync_on(Local::now().date_naive()).await
    }

    async fn sync_on(&self, today: NaiveDate) -> SyncSummary {
        let mut summary = SyncSummary::default();

        for client in &self.clients {
            match self.sync_client(client, today).await {
                Ok(client_summary) => summary += client_summary,
                Err(e) => {
                    error!(client = %client.name, kind = e.kind(), error = %e, "Skipping client");
                    summary.failed_clients += 1;
                }
            }
        }

        info!(
            updated = summary.updated,
            skipped = summary.skipped,
            failed_clients = summary.failed_clients,
            "Sync finished"
        );

        summary
    }

    #[instrument(name = "Syncing client", skip_all, fields(client = %client.name))]
    async fn sync_client(&self, client: &ClientConfig, today: NaiveDate) -> Result<SyncSummary> {
        let line_items = self
            .campaign_client
            .list_line_items(&client.campaign_id)
            .await?;
        if line_items.is_empty() {
            info!("Campaign has no line items");
            return Ok(SyncSummary::default());
        }

        // One stats request per campaign, shared by all of its line items.
        let stats = StatsIndex::new(self.campaign_client.list_stats(&client.campaign_id).await?);
        debug!(line_items = line_items.len(), stats = stats.len(), "Fetched campaign");

        let span = Span::current();
        span.pb_set_style(
            &ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
            )
            .map_err(|e| AppError::Other(e.into()))?,
        );
        span.pb_set_message(&client.name);
        span.pb_set_length(line_items.len() as u64);

        let mut summary = SyncSummary::default();
        for line_item in &line_items {
            match self.sync_line_item(client, line_item, &stats, today) {
                Ok(Some(_)) => summary.updated += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!(line_item = %line_item.name, kind = e.kind(), error = %e, "Skipping line item");
                    summary.skipped += 1;
                }
            }
            span.pb_inc(1);
        }

        info!(updated = summary.updated, skipped = summary.skipped, "Client synced");

        Ok(summary)
    }

    /// Returns `None` when the campaign has no stats for the line item.
    #[instrument(name = "Syncing line item", skip_all, fields(line_item = %line_item.name))]
    fn sync_line_item(
        &self,
        client: &ClientConfig,
        line_item: &LineItem,
        stats: &StatsIndex,
        today: NaiveDate,
    ) -> Result<Option<UpdateOutcome>> {
        let Some(metrics) = NormalizedMetrics::extract(stats.get(&line_item.id)) else {
            info!(id = %line_item.id, "No stats for line item");
            return Ok(None);
        };

        let mut worksheet = self.reports.load(&client.report_path)?;
        let outcome = apply_metrics(&mut worksheet, &line_item.name, &metrics, today);
        self.reports.save(&client.report_path, &worksheet)?;

        Ok(Some(outcome))
    }
}
