use crate::basis::BasisClient;
use crate::config::Config;
use crate::error::Result;
use crate::report::XlsxReports;
use crate::sync::SyncEngine;
use tracing::info;

pub async fn execute(token: &str) -> Result<()> {
    let config = Config::load()?;
    let basis_client = BasisClient::new(&config.api.base_url, token)?;

    let engine = SyncEngine::new(config.clients, basis_client, XlsxReports);
    let summary = engine.sync().await;

    info!(
        updated = summary.updated,
        skipped = summary.skipped,
        failed_clients = summary.failed_clients,
        "Sync completed"
    );

    Ok(())
}
