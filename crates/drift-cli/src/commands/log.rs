//! `drift log` and `drift rollback`.

use super::{load_pipeline, print_json};
use anyhow::{Context, Result};
use drift_core::DriftConfig;
use drift_txlog::{TransactionFilter, TransactionLog};

pub async fn show(config: &DriftConfig, filter: &TransactionFilter) -> Result<()> {
    let log = TransactionLog::from_config(&config.transaction_log)
        .await
        .with_context(|| {
            format!(
                "failed to open transaction log in {}",
                config.transaction_log.directory.display()
            )
        })?;
    print_json(&log.query(filter))
}

pub async fn rollback(config: &DriftConfig, player_id: &str, patch_id: &str) -> Result<()> {
    let pipeline = load_pipeline(config).await?;
    let result = pipeline.rollback(player_id, patch_id).await;
    tracing::info!(
        patch_id = %patch_id,
        rolled_back = result.executed.len(),
        skipped = result.skipped.len(),
        "Rollback finished"
    );
    print_json(&result)
}
