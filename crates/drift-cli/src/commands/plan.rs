//! `drift classify`, `drift plan`, `drift dry-run` and `drift apply`.

use super::{load_catalog, load_pipeline, print_json};
use crate::MessageArgs;
use anyhow::{Context, Result};
use drift_core::{DriftConfig, PlayerContext, WorldState};
use drift_intent::IntentClassifier;
use drift_runtime::{CancelFlag, SubmitContext, SubmitMode};
use serde_json::json;

pub fn classify(config: &DriftConfig, args: &MessageArgs) -> Result<()> {
    let classifier = IntentClassifier::new(load_catalog(config)?, config.intent.clone());
    classifier
        .check_message(&args.message)
        .context("message rejected")?;

    let context = PlayerContext {
        previous_message: args.previous.clone(),
        language_hint: args.lang.clone(),
    };
    let decision = classifier.classify(&args.message, &context);
    print_json(&json!({
        "decision": decision,
        "is_block_request": classifier.is_block_request(&decision),
    }))
}

pub async fn plan(config: &DriftConfig, args: &MessageArgs) -> Result<()> {
    submit(config, args, SubmitMode::PlanOnly, None).await
}

pub async fn dry_run(config: &DriftConfig, args: &MessageArgs, patch_id: Option<String>) -> Result<()> {
    submit(config, args, SubmitMode::DryRun, patch_id).await
}

pub async fn apply(config: &DriftConfig, args: &MessageArgs, patch_id: Option<String>) -> Result<()> {
    submit(config, args, SubmitMode::Apply, patch_id).await
}

async fn submit(
    config: &DriftConfig,
    args: &MessageArgs,
    mode: SubmitMode,
    patch_id: Option<String>,
) -> Result<()> {
    let pipeline = load_pipeline(config).await?;

    // Ctrl-C stops at the next template boundary instead of killing the
    // process mid-patch.
    let cancel = CancelFlag::new();
    if mode == SubmitMode::Apply {
        let flag = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current template");
                flag.cancel();
            }
        });
    }

    let context = SubmitContext {
        previous_message: args.previous.clone(),
        language_hint: args.lang.clone(),
        world_state: args.position().map(|position| WorldState {
            position: Some(position),
            ..Default::default()
        }),
        mode,
        patch_id,
        cancel,
    };

    let response = pipeline
        .submit_creation(&args.player, &args.message, context)
        .await
        .context("creation request failed")?;

    if let Some(execution) = &response.execution {
        if !execution.log_trusted {
            tracing::error!(patch_id = %execution.patch_id, "Transaction log is incomplete for this patch");
        }
    }
    print_json(&response)
}
