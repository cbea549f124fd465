//! Executor behaviour beyond the literal scenarios: cancellation, timeouts,
//! log failures, idempotent apply and explicit rollback.

mod common;

use async_trait::async_trait;
use common::*;
use drift_core::{ErrorKind, ExecutionTier, IRREVERSIBLE_KEY, TransactionStatus, WorldPatch};
use drift_runtime::{
    CancelFlag, ExecutionOptions, NullPlugin, PluginAck, PluginError, WorldPlugin,
};
use drift_txlog::TransactionLog;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

/// Raises the cancel flag from inside the first plugin call.
struct CancellingPlugin {
    flag: CancelFlag,
    inner: ScriptedPlugin,
}

#[async_trait]
impl WorldPlugin for CancellingPlugin {
    async fn apply_patch(&self, patch: &WorldPatch) -> Result<PluginAck, PluginError> {
        self.flag.cancel();
        self.inner.apply_patch(patch).await
    }
}

fn reasons(result: &drift_core::ExecutionResult) -> Vec<(&str, &str)> {
    result
        .skipped
        .iter()
        .map(|s| (s.template_id.as_str(), s.reason.as_str()))
        .collect()
}

// =============================================================================
// TIERS
// =============================================================================

#[tokio::test]
async fn test_blocked_plan_is_refused() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "tnt",
        vec![
            placement(1, "minecraft:glass"),
            template(
                2,
                ExecutionTier::Blocked,
                vec!["setblock ~2 ~ ~ minecraft:tnt".to_string()],
                None,
            ),
        ],
    );
    assert_eq!(plan.execution_tier, ExecutionTier::Blocked);

    let result = executor.apply("steve", &plan, None).await;

    assert!(result.executed.is_empty());
    assert_eq!(
        reasons(&result),
        vec![
            ("tpl-step-1", "execution_tier:blocked"),
            ("tpl-step-2", "execution_tier:blocked"),
        ]
    );
    assert!(result.has_issue(ErrorKind::TierBlocked));
    assert!(plugin.received().is_empty());
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_dry_run_of_blocked_plan_validates_safe_templates() {
    let log = memory_log();
    let executor = executor(log.clone(), Arc::new(NullPlugin));
    let plan = plan_of(
        "tnt",
        vec![
            placement(1, "minecraft:glass"),
            template(2, ExecutionTier::Blocked, vec!["setblock ~2 ~ ~ minecraft:tnt".to_string()], None),
        ],
    );

    let result = executor.dry_run(&plan, None).await;

    assert_eq!(result.executed.len(), 1);
    assert_eq!(reasons(&result), vec![("tpl-step-2", "execution_tier:blocked")]);
    assert_eq!(log.len(), 1);
}

// =============================================================================
// IDEMPOTENT APPLY
// =============================================================================

#[tokio::test]
async fn test_second_apply_skips_applied_templates() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "two blocks",
        vec![placement(1, "minecraft:glass"), placement(2, "minecraft:lantern")],
    );

    let first = executor.apply("steve", &plan, None).await;
    let second = executor.apply("steve", &plan, None).await;

    assert_eq!(first.executed.len(), 2);
    assert!(second.executed.is_empty());
    assert_eq!(
        reasons(&second),
        vec![("tpl-step-1", "already_applied"), ("tpl-step-2", "already_applied")]
    );
    assert_eq!(plugin.received().len(), 2);
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn test_dry_run_after_apply_keeps_patch_applied() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of("one block", vec![placement(1, "minecraft:glass")]);

    executor.apply("steve", &plan, Some("patch-d")).await;
    let dry = executor.dry_run(&plan, Some("patch-d")).await;
    assert_eq!(dry.executed.len(), 1);
    assert_eq!(log.still_applied("patch-d").len(), 1);

    let again = executor.apply("steve", &plan, Some("patch-d")).await;
    assert!(again.executed.is_empty());
    assert_eq!(reasons(&again), vec![("tpl-step-1", "already_applied")]);
    assert_eq!(plugin.received().len(), 1);

    let rollback = executor.rollback("steve", "patch-d").await;
    assert!(rollback.warnings.is_empty());
    assert_eq!(rollback.executed.len(), 1);
    assert_eq!(rollback.executed[0].status, TransactionStatus::RolledBack);
    assert_eq!(
        plugin.commands(),
        vec![
            "setblock ~1 ~ ~ minecraft:glass".to_string(),
            "setblock ~1 ~ ~ minecraft:air".to_string(),
        ]
    );
    assert!(log.still_applied("patch-d").is_empty());
}

#[tokio::test]
async fn test_dry_run_records_request_id() {
    let log = memory_log();
    let executor = executor(log.clone(), Arc::new(NullPlugin));
    let plan = plan_of("one block", vec![placement(1, "minecraft:glass")]);
    let options = ExecutionOptions {
        patch_id: Some("patch-req".to_string()),
        request_id: Some("req-1".to_string()),
        ..Default::default()
    };

    let result = executor.dry_run_with(&plan, &options).await;

    assert_eq!(result.patch_id, "patch-req");
    assert_eq!(result.transactions.len(), 1);
    assert_eq!(result.transactions[0].seq, 1);
    assert_eq!(result.transactions[0].metadata["request_id"], serde_json::json!("req-1"));
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn test_plugin_timeout_is_a_failure() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::slow(Duration::from_millis(200)));
    let executor = executor_with_timeout(log.clone(), plugin, Duration::from_millis(20));
    let plan = plan_of("one block", vec![placement(1, "minecraft:glass")]);

    let result = executor.apply("steve", &plan, None).await;

    assert!(result.has_issue(ErrorKind::PluginFailure));
    assert_eq!(result.executed[0].status, TransactionStatus::Failed);
    let entries = log.load(Some(&result.patch_id));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, TransactionStatus::Failed);
    assert!(entries[0].metadata["error"].as_str().unwrap().contains("20 ms"));
}

#[tokio::test]
async fn test_log_failure_marks_result_untrusted() {
    let log = Arc::new(
        TransactionLog::open(Arc::new(FlakyStorage::new(1)))
            .await
            .unwrap(),
    );
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "three blocks",
        vec![
            placement(1, "minecraft:glass"),
            placement(2, "minecraft:glass"),
            placement(3, "minecraft:glass"),
        ],
    );

    let result = executor.apply("steve", &plan, None).await;

    assert!(!result.log_trusted);
    assert!(result.has_issue(ErrorKind::LogWriteFailure));
    let executed: Vec<_> = result
        .executed
        .iter()
        .map(|e| (e.template_id.as_str(), e.status))
        .collect();
    assert_eq!(
        executed,
        vec![
            ("tpl-step-1", TransactionStatus::Applied),
            ("tpl-step-2", TransactionStatus::Applied),
        ]
    );
    assert_eq!(reasons(&result), vec![("tpl-step-3", "aborted_after_failure")]);
    assert_eq!(result.transactions.len(), 1);
    assert_eq!(plugin.received().len(), 2);
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_cancel_before_start_skips_everything() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of("one block", vec![placement(1, "minecraft:glass")]);
    let options = ExecutionOptions::default();
    options.cancel.cancel();

    let result = executor.apply_with("steve", &plan, &options).await;

    assert_eq!(reasons(&result), vec![("tpl-step-1", "cancelled")]);
    assert!(plugin.received().is_empty());
    assert!(log.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_apply_rolls_back() {
    let log = memory_log();
    let flag = CancelFlag::new();
    let plugin = Arc::new(CancellingPlugin {
        flag: flag.clone(),
        inner: ScriptedPlugin::new(),
    });
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "three blocks",
        vec![
            placement(1, "minecraft:glass"),
            placement(2, "minecraft:glass"),
            placement(3, "minecraft:glass"),
        ],
    );
    let options = ExecutionOptions {
        cancel: flag,
        ..Default::default()
    };

    let result = executor.apply_with("steve", &plan, &options).await;

    assert_eq!(result.executed[0].status, TransactionStatus::RolledBack);
    assert_eq!(
        reasons(&result),
        vec![("tpl-step-2", "cancelled"), ("tpl-step-3", "cancelled")]
    );
    assert_eq!(
        plugin.inner.commands(),
        vec![
            "setblock ~1 ~ ~ minecraft:glass".to_string(),
            "setblock ~1 ~ ~ minecraft:air".to_string(),
        ]
    );
    assert!(log.still_applied(&result.patch_id).is_empty());
}

// =============================================================================
// EXPLICIT ROLLBACK
// =============================================================================

#[tokio::test]
async fn test_rollback_replays_undo_newest_first() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "blocks and a removal",
        vec![
            placement(1, "minecraft:glass"),
            placement(2, "minecraft:lantern"),
            template(
                3,
                ExecutionTier::SafeAuto,
                vec!["setblock ~3 ~ ~ minecraft:air".to_string()],
                None,
            ),
        ],
    );

    let applied = executor.apply("steve", &plan, Some("patch-r")).await;
    assert_eq!(applied.executed.len(), 3);
    let entries = log.load(Some("patch-r"));
    assert!(entries[2].is_irreversible());
    assert_eq!(entries[2].metadata[IRREVERSIBLE_KEY], serde_json::json!(true));

    let result = executor.rollback("steve", "patch-r").await;

    assert_eq!(reasons(&result), vec![("tpl-step-3", "irreversible")]);
    let rolled: Vec<_> = result.executed.iter().map(|e| e.template_id.as_str()).collect();
    assert_eq!(rolled, vec!["tpl-step-2", "tpl-step-1"]);
    assert!(result
        .executed
        .iter()
        .all(|e| e.status == TransactionStatus::RolledBack));
    assert_eq!(
        plugin.commands()[3..].to_vec(),
        vec![
            "setblock ~2 ~ ~ minecraft:air".to_string(),
            "setblock ~1 ~ ~ minecraft:air".to_string(),
        ]
    );
    assert_eq!(
        log.latest_status("patch-r", "step-1"),
        Some(TransactionStatus::RolledBack)
    );
    let remaining: Vec<_> = log
        .still_applied("patch-r")
        .into_iter()
        .map(|e| e.template_id)
        .collect();
    assert_eq!(remaining, vec!["tpl-step-3".to_string()]);
}

#[tokio::test]
async fn test_rollback_of_unknown_patch_warns() {
    let executor = executor(memory_log(), Arc::new(NullPlugin));

    let result = executor.rollback("steve", "no-such-patch").await;

    assert!(result.executed.is_empty());
    assert_eq!(result.warnings, vec!["nothing_to_roll_back".to_string()]);
}

#[tokio::test]
async fn test_reapply_after_rollback() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of("one block", vec![placement(1, "minecraft:glass")]);

    executor.apply("steve", &plan, Some("patch-c")).await;
    executor.rollback("steve", "patch-c").await;
    let again = executor.apply("steve", &plan, Some("patch-c")).await;

    assert_eq!(again.executed.len(), 1);
    let statuses: Vec<_> = log.load(Some("patch-c")).into_iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            TransactionStatus::Applied,
            TransactionStatus::RolledBack,
            TransactionStatus::Applied,
        ]
    );
}

// =============================================================================
// ORDERING
// =============================================================================

#[tokio::test]
async fn test_same_player_applies_in_submission_order() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::slow(Duration::from_millis(30)));
    let executor = Arc::new(executor(log, plugin.clone()));

    let first = plan_of(
        "first",
        vec![placement(1, "minecraft:glass"), placement(2, "minecraft:glass")],
    );
    let second = plan_of("second", vec![placement(1, "minecraft:stone")]);

    let ex = executor.clone();
    let a = tokio::spawn(async move { ex.apply("steve", &first, None).await });
    tokio::time::sleep(Duration::from_millis(5)).await;
    let ex = executor.clone();
    let b = tokio::spawn(async move { ex.apply("steve", &second, None).await });
    a.await.unwrap();
    b.await.unwrap();

    assert_eq!(
        plugin.commands(),
        vec![
            "setblock ~1 ~ ~ minecraft:glass".to_string(),
            "setblock ~2 ~ ~ minecraft:glass".to_string(),
            "setblock ~1 ~ ~ minecraft:stone".to_string(),
        ]
    );
}
