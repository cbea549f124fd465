//! End-to-end creation scenarios, from chat line to transaction log.

mod common;

use common::*;
use drift_core::{
    CoordinateSource, Coordinates, DriftConfig, ErrorKind, ExecutionTier, StepStatus, StepType,
    TransactionStatus, WorldState,
};
use drift_runtime::{CreationPipeline, NullPlugin, RuntimeError, SubmitContext, SubmitMode};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const S1_MESSAGE: &str = "我想用紫水晶搭建一盏幽冥莲花灯";

fn pipeline(plugin: Arc<ScriptedPlugin>) -> (CreationPipeline, Arc<drift_txlog::TransactionLog>) {
    let log = memory_log();
    let pipeline = CreationPipeline::new(catalog(), &DriftConfig::default(), log.clone(), plugin);
    (pipeline, log)
}

fn statuses(log: &drift_txlog::TransactionLog, patch_id: &str) -> Vec<(String, TransactionStatus)> {
    log.load(Some(patch_id))
        .into_iter()
        .map(|e| (e.template_id, e.status))
        .collect()
}

// =============================================================================
// S1 - MATERIAL REQUEST
// =============================================================================

#[tokio::test]
async fn test_s1_amethyst_soul_lantern() {
    let (pipeline, _) = pipeline(Arc::new(ScriptedPlugin::new()));
    let response = pipeline
        .submit_creation("steve", S1_MESSAGE, SubmitContext::default())
        .await
        .unwrap();

    assert!(response.decision.is_creation);
    assert!(response.decision.slots.materials.iter().any(|m| m.contains("紫水晶")));
    assert!(response.decision.slots.materials.iter().any(|m| m.contains("莲花灯")));
    assert!(response.is_block_request);

    let resolved: Vec<_> = response
        .plan
        .materials
        .iter()
        .filter_map(|m| m.resource_id.clone())
        .collect();
    assert!(resolved.contains(&"minecraft:amethyst_block".to_string()));
    assert!(resolved.contains(&"minecraft:soul_lantern".to_string()));

    assert!(matches!(
        response.plan.execution_tier,
        ExecutionTier::SafeAuto | ExecutionTier::NeedsConfirm
    ));
    assert!(response
        .plan
        .patch_templates
        .iter()
        .any(|t| t.step_type == StepType::BlockPlacement));
    assert!(response.execution.is_none());
}

#[tokio::test]
async fn test_s1_apply_reaches_plugin() {
    let plugin = Arc::new(ScriptedPlugin::new());
    let (pipeline, log) = pipeline(plugin.clone());
    let response = pipeline
        .submit_creation("steve", S1_MESSAGE, SubmitContext::with_mode(SubmitMode::Apply))
        .await
        .unwrap();

    let result = response.execution.unwrap();
    assert_eq!(result.patch_id, response.patch_id);
    assert_accounted(&response.plan, &result);
    assert!(result.log_trusted);
    assert_eq!(
        plugin.commands(),
        vec![
            "setblock ~1 ~ ~ minecraft:amethyst_block".to_string(),
            "setblock ~2 ~ ~ minecraft:soul_lantern".to_string(),
        ]
    );

    let entries = log.load(Some(&response.patch_id));
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == TransactionStatus::Applied));
    assert!(entries.iter().all(|e| e.has_undo()));
    assert_eq!(
        entries[0].metadata["request_id"],
        serde_json::json!(response.request_id)
    );
    assert_eq!(entries[0].metadata["player_id"], serde_json::json!("steve"));
}

// =============================================================================
// S2 - SMALL TALK
// =============================================================================

#[tokio::test]
async fn test_s2_small_talk_is_not_creation() {
    let (pipeline, log) = pipeline(Arc::new(ScriptedPlugin::new()));
    let response = pipeline
        .submit_creation(
            "alex",
            "今天的天气真不错，随便聊聊",
            SubmitContext::with_mode(SubmitMode::DryRun),
        )
        .await
        .unwrap();

    assert!(!response.decision.is_creation);
    assert!(response.decision.confidence <= 0.4);
    assert_eq!(response.plan.action, "create");
    assert!(response
        .plan
        .steps
        .iter()
        .all(|s| matches!(s.status, StepStatus::Draft | StepStatus::NeedsReview)));
    assert!(response
        .plan
        .patch_templates
        .iter()
        .all(|t| t.tier() != ExecutionTier::SafeAuto));

    let result = response.execution.unwrap();
    assert!(result.executed.is_empty());
    assert_accounted(&response.plan, &result);
    assert!(log.is_empty());
}

// =============================================================================
// S3 - EXPLICIT COORDINATES
// =============================================================================

#[tokio::test]
async fn test_s3_explicit_coordinates() {
    let (pipeline, _) = pipeline(Arc::new(ScriptedPlugin::new()));
    let response = pipeline
        .submit_creation(
            "steve",
            "在坐标 12 65 -3 放置 minecraft:amethyst_block",
            SubmitContext::default(),
        )
        .await
        .unwrap();

    let templates = &response.plan.patch_templates;
    assert_eq!(templates.len(), 1);
    assert_eq!(
        templates[0].commands(),
        ["setblock 12 65 -3 minecraft:amethyst_block".to_string()]
    );
    let metadata = &templates[0].world_patch.metadata;
    assert_eq!(metadata.coordinates, Some(Coordinates::new(12, 65, -3)));
    assert_eq!(metadata.source, Some(CoordinateSource::ExplicitCoordinates));
}

#[tokio::test]
async fn test_s3_near_player_applies() {
    let plugin = Arc::new(ScriptedPlugin::new());
    let (pipeline, _) = pipeline(plugin.clone());
    let context = SubmitContext {
        world_state: Some(WorldState {
            position: Some(Coordinates::new(10, 64, 0)),
            ..Default::default()
        }),
        mode: SubmitMode::Apply,
        ..Default::default()
    };
    let response = pipeline
        .submit_creation("steve", "在坐标 12 65 -3 放置 minecraft:amethyst_block", context)
        .await
        .unwrap();

    assert_eq!(response.plan.execution_tier, ExecutionTier::SafeAuto);
    assert_eq!(
        plugin.commands(),
        vec!["setblock 12 65 -3 minecraft:amethyst_block".to_string()]
    );
}

// =============================================================================
// S4 - DRY RUN FILTERING
// =============================================================================

#[tokio::test]
async fn test_s4_dry_run_filters_templates() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::new());
    let executor = executor(log.clone(), plugin.clone());

    let plan = plan_of(
        "mixed plan",
        vec![
            placement(1, "minecraft:glass"),
            template(
                2,
                ExecutionTier::NeedsConfirm,
                vec!["fill ~ ~ ~ ~3 ~3 ~3 minecraft:stone".to_string()],
                None,
            ),
            template(
                3,
                ExecutionTier::SafeAuto,
                vec!["say hello".to_string()],
                Some(vec!["setblock ~3 ~ ~ minecraft:air".to_string()]),
            ),
        ],
    );

    let result = executor.dry_run(&plan, None).await;

    let executed: Vec<_> = result.executed.iter().map(|e| e.template_id.as_str()).collect();
    assert_eq!(executed, vec!["tpl-step-1"]);
    let skipped: Vec<_> = result
        .skipped
        .iter()
        .map(|s| (s.template_id.as_str(), s.reason.as_str()))
        .collect();
    assert_eq!(
        skipped,
        vec![
            ("tpl-step-2", "execution_tier:needs_confirm"),
            ("tpl-step-3", "command_warnings"),
        ]
    );
    assert!(result.warnings.iter().any(|w| w.contains("command_not_whitelisted")));
    assert!(result.has_issue(ErrorKind::CommandRejected));
    assert_accounted(&plan, &result);

    let entries = log.load(Some(&result.patch_id));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, TransactionStatus::Validated);
    assert_eq!(entries[0].metadata["mode"], serde_json::json!("dry_run"));
    assert!(plugin.received().is_empty());
}

#[tokio::test]
async fn test_dry_run_is_idempotent() {
    let log = memory_log();
    let executor = executor(log.clone(), Arc::new(NullPlugin));
    let plan = plan_of(
        "two blocks",
        vec![placement(1, "minecraft:glass"), placement(2, "minecraft:lantern")],
    );

    let first = executor.dry_run(&plan, None).await;
    let persisted = log.load(Some(&first.patch_id));
    let second = executor.dry_run(&plan, None).await;

    assert_eq!(first.patch_id, second.patch_id);
    assert_eq!(log.load(Some(&second.patch_id)), persisted);
    assert_eq!(first.transactions, second.transactions);
    assert_eq!(persisted.len(), 2);
}

// =============================================================================
// S5 - ENTITY REQUEST
// =============================================================================

#[tokio::test]
async fn test_s5_armor_stand_is_not_block_request() {
    let (pipeline, _) = pipeline(Arc::new(ScriptedPlugin::new()));
    let response = pipeline
        .submit_creation("steve", "召唤一下盔甲架", SubmitContext::default())
        .await
        .unwrap();

    assert!(!response.is_block_request);
    assert!(response
        .plan
        .materials
        .iter()
        .any(|m| m.resource_id.as_deref() == Some("minecraft:armor_stand")));
}

// =============================================================================
// S6 - PLUGIN FAILURE
// =============================================================================

#[tokio::test]
async fn test_s6_failure_rolls_back_prior_templates() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::failing_on(&[2]));
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "two blocks",
        vec![placement(1, "minecraft:glass"), placement(2, "minecraft:lantern")],
    );

    let result = executor.apply("steve", &plan, None).await;

    assert_eq!(
        statuses(&log, &result.patch_id),
        vec![
            ("tpl-step-1".to_string(), TransactionStatus::Applied),
            ("tpl-step-2".to_string(), TransactionStatus::Failed),
            ("tpl-step-1".to_string(), TransactionStatus::RolledBack),
        ]
    );
    assert_eq!(
        plugin.commands(),
        vec![
            "setblock ~1 ~ ~ minecraft:glass".to_string(),
            "setblock ~2 ~ ~ minecraft:lantern".to_string(),
            "setblock ~1 ~ ~ minecraft:air".to_string(),
        ]
    );

    let executed: Vec<_> = result
        .executed
        .iter()
        .map(|e| (e.template_id.as_str(), e.status))
        .collect();
    assert_eq!(
        executed,
        vec![
            ("tpl-step-1", TransactionStatus::RolledBack),
            ("tpl-step-2", TransactionStatus::Failed),
        ]
    );
    assert!(result.has_issue(ErrorKind::PluginFailure));
    assert!(log.still_applied(&result.patch_id).is_empty());
}

#[tokio::test]
async fn test_failure_compensates_in_reverse_and_aborts_rest() {
    let log = memory_log();
    let plugin = Arc::new(ScriptedPlugin::failing_on(&[3]));
    let executor = executor(log.clone(), plugin.clone());
    let plan = plan_of(
        "four blocks",
        vec![
            placement(1, "minecraft:glass"),
            placement(2, "minecraft:glass"),
            placement(3, "minecraft:glass"),
            placement(4, "minecraft:glass"),
        ],
    );

    let result = executor.apply("steve", &plan, Some("patch-k")).await;

    assert_eq!(
        statuses(&log, "patch-k"),
        vec![
            ("tpl-step-1".to_string(), TransactionStatus::Applied),
            ("tpl-step-2".to_string(), TransactionStatus::Applied),
            ("tpl-step-3".to_string(), TransactionStatus::Failed),
            ("tpl-step-2".to_string(), TransactionStatus::RolledBack),
            ("tpl-step-1".to_string(), TransactionStatus::RolledBack),
        ]
    );
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].template_id, "tpl-step-4");
    assert_eq!(result.skipped[0].reason, "aborted_after_failure");
    assert_accounted(&plan, &result);
}

// =============================================================================
// REQUEST VALIDATION
// =============================================================================

#[tokio::test]
async fn test_bad_input_persists_nothing() {
    let (pipeline, log) = pipeline(Arc::new(ScriptedPlugin::new()));

    let err = pipeline
        .submit_creation("", S1_MESSAGE, SubmitContext::with_mode(SubmitMode::Apply))
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::BadInput(_)));

    let err = pipeline
        .submit_creation(
            "steve",
            "放置\u{7}玻璃",
            SubmitContext::with_mode(SubmitMode::Apply),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::BadInput));
    assert!(log.is_empty());
}
