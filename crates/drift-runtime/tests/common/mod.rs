//! Shared fixtures for the runtime integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use drift_catalog::ResourceCatalog;
use drift_core::{
    CreationPlan, ExecutionTier, ExecutionValidation, ExecutorConfig, PatchTemplate, PolicyConfig,
    StepStatus, StepType, TransactionEntry, WorldDamageRisk, WorldPatch,
};
use drift_policy::PatchValidator;
use drift_runtime::{PatchExecutor, PluginAck, PluginError, WorldPlugin};
use drift_txlog::{MemoryStorage, TransactionLog, TransactionStorage, TxLogError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// PLUGINS
// =============================================================================

/// Records every patch it receives and fails the configured calls.
#[derive(Default)]
pub struct ScriptedPlugin {
    received: Mutex<Vec<WorldPatch>>,
    /// 1-based call numbers that are answered with a rejection.
    fail_calls: Vec<usize>,
    delay: Option<Duration>,
}

impl ScriptedPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_calls: calls.to_vec(),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn received(&self) -> Vec<WorldPatch> {
        self.received.lock().unwrap().clone()
    }

    /// Commands of every received patch, flattened in call order.
    pub fn commands(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .flat_map(|p| p.mc.commands)
            .collect()
    }
}

#[async_trait]
impl WorldPlugin for ScriptedPlugin {
    async fn apply_patch(&self, patch: &WorldPatch) -> Result<PluginAck, PluginError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let call = {
            let mut received = self.received.lock().unwrap();
            received.push(patch.clone());
            received.len()
        };
        if self.fail_calls.contains(&call) {
            return Ok(PluginAck::rejected(format!("scripted failure on call {}", call)));
        }
        Ok(PluginAck::applied())
    }
}

// =============================================================================
// STORAGE
// =============================================================================

/// In-memory storage whose appends start failing after `healthy` writes.
pub struct FlakyStorage {
    inner: MemoryStorage,
    healthy: usize,
    appends: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(healthy: usize) -> Self {
        Self {
            inner: MemoryStorage::new(),
            healthy,
            appends: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TransactionStorage for FlakyStorage {
    async fn append(&self, entry: &TransactionEntry) -> Result<(), TxLogError> {
        if self.appends.fetch_add(1, Ordering::SeqCst) >= self.healthy {
            return Err(TxLogError::Storage("disk full".to_string()));
        }
        self.inner.append(entry).await
    }

    async fn load_all(&self) -> Result<Vec<TransactionEntry>, TxLogError> {
        self.inner.load_all().await
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub fn catalog() -> Arc<ResourceCatalog> {
    Arc::new(ResourceCatalog::embedded().unwrap())
}

pub fn validator() -> Arc<PatchValidator> {
    Arc::new(PatchValidator::new(catalog(), PolicyConfig::default()))
}

pub fn executor(log: Arc<TransactionLog>, plugin: Arc<dyn WorldPlugin>) -> PatchExecutor {
    executor_with_timeout(log, plugin, Duration::from_millis(5000))
}

pub fn executor_with_timeout(
    log: Arc<TransactionLog>,
    plugin: Arc<dyn WorldPlugin>,
    timeout: Duration,
) -> PatchExecutor {
    let config = ExecutorConfig {
        plugin_timeout_ms: timeout.as_millis() as u64,
        ..Default::default()
    };
    PatchExecutor::new(log, plugin, validator(), &config)
}

pub fn memory_log() -> Arc<TransactionLog> {
    Arc::new(TransactionLog::in_memory())
}

/// A block placement template at `~n ~ ~` with its air undo.
pub fn placement(n: usize, block: &str) -> PatchTemplate {
    template(
        n,
        ExecutionTier::SafeAuto,
        vec![format!("setblock ~{} ~ ~ {}", n, block)],
        Some(vec![format!("setblock ~{} ~ ~ minecraft:air", n)]),
    )
}

pub fn template(
    n: usize,
    tier: ExecutionTier,
    commands: Vec<String>,
    undo: Option<Vec<String>>,
) -> PatchTemplate {
    let step_id = format!("step-{}", n);
    let template_id = format!("tpl-step-{}", n);
    let mut world_patch = WorldPatch::with_commands(commands);
    world_patch.metadata.step_id = step_id.clone();
    world_patch.metadata.template_id = template_id.clone();

    PatchTemplate {
        template_id,
        step_id,
        status: StepStatus::Resolved,
        summary: format!("step {}", n),
        step_type: StepType::BlockPlacement,
        world_patch,
        undo_patch: undo.map(WorldPatch::with_commands),
        validation: ExecutionValidation {
            execution_tier: tier,
            errors: Vec::new(),
            warnings: Vec::new(),
            world_damage_risk: WorldDamageRisk::Low,
            requires_confirmation: tier != ExecutionTier::SafeAuto,
        },
        notes: Vec::new(),
    }
}

pub fn plan_of(summary: &str, templates: Vec<PatchTemplate>) -> CreationPlan {
    let mut plan = CreationPlan {
        action: "build".to_string(),
        summary: summary.to_string(),
        confidence: 0.9,
        materials: Vec::new(),
        unresolved_tokens: Vec::new(),
        steps: Vec::new(),
        patch_templates: templates,
        notes: Vec::new(),
        execution_tier: ExecutionTier::SafeAuto,
        unsafe_steps: Vec::new(),
    };
    plan.refresh_aggregates();
    plan
}

/// `executed + skipped` covers every template of the plan.
pub fn assert_accounted(plan: &CreationPlan, result: &drift_core::ExecutionResult) {
    assert_eq!(
        result.executed.len() + result.skipped.len(),
        plan.patch_templates.len(),
        "executed {:?} skipped {:?}",
        result.executed,
        result.skipped
    );
}
