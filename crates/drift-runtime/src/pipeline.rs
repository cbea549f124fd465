//! End-to-end handling of one creation request.

use crate::error::RuntimeError;
use crate::executor::{ExecutionOptions, PatchExecutor};
use crate::locks::CancelFlag;
use crate::patch_id::derive_patch_id;
use crate::plugin::{OutboxPlugin, WorldPlugin};
use chrono::{DateTime, Utc};
use drift_catalog::ResourceCatalog;
use drift_core::{
    CreationIntentDecision, CreationPlan, DriftConfig, ExecutionResult, PlayerContext, WorldState,
};
use drift_intent::IntentClassifier;
use drift_planner::PlanTransformer;
use drift_policy::PatchValidator;
use drift_txlog::TransactionLog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// How far a request travels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitMode {
    /// Classify and plan only.
    #[default]
    PlanOnly,
    DryRun,
    Apply,
}

/// Optional context accompanying a request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitContext {
    #[serde(default)]
    pub previous_message: Option<String>,

    #[serde(default)]
    pub language_hint: Option<String>,

    #[serde(default)]
    pub world_state: Option<WorldState>,

    #[serde(default)]
    pub mode: SubmitMode,

    /// Overrides the derived patch id.
    #[serde(default)]
    pub patch_id: Option<String>,

    #[serde(skip)]
    pub cancel: CancelFlag,
}

impl SubmitContext {
    pub fn with_mode(mode: SubmitMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    fn player_context(&self) -> PlayerContext {
        PlayerContext {
            previous_message: self.previous_message.clone(),
            language_hint: self.language_hint.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationResponse {
    pub request_id: String,
    pub received_at: DateTime<Utc>,
    pub decision: CreationIntentDecision,
    pub is_block_request: bool,
    pub plan: CreationPlan,
    pub patch_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

/// Classifier, transformer and executor wired over one shared catalog.
pub struct CreationPipeline {
    classifier: IntentClassifier,
    transformer: PlanTransformer,
    executor: PatchExecutor,
}

impl CreationPipeline {
    pub fn new(
        catalog: Arc<ResourceCatalog>,
        config: &DriftConfig,
        log: Arc<TransactionLog>,
        plugin: Arc<dyn WorldPlugin>,
    ) -> Self {
        let validator = Arc::new(PatchValidator::new(catalog.clone(), config.policy.clone()));
        Self {
            classifier: IntentClassifier::new(catalog.clone(), config.intent.clone()),
            transformer: PlanTransformer::new(catalog, validator.clone()),
            executor: PatchExecutor::new(log, plugin, validator, &config.executor),
        }
    }

    /// Build the pipeline the way the server runs it: catalog from the
    /// configured manifest, file-backed log and the outbox plugin.
    pub async fn from_config(config: &DriftConfig) -> Result<Self, RuntimeError> {
        let catalog = Arc::new(ResourceCatalog::from_optional_path(
            config.catalog.manifest_path.clone(),
        )?);
        let log = Arc::new(TransactionLog::from_config(&config.transaction_log).await?);
        let plugin: Arc<dyn WorldPlugin> =
            Arc::new(OutboxPlugin::new(config.executor.outbox_path.clone()));

        tracing::info!(
            resources = catalog.len(),
            transactions = log.len(),
            outbox = %config.executor.outbox_path.display(),
            "Creation pipeline ready"
        );
        Ok(Self::new(catalog, config, log, plugin))
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn transformer(&self) -> &PlanTransformer {
        &self.transformer
    }

    pub fn executor(&self) -> &PatchExecutor {
        &self.executor
    }

    /// Classify and plan without executing anything.
    pub fn plan(
        &self,
        message: &str,
        context: &SubmitContext,
    ) -> (CreationIntentDecision, CreationPlan) {
        let decision = self.classifier.classify(message, &context.player_context());
        let plan = self
            .transformer
            .transform(&decision, Some(message), context.world_state.as_ref());
        (decision, plan)
    }

    /// Handle one chat message from `player_id`.
    ///
    /// Malformed input fails with `BadInput` before anything is logged.
    /// Execution problems are reported inside the returned result.
    pub async fn submit_creation(
        &self,
        player_id: &str,
        message: &str,
        context: SubmitContext,
    ) -> Result<CreationResponse, RuntimeError> {
        if player_id.trim().is_empty() {
            return Err(RuntimeError::BadInput("player_id must not be empty".to_string()));
        }
        self.classifier.check_message(message)?;

        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "submit_creation",
            request_id = %request_id,
            player_id = %player_id,
            mode = ?context.mode,
        );

        let response = async {
            let received_at = Utc::now();
            let (decision, plan) = self.plan(message, &context);
            let is_block_request = self.classifier.is_block_request(&decision);
            let patch_id = context
                .patch_id
                .clone()
                .unwrap_or_else(|| derive_patch_id(&plan));

            tracing::debug!(
                is_creation = decision.is_creation,
                confidence = decision.confidence,
                tier = %plan.execution_tier,
                templates = plan.patch_templates.len(),
                "Plan built"
            );

            let options = ExecutionOptions {
                patch_id: Some(patch_id.clone()),
                request_id: Some(request_id.clone()),
                cancel: context.cancel.clone(),
            };
            let execution = match context.mode {
                SubmitMode::PlanOnly => None,
                SubmitMode::DryRun => Some(self.executor.dry_run_with(&plan, &options).await),
                SubmitMode::Apply => {
                    Some(self.executor.apply_with(player_id, &plan, &options).await)
                }
            };

            CreationResponse {
                request_id: request_id.clone(),
                received_at,
                decision,
                is_block_request,
                plan,
                patch_id,
                execution,
            }
        }
        .instrument(span)
        .await;
        Ok(response)
    }

    /// Undo what is still applied of `patch_id`.
    pub async fn rollback(&self, player_id: &str, patch_id: &str) -> ExecutionResult {
        self.executor.rollback(player_id, patch_id).await
    }
}
