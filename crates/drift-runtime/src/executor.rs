//! Dry-run, apply and rollback of creation plans.

use crate::locks::{CancelFlag, PlayerLocks};
use crate::patch_id::derive_patch_id;
use crate::plugin::WorldPlugin;
use drift_core::{
    ErrorKind, ExecutedEntry, ExecutionIssue, ExecutionResult, ExecutionTier, ExecutorConfig,
    IRREVERSIBLE_KEY, PatchTemplate, TransactionEntry, TransactionStatus, WorldPatch,
    CreationPlan,
};
use drift_policy::PatchValidator;
use drift_txlog::{RecordOutcome, TransactionFilter, TransactionLog};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub const REASON_ABORTED: &str = "aborted_after_failure";
pub const REASON_ALREADY_APPLIED: &str = "already_applied";
pub const REASON_CANCELLED: &str = "cancelled";
pub const REASON_COMMAND_WARNINGS: &str = "command_warnings";

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Caller-supplied patch id; derived from the plan when `None`.
    pub patch_id: Option<String>,
    /// Written into transaction metadata.
    pub request_id: Option<String>,
    pub cancel: CancelFlag,
}

impl ExecutionOptions {
    pub fn with_patch_id(patch_id: Option<&str>) -> Self {
        Self {
            patch_id: patch_id.map(str::to_string),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    DryRun,
    Apply,
}

impl Mode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Apply => "apply",
        }
    }
}

/// A template applied earlier in the current call.
struct AppliedStep<'a> {
    template: &'a PatchTemplate,
    executed_index: usize,
}

/// Runs plan templates against the world plugin and records every step in
/// the transaction log.
pub struct PatchExecutor {
    log: Arc<TransactionLog>,
    plugin: Arc<dyn WorldPlugin>,
    validator: Arc<PatchValidator>,
    locks: PlayerLocks,
    plugin_timeout: Duration,
}

impl PatchExecutor {
    pub fn new(
        log: Arc<TransactionLog>,
        plugin: Arc<dyn WorldPlugin>,
        validator: Arc<PatchValidator>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            log,
            plugin,
            validator,
            locks: PlayerLocks::new(),
            plugin_timeout: config.plugin_timeout(),
        }
    }

    pub fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Validate the plan's auto-executable templates and log them as
    /// `validated`. Nothing reaches the game.
    pub async fn dry_run(&self, plan: &CreationPlan, patch_id: Option<&str>) -> ExecutionResult {
        self.dry_run_with(plan, &ExecutionOptions::with_patch_id(patch_id))
            .await
    }

    pub async fn dry_run_with(
        &self,
        plan: &CreationPlan,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        self.run(Mode::DryRun, None, plan, options).await
    }

    /// Send the plan's auto-executable templates to the plugin.
    ///
    /// Holds `player_id`'s lock for the whole call.
    pub async fn apply(
        &self,
        player_id: &str,
        plan: &CreationPlan,
        patch_id: Option<&str>,
    ) -> ExecutionResult {
        self.apply_with(player_id, plan, &ExecutionOptions::with_patch_id(patch_id))
            .await
    }

    pub async fn apply_with(
        &self,
        player_id: &str,
        plan: &CreationPlan,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let _guard = self.locks.acquire(player_id).await;
        self.run(Mode::Apply, Some(player_id), plan, options).await
    }

    async fn run(
        &self,
        mode: Mode,
        player_id: Option<&str>,
        plan: &CreationPlan,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let patch_id = options
            .patch_id
            .clone()
            .unwrap_or_else(|| derive_patch_id(plan));
        let span = tracing::info_span!(
            "execute_plan",
            patch_id = %patch_id,
            mode = mode.as_str(),
            request_id = options.request_id.as_deref().unwrap_or("-"),
        );

        async {
            let mut run = Run {
                executor: self,
                mode,
                player_id,
                options,
                result: ExecutionResult::new(&patch_id),
                applied: Vec::new(),
            };
            run.execute(plan).await;
            run.result
        }
        .instrument(span)
        .await
    }

    /// Undo every step of `patch_id` that is still applied, newest first.
    pub async fn rollback(&self, player_id: &str, patch_id: &str) -> ExecutionResult {
        let _guard = self.locks.acquire(player_id).await;
        let span = tracing::info_span!("rollback_patch", patch_id = %patch_id, player_id = %player_id);

        async {
            let mut result = ExecutionResult::new(patch_id);
            let applied = self.log.still_applied(patch_id);
            if applied.is_empty() {
                result.warnings.push("nothing_to_roll_back".to_string());
                return result;
            }

            for entry in applied.iter().rev() {
                let Some(undo) = entry.undo_patch.as_ref().filter(|_| entry.has_undo()) else {
                    result.skip(&entry.template_id, "irreversible");
                    continue;
                };

                match self.send(undo).await {
                    Ok(()) => {
                        let compensation =
                            compensation_entry(patch_id, entry).with_meta("player_id", player_id);
                        let status = if record_into(&self.log, &mut result, compensation).await {
                            TransactionStatus::RolledBack
                        } else {
                            TransactionStatus::Applied
                        };
                        result.executed.push(ExecutedEntry {
                            template_id: entry.template_id.clone(),
                            step_id: entry.step_id.clone(),
                            commands: entry.commands.clone(),
                            status,
                        });
                    }
                    Err(message) => {
                        tracing::warn!(template_id = %entry.template_id, error = %message, "Rollback failed");
                        result.warnings.push(format!("rollback_failed: {}", entry.template_id));
                        result.issues.push(ExecutionIssue::new(
                            ErrorKind::PluginFailure,
                            Some(&entry.template_id),
                            message,
                        ));
                        result.skip(&entry.template_id, "rollback_failed");
                    }
                }
            }

            tracing::info!(rolled_back = result.executed.len(), "Patch rolled back");
            result
        }
        .instrument(span)
        .await
    }

    /// Deliver one patch; a missing acknowledgement within the timeout is a
    /// failure.
    async fn send(&self, patch: &WorldPatch) -> Result<(), String> {
        match tokio::time::timeout(self.plugin_timeout, self.plugin.apply_patch(patch)).await {
            Ok(Ok(ack)) if ack.applied => Ok(()),
            Ok(Ok(ack)) => Err(ack
                .error
                .unwrap_or_else(|| "plugin reported the patch as not applied".to_string())),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "plugin did not acknowledge within {} ms",
                self.plugin_timeout.as_millis()
            )),
        }
    }
}

/// State of one dry-run or apply call.
struct Run<'a> {
    executor: &'a PatchExecutor,
    mode: Mode,
    player_id: Option<&'a str>,
    options: &'a ExecutionOptions,
    result: ExecutionResult,
    applied: Vec<AppliedStep<'a>>,
}

impl<'a> Run<'a> {
    async fn execute(&mut self, plan: &'a CreationPlan) {
        if self.mode == Mode::Apply && plan.execution_tier == ExecutionTier::Blocked {
            tracing::warn!(templates = plan.patch_templates.len(), "Plan is blocked, refusing to apply");
            self.result.issues.push(ExecutionIssue::new(
                ErrorKind::TierBlocked,
                None,
                "plan execution tier is blocked",
            ));
            for template in &plan.patch_templates {
                self.result.skip(
                    &template.template_id,
                    format!("execution_tier:{}", ExecutionTier::Blocked),
                );
            }
            return;
        }

        let mut abort_reason: Option<&'static str> = None;
        for template in &plan.patch_templates {
            if abort_reason.is_none() && self.options.cancel.is_cancelled() {
                tracing::info!(template_id = %template.template_id, "Execution cancelled");
                if self.mode == Mode::Apply {
                    self.compensate().await;
                }
                abort_reason = Some(REASON_CANCELLED);
            }
            if let Some(reason) = abort_reason {
                self.result.skip(&template.template_id, reason);
                continue;
            }

            if let Some(reason) = self.filter(template) {
                tracing::warn!(template_id = %template.template_id, reason = %reason, "Template skipped");
                self.result.skip(&template.template_id, reason);
                continue;
            }

            let proceed = match self.mode {
                Mode::DryRun => self.validate_step(template).await,
                Mode::Apply => self.apply_step(template).await,
            };
            if !proceed {
                abort_reason = Some(REASON_ABORTED);
            }
        }
    }

    /// Skip reason for a template that must not run, if any.
    fn filter(&mut self, template: &PatchTemplate) -> Option<String> {
        let tier = template.tier();
        if tier != ExecutionTier::SafeAuto {
            return Some(format!("execution_tier:{}", tier));
        }

        let rejected: Vec<_> = template
            .commands()
            .iter()
            .filter_map(|cmd| self.executor.validator.check_command(cmd).err())
            .collect();
        if !rejected.is_empty() {
            for issue in rejected {
                self.result.warnings.push(issue.to_string());
                self.result.issues.push(ExecutionIssue::new(
                    ErrorKind::CommandRejected,
                    Some(&template.template_id),
                    issue.message,
                ));
            }
            return Some(REASON_COMMAND_WARNINGS.to_string());
        }

        if self.mode == Mode::Apply
            && self
                .executor
                .log
                .latest_status(&self.result.patch_id, &template.step_id)
                == Some(TransactionStatus::Applied)
        {
            return Some(REASON_ALREADY_APPLIED.to_string());
        }

        None
    }

    fn entry(&self, template: &PatchTemplate, status: TransactionStatus) -> TransactionEntry {
        let mut entry = TransactionEntry::new(
            self.result.patch_id.clone(),
            template.template_id.clone(),
            template.step_id.clone(),
            template.commands().to_vec(),
            status,
        )
        .with_undo(template.undo_patch.clone())
        .with_meta("mode", self.mode.as_str());
        if let Some(request_id) = &self.options.request_id {
            entry = entry.with_meta("request_id", request_id.as_str());
        }
        if let Some(player_id) = self.player_id {
            entry = entry.with_meta("player_id", player_id);
        }
        entry
    }

    /// Returns false when the remaining templates must be aborted.
    async fn validate_step(&mut self, template: &'a PatchTemplate) -> bool {
        let entry = self.entry(template, TransactionStatus::Validated);
        let logged = record_into(&self.executor.log, &mut self.result, entry).await;
        self.result.executed.push(executed(template, TransactionStatus::Validated));
        logged
    }

    async fn apply_step(&mut self, template: &'a PatchTemplate) -> bool {
        if let Err(message) = self.executor.send(&template.world_patch).await {
            tracing::warn!(
                template_id = %template.template_id,
                error = %message,
                "Plugin call failed"
            );
            self.result.issues.push(ExecutionIssue::new(
                ErrorKind::PluginFailure,
                Some(&template.template_id),
                message.clone(),
            ));
            let failed = self
                .entry(template, TransactionStatus::Failed)
                .with_meta("error", message);
            record_into(&self.executor.log, &mut self.result, failed).await;
            self.result.executed.push(executed(template, TransactionStatus::Failed));
            self.compensate().await;
            return false;
        }

        let mut entry = self.entry(template, TransactionStatus::Applied);
        if !template.has_undo() {
            entry = entry.with_meta(IRREVERSIBLE_KEY, true);
        }
        let logged = record_into(&self.executor.log, &mut self.result, entry).await;

        tracing::info!(
            template_id = %template.template_id,
            commands = template.commands().len(),
            "Template applied"
        );
        self.applied.push(AppliedStep {
            template,
            executed_index: self.result.executed.len(),
        });
        self.result.executed.push(executed(template, TransactionStatus::Applied));
        logged
    }

    /// Roll back what this call applied, newest first.
    async fn compensate(&mut self) {
        while let Some(step) = self.applied.pop() {
            let template = step.template;
            let Some(undo) = template.undo_patch.as_ref().filter(|_| template.has_undo()) else {
                self.result
                    .warnings
                    .push(format!("irreversible: {}", template.template_id));
                continue;
            };

            match self.executor.send(undo).await {
                Ok(()) => {
                    let entry = self
                        .entry(template, TransactionStatus::RolledBack)
                        .with_meta("compensation", true);
                    record_into(&self.executor.log, &mut self.result, entry).await;
                    self.result.executed[step.executed_index].status =
                        TransactionStatus::RolledBack;
                    tracing::info!(template_id = %template.template_id, "Template rolled back");
                }
                Err(message) => {
                    tracing::warn!(
                        template_id = %template.template_id,
                        error = %message,
                        "Compensation failed"
                    );
                    self.result
                        .warnings
                        .push(format!("rollback_failed: {}", template.template_id));
                    self.result.issues.push(ExecutionIssue::new(
                        ErrorKind::PluginFailure,
                        Some(&template.template_id),
                        message,
                    ));
                }
            }
        }
    }
}

fn executed(template: &PatchTemplate, status: TransactionStatus) -> ExecutedEntry {
    ExecutedEntry {
        template_id: template.template_id.clone(),
        step_id: template.step_id.clone(),
        commands: template.commands().to_vec(),
        status,
    }
}

/// `rolled_back` entry compensating a logged `applied` entry.
fn compensation_entry(patch_id: &str, applied: &TransactionEntry) -> TransactionEntry {
    TransactionEntry::new(
        patch_id,
        applied.template_id.clone(),
        applied.step_id.clone(),
        applied.commands.clone(),
        TransactionStatus::RolledBack,
    )
    .with_undo(applied.undo_patch.clone())
    .with_meta("mode", "rollback")
    .with_meta("rollback_of_seq", applied.seq)
}

/// Record `entry` and mirror it into `result`.
///
/// Returns false after a log write failure, which marks the result
/// untrusted.
async fn record_into(
    log: &TransactionLog,
    result: &mut ExecutionResult,
    mut entry: TransactionEntry,
) -> bool {
    match log.record(entry.clone()).await {
        Ok(RecordOutcome::Appended(seq)) => {
            entry.seq = seq;
            result.transactions.push(entry);
            true
        }
        Ok(RecordOutcome::Duplicate) => {
            let existing = log
                .query(&TransactionFilter {
                    patch_id: Some(entry.patch_id.clone()),
                    step_id: Some(entry.step_id.clone()),
                    status: Some(entry.status),
                    limit: Some(1),
                })
                .pop();
            result.transactions.push(existing.unwrap_or(entry));
            true
        }
        Err(e) => {
            tracing::warn!(
                patch_id = %entry.patch_id,
                step_id = %entry.step_id,
                status = %entry.status,
                error = %e,
                "Transaction log write failed"
            );
            result.issues.push(ExecutionIssue::new(
                ErrorKind::LogWriteFailure,
                Some(&entry.template_id),
                e.to_string(),
            ));
            result.log_trusted = false;
            false
        }
    }
}
