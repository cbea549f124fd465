//! Stable patch ids.

use drift_core::CreationPlan;
use sha2::{Digest, Sha256};

const MAX_SLUG_LEN: usize = 40;

/// `<slug>-<hash>` derived from the plan summary and template commands.
///
/// The same plan always yields the same id, so repeated dry runs land on
/// the same transaction-log key.
pub fn derive_patch_id(plan: &CreationPlan) -> String {
    format!("{}-{}", slug(&plan.summary), short_hash(plan))
}

fn slug(summary: &str) -> String {
    let mut out = String::with_capacity(summary.len());
    for c in summary.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.truncate(MAX_SLUG_LEN);
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "plan".to_string()
    } else {
        trimmed.to_string()
    }
}

/// First 4 bytes (8 hex chars) of SHA-256 over the plan's content.
fn short_hash(plan: &CreationPlan) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plan.summary.as_bytes());
    for template in &plan.patch_templates {
        hasher.update(b"\n");
        hasher.update(template.template_id.as_bytes());
        for command in template.commands() {
            hasher.update(b"\x1f");
            hasher.update(command.as_bytes());
        }
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..4])
}
