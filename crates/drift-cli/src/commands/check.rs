//! `drift check`: validate the configuration, the resource manifest and the
//! transaction log files on disk.

use super::print_json;
use anyhow::{Result, bail};
use drift_catalog::ResourceManifest;
use drift_core::DriftConfig;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

const TRANSACTION_ENTRY_SCHEMA: &str =
    include_str!("../../../../schemas/TransactionEntry.schema.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckFinding {
    pub severity: Severity,
    pub category: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Line number or field path inside `file`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl CheckFinding {
    fn new(severity: Severity, category: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
            file: None,
            location: None,
        }
    }

    fn error(category: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: &'static str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

pub fn check(config_path: &Path) -> Result<()> {
    let findings = run_checks(config_path)?;
    let errors = findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();

    print_json(&serde_json::json!({
        "config": config_path,
        "errors": errors,
        "findings": findings,
    }))?;
    if errors > 0 {
        bail!("configuration check failed with {} error(s)", errors);
    }
    Ok(())
}

pub(crate) fn run_checks(config_path: &Path) -> Result<Vec<CheckFinding>> {
    let mut findings = Vec::new();

    let config = if config_path.exists() {
        match DriftConfig::from_file(config_path) {
            Ok(config) => config,
            Err(e) => {
                findings.push(CheckFinding::error("config", e.to_string()).with_file(config_path));
                return Ok(findings);
            }
        }
    } else {
        findings.push(
            CheckFinding::new(Severity::Info, "config", "config file not found, using defaults")
                .with_file(config_path),
        );
        DriftConfig::default()
    };

    findings.extend(check_manifest(&config));
    findings.extend(check_transaction_files(&config.transaction_log.directory)?);

    if let Some(parent) = config.executor.outbox_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            findings.push(
                CheckFinding::warning("executor", "outbox directory does not exist yet")
                    .with_file(parent),
            );
        }
    }

    Ok(findings)
}

fn check_manifest(config: &DriftConfig) -> Vec<CheckFinding> {
    let Some(path) = &config.catalog.manifest_path else {
        return Vec::new();
    };
    let loaded = ResourceManifest::from_file(path).and_then(|m| m.validate().map(|_| m));
    match loaded {
        Ok(manifest) if manifest.resources.is_empty() => {
            vec![CheckFinding::warning("manifest", "manifest defines no resources").with_file(path)]
        }
        Ok(_) => Vec::new(),
        Err(e) => vec![CheckFinding::error("manifest", e.to_string()).with_file(path)],
    }
}

/// Every complete line of every day file must match the transaction entry
/// schema.
fn check_transaction_files(directory: &Path) -> Result<Vec<CheckFinding>> {
    let mut findings = Vec::new();
    if !directory.exists() {
        return Ok(findings);
    }

    let schema: JsonValue = serde_json::from_str(TRANSACTION_ENTRY_SCHEMA)?;
    let validator = match jsonschema::validator_for(&schema) {
        Ok(v) => v,
        Err(e) => {
            findings.push(CheckFinding::error(
                "json-schema",
                format!("failed to compile transaction schema: {}", e),
            ));
            return Ok(findings);
        }
    };

    let mut files: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "jsonl"))
        .collect();
    files.sort();

    for file in files {
        let content = fs::read_to_string(&file)?;
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value: JsonValue = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    findings.push(
                        CheckFinding::error("transaction-log", format!("unreadable entry: {}", e))
                            .with_file(&file)
                            .with_location(format!("line {}", idx + 1)),
                    );
                    continue;
                }
            };
            for error in validator.iter_errors(&value) {
                let path = error.instance_path().to_string();
                let location = if path.is_empty() {
                    format!("line {}", idx + 1)
                } else {
                    format!("line {} {}", idx + 1, path)
                };
                findings.push(
                    CheckFinding::error("transaction-log", error.to_string())
                        .with_file(&file)
                        .with_location(location),
                );
            }
        }
    }

    Ok(findings)
}
