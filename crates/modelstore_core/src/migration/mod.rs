//! Schema migration engine.
//!
//! # Responsibility
//! - Classify a raw document's declared schema version against the target.
//! - Walk the registered step chain forward when a path exists.
//!
//! # Invariants
//! - A document newer than the target is returned untouched as `Unsupported`,
//!   including oversized or suffixed versions whose leading triplet is newer.
//! - A current document yields `UpToDate`, so migrating twice is a no-op.
//! - `migratedFromVersion` is written once and never overwritten.
//! - The engine is pure: no I/O, no shared mutable state.

pub mod raw;
mod steps;

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::model::version::{compare_leading_triplet, SchemaVersion, FLOOR_SCHEMA_VERSION};
pub use raw::RawDocument;
pub use steps::registered_steps;

/// Result of one step transform.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub document: RawDocument,
    pub warnings: Vec<String>,
}

impl StepOutput {
    pub fn clean(document: RawDocument) -> Self {
        Self {
            document,
            warnings: Vec::new(),
        }
    }
}

/// Pure transform from one exact schema version to the next.
pub type StepTransform = fn(RawDocument) -> StepOutput;

/// One registered `from -> to` schema rewrite.
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    pub description: &'static str,
    pub transform: StepTransform,
}

/// Terminal classification of a migration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationStatus {
    UpToDate,
    Upgraded,
    ManualRequired,
    Unsupported,
}

impl MigrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpToDate => "up-to-date",
            Self::Upgraded => "upgraded",
            Self::ManualRequired => "manual-required",
            Self::Unsupported => "unsupported",
        }
    }

    /// Whether the document can be handed to callers as a typed document.
    pub fn is_readable(self) -> bool {
        matches!(self, Self::UpToDate | Self::Upgraded)
    }
}

impl Display for MigrationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit record of one applied step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedStep {
    pub from: String,
    pub to: String,
    pub description: String,
}

/// Full result of one migration attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationOutcome {
    pub status: MigrationStatus,
    pub document: RawDocument,
    /// Declared version, or the floor sentinel when none was declared.
    pub from_version: String,
    pub target_version: String,
    /// Version the cursor stopped at.
    pub reached_version: String,
    pub applied_steps: Vec<AppliedStep>,
    pub warnings: Vec<String>,
    pub reason: Option<String>,
}

/// Ordered step chain plus the version it migrates to.
#[derive(Debug, Clone)]
pub struct MigrationEngine {
    target: SchemaVersion,
    steps: Vec<MigrationStep>,
}

impl Default for MigrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationEngine {
    /// Engine with the built-in chain targeting the current schema version.
    pub fn new() -> Self {
        Self::with_steps(SchemaVersion::current(), registered_steps().to_vec())
    }

    /// Engine with a caller-provided chain.
    pub fn with_steps(target: SchemaVersion, steps: Vec<MigrationStep>) -> Self {
        Self { target, steps }
    }

    pub fn target(&self) -> SchemaVersion {
        self.target
    }

    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Whether `document` declares a schema this engine must not touch.
    pub fn is_unsupported(&self, document: &RawDocument) -> bool {
        document
            .declared_schema_version()
            .is_some_and(|declared| self.is_newer_than_target(&declared))
    }

    fn is_newer_than_target(&self, declared: &str) -> bool {
        compare_leading_triplet(declared, self.target) == Some(Ordering::Greater)
    }

    /// Classifies `document` and upgrades it when a step path exists.
    pub fn migrate(&self, document: RawDocument) -> MigrationOutcome {
        let target_version = self.target.to_string();
        let from_version = document
            .declared_schema_version()
            .unwrap_or_else(|| FLOOR_SCHEMA_VERSION.to_string());

        if self.is_newer_than_target(&from_version) {
            let reason = format!(
                "document schema {from_version} is newer than supported {}; upgrade the software",
                self.target
            );
            return MigrationOutcome {
                status: MigrationStatus::Unsupported,
                document,
                reached_version: from_version.clone(),
                from_version,
                target_version,
                applied_steps: Vec::new(),
                warnings: Vec::new(),
                reason: Some(reason),
            };
        }

        let from = match from_version.parse::<SchemaVersion>() {
            Ok(version) => version,
            Err(_) => {
                let reason = format!(
                    "declared schema version `{from_version}` is not major.minor.patch; no migration path"
                );
                return MigrationOutcome {
                    status: MigrationStatus::ManualRequired,
                    document,
                    reached_version: from_version.clone(),
                    from_version,
                    target_version,
                    applied_steps: Vec::new(),
                    warnings: Vec::new(),
                    reason: Some(reason),
                };
            }
        };

        if from == self.target {
            return MigrationOutcome {
                status: MigrationStatus::UpToDate,
                document,
                reached_version: target_version.clone(),
                from_version,
                target_version,
                applied_steps: Vec::new(),
                warnings: Vec::new(),
                reason: None,
            };
        }

        let mut cursor = from;
        let mut current = document;
        let mut applied_steps = Vec::new();
        let mut warnings = Vec::new();
        let mut blocked = None;

        while cursor < self.target {
            let Some(step) = self.steps.iter().find(|step| step.from == cursor) else {
                blocked = Some(format!(
                    "no migration step registered from {cursor}; gap {cursor} -> {}",
                    self.target
                ));
                break;
            };
            if step.to <= step.from {
                blocked = Some(format!(
                    "migration step {} -> {} does not advance the schema",
                    step.from, step.to
                ));
                break;
            }

            let output = (step.transform)(current);
            current = output.document;
            warnings.extend(output.warnings);
            applied_steps.push(AppliedStep {
                from: step.from.to_string(),
                to: step.to.to_string(),
                description: step.description.to_string(),
            });
            cursor = step.to;
        }

        if blocked.is_none() && cursor != self.target {
            blocked = Some(format!(
                "migration chain overshoots target {}: reached {cursor}",
                self.target
            ));
        }

        if let Some(reason) = blocked {
            return MigrationOutcome {
                status: MigrationStatus::ManualRequired,
                document: current,
                from_version,
                target_version,
                reached_version: cursor.to_string(),
                applied_steps,
                warnings,
                reason: Some(reason),
            };
        }

        stamp_upgrade(&mut current, &target_version, &from_version, &warnings);
        MigrationOutcome {
            status: MigrationStatus::Upgraded,
            document: current,
            from_version,
            reached_version: target_version.clone(),
            target_version,
            applied_steps,
            warnings,
            reason: None,
        }
    }
}

fn stamp_upgrade(document: &mut RawDocument, target: &str, from: &str, warnings: &[String]) {
    let manifest = document.manifest_object_mut();
    manifest.insert(
        "schemaVersion".to_string(),
        Value::String(target.to_string()),
    );
    let already_migrated = manifest
        .get("migratedFromVersion")
        .is_some_and(|value| !value.is_null());
    if !already_migrated {
        manifest.insert(
            "migratedFromVersion".to_string(),
            Value::String(from.to_string()),
        );
    }
    manifest.insert(
        "migrationWarnings".to_string(),
        Value::Array(warnings.iter().cloned().map(Value::String).collect()),
    );
}
