//! Document store contracts and filesystem implementation.
//!
//! # Responsibility
//! - Define use-case oriented CRUD over versioned documents.
//! - Keep file layout, id allocation and locking inside the store boundary.
//!
//! # Invariants
//! - Write paths run the schema validator before touching the disk.
//! - `manifest.version` is the optimistic-lock token; a stale writer loses.
//! - Reads may migrate; `unsupported` and `manual-required` results are
//!   never persisted.

mod fs_store;
pub mod ids;
mod layout;
mod legacy;
mod locks;

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

use crate::migration::MigrationOutcome;
use crate::model::document::{Document, DocumentMetadata, Manifest};
use crate::model::schema::DocumentValidationError;

pub use fs_store::FileDocumentStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Open,
    List,
    Get,
    Create,
    Save,
    Delete,
    Duplicate,
    BootstrapLegacy,
    MigrationReport,
    GetMetadata,
}

impl StoreOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Save => "save",
            Self::Delete => "delete",
            Self::Duplicate => "duplicate",
            Self::BootstrapLegacy => "bootstrap_legacy",
            Self::MigrationReport => "migration_report",
            Self::GetMetadata => "get_metadata",
        }
    }
}

impl Display for StoreOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store failure taxonomy. Every variant names the operation and document id.
#[derive(Debug)]
pub enum StoreError {
    NotFound {
        op: StoreOp,
        id: String,
    },
    /// Caller's version token is stale; `actual` is the stored version.
    VersionConflict {
        id: String,
        expected: u64,
        actual: u64,
    },
    Validation {
        op: StoreOp,
        id: String,
        source: DocumentValidationError,
    },
    /// Stored document declares a schema newer than this build understands.
    MigrationUnsupported {
        op: StoreOp,
        id: String,
        declared: String,
        supported: String,
    },
    /// No automatic step path to the current schema.
    MigrationManualRequired {
        op: StoreOp,
        id: String,
        from: String,
        reached: String,
        reason: String,
    },
    /// Persisted bytes cannot be parsed into a valid document.
    InvalidData {
        op: StoreOp,
        id: String,
        message: String,
    },
    Io {
        op: StoreOp,
        id: Option<String>,
        path: PathBuf,
        source: io::Error,
    },
}

impl StoreError {
    pub fn op(&self) -> StoreOp {
        match self {
            Self::VersionConflict { .. } => StoreOp::Save,
            Self::NotFound { op, .. }
            | Self::Validation { op, .. }
            | Self::MigrationUnsupported { op, .. }
            | Self::MigrationManualRequired { op, .. }
            | Self::InvalidData { op, .. }
            | Self::Io { op, .. } => *op,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::NotFound { id, .. }
            | Self::VersionConflict { id, .. }
            | Self::Validation { id, .. }
            | Self::MigrationUnsupported { id, .. }
            | Self::MigrationManualRequired { id, .. }
            | Self::InvalidData { id, .. } => Some(id.as_str()),
            Self::Io { id, .. } => id.as_deref(),
        }
    }

    /// Stable machine-readable code for callers mapping errors to responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::VersionConflict { .. } => "version_conflict",
            Self::Validation { .. } => "validation_failed",
            Self::MigrationUnsupported { .. } => "migration_unsupported",
            Self::MigrationManualRequired { .. } => "migration_manual_required",
            Self::InvalidData { .. } => "invalid_data",
            Self::Io { .. } => "io_failure",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { op, id } => write!(f, "{op} `{id}`: document not found"),
            Self::VersionConflict {
                id,
                expected,
                actual,
            } => write!(
                f,
                "save `{id}`: version conflict (expected {expected}, stored {actual})"
            ),
            Self::Validation { op, id, source } => write!(f, "{op} `{id}`: {source}"),
            Self::MigrationUnsupported {
                op,
                id,
                declared,
                supported,
            } => write!(
                f,
                "{op} `{id}`: schema {declared} is newer than supported {supported}"
            ),
            Self::MigrationManualRequired {
                op,
                id,
                from,
                reached,
                reason,
            } => write!(
                f,
                "{op} `{id}`: manual migration required from {from} (stopped at {reached}): {reason}"
            ),
            Self::InvalidData { op, id, message } => {
                write!(f, "{op} `{id}`: invalid persisted data: {message}")
            }
            Self::Io {
                op,
                id,
                path,
                source,
            } => match id {
                Some(id) => write!(f, "{op} `{id}`: io error at `{}`: {source}", path.display()),
                None => write!(f, "{op}: io error at `{}`: {source}", path.display()),
            },
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Manifest fields applied to a duplicated document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateRequest {
    /// Requested id; defaults to the source id, which then collides and
    /// receives a numeric suffix.
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// One legacy entry that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapFailure {
    pub entry: String,
    pub reason: String,
}

/// Summary of one `bootstrap_legacy` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub imported: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<BootstrapFailure>,
}

/// Repository interface for versioned document storage.
pub trait DocumentStore {
    /// Lists stored manifests; unparseable entries are excluded.
    fn list(&self) -> StoreResult<Vec<Manifest>>;
    /// Loads and migrates one document. Missing ids yield `Ok(None)`.
    fn get(&self, id: &str) -> StoreResult<Option<Document>>;
    /// Stores a new document under a freshly allocated id.
    fn create(
        &self,
        document: &Document,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest>;
    /// Overwrites a stored document if `expected_version` is current.
    fn save(
        &self,
        document: &Document,
        expected_version: Option<u64>,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest>;
    /// Removes a document; returns whether it existed.
    fn delete(&self, id: &str) -> StoreResult<bool>;
    /// Copies a document's payload into a new, independent document.
    fn duplicate(
        &self,
        source_id: &str,
        request: &DuplicateRequest,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest>;
    /// Imports legacy entries not yet present in the store.
    fn bootstrap_legacy(&self) -> StoreResult<BootstrapReport>;
    /// Runs migration over the stored document without persisting anything.
    fn migration_report(&self, id: &str) -> StoreResult<Option<MigrationOutcome>>;
    /// Loads the metadata sidecar, defaulted when the sidecar is absent.
    fn get_metadata(&self, id: &str) -> StoreResult<Option<DocumentMetadata>>;
}
