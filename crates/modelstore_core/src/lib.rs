//! Versioned storage for engineering-model documents.
//! Owns the on-disk format, schema migration and model consistency rules.

pub mod config;
pub mod logging;
pub mod migration;
pub mod model;
pub mod service;
pub mod store;
pub mod validate;

pub use config::{ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use migration::{MigrationEngine, MigrationOutcome, MigrationStatus, RawDocument};
pub use model::document::{Document, DocumentKind, DocumentMetadata, DocumentPayload, Manifest};
pub use model::schema::{DocumentValidationError, SchemaValidator, ShapeValidator};
pub use model::version::{SchemaVersion, CURRENT_SCHEMA_VERSION, FLOOR_SCHEMA_VERSION};
pub use service::document_service::{DocumentService, SavePolicy, ServiceError, WriteOutcome};
pub use store::{
    BootstrapReport, DocumentStore, DuplicateRequest, FileDocumentStore, StoreError, StoreOp,
    StoreResult,
};
pub use validate::{validate_document, Issue, IssueCode, Severity};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
