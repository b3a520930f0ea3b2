//! Filesystem-backed document store.
//!
//! # Responsibility
//! - Map documents onto `<root>/<id>/` directories.
//! - Enforce optimistic versioning, schema validation and read-path migration.
//!
//! # Invariants
//! - New and rewritten documents are assembled under `<root>/.staging/` and
//!   renamed into place, so a partial write is never visible by id.
//! - Read-check-write for one id runs under that id's lock.
//! - Id allocation runs under one store-wide lock.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use uuid::Uuid;

use super::ids::{is_valid_document_id, sanitize_document_id, with_collision_suffix};
use super::layout::{self, LayoutError, MANIFEST_FILE, STAGING_DIR};
use super::legacy;
use super::locks::{lock_ignoring_poison, IdLocks};
use super::{
    BootstrapFailure, BootstrapReport, DocumentStore, DuplicateRequest, StoreError, StoreOp,
    StoreResult,
};
use crate::config::StoreConfig;
use crate::migration::{MigrationEngine, MigrationOutcome, MigrationStatus, RawDocument};
use crate::model::document::{Document, DocumentMetadata, Manifest};
use crate::model::schema::{DocumentValidationError, SchemaValidator, ShapeValidator};

const MAX_ALLOCATION_ATTEMPTS: u32 = 10_000;

/// How `insert_new` picks the directory name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdPolicy {
    /// Use the requested id, appending `-2`, `-3`, ... on collision.
    Allocate,
    /// Use the requested id or report that it is taken.
    Exact,
}

enum InsertOutcome {
    Inserted(Manifest),
    Taken(String),
}

/// Document store persisting one directory per document under `config.root`.
pub struct FileDocumentStore<V: SchemaValidator = ShapeValidator> {
    config: StoreConfig,
    validator: V,
    engine: MigrationEngine,
    locks: IdLocks,
    allocation: Mutex<()>,
}

impl FileDocumentStore<ShapeValidator> {
    /// Opens a store with the default shape validator and migration chain.
    ///
    /// # Errors
    /// - `StoreError::Io` when the root directory cannot be created.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        Self::with_validator(config, ShapeValidator)
    }
}

impl<V: SchemaValidator> FileDocumentStore<V> {
    /// Opens a store with a caller-provided schema validator.
    pub fn with_validator(config: StoreConfig, validator: V) -> StoreResult<Self> {
        let started_at = Instant::now();
        if let Err(source) = fs::create_dir_all(&config.root) {
            error!(
                "event=store_open module=store status=error duration_ms={} error_code=root_create_failed error={}",
                started_at.elapsed().as_millis(),
                source
            );
            return Err(StoreError::Io {
                op: StoreOp::Open,
                id: None,
                path: config.root.clone(),
                source,
            });
        }
        info!(
            "event=store_open module=store status=ok duration_ms={} persist_upgrades={} legacy={}",
            started_at.elapsed().as_millis(),
            config.persist_upgrades,
            config.legacy_root.is_some()
        );
        Ok(Self {
            config,
            validator,
            engine: MigrationEngine::new(),
            locks: IdLocks::default(),
            allocation: Mutex::new(()),
        })
    }

    /// Replaces the migration engine, e.g. with a custom step chain.
    pub fn with_engine(mut self, engine: MigrationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.config.root.as_path()
    }

    pub fn engine(&self) -> &MigrationEngine {
        &self.engine
    }

    fn document_dir(&self, id: &str) -> PathBuf {
        self.config.root.join(id)
    }

    fn staging_root(&self) -> PathBuf {
        self.config.root.join(STAGING_DIR)
    }

    fn target_schema(&self) -> String {
        self.engine.target().to_string()
    }

    fn validate(&self, op: StoreOp, document: &Document) -> StoreResult<()> {
        self.validator
            .validate(document)
            .map_err(|source| StoreError::Validation {
                op,
                id: document.id().to_string(),
                source,
            })
    }

    fn read_raw(&self, op: StoreOp, id: &str) -> StoreResult<Option<RawDocument>> {
        layout::read_raw(&self.document_dir(id)).map_err(|err| err.into_store_error(op, id))
    }

    fn fresh_staging_dir(&self, op: StoreOp, id: &str) -> StoreResult<PathBuf> {
        let staging = self
            .staging_root()
            .join(Uuid::new_v4().simple().to_string());
        fs::create_dir_all(&staging).map_err(|source| StoreError::Io {
            op,
            id: Some(id.to_string()),
            path: staging.clone(),
            source,
        })?;
        Ok(staging)
    }

    fn discard_staging(&self, staging: &Path, id: &str) {
        if staging.exists() {
            if let Err(err) = fs::remove_dir_all(staging) {
                warn!(
                    "event=staging_cleanup module=store status=error id={} error={}",
                    id, err
                );
            }
        }
    }

    /// Rewrites an existing document as a whole. Caller holds the id lock.
    ///
    /// The full file set is staged first; the live directory is only touched by
    /// the final swap.
    fn replace_document(
        &self,
        op: StoreOp,
        document: &Document,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<()> {
        let id = document.id();
        let live = self.document_dir(id);
        let staging = self.fresh_staging_dir(op, id)?;
        let result = layout::copy_sidecars(&live, &staging)
            .and_then(|()| layout::write_document(&staging, document, metadata))
            .map_err(|err| err.into_store_error(op, id))
            .and_then(|()| self.swap_in(op, id, &live, &staging));
        self.discard_staging(&staging, id);
        result
    }

    fn swap_in(&self, op: StoreOp, id: &str, live: &Path, staged: &Path) -> StoreResult<()> {
        let io_error = |path: &Path, source: io::Error| StoreError::Io {
            op,
            id: Some(id.to_string()),
            path: path.to_path_buf(),
            source,
        };
        let retired = self
            .staging_root()
            .join(format!("replaced-{}", Uuid::new_v4().simple()));
        fs::rename(live, &retired).map_err(|source| io_error(live, source))?;
        if let Err(source) = fs::rename(staged, live) {
            if let Err(restore) = fs::rename(&retired, live) {
                error!(
                    "event=doc_replace module=store status=error id={} reason=restore_failed retired={} error={}",
                    id,
                    retired.display(),
                    restore
                );
            }
            return Err(io_error(live, source));
        }
        if let Err(err) = fs::remove_dir_all(&retired) {
            warn!(
                "event=staging_cleanup module=store status=error id={} error={}",
                id, err
            );
        }
        Ok(())
    }

    /// Loads, migrates and parses one document. Caller holds the id lock.
    fn load_locked(&self, op: StoreOp, id: &str) -> StoreResult<Option<Document>> {
        let Some(raw) = self.read_raw(op, id)? else {
            return Ok(None);
        };

        let outcome = self.engine.migrate(raw);
        match outcome.status {
            MigrationStatus::Unsupported => {
                warn!(
                    "event=doc_migrate module=migration status=error id={} migration_status={} from={} target={}",
                    id, outcome.status, outcome.from_version, outcome.target_version
                );
                Err(StoreError::MigrationUnsupported {
                    op,
                    id: id.to_string(),
                    declared: outcome.from_version,
                    supported: outcome.target_version,
                })
            }
            MigrationStatus::ManualRequired => {
                warn!(
                    "event=doc_migrate module=migration status=error id={} migration_status={} from={} reached={} target={}",
                    id,
                    outcome.status,
                    outcome.from_version,
                    outcome.reached_version,
                    outcome.target_version
                );
                Err(StoreError::MigrationManualRequired {
                    op,
                    id: id.to_string(),
                    from: outcome.from_version,
                    reached: outcome.reached_version,
                    reason: outcome.reason.unwrap_or_default(),
                })
            }
            MigrationStatus::UpToDate => parse_document(op, id, outcome.document).map(Some),
            MigrationStatus::Upgraded => {
                info!(
                    "event=doc_migrate module=migration status=ok id={} from={} target={} steps={} warnings={}",
                    id,
                    outcome.from_version,
                    outcome.target_version,
                    outcome.applied_steps.len(),
                    outcome.warnings.len()
                );
                let document = parse_document(op, id, outcome.document)?;
                if self.config.persist_upgrades {
                    self.persist_upgrade(op, &document)?;
                }
                Ok(Some(document))
            }
        }
    }

    /// Writes an upgraded document back without bumping its version.
    fn persist_upgrade(&self, op: StoreOp, document: &Document) -> StoreResult<()> {
        if let Err(err) = self.validator.validate(document) {
            warn!(
                "event=doc_migrate_persist module=store status=skipped id={} reason=validation_failed error={}",
                document.id(),
                err
            );
            return Ok(());
        }
        self.replace_document(op, document, None)?;
        info!(
            "event=doc_migrate_persist module=store status=ok id={} schema={}",
            document.id(),
            document.manifest.schema_version
        );
        Ok(())
    }

    /// Stages `document` and renames it into place under a free id.
    ///
    /// The staging directory is removed on every path.
    fn insert_new(
        &self,
        op: StoreOp,
        document: Document,
        metadata: Option<&DocumentMetadata>,
        policy: IdPolicy,
    ) -> StoreResult<InsertOutcome> {
        let requested = document.id().to_string();
        let staging = self.fresh_staging_dir(op, &requested)?;
        let result = self.stage_and_commit(op, &staging, document, metadata, policy);
        self.discard_staging(&staging, &requested);
        result
    }

    fn stage_and_commit(
        &self,
        op: StoreOp,
        staging: &Path,
        mut document: Document,
        metadata: Option<&DocumentMetadata>,
        policy: IdPolicy,
    ) -> StoreResult<InsertOutcome> {
        let requested = document.id().to_string();
        layout::write_payload(staging, &document)
            .map_err(|err| err.into_store_error(op, &requested))?;
        if let Some(metadata) = metadata {
            layout::write_metadata(staging, metadata)
                .map_err(|err| err.into_store_error(op, &requested))?;
        }

        let _allocation = lock_ignoring_poison(&self.allocation);
        let final_id = match policy {
            IdPolicy::Exact if self.document_dir(&requested).exists() => {
                return Ok(InsertOutcome::Taken(requested));
            }
            IdPolicy::Exact => requested.clone(),
            IdPolicy::Allocate => self.allocate_id(op, &requested)?,
        };

        document.manifest.id = final_id.clone();
        layout::write_manifest(staging, &document.manifest)
            .map_err(|err| err.into_store_error(op, &final_id))?;
        let destination = self.document_dir(&final_id);
        fs::rename(staging, &destination).map_err(|source| StoreError::Io {
            op,
            id: Some(final_id.clone()),
            path: destination,
            source,
        })?;
        Ok(InsertOutcome::Inserted(document.manifest))
    }

    /// Picks `requested`, else the first free `requested-n`. Caller holds the
    /// allocation lock.
    fn allocate_id(&self, op: StoreOp, requested: &str) -> StoreResult<String> {
        if !self.document_dir(requested).exists() {
            return Ok(requested.to_string());
        }
        for attempt in 2..=MAX_ALLOCATION_ATTEMPTS {
            let candidate = with_collision_suffix(requested, attempt);
            if !self.document_dir(&candidate).exists() {
                return Ok(candidate);
            }
        }
        Err(StoreError::Io {
            op,
            id: Some(requested.to_string()),
            path: self.document_dir(requested),
            source: io::Error::new(
                io::ErrorKind::AlreadyExists,
                "no free id suffix left for requested id",
            ),
        })
    }

    fn inserted(op: StoreOp, outcome: InsertOutcome) -> StoreResult<Manifest> {
        match outcome {
            InsertOutcome::Inserted(manifest) => Ok(manifest),
            InsertOutcome::Taken(id) => Err(StoreError::Io {
                op,
                path: PathBuf::from(&id),
                id: Some(id),
                source: io::Error::new(io::ErrorKind::AlreadyExists, "document id already taken"),
            }),
        }
    }

    /// Version check and staged rewrite for `save`. Caller holds the id lock.
    fn save_locked(
        &self,
        document: &Document,
        expected_version: Option<u64>,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest> {
        let op = StoreOp::Save;
        let id = document.id();
        let Some(stored) = self.read_raw(op, id)? else {
            return Err(StoreError::NotFound {
                op,
                id: id.to_string(),
            });
        };

        // Classified like a read, so legacy defaults (e.g. `version: 1`) apply
        // and anything the engine refuses to touch is refused here too.
        let stored = self.engine.migrate(stored);
        if stored.status == MigrationStatus::Unsupported {
            return Err(StoreError::MigrationUnsupported {
                op,
                id: id.to_string(),
                declared: stored.from_version,
                supported: stored.target_version,
            });
        }
        let stored = stored.document;

        let actual = stored_version(op, id, &stored)?;
        let expected = expected_version.unwrap_or(document.manifest.version);
        if expected != actual {
            warn!(
                "event=doc_save module=store status=conflict id={} expected={} actual={}",
                id, expected, actual
            );
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected,
                actual,
            });
        }

        let target = self.target_schema();
        if document.manifest.schema_version != target {
            return Err(StoreError::Validation {
                op,
                id: id.to_string(),
                source: DocumentValidationError::SchemaVersionMismatch {
                    declared: document.manifest.schema_version.clone(),
                    expected: target,
                },
            });
        }
        self.validate(op, document)?;

        let mut next = document.clone();
        next.manifest.version = actual + 1;
        next.manifest.updated_at = Utc::now();
        if let Some(created_at) = stored_created_at(&stored) {
            next.manifest.created_at = created_at;
        }
        next.manifest.migrated_from_version = stored_migrated_from(&stored);

        self.replace_document(op, &next, metadata)?;
        Ok(next.manifest)
    }

    fn delete_locked(&self, id: &str) -> StoreResult<bool> {
        let op = StoreOp::Delete;
        let dir = self.document_dir(id);
        if !dir.is_dir() {
            info!("event=doc_delete module=store status=ok id={} existed=false", id);
            return Ok(false);
        }

        let io_error = |path: PathBuf, source: io::Error| StoreError::Io {
            op,
            id: Some(id.to_string()),
            path,
            source,
        };
        let staging_root = self.staging_root();
        fs::create_dir_all(&staging_root).map_err(|source| io_error(staging_root.clone(), source))?;
        let tombstone = staging_root.join(format!("deleted-{}", Uuid::new_v4().simple()));
        fs::rename(&dir, &tombstone).map_err(|source| io_error(dir.clone(), source))?;
        fs::remove_dir_all(&tombstone).map_err(|source| io_error(tombstone.clone(), source))?;
        info!("event=doc_delete module=store status=ok id={} existed=true", id);
        Ok(true)
    }

    fn import_entry(
        &self,
        entry: &legacy::LegacyEntry,
        report: &mut BootstrapReport,
    ) -> StoreResult<()> {
        let op = StoreOp::BootstrapLegacy;
        let mut raw = match legacy::read_entry(entry) {
            Ok(raw) => raw,
            Err(LayoutError::Parse { source, .. }) => {
                report.failed.push(BootstrapFailure {
                    entry: entry.file_name.clone(),
                    reason: format!("invalid json: {source}"),
                });
                return Ok(());
            }
            Err(err) => return Err(err.into_store_error(op, &entry.stem)),
        };

        let metadata = legacy::take_metadata(&mut raw);
        let id = legacy::entry_id(&raw, entry);
        if self.document_dir(&id).exists() {
            report.skipped.push(id);
            return Ok(());
        }
        raw.manifest_object_mut()
            .insert("id".to_string(), Value::String(id.clone()));

        let outcome = self.engine.migrate(raw);
        if !outcome.status.is_readable() {
            report.failed.push(BootstrapFailure {
                entry: entry.file_name.clone(),
                reason: format!(
                    "{}: {}",
                    outcome.status,
                    outcome.reason.unwrap_or_default()
                ),
            });
            return Ok(());
        }

        let mut document = match outcome.document.into_document() {
            Ok(document) => document,
            Err(err) => {
                report.failed.push(BootstrapFailure {
                    entry: entry.file_name.clone(),
                    reason: format!("unreadable document: {err}"),
                });
                return Ok(());
            }
        };
        document.manifest.id = id.clone();
        if let Err(err) = self.validator.validate(&document) {
            report.failed.push(BootstrapFailure {
                entry: entry.file_name.clone(),
                reason: err.to_string(),
            });
            return Ok(());
        }

        match self.insert_new(op, document, metadata.as_ref(), IdPolicy::Exact)? {
            InsertOutcome::Inserted(manifest) => report.imported.push(manifest.id),
            InsertOutcome::Taken(id) => report.skipped.push(id),
        }
        Ok(())
    }
}

fn parse_document(op: StoreOp, id: &str, raw: RawDocument) -> StoreResult<Document> {
    let mut document = raw
        .into_document()
        .map_err(|err| StoreError::InvalidData {
            op,
            id: id.to_string(),
            message: err.to_string(),
        })?;
    if document.manifest.id != id {
        warn!(
            "event=doc_read module=store status=coerced id={} reason=manifest_id_mismatch",
            id
        );
        document.manifest.id = id.to_string();
    }
    Ok(document)
}

fn stored_version(op: StoreOp, id: &str, raw: &RawDocument) -> StoreResult<u64> {
    raw.manifest
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| StoreError::InvalidData {
            op,
            id: id.to_string(),
            message: "stored manifest has no unsigned integer `version`".to_string(),
        })
}

fn stored_migrated_from(raw: &RawDocument) -> Option<String> {
    raw.manifest_str("migratedFromVersion").map(str::to_string)
}

fn stored_created_at(raw: &RawDocument) -> Option<DateTime<Utc>> {
    raw.manifest_str("createdAt")
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc))
}

impl<V: SchemaValidator> DocumentStore for FileDocumentStore<V> {
    fn list(&self) -> StoreResult<Vec<Manifest>> {
        let started_at = Instant::now();
        let read_dir = match fs::read_dir(&self.config.root) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    op: StoreOp::List,
                    id: None,
                    path: self.config.root.clone(),
                    source,
                })
            }
        };

        let mut manifests = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| StoreError::Io {
                op: StoreOp::List,
                id: None,
                path: self.config.root.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            let manifest_path = entry.path().join(MANIFEST_FILE);
            let parsed = layout::read_json(&manifest_path).and_then(|value| {
                value
                    .map(|value| {
                        serde_json::from_value::<Manifest>(value).map_err(|source| {
                            LayoutError::Parse {
                                path: manifest_path.clone(),
                                source,
                            }
                        })
                    })
                    .transpose()
            });
            match parsed {
                Ok(Some(mut manifest)) => {
                    manifest.id = name;
                    manifests.push(manifest);
                }
                Ok(None) => {
                    warn!(
                        "event=doc_list module=store status=skipped dir={} reason=missing_manifest",
                        name
                    );
                }
                Err(err) => {
                    warn!(
                        "event=doc_list module=store status=skipped dir={} reason=unreadable_manifest error={}",
                        name, err
                    );
                }
            }
        }

        manifests.sort_by(|left, right| {
            right
                .updated_at
                .cmp(&left.updated_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        info!(
            "event=doc_list module=store status=ok count={} duration_ms={}",
            manifests.len(),
            started_at.elapsed().as_millis()
        );
        Ok(manifests)
    }

    fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        let started_at = Instant::now();
        let result = self
            .locks
            .with_lock(id, || self.load_locked(StoreOp::Get, id));
        match &result {
            Ok(found) => info!(
                "event=doc_get module=store status=ok id={} found={} duration_ms={}",
                id,
                found.is_some(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=doc_get module=store status=error id={} error_code={} duration_ms={}",
                id,
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn create(
        &self,
        document: &Document,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest> {
        let started_at = Instant::now();
        let mut document = document.clone();
        let now = Utc::now();
        document.manifest.id = sanitize_document_id(&document.manifest.id);
        document.manifest.version = 1;
        document.manifest.created_at = now;
        document.manifest.updated_at = now;
        document.manifest.schema_version = self.target_schema();
        document.manifest.migrated_from_version = None;
        document.manifest.migration_warnings.clear();
        self.validate(StoreOp::Create, &document)?;

        let requested = document.id().to_string();
        let manifest = self
            .insert_new(StoreOp::Create, document, metadata, IdPolicy::Allocate)
            .and_then(|outcome| Self::inserted(StoreOp::Create, outcome));
        match &manifest {
            Ok(manifest) => info!(
                "event=doc_create module=store status=ok id={} requested={} duration_ms={}",
                manifest.id,
                requested,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=doc_create module=store status=error requested={} error_code={} duration_ms={}",
                requested,
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        manifest
    }

    fn save(
        &self,
        document: &Document,
        expected_version: Option<u64>,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest> {
        let op = StoreOp::Save;
        let id = document.id();
        if !is_valid_document_id(id) {
            return Err(StoreError::NotFound {
                op,
                id: id.to_string(),
            });
        }

        let started_at = Instant::now();
        let result = self
            .locks
            .with_lock(id, || self.save_locked(document, expected_version, metadata));
        match &result {
            Ok(manifest) => info!(
                "event=doc_save module=store status=ok id={} version={} duration_ms={}",
                id,
                manifest.version,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=doc_save module=store status=error id={} error_code={} duration_ms={}",
                id,
                err.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn delete(&self, id: &str) -> StoreResult<bool> {
        if !is_valid_document_id(id) {
            return Ok(false);
        }
        self.locks.with_lock(id, || self.delete_locked(id))
    }

    fn duplicate(
        &self,
        source_id: &str,
        request: &DuplicateRequest,
        metadata: Option<&DocumentMetadata>,
    ) -> StoreResult<Manifest> {
        let op = StoreOp::Duplicate;
        let not_found = || StoreError::NotFound {
            op,
            id: source_id.to_string(),
        };
        if !is_valid_document_id(source_id) {
            return Err(not_found());
        }

        let source = self
            .locks
            .with_lock(source_id, || self.load_locked(op, source_id))?
            .ok_or_else(not_found)?;

        let requested = request
            .id
            .as_deref()
            .map(sanitize_document_id)
            .unwrap_or_else(|| source.manifest.id.clone());
        let name = request
            .name
            .clone()
            .unwrap_or_else(|| source.manifest.name.clone());
        let mut manifest = Manifest::new(requested, name, source.manifest.kind);
        manifest.description = request
            .description
            .clone()
            .unwrap_or_else(|| source.manifest.description.clone());
        manifest.schema_version = self.target_schema();
        manifest.extra = source.manifest.extra.clone();

        let copy = Document {
            manifest,
            payload: source.payload,
        };
        self.validate(op, &copy)?;
        let manifest = self
            .insert_new(op, copy, metadata, IdPolicy::Allocate)
            .and_then(|outcome| Self::inserted(op, outcome))?;
        info!(
            "event=doc_duplicate module=store status=ok source_id={} id={}",
            source_id, manifest.id
        );
        Ok(manifest)
    }

    fn bootstrap_legacy(&self) -> StoreResult<BootstrapReport> {
        let started_at = Instant::now();
        let mut report = BootstrapReport::default();
        let Some(legacy_root) = self.config.legacy_root.as_deref() else {
            info!("event=legacy_bootstrap module=store status=skipped reason=no_legacy_root");
            return Ok(report);
        };

        let entries = legacy::scan(legacy_root).map_err(|source| StoreError::Io {
            op: StoreOp::BootstrapLegacy,
            id: None,
            path: legacy_root.to_path_buf(),
            source,
        })?;
        for entry in &entries {
            self.import_entry(entry, &mut report)?;
        }

        info!(
            "event=legacy_bootstrap module=store status=ok imported={} skipped={} failed={} duration_ms={}",
            report.imported.len(),
            report.skipped.len(),
            report.failed.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    fn migration_report(&self, id: &str) -> StoreResult<Option<MigrationOutcome>> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        self.locks.with_lock(id, || {
            let raw = self.read_raw(StoreOp::MigrationReport, id)?;
            Ok(raw.map(|raw| self.engine.migrate(raw)))
        })
    }

    fn get_metadata(&self, id: &str) -> StoreResult<Option<DocumentMetadata>> {
        if !is_valid_document_id(id) {
            return Ok(None);
        }
        let op = StoreOp::GetMetadata;
        let dir = self.document_dir(id);
        if !dir.join(MANIFEST_FILE).exists() {
            return Ok(None);
        }
        let metadata = layout::read_metadata(&dir).map_err(|err| err.into_store_error(op, id))?;
        Ok(Some(metadata.unwrap_or_default()))
    }
}
