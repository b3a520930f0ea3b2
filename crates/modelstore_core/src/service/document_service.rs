//! Document use-case service.
//!
//! # Responsibility
//! - Run consistency checks before create/save and apply the caller's policy.
//! - Pass every other operation straight through to the store.
//!
//! # Invariants
//! - A blocked write never reaches the store.
//! - Consistency issues are returned as data on success, never dropped.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::migration::MigrationOutcome;
use crate::model::document::{Document, DocumentMetadata, Manifest};
use crate::store::{BootstrapReport, DocumentStore, DuplicateRequest, StoreError};
use crate::validate::{has_errors, validate_document, Issue};

/// What to do when consistency checks report error-severity issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SavePolicy {
    /// Refuse the write and return the issues.
    #[default]
    BlockOnErrors,
    /// Write anyway; issues are still returned.
    Allow,
}

/// Errors from document service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Write refused by `SavePolicy::BlockOnErrors`.
    Blocked { id: String, issues: Vec<Issue> },
    /// Store-level failure.
    Store(StoreError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocked { id, issues } => {
                let errors = issues.iter().filter(|issue| issue.is_error()).count();
                write!(
                    f,
                    "write of `{id}` blocked by {errors} consistency error(s)"
                )
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Blocked { .. } => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Manifest returned by a write plus the issues found before writing.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub manifest: Manifest,
    pub issues: Vec<Issue>,
}

/// Document service facade.
pub struct DocumentService<S: DocumentStore> {
    store: S,
    policy: SavePolicy,
}

impl<S: DocumentStore> DocumentService<S> {
    /// Creates a service that blocks writes with consistency errors.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, SavePolicy::default())
    }

    pub fn with_policy(store: S, policy: SavePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn list(&self) -> ServiceResult<Vec<Manifest>> {
        Ok(self.store.list()?)
    }

    pub fn get(&self, id: &str) -> ServiceResult<Option<Document>> {
        Ok(self.store.get(id)?)
    }

    /// Loads a document and runs consistency checks over it.
    pub fn inspect(&self, id: &str) -> ServiceResult<Option<(Document, Vec<Issue>)>> {
        Ok(self.store.get(id)?.map(|document| {
            let issues = validate_document(&document);
            (document, issues)
        }))
    }

    pub fn create(
        &self,
        document: &Document,
        metadata: Option<&DocumentMetadata>,
    ) -> ServiceResult<WriteOutcome> {
        let issues = self.check(document)?;
        let manifest = self.store.create(document, metadata)?;
        Ok(WriteOutcome { manifest, issues })
    }

    pub fn save(
        &self,
        document: &Document,
        expected_version: Option<u64>,
        metadata: Option<&DocumentMetadata>,
    ) -> ServiceResult<WriteOutcome> {
        let issues = self.check(document)?;
        let manifest = self.store.save(document, expected_version, metadata)?;
        Ok(WriteOutcome { manifest, issues })
    }

    pub fn delete(&self, id: &str) -> ServiceResult<bool> {
        Ok(self.store.delete(id)?)
    }

    pub fn duplicate(
        &self,
        source_id: &str,
        request: &DuplicateRequest,
        metadata: Option<&DocumentMetadata>,
    ) -> ServiceResult<Manifest> {
        Ok(self.store.duplicate(source_id, request, metadata)?)
    }

    pub fn bootstrap_legacy(&self) -> ServiceResult<BootstrapReport> {
        Ok(self.store.bootstrap_legacy()?)
    }

    pub fn migration_report(&self, id: &str) -> ServiceResult<Option<MigrationOutcome>> {
        Ok(self.store.migration_report(id)?)
    }

    pub fn get_metadata(&self, id: &str) -> ServiceResult<Option<DocumentMetadata>> {
        Ok(self.store.get_metadata(id)?)
    }

    fn check(&self, document: &Document) -> ServiceResult<Vec<Issue>> {
        let issues = validate_document(document);
        if self.policy == SavePolicy::BlockOnErrors && has_errors(&issues) {
            warn!(
                "event=doc_write_blocked module=validate status=error id={} issues={}",
                document.id(),
                issues.len()
            );
            return Err(ServiceError::Blocked {
                id: document.id().to_string(),
                issues,
            });
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentService, SavePolicy, ServiceError};
    use crate::config::StoreConfig;
    use crate::model::document::Document;
    use crate::model::element::{Element, ElementKind};
    use crate::store::{DocumentStore, FileDocumentStore};
    use crate::validate::IssueCode;

    fn duplicated_names() -> Document {
        let mut document = Document::new_model("demo", "Demo");
        let model = document.model_mut().unwrap();
        model.elements.push(Element::new(ElementKind::Block, "Pump"));
        model.elements.push(Element::new(ElementKind::Block, " pump "));
        document
    }

    #[test]
    fn blocking_policy_refuses_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::open(StoreConfig::new(dir.path())).unwrap();
        let service = DocumentService::new(store);

        let err = service.create(&duplicated_names(), None).unwrap_err();
        match err {
            ServiceError::Blocked { id, issues } => {
                assert_eq!(id, "demo");
                assert!(issues
                    .iter()
                    .all(|issue| issue.code == IssueCode::DuplicateName));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(service.store().list().unwrap().is_empty());
    }

    #[test]
    fn allow_policy_writes_and_returns_issues() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::open(StoreConfig::new(dir.path())).unwrap();
        let service = DocumentService::with_policy(store, SavePolicy::Allow);

        let outcome = service.create(&duplicated_names(), None).unwrap();
        assert_eq!(outcome.manifest.id, "demo");
        assert_eq!(outcome.issues.len(), 2);

        let (_, issues) = service.inspect("demo").unwrap().unwrap();
        assert_eq!(issues.len(), 2);
    }
}
