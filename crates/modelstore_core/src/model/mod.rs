//! Document domain model.
//!
//! # Responsibility
//! - Define the typed shapes crossing the store boundary: manifests,
//!   elements, relationships, diagrams and grid payloads.
//! - Keep cross-references as id fields resolved through `ModelIndex`.
//!
//! # Invariants
//! - Metaclass and relationship type are closed tagged unions.
//! - Model entity ids are UUIDs generated by callers.

pub mod diagram;
pub mod document;
pub mod element;
pub mod grid;
pub mod index;
pub mod relationship;
pub mod schema;
pub mod version;
