//! Use-case services above the document store.
//!
//! # Responsibility
//! - Combine store calls with consistency policy for UI and CLI callers.
//! - Keep callers decoupled from file layout and migration details.

pub mod document_service;
