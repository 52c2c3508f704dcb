//! Shared types for the Turbopi configuration store
//!
//! This crate contains the document model and error taxonomy used by the
//! store, the service settings loader and the HTTP boundary.

pub mod document;
pub mod error;
pub mod utils;

// Re-export commonly used types
pub use document::{json_type_name, ConfigDocument, ConfigPatch, LlmProvider, RawDocument};
pub use error::{Result, StoreError, ValidationError, ValidationIssue};
