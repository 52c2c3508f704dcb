//! Crash-consistent JSON configuration store
//!
//! The store keeps one JSON document on disk. Writes are atomic (temp file,
//! fsync, rename), in-process callers are serialized by a re-entrant lock and
//! other processes are coordinated with advisory file locks. The
//! [`ConfigService`] layers validation and secret masking on top.

pub mod atomic;
pub mod paths;
pub mod schema;
pub mod service;
pub mod store;

pub use atomic::{read_document, write_document, ReadOutcome};
pub use paths::{resolve_config_path, CONFIG_PATH_ENV};
pub use schema::{FieldKind, FieldSpec, PropertyDescriptor, SchemaDescriptor, MASK};
pub use service::ConfigService;
pub use store::{ConfigStore, LoadOutcome};
