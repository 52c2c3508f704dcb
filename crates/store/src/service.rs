//! Operation surface consumed by the HTTP boundary
//!
//! Every document returned here is masked unless the caller explicitly asks
//! for secrets. Validation failures come back as
//! [`StoreError::Validation`](types::StoreError::Validation) and never touch
//! the file.

use crate::schema::{self, SchemaDescriptor};
use crate::store::ConfigStore;
use std::sync::Arc;
use tracing::{debug, info};
use types::{ConfigPatch, RawDocument, Result};

#[derive(Debug, Clone)]
pub struct ConfigService {
    store: Arc<ConfigStore>,
}

impl ConfigService {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Current document, masked unless `include_secrets`
    pub fn get_config(&self, include_secrets: bool) -> Result<RawDocument> {
        let current = self.store.read_config()?;
        debug!(include_secrets, "Configuration read");
        Ok(schema::mask(&current, include_secrets))
    }

    /// Validate and persist a complete replacement document
    pub fn put_config(&self, document: RawDocument) -> Result<RawDocument> {
        self.store.exclusive(|store| {
            let mut candidate = document;
            if schema::sensitive_fields().any(|name| candidate.contains_key(name)) {
                let current = store.read_config()?;
                schema::restore_masked_secrets(&mut candidate, &current);
            }

            let validated = schema::validate(&candidate)?.to_raw();
            store.write_config(&validated)?;
            info!(fields = validated.len(), "Configuration replaced");
            Ok(schema::mask(&validated, false))
        })
    }

    /// Merge `patch` onto the current document, validate, persist
    pub fn patch_config(&self, patch: &ConfigPatch) -> Result<RawDocument> {
        self.store.exclusive(|store| {
            let current = store.read_config()?;
            let mut merged = current.clone();
            patch.apply_to(&mut merged);
            schema::restore_masked_secrets(&mut merged, &current);

            let validated = schema::validate(&merged)?.to_raw();
            store.write_config(&validated)?;
            info!(
                keys = ?patch.keys().collect::<Vec<_>>(),
                "Configuration patched"
            );
            Ok(schema::mask(&validated, false))
        })
    }

    /// Persist defaults and return them masked
    pub fn reset_config(&self) -> Result<RawDocument> {
        let defaults = self.store.reset_config()?;
        Ok(schema::mask(&defaults, false))
    }

    pub fn get_schema(&self) -> SchemaDescriptor {
        schema::schema()
    }
}
