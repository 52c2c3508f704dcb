//! Process-wide configuration store
//!
//! Every logical operation runs under one re-entrant mutex. Re-entrancy is
//! deliberate: [`ConfigStore::read_config`] may write defaults while holding
//! the lock, and [`ConfigStore::exclusive`] lets a caller wrap a whole
//! read-merge-validate-write sequence so that concurrent patches in this
//! process cannot read stale data and clobber each other.

use crate::atomic::{self, ReadOutcome};
use crate::paths;
use crate::schema;
use parking_lot::ReentrantMutex;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use types::{ConfigPatch, RawDocument, Result};

/// How a read obtained its document
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The file existed and parsed
    Loaded(RawDocument),
    /// No file existed; defaults were written
    Created(RawDocument),
    /// The file was unreadable or not a JSON object; defaults were written
    Recovered { defaults: RawDocument, reason: String },
}

impl LoadOutcome {
    pub fn document(&self) -> &RawDocument {
        match self {
            LoadOutcome::Loaded(doc) | LoadOutcome::Created(doc) => doc,
            LoadOutcome::Recovered { defaults, .. } => defaults,
        }
    }

    pub fn into_document(self) -> RawDocument {
        match self {
            LoadOutcome::Loaded(doc) | LoadOutcome::Created(doc) => doc,
            LoadOutcome::Recovered { defaults, .. } => defaults,
        }
    }
}

/// Read/write/merge/reset over one JSON file
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    lock: ReentrantMutex<()>,
}

impl ConfigStore {
    /// Resolve the config path and prepare its directory
    pub fn open(explicit_path: Option<&Path>) -> Result<Self> {
        let path = paths::resolve_config_path(explicit_path)?;
        info!(path = %path.display(), "Configuration store opened");
        Ok(Self::at(path))
    }

    /// Use `path` as-is, without resolution or directory checks
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: ReentrantMutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` while holding the store lock
    ///
    /// Store methods called from inside `f` re-enter the lock, so the whole
    /// closure is one atomic step with respect to other callers in this
    /// process.
    pub fn exclusive<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.lock.lock();
        f(self)
    }

    /// Read the document, materializing defaults when missing or corrupt
    pub fn load(&self) -> Result<LoadOutcome> {
        let _guard = self.lock.lock();

        match atomic::read_document(&self.path) {
            ReadOutcome::Loaded(doc) => Ok(LoadOutcome::Loaded(doc)),
            ReadOutcome::Missing => {
                let defaults = schema::default_document();
                self.write_config(&defaults)?;
                info!(path = %self.path.display(), "Created configuration file with defaults");
                Ok(LoadOutcome::Created(defaults))
            }
            ReadOutcome::Corrupt(reason) => {
                warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "Configuration file is corrupt, replacing with defaults"
                );
                let defaults = schema::default_document();
                self.write_config(&defaults)?;
                Ok(LoadOutcome::Recovered { defaults, reason })
            }
        }
    }

    pub fn read_config(&self) -> Result<RawDocument> {
        self.load().map(LoadOutcome::into_document)
    }

    /// Overwrite the file unconditionally
    pub fn write_config(&self, doc: &RawDocument) -> Result<()> {
        let _guard = self.lock.lock();
        atomic::write_document(&self.path, doc)
    }

    /// Overlay `patch` onto the current document without persisting it
    pub fn merge_config(&self, patch: &ConfigPatch) -> Result<RawDocument> {
        let _guard = self.lock.lock();
        let mut current = self.read_config()?;
        patch.apply_to(&mut current);
        Ok(current)
    }

    /// Overwrite the file with schema defaults
    pub fn reset_config(&self) -> Result<RawDocument> {
        let _guard = self.lock.lock();
        let defaults = schema::default_document();
        self.write_config(&defaults)?;
        info!(path = %self.path.display(), "Configuration reset to defaults");
        Ok(defaults)
    }
}
