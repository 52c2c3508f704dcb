//! Crash-consistent file replacement
//!
//! Writes go to a temp file in the target's directory, are fsynced, then
//! renamed over the target. A reader opening the target at any instant sees
//! either the complete old document or the complete new one.
//!
//! Advisory locks (`fs2`) coordinate with other processes: shared while
//! reading, exclusive while the temp file is being written. The exclusive
//! lock is released before the rename, so the rename alone provides
//! atomicity against a crash.

use fs2::FileExt;
use serde::Serialize;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};
use types::{RawDocument, Result, StoreError};

/// Outcome of reading the config file
#[derive(Debug)]
pub enum ReadOutcome {
    /// No file at the target path
    Missing,
    /// File exists but is not a readable JSON object
    Corrupt(String),
    Loaded(RawDocument),
}

/// Atomically replace `path` with `document` serialized as indented JSON
pub fn write_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
    write_document_with_hook(path, document, None::<fn() -> io::Result<()>>)
}

/// Same as [`write_document`], running `before_rename` once the temp file
/// is durable but before it replaces the target. A hook error aborts the
/// write exactly as a crash at that point would.
pub(crate) fn write_document_with_hook<T, F>(
    path: &Path,
    document: &T,
    before_rename: Option<F>,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> io::Result<()>,
{
    replace_file(path, document, before_rename, sync_parent_dir)
}

fn replace_file<T, F>(
    path: &Path,
    document: &T,
    before_rename: Option<F>,
    sync_dir: fn(&Path) -> io::Result<()>,
) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> io::Result<()>,
{
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::path(path, "config path has no parent directory"))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("config.json");

    // Dropping the NamedTempFile on any early return removes it.
    let mut temp = tempfile::Builder::new()
        .prefix(&format!("{}.tmp", file_name))
        .tempfile_in(parent)
        .map_err(|e| StoreError::io(parent, e))?;

    {
        let file = temp.as_file_mut();
        file.lock_exclusive().map_err(|e| StoreError::io(path, e))?;
        serde_json::to_writer_pretty(&mut *file, document).map_err(|e| {
            if e.is_io() {
                StoreError::io(path, e.into())
            } else {
                StoreError::Serialization(e)
            }
        })?;
        file.flush().map_err(|e| StoreError::io(path, e))?;
        file.sync_all().map_err(|e| StoreError::io(path, e))?;
        file.unlock().map_err(|e| StoreError::io(path, e))?;
    }

    if let Some(hook) = before_rename {
        hook().map_err(|e| StoreError::io(path, e))?;
    }

    temp.persist(path).map_err(|e| StoreError::io(path, e.error))?;
    // The new document is already in place; only the rename's durability is in doubt.
    if let Err(e) = sync_dir(parent) {
        warn!(
            path = %path.display(),
            error = %e,
            "Configuration replaced but directory fsync failed"
        );
    }

    debug!(path = %path.display(), "Configuration written atomically");
    Ok(())
}

/// Read and parse the config file under a shared advisory lock
pub fn read_document(path: &Path) -> ReadOutcome {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return ReadOutcome::Missing,
        Err(e) => return ReadOutcome::Corrupt(format!("cannot open file: {}", e)),
    };

    let mut content = String::new();
    let read = file
        .lock_shared()
        .and_then(|_| file.read_to_string(&mut content))
        .and_then(|_| file.unlock());
    if let Err(e) = read {
        return ReadOutcome::Corrupt(format!("cannot read file: {}", e));
    }

    match serde_json::from_str::<serde_json::Value>(&content) {
        Ok(serde_json::Value::Object(map)) => ReadOutcome::Loaded(map),
        Ok(other) => ReadOutcome::Corrupt(format!(
            "expected a JSON object, found {}",
            types::json_type_name(&other)
        )),
        Err(e) => ReadOutcome::Corrupt(format!("invalid JSON: {}", e)),
    }
}

#[cfg(unix)]
fn sync_parent_dir(parent: &Path) -> io::Result<()> {
    File::open(parent)?.sync_all()
}

#[cfg(not(unix))]
fn sync_parent_dir(_parent: &Path) -> io::Result<()> {
    Ok(())
}
