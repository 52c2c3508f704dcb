//! Configuration file location
//!
//! Precedence: explicit path > `TURBOPI_CONFIG_PATH` > `~/.turbopi/config.json`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use types::{Result, StoreError};

/// Environment variable naming the full config file path
pub const CONFIG_PATH_ENV: &str = "TURBOPI_CONFIG_PATH";

const DEFAULT_DIR_NAME: &str = ".turbopi";
const DEFAULT_FILE_NAME: &str = "config.json";

/// Resolve the absolute config file path and make sure its directory exists
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_with(explicit, std::env::var_os(CONFIG_PATH_ENV), dirs::home_dir())
}

pub(crate) fn resolve_with(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    let candidate = match (explicit, env_value.filter(|v| !v.is_empty())) {
        (Some(path), _) => expand_home(path, home.as_deref())?,
        (None, Some(value)) => expand_home(Path::new(&value), home.as_deref())?,
        (None, None) => {
            let home = home.ok_or_else(|| {
                StoreError::path(DEFAULT_DIR_NAME, "could not determine the user home directory")
            })?;
            home.join(DEFAULT_DIR_NAME).join(DEFAULT_FILE_NAME)
        }
    };

    let path = std::path::absolute(&candidate).map_err(|e| {
        StoreError::path(&candidate, format!("cannot make path absolute: {}", e))
    })?;

    ensure_parent_dir(&path)?;
    debug!(path = %path.display(), "Resolved configuration path");
    Ok(path)
}

fn expand_home(path: &Path, home: Option<&Path>) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = home.ok_or_else(|| {
                StoreError::path(path, "cannot expand '~' without a home directory")
            })?;
            Ok(home.join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

/// Create the parent directory and confirm it accepts new files
fn ensure_parent_dir(path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| StoreError::path(path, "config path has no parent directory"))?;

    fs::create_dir_all(parent)
        .map_err(|e| StoreError::path(parent, format!("cannot create directory: {}", e)))?;

    if !parent.is_dir() {
        return Err(StoreError::path(parent, "not a directory"));
    }

    // Anonymous temp file, removed on drop.
    tempfile::tempfile_in(parent)
        .map_err(|e| StoreError::path(parent, format!("directory is not writable: {}", e)))?;

    Ok(())
}
