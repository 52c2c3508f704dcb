//! Service settings for the Turbopi configuration server
//!
//! These are the knobs of the server process itself (bind address, logging,
//! where the config store lives), not the user configuration document the
//! store manages. Settings come from built-in defaults, an optional YAML file
//! and `TURBOPI_SERVICE_*` environment variables.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{SettingsError, SettingsLoader, ENV_PREFIX};
pub use schema::*;
pub use validation::*;
