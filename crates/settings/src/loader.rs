//! Settings loader implementation

use crate::schema::ServiceSettings;
use crate::validation::SettingsValidator;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `TURBOPI_SERVICE_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "TURBOPI_SERVICE_";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

/// Settings loader that layers defaults, YAML files and environment variables
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings from defaults, an optional YAML file and the environment
    pub fn load(settings_path: Option<&Path>) -> Result<ServiceSettings> {
        let mut figment = Figment::from(Serialized::defaults(ServiceSettings::default()));

        if let Some(path) = settings_path {
            if !path.exists() {
                return Err(SettingsError::NotFound(path.to_path_buf()).into());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let settings: ServiceSettings = figment
            // Nested keys use a double underscore: TURBOPI_SERVICE_LOGGING__FORMAT
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse service settings")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    /// Load settings from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<ServiceSettings> {
        let settings: ServiceSettings = Figment::from(Serialized::defaults(ServiceSettings::default()))
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse service settings from string")?;

        Self::validate(&settings)?;
        Ok(settings)
    }

    fn validate(settings: &ServiceSettings) -> Result<()> {
        let report = SettingsValidator::validate(settings);
        if report.has_errors() {
            let details = report
                .errors
                .iter()
                .map(|issue| format!("{}: {}", issue.field, issue.message))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SettingsError::Invalid(details).into());
        }
        Ok(())
    }

    /// Write the default settings as YAML
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let yaml_content = serde_yaml::to_string(&ServiceSettings::default())
            .context("Failed to serialize default settings")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example settings file")?;

        Ok(())
    }
}
