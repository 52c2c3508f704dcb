//! Main application structure and lifecycle management

use crate::api::ApiServer;
use anyhow::{Context, Result};
use settings::ServiceSettings;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use store::{ConfigService, ConfigStore, LoadOutcome};
use tracing::{info, warn};

/// Main application state
#[derive(Debug)]
pub struct AppState {
    pub settings: ServiceSettings,
    pub service: ConfigService,
}

/// Main application that owns the store and the API server
pub struct Application {
    state: Arc<AppState>,
    api_server: ApiServer,
}

impl Application {
    /// Open the config store and build the API server
    ///
    /// `config_path` overrides both the settings file and the
    /// `TURBOPI_CONFIG_PATH` environment variable.
    pub fn new(settings: ServiceSettings, config_path: Option<&Path>) -> Result<Self> {
        info!("Initializing application components...");

        let explicit = config_path.or(settings.store.config_path.as_deref());
        let store = ConfigStore::open(explicit).context("Failed to open configuration store")?;

        match store.load().context("Failed to load configuration")? {
            LoadOutcome::Loaded(doc) => {
                info!(path = %store.path().display(), fields = doc.len(), "Configuration loaded");
            }
            LoadOutcome::Created(_) => {
                info!(path = %store.path().display(), "No configuration found, defaults written");
            }
            LoadOutcome::Recovered { reason, .. } => {
                warn!(
                    path = %store.path().display(),
                    reason = %reason,
                    "Configuration was unreadable and has been reset to defaults"
                );
            }
        }

        let state = Arc::new(AppState {
            settings,
            service: ConfigService::new(Arc::new(store)),
        });

        let api_server = ApiServer::new(state.clone()).context("Failed to create API server")?;

        info!("Application components initialized successfully");
        Ok(Self { state, api_server })
    }

    /// Serve requests until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!("Starting API server on {}", self.api_server.addr());

        self.api_server
            .run(shutdown)
            .await
            .context("API server error")?;

        info!("Application shutdown complete");
        Ok(())
    }

    /// Get application state
    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }
}
