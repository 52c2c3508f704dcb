//! HTTP API server implementation

use crate::api::{middleware, routes};
use crate::app::AppState;
use anyhow::{Context, Result};
use axum::{extract::DefaultBodyLimit, http::Method, Router};
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// HTTP API server
pub struct ApiServer {
    app: Router,
    addr: SocketAddr,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: Arc<AppState>) -> Result<Self> {
        let server = &state.settings.server;

        // Parse server address
        let addr: SocketAddr = server
            .bind_address()
            .parse()
            .context("Invalid server host/port configuration")?;

        let app = build_router(state);
        info!("API server configured for {}", addr);

        Ok(Self { app, addr })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the API server until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr)
            .await
            .context("Failed to bind to server address")?;

        info!("API server listening on {}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("API server error")?;

        info!("API server stopped accepting connections");
        Ok(())
    }
}

/// Routes plus the HTTP layers configured by the service settings
pub fn build_router(state: Arc<AppState>) -> Router {
    let server = &state.settings.server;

    // With no allowed origins the layer adds no CORS headers at all
    let cors = if server.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::PUT,
                Method::PATCH,
                Method::POST,
                Method::OPTIONS,
            ])
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    let mut app = routes::create_routes()
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_seconds,
        )))
        .layer(cors)
        // Outside the CORS layer, which answers preflights without calling inward
        .layer(axum::middleware::from_fn(middleware::private_network_access));

    if state.settings.logging.request_logging {
        app = app.layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );
    }

    app.with_state(state)
}
