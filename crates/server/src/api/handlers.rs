//! HTTP API request handlers
//!
//! Store calls do blocking file I/O and fsync, so every handler hands them to
//! `spawn_blocking`. Validation failures map to 422 with the offending fields;
//! anything else is a 500 tagged with an operation-specific code.

use crate::api::middleware::TraceId;
use crate::app::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use store::ConfigService;
use tokio::task::JoinError;
use tracing::{error, info, warn};
use types::{json_type_name, ConfigPatch, RawDocument, StoreError, ValidationError};

type HandlerResult = Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)>;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigQuery {
    /// Return sensitive fields unmasked
    #[serde(default)]
    pub include_secrets: bool,
}

enum Failure {
    Store(StoreError),
    Task(JoinError),
}

impl From<StoreError> for Failure {
    fn from(err: StoreError) -> Self {
        Failure::Store(err)
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Failure::Store(StoreError::Validation(err))
    }
}

/// Run a service call on the blocking pool
async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, Failure>
where
    T: Send + 'static,
    F: FnOnce(&ConfigService) -> types::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    match tokio::task::spawn_blocking(move || f(&state.service)).await {
        Ok(result) => result.map_err(Failure::Store),
        Err(e) => Err(Failure::Task(e)),
    }
}

fn failure_response(
    trace_id: &TraceId,
    code: &'static str,
    context: &str,
    failure: Failure,
) -> (StatusCode, Json<Value>) {
    let err = match failure {
        Failure::Store(err) => err,
        Failure::Task(e) => {
            error!(trace_id = %trace_id.as_str(), code, error = %e, "Store task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "code": code,
                    "message": format!("{}: {}", context, e),
                    "trace_id": trace_id.as_str(),
                })),
            );
        }
    };

    if let Some(issues) = err.validation_issues() {
        warn!(
            trace_id = %trace_id.as_str(),
            issues = issues.len(),
            "Rejected invalid configuration"
        );
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "code": err.code(),
                "message": "Configuration validation failed",
                "errors": issues,
                "trace_id": trace_id.as_str(),
            })),
        );
    }

    error!(
        trace_id = %trace_id.as_str(),
        code,
        kind = err.code(),
        error = %err,
        "{}", context
    );
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "code": code,
            "message": format!("{}: {}", context, err),
            "trace_id": trace_id.as_str(),
        })),
    )
}

fn config_response(trace_id: &TraceId, config: RawDocument, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "config": config,
                "version": env!("CARGO_PKG_VERSION"),
            },
            "message": message,
            "trace_id": trace_id.as_str(),
        })),
    )
}

fn update_response(trace_id: &TraceId, config: RawDocument, message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "message": message,
                "config": config,
            },
            "message": message,
            "trace_id": trace_id.as_str(),
        })),
    )
}

/// Unwrap a JSON body, reporting malformed input as a validation failure
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ValidationError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::single("body", &rejection.body_text()))
}

/// Get the current configuration, masked unless `include_secrets=true`
pub async fn get_config(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    Query(query): Query<ConfigQuery>,
) -> HandlerResult {
    let include_secrets = query.include_secrets;
    let config = blocking(&state, move |service| service.get_config(include_secrets))
        .await
        .map_err(|f| failure_response(&trace_id, "CONFIG_READ_ERROR", "Failed to read configuration", f))?;

    Ok(config_response(&trace_id, config, "Configuration retrieved successfully"))
}

/// Get the configuration with sensitive fields unmasked
pub async fn get_config_with_secrets(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> HandlerResult {
    let config = blocking(&state, |service| service.get_config(true))
        .await
        .map_err(|f| {
            failure_response(
                &trace_id,
                "CONFIG_SECRETS_ERROR",
                "Failed to read configuration with secrets",
                f,
            )
        })?;

    warn!(trace_id = %trace_id.as_str(), "Unmasked configuration served");
    Ok(config_response(
        &trace_id,
        config,
        "Configuration with secrets retrieved successfully",
    ))
}

/// Replace the whole configuration
pub async fn update_config(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<Value>, JsonRejection>,
) -> HandlerResult {
    let fail = |f: Failure| failure_response(&trace_id, "CONFIG_UPDATE_ERROR", "Failed to update configuration", f);

    let document = match json_body(payload).map_err(|e| fail(e.into()))? {
        Value::Object(map) => map,
        other => {
            let message = format!("configuration must be a JSON object, got {}", json_type_name(&other));
            return Err(fail(ValidationError::single("body", &message).into()));
        }
    };

    let config = blocking(&state, move |service| service.put_config(document))
        .await
        .map_err(fail)?;

    info!(trace_id = %trace_id.as_str(), "Configuration replaced via API");
    Ok(update_response(&trace_id, config, "Configuration updated successfully"))
}

/// Merge a partial document onto the current configuration
pub async fn patch_config(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
    payload: Result<Json<Value>, JsonRejection>,
) -> HandlerResult {
    let fail = |f: Failure| failure_response(&trace_id, "CONFIG_PATCH_ERROR", "Failed to patch configuration", f);

    let patch = json_body(payload)
        .and_then(ConfigPatch::from_value)
        .map_err(|e| fail(e.into()))?;

    let config = blocking(&state, move |service| service.patch_config(&patch))
        .await
        .map_err(fail)?;

    info!(trace_id = %trace_id.as_str(), "Configuration patched via API");
    Ok(update_response(
        &trace_id,
        config,
        "Configuration partially updated successfully",
    ))
}

/// Restore schema defaults
pub async fn reset_config(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> HandlerResult {
    let config = blocking(&state, |service| service.reset_config())
        .await
        .map_err(|f| failure_response(&trace_id, "CONFIG_RESET_ERROR", "Failed to reset configuration", f))?;

    info!(trace_id = %trace_id.as_str(), "Configuration reset via API");
    Ok(update_response(
        &trace_id,
        config,
        "Configuration reset to defaults successfully",
    ))
}

/// Describe the configuration fields
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
    Extension(trace_id): Extension<TraceId>,
) -> HandlerResult {
    let schema = serde_json::to_value(state.service.get_schema()).map_err(|e| {
        failure_response(
            &trace_id,
            "SCHEMA_ERROR",
            "Failed to get configuration schema",
            StoreError::Serialization(e).into(),
        )
    })?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": schema,
            "message": "Configuration schema retrieved successfully",
            "trace_id": trace_id.as_str(),
        })),
    ))
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "components": {
                "config_store": {
                    "path": state.service.store().path().display().to_string(),
                }
            }
        })),
    )
}
