//! API route definitions

use crate::api::{handlers, middleware};
use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Prefix for the configuration endpoints
pub const CONFIG_PREFIX: &str = "/api/v1/config";

/// Create the main API router
pub fn create_routes() -> Router<Arc<AppState>> {
    let config_routes = Router::new()
        .route(
            "/",
            get(handlers::get_config)
                .put(handlers::update_config)
                .patch(handlers::patch_config),
        )
        .route("/reset", post(handlers::reset_config))
        .route("/schema", get(handlers::get_schema))
        .route("/secrets", get(handlers::get_config_with_secrets));

    Router::new()
        .nest(CONFIG_PREFIX, config_routes)
        // Health endpoint
        .route("/healthz", get(handlers::health_check))
        .layer(axum::middleware::from_fn(middleware::trace_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::{REQUEST_ID_HEADER, TRACE_ID_HEADER};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use settings::ServiceSettings;
    use std::fs;
    use store::{ConfigService, ConfigStore, MASK};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn create_test_state(dir: &TempDir) -> Arc<AppState> {
        let store = ConfigStore::open(Some(&dir.path().join("config.json"))).unwrap();
        Arc::new(AppState {
            settings: ServiceSettings::default(),
            service: ConfigService::new(Arc::new(store)),
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        create_routes()
            .with_state(Arc::clone(state))
            .oneshot(request)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let response = send(&state, empty_request("GET", "/healthz")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["components"]["config_store"]["path"]
            .as_str()
            .unwrap()
            .ends_with("config.json"));
    }

    #[tokio::test]
    async fn test_get_config_returns_masked_defaults_with_trace_id() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let response = send(&state, empty_request("GET", CONFIG_PREFIX)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = body_json(response).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["trace_id"], header.as_str());
        assert_eq!(body["data"]["config"]["llm_provider"], "openai");
        assert_eq!(body["data"]["config"]["api_key"], Value::Null);
        assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_reused() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let request = Request::builder()
            .uri(CONFIG_PREFIX)
            .header(REQUEST_ID_HEADER, "pi-frontend-42")
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "pi-frontend-42");
        assert_eq!(response.headers()[TRACE_ID_HEADER], "pi-frontend-42");
        assert_eq!(body_json(response).await["trace_id"], "pi-frontend-42");
    }

    #[tokio::test]
    async fn test_incoming_trace_id_wins_and_is_echoed() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let request = Request::builder()
            .uri(CONFIG_PREFIX)
            .header("X-Trace-ID", "sdk-trace-7")
            .header(REQUEST_ID_HEADER, "ignored-request-id")
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.headers()[TRACE_ID_HEADER], "sdk-trace-7");
        assert_eq!(body_json(response).await["trace_id"], "sdk-trace-7");
    }

    #[tokio::test]
    async fn test_patch_masks_secret_and_secrets_endpoint_reveals_it() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let response = send(
            &state,
            json_request("PATCH", CONFIG_PREFIX, json!({"api_key": "sk-live", "llm_provider": "coze"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["config"]["api_key"], MASK);
        assert_eq!(body["data"]["config"]["llm_provider"], "coze");
        assert_eq!(body["data"]["message"], body["message"]);

        let response = send(&state, empty_request("GET", "/api/v1/config/secrets")).await;
        assert_eq!(body_json(response).await["data"]["config"]["api_key"], "sk-live");

        let response = send(
            &state,
            empty_request("GET", "/api/v1/config?include_secrets=true"),
        )
        .await;
        assert_eq!(body_json(response).await["data"]["config"]["api_key"], "sk-live");
    }

    #[tokio::test]
    async fn test_put_with_unknown_provider_is_rejected() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);
        send(&state, empty_request("POST", "/api/v1/config/reset")).await;
        let path = state.service.store().path().to_path_buf();
        let before = fs::read(&path).unwrap();

        let response = send(
            &state,
            json_request("PUT", CONFIG_PREFIX, json!({"llm_provider": "not_a_real_provider"})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "CONFIG_VALIDATION_ERROR");
        assert_eq!(body["errors"][0]["field"], "llm_provider");
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_non_object_bodies_are_rejected() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let response = send(&state, json_request("PATCH", CONFIG_PREFIX, json!([1, 2]))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["errors"][0]["field"], "body");

        let response = send(&state, json_request("PUT", CONFIG_PREFIX, json!("config"))).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let request = Request::builder()
            .method("PATCH")
            .uri(CONFIG_PREFIX)
            .header("content-type", "application/json")
            .body(Body::from("{\"notes\": "))
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "CONFIG_VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_reset_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);
        send(
            &state,
            json_request("PATCH", CONFIG_PREFIX, json!({"telemetry_enabled": true})),
        )
        .await;

        let response = send(&state, empty_request("POST", "/api/v1/config/reset")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["config"]["telemetry_enabled"], false);
        assert_eq!(body["message"], "Configuration reset to defaults successfully");
    }

    #[tokio::test]
    async fn test_schema_endpoint() {
        let dir = TempDir::new().unwrap();
        let state = create_test_state(&dir);

        let response = send(&state, empty_request("GET", "/api/v1/config/schema")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["data"]["type"], "object");
        assert_eq!(body["data"]["properties"]["api_key"]["x-sensitive"], true);
        assert_eq!(body["data"]["properties"]["llm_provider"]["default"], "openai");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_io_failure_maps_to_operation_code() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be: reads fail and so does the
        // rename that would replace it with defaults.
        let blocked = dir.path().join("config.json");
        fs::create_dir(&blocked).unwrap();
        let state = Arc::new(AppState {
            settings: ServiceSettings::default(),
            service: ConfigService::new(Arc::new(ConfigStore::at(&blocked))),
        });

        let response = send(&state, empty_request("GET", CONFIG_PREFIX)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "CONFIG_READ_ERROR");
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Failed to read configuration"));
    }
}
