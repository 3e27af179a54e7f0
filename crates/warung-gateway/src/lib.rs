// SPDX-FileCopyrightText: 2026 Warung Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Routes: `/healthz`, `/metrics` (Prometheus exposition),
//! `/admin/reload-price-cache`, and `/webhook/atlantic`. An optional
//! configured base path is stripped before routing by nesting the router
//! under it.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use warung_atlantic::webhook::{detect_event_kind, SIGNATURE_HEADERS};
use warung_atlantic::{Client as AtlanticClient, EventKind, WebhookEvent, WebhookGate, WebhookProcessor};
use warung_core::{CatalogType, WarungError};
use warung_metrics::record_error;

/// Shared state for the gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub atlantic: Arc<AtlanticClient>,
    pub gate: Arc<WebhookGate>,
    pub processor: Arc<dyn WebhookProcessor>,
    /// Prometheus render function; `None` disables `/metrics`.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Build the gateway router, nested under `base_path` when configured.
pub fn router(state: GatewayState, base_path: &str) -> Router {
    let routes = Router::new()
        .route("/healthz", get(get_healthz))
        .route("/metrics", get(get_metrics))
        .route("/admin/reload-price-cache", post(post_reload_price_cache))
        .route("/webhook/atlantic", post(post_webhook))
        .with_state(state)
        .layer(CorsLayer::permissive());

    match normalize_base_path(base_path) {
        Some(base) => {
            info!(base_path = %base, "gateway mounted under base path");
            Router::new().nest(&base, routes)
        }
        None => routes,
    }
}

/// Bind and serve until `shutdown` resolves, then drain connections.
pub async fn serve<F>(addr: &str, app: Router, shutdown: F) -> Result<(), WarungError>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| WarungError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| WarungError::Internal(format!("gateway server error: {e}")))
}

async fn get_healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics disabled").into_response(),
    }
}

async fn post_reload_price_cache(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let raw_type = params.get("type").map(String::as_str).unwrap_or("");
    let catalog_type = match CatalogType::parse(raw_type) {
        Ok(catalog_type) => catalog_type,
        Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
    };

    match state.atlantic.price_list(catalog_type, true).await {
        Ok(items) => Json(serde_json::json!({
            "status": "ok",
            "type": catalog_type.as_str(),
            "count": items.len(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, catalog_type = %catalog_type, "price cache reload failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed reloading price list",
            )
                .into_response()
        }
    }
}

async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok());
    let signature = SIGNATURE_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .find(|value| !value.trim().is_empty());

    if state.gate.authorize(authorization, signature).is_err() {
        record_error("atlantic_webhook_auth");
        return (StatusCode::UNAUTHORIZED, "unauthorized").into_response();
    }

    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let raw_kind = detect_event_kind(&header_map, &body);
    let event = WebhookEvent {
        kind: EventKind::from_raw(&raw_kind),
        raw_kind,
        headers: header_map,
        payload: body.to_vec(),
        received_at: chrono::Utc::now(),
    };

    match state.processor.handle_event(event).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => {
            error!(error = %e, "webhook processing failed");
            record_error("atlantic_webhook_process");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to process").into_response()
        }
    }
}

fn normalize_base_path(base: &str) -> Option<String> {
    let base = base.trim();
    if base.is_empty() || base == "/" {
        return None;
    }
    let with_slash = if base.starts_with('/') {
        base.to_string()
    } else {
        format!("/{base}")
    };
    Some(with_slash.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // md5("user") / md5("pass")
    const USER_MD5: &str = "ee11cbb19052e40b07aac0ca060c23ee";
    const PASS_MD5: &str = "1a1dc91c907325c69271ddf0c944bc72";

    #[derive(Default)]
    struct RecordingProcessor {
        events: Mutex<Vec<(EventKind, Vec<u8>)>>,
        fail: bool,
    }

    #[async_trait]
    impl WebhookProcessor for RecordingProcessor {
        async fn handle_event(&self, event: WebhookEvent) -> Result<(), WarungError> {
            self.events
                .lock()
                .unwrap()
                .push((event.kind, event.payload.clone()));
            if self.fail {
                return Err(WarungError::Internal("boom".into()));
            }
            Ok(())
        }
    }

    async fn spawn_gateway(
        atlantic_url: &str,
        processor: Arc<RecordingProcessor>,
        base_path: &str,
    ) -> String {
        let atlantic = Arc::new(
            AtlanticClient::new(
                warung_atlantic::ClientConfig {
                    base_url: atlantic_url.to_string(),
                    api_key: "key".into(),
                    timeout: Duration::from_secs(5),
                    price_ttl: Duration::from_secs(60),
                },
                None,
            )
            .unwrap(),
        );
        let state = GatewayState {
            atlantic,
            gate: Arc::new(WebhookGate::new(USER_MD5, PASS_MD5)),
            processor,
            prometheus_render: Some(Arc::new(|| "# metrics\n".to_string())),
        };
        let app = router(state, base_path);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn healthz_and_metrics_respond() {
        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway("http://127.0.0.1:1", processor, "").await;

        let health: serde_json::Value = reqwest::get(format!("{base}/healthz"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");

        let metrics = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert!(metrics.status().is_success());
    }

    #[tokio::test]
    async fn webhook_requires_auth() {
        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway("http://127.0.0.1:1", processor.clone(), "").await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook/atlantic"))
            .body(r#"{"event":"deposit"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 401);
        assert!(processor.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_accepts_basic_auth_and_dispatches() {
        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway("http://127.0.0.1:1", processor.clone(), "").await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook/atlantic"))
            .basic_auth("user", Some("pass"))
            .body(r#"{"event":"deposit","reff_id":"D-1","status":"sukses"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        let events = processor.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, EventKind::Deposit);
    }

    #[tokio::test]
    async fn webhook_accepts_signature_header() {
        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway("http://127.0.0.1:1", processor.clone(), "").await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook/atlantic"))
            .header("X-Atl-Signature", USER_MD5)
            .header("X-Atlantic-Event", "transfer")
            .body(r#"{"reff_id":"T-1","status":"pending"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let events = processor.events.lock().unwrap();
        assert_eq!(events[0].0, EventKind::Transfer);
    }

    #[tokio::test]
    async fn processor_error_maps_to_500() {
        let processor = Arc::new(RecordingProcessor {
            fail: true,
            ..Default::default()
        });
        let base = spawn_gateway("http://127.0.0.1:1", processor, "").await;

        let response = reqwest::Client::new()
            .post(format!("{base}/webhook/atlantic"))
            .basic_auth("user", Some("pass"))
            .body(r#"{"event":"deposit"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
    }

    #[tokio::test]
    async fn base_path_is_stripped_before_routing() {
        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway("http://127.0.0.1:1", processor, "/bot").await;

        let nested = reqwest::get(format!("{base}/bot/healthz")).await.unwrap();
        assert!(nested.status().is_success());

        let bare = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(bare.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn reload_price_cache_reports_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/layanan/price_list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "data": [
                    {"code": "A", "name": "A", "price": 1000},
                    {"code": "B", "name": "B", "price": 2000}
                ]
            })))
            .mount(&server)
            .await;

        let processor = Arc::new(RecordingProcessor::default());
        let base = spawn_gateway(&server.uri(), processor, "").await;

        let response = reqwest::Client::new()
            .post(format!("{base}/admin/reload-price-cache?type=prabayar"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["type"], "prabayar");
        assert_eq!(body["count"], 2);
    }
}
