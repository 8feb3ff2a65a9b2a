//! HTTP server for the scoring service.
//!
//! Thin routing over [`ScoringPipeline`] and [`TransactionStore`]: the
//! handlers translate core errors into status codes and nothing more.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::error::{ScoreError, StoreError};
use crate::metrics::PipelineMetrics;
use crate::pipeline::ScoringPipeline;
use crate::store::TransactionStore;
use crate::types::verdict::VerdictStatus;

/// Shared handler state
pub struct AppState {
    pub pipeline: ScoringPipeline,
    pub store: Arc<TransactionStore>,
    pub metrics: Arc<PipelineMetrics>,
}

impl AppState {
    pub fn new(
        pipeline: ScoringPipeline,
        store: TransactionStore,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            pipeline,
            store: Arc::new(store),
            metrics,
        }
    }
}

/// Successful `/predict` response
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub id: i64,
    pub status: VerdictStatus,
    pub anomaly: u8,
    pub anomaly_score: Option<f64>,
    /// Server timestamp, Unix milliseconds
    pub time: i64,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub transactions_scored: u64,
}

/// Handler failure, rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<ScoreError> for ApiError {
    fn from(e: ScoreError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Run a store operation off the async runtime
async fn with_store<T, F>(store: &Arc<TransactionStore>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&TransactionStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| ApiError::internal(format!("store task failed: {e}")))?
        .map_err(|e| {
            error!(error = %e, "Store operation failed");
            ApiError::from(e)
        })
}

/// Build the CORS layer; an empty origin list allows any origin
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::DELETE];
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let allowed: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(methods)
        .allow_headers(Any)
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict_handler))
        .route("/history", get(history_handler))
        .route("/alerts", get(alerts_handler))
        .route("/latest", get(latest_handler))
        .route("/clear-history", delete(clear_history_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(config: &ServerConfig, state: Arc<AppState>) -> Result<()> {
    let bind_addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server bind address")?;

    let app = router(state).layer(cors_layer(&config.allowed_origins));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!("Scoring server listening on {}", bind_addr);
    info!(
        "Endpoints: POST /predict, GET /history, GET /alerts, GET /latest, \
         DELETE /clear-history, GET /health"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Score, persist and report one transaction
async fn predict_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let start = Instant::now();

    // Unparseable bodies are scored as an empty mapping and rejected
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    // Inference blocks on the ONNX session mutex
    let scoring = state.clone();
    let scored = tokio::task::spawn_blocking(move || scoring.pipeline.score(&payload))
        .await
        .map_err(|e| {
            state.metrics.record_failure();
            ApiError::internal(format!("scoring task failed: {e}"))
        })?;

    let scored = scored.map_err(|e| {
        if e.is_client_error() {
            debug!(error = %e, "Transaction rejected");
            state.metrics.record_rejection();
        } else {
            error!(error = %e, "Scoring failed");
            state.metrics.record_failure();
        }
        ApiError::from(e)
    })?;

    let time = chrono::Utc::now().timestamp_millis();
    let verdict = scored.verdict;
    let id = with_store(&state.store, move |store| store.insert(&scored, time))
        .await
        .inspect_err(|_| state.metrics.record_failure())?;

    state.metrics.record_verdict(verdict.status, start.elapsed());
    debug!(
        id = id,
        status = %verdict.status,
        anomaly_score = ?verdict.anomaly_score,
        processing_time_us = start.elapsed().as_micros(),
        "Transaction stored"
    );

    Ok(Json(PredictResponse {
        id,
        status: verdict.status,
        anomaly: verdict.anomaly_flag,
        anomaly_score: verdict.anomaly_score,
        time,
    }))
}

async fn history_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let records = with_store(&state.store, |store| store.history()).await?;
    Ok(Json(records).into_response())
}

async fn alerts_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let alerts = with_store(&state.store, |store| store.alerts()).await?;
    Ok(Json(alerts).into_response())
}

async fn latest_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let latest = with_store(&state.store, |store| store.latest()).await?;
    Ok(match latest {
        Some(record) => Json(record).into_response(),
        None => Json(json!({})).into_response(),
    })
}

async fn clear_history_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let removed = with_store(&state.store, |store| store.clear()).await?;
    info!(removed = removed, "Transaction history cleared");
    Ok(Json(json!({ "message": "History cleared" })).into_response())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.pipeline.engine();
    let model_ready = engine.is_ready();

    Json(HealthResponse {
        status: if model_ready { "ok" } else { "degraded" },
        model_ready,
        degraded_reason: engine.degraded_reason().map(str::to_string),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.metrics.uptime().as_secs(),
        transactions_scored: state
            .metrics
            .transactions_scored
            .load(std::sync::atomic::Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::testing::{fixed_engine, IdentityScaler, SlowModel};
    use crate::models::inference::ScoringEngine;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    struct TestServer {
        base: String,
        client: reqwest::Client,
        state: Arc<AppState>,
        shutdown_tx: tokio::sync::oneshot::Sender<()>,
    }

    impl TestServer {
        async fn send(
            &self,
            method: Method,
            path: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = self.client.request(method, format!("{}{}", self.base, path));
            if let Some(body) = body {
                request = request.json(&body);
            }
            let response = request.send().await.expect("request");
            let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
            let bytes = response.bytes().await.expect("body");
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).expect("json body")
            };
            (status, json)
        }

        async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
            let response = self
                .client
                .post(format!("{}{}", self.base, path))
                .body(body)
                .send()
                .await
                .expect("request");
            let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
            (status, response.json().await.expect("json body"))
        }

        fn shutdown(self) {
            let _ = self.shutdown_tx.send(());
        }
    }

    async fn spawn_server(engine: ScoringEngine) -> TestServer {
        let state = Arc::new(AppState::new(
            ScoringPipeline::new(engine),
            TransactionStore::in_memory().expect("in-memory store"),
            Arc::new(PipelineMetrics::new()),
        ));
        let app = router(state.clone()).layer(cors_layer(&[]));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve scoring api");
        });

        TestServer {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            state,
            shutdown_tx,
        }
    }

    fn payment() -> Value {
        json!({
            "step": 1,
            "type": "PAYMENT",
            "amount": 1000,
            "oldbalanceOrg": 5000,
            "newbalanceOrig": 4000,
            "oldbalanceDest": 0,
            "newbalanceDest": 1000
        })
    }

    #[tokio::test]
    async fn test_predict_normal() {
        let server = spawn_server(fixed_engine(1, 0.25)).await;

        let (status, body) = server.send(Method::POST, "/predict", Some(payment())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Normal");
        assert_eq!(body["anomaly"], 0);
        assert_eq!(body["anomaly_score"], 0.25);
        assert!(body["id"].as_i64().unwrap() > 0);
        assert!(body["time"].as_i64().unwrap() > 0);
        assert_eq!(server.state.metrics.status_count(VerdictStatus::Normal), 1);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_predict_suspicious_shows_in_alerts() {
        let server = spawn_server(fixed_engine(-1, -0.15)).await;

        let (status, body) = server.send(Method::POST, "/predict", Some(payment())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Suspicious");
        assert_eq!(body["anomaly"], 1);

        let (status, alerts) = server.send(Method::GET, "/alerts", None).await;
        assert_eq!(status, StatusCode::OK);
        let alerts = alerts.as_array().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0]["id"], body["id"]);
        assert_eq!(alerts[0]["type"], "PAYMENT");
        assert_eq!(alerts[0]["score"], -0.15);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_predict_missing_field_is_bad_request() {
        let server = spawn_server(fixed_engine(1, 0.1)).await;
        let mut input = payment();
        input.as_object_mut().unwrap().remove("amount");

        let (status, body) = server.send(Method::POST, "/predict", Some(input)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing field 'amount'");
        assert_eq!(
            server
                .state
                .metrics
                .transactions_rejected
                .load(Ordering::Relaxed),
            1
        );

        let (_, history) = server.send(Method::GET, "/history", None).await;
        assert_eq!(history, json!([]));
        server.shutdown();
    }

    #[tokio::test]
    async fn test_predict_invalid_numeric_is_bad_request() {
        let server = spawn_server(fixed_engine(1, 0.1)).await;
        let mut input = payment();
        input["amount"] = json!("notanumber");

        let (status, body) = server.send(Method::POST, "/predict", Some(input)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid numeric value for 'amount'");
        server.shutdown();
    }

    #[tokio::test]
    async fn test_predict_garbage_body_rejected_on_step() {
        let server = spawn_server(fixed_engine(1, 0.1)).await;

        let (status, body) = server.post_raw("/predict", "not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing field 'step'");
        server.shutdown();
    }

    #[tokio::test]
    async fn test_out_of_range_amount_is_invalid_numeric() {
        let server = spawn_server(fixed_engine(1, 0.1)).await;

        let (status, body) = server
            .post_raw(
                "/predict",
                r#"{"step":1,"type":"PAYMENT","amount":1e400,"oldbalanceOrg":5000,"newbalanceOrig":4000,"oldbalanceDest":0,"newbalanceDest":1000}"#,
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid numeric value for 'amount'");
        server.shutdown();
    }

    #[tokio::test]
    async fn test_degraded_engine_reports_unknown() {
        let server = spawn_server(ScoringEngine::degraded("scaler missing")).await;

        let (status, body) = server.send(Method::POST, "/predict", Some(payment())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Unknown");
        assert_eq!(body["anomaly"], 0);
        assert!(body["anomaly_score"].is_null());

        let (_, health) = server.send(Method::GET, "/health", None).await;
        assert_eq!(health["status"], "degraded");
        assert_eq!(health["model_ready"], false);
        assert_eq!(health["degraded_reason"], "scaler missing");
        assert_eq!(health["transactions_scored"], 1);
        server.shutdown();
    }

    #[tokio::test]
    async fn test_history_latest_and_clear() {
        let server = spawn_server(fixed_engine(1, 0.3)).await;

        let (_, latest) = server.send(Method::GET, "/latest", None).await;
        assert_eq!(latest, json!({}));

        let mut second = payment();
        second["step"] = json!(2.9);
        second["type"] = json!("cash out");
        server.send(Method::POST, "/predict", Some(payment())).await;
        let (_, created) = server.send(Method::POST, "/predict", Some(second)).await;

        let (_, history) = server.send(Method::GET, "/history", None).await;
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["id"], created["id"]);
        assert_eq!(history[0]["step"], 2);
        assert_eq!(history[0]["type"], "cash out");
        assert_eq!(history[0]["oldbalanceOrg"], 5000.0);
        assert_eq!(history[0]["newbalanceDest"], 1000.0);

        let (_, latest) = server.send(Method::GET, "/latest", None).await;
        assert_eq!(latest["id"], created["id"]);

        let (status, cleared) = server.send(Method::DELETE, "/clear-history", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["message"], "History cleared");

        let (_, history) = server.send(Method::GET, "/history", None).await;
        assert_eq!(history, json!([]));
        server.shutdown();
    }

    #[tokio::test]
    async fn test_slow_inference_does_not_stall_other_requests() {
        let engine = ScoringEngine::ready(
            Box::new(IdentityScaler),
            Box::new(SlowModel::new(Duration::from_millis(500))),
        );
        let server = Arc::new(spawn_server(engine).await);

        let predict = {
            let server = server.clone();
            tokio::spawn(async move {
                server
                    .send(Method::POST, "/predict", Some(payment()))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, health) = server.send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["transactions_scored"], 0);
        assert!(!predict.is_finished());

        let (status, body) = predict.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Normal");
    }

    #[tokio::test]
    async fn test_health_ready() {
        let server = spawn_server(fixed_engine(1, 0.1)).await;

        let (status, health) = server.send(Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["model_ready"], true);
        assert!(health.get("degraded_reason").is_none());
        server.shutdown();
    }

    #[test]
    fn test_inference_failure_maps_to_500() {
        let err = ApiError::from(ScoreError::from(anyhow::anyhow!("boom")));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "inference failed: boom");
    }
}
