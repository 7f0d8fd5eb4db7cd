//! HTTP front end for the execution engine.
//!
//! Exposes the engine as a small JSON API: `POST /run` and `POST /trace`
//! both execute a submission (two names, one handler; older clients use
//! `/trace`), `GET /health` reports liveness. Responses carry the canonical
//! outcome shape directly, so a failed learner program is still a 200 with
//! an `{"error": ...}` payload; only caller mistakes (bad language, empty
//! code) and engine faults map to HTTP error statuses. Requests are rate
//! limited per client address before any work happens.

pub mod error;

pub use error::{Result, ServerError};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json as AxumJson, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, options, post};
use axum::{middleware, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tracelab_core::{Dispatcher, EngineError, ExecutionOutcome, Language, RateLimiter};

/// Configuration for the HTTP front end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Enable request logging
    pub enable_logging: bool,
    /// Maximum execution requests per client per window
    pub rate_limit: usize,
    /// Rate limit window
    pub rate_window: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".parse().expect("static bind address"),
            enable_cors: true,
            cors_origins: None, // Allow any origin
            enable_logging: true,
            rate_limit: 10,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address: {}", e)))?;
        Ok(self)
    }

    pub fn with_cors(mut self, enable: bool) -> Self {
        self.enable_cors = enable;
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    pub fn with_rate_limit(mut self, limit: usize, window: Duration) -> Self {
        self.rate_limit = limit;
        self.rate_window = window;
        self
    }
}

/// One execution request as submitted by the client.
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub language: String,
    pub code: String,
}

/// Shared application state.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    limiter: RateLimiter,
}

/// The rate limit key: first hop of `x-forwarded-for` when present (the
/// expected deployment sits behind a proxy), otherwise a fixed local bucket.
fn client_identity(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

/// Handler shared by `POST /run` and `POST /trace`.
async fn execute_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumJson(request): AxumJson<RunRequest>,
) -> std::result::Result<Json<ExecutionOutcome>, (StatusCode, Json<serde_json::Value>)> {
    let identity = client_identity(&headers);
    if !state.limiter.check(&identity) {
        log::warn!("rate limit exceeded for {}", identity);
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many requests, please try again later",
                "timestamp": chrono::Utc::now()
            })),
        ));
    }

    let language: Language = match request.language.parse() {
        Ok(language) => language,
        Err(e @ EngineError::UnsupportedLanguage(_)) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": e.to_string(),
                    "timestamp": chrono::Utc::now()
                })),
            ));
        }
        Err(e) => {
            log::error!("unexpected language parse failure: {}", e);
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Internal error",
                    "timestamp": chrono::Utc::now()
                })),
            ));
        }
    };

    log::info!("executing {} submission for {}", language, identity);
    match state.dispatcher.execute(language, &request.code).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e @ (EngineError::InvalidInput | EngineError::UnsupportedLanguage(_))) => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": e.to_string(),
                "timestamp": chrono::Utc::now()
            })),
        )),
        Err(e) => {
            log::error!("execution engine failure: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Execution engine failure",
                    "details": e.to_string(),
                    "timestamp": chrono::Utc::now()
                })),
            ))
        }
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// The execution API server.
pub struct TraceServer {
    dispatcher: Arc<Dispatcher>,
    limiter: RateLimiter,
    config: ServerConfig,
}

impl TraceServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_config(dispatcher, ServerConfig::default())
    }

    pub fn with_config(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limit, config.rate_window);
        Self {
            dispatcher: Arc::new(dispatcher),
            limiter,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            limiter: self.limiter.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/run", post(execute_handler))
            // Older clients call the same operation under /trace.
            .route("/trace", post(execute_handler))
            // CORS preflight
            .route("/run", options(|| async { StatusCode::OK }))
            .route("/trace", options(|| async { StatusCode::OK }))
            .with_state(state);

        if self.config.enable_logging {
            router = router.layer(middleware::from_fn(
                |request: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async {
                    let request_id = uuid::Uuid::new_v4().to_string();
                    let method = request.method().clone();
                    let uri = request.uri().clone();
                    log::info!("Request {} {} {}", request_id, method, uri);

                    let start = std::time::Instant::now();
                    let response = next.run(request).await;
                    let duration = start.elapsed();

                    log::info!("Response {} completed in {:?}", request_id, duration);
                    response
                },
            ));
        }

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = if let Some(ref origins) = self.config.cors_origins {
                let origins: std::result::Result<Vec<_>, _> =
                    origins.iter().map(|s| s.parse()).collect();
                match origins {
                    Ok(origins) => CorsLayer::new()
                        .allow_origin(origins)
                        .allow_methods(Any)
                        .allow_headers(Any),
                    Err(_) => CorsLayer::permissive(),
                }
            } else {
                CorsLayer::permissive()
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Start the server and block until it shuts down.
    pub async fn serve(self) -> Result<()> {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })?;

        log::info!("execution server starting on {}", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);
        log::info!("Run endpoint: http://{}/run", self.config.bind_addr);

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;
        Ok(())
    }

    /// Start the server, shutting down when `shutdown_signal` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr).await.map_err(|e| {
            ServerError::config_error(format!(
                "Failed to bind to {}: {}",
                self.config.bind_addr, e
            ))
        })?;

        log::info!(
            "execution server starting on {} with graceful shutdown",
            self.config.bind_addr
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("execution server shut down gracefully");
        Ok(())
    }
}

/// Utility function to create a shutdown signal from Ctrl+C / SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use tower::ServiceExt; // for `oneshot`
    use tracelab_core::EngineConfig;

    fn server() -> TraceServer {
        TraceServer::new(Dispatcher::new(EngineConfig::default()))
    }

    fn run_request(uri: &str, language: &str, code: &str, forwarded_for: &str) -> Request<Body> {
        let body = json!({ "language": language, "code": code });
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", forwarded_for)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_reports_healthy() {
        let app = server().build_router();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn run_returns_the_canonical_outcome_shape() {
        // A submission outside the supported JavaScript subset degrades to
        // an empty trace without touching any toolchain.
        let app = server().build_router();
        let response = app
            .oneshot(run_request("/run", "javascript", "class Widget {}", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "trace": [] }));
    }

    #[tokio::test]
    async fn trace_route_is_an_alias_for_run() {
        let app = server().build_router();
        let response = app
            .oneshot(run_request("/trace", "javascript", "class Widget {}", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body, json!({ "trace": [] }));
    }

    #[tokio::test]
    async fn unknown_language_is_a_bad_request() {
        let app = server().build_router();
        let response = app
            .oneshot(run_request("/run", "cobol", "DISPLAY 'HI'.", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "language 'cobol' is not supported");
    }

    #[tokio::test]
    async fn empty_code_is_a_bad_request() {
        let app = server().build_router();
        let response = app
            .oneshot(run_request("/run", "python", "   ", "1.2.3.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "no code provided");
    }

    #[tokio::test]
    async fn rate_limit_applies_per_client_address() {
        let config = ServerConfig::default().with_rate_limit(2, Duration::from_secs(60));
        let server = TraceServer::with_config(Dispatcher::new(EngineConfig::default()), config);
        let app = server.build_router();

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(run_request("/run", "javascript", "class A {}", "9.9.9.9"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
        let response = app
            .clone()
            .oneshot(run_request("/run", "javascript", "class A {}", "9.9.9.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        // A different client still gets through.
        let response = app
            .oneshot(run_request("/run", "javascript", "class A {}", "8.8.8.8"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
