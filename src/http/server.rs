//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the three proxy routes
//! - Wire up middleware (request ID, tracing, metrics, optional deadline)
//! - Serve on a bound listener until shutdown

use axum::{middleware, routing::any, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::engine::{Connector, EngineResult, GrpcConnector};
use crate::http::handlers;
use crate::http::request::{make_request_span, UuidRequestId, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Connector>,
    /// Largest accepted `/parse` body; unbounded when `None`.
    pub max_body_bytes: Option<usize>,
}

/// HTTP server for the UAST proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server talking to the engine over gRPC at the configured address.
    pub fn new(config: ProxyConfig) -> EngineResult<Self> {
        let connector = GrpcConnector::new(&config.engine)?;
        tracing::info!(engine = %connector.address(), "Engine address resolved");
        Ok(Self::with_connector(config, Arc::new(connector)))
    }

    /// Create a server with a caller-supplied engine connector.
    pub fn with_connector(config: ProxyConfig, engine: Arc<dyn Connector>) -> Self {
        let state = AppState {
            engine,
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/version", any(handlers::version))
            .route("/languages", any(handlers::languages))
            .route("/parse", any(handlers::parse))
            .with_state(state);

        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }

        router
            .layer(middleware::from_fn(metrics::track_requests))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Run the server on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            engine = %self.config.engine.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
