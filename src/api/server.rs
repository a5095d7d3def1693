//! API HTTP Server
//!
//! Axum server with CORS, optional request tracing and graceful shutdown.

use axum::{
    http::{header, Method},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{api_router, AppState};
use crate::orchestrator::Orchestrator;

/// API server
pub struct ApiServer {
    addr: SocketAddr,
    log_requests: bool,
    state: AppState,
}

impl ApiServer {
    pub fn new(orchestrator: Arc<Orchestrator>, addr: SocketAddr, log_requests: bool) -> Self {
        Self {
            addr,
            log_requests,
            state: AppState::new(orchestrator),
        }
    }

    /// Build the router with all routes and middleware
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]);

        let mut router = api_router(self.state.clone()).layer(cors);

        // Add request logging if enabled
        if self.log_requests {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server and run until shutdown signal
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.build_router();

        if !self.addr.ip().is_loopback() {
            warn!("API bound to {} - no authentication is performed", self.addr);
        }

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!("Orchestrator API listening on http://{}", self.addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("API server shut down gracefully");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Database;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server(log_requests: bool) -> ApiServer {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let orchestrator = Orchestrator::with_builtin_handlers(db, &Config::default()).unwrap();
        ApiServer::new(
            Arc::new(orchestrator),
            "127.0.0.1:0".parse().unwrap(),
            log_requests,
        )
    }

    #[tokio::test]
    async fn test_router_with_middleware() {
        for log_requests in [true, false] {
            let router = server(log_requests).build_router();
            let response = router
                .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let router = server(false).build_router();
        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/tasks")
                    .header(header::ORIGIN, "http://localhost:3000")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
