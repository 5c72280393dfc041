use crate::handlers;
use axum::{routing::get, Router};
use gamma_service::SnapshotCoordinator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Read-only HTTP surface. Handlers never trigger refreshes; they only read
/// the coordinator's cache.
pub struct ApiServer {
    coordinator: SnapshotCoordinator,
}

impl ApiServer {
    #[must_use]
    pub const fn new(coordinator: SnapshotCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/health", get(handlers::health))
            .route("/api/dashboard/snapshot", get(handlers::snapshot))
            .route("/api/dashboard/history", get(handlers::history))
            .route("/api/dashboard/debug", get(handlers::debug))
            .fallback(handlers::fallback)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.coordinator.clone())
    }

    /// Starts the web server listening on the specified address and serves
    /// until `shutdown` resolves.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(
        self,
        addr: &str,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}
