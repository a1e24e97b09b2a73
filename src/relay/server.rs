//! Relay HTTP server with axum router and graceful shutdown.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::error::RelayError;
use super::handlers::{get_status, ws_handler, AppState};
use crate::config::ServerConfig;
use crate::session::Session;

/// HTTP server exposing the realtime relay.
pub struct RelayServer {
    /// Server configuration.
    config: ServerConfig,
    /// Application state shared across handlers.
    state: AppState,
}

impl RelayServer {
    /// Create a new relay server with default configuration.
    #[must_use]
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            config: ServerConfig::default(),
            state: AppState::new(session),
        }
    }

    /// Set the server configuration (builder pattern).
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Get the configured address as a string.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/api/status", get(get_status))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http());

        if self.config.cors_permissive {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Bind the configured address.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::BindError` if the address cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener, RelayError> {
        let address = self.address();
        TcpListener::bind(&address)
            .await
            .map_err(|source| RelayError::BindError { address, source })
    }

    /// Serve on an already bound listener until the session is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while serving.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RelayError> {
        let cancel = self.state.session.cancellation_token();
        let app = self.build_router();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Relay listening");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Relay server shutting down gracefully");
            })
            .await
            .map_err(|e| RelayError::ServerError(e.to_string()))
    }

    /// Bind and serve.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or serve.
    pub async fn run(self) -> Result<(), RelayError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }
}
