//! HTTP server for the agronomy assistant

pub mod routes;
pub mod state;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::RagConfig;
use crate::error::{Error, Result};
use state::{AgentMode, AppState};

/// Agronomy assistant HTTP server
pub struct RagServer {
    state: AppState,
}

impl RagServer {
    /// Create the server, building the agent from config.
    ///
    /// The reports directory is created up front so it can be served before
    /// the first report is written.
    pub fn new(config: RagConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.reports.output_dir)?;
        Ok(Self::with_state(AppState::new(config)))
    }

    /// Create from prepared state
    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let reports = ServeDir::new(&self.state.config().reports.output_dir);

        Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            .merge(routes::api_routes())
            .nest_service("/reports", reports)
            .with_state(self.state.clone())
            // Applied bottom to top
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting agronomy assistant on http://{}", addr);
        if !self.state.is_ready() {
            tracing::warn!("Agent unavailable, /ask will answer with the system error message");
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        let server = &self.state.config().server;
        format!("{}:{}", server.host, server.port)
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint: the agent is up and its upstreams answer
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let healthy = match state.agent_mode() {
        AgentMode::Ready(agent) => agent.health_check().await,
        AgentMode::Unavailable { .. } => false,
    };
    if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
