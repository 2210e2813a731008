//! HTTP routes

pub mod ask;

use axum::{routing::post, Router};

use crate::server::state::AppState;

/// Build the API routes
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/ask", post(ask::ask))
}
