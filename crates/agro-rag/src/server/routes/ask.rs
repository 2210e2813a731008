//! Chat endpoint

use axum::{extract::State, Form, Json};

use crate::error::Result;
use crate::server::state::{AgentMode, AppState, SYSTEM_ERROR_RESPONSE};
use crate::types::{AskRequest, AskResponse};

/// POST /ask - Run one agent turn for a session
pub async fn ask(
    State(state): State<AppState>,
    Form(request): Form<AskRequest>,
) -> Result<Json<AskResponse>> {
    let agent = match state.agent_mode() {
        AgentMode::Ready(agent) => agent.clone(),
        AgentMode::Unavailable { reason } => {
            tracing::warn!("Query rejected, agent unavailable: {}", reason);
            return Ok(Json(AskResponse::new(SYSTEM_ERROR_RESPONSE)));
        }
    };

    tracing::info!(session_id = %request.session_id, "Query: \"{}\"", request.query);

    let response = agent
        .respond(state.sessions(), &request.session_id, &request.query)
        .await?;

    tracing::debug!(session_id = %request.session_id, "Response: \"{}\"", response);

    Ok(Json(AskResponse::new(response)))
}
