//! Ask request types

use serde::{Deserialize, Serialize};

use crate::agent::DEFAULT_SESSION_ID;

/// Form body of `POST /ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    /// The user's message
    pub query: String,
    /// Conversation key; clients without one share the default session
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}
