//! Application state for the HTTP server

use std::sync::Arc;

use crate::agent::{Agent, SessionStore};
use crate::config::RagConfig;
use crate::error::{Error, Result};

/// Text returned by `/ask` when the agent could not be started
pub const SYSTEM_ERROR_RESPONSE: &str =
    "System Error: The backend encountered a critical dependency issue. Please check the logs.";

/// Whether the agent came up at startup
pub enum AgentMode {
    Ready(Arc<Agent>),
    /// Startup failed; every query gets the system error text
    Unavailable { reason: String },
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    agent: AgentMode,
    sessions: SessionStore,
}

impl AppState {
    /// Build the hosted-service agent. Failures are logged, written to the
    /// debug log file and turn the server into system-error mode.
    pub fn new(config: RagConfig) -> Self {
        tracing::info!("Initializing application state...");

        let agent = match Agent::from_config(&config) {
            Ok(agent) => AgentMode::Ready(Arc::new(agent)),
            Err(e) => {
                tracing::error!("Critical error while initializing the agent: {}", e);
                write_debug_log(&config, &e);
                AgentMode::Unavailable {
                    reason: e.to_string(),
                }
            }
        };

        Self::with_mode(config, agent)
    }

    /// State around an already built agent
    pub fn with_agent(config: RagConfig, agent: Agent) -> Self {
        Self::with_mode(config, AgentMode::Ready(Arc::new(agent)))
    }

    /// State in system-error mode
    pub fn unavailable(config: RagConfig, reason: impl Into<String>) -> Self {
        Self::with_mode(
            config,
            AgentMode::Unavailable {
                reason: reason.into(),
            },
        )
    }

    fn with_mode(config: RagConfig, agent: AgentMode) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                agent,
                sessions: SessionStore::new(),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn agent_mode(&self) -> &AgentMode {
        &self.inner.agent
    }

    /// The agent, or the startup failure
    pub fn agent(&self) -> Result<Arc<Agent>> {
        match &self.inner.agent {
            AgentMode::Ready(agent) => Ok(agent.clone()),
            AgentMode::Unavailable { reason } => Err(Error::AgentUnavailable(reason.clone())),
        }
    }

    /// Per-session chat history
    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        matches!(self.inner.agent, AgentMode::Ready(_))
    }
}

fn write_debug_log(config: &RagConfig, error: &Error) {
    let path = &config.server.debug_log_path;
    let contents = format!("Exception: {}\n", error);
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!("Could not write {}: {}", path.display(), e);
    }
}
