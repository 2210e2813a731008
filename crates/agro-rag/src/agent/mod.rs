//! Tool-using conversational agent
//!
//! Each turn sends the system instruction, the session history and the new
//! input to the model. Requested tool calls are executed in order and their
//! outputs fed back until the model answers with text.

pub mod prompt;
pub mod report;
pub mod session;
pub mod tools;

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{
    ChatMessage, ChatRequest, EmbeddingProvider, GeminiClient, LlmProvider, ModelReply,
    SupabaseVectorStore, VectorStoreProvider,
};
use crate::types::{ChatRole, ChatTurn};

pub use prompt::PromptBuilder;
pub use report::{CropTable, ReportError, ReportGenerator, YearFilter};
pub use session::{SessionStore, DEFAULT_SESSION_ID};
pub use tools::{ReportTool, RetrieveTool, Tool, ToolError, ToolSet};

/// The agronomy agent
pub struct Agent {
    llm: Arc<dyn LlmProvider>,
    tools: ToolSet,
    system: String,
    max_iterations: Option<usize>,
}

impl Agent {
    /// Create an agent with an explicit tool set
    pub fn new(llm: Arc<dyn LlmProvider>, tools: ToolSet, base_instruction: &str) -> Self {
        Self {
            llm,
            tools,
            system: PromptBuilder::system_instruction(base_instruction),
            max_iterations: None,
        }
    }

    /// Stop a turn after this many model calls
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Agent with the retrieval and report tools over the given providers
    pub fn with_providers(
        config: &RagConfig,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        let tools = ToolSet::new()
            .with(Arc::new(RetrieveTool::new(embedder, store, config.agent.retrieval_k)))
            .with(Arc::new(ReportTool::new(ReportGenerator::new(&config.reports))));

        Self::new(llm, tools, &config.agent.base_instruction)
            .with_max_iterations(config.agent.max_iterations)
    }

    /// Agent backed by Gemini and Supabase
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;
        let gemini = Arc::new(GeminiClient::new(&config.gemini)?);
        let store = Arc::new(SupabaseVectorStore::new(&config.supabase)?);

        tracing::info!(
            "Agent ready: model={}, vector store={}",
            gemini.model(),
            store.name()
        );

        Ok(Self::with_providers(config, gemini.clone(), gemini, store))
    }

    /// Model and tool backends all reachable
    pub async fn health_check(&self) -> bool {
        match self.llm.health_check().await {
            Ok(true) => self.tools.health_check().await,
            other => {
                tracing::warn!("{} health check failed: {:?}", self.llm.name(), other);
                false
            }
        }
    }

    pub fn system_instruction(&self) -> &str {
        &self.system
    }

    /// Run one turn against the given history
    pub async fn run(&self, history: &[ChatTurn], input: &str) -> Result<String> {
        let mut messages: Vec<ChatMessage> = history
            .iter()
            .map(|turn| match turn.role {
                ChatRole::User => ChatMessage::User(turn.content.clone()),
                ChatRole::Assistant => ChatMessage::Assistant(turn.content.clone()),
            })
            .collect();
        messages.push(ChatMessage::User(input.to_string()));

        let mut request = ChatRequest {
            system: self.system.clone(),
            messages,
            tools: self.tools.specs(),
        };

        let mut iterations = 0;
        loop {
            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    return Err(Error::llm(format!(
                        "Agent stopped after {} iterations without an answer",
                        max
                    )));
                }
            }
            iterations += 1;

            match self.llm.chat(&request).await? {
                ModelReply::Text(text) => {
                    tracing::debug!("Agent answered after {} model call(s)", iterations);
                    return Ok(text);
                }
                ModelReply::ToolCalls(calls) => {
                    let mut outputs = Vec::with_capacity(calls.len());
                    for call in &calls {
                        tracing::info!("Invoking tool {} with {}", call.name, call.args);
                        outputs.push(self.tools.execute(call).await);
                    }
                    request.messages.push(ChatMessage::ToolCalls(calls));
                    request.messages.push(ChatMessage::ToolResults(outputs));
                }
            }
        }
    }

    /// Run a turn for a session and record it.
    ///
    /// The session stays locked for the whole turn. History is only extended
    /// when the turn succeeds.
    pub async fn respond(&self, sessions: &SessionStore, session_id: &str, query: &str) -> Result<String> {
        let mut history = sessions.lock(session_id).await;
        let answer = self.run(&history, query).await?;
        history.push(ChatTurn::user(query));
        history.push(ChatTurn::assistant(answer.clone()));
        Ok(answer)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays canned replies and records every request
    #[derive(Default)]
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<ModelReply>>>,
        pub requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<Result<ModelReply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn chat(&self, request: &ChatRequest) -> Result<ModelReply> {
            self.requests.lock().push(request.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ModelReply::Text("done".to_string())))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }
}
