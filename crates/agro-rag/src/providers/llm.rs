//! LLM provider trait for tool-calling chat

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
    /// Opaque signature the provider attached to the call; echoed back verbatim
    pub signature: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<String>) -> Self {
        self.signature = signature;
        self
    }
}

/// Output of one executed tool, returned to the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub name: String,
    pub content: String,
}

/// A message in the conversation sent to the model
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    User(String),
    Assistant(String),
    /// Function calls the model asked for in the previous step
    ToolCalls(Vec<ToolCall>),
    /// Results of those calls, in the same order
    ToolResults(Vec<ToolOutput>),
}

/// Declaration of a tool the model may call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

/// A chat request: instruction, conversation and available tools
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Final text answer
    Text(String),
    /// The model wants these tools run before it answers
    ToolCalls(Vec<ToolCall>),
}

/// Trait for hosted chat models with function calling
///
/// Implementations:
/// - `GeminiClient`: Gemini `generateContent` with function declarations
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one model step
    async fn chat(&self, request: &ChatRequest) -> Result<ModelReply>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
