//! Gemini client for chat with function calling and text embeddings
//!
//! Talks to the Generative Language API (`v1beta`) with an API key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, ChatRequest, LlmProvider, ModelReply, ToolCall};

const TASK_RETRIEVAL_QUERY: &str = "RETRIEVAL_QUERY";
const TASK_RETRIEVAL_DOCUMENT: &str = "RETRIEVAL_DOCUMENT";

/// Gemini client via the Generative Language API
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    embed_model: String,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    embed_batch_size: usize,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("GOOGLE_API_KEY is not set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: model_path(&config.chat_model),
            embed_model: model_path(&config.embed_model),
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
            embed_batch_size: config.embed_batch_size.max(1),
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }

    fn build_generate_request(&self, request: &ChatRequest) -> GenerateRequest {
        let contents = request.messages.iter().map(to_content).collect();

        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![ToolDeclarations {
                function_declarations: request
                    .tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    })
                    .collect(),
            }]
        };

        GenerateRequest {
            system_instruction: (!request.system.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part::text(&request.system)],
            }),
            contents,
            tools,
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        body: &B,
        wrap: fn(String) -> Error,
    ) -> Result<R> {
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| wrap(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(wrap(format!("Gemini request failed ({}): {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| wrap(format!("Failed to parse Gemini response: {}", e)))
    }

    async fn embed_batch(&self, texts: &[String], task_type: &str) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint(&self.embed_model, "batchEmbedContents");
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.embed_batch_size) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedRequest {
                        model: self.embed_model.clone(),
                        content: Content {
                            role: None,
                            parts: vec![Part::text(text)],
                        },
                        task_type: task_type.to_string(),
                    })
                    .collect(),
            };

            let response: BatchEmbedResponse = self.post_json(&url, &request, Error::Embedding).await?;
            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            all_embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(all_embeddings)
    }
}

/// Accept both `gemini-flash-latest` and `models/gemini-flash-latest`
fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn to_content(message: &ChatMessage) -> Content {
    match message {
        ChatMessage::User(text) => Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        },
        ChatMessage::Assistant(text) => Content {
            role: Some("model".to_string()),
            parts: vec![Part::text(text)],
        },
        ChatMessage::ToolCalls(calls) => Content {
            role: Some("model".to_string()),
            parts: calls
                .iter()
                .map(|call| Part {
                    function_call: Some(FunctionCall {
                        name: call.name.clone(),
                        args: call.args.clone(),
                    }),
                    thought_signature: call.signature.clone(),
                    ..Part::default()
                })
                .collect(),
        },
        ChatMessage::ToolResults(outputs) => Content {
            role: Some("user".to_string()),
            parts: outputs
                .iter()
                .map(|output| Part {
                    function_response: Some(FunctionResponse {
                        name: output.name.clone(),
                        response: serde_json::json!({
                            "name": output.name,
                            "content": output.content,
                        }),
                    }),
                    ..Part::default()
                })
                .collect(),
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
    /// Must accompany a function call when it is sent back in the history
    #[serde(skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: Content,
    task_type: String,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Turn the first candidate into a reply: function calls win over text
fn parse_reply(response: GenerateResponse) -> Result<ModelReply> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::llm("No candidates in Gemini response"))?;

    let parts = match candidate.content {
        Some(content) => content.parts,
        None => {
            return Err(Error::llm(format!(
                "Gemini returned no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )))
        }
    };

    let mut calls = Vec::new();
    let mut text = String::new();
    for part in parts {
        if let Some(call) = part.function_call {
            calls.push(ToolCall::new(call.name, call.args).with_signature(part.thought_signature));
        } else if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if !calls.is_empty() {
        Ok(ModelReply::ToolCalls(calls))
    } else {
        Ok(ModelReply::Text(text))
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ModelReply> {
        let body = self.build_generate_request(request);
        let url = self.endpoint(&self.chat_model, "generateContent");
        let response: GenerateResponse = self.post_json(&url, &body, Error::Llm).await?;
        parse_reply(response)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, self.chat_model))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await;
        Ok(matches!(response, Ok(r) if r.status().is_success()))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.chat_model
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: self.embed_model.clone(),
            content: Content {
                role: None,
                parts: vec![Part::text(text)],
            },
            task_type: TASK_RETRIEVAL_QUERY.to_string(),
        };
        let url = self.endpoint(&self.embed_model, "embedContent");
        let response: EmbedResponse = self.post_json(&url, &request, Error::Embedding).await?;
        Ok(response.embedding.values)
    }

    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_batch(texts, TASK_RETRIEVAL_DOCUMENT).await
    }

    async fn health_check(&self) -> Result<bool> {
        LlmProvider::health_check(self).await
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::{ToolOutput, ToolSpec};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            embed_batch_size: 2,
            ..GeminiConfig::default()
        };
        GeminiClient::new(&config).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            GeminiClient::new(&GeminiConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_model_path() {
        assert_eq!(model_path("embedding-001"), "models/embedding-001");
        assert_eq!(model_path("models/embedding-001"), "models/embedding-001");
    }

    #[test]
    fn test_request_shape() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "k".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        let request = ChatRequest {
            system: "Be brief".to_string(),
            messages: vec![
                ChatMessage::User("Report for Kottur 2022".to_string()),
                ChatMessage::ToolCalls(vec![ToolCall::new(
                    "generate_report",
                    json!({"year": "2022", "location": "Kottur"}),
                )
                .with_signature(Some("sig-1".to_string()))]),
                ChatMessage::ToolResults(vec![ToolOutput {
                    name: "generate_report".to_string(),
                    content: "Report generated successfully.".to_string(),
                }]),
            ],
            tools: vec![ToolSpec {
                name: "generate_report".to_string(),
                description: "Generate a PDF report".to_string(),
                parameters: json!({"type": "OBJECT"}),
            }],
        };

        let body = serde_json::to_value(client.build_generate_request(&request)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["args"]["location"], "Kottur");
        assert_eq!(body["contents"][1]["parts"][0]["thoughtSignature"], "sig-1");
        assert!(body["contents"][0]["parts"][0].get("thoughtSignature").is_none());
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["content"],
            "Report generated successfully."
        );
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "generate_report");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(body["generationConfig"]["topP"], 1.0);
    }

    #[tokio::test]
    async fn test_chat_returns_function_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-flash-latest:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{"functionCall": {"name": "retrieve", "args": {"query": "blast"}}}]
                    },
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server)
            .chat(&ChatRequest {
                messages: vec![ChatMessage::User("blast?".to_string())],
                ..ChatRequest::default()
            })
            .await
            .unwrap();

        assert_eq!(
            reply,
            ModelReply::ToolCalls(vec![ToolCall::new("retrieve", json!({"query": "blast"}))])
        );
    }

    #[tokio::test]
    async fn test_chat_joins_text_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Use "}, {"text": "tricyclazole."}]}
                }]
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server).chat(&ChatRequest::default()).await.unwrap();
        assert_eq!(reply, ModelReply::Text("Use tricyclazole.".to_string()));
    }

    #[tokio::test]
    async fn test_chat_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client_for(&server).chat(&ChatRequest::default()).await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_blocked_candidate_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"finishReason": "SAFETY"}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).chat(&ChatRequest::default()).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_embed_query_uses_query_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:embedContent"))
            .and(body_partial_json(json!({"taskType": "RETRIEVAL_QUERY"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embedding": {"values": [0.1, 0.2, 0.3]}
            })))
            .mount(&server)
            .await;

        let embedding = client_for(&server).embed_query("zinc").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_embed_documents_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:batchEmbedContents"))
            .and(body_partial_json(json!({
                "requests": [{"taskType": "RETRIEVAL_DOCUMENT", "model": "models/embedding-001"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [{"values": [1.0]}, {"values": [2.0]}]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let texts: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let embeddings = client_for(&server).embed_documents(&texts).await.unwrap();
        assert_eq!(embeddings, vec![vec![1.0], vec![2.0], vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn test_embed_documents_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/embedding-001:batchEmbedContents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [{"values": [1.0]}, {"values": [2.0]}]
            })))
            .mount(&server)
            .await;

        let texts: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let err = client_for(&server).embed_documents(&texts).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_function_call_signature_is_sent_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-flash-latest:generateContent"))
            .and(body_partial_json(json!({
                "contents": [
                    {"role": "user"},
                    {"role": "model", "parts": [{
                        "functionCall": {"name": "retrieve", "args": {"query": "blast"}},
                        "thoughtSignature": "c2lnbmF0dXJl"
                    }]},
                    {"role": "user"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"role": "model", "parts": [{"text": "Spray tricyclazole."}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-flash-latest:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{
                            "functionCall": {"name": "retrieve", "args": {"query": "blast"}},
                            "thoughtSignature": "c2lnbmF0dXJl"
                        }]
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut request = ChatRequest {
            messages: vec![ChatMessage::User("blast?".to_string())],
            ..ChatRequest::default()
        };

        let calls = match client.chat(&request).await.unwrap() {
            ModelReply::ToolCalls(calls) => calls,
            other => panic!("expected tool calls, got {:?}", other),
        };
        assert_eq!(calls[0].signature.as_deref(), Some("c2lnbmF0dXJl"));

        request.messages.push(ChatMessage::ToolCalls(calls));
        request.messages.push(ChatMessage::ToolResults(vec![ToolOutput {
            name: "retrieve".to_string(),
            content: "Content: tricyclazole".to_string(),
        }]));
        let reply = client.chat(&request).await.unwrap();
        assert_eq!(reply, ModelReply::Text("Spray tricyclazole.".to_string()));
    }
}
