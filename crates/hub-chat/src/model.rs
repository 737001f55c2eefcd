//! The chat HTTP client is an external collaborator (spec.md §1); this
//! module is the seam plus a best-effort streaming implementation against
//! an OpenAI-style server-sent-events endpoint.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::request::ChatRequest;

pub type ContentDeltaStream = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send>>;

#[async_trait]
pub trait ChatModelClient: Send + Sync + 'static {
    async fn stream(&self, request: ChatRequest) -> Result<ContentDeltaStream, ChatError>;
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    stream: bool,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    messages: Vec<WireMessage>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

pub struct HttpChatModelClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl HttpChatModelClient {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn wire_messages(request: &ChatRequest) -> Vec<WireMessage> {
        let mut messages = vec![
            WireMessage { role: "system", content: request.system_prompt.clone() },
            WireMessage { role: "system", content: request.reference_block.clone() },
        ];
        for m in &request.history {
            let role = match m.role {
                hub_primitives::MessageRole::User => "user",
                hub_primitives::MessageRole::Assistant => "assistant",
            };
            messages.push(WireMessage { role, content: m.content.clone() });
        }
        messages.push(WireMessage { role: "user", content: request.user_message.clone() });
        messages
    }

    fn parse_sse_deltas(bytes: &[u8]) -> Vec<Result<String, ChatError>> {
        let text = String::from_utf8_lossy(bytes).into_owned();
        let mut out = Vec::new();
        for line in text.lines() {
            let Some(data) = line.strip_prefix("data: ") else { continue };
            if data == "[DONE]" {
                continue;
            }
            match serde_json::from_str::<StreamChunk>(data) {
                Ok(parsed) => {
                    for choice in parsed.choices {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                out.push(Ok(content));
                            }
                        }
                    }
                }
                Err(e) => out.push(Err(ChatError::Model(e.to_string()))),
            }
        }
        out
    }
}

#[async_trait]
impl ChatModelClient for HttpChatModelClient {
    async fn stream(&self, request: ChatRequest) -> Result<ContentDeltaStream, ChatError> {
        let body = CompletionRequest {
            model: &self.model,
            stream: true,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_tokens: request.params.max_tokens,
            messages: Self::wire_messages(&request),
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Model(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(ChatError::Model(format!("chat model returned {}", resp.status())));
        }

        let byte_stream = resp.bytes_stream();
        let deltas = byte_stream.flat_map(|chunk| {
            let items: Vec<Result<String, ChatError>> = match chunk {
                Ok(bytes) => Self::parse_sse_deltas(&bytes),
                Err(e) => vec![Err(ChatError::Model(e.to_string()))],
            };
            futures_util::stream::iter(items)
        });

        Ok(Box::pin(deltas))
    }
}
