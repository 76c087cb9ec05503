//! This module provides a small synchronous client for OpenAI-compatible chat-completion servers
//! (LM Studio, llama.cpp, vLLM, ...). Tools that rely on an LLM share its configuration and the
//! request/response types, so building requests and unpacking replies is done in one place.

use crate::schema::ObjectSchema;
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};


/// API Key wrapper that hides the key in debug output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(pub String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("********")
    }
}

/// Configuration for LLM clients.
#[derive(Clone, Debug, Deserialize)]
pub struct LLMConfig {
    /// Base URL of the OpenAI-compatible API, including the version prefix. Example:
    /// "http://localhost:1234/v1"
    #[serde(default = "default_address")]
    pub address: String,

    /// API Key for the LLM service. Local servers usually ignore it.
    pub api_key: Option<ApiKey>,

    /// Name of the model to invoke.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    /// Maximum output tokens. 0 leaves the limit to the server.
    #[serde(default)]
    pub max_tokens: u32,

    /// Timeout of the reachability probe, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Timeout of a chat completion, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_address() -> String {
    "http://localhost:1234/v1".into()
}

fn default_model() -> String {
    "local-model".into()
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for LLMConfig {
    fn default() -> Self {
        LLMConfig {
            address: default_address(),
            api_key: None,
            model: default_model(),
            temperature: 0.0,
            max_tokens: 0,
            probe_timeout_secs: default_probe_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A role-tagged chat message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> ChatMessage {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A function the model may ask to call instead of answering in text.
#[derive(Clone, Debug, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    pub function: FunctionDefinition,
}

#[derive(Clone, Debug, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ObjectSchema,
}

impl ToolDefinition {
    pub fn function(name: &str, description: &str, parameters: ObjectSchema) -> ToolDefinition {
        ToolDefinition {
            kind: "function",
            function: FunctionDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters,
            },
        }
    }
}

/// Structured output constraint: the reply content must be JSON matching `schema`.
#[derive(Clone, Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    pub json_schema: JsonSchemaFormat,
}

#[derive(Clone, Debug, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: ObjectSchema,
}

impl ResponseFormat {
    pub fn json_schema(name: &str, schema: ObjectSchema) -> ResponseFormat {
        ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: name.to_string(),
                strict: true,
                schema,
            },
        }
    }
}

/// Body of a `POST /chat/completions` call. Streaming is never requested.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    stream: bool,
}

impl ChatRequest {
    pub fn new(model: &str, messages: Vec<ChatMessage>) -> ChatRequest {
        ChatRequest {
            model: model.to_string(),
            messages,
            tools: vec![],
            response_format: None,
            temperature: 0.0,
            max_tokens: None,
            stream: false,
        }
    }

    pub fn tool(mut self, tool: ToolDefinition) -> ChatRequest {
        self.tools.push(tool);
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> ChatRequest {
        self.response_format = Some(format);
        self
    }

    pub fn temperature(mut self, temperature: f32) -> ChatRequest {
        self.temperature = temperature;
        self
    }

    /// Sets the output token limit; 0 leaves it unset.
    pub fn max_tokens(mut self, max_tokens: u32) -> ChatRequest {
        self.max_tokens = (max_tokens > 0).then_some(max_tokens);
        self
    }
}

/// Reply of a `POST /chat/completions` call. Only the fields we read are modeled.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<Value>>,
}

impl ChatResponse {
    /// Returns the text content of the first choice.
    pub fn content(&self) -> Result<&str, ResponseError> {
        let message = &self.choices.first().ok_or(ResponseError::NoChoices)?.message;
        match message.content.as_deref() {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => match message.tool_calls {
                Some(ref calls) if !calls.is_empty() => Err(ResponseError::ToolCalls(calls.len())),
                _ => Err(ResponseError::EmptyContent),
            },
        }
    }
}

/// Strips a markdown code fence (optionally tagged `json`) wrapped around a reply.
pub fn strip_code_fences(response: &str) -> &str {
    let response = response.trim();
    let Some(inner) = response.strip_prefix("```") else {
        return response;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Client for an OpenAI-compatible inference server.
pub struct InferenceClient {
    http: Client,
    address: String,
    api_key: Option<ApiKey>,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl InferenceClient {
    pub fn new(config: &LLMConfig) -> Result<InferenceClient, LLMError> {
        let http = Client::builder().build().map_err(LLMError::Client)?;
        Ok(InferenceClient {
            http,
            address: config.address.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.0.is_empty()),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Full URL of an API endpoint, e.g. `endpoint("models")`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.address, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.bearer_auth(&key.0),
            None => request,
        }
    }

    /// Returns true if `GET /models` answers 200 within the probe timeout. Never retries.
    pub fn check_reachable(&self) -> bool {
        let url = self.endpoint("models");
        let request = self.authorize(self.http.get(&url)).timeout(self.probe_timeout);
        match request.send() {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                debug!("{url} answered {}", response.status());
                false
            }
            Err(e) => {
                debug!("{url} unreachable: {e}");
                false
            }
        }
    }

    /// Sends a single chat completion and decodes the reply envelope.
    pub fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
        let url = self.endpoint("chat/completions");
        debug!("POST {url} (model {})", request.model);
        let transport = |source| LLMError::Transport {
            url: url.clone(),
            source,
        };
        let response = self
            .authorize(self.http.post(&url))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        trace!("{url} answered {status} with {} bytes", body.len());
        if status != StatusCode::OK {
            return Err(LLMError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Failure to get a chat completion envelope from the server.
#[derive(Debug, Error)]
pub enum LLMError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed chat completion response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A well-formed envelope that carries no usable text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseError {
    #[error("response contains no choices")]
    NoChoices,
    #[error("model requested {0} tool call(s) instead of answering")]
    ToolCalls(usize),
    #[error("response message has no content")]
    EmptyContent,
}
