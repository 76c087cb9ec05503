//! LLM-based fix suggestions for a single file

use crate::FixError;
use mend_core::llm::{
    ChatMessage, ChatRequest, InferenceClient, LLMConfig, LLMError, ResponseFormat,
    ToolDefinition, strip_code_fences,
};
use mend_core::schema::{FieldSchema, ObjectSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

const FIXER_PROMPT: &str = include_str!("../system_prompts/fixer.txt");

/// A suggested fix for one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResult {
    /// The file content the fix was requested for. Always the local copy, never the model's echo,
    /// whatever shape that echo has.
    #[serde(default, skip_deserializing)]
    pub original_code: String,
    pub fixed_code: String,
    pub explanation: String,
    pub language: String,
    pub error_type: String,
}

/// Schema the model's reply must conform to.
pub fn fix_schema() -> ObjectSchema {
    ObjectSchema::new()
        .field(
            "fixed_code",
            FieldSchema::string().description("The complete corrected file content"),
        )
        .field(
            "explanation",
            FieldSchema::string().description("What was wrong and how it was fixed"),
        )
        .field(
            "language",
            FieldSchema::string().description("Programming language of the file, lowercase"),
        )
        .field(
            "error_type",
            FieldSchema::string().description("Short category of the bug"),
        )
}

/// The code-analysis function offered to the model.
pub fn analysis_tool() -> ToolDefinition {
    let parameters = ObjectSchema::new()
        .field("code", FieldSchema::string().description("Source code to analyze"))
        .field(
            "language",
            FieldSchema::string()
                .description("Programming language of the code")
                .optional(),
        );
    ToolDefinition::function(
        "analyze_code",
        "Analyze source code and report the bugs it contains",
        parameters,
    )
}

/// Builds the chat completion request asking for a fix of `source`.
pub fn build_fix_request(config: &LLMConfig, source: &str) -> ChatRequest {
    let messages = vec![
        ChatMessage::system(FIXER_PROMPT),
        ChatMessage::user(format!(
            "Find and fix the bug in the following file. Reply with the complete corrected file.\n\n{source}"
        )),
    ];
    ChatRequest::new(&config.model, messages)
        .tool(analysis_tool())
        .response_format(ResponseFormat::json_schema("code_fix", fix_schema()))
        .temperature(config.temperature)
        .max_tokens(config.max_tokens)
}

/// Asks the model for a fix of `source`. Makes exactly one request.
pub fn request_fix(
    client: &InferenceClient,
    config: &LLMConfig,
    source: &str,
) -> Result<FixResult, FixError> {
    let request = build_fix_request(config, source);
    trace!("Requesting fix for {} bytes of source", source.len());
    let response = client.chat(&request).map_err(|e| match e {
        LLMError::Decode(e) => FixError::ResponseParse(format!("not a chat completion: {e}")),
        e => FixError::Request(e),
    })?;
    let content = response
        .content()
        .map_err(|e| FixError::ResponseParse(e.to_string()))?;
    trace!("LLM returned {} bytes", content.len());
    parse_fix(content, source)
}

/// Parses the model's message content into a [FixResult] whose `original_code` is `source`.
pub fn parse_fix(content: &str, source: &str) -> Result<FixResult, FixError> {
    let value: Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| FixError::ResponseParse(format!("reply is not JSON: {e}")))?;
    fix_schema()
        .validate(&value)
        .map_err(|e| FixError::ResponseParse(e.to_string()))?;
    if value.get("original_code").is_some() {
        debug!("Discarding the model's copy of the original code");
    }
    let mut fix: FixResult =
        serde_json::from_value(value).map_err(|e| FixError::ResponseParse(e.to_string()))?;
    fix.original_code = source.to_string();
    Ok(fix)
}
