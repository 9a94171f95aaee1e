//! Model provider abstractions.
//!
//! Defines the [`ModelProvider`] trait, the [`ChatMessage`] type, and the
//! two concrete bindings ([`GeminiProvider`], [`OpenAICompatProvider`]).
//! Both providers expose the same function-calling contract so the agent
//! loop and the tool registry stay provider-agnostic; only the wire format
//! differs.

pub mod gemini;
pub mod openai_compat;

use async_trait::async_trait;

use crate::config::Config;

// ---------------------------------------------------------------------------
// ChatMessage – shared message representation
// ---------------------------------------------------------------------------

/// A single chat message with a role and content.
///
/// Optionally carries tool-calling metadata so that `tool` role messages
/// and assistant `tool_calls` responses are serialised correctly for the
/// target API.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// For assistant messages that invoke tools: the calls being made.
    pub tool_calls: Option<Vec<FunctionCallItem>>,
    /// For `role: "tool"` messages: the id of the tool call this result
    /// corresponds to.
    pub tool_call_id: Option<String>,
    /// For `role: "tool"` messages: the tool name (Gemini keys function
    /// responses by name rather than id).
    pub tool_name: Option<String>,
}

impl ChatMessage {
    /// Convenience constructor for a plain message (no tool metadata).
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Assistant message carrying one or more tool calls.
    pub fn assistant_tool_calls(calls: Vec<FunctionCallItem>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: String::new(),
            tool_calls: Some(calls),
            tool_call_id: None,
            tool_name: None,
        }
    }

    /// Tool-result message answering a specific call.
    pub fn tool_result(
        call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: "tool".to_string(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(call_id.into()),
            tool_name: Some(name.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderResponse – function-calling aware response
// ---------------------------------------------------------------------------

/// Token usage statistics returned by the API.
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// A single function call requested by the model.
#[derive(Debug, Clone)]
pub struct FunctionCallItem {
    /// Tool call id (from the API, synthesized when absent).
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments object.
    pub arguments: String,
}

/// Response from a model that may be a final text reply or tool calls.
#[derive(Debug, Clone)]
pub enum ProviderResponse {
    /// Plain text reply from the model.
    Final(String),
    /// The model wants one or more tools invoked before replying.
    FunctionCalls(Vec<FunctionCallItem>),
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every chat backend.
///
/// `functions` is a provider-agnostic list of tool definitions, each
/// `{ "name": …, "description": …, "parameters": <JSON Schema> }`;
/// providers translate to their own wire format.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send chat messages plus tool definitions and return the model's
    /// response along with token usage when the API reports it.
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        functions: &[serde_json::Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)>;
}

pub use gemini::GeminiProvider;
pub use openai_compat::OpenAICompatProvider;

/// Build the configured provider.
pub fn build_provider(cfg: &Config) -> anyhow::Result<Box<dyn ModelProvider>> {
    let api_key = cfg.model_api_key();
    match cfg.model.provider.as_str() {
        "gemini" => {
            let key = api_key
                .ok_or_else(|| anyhow::anyhow!("gemini provider requires model.api_key"))?;
            let model = cfg
                .model
                .model
                .clone()
                .unwrap_or_else(|| "gemini-2.5-flash".to_string());
            Ok(Box::new(GeminiProvider::new(&key, &model)))
        }
        "openai-compat" => {
            let endpoint = cfg
                .model
                .endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("openai-compat provider requires model.endpoint"))?;
            let model = cfg.model.model.clone().unwrap_or_else(|| "mistral".to_string());
            Ok(Box::new(OpenAICompatProvider::new(
                endpoint,
                api_key.unwrap_or_default(),
                model,
            )))
        }
        other => anyhow::bail!("unknown model provider: {other}"),
    }
}

/// Generate a short pseudo-random id for synthetic tool_call_ids.
///
/// Used when the API response doesn't include one (Gemini, legacy
/// `function_call` replies).
pub(crate) fn synthetic_call_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..16].to_string()
}

/// Extract token usage statistics from an OpenAI-style response JSON.
pub fn parse_token_usage(json: &serde_json::Value) -> Option<TokenUsage> {
    let usage = json.get("usage")?;
    Some(TokenUsage {
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0),
    })
}

/// Parse `tool_calls` from an OpenAI-style chat completion response.
///
/// Falls back to the legacy `function_call` field. Returns `None` when the
/// message carries no calls.
pub fn parse_tool_calls(json: &serde_json::Value) -> Option<ProviderResponse> {
    let message = json.get("choices")?.get(0)?.get("message")?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        let items: Vec<FunctionCallItem> = tool_calls
            .iter()
            .filter_map(|tc| {
                let func = tc.get("function")?;
                let name = func.get("name")?.as_str()?.to_string();
                let arguments = func
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .unwrap_or("{}")
                    .to_string();
                let id = tc
                    .get("id")
                    .and_then(|i| i.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(synthetic_call_id);
                Some(FunctionCallItem { id, name, arguments })
            })
            .collect();

        if !items.is_empty() {
            return Some(ProviderResponse::FunctionCalls(items));
        }
    }

    // Legacy `function_call` field.
    if let Some(fc) = message.get("function_call").and_then(|v| v.as_object()) {
        let name = fc
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = fc
            .get("arguments")
            .and_then(|v| v.as_str())
            .unwrap_or("{}")
            .to_string();
        return Some(ProviderResponse::FunctionCalls(vec![FunctionCallItem {
            id: synthetic_call_id(),
            name,
            arguments,
        }]));
    }

    None
}
