//! Generic OpenAI-compatible provider.
//!
//! Works with any API that implements the OpenAI chat completions
//! interface with JSON-schema `tools`: Ollama (native tool calling),
//! OpenRouter, Groq, Mistral, LM Studio, vLLM, etc.
//!
//! Config example:
//! ```yaml
//! model:
//!   provider: openai-compat
//!   model: mistral
//!   endpoint: http://localhost:11434/v1/chat/completions
//!   api_key: $OLLAMA_KEY   # optional — some local servers need none
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{ChatMessage, ModelProvider, ProviderResponse, TokenUsage};

/// Provider that talks to any OpenAI-compatible chat completions API.
pub struct OpenAICompatProvider {
    api_key: String,
    endpoint: String,
    model: String,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a provider with explicit configuration.
    ///
    /// `api_key` may be empty for local servers that don't require auth.
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            api_key,
            endpoint,
            model,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Serialise messages into the OpenAI wire format, including
    /// `tool_calls` and `tool_call_id` when present.
    fn serialize_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                let mut msg = json!({ "role": m.role });
                if let Some(ref calls) = m.tool_calls {
                    msg["tool_calls"] = calls
                        .iter()
                        .map(|c| {
                            json!({
                                "id": c.id,
                                "type": "function",
                                "function": { "name": c.name, "arguments": c.arguments }
                            })
                        })
                        .collect();
                    // The API expects content null (or absent) on assistant
                    // messages that carry tool_calls.
                    if m.content.is_empty() {
                        msg["content"] = serde_json::Value::Null;
                    } else {
                        msg["content"] = json!(m.content);
                    }
                } else {
                    msg["content"] = json!(m.content);
                }
                if let Some(ref tcid) = m.tool_call_id {
                    msg["tool_call_id"] = json!(tcid);
                }
                msg
            })
            .collect()
    }
}

#[async_trait]
impl ModelProvider for OpenAICompatProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        functions: &[serde_json::Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        let api_messages = Self::serialize_messages(messages);

        let mut body = json!({
            "model": self.model,
            "messages": api_messages,
        });

        if !functions.is_empty() {
            let tools: Vec<serde_json::Value> = functions
                .iter()
                .map(|f| json!({ "type": "function", "function": f }))
                .collect();
            body["tools"] = serde_json::Value::Array(tools);
            body["tool_choice"] = json!("auto");
        }

        let mut req = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI-compat API returned {status}: {text}");
        }

        let json: serde_json::Value = resp.json().await?;
        let usage = super::parse_token_usage(&json);

        if let Some(pr) = super::parse_tool_calls(&json) {
            return Ok((pr, usage));
        }

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        Ok((ProviderResponse::Final(content), usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FunctionCallItem;

    #[test]
    fn construct_with_empty_key() {
        let p = OpenAICompatProvider::new(
            "http://localhost:11434/v1/chat/completions".into(),
            String::new(),
            "mistral".into(),
        );
        assert_eq!(p.model, "mistral");
        assert!(p.api_key.is_empty());
    }

    #[test]
    fn tool_messages_serialize_with_ids() {
        let messages = vec![
            ChatMessage::assistant_tool_calls(vec![FunctionCallItem {
                id: "call_1".into(),
                name: "process_tickets".into(),
                arguments: "{\"sheet_name\":\"Tickets\"}".into(),
            }]),
            ChatMessage::tool_result("call_1", "process_tickets", "No tickets found in Column A."),
        ];
        let wire = OpenAICompatProvider::serialize_messages(&messages);
        assert_eq!(wire[0]["tool_calls"][0]["function"]["name"], "process_tickets");
        assert!(wire[0]["content"].is_null());
        assert_eq!(wire[1]["role"], "tool");
        assert_eq!(wire[1]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn send_chat_fails_without_server() {
        let p = OpenAICompatProvider::new(
            "http://127.0.0.1:1/v1/chat/completions".into(),
            String::new(),
            "test".into(),
        );
        let msgs = vec![ChatMessage::new("user", "hi")];
        let result = p.send_chat(&msgs, &[]).await;
        assert!(result.is_err());
    }
}
