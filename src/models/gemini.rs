//! Gemini provider — declarative function calling.
//!
//! Talks to the `generateContent` endpoint with tool schemas passed as
//! `functionDeclarations`; the model decides when to call them. System
//! messages map to `systemInstruction`, tool results to
//! `functionResponse` parts keyed by function name.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ChatMessage, FunctionCallItem, ModelProvider, ProviderResponse, TokenUsage};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Provider for the Gemini API (API-key authentication).
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

// ---------------------------------------------------------------------------
// Response wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

impl GeminiProvider {
    /// Create a provider for the public Gemini endpoint.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self::with_base_url(api_key, model, GEMINI_API_URL)
    }

    /// Create a provider against a custom base URL (used by tests).
    pub fn with_base_url(api_key: &str, model: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    fn build_url(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    /// Convert chat messages to Gemini `contents`, dropping system
    /// messages (those ride in `systemInstruction`).
    fn convert_messages(messages: &[ChatMessage]) -> Vec<Value> {
        messages
            .iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                if m.role == "tool" {
                    json!({
                        "role": "function",
                        "parts": [{
                            "functionResponse": {
                                "name": m.tool_name.as_deref().unwrap_or("unknown"),
                                "response": { "result": m.content }
                            }
                        }]
                    })
                } else if let Some(ref calls) = m.tool_calls {
                    let parts: Vec<Value> = calls
                        .iter()
                        .map(|c| {
                            let args: Value = serde_json::from_str(&c.arguments)
                                .unwrap_or_else(|_| json!({}));
                            json!({ "functionCall": { "name": c.name, "args": args } })
                        })
                        .collect();
                    json!({ "role": "model", "parts": parts })
                } else {
                    let role = if m.role == "assistant" { "model" } else { "user" };
                    json!({ "role": role, "parts": [{ "text": m.content }] })
                }
            })
            .collect()
    }

    fn system_instruction(messages: &[ChatMessage]) -> Option<String> {
        messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.clone())
    }

    fn convert_tools(functions: &[Value]) -> Option<Value> {
        if functions.is_empty() {
            return None;
        }
        Some(json!([{ "functionDeclarations": functions }]))
    }

    fn parse_response(response: GeminiResponse) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        let usage = response.usage_metadata.map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count.unwrap_or(0),
            completion_tokens: u.candidates_token_count.unwrap_or(0),
            total_tokens: u.total_token_count.unwrap_or(0),
        });

        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no candidates"))?;

        let mut text = String::new();
        let mut calls = Vec::new();
        for part in candidate.content.parts {
            if let Some(t) = part.text {
                text.push_str(&t);
            }
            if let Some(fc) = part.function_call {
                calls.push(FunctionCallItem {
                    id: super::synthetic_call_id(),
                    name: fc.name,
                    arguments: fc.args.to_string(),
                });
            }
        }

        if calls.is_empty() {
            Ok((ProviderResponse::Final(text), usage))
        } else {
            Ok((ProviderResponse::FunctionCalls(calls), usage))
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        functions: &[Value],
    ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
        let contents = Self::convert_messages(messages);

        let mut request = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 8192
            }
        });

        if let Some(system) = Self::system_instruction(messages) {
            request["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        if let Some(tools) = Self::convert_tools(functions) {
            request["tools"] = tools;
        }

        let resp = self
            .client
            .post(self.build_url())
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API returned {status}: {text}");
        }

        let body: GeminiResponse = resp.json().await?;
        Self::parse_response(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_become_instruction() {
        let messages = vec![
            ChatMessage::new("system", "You are a ticket assistant."),
            ChatMessage::new("user", "check tickets"),
        ];
        let contents = GeminiProvider::convert_messages(&messages);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(
            GeminiProvider::system_instruction(&messages).as_deref(),
            Some("You are a ticket assistant.")
        );
    }

    #[test]
    fn tool_results_map_to_function_response() {
        let messages = vec![ChatMessage::tool_result(
            "tc_0",
            "fetch_ip_data",
            "IP: 8.8.8.8",
        )];
        let contents = GeminiProvider::convert_messages(&messages);
        assert_eq!(contents[0]["role"], "function");
        assert_eq!(
            contents[0]["parts"][0]["functionResponse"]["name"],
            "fetch_ip_data"
        );
    }

    #[test]
    fn function_call_parts_parse_into_calls() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "functionCall": {
                            "name": "process_tickets",
                            "args": { "sheet_name": "Tickets", "base_url": "https://t/" }
                        }
                    }]
                }
            }]
        }))
        .unwrap();
        let (resp, _usage) = GeminiProvider::parse_response(response).unwrap();
        match resp {
            ProviderResponse::FunctionCalls(calls) => {
                assert_eq!(calls[0].name, "process_tickets");
                let args: Value = serde_json::from_str(&calls[0].arguments).unwrap();
                assert_eq!(args["sheet_name"], "Tickets");
            }
            other => panic!("expected FunctionCalls, got {other:?}"),
        }
    }
}
