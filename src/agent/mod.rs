//! Agent runtime: conversation history and turn execution.
//!
//! One [`Agent`] owns a model provider, the loaded configuration, and
//! the in-memory chat history. [`Agent::run_turn`] drives the explicit
//! request → tool-call → tool-result loop: the model is sent the full
//! history plus the tool catalogue, requested tool calls are dispatched
//! through [`crate::tools::call_tool`], and their results are fed back
//! until the model produces a final text reply or the per-turn
//! iteration cap is reached.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ChatMessage, ModelProvider, ProviderResponse};
use crate::tools;

/// A running agent instance.
pub struct Agent {
    provider: Box<dyn ModelProvider>,
    cfg: Arc<Config>,
    history: Vec<ChatMessage>,
}

impl Agent {
    /// Create an agent over a provider, seeding the history with the
    /// configured system instruction.
    pub fn new(provider: Box<dyn ModelProvider>, cfg: Arc<Config>) -> Self {
        let history = vec![ChatMessage::new("system", cfg.agent.instruction.clone())];
        Self {
            provider,
            cfg,
            history,
        }
    }

    /// Build an agent from configuration alone.
    pub fn from_config(cfg: Arc<Config>) -> anyhow::Result<Self> {
        let provider = crate::models::build_provider(&cfg)?;
        Ok(Self::new(provider, cfg))
    }

    /// Run one user turn and return the assistant's final reply.
    pub async fn run_turn(&mut self, user_input: &str) -> anyhow::Result<String> {
        self.history.push(ChatMessage::new("user", user_input));

        let function_defs = tools::function_definitions();
        let max_iterations = self.cfg.agent.max_tool_iterations;

        for iteration in 0..max_iterations {
            debug!(iteration = iteration + 1, max_iterations, "model round-trip");

            let (response, usage) = self
                .provider
                .send_chat(&self.history, &function_defs)
                .await?;

            if let Some(usage) = usage {
                debug!(
                    prompt = usage.prompt_tokens,
                    completion = usage.completion_tokens,
                    "token usage"
                );
            }

            match response {
                ProviderResponse::Final(text) => {
                    self.history.push(ChatMessage::new("assistant", text.clone()));
                    return Ok(text);
                }
                ProviderResponse::FunctionCalls(calls) => {
                    self.history
                        .push(ChatMessage::assistant_tool_calls(calls.clone()));

                    for call in calls {
                        info!(tool = %call.name, "dispatching tool call");
                        let args: Value = serde_json::from_str(&call.arguments)
                            .unwrap_or_else(|_| serde_json::json!({}));

                        // A failed tool call becomes an error-shaped tool
                        // result so the model can explain it to the user.
                        let result =
                            match tools::call_tool(&call.name, args, self.cfg.clone()).await {
                                Ok(Value::String(s)) => s,
                                Ok(other) => other.to_string(),
                                Err(e) => {
                                    warn!(tool = %call.name, error = %e, "tool call failed");
                                    format!("Error: {e}")
                                }
                            };

                        self.history
                            .push(ChatMessage::tool_result(call.id, call.name, result));
                    }
                }
            }
        }

        anyhow::bail!("agent exceeded {max_iterations} tool iterations without a final reply")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionCallItem, TokenUsage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that replays a fixed script of responses.
    struct ScriptedProvider {
        script: Mutex<Vec<ProviderResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<ProviderResponse>) -> Self {
            responses.reverse();
            Self {
                script: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        async fn send_chat(
            &self,
            _messages: &[ChatMessage],
            _functions: &[Value],
        ) -> anyhow::Result<(ProviderResponse, Option<TokenUsage>)> {
            let next = self
                .script
                .lock()
                .unwrap()
                .pop()
                .expect("script exhausted");
            Ok((next, None))
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(serde_yaml_ng::from_str("model:\n  provider: gemini\n").unwrap())
    }

    #[tokio::test]
    async fn plain_reply_completes_in_one_round() {
        let provider = ScriptedProvider::new(vec![ProviderResponse::Final("Hello!".into())]);
        let mut agent = Agent::new(Box::new(provider), test_config());
        let reply = agent.run_turn("hi").await.unwrap();
        assert_eq!(reply, "Hello!");
        // system + user + assistant
        assert_eq!(agent.history.len(), 3);
    }

    #[tokio::test]
    async fn tool_call_round_trips_through_registry() {
        tools::register_tool(crate::tools::ToolMeta {
            name: "agent_loop_probe".into(),
            description: "test probe".into(),
            args_schema: serde_json::json!({ "type": "object" }),
        });
        tools::register_handler(
            "agent_loop_probe",
            Arc::new(|_args, _cfg| {
                Box::pin(async move { Ok(Value::String("probe result".into())) })
            }),
        );

        let provider = ScriptedProvider::new(vec![
            ProviderResponse::FunctionCalls(vec![FunctionCallItem {
                id: "call_1".into(),
                name: "agent_loop_probe".into(),
                arguments: "{}".into(),
            }]),
            ProviderResponse::Final("done".into()),
        ]);
        let mut agent = Agent::new(Box::new(provider), test_config());
        let reply = agent.run_turn("probe please").await.unwrap();
        assert_eq!(reply, "done");

        let tool_msg = agent
            .history
            .iter()
            .find(|m| m.role == "tool")
            .expect("tool result recorded");
        assert_eq!(tool_msg.content, "probe result");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn failing_tool_becomes_error_result() {
        let provider = ScriptedProvider::new(vec![
            ProviderResponse::FunctionCalls(vec![FunctionCallItem {
                id: "call_x".into(),
                name: "no_such_tool".into(),
                arguments: "{}".into(),
            }]),
            ProviderResponse::Final("sorry".into()),
        ]);
        let mut agent = Agent::new(Box::new(provider), test_config());
        let reply = agent.run_turn("use the tool").await.unwrap();
        assert_eq!(reply, "sorry");

        let tool_msg = agent.history.iter().find(|m| m.role == "tool").unwrap();
        assert!(tool_msg.content.starts_with("Error: unknown tool"));
    }
}
