//! Tool registry and dispatcher.
//!
//! A **tools metadata registry** tracks every available tool's name,
//! description, and JSON-Schema for its arguments. Call [`init()`] at
//! startup to register the builtins; [`function_definitions()`] renders
//! the catalogue in the provider-agnostic shape the model bindings
//! consume, and [`call_tool()`] dispatches an invocation to its handler.

pub mod builtins;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::config::Config;

/// Metadata describing a tool available to the agent.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolMeta {
    /// Short machine-friendly name (e.g. `"process_tickets"`).
    pub name: String,
    /// Human-readable one-liner describing what the tool does.
    pub description: String,
    /// JSON Schema object describing the expected arguments.
    pub args_schema: Value,
}

/// Async handler function that tools register for dispatch.
///
/// Handlers receive the parsed arguments object plus the loaded
/// configuration (service endpoints, credential paths, API keys).
pub type ToolHandler = Arc<
    dyn Fn(Value, Arc<Config>) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// Combined registry entry: metadata + optional handler.
struct ToolEntry {
    meta: ToolMeta,
    handler: Option<ToolHandler>,
}

/// Global tool registry.
static REGISTRY: Lazy<Mutex<Vec<ToolEntry>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Register a tool's metadata in the global registry (no handler).
///
/// Duplicate names are silently ignored (first-registration wins).
pub fn register_tool(meta: ToolMeta) {
    let mut reg = REGISTRY.lock().expect("tool registry poisoned");
    if reg.iter().any(|e| e.meta.name == meta.name) {
        return;
    }
    reg.push(ToolEntry { meta, handler: None });
}

/// Attach a handler to an already-registered tool by name.
///
/// If no tool with the given name exists yet, this is a no-op.
pub fn register_handler(name: &str, handler: ToolHandler) {
    let mut reg = REGISTRY.lock().expect("tool registry poisoned");
    if let Some(entry) = reg.iter_mut().find(|e| e.meta.name == name) {
        entry.handler = Some(handler);
    }
}

/// Return metadata for every registered tool.
pub fn list_tools() -> Vec<ToolMeta> {
    REGISTRY
        .lock()
        .expect("tool registry poisoned")
        .iter()
        .map(|e| e.meta.clone())
        .collect()
}

/// Render the registry as provider-agnostic function definitions:
/// `{ "name": …, "description": …, "parameters": <schema> }`.
pub fn function_definitions() -> Vec<Value> {
    list_tools()
        .into_iter()
        .map(|t| {
            serde_json::json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.args_schema,
            })
        })
        .collect()
}

/// Call a registered tool by name.
///
/// This is the single dispatch point used by the agent runtime.
pub async fn call_tool(name: &str, args: Value, cfg: Arc<Config>) -> anyhow::Result<Value> {
    let handler = {
        let reg = REGISTRY.lock().expect("tool registry poisoned");
        reg.iter()
            .find(|e| e.meta.name == name)
            .and_then(|e| e.handler.clone())
    };

    match handler {
        Some(h) => h(args, cfg).await,
        None => anyhow::bail!("unknown tool: {name}"),
    }
}

/// Module initialization (called from main).
///
/// Registers all built-in tools and attaches their handlers.
pub fn init() {
    builtins::tickets::register();
    builtins::ip_lookup::register();

    register_handler(
        "process_tickets",
        Arc::new(|args, cfg| Box::pin(async move { builtins::tickets::process_tickets(cfg, args).await })),
    );
    register_handler(
        "fetch_ip_data",
        Arc::new(|args, cfg| Box::pin(async move { builtins::ip_lookup::fetch_ip_data(cfg, args).await })),
    );
    register_handler(
        "fetch_abuse_ip_data",
        Arc::new(|args, cfg| {
            Box::pin(async move { builtins::ip_lookup::fetch_abuse_ip_data(cfg, args).await })
        }),
    );

    tracing::debug!(tools = list_tools().len(), "tools module loaded");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Arc<Config> {
        Arc::new(
            serde_yaml_ng::from_str("model:\n  provider: gemini\n").expect("test config parses"),
        )
    }

    #[tokio::test]
    async fn registry_registers_and_dispatches() {
        register_tool(ToolMeta {
            name: "echo_test".into(),
            description: "Echo the input back.".into(),
            args_schema: serde_json::json!({ "type": "object" }),
        });
        register_handler(
            "echo_test",
            Arc::new(|args, _cfg| Box::pin(async move { Ok(args) })),
        );

        let defs = function_definitions();
        assert!(defs.iter().any(|d| d["name"] == "echo_test"));

        let out = call_tool("echo_test", serde_json::json!({"x": 1}), test_config())
            .await
            .unwrap();
        assert_eq!(out["x"], 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let err = call_tool("nope", serde_json::json!({}), test_config())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[test]
    fn duplicate_registration_keeps_first() {
        register_tool(ToolMeta {
            name: "dup_test".into(),
            description: "first".into(),
            args_schema: serde_json::json!({}),
        });
        register_tool(ToolMeta {
            name: "dup_test".into(),
            description: "second".into(),
            args_schema: serde_json::json!({}),
        });
        let metas = list_tools();
        let dup: Vec<_> = metas.iter().filter(|m| m.name == "dup_test").collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].description, "first");
    }
}
