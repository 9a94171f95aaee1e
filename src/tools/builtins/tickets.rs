//! Built-in `process_tickets` tool — the sheet-to-browser workflow.
//!
//! Builds the spreadsheet client and browser session for this one
//! invocation, runs the workflow, and always closes the browser session
//! afterwards, success or not.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::browser::{BrowserService, SessionManager};
use crate::config::Config;
use crate::sheets::SheetsClient;
use crate::tools::{register_tool, ToolMeta};
use crate::workflow;

/// Read ticket numbers from the named Google Sheet and check each one
/// in the browser against `base_url`.
///
/// Args: `{ "sheet_name": "…", "base_url": "…" }`
/// Returns the plain-text per-ticket report.
pub async fn process_tickets(cfg: Arc<Config>, args: Value) -> anyhow::Result<Value> {
    let sheet_name = args
        .get("sheet_name")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("process_tickets: missing `sheet_name` argument"))?;
    let base_url = args
        .get("base_url")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("process_tickets: missing `base_url` argument"))?;

    let sheets = SheetsClient::from_credentials_file(Path::new(&cfg.sheets.credentials)).await?;

    let svc = BrowserService::connect(cfg.browser.sidecar_url.as_deref()).await?;
    let mut session = SessionManager::new(svc, &cfg.browser.auth_state, cfg.browser.headless);

    let report = workflow::process_tickets(&sheets, &mut session, sheet_name, base_url).await;

    // Session lifecycle is scoped to this invocation: close whatever the
    // workflow outcome was, but let a workflow error win over a close error.
    let closed = session.close().await;
    let report = report?;
    closed?;

    Ok(Value::String(report))
}

/// Register the `process_tickets` tool metadata in the global registry.
pub fn register() {
    register_tool(ToolMeta {
        name: "process_tickets".into(),
        description: "Reads ticket numbers from a Google Sheet and checks them in an internal application via browser.".into(),
        args_schema: json!({
            "type": "object",
            "properties": {
                "sheet_name": {
                    "type": "string",
                    "description": "The name or ID of the Google Sheet."
                },
                "base_url": {
                    "type": "string",
                    "description": "The base URL of the ticket system (e.g. https://app.com/ticket/). The ticket ID will be appended to this URL."
                }
            },
            "required": ["sheet_name", "base_url"],
            "additionalProperties": false
        }),
    });
}
