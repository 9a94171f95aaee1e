//! Built-in IP lookup tools — geolocation and abuse reputation.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::Config;
use crate::lookup::LookupClient;
use crate::tools::{register_tool, ToolMeta};

fn ip_arg<'a>(tool: &str, args: &'a Value) -> anyhow::Result<&'a str> {
    args.get("ip")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("{tool}: missing `ip` argument"))
}

/// Fetch location and ISP details for a given IP address.
pub async fn fetch_ip_data(cfg: Arc<Config>, args: Value) -> anyhow::Result<Value> {
    let ip = ip_arg("fetch_ip_data", &args)?;
    let client = LookupClient::new(cfg.abuse_api_key())?;
    let report = client.fetch_ip_data(ip).await?;
    Ok(Value::String(report))
}

/// Fetch abuse-report details for a given IP address.
pub async fn fetch_abuse_ip_data(cfg: Arc<Config>, args: Value) -> anyhow::Result<Value> {
    let ip = ip_arg("fetch_abuse_ip_data", &args)?;
    let client = LookupClient::new(cfg.abuse_api_key())?;
    let report = client.fetch_abuse_ip_data(ip).await?;
    Ok(Value::String(report))
}

/// Register both lookup tools' metadata in the global registry.
pub fn register() {
    let ip_schema = json!({
        "type": "object",
        "properties": {
            "ip": {
                "type": "string",
                "description": "The IPv4 or IPv6 address to look up."
            }
        },
        "required": ["ip"],
        "additionalProperties": false
    });

    register_tool(ToolMeta {
        name: "fetch_ip_data".into(),
        description: "Fetches location and ISP details for a given IP address.".into(),
        args_schema: ip_schema.clone(),
    });
    register_tool(ToolMeta {
        name: "fetch_abuse_ip_data".into(),
        description: "Fetches abuse contact details for a given IP address.".into(),
        args_schema: ip_schema,
    });
}
