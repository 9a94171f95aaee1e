//! CLI subcommand handlers extracted from `main.rs`.
//!
//! Keeps `main.rs` slim: clap parsing stays there, heavy logic lives here.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use dialoguer::Input;
use tracing::debug;

use crate::agent::Agent;
use crate::config::Config;
use crate::lookup::LookupClient;

/// Load configuration and run the interactive chat loop.
///
/// Reads user lines until `exit` / `quit` / EOF, running one agent turn
/// per line. Tool calls happen inside the turn; the user only sees the
/// final reply.
pub async fn chat(config_path: &Path) -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load(config_path).await?);
    let mut agent = Agent::from_config(cfg.clone())?;

    println!(
        "deskagent started ({} provider). Type 'exit' to quit.",
        cfg.model.provider
    );

    loop {
        let line: String = match Input::new().with_prompt("You").interact_text() {
            Ok(l) => l,
            // Interrupted / non-interactive stdin closed.
            Err(e) => {
                debug!(error = %e, "input closed, leaving chat loop");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }

        match agent.run_turn(trimmed).await {
            Ok(reply) => println!("Agent: {reply}"),
            Err(e) => eprintln!("Error: {e:#}"),
        }
    }

    Ok(())
}

/// Run the ticket workflow once, without the chat loop, and print the
/// report.
pub async fn run_tickets(
    config_path: &Path,
    sheet_name: &str,
    base_url: &str,
) -> anyhow::Result<()> {
    let cfg = Arc::new(Config::load(config_path).await?);
    let args = serde_json::json!({ "sheet_name": sheet_name, "base_url": base_url });
    let report = crate::tools::builtins::tickets::process_tickets(cfg, args)
        .await
        .context("ticket workflow failed")?;
    println!("{}", report.as_str().unwrap_or_default());
    Ok(())
}

/// Look up geolocation details for an IP and print the report.
pub async fn lookup_ip(config_path: &Path, ip: &str) -> anyhow::Result<()> {
    let cfg = Config::load(config_path).await?;
    let client = LookupClient::new(cfg.abuse_api_key())?;
    println!("{}", client.fetch_ip_data(ip).await?);
    Ok(())
}

/// Look up abuse-report details for an IP and print the report.
pub async fn lookup_abuse(config_path: &Path, ip: &str) -> anyhow::Result<()> {
    let cfg = Config::load(config_path).await?;
    let client = LookupClient::new(cfg.abuse_api_key())?;
    println!("{}", client.fetch_abuse_ip_data(ip).await?);
    Ok(())
}
