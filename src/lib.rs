//! deskagent — conversational desk agent.
//!
//! Wraps a ticket-checking workflow (Google Sheets column read + persistent
//! browser session) and two IP lookup endpoints behind natural-language
//! tools, callable from a Gemini or OpenAI-compatible chat loop.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod agent;
pub mod browser;
pub mod cli;
pub mod config;
pub mod lookup;
pub mod models;
pub mod sheets;
pub mod tools;
pub mod workflow;

/// Return the deskagent home directory.
///
/// Resolution order:
/// 1. `DESKAGENT_HOME` environment variable
/// 2. `$HOME/.deskagent`
pub fn deskagent_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("DESKAGENT_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".deskagent")
    }
}
