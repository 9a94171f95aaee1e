use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from `config.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Chat model provider settings.
    pub model: ModelConfig,
    /// Google Sheets access settings.
    #[serde(default)]
    pub sheets: SheetsConfig,
    /// Browser session settings.
    #[serde(default)]
    pub browser: BrowserConfig,
    /// IP lookup settings.
    #[serde(default)]
    pub lookup: LookupConfig,
    /// Agent behaviour settings.
    #[serde(default)]
    pub agent: AgentConfig,
}

/// A configured chat model provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Provider kind: "gemini" or "openai-compat".
    pub provider: String,
    /// Model name to request (e.g. "gemini-2.5-flash", "mistral").
    #[serde(default)]
    pub model: Option<String>,
    /// API key — plain text or env-var reference like `$GOOGLE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Chat completions endpoint for "openai-compat"
    /// (e.g. "http://localhost:11434/v1/chat/completions").
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Google Sheets service-account settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SheetsConfig {
    /// Path to the service-account credential JSON file.
    #[serde(default = "default_credentials_path")]
    pub credentials: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials: default_credentials_path(),
        }
    }
}

fn default_credentials_path() -> String {
    "credentials.json".to_string()
}

/// Browser session settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserConfig {
    /// Path where the session storage state (cookies + local storage)
    /// is persisted between runs.
    #[serde(default = "default_auth_state_path")]
    pub auth_state: String,
    /// Run the browser headless. Set to `false` so a visible window can
    /// be used for manual SSO logins on first run.
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Base URL of the Playwright sidecar. `None` uses the built-in
    /// default (overridable via `BROWSER_SIDECAR_URL`).
    #[serde(default)]
    pub sidecar_url: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            auth_state: default_auth_state_path(),
            headless: true,
            sidecar_url: None,
        }
    }
}

fn default_auth_state_path() -> String {
    "auth.json".to_string()
}

fn default_true() -> bool {
    true
}

/// IP lookup settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LookupConfig {
    /// AbuseIPDB API key — plain text or env-var reference like
    /// `$ABUSEIPDB_API_KEY`. The geolocation endpoint needs no key.
    #[serde(default)]
    pub abuse_api_key: Option<String>,
}

/// Agent behaviour settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// System instruction injected at the start of every conversation.
    #[serde(default = "default_instruction")]
    pub instruction: String,
    /// Maximum tool-call iterations per turn.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instruction: default_instruction(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_instruction() -> String {
    "You are a ticket processing assistant. Your goal is to help the user \
     check ticket details from a Google Sheet. Use the process_tickets tool \
     to read from the sheet and check the internal application. If the user \
     hasn't provided the sheet name or base URL, ask for them. When the user \
     provides an IP address, use the lookup tools to get details and present \
     them in a professional report."
        .to_string()
}

fn default_max_tool_iterations() -> usize {
    6
}

/// Expand a `$VAR`-style secret reference against the environment.
///
/// Plain values pass through unchanged; `$NAME` resolves to the variable's
/// value, or `None` when the variable is unset or empty.
pub fn resolve_secret(raw: &str) -> Option<String> {
    if let Some(name) = raw.strip_prefix('$') {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    } else if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

impl Config {
    /// Read and parse a YAML configuration file.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Relative default path: fall back to the deskagent home.
                let filename = path.file_name().and_then(|f| f.to_str());
                let eligible = filename == Some("config.yaml") && path.is_relative();
                if eligible {
                    let home_path = crate::deskagent_home().join("config.yaml");
                    match tokio::fs::read_to_string(&home_path).await {
                        Ok(c) => {
                            tracing::warn!(
                                attempted = %path.display(),
                                found = %home_path.display(),
                                "config file not found, falling back to deskagent home"
                            );
                            c
                        }
                        Err(_) => {
                            return Err(e).with_context(|| {
                                format!("failed to read config file: {}", path.display())
                            });
                        }
                    }
                } else {
                    return Err(e).with_context(|| {
                        format!("failed to read config file: {}", path.display())
                    });
                }
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read config file: {}", path.display()));
            }
        };

        let config: Config =
            serde_yaml_ng::from_str(&contents).context("failed to parse config YAML")?;
        config.validate()?;

        tracing::debug!(
            provider = %config.model.provider,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Validate semantic constraints that serde cannot enforce.
    fn validate(&self) -> anyhow::Result<()> {
        match self.model.provider.as_str() {
            "gemini" => {}
            "openai-compat" => {
                if self.model.endpoint.is_none() {
                    anyhow::bail!("config: provider 'openai-compat' requires an endpoint");
                }
            }
            other => {
                anyhow::bail!(
                    "config: unknown model provider '{other}' (expected 'gemini' or 'openai-compat')"
                );
            }
        }

        if self.agent.max_tool_iterations == 0 {
            anyhow::bail!("config: agent.max_tool_iterations must be at least 1");
        }

        if self.browser.auth_state.trim().is_empty() {
            anyhow::bail!("config: browser.auth_state must not be empty");
        }

        Ok(())
    }

    /// Resolved model API key, expanding `$VAR` references.
    pub fn model_api_key(&self) -> Option<String> {
        self.model.api_key.as_deref().and_then(resolve_secret)
    }

    /// Resolved AbuseIPDB API key, expanding `$VAR` references.
    pub fn abuse_api_key(&self) -> Option<String> {
        self.lookup.abuse_api_key.as_deref().and_then(resolve_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_plain_secret() {
        assert_eq!(resolve_secret("sk-test"), Some("sk-test".to_string()));
        assert_eq!(resolve_secret(""), None);
    }

    #[test]
    fn resolve_env_secret() {
        std::env::set_var("DESKAGENT_TEST_KEY_A", "value-a");
        assert_eq!(
            resolve_secret("$DESKAGENT_TEST_KEY_A"),
            Some("value-a".to_string())
        );
        std::env::remove_var("DESKAGENT_TEST_KEY_A");
        assert_eq!(resolve_secret("$DESKAGENT_TEST_KEY_A"), None);
    }

    #[test]
    fn defaults_fill_in() {
        let cfg: Config = serde_yaml_ng::from_str(
            "model:\n  provider: gemini\n  model: gemini-2.5-flash\n",
        )
        .unwrap();
        assert_eq!(cfg.sheets.credentials, "credentials.json");
        assert_eq!(cfg.browser.auth_state, "auth.json");
        assert!(cfg.browser.headless);
        assert_eq!(cfg.agent.max_tool_iterations, 6);
        assert!(cfg.agent.instruction.contains("process_tickets"));
    }
}
