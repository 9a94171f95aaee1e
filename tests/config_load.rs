//! Configuration loading and validation tests.

use deskagent::config::Config;

async fn write_config(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.yaml");
    tokio::fs::write(&path, contents).await.unwrap();
    path
}

#[tokio::test]
async fn full_config_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
model:
  provider: openai-compat
  model: mistral
  endpoint: http://localhost:11434/v1/chat/completions
sheets:
  credentials: /etc/deskagent/credentials.json
browser:
  auth_state: /var/lib/deskagent/auth.json
  headless: false
lookup:
  abuse_api_key: $ABUSEIPDB_API_KEY
agent:
  max_tool_iterations: 4
"#,
    )
    .await;

    let cfg = Config::load(&path).await.unwrap();
    assert_eq!(cfg.model.provider, "openai-compat");
    assert_eq!(cfg.sheets.credentials, "/etc/deskagent/credentials.json");
    assert_eq!(cfg.browser.auth_state, "/var/lib/deskagent/auth.json");
    assert!(!cfg.browser.headless);
    assert_eq!(cfg.agent.max_tool_iterations, 4);
    // Instruction default survives partial agent section.
    assert!(cfg.agent.instruction.contains("ticket"));
}

#[tokio::test]
async fn minimal_gemini_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "model:\n  provider: gemini\n  api_key: $GOOGLE_API_KEY\n",
    )
    .await;

    let cfg = Config::load(&path).await.unwrap();
    assert_eq!(cfg.browser.auth_state, "auth.json");
    assert!(cfg.browser.headless);
    assert_eq!(cfg.sheets.credentials, "credentials.json");
}

#[tokio::test]
async fn unknown_provider_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "model:\n  provider: copilot\n").await;
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("unknown model provider"));
}

#[tokio::test]
async fn openai_compat_requires_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "model:\n  provider: openai-compat\n  model: mistral\n").await;
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("requires an endpoint"));
}

#[tokio::test]
async fn zero_tool_iterations_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "model:\n  provider: gemini\nagent:\n  max_tool_iterations: 0\n",
    )
    .await;
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("max_tool_iterations"));
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.yaml");
    let err = Config::load(&path).await.unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
