//! Browser automation via a Playwright sidecar.
//!
//! [`BrowserService`] is a thin HTTP client for a headless-browser
//! sidecar process; if the sidecar is not running, [`BrowserService::connect`]
//! returns an error immediately (fail-fast). [`SessionManager`] layers the
//! login-state persistence and ticket-check operations on top.

pub mod session;

pub use session::SessionManager;

use anyhow::Context;
use serde_json::Value;

/// Default base URL for the browser sidecar.
const DEFAULT_SIDECAR_URL: &str = "http://127.0.0.1:9514";

/// Navigation wait condition, mapped to the sidecar's Playwright call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// Wait for the `DOMContentLoaded` event.
    DomContentLoaded,
    /// Wait until the network has been idle.
    NetworkIdle,
}

impl WaitUntil {
    fn as_str(self) -> &'static str {
        match self {
            WaitUntil::DomContentLoaded => "domcontentloaded",
            WaitUntil::NetworkIdle => "networkidle",
        }
    }
}

/// Thin HTTP client for a headless-browser sidecar process.
#[derive(Debug, Clone)]
pub struct BrowserService {
    client: reqwest::Client,
    base_url: String,
}

impl BrowserService {
    /// Connect to the browser sidecar.
    ///
    /// Performs a health-check request; returns an error if the sidecar
    /// is unreachable. `base_url` falls back to `BROWSER_SIDECAR_URL`
    /// and then the built-in default.
    pub async fn connect(base_url: Option<&str>) -> anyhow::Result<Self> {
        let base_url = match base_url {
            Some(u) => u.to_string(),
            None => std::env::var("BROWSER_SIDECAR_URL")
                .unwrap_or_else(|_| DEFAULT_SIDECAR_URL.to_string()),
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("building HTTP client for browser sidecar")?;

        // Health check — fail fast if sidecar is down or unhealthy.
        let health = format!("{base_url}/health");
        client
            .get(&health)
            .send()
            .await
            .with_context(|| format!("browser sidecar not reachable at {base_url}"))?
            .error_for_status()
            .with_context(|| format!("browser sidecar unhealthy at {base_url}"))?;

        Ok(Self { client, base_url })
    }

    /// Create a new browser session, optionally seeded with a persisted
    /// storage state (cookies + local storage). Returns the session id.
    pub async fn create_session(
        &self,
        storage_state: Option<&Value>,
        headless: bool,
    ) -> anyhow::Result<String> {
        let url = format!("{}/sessions", self.base_url);
        let mut body = serde_json::json!({ "headless": headless });
        if let Some(state) = storage_state {
            body["storage_state"] = state.clone();
        }
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("creating browser session")?;
        let json: Value = resp.json().await.context("parsing session response")?;
        json["session_id"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("sidecar did not return session_id"))
    }

    /// Navigate to a URL within a session and block until the wait
    /// condition is met.
    pub async fn goto(
        &self,
        session_id: &str,
        target_url: &str,
        wait_until: WaitUntil,
    ) -> anyhow::Result<Value> {
        let endpoint = format!("{}/sessions/{}/goto", self.base_url, session_id);
        let body = serde_json::json!({
            "url": target_url,
            "wait_until": wait_until.as_str(),
        });
        let resp = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .context("browser goto")?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("navigation to {target_url} failed ({status}): {text}");
        }
        resp.json().await.context("parsing goto response")
    }

    /// Read the current page title.
    pub async fn title(&self, session_id: &str) -> anyhow::Result<String> {
        let endpoint = format!("{}/sessions/{}/title", self.base_url, session_id);
        let resp = self
            .client
            .get(&endpoint)
            .send()
            .await
            .context("reading page title")?;
        let json: Value = resp.json().await.context("parsing title response")?;
        Ok(json["title"].as_str().unwrap_or_default().to_string())
    }

    /// Export the session's current storage state.
    pub async fn storage_state(&self, session_id: &str) -> anyhow::Result<Value> {
        let endpoint = format!("{}/sessions/{}/state", self.base_url, session_id);
        let resp = self
            .client
            .get(&endpoint)
            .send()
            .await
            .context("exporting storage state")?;
        resp.json().await.context("parsing storage state")
    }

    /// Close a browser session.
    pub async fn close(&self, session_id: &str) -> anyhow::Result<Value> {
        let endpoint = format!("{}/sessions/{}", self.base_url, session_id);
        let resp = self
            .client
            .delete(&endpoint)
            .send()
            .await
            .context("closing browser session")?;
        resp.json().await.context("parsing close response")
    }
}
