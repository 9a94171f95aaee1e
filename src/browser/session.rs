//! Session manager — login-state persistence and per-ticket checks.
//!
//! Owns one browser session per instance. The persisted storage-state
//! file is the only authentication signal: it is loaded when a session
//! starts and overwritten wholesale after every [`ensure_login`] call.
//! Existence of the file is necessary but not sufficient for a valid
//! login — nothing here verifies that navigation actually reached an
//! authenticated page (a stale state only shows up as a login page in
//! later ticket checks). Known gap, kept deliberately.
//!
//! [`ensure_login`]: SessionManager::ensure_login

use std::path::PathBuf;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{BrowserService, WaitUntil};

/// Manages a single browser session and its persisted auth state.
pub struct SessionManager {
    svc: BrowserService,
    auth_file: PathBuf,
    headless: bool,
    session: Option<String>,
}

impl SessionManager {
    /// Create a manager over an already-connected [`BrowserService`].
    ///
    /// No session is opened until [`start_session`](Self::start_session)
    /// or [`ensure_login`](Self::ensure_login) runs.
    pub fn new(svc: BrowserService, auth_file: impl Into<PathBuf>, headless: bool) -> Self {
        Self {
            svc,
            auth_file: auth_file.into(),
            headless,
            session: None,
        }
    }

    /// Whether a browser session is currently open.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Start the browser session, seeded from the persisted auth-state
    /// file when one exists. A missing file is not an error — the
    /// session simply starts unauthenticated.
    pub async fn start_session(&mut self) -> anyhow::Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let storage_state = match tokio::fs::read_to_string(&self.auth_file).await {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(state) => {
                    info!(path = %self.auth_file.display(), "loading persisted session state");
                    Some(state)
                }
                Err(e) => {
                    warn!(
                        path = %self.auth_file.display(),
                        error = %e,
                        "auth state file is not valid JSON, starting fresh"
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("no existing session state found, starting fresh");
                None
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read auth state: {}", self.auth_file.display())
                });
            }
        };

        let session_id = self
            .svc
            .create_session(storage_state.as_ref(), self.headless)
            .await?;
        debug!(session = %session_id, "browser session started");
        self.session = Some(session_id);
        Ok(())
    }

    /// Navigate to `base_url`, wait for network idle, and persist the
    /// session's storage state back to disk.
    ///
    /// Idempotent-ish: every call re-navigates and overwrites the auth
    /// file, whether or not the page reached was an authenticated one.
    pub async fn ensure_login(&mut self, base_url: &str) -> anyhow::Result<()> {
        self.start_session().await?;
        let session = self.session.as_deref().expect("session started above");

        debug!(url = %base_url, "navigating for login check");
        self.svc
            .goto(session, base_url, WaitUntil::NetworkIdle)
            .await?;

        self.persist_state().await?;
        Ok(())
    }

    /// Navigate to a specific ticket URL and summarise it by page title.
    ///
    /// Fails fast (no navigation) when no session is open.
    pub async fn check_ticket(&mut self, ticket_url: &str) -> anyhow::Result<String> {
        let session = self
            .session
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("browser session not started"))?;

        debug!(url = %ticket_url, "checking ticket");
        self.svc
            .goto(session, ticket_url, WaitUntil::DomContentLoaded)
            .await?;
        let title = self.svc.title(session).await?;

        Ok(format!("Checked {ticket_url} | Title: {title}"))
    }

    /// Write the session's current storage state to the auth file,
    /// replacing any previous contents.
    async fn persist_state(&self) -> anyhow::Result<()> {
        let session = self
            .session
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("browser session not started"))?;

        let state = self.svc.storage_state(session).await?;
        let raw = serde_json::to_string(&state).context("serializing storage state")?;
        tokio::fs::write(&self.auth_file, raw)
            .await
            .with_context(|| {
                format!("failed to write auth state: {}", self.auth_file.display())
            })?;
        info!(path = %self.auth_file.display(), "session state saved");
        Ok(())
    }

    /// Persist the latest state and close the browser session.
    ///
    /// Safe to call without an open session (no-op).
    pub async fn close(&mut self) -> anyhow::Result<()> {
        if let Some(session) = self.session.take() {
            // Best-effort final state save before teardown.
            self.session = Some(session.clone());
            if let Err(e) = self.persist_state().await {
                warn!(error = %e, "failed to persist state during close");
            }
            self.session = None;
            self.svc.close(&session).await?;
            debug!(session = %session, "browser session closed");
        }
        Ok(())
    }
}
