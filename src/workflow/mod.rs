//! Ticket-checking workflow.
//!
//! Composes the spreadsheet reader and the browser session manager:
//! read ticket ids from column A, ensure the session is logged in
//! against the base URL once, then check each non-blank ticket in sheet
//! order and collect one report line per ticket.
//!
//! The collaborators are injected through the [`TicketSource`] and
//! [`TicketBrowser`] traits so the orchestration is testable without a
//! spreadsheet service or a browser.

use async_trait::async_trait;
use tracing::{info, warn};

/// Message returned when column A holds no ticket ids at all.
pub const NO_TICKETS_MESSAGE: &str = "No tickets found in Column A.";

/// Source of ticket identifiers (column A of a sheet).
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// All values of column A for the identified sheet, in sheet order,
    /// blanks included.
    async fn ticket_ids(&self, sheet_identifier: &str) -> anyhow::Result<Vec<String>>;
}

/// Browser-session operations the workflow needs.
#[async_trait]
pub trait TicketBrowser: Send {
    /// Navigate to the base URL and persist the session state.
    async fn ensure_login(&mut self, base_url: &str) -> anyhow::Result<()>;
    /// Check a single ticket URL, returning its summary line.
    async fn check_ticket(&mut self, ticket_url: &str) -> anyhow::Result<String>;
}

#[async_trait]
impl TicketBrowser for crate::browser::SessionManager {
    async fn ensure_login(&mut self, base_url: &str) -> anyhow::Result<()> {
        crate::browser::SessionManager::ensure_login(self, base_url).await
    }

    async fn check_ticket(&mut self, ticket_url: &str) -> anyhow::Result<String> {
        crate::browser::SessionManager::check_ticket(self, ticket_url).await
    }
}

/// Process every ticket listed in column A of `sheet_identifier`
/// against `base_url`, returning the newline-joined report.
///
/// - an empty column yields [`NO_TICKETS_MESSAGE`] without touching the
///   browser at all;
/// - blank entries are skipped, order is preserved;
/// - a per-ticket failure becomes an `Error checking …` report line and
///   the iteration continues;
/// - a spreadsheet or login failure aborts the whole run.
pub async fn process_tickets<S, B>(
    source: &S,
    browser: &mut B,
    sheet_identifier: &str,
    base_url: &str,
) -> anyhow::Result<String>
where
    S: TicketSource + ?Sized,
    B: TicketBrowser + ?Sized,
{
    info!(sheet = %sheet_identifier, "fetching tickets");
    let tickets = source.ticket_ids(sheet_identifier).await?;

    if tickets.is_empty() {
        return Ok(NO_TICKETS_MESSAGE.to_string());
    }

    info!(url = %base_url, "ensuring login");
    browser.ensure_login(base_url).await?;

    let mut results = Vec::new();
    for ticket in &tickets {
        if ticket.is_empty() {
            continue;
        }
        let ticket_url = format!("{base_url}{ticket}");
        match browser.check_ticket(&ticket_url).await {
            Ok(line) => results.push(line),
            Err(e) => {
                warn!(url = %ticket_url, error = %e, "ticket check failed");
                results.push(format!("Error checking {ticket_url}: {e}"));
            }
        }
    }

    Ok(results.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct FixedSource(Vec<String>);

    #[async_trait]
    impl TicketSource for FixedSource {
        async fn ticket_ids(&self, _sheet: &str) -> anyhow::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TicketSource for FailingSource {
        async fn ticket_ids(&self, _sheet: &str) -> anyhow::Result<Vec<String>> {
            anyhow::bail!("sheet not found: Tickets")
        }
    }

    #[derive(Default)]
    struct RecordingBrowser {
        logged_in: AtomicBool,
        checked: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl TicketBrowser for RecordingBrowser {
        async fn ensure_login(&mut self, _base_url: &str) -> anyhow::Result<()> {
            self.logged_in.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn check_ticket(&mut self, ticket_url: &str) -> anyhow::Result<String> {
            self.checked.lock().unwrap().push(ticket_url.to_string());
            if let Some(ref bad) = self.fail_on {
                if ticket_url.ends_with(bad.as_str()) {
                    anyhow::bail!("net::ERR_CONNECTION_REFUSED");
                }
            }
            Ok(format!("Checked {ticket_url} | Title: Ticket"))
        }
    }

    #[tokio::test]
    async fn blanks_are_skipped_and_order_kept() {
        let source = FixedSource(vec![
            "T1".into(),
            "T2".into(),
            String::new(),
            "T3".into(),
        ]);
        let mut browser = RecordingBrowser::default();
        let report = process_tickets(&source, &mut browser, "Tickets", "https://app/ticket/")
            .await
            .unwrap();

        let checked = browser.checked.lock().unwrap().clone();
        assert_eq!(
            checked,
            vec![
                "https://app/ticket/T1",
                "https://app/ticket/T2",
                "https://app/ticket/T3"
            ]
        );
        assert_eq!(report.lines().count(), 3);
        assert!(report.starts_with("Checked https://app/ticket/T1"));
    }

    #[tokio::test]
    async fn empty_column_skips_browser_entirely() {
        let source = FixedSource(Vec::new());
        let mut browser = RecordingBrowser::default();
        let report = process_tickets(&source, &mut browser, "Tickets", "https://app/ticket/")
            .await
            .unwrap();

        assert_eq!(report, NO_TICKETS_MESSAGE);
        assert!(!browser.logged_in.load(Ordering::SeqCst));
        assert!(browser.checked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn per_ticket_failure_becomes_a_line() {
        let source = FixedSource(vec!["T1".into(), "T2".into()]);
        let mut browser = RecordingBrowser {
            fail_on: Some("T1".into()),
            ..Default::default()
        };
        let report = process_tickets(&source, &mut browser, "Tickets", "https://app/ticket/")
            .await
            .unwrap();

        let lines: Vec<&str> = report.lines().collect();
        assert!(lines[0].starts_with("Error checking https://app/ticket/T1:"));
        assert!(lines[1].starts_with("Checked https://app/ticket/T2"));
    }

    #[tokio::test]
    async fn source_failure_propagates() {
        let mut browser = RecordingBrowser::default();
        let err = process_tickets(&FailingSource, &mut browser, "Tickets", "https://app/")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("sheet not found"));
        assert!(!browser.logged_in.load(Ordering::SeqCst));
    }
}
