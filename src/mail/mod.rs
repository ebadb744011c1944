//! IMAP inbox monitor.
//!
//! Connects over TLS, searches a folder, and summarizes matching
//! messages (sender, subject, first text/plain body part). Credentials
//! come from the credential store under `email_monitor`: `url` is the
//! IMAP host, plus `username` and `password`.
//!
//! The `imap` client is blocking, so polls run on the blocking thread
//! pool and hand back plain summaries.

use std::sync::Arc;

use mailparse::MailHeaderMap;
use thiserror::Error;

use crate::config::MailConfig;
use crate::secrets::{SecretStore, SecretsError};

/// Credential service name for the inbox secrets.
const SERVICE: &str = "email_monitor";

/// IMAPS port.
const IMAP_PORT: u16 = 993;

/// How many characters of a message body the summary keeps.
const PREVIEW_CHARS: usize = 120;

/// Errors from the inbox monitor.
#[derive(Error, Debug)]
pub enum MailError {
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error("tls setup failed: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("imap error: {0}")]
    Imap(#[from] imap::Error),

    #[error("failed to parse message {seq}: {source}")]
    Parse {
        seq: u32,
        #[source]
        source: mailparse::MailParseError,
    },

    #[error("poll task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One summarized inbox message.
#[derive(Debug, Clone)]
pub struct MailSummary {
    pub seq: u32,
    pub sender: String,
    pub subject: String,
    /// Truncated plain-text body.
    pub preview: String,
}

/// Polls an IMAP folder for messages matching a search criteria.
pub struct MailMonitor {
    secrets: Arc<SecretStore>,
    folder: String,
    criteria: String,
    max_messages: usize,
}

impl MailMonitor {
    pub fn new(secrets: Arc<SecretStore>, config: &MailConfig) -> Self {
        Self {
            secrets,
            folder: config.folder.clone(),
            criteria: config.criteria.clone(),
            max_messages: config.max_messages,
        }
    }

    /// Poll the folder once, newest matches first.
    pub async fn poll(&self) -> Result<Vec<MailSummary>, MailError> {
        let scope = self.secrets.scoped("poll_inbox");
        let host = scope.get(SERVICE, "url")?;
        let username = scope.get(SERVICE, "username")?;
        let password = scope.get(SERVICE, "password")?;

        let folder = self.folder.clone();
        let criteria = self.criteria.clone();
        let max_messages = self.max_messages;

        tokio::task::spawn_blocking(move || {
            poll_blocking(&host, &username, &password, &folder, &criteria, max_messages)
        })
        .await?
    }
}

fn poll_blocking(
    host: &str,
    username: &str,
    password: &str,
    folder: &str,
    criteria: &str,
    max_messages: usize,
) -> Result<Vec<MailSummary>, MailError> {
    let tls = native_tls::TlsConnector::builder().build()?;
    let client = imap::connect((host, IMAP_PORT), host, &tls)?;
    let mut session = client.login(username, password).map_err(|(e, _)| e)?;

    session.select(folder)?;
    let mut seqs: Vec<u32> = session.search(criteria)?.into_iter().collect();
    seqs.sort_unstable();

    let mut summaries = Vec::new();
    for &seq in seqs.iter().rev().take(max_messages) {
        let fetches = session.fetch(seq.to_string(), "RFC822")?;
        let Some(fetch) = fetches.iter().next() else {
            continue;
        };
        let Some(raw) = fetch.body() else {
            continue;
        };
        summaries.push(summarize(seq, raw)?);
    }

    session.logout().ok();
    Ok(summaries)
}

/// Parse a raw RFC822 message into a summary.
fn summarize(seq: u32, raw: &[u8]) -> Result<MailSummary, MailError> {
    let parsed = mailparse::parse_mail(raw).map_err(|source| MailError::Parse { seq, source })?;
    let sender = parsed
        .headers
        .get_first_value("From")
        .unwrap_or_default();
    let subject = parsed
        .headers
        .get_first_value("Subject")
        .unwrap_or_default();

    let body = plain_text_body(&parsed);
    let preview: String = body.trim().chars().take(PREVIEW_CHARS).collect();

    Ok(MailSummary {
        seq,
        sender,
        subject,
        preview,
    })
}

/// Find the first text/plain part, descending into multipart messages.
fn plain_text_body(mail: &mailparse::ParsedMail<'_>) -> String {
    if mail.ctype.mimetype == "text/plain" {
        return mail.get_body().unwrap_or_default();
    }
    for part in &mail.subparts {
        let text = plain_text_body(part);
        if !text.is_empty() {
            return text;
        }
    }
    String::new()
}
