//! Signed webhook notifications to the chat robot.
//!
//! The robot endpoint authenticates each POST with an HMAC-SHA256
//! signature over `"{timestamp_ms}\n{secret}"`, base64- then
//! percent-encoded into the query string. Credentials (`access_token`,
//! `secret`) come from the credential store under `dingtalk_notify`.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::config::NotifyConfig;
use crate::constants;
use crate::secrets::{SecretStore, SecretsError};

/// Credential service name for the webhook secrets.
const SERVICE: &str = "dingtalk_notify";

/// Request timeout for webhook posts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the webhook notifier.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error("invalid signing secret: {0}")]
    Signing(String),

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook rejected message: errcode {code}: {message}")]
    Rejected { code: i64, message: String },
}

/// Who to @-mention in a group message.
#[derive(Debug, Clone, Default)]
pub struct AtTargets {
    pub user_ids: Vec<String>,
    pub mobiles: Vec<String>,
    pub at_all: bool,
}

impl AtTargets {
    pub fn from_config(config: &NotifyConfig) -> Self {
        Self {
            user_ids: config.at_user_ids.clone(),
            mobiles: config.at_mobiles.clone(),
            at_all: config.at_all,
        }
    }
}

#[derive(Serialize)]
struct RobotMessage<'a> {
    msgtype: &'static str,
    text: TextContent<'a>,
    at: AtSection<'a>,
}

#[derive(Serialize)]
struct TextContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AtSection<'a> {
    is_at_all: bool,
    at_user_ids: &'a [String],
    at_mobiles: &'a [String],
}

/// Robot API response body.
#[derive(Debug, Deserialize)]
pub struct RobotResponse {
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

/// Compute the request signature for a given millisecond timestamp.
///
/// Returns the percent-encoded base64 HMAC, ready for the query string.
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, NotifyError> {
    let string_to_sign = format!("{timestamp_ms}\n{secret}");
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| NotifyError::Signing(e.to_string()))?;
    mac.update(string_to_sign.as_bytes());
    let digest = mac.finalize().into_bytes();
    Ok(urlencoding::encode(&STANDARD.encode(digest)).into_owned())
}

/// Split a comma-separated @-target list into trimmed, non-empty entries.
pub fn parse_targets(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Sends signed text messages to the group robot.
pub struct WebhookNotifier {
    http: reqwest::Client,
    secrets: Arc<SecretStore>,
    at: AtTargets,
}

impl WebhookNotifier {
    pub fn new(secrets: Arc<SecretStore>, at: AtTargets) -> Self {
        Self {
            http: reqwest::Client::new(),
            secrets,
            at,
        }
    }

    /// Send a text message to the group.
    pub async fn send(&self, message: &str) -> Result<RobotResponse, NotifyError> {
        let scope = self.secrets.scoped("send_group_message");
        let access_token = scope.get(SERVICE, "access_token")?;
        let secret = scope.get(SERVICE, "secret")?;

        let timestamp = Utc::now().timestamp_millis();
        let signature = sign(&secret, timestamp)?;
        let url = format!(
            "{}?access_token={access_token}&timestamp={timestamp}&sign={signature}",
            constants::WEBHOOK_URL
        );

        let body = RobotMessage {
            msgtype: "text",
            text: TextContent { content: message },
            at: AtSection {
                is_at_all: self.at.at_all,
                at_user_ids: &self.at.user_ids,
                at_mobiles: &self.at.mobiles,
            },
        };

        let response: RobotResponse = self
            .http
            .post(&url)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?
            .json()
            .await?;

        if response.errcode != 0 {
            return Err(NotifyError::Rejected {
                code: response.errcode,
                message: response.errmsg,
            });
        }
        Ok(response)
    }
}
