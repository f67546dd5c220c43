//! Notification transport for guardian alerts.
//!
//! Dispatch is best-effort and retry-less: the durable alert row is the
//! commitment, and guardians observe it via polling even when a push fails.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::RiskLevel;

/// Timeout for one notification send.
pub const NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Who a notification goes to.
#[derive(Debug, Clone)]
pub struct GuardianContact {
    pub name: String,
    pub phone: Option<String>,
}

/// Send-one-message transport contract.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(&self, contact: &GuardianContact, message: &str) -> Result<()>;

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;
}

/// WhatsApp transport via CallMeBot.
pub struct CallMeBotTransport {
    http: Client,
    api_key: String,
}

impl CallMeBotTransport {
    const URL: &'static str = "https://api.callmebot.com/whatsapp.php";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl AlertTransport for CallMeBotTransport {
    async fn send(&self, contact: &GuardianContact, message: &str) -> Result<()> {
        let phone = contact.phone.as_deref().ok_or_else(|| {
            Error::validation(format!("guardian {} has no phone on file", contact.name))
        })?;

        let response = self
            .http
            .get(Self::URL)
            .query(&[
                ("phone", phone),
                ("text", message),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::dependency_unavailable("callmebot", e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::dependency_unavailable(
                "callmebot",
                format!("status {}", response.status()),
            ));
        }

        debug!(to = %phone, "whatsapp alert dispatched");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "callmebot"
    }
}

/// Transport that drops every message. Used when notifications are disabled.
pub struct NullTransport;

#[async_trait]
impl AlertTransport for NullTransport {
    async fn send(&self, _contact: &GuardianContact, _message: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "null"
    }
}

/// Render the scam alert message pushed to a guardian.
pub fn scam_alert_message(
    user_name: &str,
    sender: &str,
    level: RiskLevel,
    reason: &str,
) -> String {
    format!(
        "SCAM ALERT\n\n\
         {user_name} received a suspicious message\n\n\
         From: {sender}\n\
         Risk: {level}\n\
         Reason: {reason}\n\n\
         Please check on them and advise caution."
    )
}

/// Render the test message confirming a guardian link.
pub fn test_alert_message(user_name: &str) -> String {
    format!(
        "Test Alert\n\n\
         You are now set up as a guardian for {user_name}.\n\
         You will receive alerts when they get scam messages.\n\n\
         Guardian protection is active."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_message_rendering() {
        let message = scam_alert_message("Asha", "+919999999999", RiskLevel::High, "KYC bait");
        assert!(message.contains("Asha"));
        assert!(message.contains("HIGH"));
        assert!(message.contains("KYC bait"));
    }

    #[tokio::test]
    async fn test_null_transport_accepts_everything() {
        let transport = NullTransport;
        let contact = GuardianContact {
            name: "G".to_string(),
            phone: None,
        };
        assert!(transport.send(&contact, "hello").await.is_ok());
        assert_eq!(transport.name(), "null");
    }

    #[tokio::test]
    async fn test_callmebot_requires_phone() {
        let transport = CallMeBotTransport::new("key");
        let contact = GuardianContact {
            name: "G".to_string(),
            phone: None,
        };
        let err = transport.send(&contact, "hello").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
