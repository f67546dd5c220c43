//! Guardian alert fan-out and lifecycle.
//!
//! After a scan is persisted, alerts fan out to every active guardian link
//! whose protected user's threshold is met. Alert rows and the scan's
//! `guardian_alerted` flag commit atomically; notification dispatch is
//! best-effort afterwards.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::guardian::notify::{scam_alert_message, test_alert_message, AlertTransport, GuardianContact};
use crate::store::{
    AlertAction, AlertStatus, GuardianAlert, Scan, SqliteStore, User, UserSettings,
};
use crate::types::AlertThreshold;

/// Alert projection returned to polling guardians.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertView {
    pub alert: GuardianAlert,
    pub protected_name: String,
    pub sender: String,
    pub risk_level: crate::types::RiskLevel,
    pub risk_reason: String,
    pub message_preview: Option<String>,
}

/// Threshold-driven fan-out and the alert state machine.
pub struct GuardianAlertService {
    store: Arc<SqliteStore>,
    transport: Arc<dyn AlertTransport>,
}

impl GuardianAlertService {
    pub fn new(store: Arc<SqliteStore>, transport: Arc<dyn AlertTransport>) -> Self {
        Self { store, transport }
    }

    /// Create alerts for a persisted scan. Returns the number created.
    ///
    /// A dispatch failure does not roll back the alert rows: the pending
    /// alert remains visible to the guardian via polling.
    pub async fn fan_out(&self, user: &User, scan: &Scan) -> Result<usize> {
        let threshold = self
            .store
            .get_settings(user.id)?
            .map(|s| s.alert_threshold)
            .unwrap_or(AlertThreshold::High);

        if !threshold.is_met_by(scan.risk_level) {
            return Ok(0);
        }

        let links = self.store.active_links_protecting(user.id)?;
        if links.is_empty() {
            return Ok(0);
        }

        let guardian_ids: Vec<i64> = links.iter().map(|l| l.guardian_id).collect();
        let created = self
            .store
            .create_alerts_for_scan(scan.id, user.id, &guardian_ids)?;

        info!(scan_id = scan.id, created, "guardian alerts created");

        let message = scam_alert_message(&user.name, &scan.sender, scan.risk_level, &scan.risk_reason);
        for guardian_id in guardian_ids {
            let Some(guardian) = self.store.get_user(guardian_id)? else {
                continue;
            };
            let contact = GuardianContact {
                name: guardian.name.clone(),
                phone: guardian.phone.clone(),
            };
            if let Err(e) = self.transport.send(&contact, &message).await {
                warn!(
                    guardian_id,
                    transport = self.transport.name(),
                    error = %e,
                    "alert dispatch failed; pending alert remains"
                );
            }
        }

        Ok(created)
    }

    /// Pending alerts for a guardian, joined with scan context.
    pub fn pending_for(&self, guardian_id: i64) -> Result<Vec<AlertView>> {
        let alerts = self.store.pending_alerts_for(guardian_id)?;
        let mut views = Vec::with_capacity(alerts.len());

        for alert in alerts {
            let protected_name = self
                .store
                .get_user(alert.user_id)?
                .map(|u| u.name)
                .unwrap_or_default();
            let scan = self.store.get_scan(alert.scan_id)?;
            let (sender, risk_level, risk_reason, message_preview) = match scan {
                Some(s) => (s.sender, s.risk_level, s.risk_reason, s.message_preview),
                None => (
                    String::new(),
                    crate::types::RiskLevel::Unknown,
                    String::new(),
                    None,
                ),
            };
            views.push(AlertView {
                alert,
                protected_name,
                sender,
                risk_level,
                risk_reason,
                message_preview,
            });
        }

        Ok(views)
    }

    /// Mark an alert as seen. A second call is a no-op; terminal states
    /// reject the transition.
    pub fn mark_seen(&self, guardian_id: i64, alert_id: i64) -> Result<GuardianAlert> {
        let mut alert = self.owned_alert(guardian_id, alert_id)?;

        match alert.status {
            AlertStatus::Seen => Ok(alert),
            AlertStatus::Pending => {
                alert.status = AlertStatus::Seen;
                alert.seen_at = Some(Utc::now());
                self.store.update_alert(&alert)?;
                Ok(alert)
            }
            _ => Err(Error::conflict("alert is already resolved")),
        }
    }

    /// Record the guardian's action on an alert. Transitions are monotonic;
    /// terminal states reject further changes.
    pub fn action(
        &self,
        guardian_id: i64,
        alert_id: i64,
        action: AlertAction,
        notes: Option<String>,
    ) -> Result<GuardianAlert> {
        let mut alert = self.owned_alert(guardian_id, alert_id)?;

        if alert.status.is_terminal() {
            return Err(Error::conflict("alert is already resolved"));
        }

        let now = Utc::now();
        alert.status = if action == AlertAction::Dismissed {
            AlertStatus::Dismissed
        } else {
            AlertStatus::Actioned
        };
        alert.action = Some(action);
        alert.notes = notes;
        alert.seen_at = alert.seen_at.or(Some(now));
        alert.actioned_at = Some(now);
        self.store.update_alert(&alert)?;

        Ok(alert)
    }

    /// Push a test notification confirming a guardian link.
    pub async fn send_test_alert(&self, protected: &User, guardian_id: i64) -> Result<()> {
        if self
            .store
            .active_link_between(protected.id, guardian_id)?
            .is_none()
        {
            return Err(Error::not_found("Guardian link"));
        }

        let guardian = self
            .store
            .get_user(guardian_id)?
            .ok_or_else(|| Error::not_found("User"))?;

        let contact = GuardianContact {
            name: guardian.name.clone(),
            phone: guardian.phone.clone(),
        };
        self.transport
            .send(&contact, &test_alert_message(&protected.name))
            .await
    }

    /// Threshold setting helper used by the embedding application.
    pub fn effective_settings(&self, user_id: i64) -> Result<UserSettings> {
        Ok(self
            .store
            .get_settings(user_id)?
            .unwrap_or_else(|| UserSettings::defaults_for(user_id)))
    }

    fn owned_alert(&self, guardian_id: i64, alert_id: i64) -> Result<GuardianAlert> {
        let alert = self
            .store
            .get_alert(alert_id)?
            .ok_or_else(|| Error::not_found("Alert"))?;
        if alert.guardian_id != guardian_id {
            return Err(Error::not_found("Alert"));
        }
        Ok(alert)
    }
}
