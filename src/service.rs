//! Application state and the protocol-agnostic verb surface.
//!
//! [`ScamShield`] owns every collaborator (store, caches, pipeline, guardian
//! services, archiver) as dependency-injected values created once at startup.
//! The embedding application maps its transport (HTTP, queue, CLI) onto these
//! verbs; authentication happens outside and hands a [`User`] in.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::archive::{ArchiveReport, Archiver};
use crate::config::Settings;
use crate::confidence::{ConfidenceScorer, SignalSet};
use crate::error::{Error, Result};
use crate::explain::{self, Explanation};
use crate::export::{self, ExportOptions};
use crate::guardian::{
    AlertTransport, AlertView, CallMeBotTransport, GuardianAlertService, GuardianLinkService,
    NullTransport, OtpIssued, VerifyOutcome,
};
use crate::kv::KvCache;
use crate::llm::{ClientConfig, GeminiClient, GroqClient, LocalModel, ModelClient};
use crate::pipeline::{AnalysisOutcome, DecidedBy, ScamDetector};
use crate::reputation::{ReportOutcome, ReputationHit, ReputationService, TrainingContext};
use crate::storage::{backend_from_settings, StorageBackend};
use crate::store::{
    AlertAction, BlacklistSource, EntityKind, NewScan, Scan, SqliteStore, User, UserSettings,
};
use crate::types::{
    Artifact, ContentType, Platform, RiskLevel, Verdict, MAX_ARTIFACT_BYTES,
};

/// Analysis request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub content: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub platform: Platform,
}

/// Analysis response payload.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponse {
    pub scan_id: i64,
    pub verdict: Verdict,
    pub explanation: Explanation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reputation: Option<ReputationHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_tip: Option<String>,
    pub alerts_created: usize,
}

/// Builder assembling a [`ScamShield`] from settings plus optional
/// dependency overrides.
pub struct ScamShieldBuilder {
    settings: Settings,
    store: Option<Arc<SqliteStore>>,
    remote: Option<Arc<dyn ModelClient>>,
    vision: Option<Arc<dyn ModelClient>>,
    local: Option<Arc<dyn LocalModel>>,
    transport: Option<Arc<dyn AlertTransport>>,
    backend: Option<Arc<dyn StorageBackend>>,
}

impl ScamShieldBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            store: None,
            remote: None,
            vision: None,
            local: None,
            transport: None,
            backend: None,
        }
    }

    pub fn with_store(mut self, store: Arc<SqliteStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_remote_model(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.remote = Some(client);
        self
    }

    pub fn with_vision_model(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.vision = Some(client);
        self
    }

    pub fn with_local_model(mut self, model: Arc<dyn LocalModel>) -> Self {
        self.local = Some(model);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn AlertTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_storage_backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<ScamShield> {
        let settings = self.settings;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(SqliteStore::open(&settings.database_url)?),
        };
        let kv = Arc::new(KvCache::new());
        let reputation = Arc::new(ReputationService::new(store.clone(), kv.clone()));

        let remote = self.remote.or_else(|| {
            settings.groq_api_key.as_ref().map(|key| {
                Arc::new(GroqClient::new(ClientConfig::new(key.as_str()))) as Arc<dyn ModelClient>
            })
        });
        let vision = self.vision.or_else(|| {
            settings.gemini_api_key.as_ref().map(|key| {
                Arc::new(GeminiClient::new(
                    ClientConfig::new(key.as_str()),
                    settings.vision_models.clone(),
                )) as Arc<dyn ModelClient>
            })
        });

        let mut detector = ScamDetector::new(reputation.clone());
        if let Some(remote) = remote {
            detector = detector.with_remote_model(remote);
        }
        if let Some(vision) = vision {
            detector = detector.with_vision_model(vision);
        }
        if let Some(local) = self.local {
            detector = detector.with_local_model(local);
        }

        let transport = self.transport.unwrap_or_else(|| {
            match (&settings.notification_api_key, settings.notifications_enabled) {
                (Some(key), true) => {
                    Arc::new(CallMeBotTransport::new(key.as_str())) as Arc<dyn AlertTransport>
                }
                _ => Arc::new(NullTransport) as Arc<dyn AlertTransport>,
            }
        });

        let backend = match self.backend {
            Some(backend) => backend,
            None => backend_from_settings(&settings)?,
        };

        Ok(ScamShield {
            links: GuardianLinkService::new(store.clone(), kv.clone()),
            alerts: GuardianAlertService::new(store.clone(), transport),
            archiver: Archiver::new(store.clone(), backend),
            scorer: ConfidenceScorer::new(),
            detector,
            reputation,
            kv,
            store,
            settings,
        })
    }
}

/// The analysis and alerting core.
pub struct ScamShield {
    settings: Settings,
    store: Arc<SqliteStore>,
    kv: Arc<KvCache>,
    reputation: Arc<ReputationService>,
    detector: ScamDetector,
    scorer: ConfidenceScorer,
    links: GuardianLinkService,
    alerts: GuardianAlertService,
    archiver: Archiver,
}

impl ScamShield {
    pub fn builder(settings: Settings) -> ScamShieldBuilder {
        ScamShieldBuilder::new(settings)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    pub fn kv(&self) -> &Arc<KvCache> {
        &self.kv
    }

    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    // ==================== Analysis ====================

    /// Analyze a text artifact, persist the scan, and fan out alerts.
    pub async fn analyze_text(&self, user: &User, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
        if request.content.trim().is_empty() {
            return Err(Error::validation("message content must not be empty"));
        }
        if request.content.len() > MAX_ARTIFACT_BYTES {
            return Err(Error::validation(format!(
                "message exceeds {MAX_ARTIFACT_BYTES} bytes"
            )));
        }

        let artifact = Artifact::new(
            request.content,
            request.content_type,
            request.sender,
            request.platform,
        );
        let settings = self.effective_settings(user.id)?;

        let outcome = self.analyze_with_overrides(user, &artifact).await?;
        let verdict = &outcome.verdict;

        // Storage invariant: LOW verdicts never retain the body
        let message = (verdict.level != RiskLevel::Low).then(|| artifact.content.clone());
        let preview: String = artifact.content.chars().take(200).collect();
        let auto_blocked =
            settings.auto_block_high_risk && verdict.level == RiskLevel::High;

        let scan = self.store.insert_scan(&NewScan {
            user_id: user.id,
            sender: artifact.sender.clone(),
            message,
            message_preview: Some(preview),
            platform: artifact.platform,
            risk_level: verdict.level,
            risk_reason: verdict.reason.clone(),
            scam_type: verdict.scam_type.clone(),
            confidence: verdict.confidence,
            is_blocked: auto_blocked,
            created_at: None,
        })?;

        // Severe scans contribute their entities to the reputation store
        if verdict.is_severe() {
            if let Err(e) = self
                .reputation
                .auto_blacklist_from_message(
                    &artifact.content,
                    &verdict.reason,
                    verdict.scam_type.as_deref(),
                    verdict.confidence,
                    user.consent_training_data,
                )
                .await
            {
                warn!(error = %e, "auto-blacklist contribution failed");
            }
        }

        let alerts_created = match self.alerts.fan_out(user, &scan).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "guardian fan-out failed");
                0
            }
        };

        let mut response = self.respond(scan, outcome, &settings);
        response.alerts_created = alerts_created;
        Ok(response)
    }

    /// Overrides short-circuit the pipeline: blocked and trusted senders
    /// bypass every detection stage.
    async fn analyze_with_overrides(
        &self,
        user: &User,
        artifact: &Artifact,
    ) -> Result<AnalysisOutcome> {
        let sender_blocked = !artifact.sender.is_empty()
            && self.store.is_sender_blocked(user.id, &artifact.sender)?;
        let sender_trusted = !artifact.sender.is_empty()
            && self.store.is_trusted_sender(user.id, &artifact.sender)?;

        if sender_blocked || sender_trusted {
            let score = self.scorer.calculate(&SignalSet {
                sender_blocked,
                sender_trusted,
                ..Default::default()
            });
            let mut verdict = Verdict::new(score.level, score.explanation, score.confidence);
            if sender_blocked {
                verdict = verdict.with_scam_type("Blocked Sender");
            }
            return Ok(AnalysisOutcome {
                verdict,
                decided_by: DecidedBy::Pattern,
                reputation: None,
                adjusted: false,
            });
        }

        Ok(self.detector.analyze(&artifact.content, &artifact.sender).await)
    }

    /// Analyze an image artifact through the vision pipeline.
    pub async fn analyze_image(
        &self,
        user: &User,
        image: &[u8],
        mime_type: &str,
        sender: &str,
        platform: Platform,
    ) -> Result<AnalyzeResponse> {
        if image.is_empty() {
            return Err(Error::validation("image payload must not be empty"));
        }

        let settings = self.effective_settings(user.id)?;
        let verdict = self.detector.analyze_image(image, mime_type).await;

        let scan = self.store.insert_scan(&NewScan {
            user_id: user.id,
            sender: sender.to_string(),
            message: None,
            message_preview: Some("[Image Analysis]".to_string()),
            platform,
            risk_level: verdict.level,
            risk_reason: verdict.reason.clone(),
            scam_type: verdict.scam_type.clone(),
            confidence: verdict.confidence,
            is_blocked: false,
            created_at: None,
        })?;

        let alerts_created = match self.alerts.fan_out(user, &scan).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "guardian fan-out failed");
                0
            }
        };

        let outcome = AnalysisOutcome {
            verdict,
            decided_by: DecidedBy::Fallback,
            reputation: None,
            adjusted: false,
        };
        let mut response = self.respond(scan, outcome, &settings);
        response.alerts_created = alerts_created;
        Ok(response)
    }

    fn respond(
        &self,
        scan: Scan,
        outcome: AnalysisOutcome,
        settings: &UserSettings,
    ) -> AnalyzeResponse {
        let verdict = outcome.verdict;
        let explanation = explain::explanation(
            verdict.level,
            verdict.scam_type.as_deref(),
            &settings.language,
        );
        let quick_tip = (settings.receive_tips && verdict.level != RiskLevel::Low)
            .then(|| explain::quick_tip(verdict.scam_type.as_deref()).to_string());

        AnalyzeResponse {
            scan_id: scan.id,
            verdict,
            explanation,
            reputation: outcome.reputation,
            quick_tip,
            alerts_created: 0,
        }
    }

    // ==================== Reputation ====================

    /// Report a scam entity on behalf of a user.
    pub async fn report_entity(
        &self,
        user: &User,
        value: &str,
        kind: EntityKind,
        reason: Option<String>,
    ) -> Result<ReportOutcome> {
        if value.trim().is_empty() {
            return Err(Error::validation("value must not be empty"));
        }

        let training = TrainingContext {
            ai_reasoning: reason,
            ..Default::default()
        };
        self.reputation
            .report(
                value,
                kind,
                BlacklistSource::Community,
                user.consent_training_data,
                Some(&training),
            )
            .await
    }

    /// Check an entity against the reputation store.
    pub async fn check_reputation(&self, value: &str, kind: EntityKind) -> Result<ReputationHit> {
        if value.trim().is_empty() {
            return Err(Error::validation("value must not be empty"));
        }
        self.reputation.check(value, kind).await
    }

    /// Produce a training-data export.
    pub fn export_training_data(&self, options: &ExportOptions) -> Result<String> {
        export::export_training_data(&self.store, options)
    }

    // ==================== Guardian ====================

    /// Issue a guardian linking code for a protected user.
    pub async fn generate_otp(&self, user: &User) -> Result<OtpIssued> {
        self.links.generate_otp(user).await
    }

    /// Redeem a linking code as a guardian.
    pub async fn verify_otp(
        &self,
        guardian: &User,
        protected_email: &str,
        code: &str,
    ) -> Result<VerifyOutcome> {
        self.links.verify_otp(guardian, protected_email, code).await
    }

    /// Revoke a guardian link.
    pub async fn revoke_link(&self, user: &User, link_id: i64) -> Result<()> {
        self.links.revoke(user.id, link_id).await
    }

    /// Pending alerts for a polling guardian.
    pub fn guardian_alerts_pending(&self, guardian: &User) -> Result<Vec<AlertView>> {
        self.alerts.pending_for(guardian.id)
    }

    /// Mark an alert as seen.
    pub fn alert_mark_seen(&self, guardian: &User, alert_id: i64) -> Result<crate::store::GuardianAlert> {
        self.alerts.mark_seen(guardian.id, alert_id)
    }

    /// Record the guardian's action on an alert.
    pub fn alert_action(
        &self,
        guardian: &User,
        alert_id: i64,
        action: AlertAction,
        notes: Option<String>,
    ) -> Result<crate::store::GuardianAlert> {
        self.alerts.action(guardian.id, alert_id, action, notes)
    }

    /// Push a test notification to a linked guardian.
    pub async fn send_test_alert(&self, user: &User, guardian_id: i64) -> Result<()> {
        self.alerts.send_test_alert(user, guardian_id).await
    }

    // ==================== Senders & History ====================

    /// Mark a sender as trusted.
    pub fn add_trusted_sender(&self, user: &User, sender: &str) -> Result<()> {
        if sender.trim().is_empty() {
            return Err(Error::validation("sender must not be empty"));
        }
        self.store.add_trusted_sender(user.id, sender)?;
        Ok(())
    }

    /// Remove a trusted sender.
    pub fn remove_trusted_sender(&self, user: &User, sender: &str) -> Result<bool> {
        self.store.remove_trusted_sender(user.id, sender)
    }

    /// Block the sender of a previously scanned message.
    pub fn block_sender(&self, user: &User, scan_id: i64) -> Result<Scan> {
        let scan = self.owned_scan(user, scan_id)?;
        self.store.set_scan_blocked(scan.id)?;
        self.store
            .get_scan(scan.id)?
            .ok_or_else(|| Error::not_found("Scan"))
    }

    /// A user's scan history, newest first.
    pub fn scan_history(
        &self,
        user: &User,
        limit: usize,
        level: Option<RiskLevel>,
    ) -> Result<Vec<Scan>> {
        self.store.list_scans(user.id, limit, level)
    }

    /// Fetch one of the user's scans.
    pub fn get_scan(&self, user: &User, scan_id: i64) -> Result<Scan> {
        self.owned_scan(user, scan_id)
    }

    /// Delete one of the user's scans.
    pub fn delete_scan(&self, user: &User, scan_id: i64) -> Result<()> {
        let scan = self.owned_scan(user, scan_id)?;
        self.store.delete_scan(scan.id)?;
        Ok(())
    }

    // ==================== Archive ====================

    /// Run the archiver on demand.
    pub async fn archive_run(&self, cutoff_days: i64) -> Result<ArchiveReport> {
        if cutoff_days < 0 {
            return Err(Error::validation("cutoff_days must not be negative"));
        }
        self.archiver.archive(cutoff_days).await
    }

    fn effective_settings(&self, user_id: i64) -> Result<UserSettings> {
        Ok(self
            .store
            .get_settings(user_id)?
            .unwrap_or_else(|| UserSettings::defaults_for(user_id)))
    }

    fn owned_scan(&self, user: &User, scan_id: i64) -> Result<Scan> {
        let scan = self
            .store
            .get_scan(scan_id)?
            .ok_or_else(|| Error::not_found("Scan"))?;
        if scan.user_id != user.id {
            return Err(Error::not_found("Scan"));
        }
        Ok(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NewUser;

    fn shield() -> ScamShield {
        ScamShield::builder(Settings::default())
            .with_store(Arc::new(SqliteStore::in_memory().unwrap()))
            .build()
            .unwrap()
    }

    fn seed_user(shield: &ScamShield, email: &str) -> User {
        shield
            .store()
            .create_user(&NewUser::new(email, "Test User").with_phone("+911234500000"))
            .unwrap()
    }

    fn text_request(content: &str, sender: &str) -> AnalyzeRequest {
        AnalyzeRequest {
            content: content.to_string(),
            content_type: ContentType::Auto,
            sender: sender.to_string(),
            platform: Platform::Sms,
        }
    }

    #[tokio::test]
    async fn test_empty_and_oversize_content_rejected() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        let err = shield
            .analyze_text(&user, text_request("   ", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let big = "x".repeat(MAX_ARTIFACT_BYTES + 1);
        let err = shield
            .analyze_text(&user, text_request(&big, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_low_scan_stores_no_body() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        let response = shield
            .analyze_text(&user, text_request("see you at dinner tonight", "MOM"))
            .await
            .unwrap();
        assert_eq!(response.verdict.level, RiskLevel::Low);
        assert!(!response.explanation.should_worry);

        let scan = shield.store().get_scan(response.scan_id).unwrap().unwrap();
        assert!(scan.message.is_none());
        assert_eq!(
            scan.message_preview.as_deref(),
            Some("see you at dinner tonight")
        );
    }

    #[tokio::test]
    async fn test_high_scan_persists_body_and_feeds_blacklist() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        let content =
            "URGENT: complete your kyc immediately at http://kyc-update.example to avoid account suspension.";
        let response = shield
            .analyze_text(&user, text_request(content, "+919876543210"))
            .await
            .unwrap();

        assert_eq!(response.verdict.level, RiskLevel::High);
        assert_eq!(response.verdict.scam_type.as_deref(), Some("KYC Scam"));
        assert!(response.explanation.should_worry);
        assert_eq!(
            response.quick_tip.as_deref(),
            Some("Banks never ask for OTP or password via SMS/call")
        );

        let scan = shield.store().get_scan(response.scan_id).unwrap().unwrap();
        assert_eq!(scan.message.as_deref(), Some(content));

        // The URL in the flagged message landed in the reputation store
        let hit = shield
            .check_reputation("kyc-update.example", EntityKind::Url)
            .await
            .unwrap();
        assert!(hit.is_blacklisted);
    }

    #[tokio::test]
    async fn test_trusted_sender_short_circuits() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");
        shield.add_trusted_sender(&user, "AD-HDFCBK").unwrap();

        let response = shield
            .analyze_text(
                &user,
                text_request("you won a lottery! claim your prize", "AD-HDFCBK"),
            )
            .await
            .unwrap();

        assert_eq!(response.verdict.level, RiskLevel::Low);
        assert!((response.verdict.confidence - 0.1).abs() < 1e-9);
        assert_eq!(response.verdict.reason, "Sender is marked as trusted");
    }

    #[tokio::test]
    async fn test_duplicate_trusted_sender_conflicts() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        shield.add_trusted_sender(&user, "MOM").unwrap();
        assert!(matches!(
            shield.add_trusted_sender(&user, "MOM"),
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_blocked_sender_forces_high() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        let first = shield
            .analyze_text(&user, text_request("share your otp now", "SCAMMER"))
            .await
            .unwrap();
        shield.block_sender(&user, first.scan_id).unwrap();

        let second = shield
            .analyze_text(&user, text_request("hello again, old friend", "SCAMMER"))
            .await
            .unwrap();
        assert_eq!(second.verdict.level, RiskLevel::High);
        assert_eq!(second.verdict.confidence, 1.0);
        assert_eq!(second.verdict.scam_type.as_deref(), Some("Blocked Sender"));
    }

    #[tokio::test]
    async fn test_high_scan_fans_out_to_guardian() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");
        let guardian = seed_user(&shield, "g@example.com");

        let otp = shield.generate_otp(&user).await.unwrap();
        shield
            .verify_otp(&guardian, "a@example.com", &otp.code)
            .await
            .unwrap();

        let response = shield
            .analyze_text(
                &user,
                text_request("URGENT: complete your kyc immediately", "+911112223334"),
            )
            .await
            .unwrap();
        assert_eq!(response.alerts_created, 1);

        let pending = shield.guardian_alerts_pending(&guardian).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].alert.scan_id, response.scan_id);

        let scan = shield.store().get_scan(response.scan_id).unwrap().unwrap();
        assert!(scan.guardian_alerted);
    }

    #[tokio::test]
    async fn test_report_and_check_round_trip() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        for expected in 1..=3u32 {
            let outcome = shield
                .report_entity(&user, "bit.ly/bad", EntityKind::Url, None)
                .await
                .unwrap();
            assert_eq!(outcome.reports_count, expected);
        }

        let hit = shield
            .check_reputation("https://bit.ly/bad/", EntityKind::Url)
            .await
            .unwrap();
        assert!(hit.is_blacklisted);
        assert_eq!(hit.reports_count, 3);
    }

    #[tokio::test]
    async fn test_image_without_vision_is_unknown() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        let response = shield
            .analyze_image(&user, &[1, 2, 3], "image/png", "Manual Check", Platform::Whatsapp)
            .await
            .unwrap();

        assert_eq!(response.verdict.level, RiskLevel::Unknown);
        assert_eq!(response.verdict.scam_type.as_deref(), Some("Service Busy"));

        let scan = shield.store().get_scan(response.scan_id).unwrap().unwrap();
        assert!(scan.message.is_none());
        assert_eq!(scan.message_preview.as_deref(), Some("[Image Analysis]"));

        let err = shield
            .analyze_image(&user, &[], "image/png", "x", Platform::Sms)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_history_and_ownership() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");
        let other = seed_user(&shield, "b@example.com");

        let response = shield
            .analyze_text(&user, text_request("hello there", ""))
            .await
            .unwrap();

        let history = shield.scan_history(&user, 10, None).unwrap();
        assert_eq!(history.len(), 1);

        // Another user cannot see or delete the scan
        assert!(matches!(
            shield.get_scan(&other, response.scan_id),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            shield.delete_scan(&other, response.scan_id),
            Err(Error::NotFound { .. })
        ));

        shield.delete_scan(&user, response.scan_id).unwrap();
        assert!(shield.scan_history(&user, 10, None).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_archive_verb() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        shield
            .analyze_text(&user, text_request("hello there", ""))
            .await
            .unwrap();

        // Nothing old enough yet
        let dir = tempfile::tempdir().unwrap();
        let shield = ScamShield::builder(
            Settings::default().with_archive_dir(dir.path().to_path_buf()),
        )
        .with_store(shield.store.clone())
        .build()
        .unwrap();

        let report = shield.archive_run(180).await.unwrap();
        assert_eq!(report.archived_count, 0);

        assert!(matches!(
            shield.archive_run(-1).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_export_verb() {
        let shield = shield();
        let user = seed_user(&shield, "a@example.com");

        shield
            .report_entity(
                &user,
                "scam.example",
                EntityKind::Domain,
                Some("known bad".to_string()),
            )
            .await
            .unwrap();

        let out = shield
            .export_training_data(&ExportOptions::default())
            .unwrap();
        assert_eq!(out.lines().count(), 1);
        // No consent was granted, so content is redacted
        assert!(out.contains(crate::export::REDACTED));
    }
}
