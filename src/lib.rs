//! # scamshield-core
//!
//! A layered scam analysis and guardian alerting library for short text
//! artifacts (SMS bodies, pasted messages, URLs, phone numbers).
//!
//! ## Core Components
//!
//! - **Pipeline**: pattern matcher, reputation lookup, local and remote
//!   models, with confidence-based short-circuiting
//! - **Confidence**: weighted signal fusion, smoothing, band reconciliation
//! - **Reputation**: hash-indexed blacklist with a TTL cache and automatic
//!   entity extraction from flagged messages
//! - **Guardian**: OTP-based linking and severity-threshold alert fan-out
//! - **Archive**: write-then-delete cold-storage mover with pluggable
//!   backends
//!
//! ## Example
//!
//! ```rust,ignore
//! use scamshield_core::{AnalyzeRequest, ContentType, Platform, ScamShield, Settings};
//!
//! let shield = ScamShield::builder(Settings::from_env()?).build()?;
//! let response = shield
//!     .analyze_text(&user, AnalyzeRequest {
//!         content: "URGENT: complete your kyc immediately".into(),
//!         content_type: ContentType::Auto,
//!         sender: "+919876543210".into(),
//!         platform: Platform::Sms,
//!     })
//!     .await?;
//!
//! println!("{} ({:.2})", response.verdict.level, response.verdict.confidence);
//! ```

pub mod archive;
pub mod confidence;
pub mod config;
pub mod error;
pub mod explain;
pub mod export;
pub mod guardian;
pub mod kv;
pub mod llm;
pub mod pipeline;
pub mod reputation;
pub mod rules;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use archive::{ArchiveReport, Archiver, DEFAULT_CUTOFF_DAYS};
pub use confidence::{CalibratedScore, ConfidenceScorer, Factors, SignalSet, Weights};
pub use config::{Settings, StorageProvider};
pub use error::{Error, Result};
pub use explain::{explanation, quick_tip, Explanation, Severity};
pub use export::{ExportFormat, ExportOptions, REDACTED};
pub use guardian::{
    AlertTransport, AlertView, CallMeBotTransport, GuardianAlertService, GuardianContact,
    GuardianLinkService, NullTransport, OtpIssued, VerifyOutcome,
};
pub use kv::{KvCache, KvStats};
pub use llm::{
    ClientConfig, GeminiClient, GroqClient, LocalModel, LocalPrediction, ModelClient,
    ModelVerdict, ResponseCache,
};
pub use pipeline::{AnalysisOutcome, DecidedBy, ScamDetector};
pub use reputation::{
    extract_entities, normalize, value_hash, ReportOutcome, ReputationHit, ReputationService,
    TrainingContext,
};
pub use rules::{
    decide, is_regulated_sender, purpose_suffix, MatchReport, PatternMatcher, PatternOutcome,
    PurposeSuffix, Rule, RuleSet, ScamBucket, RULESET_VERSION,
};
pub use service::{AnalyzeRequest, AnalyzeResponse, ScamShield, ScamShieldBuilder};
pub use storage::{backend_from_settings, LocalStorage, S3Storage, StorageBackend};
pub use store::{
    AlertAction, AlertStatus, BlacklistEntry, BlacklistSource, EntityKind, GuardianAlert,
    GuardianLink, NewScan, NewUser, Scan, SqliteStore, TrustedSender, User, UserSettings,
};
pub use types::{
    AlertThreshold, Artifact, ContentType, Platform, RiskLevel, Verdict, MAX_ARTIFACT_BYTES,
};
