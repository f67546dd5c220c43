//! Persisted entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::types::{AlertThreshold, Platform, RiskLevel};

/// Blacklistable entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Url,
    Phone,
    Domain,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Phone => "phone",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(Self::Url),
            "phone" => Ok(Self::Phone),
            "domain" => Ok(Self::Domain),
            other => Err(Error::validation(format!("unknown entity kind: {other}"))),
        }
    }
}

/// Provenance of a blacklist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistSource {
    Community,
    System,
    Verified,
    AiAuto,
}

impl BlacklistSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Community => "community",
            Self::System => "system",
            Self::Verified => "verified",
            Self::AiAuto => "ai_auto",
        }
    }
}

impl FromStr for BlacklistSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "community" => Ok(Self::Community),
            "system" => Ok(Self::System),
            "verified" => Ok(Self::Verified),
            "ai_auto" => Ok(Self::AiAuto),
            other => Err(Error::validation(format!(
                "unknown blacklist source: {other}"
            ))),
        }
    }
}

/// Guardian alert lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Pending,
    Seen,
    Actioned,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Seen => "seen",
            Self::Actioned => "actioned",
            Self::Dismissed => "dismissed",
        }
    }

    /// Terminal states reject further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Actioned | Self::Dismissed)
    }
}

impl FromStr for AlertStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "seen" => Ok(Self::Seen),
            "actioned" => Ok(Self::Actioned),
            "dismissed" => Ok(Self::Dismissed),
            other => Err(Error::validation(format!("unknown alert status: {other}"))),
        }
    }
}

/// Action a guardian took on an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertAction {
    ContactedUser,
    BlockedSender,
    Dismissed,
    Other,
}

impl AlertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContactedUser => "contacted_user",
            Self::BlockedSender => "blocked_sender",
            Self::Dismissed => "dismissed",
            Self::Other => "other",
        }
    }
}

impl FromStr for AlertAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contacted_user" => Ok(Self::ContactedUser),
            "blocked_sender" => Ok(Self::BlockedSender),
            "dismissed" => Ok(Self::Dismissed),
            "other" => Ok(Self::Other),
            other => Err(Error::validation(format!("unknown alert action: {other}"))),
        }
    }
}

/// A registered end user, minimal shape used by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    /// Messaging handle used by the notification transport
    pub phone: Option<String>,
    /// Privacy gate for storing full bodies on blacklist entries
    pub consent_training_data: bool,
    pub consent_analytics: bool,
    pub consent_version: Option<String>,
    pub consent_granted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
}

impl NewUser {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Per-user preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: i64,
    pub language: String,
    pub auto_block_high_risk: bool,
    pub alert_threshold: AlertThreshold,
    pub receive_tips: bool,
}

impl UserSettings {
    pub fn defaults_for(user_id: i64) -> Self {
        Self {
            user_id,
            language: "en".to_string(),
            auto_block_high_risk: false,
            alert_threshold: AlertThreshold::High,
            receive_tips: true,
        }
    }
}

/// A sender this user never wants alerts about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedSender {
    pub id: i64,
    pub user_id: i64,
    pub sender: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted verdict record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scan {
    pub id: i64,
    pub user_id: i64,
    pub sender: String,
    /// Full body; null for LOW verdicts
    pub message: Option<String>,
    pub message_preview: Option<String>,
    pub platform: Platform,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub scam_type: Option<String>,
    pub confidence: f64,
    pub is_blocked: bool,
    pub guardian_alerted: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields required to persist a scan.
#[derive(Debug, Clone)]
pub struct NewScan {
    pub user_id: i64,
    pub sender: String,
    pub message: Option<String>,
    pub message_preview: Option<String>,
    pub platform: Platform,
    pub risk_level: RiskLevel,
    pub risk_reason: String,
    pub scam_type: Option<String>,
    pub confidence: f64,
    pub is_blocked: bool,
    /// Override for backfills and tests; defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

/// A known-bad normalized entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: i64,
    pub kind: EntityKind,
    pub value: String,
    /// Hex digest of the normalized value, the primary lookup key
    pub value_hash: String,
    pub source: BlacklistSource,
    pub reports_count: u32,
    pub is_verified: bool,
    pub first_reported_at: DateTime<Utc>,
    pub last_reported_at: DateTime<Utc>,
    // Training fields, populated only with submitter consent
    pub full_message: Option<String>,
    pub ai_reasoning: Option<String>,
    pub scam_type: Option<String>,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub features: Option<String>,
}

/// Fields required to insert a blacklist entry.
#[derive(Debug, Clone, Default)]
pub struct NewBlacklistEntry {
    pub value: String,
    pub value_hash: String,
    pub source: Option<BlacklistSource>,
    pub is_verified: bool,
    pub full_message: Option<String>,
    pub ai_reasoning: Option<String>,
    pub scam_type: Option<String>,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub features: Option<String>,
}

/// An active protection relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianLink {
    pub id: i64,
    /// The protected user
    pub user_id: i64,
    /// The guardian user
    pub guardian_id: i64,
    pub status: String,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// An alert created at fan-out time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuardianAlert {
    pub id: i64,
    pub guardian_id: i64,
    /// The protected user the alert is about
    pub user_id: i64,
    pub scan_id: i64,
    pub status: AlertStatus,
    pub action: Option<AlertAction>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub seen_at: Option<DateTime<Utc>>,
    pub actioned_at: Option<DateTime<Utc>>,
}
