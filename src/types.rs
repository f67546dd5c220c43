//! Core domain types: risk levels, verdicts, artifacts, and content-type
//! detection.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Maximum accepted artifact size in bytes.
pub const MAX_ARTIFACT_BYTES: usize = 8 * 1024;

/// Risk verdict level, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Analysis could not be completed (e.g. all vision models busy)
    Unknown,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Promote by one band. Never demotes, never leaves High.
    pub fn promote(self) -> Self {
        match self {
            Self::Unknown | Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "UNKNOWN" => Ok(Self::Unknown),
            other => Err(crate::error::Error::validation(format!(
                "unknown risk level: {other}"
            ))),
        }
    }
}

/// Per-user threshold controlling guardian fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertThreshold {
    /// Alert only on HIGH risk
    High,
    /// Alert on HIGH or MEDIUM
    Medium,
    /// Alert on everything
    All,
}

impl AlertThreshold {
    /// Whether a scan at `level` meets this threshold.
    pub fn is_met_by(&self, level: RiskLevel) -> bool {
        match self {
            Self::High => level >= RiskLevel::High,
            Self::Medium => level >= RiskLevel::Medium,
            Self::All => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::All => "ALL",
        }
    }
}

impl FromStr for AlertThreshold {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "ALL" => Ok(Self::All),
            other => Err(crate::error::Error::validation(format!(
                "unknown alert threshold: {other}"
            ))),
        }
    }
}

/// Originating platform of an analyzed artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    #[default]
    Sms,
    Whatsapp,
    Telegram,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Whatsapp => "WHATSAPP",
            Self::Telegram => "TELEGRAM",
            Self::Other => "OTHER",
        }
    }
}

impl FromStr for Platform {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SMS" => Ok(Self::Sms),
            "WHATSAPP" => Ok(Self::Whatsapp),
            "TELEGRAM" => Ok(Self::Telegram),
            _ => Ok(Self::Other),
        }
    }
}

/// Detected content type of a submitted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Url,
    Phone,
    Domain,
    Image,
    /// Detect from content
    Auto,
}

static URL_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://|www\.)\S+$").expect("invalid regex")
});

static PHONE_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[\d\s\-()]{7,18}$").expect("invalid regex")
});

impl ContentType {
    /// Resolve `Auto` against the artifact text; other variants pass through.
    pub fn resolve(self, content: &str) -> ContentType {
        if self != ContentType::Auto {
            return self;
        }
        let trimmed = content.trim();
        if URL_CONTENT.is_match(trimmed) {
            ContentType::Url
        } else if PHONE_CONTENT.is_match(trimmed) {
            ContentType::Phone
        } else {
            ContentType::Text
        }
    }
}

/// An input submitted for analysis. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Raw text of the artifact
    pub content: String,
    /// Detected content type
    pub content_type: ContentType,
    /// Sender label as reported by the submitter (may be empty)
    pub sender: String,
    /// Platform the artifact arrived on
    pub platform: Platform,
}

impl Artifact {
    /// Build an artifact, resolving `Auto` content types.
    pub fn new(
        content: impl Into<String>,
        content_type: ContentType,
        sender: impl Into<String>,
        platform: Platform,
    ) -> Self {
        let content = content.into();
        let content_type = content_type.resolve(&content);
        Self {
            content,
            content_type,
            sender: sender.into(),
            platform,
        }
    }
}

/// The verdict produced by the detection pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// Risk band
    pub level: RiskLevel,
    /// Human-readable reason
    pub reason: String,
    /// Scam taxonomy label, if one applies
    pub scam_type: Option<String>,
    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
    /// Detected language tag, informational only
    pub language: Option<String>,
}

impl Verdict {
    pub fn new(level: RiskLevel, reason: impl Into<String>, confidence: f64) -> Self {
        Self {
            level,
            reason: reason.into(),
            scam_type: None,
            confidence,
            language: None,
        }
    }

    pub fn with_scam_type(mut self, scam_type: impl Into<String>) -> Self {
        self.scam_type = Some(scam_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Whether this verdict is severe enough to feed the reputation store.
    pub fn is_severe(&self) -> bool {
        self.level == RiskLevel::High && self.confidence >= 0.70
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::High > RiskLevel::Medium);
        assert!(RiskLevel::Medium > RiskLevel::Low);
        assert!(RiskLevel::Low > RiskLevel::Unknown);
    }

    #[test]
    fn test_risk_level_promote_never_demotes() {
        assert_eq!(RiskLevel::Low.promote(), RiskLevel::Medium);
        assert_eq!(RiskLevel::Medium.promote(), RiskLevel::High);
        assert_eq!(RiskLevel::High.promote(), RiskLevel::High);
    }

    #[test]
    fn test_risk_level_round_trip() {
        for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
            assert_eq!(level.as_str().parse::<RiskLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_threshold_ordering() {
        assert!(AlertThreshold::High.is_met_by(RiskLevel::High));
        assert!(!AlertThreshold::High.is_met_by(RiskLevel::Medium));
        assert!(AlertThreshold::Medium.is_met_by(RiskLevel::High));
        assert!(AlertThreshold::Medium.is_met_by(RiskLevel::Medium));
        assert!(!AlertThreshold::Medium.is_met_by(RiskLevel::Low));
        assert!(AlertThreshold::All.is_met_by(RiskLevel::Low));
    }

    #[test]
    fn test_content_type_detection() {
        assert_eq!(
            ContentType::Auto.resolve("https://bit.ly/win-prize"),
            ContentType::Url
        );
        assert_eq!(
            ContentType::Auto.resolve("+91 98765 43210"),
            ContentType::Phone
        );
        assert_eq!(
            ContentType::Auto.resolve("your account will be suspended"),
            ContentType::Text
        );
        // Explicit types pass through untouched
        assert_eq!(
            ContentType::Text.resolve("https://example.com"),
            ContentType::Text
        );
    }

    #[test]
    fn test_verdict_severity_gate() {
        let v = Verdict::new(RiskLevel::High, "known pattern", 0.85);
        assert!(v.is_severe());

        let v = Verdict::new(RiskLevel::High, "weak signal", 0.60);
        assert!(!v.is_severe());

        let v = Verdict::new(RiskLevel::Medium, "suspicious", 0.95);
        assert!(!v.is_severe());
    }
}
