//! Scam pattern ruleset and TRAI regulated-sender policy.
//!
//! The rule base is a typed table of compiled regular expressions partitioned
//! into HIGH and MEDIUM buckets. Matching is a single pass that produces all
//! matches; the decision logic that turns matches into a verdict is separate,
//! so rulesets can be versioned and swapped without touching the decision
//! rules.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::types::{RiskLevel, Verdict};

/// Ruleset revision, bumped whenever the pattern table changes.
pub const RULESET_VERSION: &str = "2026.03";

/// Scam taxonomy bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScamBucket {
    Kyc,
    Lottery,
    OtpTheft,
    Job,
    Loan,
    Investment,
    GovernmentImpersonation,
    Delivery,
    UrlShortener,
    Urgency,
    MoneyRequest,
    Verification,
}

impl ScamBucket {
    /// Human-facing label, shared with the explanation engine.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Kyc => "KYC Scam",
            Self::Lottery => "Lottery Scam",
            Self::OtpTheft => "OTP Fraud",
            Self::Job => "Job Scam",
            Self::Loan => "Loan Scam",
            Self::Investment => "Investment Scam",
            Self::GovernmentImpersonation => "Government Impersonation",
            Self::Delivery => "Delivery Scam",
            Self::UrlShortener => "Suspicious Link",
            Self::Urgency => "Urgency Tactics",
            Self::MoneyRequest => "Money Request",
            Self::Verification => "Verification Phishing",
        }
    }

    /// Critical buckets survive the TRAI regulated-sender downgrade.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Kyc | Self::OtpTheft)
    }
}

/// One indicator rule: a compiled pattern assigned to a bucket and band.
#[derive(Debug)]
pub struct Rule {
    pub bucket: ScamBucket,
    pub level: RiskLevel,
    pattern: Regex,
}

impl Rule {
    fn new(bucket: ScamBucket, level: RiskLevel, pattern: &str) -> Self {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .expect("invalid regex");
        Self {
            bucket,
            level,
            pattern,
        }
    }

    pub fn is_match(&self, message: &str) -> bool {
        self.pattern.is_match(message)
    }
}

/// Versioned set of indicator rules.
#[derive(Debug)]
pub struct RuleSet {
    pub version: &'static str,
    rules: Vec<Rule>,
}

static BUILTIN_RULES: LazyLock<RuleSet> = LazyLock::new(|| {
    use RiskLevel::{High, Medium};
    use ScamBucket::*;

    // English and Romanised-Indic variants only. Native-script messages fall
    // through to the model stages.
    let rules = vec![
        // HIGH bucket
        Rule::new(Kyc, High, r"kyc\s+(update|expire|block|suspend|verif|immediate)"),
        Rule::new(Kyc, High, r"(complete|update)\s+(your\s+)?kyc"),
        Rule::new(Kyc, High, r"pan\s+card\s+link\s+urgent"),
        Rule::new(Kyc, High, r"aadhaar\s+update\s+urgent"),
        Rule::new(Kyc, High, r"account\s+(block|suspend|close|frozen)"),
        Rule::new(OtpTheft, High, r"(send|share|tell)\s+(me\s+)?(your\s+|the\s+)?otp"),
        Rule::new(OtpTheft, High, r"otp\s+(is\s+)?(needed|required)\s+to"),
        Rule::new(Lottery, High, r"won\s+(a\s+)?(lottery|prize|rs\.?|lakh|crore)"),
        Rule::new(Lottery, High, r"claim\s+(your\s+)?(prize|reward|money)"),
        Rule::new(Job, High, r"(job|work)\s+offer.*(payment|fee|deposit)"),
        Rule::new(Job, High, r"earn\s+(rs\.?\s*)?\d+.*(per\s+day|daily|weekly)"),
        Rule::new(Loan, High, r"loan\s+approved\s+instantly"),
        Rule::new(Loan, High, r"pre.?approved\s+loan"),
        Rule::new(Investment, High, r"(guaranteed|assured)\s+returns?"),
        Rule::new(Investment, High, r"double\s+your\s+(money|investment)"),
        Rule::new(
            GovernmentImpersonation,
            High,
            r"(income\s+tax|customs|police|cbi|rbi)\s+(notice|warrant|penalty|refund)",
        ),
        Rule::new(
            MoneyRequest,
            High,
            r"(send|transfer)\s+(money|rs\.?|amount).*(urgent|immediately|now)",
        ),
        // MEDIUM bucket
        Rule::new(UrlShortener, Medium, r"bit\.ly|tinyurl|short\.io|t\.co/"),
        Rule::new(Urgency, Medium, r"act\s+now"),
        Rule::new(Urgency, Medium, r"urgent\s+action"),
        Rule::new(Urgency, Medium, r"limited\s+time\s+offer"),
        Rule::new(Urgency, Medium, r"within\s+24\s+hours"),
        Rule::new(Verification, Medium, r"verify\s+(now|immediately|your\s+account)"),
        Rule::new(Verification, Medium, r"click\s+(here|this\s+link|below|now)"),
        Rule::new(Lottery, Medium, r"congratulations"),
        Rule::new(Lottery, Medium, r"selected\s+as\s+(a\s+)?winner"),
        Rule::new(Delivery, Medium, r"(package|parcel|shipment)\s+(held|pending|on\s+hold)"),
        Rule::new(Delivery, Medium, r"customs\s+(fee|charge|duty)"),
    ];

    RuleSet {
        version: RULESET_VERSION,
        rules,
    }
});

impl RuleSet {
    /// The compiled built-in ruleset.
    pub fn builtin() -> &'static RuleSet {
        &BUILTIN_RULES
    }

    /// Match a message against every rule, producing all hits in table order.
    pub fn scan(&self, message: &str) -> MatchReport {
        let mut report = MatchReport::default();
        for rule in &self.rules {
            if rule.is_match(message) {
                match rule.level {
                    RiskLevel::High => report.high.push(rule.bucket),
                    _ => report.medium.push(rule.bucket),
                }
            }
        }
        report
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// All rule hits for one message, in table order.
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    pub high: Vec<ScamBucket>,
    pub medium: Vec<ScamBucket>,
}

impl MatchReport {
    /// Whether any critical-scam bucket matched at HIGH.
    pub fn has_critical(&self) -> bool {
        self.high.iter().any(|b| b.is_critical())
    }

    /// Whether an urgency indicator matched at any band.
    pub fn has_urgency(&self) -> bool {
        self.medium.contains(&ScamBucket::Urgency) || !self.high.is_empty()
    }
}

/// TRAI purpose suffix carried by regulated bulk-sender traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurposeSuffix {
    Promotional,
    Transactional,
    Service,
}

// Registered bulk-sender headers look like "AD-HDFCBK": a two-letter access
// provider/region prefix, then a short alphanumeric entity code, optionally a
// purpose segment.
static TRAI_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"^[A-Z]{2}-[A-Z0-9]{2,9}(-[PTSG])?$")
        .case_insensitive(true)
        .build()
        .expect("invalid regex")
});

static MESSAGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\s*([PTSpts])$").expect("invalid regex"));

/// Whether the sender matches the regulated-header format.
pub fn is_regulated_sender(sender: &str) -> bool {
    TRAI_HEADER.is_match(sender.trim())
}

/// Extract the purpose suffix from the header or the message tail.
pub fn purpose_suffix(message: &str, sender: &str) -> Option<PurposeSuffix> {
    if !is_regulated_sender(sender) {
        return None;
    }

    let from_header = sender
        .trim()
        .rsplit('-')
        .next()
        .filter(|seg| seg.len() == 1)
        .and_then(|seg| suffix_of(seg.chars().next().unwrap()));

    let from_message = MESSAGE_SUFFIX
        .captures(message.trim_end())
        .and_then(|c| suffix_of(c[1].chars().next().unwrap()));

    from_header.or(from_message)
}

fn suffix_of(c: char) -> Option<PurposeSuffix> {
    match c.to_ascii_uppercase() {
        'P' => Some(PurposeSuffix::Promotional),
        'T' => Some(PurposeSuffix::Transactional),
        'S' => Some(PurposeSuffix::Service),
        _ => None,
    }
}

/// Pattern-stage outcome: the decided verdict plus the raw match report for
/// downstream signals.
#[derive(Debug, Clone)]
pub struct PatternOutcome {
    pub verdict: Verdict,
    pub report: MatchReport,
    /// Set when the TRAI regulated-sender exception rewrote the verdict
    pub downgraded: bool,
}

/// Deterministic first-stage matcher.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: &'static RuleSet,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self {
            rules: RuleSet::builtin(),
        }
    }
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a message and sender against the ruleset and TRAI policy.
    pub fn evaluate(&self, message: &str, sender: &str) -> PatternOutcome {
        let report = self.rules.scan(message);
        let verdict = decide(&report);

        // Regulated bulk senders carrying a purpose suffix are downgraded
        // unless a critical-scam bucket matched.
        if let Some(suffix) = purpose_suffix(message, sender) {
            if !report.has_critical() {
                let scam_type = match suffix {
                    PurposeSuffix::Promotional => "Marketing/Spam",
                    PurposeSuffix::Transactional | PurposeSuffix::Service => "Transactional/Info",
                };
                let verdict = Verdict::new(
                    RiskLevel::Low,
                    "Registered bulk sender with declared purpose",
                    0.9,
                )
                .with_scam_type(scam_type);
                return PatternOutcome {
                    verdict,
                    report,
                    downgraded: true,
                };
            }
        }

        PatternOutcome {
            verdict,
            report,
            downgraded: false,
        }
    }
}

/// Turn a match report into a verdict. Pure decision logic, separate from
/// matching.
pub fn decide(report: &MatchReport) -> Verdict {
    if !report.high.is_empty() {
        let confidence = (0.85 + 0.03 * report.high.len() as f64).min(0.99);
        return Verdict::new(
            RiskLevel::High,
            "Message contains known scam patterns",
            confidence,
        )
        .with_scam_type(report.high[0].label());
    }

    match report.medium.len() {
        0 => Verdict::new(RiskLevel::Low, "No suspicious patterns detected", 0.7),
        1 | 2 => Verdict::new(
            RiskLevel::Medium,
            "Message contains suspicious patterns",
            0.5 + 0.1 * report.medium.len() as f64,
        ),
        _ => Verdict::new(
            RiskLevel::High,
            "Multiple suspicious indicators detected",
            0.75,
        )
        .with_scam_type("Multiple Indicators"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kyc_message_is_high() {
        let matcher = PatternMatcher::new();
        let outcome = matcher.evaluate(
            "URGENT: complete your kyc immediately to avoid account suspension.",
            "+919876543210",
        );

        assert_eq!(outcome.verdict.level, RiskLevel::High);
        assert_eq!(outcome.verdict.scam_type.as_deref(), Some("KYC Scam"));
        assert!(outcome.verdict.confidence >= 0.85);
        assert!(!outcome.downgraded);
    }

    #[test]
    fn test_clean_message_is_low() {
        let matcher = PatternMatcher::new();
        let outcome = matcher.evaluate("See you at dinner tonight", "");

        assert_eq!(outcome.verdict.level, RiskLevel::Low);
        assert_eq!(outcome.verdict.confidence, 0.7);
        assert!(outcome.verdict.scam_type.is_none());
    }

    #[test]
    fn test_medium_indicators_accumulate() {
        let matcher = PatternMatcher::new();

        let one = matcher.evaluate("please verify your account", "");
        assert_eq!(one.verdict.level, RiskLevel::Medium);
        assert!((one.verdict.confidence - 0.6).abs() < 1e-9);

        let three = matcher.evaluate(
            "Congratulations! Act now, limited time offer at bit.ly/x",
            "",
        );
        assert_eq!(three.verdict.level, RiskLevel::High);
        assert_eq!(
            three.verdict.scam_type.as_deref(),
            Some("Multiple Indicators")
        );
        assert!((three.verdict.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_high_confidence_scales_with_matches() {
        let matcher = PatternMatcher::new();
        let outcome = matcher.evaluate("you won a lottery! claim your prize today", "");

        assert_eq!(outcome.verdict.level, RiskLevel::High);
        assert_eq!(outcome.verdict.scam_type.as_deref(), Some("Lottery Scam"));
        // Two HIGH rule hits
        assert!((outcome.verdict.confidence - 0.91).abs() < 1e-9);
    }

    #[test]
    fn test_trai_promotional_downgrade() {
        let matcher = PatternMatcher::new();
        let outcome = matcher.evaluate(
            "Dear customer, your pre-approved loan of 500000 is ready. Apply now. -P",
            "AD-HDFCBK",
        );

        assert_eq!(outcome.verdict.level, RiskLevel::Low);
        assert_eq!(outcome.verdict.scam_type.as_deref(), Some("Marketing/Spam"));
        assert!(outcome.downgraded);
    }

    #[test]
    fn test_trai_downgrade_spares_critical_buckets() {
        let matcher = PatternMatcher::new();
        let outcome = matcher.evaluate(
            "Please share your otp to complete verification -T",
            "VM-FAKEBK",
        );

        assert_eq!(outcome.verdict.level, RiskLevel::High);
        assert_eq!(outcome.verdict.scam_type.as_deref(), Some("OTP Fraud"));
        assert!(!outcome.downgraded);
    }

    #[test]
    fn test_trai_suffix_in_header() {
        assert_eq!(
            purpose_suffix("Your bill is ready", "AD-HDFCBK-T"),
            Some(PurposeSuffix::Transactional)
        );
        assert_eq!(
            purpose_suffix("Your bill is ready -S", "JM-POWERC"),
            Some(PurposeSuffix::Service)
        );
        // Unregulated senders never produce a suffix
        assert_eq!(purpose_suffix("Offer inside -P", "+919876543210"), None);
    }

    #[test]
    fn test_regulated_header_shape() {
        assert!(is_regulated_sender("AD-HDFCBK"));
        assert!(is_regulated_sender("VM-AIRTEL"));
        assert!(!is_regulated_sender("+919876543210"));
        assert!(!is_regulated_sender("FRIEND"));
    }

    #[test]
    fn test_native_script_falls_through() {
        let matcher = PatternMatcher::new();
        // Devanagari KYC bait does not match the Romanised ruleset
        let outcome = matcher.evaluate("अपना केवाईसी तुरंत अपडेट करें", "");
        assert_eq!(outcome.verdict.level, RiskLevel::Low);
    }

    #[test]
    fn test_ruleset_versioned() {
        assert_eq!(RuleSet::builtin().version, RULESET_VERSION);
        assert!(!RuleSet::builtin().is_empty());
    }
}
