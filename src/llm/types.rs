//! Remote-model wire types and response parsing.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{RiskLevel, Verdict};

/// System prompt declaring the scam taxonomy. The model must answer with a
/// bare JSON object; fenced responses are tolerated and stripped.
pub const SYSTEM_PROMPT: &str = "\
You are a scam detection expert specialized in Indian SMS/WhatsApp scams.

Analyze the message and classify as:
- HIGH: Definite scam (phishing, fraud, money requests, fake prizes)
- MEDIUM: Suspicious (urgency tactics, unknown links, unusual requests)
- LOW: Likely legitimate

Common scam patterns:
1. KYC update urgency
2. Lottery/prize claims
3. OTP sharing requests
4. Job offers requiring payment
5. Loan pre-approval scams
6. Investment schemes promising high returns
7. Bank/government impersonation
8. Fake delivery notifications
9. Shortened or deceptive links
10. Direct money requests

Return ONLY valid JSON (no markdown):
{\"risk_level\": \"HIGH/MEDIUM/LOW\", \"reason\": \"brief explanation\", \
\"scam_type\": \"type or null\", \"confidence\": 0.0-1.0, \
\"original_language\": \"ISO tag\"}";

/// Structured verdict returned by a remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVerdict {
    pub risk_level: RiskLevel,
    pub reason: String,
    #[serde(default)]
    pub scam_type: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl ModelVerdict {
    /// Parse a raw model response, tolerating fenced code blocks.
    pub fn parse(raw: &str) -> Result<Self> {
        let body = strip_code_fences(raw);
        let verdict: ModelVerdict = serde_json::from_str(body)?;
        Ok(verdict)
    }

    /// Safer default emitted when the model returns unparseable output.
    pub fn inconclusive() -> Self {
        Self {
            risk_level: RiskLevel::Medium,
            reason: "Model analysis inconclusive".to_string(),
            scam_type: None,
            confidence: 0.5,
            original_language: None,
        }
    }
}

impl From<ModelVerdict> for Verdict {
    fn from(m: ModelVerdict) -> Self {
        Verdict {
            level: m.risk_level,
            reason: m.reason,
            scam_type: m.scam_type,
            confidence: m.confidence.clamp(0.0, 1.0),
            language: m.original_language,
        }
    }
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the optional language tag on the opening fence line
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(rest.trim())
}
