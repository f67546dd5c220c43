//! Explanation engine: maps scam types to real-world consequences so users
//! understand why a verdict matters.

use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

/// Severity of the consequence, independent of the verdict band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Static consequence record for one scam type.
#[derive(Debug, Clone, Copy)]
struct Consequence {
    headline: &'static str,
    details: &'static [&'static str],
    action: &'static str,
    severity: Severity,
    potential_loss: &'static str,
}

/// User-facing explanation attached to a verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline_hi: Option<String>,
    pub details: Vec<String>,
    pub action: String,
    pub severity: Severity,
    pub potential_loss: String,
    pub should_worry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scam_type: Option<String>,
}

fn consequence(scam_type: &str) -> Consequence {
    match scam_type {
        "KYC Scam" => Consequence {
            headline: "Your bank account could be emptied",
            details: &[
                "Scammers will use your details to access your bank account",
                "They may take loans in your name",
                "Your credit score could be damaged",
            ],
            action: "Never share OTP, CVV, or passwords. Banks NEVER ask for these.",
            severity: Severity::Critical,
            potential_loss: "₹50,000 - ₹10,00,000",
        },
        "Lottery Scam" => Consequence {
            headline: "There is no prize - you'll lose money",
            details: &[
                "Fake lotteries ask for 'processing fees' upfront",
                "Once paid, they'll ask for more or disappear",
                "Your personal details will be sold to other scammers",
            ],
            action: "Real lotteries never ask winners to pay fees.",
            severity: Severity::High,
            potential_loss: "₹5,000 - ₹1,00,000",
        },
        "OTP Fraud" => Consequence {
            headline: "Your money will be stolen in seconds",
            details: &[
                "OTP gives direct access to your bank account",
                "Transactions happen instantly and are hard to reverse",
                "Multiple accounts linked to your phone are at risk",
            ],
            action: "NEVER share OTP with anyone. Not even bank officials.",
            severity: Severity::Critical,
            potential_loss: "Entire account balance",
        },
        "Job Scam" => Consequence {
            headline: "No real job exists - only losses",
            details: &[
                "Registration fees are never returned",
                "Your documents may be misused for identity theft",
                "Some scams lead to illegal activities in your name",
            ],
            action: "Legitimate companies never charge job seekers.",
            severity: Severity::High,
            potential_loss: "₹1,000 - ₹50,000",
        },
        "Loan Scam" => Consequence {
            headline: "You'll pay for a loan that never comes",
            details: &[
                "Processing fees are taken but loan never approved",
                "Your documents may be used for fraud",
                "Harassment calls may follow for months",
            ],
            action: "Apply for loans only through official bank channels.",
            severity: Severity::High,
            potential_loss: "₹2,000 - ₹25,000",
        },
        "Investment Scam" => Consequence {
            headline: "Guaranteed returns = Guaranteed fraud",
            details: &[
                "Ponzi schemes collapse taking all your money",
                "Crypto scams use complex terms to confuse",
                "Recovery is almost impossible",
            ],
            action: "No investment guarantees returns. If it sounds too good, it is.",
            severity: Severity::Critical,
            potential_loss: "₹10,000 - ₹50,00,000",
        },
        "Government Impersonation" => Consequence {
            headline: "Officials don't demand money over SMS",
            details: &[
                "Fake notices pressure you into instant payment",
                "Real departments communicate through official channels",
                "Shared documents can be used for identity theft",
            ],
            action: "Verify any notice on the department's official website.",
            severity: Severity::High,
            potential_loss: "₹5,000 - ₹5,00,000",
        },
        "Delivery Scam" => Consequence {
            headline: "No package exists - your data will be stolen",
            details: &[
                "Links lead to fake sites that steal payment info",
                "'Customs fees' are pocketed by scammers",
                "Malware may be installed on your device",
            ],
            action: "Track packages only on official courier websites.",
            severity: Severity::Medium,
            potential_loss: "₹500 - ₹5,000",
        },
        "Phishing" | "Verification Phishing" | "Suspicious Link" => Consequence {
            headline: "Your credentials will be stolen",
            details: &[
                "Fake websites capture your login details",
                "Hackers access your email, social media, bank",
                "Your identity can be used for crimes",
            ],
            action: "Always check the URL carefully. Look for https and correct spelling.",
            severity: Severity::High,
            potential_loss: "Varies - up to full accounts",
        },
        "Blocked Sender" => Consequence {
            headline: "This sender was previously blocked",
            details: &[
                "You or the system already marked this as harmful",
                "They may be trying new tactics",
                "Continue ignoring messages from this sender",
            ],
            action: "Keep this sender blocked. Report if harassment continues.",
            severity: Severity::Medium,
            potential_loss: "N/A - Already protected",
        },
        _ => Consequence {
            headline: "This message shows signs of a scam",
            details: &[
                "Scammers use urgency and fear to manipulate",
                "Any money sent is unlikely to be recovered",
                "Your personal details may be misused",
            ],
            action: "When in doubt, don't respond. Verify through official channels.",
            severity: Severity::Medium,
            potential_loss: "Varies",
        },
    }
}

/// Hindi headline lookup; unknown keys fall back to the English original.
fn hindi_headline(headline: &str) -> Option<&'static str> {
    match headline {
        "Your bank account could be emptied" => Some("आपका बैंक खाता खाली हो सकता है"),
        "There is no prize - you'll lose money" => {
            Some("कोई इनाम नहीं है - आप पैसे खो देंगे")
        }
        "Your money will be stolen in seconds" => {
            Some("सेकंडों में आपका पैसा चोरी हो जाएगा")
        }
        "This appears safe" => Some("यह सुरक्षित प्रतीत होता है"),
        _ => None,
    }
}

/// Generate an explanation for a verdict.
///
/// `language` is an informational hint; only `hi` currently triggers a
/// headline translation.
pub fn explanation(
    level: RiskLevel,
    scam_type: Option<&str>,
    language: &str,
) -> Explanation {
    if level == RiskLevel::Low {
        let headline = "This appears safe";
        let headline_hi = (language == "hi")
            .then(|| hindi_headline(headline).unwrap_or(headline).to_string());
        let headline = headline.to_string();
        return Explanation {
            headline,
            headline_hi,
            details: vec!["No scam indicators detected".to_string()],
            action: "Stay vigilant with all messages".to_string(),
            severity: Severity::Low,
            potential_loss: "None expected".to_string(),
            should_worry: false,
            scam_type: None,
        };
    }

    let record = consequence(scam_type.unwrap_or(""));
    let should_worry = level == RiskLevel::High || record.severity == Severity::Critical;

    let headline_hi = (language == "hi").then(|| {
        hindi_headline(record.headline)
            .unwrap_or(record.headline)
            .to_string()
    });

    Explanation {
        headline: record.headline.to_string(),
        headline_hi,
        details: record.details.iter().map(|d| d.to_string()).collect(),
        action: record.action.to_string(),
        severity: record.severity,
        potential_loss: record.potential_loss.to_string(),
        should_worry,
        scam_type: scam_type.map(|s| s.to_string()),
    }
}

/// One-liner advice for a scam type, used by the tips setting.
pub fn quick_tip(scam_type: Option<&str>) -> &'static str {
    match scam_type {
        Some("KYC Scam") => "Banks never ask for OTP or password via SMS/call",
        Some("Lottery Scam") => "You can't win a lottery you didn't enter",
        Some("OTP Fraud") => "OTP is like your password - never share it",
        Some("Job Scam") => "Real jobs pay you, not the other way around",
        Some("Investment Scam") => "If returns are guaranteed, it's a scam",
        Some("Phishing") | Some("Verification Phishing") => {
            "Check URLs carefully before entering credentials"
        }
        _ => "Verify before you trust",
    }
}
