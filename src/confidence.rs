//! Confidence calibration: weighted signal fusion, smoothing, and
//! level/confidence reconciliation.

use serde::{Deserialize, Serialize};

use crate::types::RiskLevel;

/// Weights applied to each signal during composition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Weights {
    pub pattern: f64,
    pub model: f64,
    pub reputation: f64,
    pub reputation_verified: f64,
    pub context: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            pattern: 0.30,
            model: 0.35,
            reputation: 0.15,
            reputation_verified: 0.20,
            context: 0.10,
        }
    }
}

/// Band thresholds mapping a confidence to a risk level.
pub const HIGH_THRESHOLD: f64 = 0.75;
pub const MEDIUM_THRESHOLD: f64 = 0.45;

/// Input signals for one composition.
#[derive(Debug, Clone, Default)]
pub struct SignalSet {
    /// Pattern-stage confidence in [0, 1]
    pub pattern_confidence: f64,
    /// Model (local or remote) confidence in [0, 1]
    pub model_confidence: f64,
    /// Reputation boost contributed by a blacklist hit
    pub reputation_boost: f64,
    /// Whether the reputation hit was a verified entry
    pub reputation_verified: bool,
    /// Message creates urgency
    pub has_urgency: bool,
    /// Message carries links
    pub has_links: bool,
    /// Message length in characters
    pub message_length: usize,
    /// Sender is on the submitter's block list
    pub sender_blocked: bool,
    /// Sender is on the submitter's trusted list
    pub sender_trusted: bool,
}

/// Per-factor breakdown surfaced alongside the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    pub pattern_match: f64,
    pub model_confidence: f64,
    pub reputation: f64,
    pub context: f64,
}

/// Result of a calibrated composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedScore {
    pub confidence: f64,
    pub level: RiskLevel,
    pub factors: Factors,
    pub explanation: String,
}

/// Weighted-composition confidence scorer.
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScorer {
    weights: Weights,
}

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: Weights) -> Self {
        Self { weights }
    }

    /// Compose all signals into a calibrated confidence and level.
    ///
    /// The blocked/trusted overrides short-circuit the composition.
    pub fn calculate(&self, signals: &SignalSet) -> CalibratedScore {
        if signals.sender_blocked {
            return CalibratedScore {
                confidence: 1.0,
                level: RiskLevel::High,
                factors: Factors::default(),
                explanation: "Sender is on block list".to_string(),
            };
        }

        if signals.sender_trusted {
            return CalibratedScore {
                confidence: 0.1,
                level: RiskLevel::Low,
                factors: Factors::default(),
                explanation: "Sender is marked as trusted".to_string(),
            };
        }

        let factors = Factors {
            pattern_match: signals.pattern_confidence.clamp(0.0, 1.0),
            model_confidence: signals.model_confidence.clamp(0.0, 1.0),
            reputation: signals.reputation_boost.clamp(0.0, 1.0),
            context: context_score(signals),
        };

        let reputation_weight = if signals.reputation_verified {
            self.weights.reputation_verified
        } else {
            self.weights.reputation
        };

        let raw = self.weights.pattern * factors.pattern_match
            + self.weights.model * factors.model_confidence
            + reputation_weight * factors.reputation
            + self.weights.context * factors.context;

        let confidence = smooth(raw);
        let level = level_for(confidence);
        let explanation = explain_factors(&factors, level);

        CalibratedScore {
            confidence,
            level,
            factors,
            explanation,
        }
    }
}

/// Context signal: urgency, links, and anomalous length.
fn context_score(signals: &SignalSet) -> f64 {
    let mut score: f64 = 0.0;
    if signals.has_urgency {
        score += 0.3;
    }
    if signals.has_links {
        score += 0.2;
    }
    // Very short and very long messages are both anomalous
    if signals.message_length < 50 || signals.message_length > 500 {
        score += 0.1;
    }
    score.min(1.0)
}

/// Piecewise smoothing: lift near-zero noise, compress near-certainty.
pub fn smooth(raw: f64) -> f64 {
    let raw = raw.clamp(0.0, 1.0);
    if raw <= 0.1 {
        raw * 1.5
    } else if raw >= 0.9 {
        0.85 + (raw - 0.9) * 1.5
    } else {
        raw
    }
}

/// Map a confidence to its risk band.
pub fn level_for(confidence: f64) -> RiskLevel {
    if confidence >= HIGH_THRESHOLD {
        RiskLevel::High
    } else if confidence >= MEDIUM_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Inclusive confidence band for a level.
pub fn band_for(level: RiskLevel) -> (f64, f64) {
    match level {
        RiskLevel::High => (HIGH_THRESHOLD, 1.0),
        RiskLevel::Medium => (MEDIUM_THRESHOLD, HIGH_THRESHOLD - 0.01),
        RiskLevel::Low | RiskLevel::Unknown => (0.0, MEDIUM_THRESHOLD - 0.01),
    }
}

/// Clamp a confidence into the band of an already-chosen level.
///
/// Returns the (possibly adjusted) confidence and whether adjustment
/// happened.
pub fn reconcile(level: RiskLevel, confidence: f64) -> (f64, bool) {
    let (lo, hi) = band_for(level);
    if confidence < lo {
        (lo, true)
    } else if confidence > hi {
        (hi, true)
    } else {
        (confidence, false)
    }
}

fn explain_factors(factors: &Factors, level: RiskLevel) -> String {
    let mut parts = Vec::new();

    if factors.pattern_match > 0.5 {
        parts.push("matches known scam patterns");
    }
    if factors.model_confidence > 0.6 {
        parts.push("model detected suspicious content");
    }
    if factors.reputation > 0.0 {
        parts.push("sender or link has negative reputation");
    }
    if factors.context > 0.3 {
        parts.push("message creates urgency");
    }

    if parts.is_empty() {
        if level == RiskLevel::Low {
            "No significant risk indicators found".to_string()
        } else {
            "Multiple minor risk factors detected".to_string()
        }
    } else {
        format!("Detected: {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_sender_overrides() {
        let scorer = ConfidenceScorer::new();
        let score = scorer.calculate(&SignalSet {
            sender_blocked: true,
            pattern_confidence: 0.1,
            ..Default::default()
        });

        assert_eq!(score.level, RiskLevel::High);
        assert_eq!(score.confidence, 1.0);
        assert_eq!(score.explanation, "Sender is on block list");
    }

    #[test]
    fn test_trusted_sender_overrides() {
        let scorer = ConfidenceScorer::new();
        let score = scorer.calculate(&SignalSet {
            sender_trusted: true,
            pattern_confidence: 0.9,
            model_confidence: 0.9,
            ..Default::default()
        });

        assert_eq!(score.level, RiskLevel::Low);
        assert!((score.confidence - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_all_signals_compose_to_high() {
        let scorer = ConfidenceScorer::new();
        let score = scorer.calculate(&SignalSet {
            pattern_confidence: 0.99,
            model_confidence: 1.0,
            reputation_boost: 0.3,
            reputation_verified: true,
            has_urgency: true,
            has_links: true,
            message_length: 40,
            ..Default::default()
        });

        assert_eq!(score.level, RiskLevel::High);
        assert!(score.confidence >= HIGH_THRESHOLD);
        assert!(score.explanation.contains("scam patterns"));
    }

    #[test]
    fn test_quiet_message_is_low() {
        let scorer = ConfidenceScorer::new();
        let score = scorer.calculate(&SignalSet {
            pattern_confidence: 0.2,
            message_length: 120,
            ..Default::default()
        });

        assert_eq!(score.level, RiskLevel::Low);
        assert_eq!(score.explanation, "No significant risk indicators found");
    }

    #[test]
    fn test_smoothing_lifts_and_compresses() {
        assert!((smooth(0.05) - 0.075).abs() < 1e-9);
        assert!((smooth(0.5) - 0.5).abs() < 1e-9);
        assert!((smooth(0.95) - 0.925).abs() < 1e-9);
        // Never exceeds 1.0
        assert!(smooth(1.0) <= 1.0);
    }

    #[test]
    fn test_smoothing_stays_bounded() {
        for i in 0..=100 {
            let value = smooth(i as f64 / 100.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_reconcile_clamps_to_band() {
        let (conf, adjusted) = reconcile(RiskLevel::High, 0.5);
        assert_eq!(conf, HIGH_THRESHOLD);
        assert!(adjusted);

        let (conf, adjusted) = reconcile(RiskLevel::Low, 0.9);
        assert!(conf < MEDIUM_THRESHOLD);
        assert!(adjusted);

        let (conf, adjusted) = reconcile(RiskLevel::Medium, 0.6);
        assert_eq!(conf, 0.6);
        assert!(!adjusted);
    }

    #[test]
    fn test_band_edges_agree_with_level_for() {
        for level in [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low] {
            let (lo, hi) = band_for(level);
            assert_eq!(level_for(lo), level);
            assert_eq!(level_for(hi), level);
        }
    }
}
