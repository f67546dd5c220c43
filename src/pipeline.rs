//! Layered detection pipeline.
//!
//! Stages run in sequence with confidence-based short-circuiting:
//!
//! 1. Pattern matcher (deterministic regex ruleset + TRAI policy)
//! 2. Reputation lookup (hashed entity, cache then store)
//! 3. Local model, when one is configured
//! 4. Remote model, when a provider is configured
//! 5. Confidence fusion and level reconciliation
//!
//! Stage errors never propagate: each stage has a defined fallback and the
//! pipeline always returns a verdict.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::confidence::{reconcile, ConfidenceScorer, SignalSet};
use crate::llm::{LocalModel, ModelClient, ModelVerdict, ResponseCache};
use crate::reputation::{extract_entities, ReputationHit, ReputationService};
use crate::rules::{PatternMatcher, PatternOutcome};
use crate::store::EntityKind;
use crate::types::{RiskLevel, Verdict};

/// Which stage produced the final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecidedBy {
    /// Pattern stage short-circuit
    Pattern,
    /// Verified reputation hit forced the verdict
    Reputation,
    /// Local model short-circuit
    LocalModel,
    /// Full fusion of pattern and remote signals
    Fusion,
    /// Remote stage unavailable; pattern verdict carried through
    Fallback,
}

/// Pipeline result: the verdict plus the signals behind it.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub verdict: Verdict,
    pub decided_by: DecidedBy,
    pub reputation: Option<ReputationHit>,
    /// Whether reconciliation clamped the confidence into the level's band
    pub adjusted: bool,
}

/// The layered classifier.
pub struct ScamDetector {
    matcher: PatternMatcher,
    scorer: ConfidenceScorer,
    reputation: Arc<ReputationService>,
    local: Option<Arc<dyn LocalModel>>,
    remote: Option<Arc<dyn ModelClient>>,
    vision: Option<Arc<dyn ModelClient>>,
    response_cache: ResponseCache,
}

impl ScamDetector {
    pub fn new(reputation: Arc<ReputationService>) -> Self {
        Self {
            matcher: PatternMatcher::new(),
            scorer: ConfidenceScorer::new(),
            reputation,
            local: None,
            remote: None,
            vision: None,
            response_cache: ResponseCache::default(),
        }
    }

    pub fn with_local_model(mut self, model: Arc<dyn LocalModel>) -> Self {
        self.local = Some(model);
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

    /// Analyze a text artifact. Never fails; stage errors degrade to the
    /// strongest verdict available.
    pub async fn analyze(&self, message: &str, sender: &str) -> AnalysisOutcome {
        let pattern = self.matcher.evaluate(message, sender);
        let p = &pattern.verdict;

        // Stage 1 gate: certain enough to skip the rest of the pipeline
        if (p.level == RiskLevel::High && p.confidence >= 0.85)
            || (p.level == RiskLevel::Low && p.confidence >= 0.90)
        {
            debug!(level = %p.level, "pattern stage short-circuit");
            return AnalysisOutcome {
                verdict: p.clone(),
                decided_by: DecidedBy::Pattern,
                reputation: None,
                adjusted: false,
            };
        }

        // Stage 2: reputation. Lookup failures degrade to "no hit".
        let reputation = match self.reputation.scan_message(message).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "reputation stage unavailable");
                None
            }
        };

        let mut boosted = p.clone();
        if let Some(hit) = &reputation {
            if hit.is_verified {
                // Verified entries force HIGH regardless of other signals
                let (confidence, adjusted) =
                    reconcile(RiskLevel::High, boosted.confidence + hit.risk_boost);
                let verdict = Verdict::new(
                    RiskLevel::High,
                    "Entity found in verified scam reports",
                    confidence,
                )
                .with_scam_type(
                    hit.scam_type.clone().unwrap_or_else(|| "Phishing".to_string()),
                );
                return AnalysisOutcome {
                    verdict,
                    decided_by: DecidedBy::Reputation,
                    reputation,
                    adjusted,
                };
            }
            // Unverified hits boost but never lower
            boosted.level = match boosted.level {
                RiskLevel::Low | RiskLevel::Unknown => RiskLevel::Medium,
                other => other,
            };
            boosted.confidence = (boosted.confidence + hit.risk_boost).min(0.99);
        }

        // Stage 3: local model
        if let Some(local) = &self.local {
            if let Some(prediction) = local.predict(message) {
                if prediction.confidence > 0.90 {
                    debug!(model = local.name(), "local model short-circuit");
                    let mut verdict = Verdict::new(
                        prediction.level,
                        "On-device model classification",
                        prediction.confidence,
                    );
                    verdict.scam_type = prediction.scam_type;
                    return AnalysisOutcome {
                        verdict,
                        decided_by: DecidedBy::LocalModel,
                        reputation,
                        adjusted: false,
                    };
                }
            }
        }

        // Stage 4: remote model, deduplicated through the response cache
        let remote_verdict = match &self.remote {
            None => None,
            Some(client) => match self.response_cache.get(message, sender) {
                Some(cached) => Some(cached),
                None => match client.classify(message, sender).await {
                    Ok(verdict) => {
                        self.response_cache.insert(message, sender, verdict.clone());
                        Some(verdict)
                    }
                    Err(e) => {
                        warn!(provider = client.provider(), error = %e, "remote model failed");
                        None
                    }
                },
            },
        };

        match remote_verdict {
            Some(remote) => self.fuse(message, &pattern, boosted, remote, reputation),
            None => AnalysisOutcome {
                verdict: boosted,
                decided_by: DecidedBy::Fallback,
                reputation,
                adjusted: false,
            },
        }
    }

    /// Fusion of the (possibly reputation-boosted) pattern verdict with the
    /// remote model verdict.
    fn fuse(
        &self,
        message: &str,
        pattern: &PatternOutcome,
        boosted: Verdict,
        remote: ModelVerdict,
        reputation: Option<ReputationHit>,
    ) -> AnalysisOutcome {
        let remote: Verdict = remote.into();
        let language = remote.language.clone();

        // Safer overrides optimistic: a suspicious pattern read beats a
        // relaxed model read
        if boosted.level == RiskLevel::Medium && remote.level <= RiskLevel::Low {
            let (confidence, adjusted) =
                reconcile(RiskLevel::Medium, boosted.confidence.max(0.5));
            let mut verdict = boosted;
            verdict.confidence = confidence;
            verdict.language = language;
            return AnalysisOutcome {
                verdict,
                decided_by: DecidedBy::Fusion,
                reputation,
                adjusted,
            };
        }

        let level = boosted.level.max(remote.level);
        let winner = if remote.level >= boosted.level {
            &remote
        } else {
            &boosted
        };

        let signals = SignalSet {
            pattern_confidence: risk_signal(&boosted),
            model_confidence: risk_signal(&remote),
            reputation_boost: reputation.as_ref().map(|h| h.risk_boost).unwrap_or(0.0),
            reputation_verified: reputation.as_ref().map(|h| h.is_verified).unwrap_or(false),
            has_urgency: pattern.report.has_urgency(),
            has_links: has_links(message),
            message_length: message.chars().count(),
            sender_blocked: false,
            sender_trusted: false,
        };
        let composed = self.scorer.calculate(&signals);

        let (confidence, adjusted) =
            reconcile(level, composed.confidence.max(winner.confidence));

        let verdict = Verdict {
            level,
            reason: winner.reason.clone(),
            scam_type: winner.scam_type.clone().or_else(|| {
                if winner.level == remote.level {
                    boosted.scam_type.clone()
                } else {
                    remote.scam_type.clone()
                }
            }),
            confidence,
            language,
        };

        AnalysisOutcome {
            verdict,
            decided_by: DecidedBy::Fusion,
            reputation,
            adjusted,
        }
    }

    /// Analyze an image artifact through the configured vision provider.
    pub async fn analyze_image(&self, image: &[u8], mime_type: &str) -> Verdict {
        match &self.vision {
            Some(client) => match client.classify_image(image, mime_type).await {
                Ok(verdict) => verdict.into(),
                Err(e) => {
                    warn!(error = %e, "vision analysis failed");
                    service_busy()
                }
            },
            None => service_busy(),
        }
    }
}

/// Risk evidence contributed by a verdict: confident LOW reads carry no risk.
fn risk_signal(verdict: &Verdict) -> f64 {
    if verdict.level >= RiskLevel::Medium {
        verdict.confidence
    } else {
        0.0
    }
}

fn has_links(message: &str) -> bool {
    extract_entities(message)
        .iter()
        .any(|(_, kind)| *kind == EntityKind::Url)
}

fn service_busy() -> Verdict {
    Verdict::new(
        RiskLevel::Unknown,
        "All vision models are currently unavailable",
        0.0,
    )
    .with_scam_type("Service Busy")
}
