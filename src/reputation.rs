//! Reputation store access: normalization, hash-indexed lookup through the
//! cache, community reporting, and automatic entity extraction from flagged
//! messages.

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;
use crate::kv::KvCache;
use crate::store::{BlacklistSource, EntityKind, NewBlacklistEntry, SqliteStore};

/// Cache TTL for reputation lookups.
pub const REPUTATION_TTL: Duration = Duration::from_secs(3600);

/// Confidence floor below which auto-extraction is skipped.
pub const AUTO_BLACKLIST_MIN_CONFIDENCE: f64 = 0.70;

static URL_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s<>"]+|www\.[^\s<>"]+"#).expect("invalid regex")
});

// Indian mobile numbers start with 6-9; other ten-digit runs (landlines,
// reference ids, amounts) must not enter the reputation store
static PHONE_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+91|91)?[6-9]\d{9}").expect("invalid regex"));

/// Normalize a value for consistent storage and lookup. Idempotent.
pub fn normalize(value: &str, kind: EntityKind) -> String {
    match kind {
        EntityKind::Phone => normalize_phone(value),
        EntityKind::Url => normalize_url(value),
        EntityKind::Domain => normalize_domain(value),
    }
}

fn normalize_phone(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if kept.starts_with('+') {
        return kept;
    }
    if kept.starts_with("91") && kept.len() == 12 {
        return format!("+{kept}");
    }
    // Canonicalise bare national numbers onto the default country prefix
    let tail: String = kept
        .chars()
        .rev()
        .take(10)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("+91{tail}")
}

fn strip_scheme(mut v: &str) -> &str {
    loop {
        if let Some(rest) = v.strip_prefix("https://") {
            v = rest;
        } else if let Some(rest) = v.strip_prefix("http://") {
            v = rest;
        } else {
            return v;
        }
    }
}

fn normalize_url(value: &str) -> String {
    let v = value.trim().to_lowercase();
    strip_scheme(&v).trim_end_matches('/').to_string()
}

fn normalize_domain(value: &str) -> String {
    let v = value.trim().to_lowercase();
    // Keep the netloc only
    strip_scheme(&v)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// 32-byte digest of the normalized value, hex-encoded. The primary lookup
/// key for the reputation store.
pub fn value_hash(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn cache_key(hash: &str) -> String {
    format!("bl:{hash}")
}

/// Outcome of a reputation lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationHit {
    pub is_blacklisted: bool,
    pub reports_count: u32,
    pub is_verified: bool,
    /// Confidence contribution when blacklisted; never lowers a verdict
    pub risk_boost: f64,
    #[serde(default)]
    pub scam_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ReputationHit {
    pub fn clean() -> Self {
        Self {
            is_blacklisted: false,
            reports_count: 0,
            is_verified: false,
            risk_boost: 0.0,
            scam_type: None,
            confidence: None,
        }
    }
}

/// Training fields attached to a report. Only persisted when the submitting
/// user granted training-data consent.
#[derive(Debug, Clone, Default)]
pub struct TrainingContext {
    pub full_message: Option<String>,
    pub ai_reasoning: Option<String>,
    pub scam_type: Option<String>,
    pub confidence: Option<f64>,
    pub language: Option<String>,
    pub features: Option<String>,
}

/// Reputation store front: cache-first lookups and write-through reporting.
pub struct ReputationService {
    store: Arc<SqliteStore>,
    cache: Arc<KvCache>,
}

impl ReputationService {
    pub fn new(store: Arc<SqliteStore>, cache: Arc<KvCache>) -> Self {
        Self { store, cache }
    }

    /// Check whether a value is blacklisted. Consults the cache first; on a
    /// miss reads the store and writes the result back with a TTL.
    pub async fn check(&self, value: &str, kind: EntityKind) -> Result<ReputationHit> {
        let normalized = normalize(value, kind);
        let hash = value_hash(&normalized);
        let key = cache_key(&hash);

        if let Some(cached) = self.cache.get(&key).await? {
            if let Ok(hit) = serde_json::from_str::<ReputationHit>(&cached) {
                return Ok(hit);
            }
            // Unparseable cache payloads fall through to the store
        }

        let hit = match self.store.get_blacklist_entry(&hash, kind)? {
            Some(entry) => ReputationHit {
                is_blacklisted: true,
                reports_count: entry.reports_count,
                is_verified: entry.is_verified,
                risk_boost: if entry.is_verified { 0.3 } else { 0.2 },
                scam_type: entry.scam_type,
                confidence: entry.confidence,
            },
            None => ReputationHit::clean(),
        };

        self.cache
            .setex(key, REPUTATION_TTL, serde_json::to_string(&hit)?)
            .await?;

        Ok(hit)
    }

    /// Report an entity. Existing entries increment their report count; new
    /// entries are inserted. The cache key is invalidated before returning.
    pub async fn report(
        &self,
        value: &str,
        kind: EntityKind,
        source: BlacklistSource,
        consented: bool,
        training: Option<&TrainingContext>,
    ) -> Result<ReportOutcome> {
        let normalized = normalize(value, kind);
        let hash = value_hash(&normalized);

        let outcome = match self.store.increment_blacklist_reports(&hash, kind)? {
            Some(count) => ReportOutcome {
                reports_count: count,
                newly_added: false,
            },
            None => {
                let training = training.filter(|_| consented);
                let entry = self.store.insert_blacklist_entry(
                    kind,
                    &NewBlacklistEntry {
                        value: normalized,
                        value_hash: hash.clone(),
                        source: Some(source),
                        is_verified: false,
                        full_message: training.and_then(|t| t.full_message.clone()),
                        ai_reasoning: training.and_then(|t| t.ai_reasoning.clone()),
                        scam_type: training.and_then(|t| t.scam_type.clone()),
                        confidence: training.and_then(|t| t.confidence),
                        language: training.and_then(|t| t.language.clone()),
                        features: training.and_then(|t| t.features.clone()),
                    },
                )?;
                ReportOutcome {
                    reports_count: entry.reports_count,
                    newly_added: true,
                }
            }
        };

        // Invalidation happens before the write becomes observable to other
        // readers through the cache
        self.cache.delete(&cache_key(&hash)).await?;

        Ok(outcome)
    }

    /// Extract URLs and phone numbers from a flagged message and feed them
    /// into the blacklist. Returns the number of newly added entries.
    pub async fn auto_blacklist_from_message(
        &self,
        message: &str,
        ai_reasoning: &str,
        scam_type: Option<&str>,
        confidence: f64,
        consented: bool,
    ) -> Result<usize> {
        if confidence < AUTO_BLACKLIST_MIN_CONFIDENCE {
            return Ok(0);
        }

        let entities = extract_entities(message);
        if entities.is_empty() {
            return Ok(0);
        }

        let features = serde_json::to_string(&serde_json::json!({
            "extracted_entities": entities.iter().map(|(v, _)| v).collect::<Vec<_>>(),
        }))?;

        let training = TrainingContext {
            full_message: Some(message.to_string()),
            ai_reasoning: Some(ai_reasoning.to_string()),
            scam_type: scam_type.map(|s| s.to_string()),
            confidence: Some(confidence),
            language: Some("en".to_string()),
            features: Some(features),
        };

        let mut added = 0;
        for (value, kind) in entities {
            let outcome = self
                .report(&value, kind, BlacklistSource::AiAuto, consented, Some(&training))
                .await?;
            if outcome.newly_added {
                added += 1;
            }
        }

        debug!(added, "auto-blacklist pass complete");
        Ok(added)
    }

    /// Check every entity found in a message, returning the strongest hit.
    /// Verified hits win over unverified ones.
    pub async fn scan_message(&self, message: &str) -> Result<Option<ReputationHit>> {
        let mut best: Option<ReputationHit> = None;

        for (value, kind) in extract_entities(message) {
            let hit = self.check(&value, kind).await?;
            if !hit.is_blacklisted {
                continue;
            }
            let stronger = match &best {
                None => true,
                Some(current) => hit.is_verified && !current.is_verified,
            };
            if stronger {
                best = Some(hit);
            }
        }

        Ok(best)
    }
}

/// Result of one report call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub reports_count: u32,
    pub newly_added: bool,
}

/// Pull URL and phone entities out of a message body.
pub fn extract_entities(message: &str) -> Vec<(String, EntityKind)> {
    let mut entities = Vec::new();
    for m in URL_ENTITY.find_iter(message) {
        entities.push((m.as_str().to_string(), EntityKind::Url));
    }
    for m in PHONE_ENTITY.find_iter(message) {
        entities.push((m.as_str().to_string(), EntityKind::Phone));
    }
    entities
}
