//! OTP-based guardian linking.
//!
//! The protected user generates a short-lived six-digit code; the guardian
//! redeems it to create an active link. Codes live only in the KV cache and
//! are single-use. The link graph is a strict two-level hierarchy: no user
//! is both protected and a guardian, and no chains form.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::error::{Error, Result};
use crate::kv::KvCache;
use crate::store::{GuardianLink, SqliteStore, User};

/// OTP lifetime.
pub const OTP_TTL: Duration = Duration::from_secs(600);

/// OTP lifetime surfaced to callers.
pub const OTP_TTL_MINUTES: u64 = 10;

#[derive(Debug, Serialize, Deserialize)]
struct OtpPayload {
    user_id: i64,
    email: String,
}

/// A freshly issued linking code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpIssued {
    pub code: String,
    pub ttl_minutes: u64,
    pub message: String,
}

/// Result of a successful verification.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    pub link: GuardianLink,
    pub protected_email: String,
    /// The link already existed; verification was a no-op
    pub already_linked: bool,
}

/// OTP issuance and verification.
pub struct GuardianLinkService {
    store: Arc<SqliteStore>,
    kv: Arc<KvCache>,
}

impl GuardianLinkService {
    pub fn new(store: Arc<SqliteStore>, kv: Arc<KvCache>) -> Self {
        Self { store, kv }
    }

    /// Issue a linking code for a protected user.
    pub async fn generate_otp(&self, protected: &User) -> Result<OtpIssued> {
        // Anti-chain: a user who guards someone cannot also be protected
        if self.store.has_active_link_as_guardian(protected.id)? {
            return Err(Error::conflict(
                "guardians cannot generate linking codes for themselves",
            ));
        }

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let payload = serde_json::to_string(&OtpPayload {
            user_id: protected.id,
            email: protected.email.clone(),
        })?;

        self.kv
            .setex(otp_key(&code), OTP_TTL, payload)
            .await
            .map_err(|e| Error::dependency_unavailable("kv", e.to_string()))?;

        info!(user_id = protected.id, "guardian linking code issued");

        Ok(OtpIssued {
            code,
            ttl_minutes: OTP_TTL_MINUTES,
            message: format!("Share this code with your guardian. It expires in {OTP_TTL_MINUTES} minutes."),
        })
    }

    /// Redeem a linking code on behalf of a guardian.
    ///
    /// The code is consumed atomically with the link insert; a concurrent
    /// second redeemer observes an invalid code.
    pub async fn verify_otp(
        &self,
        guardian: &User,
        claimed_email: &str,
        code: &str,
    ) -> Result<VerifyOutcome> {
        if guardian.email.eq_ignore_ascii_case(claimed_email) {
            return Err(Error::conflict("you cannot be your own guardian"));
        }

        let key = otp_key(code);
        let raw = self
            .kv
            .get(&key)
            .await?
            .ok_or_else(|| Error::conflict("invalid or expired OTP"))?;
        let payload: OtpPayload = serde_json::from_str(&raw)
            .map_err(|_| Error::conflict("invalid or expired OTP"))?;

        if !payload.email.eq_ignore_ascii_case(claimed_email) {
            return Err(Error::conflict("invalid or expired OTP"));
        }

        // Bipartite invariant: someone who is protected cannot guard
        if self.store.has_active_link_as_protected(guardian.id)? {
            return Err(Error::conflict(
                "a protected user cannot act as a guardian",
            ));
        }
        // And the protected user must not be guarding anyone
        if self.store.has_active_link_as_guardian(payload.user_id)? {
            return Err(Error::conflict(
                "this user already acts as a guardian and cannot be protected",
            ));
        }

        // Idempotent success when the link already exists
        if let Some(link) = self
            .store
            .active_link_between(payload.user_id, guardian.id)?
        {
            self.kv.take(&key).await?;
            return Ok(VerifyOutcome {
                link,
                protected_email: payload.email,
                already_linked: true,
            });
        }

        // Single-use: consume the code, then insert. A second verifier's
        // take() comes back empty.
        if self.kv.take(&key).await?.is_none() {
            return Err(Error::conflict("invalid or expired OTP"));
        }

        let link = self
            .store
            .insert_guardian_link(payload.user_id, guardian.id)?;

        info!(
            protected = payload.user_id,
            guardian = guardian.id,
            "guardian link established"
        );

        Ok(VerifyOutcome {
            link,
            protected_email: payload.email,
            already_linked: false,
        })
    }

    /// Revoke a link. Only a party to the link may revoke it; the row is
    /// hard-deleted.
    pub async fn revoke(&self, requester_id: i64, link_id: i64) -> Result<()> {
        let link = self
            .store
            .get_guardian_link(link_id)?
            .ok_or_else(|| Error::not_found("Guardian link"))?;

        if link.user_id != requester_id && link.guardian_id != requester_id {
            return Err(Error::not_found("Guardian link"));
        }

        self.store.revoke_guardian_link(link_id)?;
        info!(link_id, "guardian link revoked");
        Ok(())
    }
}

fn otp_key(code: &str) -> String {
    format!("otp:{code}")
}
