//! SQLite-backed store of record.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::store::schema::{initialize_schema, is_initialized};
use crate::store::types::*;
use crate::types::RiskLevel;

/// SQLite-backed store. All writes within one call are a single transaction.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;

        if !is_initialized(&conn) {
            initialize_schema(&conn).map_err(|e| Error::Storage(e.to_string()))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        initialize_schema(&conn).map_err(|e| Error::Storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {e}")))?;
        f(&conn).map_err(|e| Error::Storage(e.to_string()))
    }

    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| Error::Internal(format!("Failed to lock connection: {e}")))?;
        f(&mut conn).map_err(|e| Error::Storage(e.to_string()))
    }

    // ==================== User Operations ====================

    /// Create a user.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let now = Utc::now();
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, name, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![new.email, new.name, new.phone, now.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.get_user(id)?
            .ok_or_else(|| Error::Internal("user vanished after insert".to_string()))
    }

    /// Get a user by id.
    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, phone, consent_training_data, consent_analytics,
                        consent_version, consent_granted_at, created_at
                 FROM users WHERE id = ?1",
                params![id],
                Self::row_to_user,
            )
            .optional()
        })
    }

    /// Get a user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, name, phone, consent_training_data, consent_analytics,
                        consent_version, consent_granted_at, created_at
                 FROM users WHERE email = ?1",
                params![email],
                Self::row_to_user,
            )
            .optional()
        })
    }

    /// Record a training-data consent decision.
    pub fn set_training_consent(&self, user_id: i64, granted: bool, version: &str) -> Result<()> {
        let now = Utc::now();
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET consent_training_data = ?2, consent_version = ?3,
                        consent_granted_at = ?4
                 WHERE id = ?1",
                params![user_id, granted, version, now.to_rfc3339()],
            )?;
            Ok(())
        })
    }

    /// Upsert a user's settings row.
    pub fn upsert_settings(&self, settings: &UserSettings) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_settings
                    (user_id, language, auto_block_high_risk, alert_threshold, receive_tips)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                    language = excluded.language,
                    auto_block_high_risk = excluded.auto_block_high_risk,
                    alert_threshold = excluded.alert_threshold,
                    receive_tips = excluded.receive_tips",
                params![
                    settings.user_id,
                    settings.language,
                    settings.auto_block_high_risk,
                    settings.alert_threshold.as_str(),
                    settings.receive_tips,
                ],
            )?;
            Ok(())
        })
    }

    /// Get a user's settings, if a row exists.
    pub fn get_settings(&self, user_id: i64) -> Result<Option<UserSettings>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT user_id, language, auto_block_high_risk, alert_threshold, receive_tips
                 FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| {
                    let threshold: String = row.get(3)?;
                    Ok(UserSettings {
                        user_id: row.get(0)?,
                        language: row.get(1)?,
                        auto_block_high_risk: row.get(2)?,
                        alert_threshold: threshold.parse().map_err(|e| conv_err(3, e))?,
                        receive_tips: row.get(4)?,
                    })
                },
            )
            .optional()
        })
    }

    // ==================== Trusted Sender Operations ====================

    /// Mark a sender as trusted for a user. Duplicate registration conflicts.
    pub fn add_trusted_sender(&self, user_id: i64, sender: &str) -> Result<TrustedSender> {
        if self.is_trusted_sender(user_id, sender)? {
            return Err(Error::conflict(format!(
                "sender {sender} is already trusted"
            )));
        }

        let now = Utc::now();
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO trusted_senders (user_id, sender, created_at) VALUES (?1, ?2, ?3)",
                params![user_id, sender, now.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(TrustedSender {
            id,
            user_id,
            sender: sender.to_string(),
            created_at: now,
        })
    }

    /// Whether a sender is trusted by a user.
    pub fn is_trusted_sender(&self, user_id: i64, sender: &str) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM trusted_senders WHERE user_id = ?1 AND sender = ?2)",
                params![user_id, sender],
                |row| row.get(0),
            )
        })
    }

    /// Remove a trusted sender. Returns whether a row was deleted.
    pub fn remove_trusted_sender(&self, user_id: i64, sender: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM trusted_senders WHERE user_id = ?1 AND sender = ?2",
                params![user_id, sender],
            )?;
            Ok(rows > 0)
        })
    }

    // ==================== Scan Operations ====================

    /// Insert a scan record.
    pub fn insert_scan(&self, new: &NewScan) -> Result<Scan> {
        let created_at = new.created_at.unwrap_or_else(Utc::now);
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scans (
                    user_id, sender, message, message_preview, platform, risk_level,
                    risk_reason, scam_type, confidence, is_blocked, guardian_alerted, created_at
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
                params![
                    new.user_id,
                    new.sender,
                    new.message,
                    new.message_preview,
                    new.platform.as_str(),
                    new.risk_level.as_str(),
                    new.risk_reason,
                    new.scam_type,
                    new.confidence,
                    new.is_blocked,
                    created_at.to_rfc3339(),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.get_scan(id)?
            .ok_or_else(|| Error::Internal("scan vanished after insert".to_string()))
    }

    /// Get a scan by id.
    pub fn get_scan(&self, id: i64) -> Result<Option<Scan>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{SCAN_COLUMNS} WHERE id = ?1"),
                params![id],
                Self::row_to_scan,
            )
            .optional()
        })
    }

    /// List a user's scans, newest first, optionally filtered by level.
    pub fn list_scans(
        &self,
        user_id: i64,
        limit: usize,
        level: Option<RiskLevel>,
    ) -> Result<Vec<Scan>> {
        self.with_conn(|conn| {
            let mut sql = format!("{SCAN_COLUMNS} WHERE user_id = ?1");
            if level.is_some() {
                sql.push_str(" AND risk_level = ?2");
            }
            sql.push_str(" ORDER BY created_at DESC LIMIT ");
            sql.push_str(&limit.to_string());

            let mut stmt = conn.prepare(&sql)?;
            let rows = match level {
                Some(level) => stmt
                    .query_map(params![user_id, level.as_str()], Self::row_to_scan)?
                    .collect::<rusqlite::Result<Vec<_>>>()?,
                None => stmt
                    .query_map(params![user_id], Self::row_to_scan)?
                    .collect::<rusqlite::Result<Vec<_>>>()?,
            };
            Ok(rows)
        })
    }

    /// Delete a scan. Returns whether a row was deleted.
    pub fn delete_scan(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM scans WHERE id = ?1", params![id])?;
            Ok(rows > 0)
        })
    }

    /// Mark a scan's sender as blocked.
    pub fn set_scan_blocked(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE scans SET is_blocked = 1 WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    /// Whether any of the user's scans blocked this sender.
    pub fn is_sender_blocked(&self, user_id: i64, sender: &str) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM scans WHERE user_id = ?1 AND sender = ?2 AND is_blocked = 1
                 )",
                params![user_id, sender],
                |row| row.get(0),
            )
        })
    }

    /// All scans created strictly before the cutoff.
    pub fn scans_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Scan>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{SCAN_COLUMNS} WHERE created_at < ?1 ORDER BY id"))?;
            let rows = stmt
                .query_map(params![cutoff.to_rfc3339()], Self::row_to_scan)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Delete a batch of scans in a single statement. Returns rows deleted.
    pub fn delete_scans(&self, ids: &[i64]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let placeholders = vec!["?"; ids.len()].join(",");
            let sql = format!("DELETE FROM scans WHERE id IN ({placeholders})");
            let params_refs: Vec<&dyn rusqlite::ToSql> =
                ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
            let rows = conn.execute(&sql, params_refs.as_slice())?;
            Ok(rows)
        })
    }

    // ==================== Blacklist Operations ====================

    /// Get a blacklist entry by hash and kind.
    pub fn get_blacklist_entry(
        &self,
        value_hash: &str,
        kind: EntityKind,
    ) -> Result<Option<BlacklistEntry>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{BLACKLIST_COLUMNS} WHERE value_hash = ?1 AND type = ?2"),
                params![value_hash, kind.as_str()],
                Self::row_to_blacklist_entry,
            )
            .optional()
        })
    }

    /// Insert a new blacklist entry.
    pub fn insert_blacklist_entry(
        &self,
        kind: EntityKind,
        new: &NewBlacklistEntry,
    ) -> Result<BlacklistEntry> {
        let now = Utc::now();
        let source = new.source.unwrap_or(BlacklistSource::Community);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO blacklist (
                    type, value, value_hash, source, reports_count, is_verified,
                    first_reported_at, last_reported_at, full_message, ai_reasoning,
                    scam_type, confidence, language, features
                 ) VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    kind.as_str(),
                    new.value,
                    new.value_hash,
                    source.as_str(),
                    new.is_verified,
                    now.to_rfc3339(),
                    new.full_message,
                    new.ai_reasoning,
                    new.scam_type,
                    new.confidence,
                    new.language,
                    new.features,
                ],
            )?;
            Ok(())
        })?;

        self.get_blacklist_entry(&new.value_hash, kind)?
            .ok_or_else(|| Error::Internal("blacklist entry vanished after insert".to_string()))
    }

    /// Increment the report count on an existing entry. Returns the new
    /// count, or None when no entry exists.
    pub fn increment_blacklist_reports(
        &self,
        value_hash: &str,
        kind: EntityKind,
    ) -> Result<Option<u32>> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let rows = conn.execute(
                "UPDATE blacklist SET reports_count = reports_count + 1, last_reported_at = ?3
                 WHERE value_hash = ?1 AND type = ?2",
                params![value_hash, kind.as_str(), now.to_rfc3339()],
            )?;
            if rows == 0 {
                return Ok(None);
            }
            conn.query_row(
                "SELECT reports_count FROM blacklist WHERE value_hash = ?1 AND type = ?2",
                params![value_hash, kind.as_str()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Mark an entry as verified.
    pub fn set_blacklist_verified(&self, value_hash: &str, kind: EntityKind) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE blacklist SET is_verified = 1 WHERE value_hash = ?1 AND type = ?2",
                params![value_hash, kind.as_str()],
            )?;
            Ok(())
        })
    }

    /// Read-only projection feeding the training-data export.
    pub fn export_blacklist(
        &self,
        min_confidence: f64,
        verified_only: bool,
        limit: usize,
    ) -> Result<Vec<BlacklistEntry>> {
        self.with_conn(|conn| {
            let mut sql = format!("{BLACKLIST_COLUMNS} WHERE COALESCE(confidence, 0) >= ?1");
            if verified_only {
                sql.push_str(" AND is_verified = 1");
            }
            sql.push_str(" ORDER BY last_reported_at DESC LIMIT ");
            sql.push_str(&limit.to_string());

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![min_confidence], Self::row_to_blacklist_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    // ==================== Guardian Link Operations ====================

    /// Insert an active guardian link.
    pub fn insert_guardian_link(&self, user_id: i64, guardian_id: i64) -> Result<GuardianLink> {
        let now = Utc::now();
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO guardian_links (user_id, guardian_id, status, verified_at, created_at)
                 VALUES (?1, ?2, 'active', ?3, ?3)",
                params![user_id, guardian_id, now.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(GuardianLink {
            id,
            user_id,
            guardian_id,
            status: "active".to_string(),
            verified_at: Some(now),
            created_at: now,
        })
    }

    /// Active links where the user is the protected party.
    pub fn active_links_protecting(&self, user_id: i64) -> Result<Vec<GuardianLink>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, guardian_id, status, verified_at, created_at
                 FROM guardian_links WHERE user_id = ?1 AND status = 'active'",
            )?;
            let rows = stmt
                .query_map(params![user_id], Self::row_to_link)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Whether the user guards anyone (active outgoing link).
    pub fn has_active_link_as_guardian(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM guardian_links WHERE guardian_id = ?1 AND status = 'active'
                 )",
                params![user_id],
                |row| row.get(0),
            )
        })
    }

    /// Whether the user is protected by anyone (active incoming link).
    pub fn has_active_link_as_protected(&self, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM guardian_links WHERE user_id = ?1 AND status = 'active'
                 )",
                params![user_id],
                |row| row.get(0),
            )
        })
    }

    /// Get a link by id.
    pub fn get_guardian_link(&self, link_id: i64) -> Result<Option<GuardianLink>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, guardian_id, status, verified_at, created_at
                 FROM guardian_links WHERE id = ?1",
                params![link_id],
                Self::row_to_link,
            )
            .optional()
        })
    }

    /// The active link between a protected user and a guardian, if any.
    pub fn active_link_between(
        &self,
        user_id: i64,
        guardian_id: i64,
    ) -> Result<Option<GuardianLink>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, user_id, guardian_id, status, verified_at, created_at
                 FROM guardian_links
                 WHERE user_id = ?1 AND guardian_id = ?2 AND status = 'active'",
                params![user_id, guardian_id],
                Self::row_to_link,
            )
            .optional()
        })
    }

    /// Hard-delete a link. Returns whether a row was deleted.
    pub fn revoke_guardian_link(&self, link_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let rows = conn.execute(
                "DELETE FROM guardian_links WHERE id = ?1",
                params![link_id],
            )?;
            Ok(rows > 0)
        })
    }

    // ==================== Guardian Alert Operations ====================

    /// Create one pending alert per guardian and flag the scan, atomically.
    pub fn create_alerts_for_scan(
        &self,
        scan_id: i64,
        user_id: i64,
        guardian_ids: &[i64],
    ) -> Result<usize> {
        if guardian_ids.is_empty() {
            return Ok(0);
        }
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            for guardian_id in guardian_ids {
                tx.execute(
                    "INSERT INTO guardian_alerts (guardian_id, user_id, scan_id, status, created_at)
                     VALUES (?1, ?2, ?3, 'pending', ?4)",
                    params![guardian_id, user_id, scan_id, now],
                )?;
            }
            tx.execute(
                "UPDATE scans SET guardian_alerted = 1 WHERE id = ?1",
                params![scan_id],
            )?;
            tx.commit()?;
            Ok(guardian_ids.len())
        })
    }

    /// Pending alerts for a guardian, oldest first.
    pub fn pending_alerts_for(&self, guardian_id: i64) -> Result<Vec<GuardianAlert>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{ALERT_COLUMNS} WHERE guardian_id = ?1 AND status = 'pending' ORDER BY created_at"
            ))?;
            let rows = stmt
                .query_map(params![guardian_id], Self::row_to_alert)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Get an alert by id.
    pub fn get_alert(&self, id: i64) -> Result<Option<GuardianAlert>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{ALERT_COLUMNS} WHERE id = ?1"),
                params![id],
                Self::row_to_alert,
            )
            .optional()
        })
    }

    /// Persist an alert's lifecycle fields.
    pub fn update_alert(&self, alert: &GuardianAlert) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE guardian_alerts SET status = ?2, action = ?3, notes = ?4,
                        seen_at = ?5, actioned_at = ?6
                 WHERE id = ?1",
                params![
                    alert.id,
                    alert.status.as_str(),
                    alert.action.map(|a| a.as_str()),
                    alert.notes,
                    alert.seen_at.map(|t| t.to_rfc3339()),
                    alert.actioned_at.map(|t| t.to_rfc3339()),
                ],
            )?;
            Ok(())
        })
    }

    #[cfg(test)]
    pub(crate) fn with_raw_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        self.with_conn(f)
    }

    // ==================== Row Mappers ====================

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            consent_training_data: row.get(4)?,
            consent_analytics: row.get(5)?,
            consent_version: row.get(6)?,
            consent_granted_at: parse_opt_ts(7, row.get(7)?)?,
            created_at: parse_ts(8, row.get(8)?)?,
        })
    }

    fn row_to_scan(row: &rusqlite::Row) -> rusqlite::Result<Scan> {
        let platform: String = row.get(5)?;
        let risk_level: String = row.get(6)?;
        Ok(Scan {
            id: row.get(0)?,
            user_id: row.get(1)?,
            sender: row.get(2)?,
            message: row.get(3)?,
            message_preview: row.get(4)?,
            platform: platform.parse().map_err(|e| conv_err(5, e))?,
            risk_level: risk_level.parse().map_err(|e| conv_err(6, e))?,
            risk_reason: row.get(7)?,
            scam_type: row.get(8)?,
            confidence: row.get(9)?,
            is_blocked: row.get(10)?,
            guardian_alerted: row.get(11)?,
            created_at: parse_ts(12, row.get(12)?)?,
        })
    }

    fn row_to_blacklist_entry(row: &rusqlite::Row) -> rusqlite::Result<BlacklistEntry> {
        let kind: String = row.get(1)?;
        let source: String = row.get(4)?;
        Ok(BlacklistEntry {
            id: row.get(0)?,
            kind: kind.parse().map_err(|e| conv_err(1, e))?,
            value: row.get(2)?,
            value_hash: row.get(3)?,
            source: source.parse().map_err(|e| conv_err(4, e))?,
            reports_count: row.get(5)?,
            is_verified: row.get(6)?,
            first_reported_at: parse_ts(7, row.get(7)?)?,
            last_reported_at: parse_ts(8, row.get(8)?)?,
            full_message: row.get(9)?,
            ai_reasoning: row.get(10)?,
            scam_type: row.get(11)?,
            confidence: row.get(12)?,
            language: row.get(13)?,
            features: row.get(14)?,
        })
    }

    fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<GuardianLink> {
        Ok(GuardianLink {
            id: row.get(0)?,
            user_id: row.get(1)?,
            guardian_id: row.get(2)?,
            status: row.get(3)?,
            verified_at: parse_opt_ts(4, row.get(4)?)?,
            created_at: parse_ts(5, row.get(5)?)?,
        })
    }

    fn row_to_alert(row: &rusqlite::Row) -> rusqlite::Result<GuardianAlert> {
        let status: String = row.get(4)?;
        let action: Option<String> = row.get(5)?;
        Ok(GuardianAlert {
            id: row.get(0)?,
            guardian_id: row.get(1)?,
            user_id: row.get(2)?,
            scan_id: row.get(3)?,
            status: status.parse().map_err(|e| conv_err(4, e))?,
            action: action
                .map(|a| a.parse().map_err(|e| conv_err(5, e)))
                .transpose()?,
            notes: row.get(6)?,
            created_at: parse_ts(7, row.get(7)?)?,
            seen_at: parse_opt_ts(8, row.get(8)?)?,
            actioned_at: parse_opt_ts(9, row.get(9)?)?,
        })
    }
}

const SCAN_COLUMNS: &str = "SELECT id, user_id, sender, message, message_preview, platform, \
     risk_level, risk_reason, scam_type, confidence, is_blocked, guardian_alerted, created_at \
     FROM scans";

const BLACKLIST_COLUMNS: &str = "SELECT id, type, value, value_hash, source, reports_count, \
     is_verified, first_reported_at, last_reported_at, full_message, ai_reasoning, scam_type, \
     confidence, language, features \
     FROM blacklist";

const ALERT_COLUMNS: &str = "SELECT id, guardian_id, user_id, scan_id, status, action, notes, \
     created_at, seen_at, actioned_at \
     FROM guardian_alerts";

fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}

fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_ts(idx, s)).transpose()
}

fn conv_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Platform;
    use chrono::Duration;

    fn test_store() -> SqliteStore {
        SqliteStore::in_memory().unwrap()
    }

    fn seed_user(store: &SqliteStore, email: &str) -> User {
        store
            .create_user(&NewUser::new(email, "Test User").with_phone("+911234567890"))
            .unwrap()
    }

    fn new_scan(user_id: i64, level: RiskLevel) -> NewScan {
        NewScan {
            user_id,
            sender: "SENDER".to_string(),
            message: Some("body".to_string()),
            message_preview: Some("body".to_string()),
            platform: Platform::Sms,
            risk_level: level,
            risk_reason: "test".to_string(),
            scam_type: None,
            confidence: 0.5,
            is_blocked: false,
            created_at: None,
        }
    }

    #[test]
    fn test_user_round_trip() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");

        let fetched = store.get_user(user.id).unwrap().unwrap();
        assert_eq!(fetched, user);
        assert!(!fetched.consent_training_data);

        store.set_training_consent(user.id, true, "v1").unwrap();
        let fetched = store.get_user(user.id).unwrap().unwrap();
        assert!(fetched.consent_training_data);
        assert_eq!(fetched.consent_version.as_deref(), Some("v1"));
    }

    #[test]
    fn test_settings_upsert() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");

        assert!(store.get_settings(user.id).unwrap().is_none());

        let mut settings = UserSettings::defaults_for(user.id);
        settings.alert_threshold = crate::types::AlertThreshold::All;
        store.upsert_settings(&settings).unwrap();

        settings.language = "hi".to_string();
        store.upsert_settings(&settings).unwrap();

        let fetched = store.get_settings(user.id).unwrap().unwrap();
        assert_eq!(fetched.language, "hi");
        assert_eq!(
            fetched.alert_threshold,
            crate::types::AlertThreshold::All
        );
    }

    #[test]
    fn test_trusted_sender_conflict() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");

        store.add_trusted_sender(user.id, "MOM").unwrap();
        assert!(store.is_trusted_sender(user.id, "MOM").unwrap());

        let dup = store.add_trusted_sender(user.id, "MOM");
        assert!(matches!(dup, Err(Error::Conflict(_))));

        assert!(store.remove_trusted_sender(user.id, "MOM").unwrap());
        assert!(!store.is_trusted_sender(user.id, "MOM").unwrap());
    }

    #[test]
    fn test_scan_round_trip_and_history() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");

        let scan = store.insert_scan(&new_scan(user.id, RiskLevel::High)).unwrap();
        assert_eq!(scan.risk_level, RiskLevel::High);
        assert!(!scan.guardian_alerted);

        store.insert_scan(&new_scan(user.id, RiskLevel::Low)).unwrap();

        let all = store.list_scans(user.id, 10, None).unwrap();
        assert_eq!(all.len(), 2);

        let high_only = store
            .list_scans(user.id, 10, Some(RiskLevel::High))
            .unwrap();
        assert_eq!(high_only.len(), 1);
        assert_eq!(high_only[0].id, scan.id);
    }

    #[test]
    fn test_blocked_sender() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");
        let scan = store.insert_scan(&new_scan(user.id, RiskLevel::High)).unwrap();

        assert!(!store.is_sender_blocked(user.id, "SENDER").unwrap());
        store.set_scan_blocked(scan.id).unwrap();
        assert!(store.is_sender_blocked(user.id, "SENDER").unwrap());
    }

    #[test]
    fn test_blacklist_insert_and_increment() {
        let store = test_store();

        let entry = store
            .insert_blacklist_entry(
                EntityKind::Phone,
                &NewBlacklistEntry {
                    value: "+911111111111".to_string(),
                    value_hash: "hash1".to_string(),
                    source: Some(BlacklistSource::AiAuto),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(entry.reports_count, 1);
        assert!(entry.last_reported_at >= entry.first_reported_at);

        let count = store
            .increment_blacklist_reports("hash1", EntityKind::Phone)
            .unwrap();
        assert_eq!(count, Some(2));

        // Unknown hash increments nothing
        let count = store
            .increment_blacklist_reports("nope", EntityKind::Phone)
            .unwrap();
        assert_eq!(count, None);

        // Same hash under a different kind is a distinct entry
        assert!(store
            .get_blacklist_entry("hash1", EntityKind::Url)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_guardian_links() {
        let store = test_store();
        let protected = seed_user(&store, "p@example.com");
        let guardian = seed_user(&store, "g@example.com");

        let link = store
            .insert_guardian_link(protected.id, guardian.id)
            .unwrap();

        assert!(store.has_active_link_as_protected(protected.id).unwrap());
        assert!(store.has_active_link_as_guardian(guardian.id).unwrap());
        assert!(!store.has_active_link_as_guardian(protected.id).unwrap());

        let found = store
            .active_link_between(protected.id, guardian.id)
            .unwrap();
        assert_eq!(found.map(|l| l.id), Some(link.id));

        assert!(store.revoke_guardian_link(link.id).unwrap());
        assert!(!store.has_active_link_as_protected(protected.id).unwrap());
    }

    #[test]
    fn test_alert_fanout_is_atomic() {
        let store = test_store();
        let protected = seed_user(&store, "p@example.com");
        let g1 = seed_user(&store, "g1@example.com");
        let g2 = seed_user(&store, "g2@example.com");
        let scan = store
            .insert_scan(&new_scan(protected.id, RiskLevel::High))
            .unwrap();

        let created = store
            .create_alerts_for_scan(scan.id, protected.id, &[g1.id, g2.id])
            .unwrap();
        assert_eq!(created, 2);

        let scan = store.get_scan(scan.id).unwrap().unwrap();
        assert!(scan.guardian_alerted);

        let pending = store.pending_alerts_for(g1.id).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].scan_id, scan.id);
        assert_eq!(pending[0].status, AlertStatus::Pending);
    }

    #[test]
    fn test_archiver_selection_and_batch_delete() {
        let store = test_store();
        let user = seed_user(&store, "a@example.com");

        let mut old = new_scan(user.id, RiskLevel::High);
        old.created_at = Some(Utc::now() - Duration::days(200));
        let old = store.insert_scan(&old).unwrap();

        let fresh = store.insert_scan(&new_scan(user.id, RiskLevel::Low)).unwrap();

        let cutoff = Utc::now() - Duration::days(180);
        let aged = store.scans_created_before(cutoff).unwrap();
        assert_eq!(aged.len(), 1);
        assert_eq!(aged[0].id, old.id);

        let deleted = store.delete_scans(&[old.id]).unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_scan(old.id).unwrap().is_none());
        assert!(store.get_scan(fresh.id).unwrap().is_some());
    }
}
