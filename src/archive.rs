//! Cold-storage archiver.
//!
//! Moves aged scans out of the hot store through the configured storage
//! backend. The operation is explicitly two-phase: the archive file is
//! written first, and hot rows are deleted only after the write succeeds,
//! so a crash never loses data.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::StorageBackend;
use crate::store::{Scan, SqliteStore};

/// Default age, in days, after which scans are archived.
pub const DEFAULT_CUTOFF_DAYS: i64 = 180;

/// One line of the newline-delimited archive file.
#[derive(Debug, Serialize)]
struct ArchivedScan<'a> {
    id: i64,
    user_id: i64,
    sender: &'a str,
    message: Option<&'a str>,
    risk_level: &'a str,
    created_at: DateTime<Utc>,
}

impl<'a> ArchivedScan<'a> {
    fn from_scan(scan: &'a Scan) -> Self {
        Self {
            id: scan.id,
            user_id: scan.user_id,
            sender: &scan.sender,
            message: scan.message.as_deref(),
            risk_level: scan.risk_level.as_str(),
            created_at: scan.created_at,
        }
    }
}

/// Result of one archive run.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveReport {
    pub archived_count: usize,
    pub path: Option<String>,
    pub provider: String,
    /// Set when the file was written but the hot-store delete failed
    pub warning: Option<String>,
}

/// Scheduled and on-demand cold-storage mover.
pub struct Archiver {
    store: Arc<SqliteStore>,
    backend: Arc<dyn StorageBackend>,
}

impl Archiver {
    pub fn new(store: Arc<SqliteStore>, backend: Arc<dyn StorageBackend>) -> Self {
        Self { store, backend }
    }

    /// Archive all scans older than `cutoff_days`.
    pub async fn archive(&self, cutoff_days: i64) -> Result<ArchiveReport> {
        let cutoff = Utc::now() - Duration::days(cutoff_days);
        let scans = self.store.scans_created_before(cutoff)?;

        if scans.is_empty() {
            return Ok(ArchiveReport {
                archived_count: 0,
                path: None,
                provider: self.backend.provider().to_string(),
                warning: None,
            });
        }

        let mut content = String::new();
        for scan in &scans {
            content.push_str(&serde_json::to_string(&ArchivedScan::from_scan(scan))?);
            content.push('\n');
        }

        let filename = format!("scans_{}.jsonl", Utc::now().format("%Y%m%dT%H%M%SZ"));
        let path = self.backend.save(&filename, &content).await?;

        let ids: Vec<i64> = scans.iter().map(|s| s.id).collect();
        match self.store.delete_scans(&ids) {
            Ok(deleted) => {
                info!(deleted, path = %path, "archive run complete");
                Ok(ArchiveReport {
                    archived_count: deleted,
                    path: Some(path),
                    provider: self.backend.provider().to_string(),
                    warning: None,
                })
            }
            Err(e) => {
                // The file exists; an operator can reconcile from it
                warn!(error = %e, path = %path, "archive written but hot-store delete failed");
                Ok(ArchiveReport {
                    archived_count: scans.len(),
                    path: Some(path),
                    provider: self.backend.provider().to_string(),
                    warning: Some(format!(
                        "archive file written but hot-store delete failed: {e}"
                    )),
                })
            }
        }
    }

    /// Background loop: archive on an interval until shutdown.
    pub async fn run_periodic(
        &self,
        every: std::time::Duration,
        cutoff_days: i64,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; skip it so startup is quiet
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.archive(cutoff_days).await {
                        warn!(error = %e, "scheduled archive run failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("archiver shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use crate::store::{NewScan, NewUser};
    use crate::types::{Platform, RiskLevel};
    use async_trait::async_trait;

    fn seed(store: &SqliteStore, count: usize, age_days: i64) -> Vec<i64> {
        let user = store
            .create_user(&NewUser::new("a@example.com", "Archiver"))
            .unwrap();
        (0..count)
            .map(|i| {
                store
                    .insert_scan(&NewScan {
                        user_id: user.id,
                        sender: format!("S{i}"),
                        message: Some(format!("body {i}")),
                        message_preview: None,
                        platform: Platform::Sms,
                        risk_level: RiskLevel::High,
                        risk_reason: "old".to_string(),
                        scam_type: None,
                        confidence: 0.8,
                        is_blocked: false,
                        created_at: Some(Utc::now() - Duration::days(age_days)),
                    })
                    .unwrap()
                    .id
            })
            .collect()
    }

    #[tokio::test]
    async fn test_archive_moves_aged_scans() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let old_ids = seed(&store, 10, 200);

        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(
            store.clone(),
            Arc::new(LocalStorage::new(dir.path().to_path_buf())),
        );

        let report = archiver.archive(180).await.unwrap();
        assert_eq!(report.archived_count, 10);
        assert!(report.warning.is_none());
        assert_eq!(report.provider, "LOCAL");

        // Every archived scan appears exactly once in the file
        let content = std::fs::read_to_string(report.path.unwrap()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 10);
        for id in &old_ids {
            assert_eq!(
                lines.iter().filter(|l| l["id"] == *id).count(),
                1,
                "scan {id} must appear exactly once"
            );
        }

        // And none remain in the hot store
        for id in old_ids {
            assert!(store.get_scan(id).unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_fresh_scans_are_kept() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fresh_ids = seed(&store, 3, 10);

        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(
            store.clone(),
            Arc::new(LocalStorage::new(dir.path().to_path_buf())),
        );

        let report = archiver.archive(180).await.unwrap();
        assert_eq!(report.archived_count, 0);
        assert!(report.path.is_none());

        for id in fresh_ids {
            assert!(store.get_scan(id).unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_store_untouched() {
        struct BrokenBackend;

        #[async_trait]
        impl StorageBackend for BrokenBackend {
            async fn save(&self, _f: &str, _c: &str) -> Result<String> {
                Err(crate::error::Error::storage("disk full"))
            }
            async fn delete(&self, _p: &str) -> Result<()> {
                Ok(())
            }
            fn provider(&self) -> &'static str {
                "BROKEN"
            }
        }

        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ids = seed(&store, 5, 200);

        let archiver = Archiver::new(store.clone(), Arc::new(BrokenBackend));
        assert!(archiver.archive(180).await.is_err());

        // Write-before-delete: nothing was removed
        for id in ids {
            assert!(store.get_scan(id).unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_delete_failure_reports_warning_with_path() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let ids = seed(&store, 10, 200);

        // Make the hot-store delete fail after the file write succeeds
        store
            .with_raw_conn(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER block_scan_delete BEFORE DELETE ON scans
                     BEGIN SELECT RAISE(ABORT, 'delete disabled'); END;",
                )
            })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let archiver = Archiver::new(
            store.clone(),
            Arc::new(LocalStorage::new(dir.path().to_path_buf())),
        );

        let report = archiver.archive(180).await.unwrap();
        assert_eq!(report.archived_count, 10);
        assert!(report.warning.is_some());
        let path = report.path.expect("path must be set for reconciliation");
        assert!(std::path::Path::new(&path).exists());

        // The scans remain for a later retry
        for id in ids {
            assert!(store.get_scan(id).unwrap().is_some());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_loop_honours_shutdown() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let archiver = Arc::new(Archiver::new(
            store,
            Arc::new(LocalStorage::new(dir.path().to_path_buf())),
        ));

        let (tx, rx) = tokio::sync::watch::channel(false);
        let handle = {
            let archiver = archiver.clone();
            tokio::spawn(async move {
                archiver
                    .run_periodic(std::time::Duration::from_secs(3600), 180, rx)
                    .await
            })
        };

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
