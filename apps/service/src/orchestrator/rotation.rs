//! Periodic compaction of live check logs.
//!
//! Every rotation archives each non-empty live log as `<id>-<epochMillis>`
//! and truncates it. Archives are kept forever.
//!
//! Compression and truncation are separate steps. A failed compression leaves
//! the live log untouched; a failed truncation after a successful compression
//! means those entries are archived again on the next rotation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::archive::{ArchiveError, LogArchive, Rotation};
use crate::error::WorkerError;

/// Tally of one rotation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RotationReport {
    pub live: usize,
    pub archived: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Archive name for a live log rotated at `now_ms`
///
/// Unique as long as one log is not rotated twice within a millisecond; the
/// archive refuses to overwrite if that ever happens.
pub fn archive_id(id: &str, now_ms: i64) -> String {
    format!("{id}-{now_ms}")
}

pub struct LogRotator {
    archive: Arc<dyn LogArchive>,
}

impl LogRotator {
    pub fn new(archive: Arc<dyn LogArchive>) -> Self {
        Self { archive }
    }

    /// Rotate every live log once
    pub async fn rotate_all(&self) -> RotationReport {
        let mut report = RotationReport::default();

        let ids = match self.archive.list(false).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list live logs: {}", WorkerError::from(e));
                return report;
            }
        };
        report.live = ids.len();

        if ids.is_empty() {
            debug!("No logs to rotate");
            return report;
        }

        for id in ids {
            let target = archive_id(&id, chrono::Utc::now().timestamp_millis());

            match self.archive.rotate(&id, &target).await {
                Ok(Rotation::Archived { archive_id, bytes }) => {
                    report.archived += 1;
                    debug!(log_id = %id, "Archived {bytes} bytes to {archive_id}");
                }
                Ok(Rotation::Empty) => report.empty += 1,
                Err(e @ ArchiveError::TruncateFailed { .. }) => {
                    report.failed += 1;
                    warn!(log_id = %id, "{}; entries will be archived again next rotation", WorkerError::from(e));
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(log_id = %id, "{}; live log left untouched", WorkerError::from(e));
                }
            }
        }

        report
    }

    /// Rotate now and then every `every`, until the returned task is aborted
    pub fn start_periodic(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);

            loop {
                interval.tick().await;

                let report = self.rotate_all().await;
                info!(
                    "Log rotation finished: {} live, {} archived, {} empty, {} failed",
                    report.live, report.archived, report.empty, report.failed
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::FileLogArchive;
    use crate::test_support::MemoryArchive;
    use tempfile::tempdir;

    #[test]
    fn test_archive_id_format() {
        assert_eq!(archive_id("abcdefghijklmnopqrst", 1_700_000_000_123), "abcdefghijklmnopqrst-1700000000123");
    }

    #[tokio::test]
    async fn test_rotation_archives_and_truncates() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = Arc::new(FileLogArchive::new(dir.path()));
        archive.append("check-a", r#"{"state":"up"}"#).await?;
        archive.append("check-a", r#"{"state":"down"}"#).await?;
        archive.append("check-b", r#"{"state":"up"}"#).await?;
        let before = std::fs::read(dir.path().join("check-a.log"))?;

        let report = LogRotator::new(archive.clone()).rotate_all().await;

        assert_eq!(report, RotationReport { live: 2, archived: 2, empty: 0, failed: 0 });
        assert_eq!(std::fs::metadata(dir.path().join("check-a.log"))?.len(), 0);

        let archived: Vec<String> = archive
            .list(true)
            .await?
            .into_iter()
            .filter(|id| id.starts_with("check-a-"))
            .collect();
        assert_eq!(archived.len(), 1);
        let suffix = archived[0].trim_start_matches("check-a-");
        assert!(suffix.parse::<i64>().is_ok(), "timestamp suffix: {suffix}");
        assert_eq!(archive.decompress(&archived[0]).await?.into_bytes(), before);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_rotation_skips_empty_logs() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let archive = Arc::new(FileLogArchive::new(dir.path()));
        archive.append("check-a", "entry").await?;
        let rotator = LogRotator::new(archive.clone());

        rotator.rotate_all().await;
        let report = rotator.rotate_all().await;

        assert_eq!(report, RotationReport { live: 1, archived: 0, empty: 1, failed: 0 });
        assert_eq!(archive.list(true).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_compression_failure_is_isolated() {
        let archive = Arc::new(MemoryArchive::default());
        archive.append("check-a", "one").await.unwrap();
        archive.append("check-b", "two").await.unwrap();
        archive.fail_compress("check-a");

        let report = LogRotator::new(archive.clone()).rotate_all().await;

        assert_eq!(report.archived, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(archive.lines("check-a"), vec!["one".to_string()]);
        assert!(archive.lines("check-b").is_empty());
    }
}
