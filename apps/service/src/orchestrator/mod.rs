/// Orchestrator module - owns the background workers
///
/// The worker service wires storage, the prober, the notifier and the log
/// archive together and runs two independent loops:
/// - the check scheduler, sweeping all checks every minute
/// - the log rotator, archiving live logs once a day
///
/// Both loops fire once immediately at start.

pub mod rotation;

pub use rotation::{LogRotator, RotationReport};

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::archive::LogArchive;
use crate::config::WorkerConfig;
use crate::monitoring::{CheckScheduler, OutcomeProcessor, Prober, SweepReport};
use crate::notify::Notifier;
use crate::storage::Storage;

/// Background worker service
pub struct WorkerService {
    scheduler: Arc<CheckScheduler>,
    rotator: Arc<LogRotator>,
    check_interval: Duration,
    rotation_interval: Duration,
    scheduler_handle: Option<JoinHandle<()>>,
    rotator_handle: Option<JoinHandle<()>>,
}

impl WorkerService {
    pub fn new(
        config: &WorkerConfig,
        storage: Arc<dyn Storage>,
        archive: Arc<dyn LogArchive>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let processor = Arc::new(OutcomeProcessor::new(storage.clone(), archive.clone(), notifier));
        let scheduler = Arc::new(CheckScheduler::new(
            storage,
            prober,
            processor,
            config.max_concurrent_checks,
        ));

        Self {
            scheduler,
            rotator: Arc::new(LogRotator::new(archive)),
            check_interval: config.check_interval(),
            rotation_interval: config.rotation_interval(),
            scheduler_handle: None,
            rotator_handle: None,
        }
    }

    /// Start both loops. Calling this on a running service is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        info!(
            "Background workers are running (checks every {:?}, log rotation every {:?})",
            self.check_interval, self.rotation_interval
        );
        self.scheduler_handle = Some(self.scheduler.clone().start_periodic(self.check_interval));
        self.rotator_handle = Some(self.rotator.clone().start_periodic(self.rotation_interval));
    }

    pub fn is_running(&self) -> bool {
        self.scheduler_handle.as_ref().is_some_and(|h| !h.is_finished())
            || self.rotator_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// One sweep and one rotation, without the timers
    pub async fn run_once(&self) -> (SweepReport, RotationReport) {
        let sweep = self.scheduler.sweep().await;
        let rotation = self.rotator.rotate_all().await;
        (sweep, rotation)
    }

    /// Stop both loops
    ///
    /// Sweeps already in flight are detached and finish on their own; a probe
    /// is never cancelled halfway through its pipeline.
    pub async fn shutdown(&mut self) {
        for handle in [self.scheduler_handle.take(), self.rotator_handle.take()].into_iter().flatten() {
            handle.abort();
            let _ = handle.await;
        }
        info!("Background workers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::FileLogArchive;
    use crate::monitoring::types::{CheckState, ProbeOutcome};
    use crate::storage::{CHECKS, FileStorage};
    use crate::test_support::{RecordingNotifier, StaticProber, sample_check};
    use serde_json::json;
    use tempfile::tempdir;

    fn fast_config() -> WorkerConfig {
        WorkerConfig { check_interval_seconds: 3600, rotation_interval_seconds: 3600, max_concurrent_checks: 4 }
    }

    #[tokio::test]
    async fn test_run_once_end_to_end() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(FileStorage::new(dir.path().join("data")));
        let archive = Arc::new(FileLogArchive::new(dir.path().join("logs")));
        let notifier = Arc::new(RecordingNotifier::default());
        let check = sample_check();
        storage.create(CHECKS, &check.id, &serde_json::to_value(&check)?).await?;

        let service = WorkerService::new(
            &fast_config(),
            storage.clone(),
            archive.clone(),
            Arc::new(StaticProber::new(ProbeOutcome::response(200, 3))),
            notifier.clone(),
        );

        let (sweep, rotation) = service.run_once().await;

        assert_eq!(sweep.processed, 1);
        assert_eq!(rotation.archived, 1);
        // First evaluation, no alert
        assert!(notifier.sent().is_empty());
        let stored = storage.read(CHECKS, &check.id).await?;
        assert_eq!(stored["state"], json!(CheckState::Up));
        assert_eq!(std::fs::metadata(dir.path().join(format!("logs/{}.log", check.id)))?.len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_start_and_shutdown() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let storage = Arc::new(FileStorage::new(dir.path().join("data")));
        let archive = Arc::new(FileLogArchive::new(dir.path().join("logs")));

        let mut service = WorkerService::new(
            &fast_config(),
            storage,
            archive,
            Arc::new(StaticProber::new(ProbeOutcome::response(200, 3))),
            Arc::new(RecordingNotifier::default()),
        );

        service.start();
        assert!(service.is_running());
        service.start();

        service.shutdown().await;
        assert!(!service.is_running());
        Ok(())
    }
}
