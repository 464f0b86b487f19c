use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use super::checker::Prober;
use super::processor::{Evaluation, OutcomeProcessor};
use super::validation::validate_check;
use crate::error::WorkerError;
use crate::storage::{CHECKS, Storage};

/// Tally of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub listed: usize,
    pub processed: usize,
    pub rejected: usize,
    pub failed: usize,
    pub alerts: usize,
    /// Alerts whose state change was saved but whose SMS did not go out
    pub notify_failed: usize,
}

/// Sweeps every stored check through validate, probe and process
pub struct CheckScheduler {
    storage: Arc<dyn Storage>,
    prober: Arc<dyn Prober>,
    processor: Arc<OutcomeProcessor>,
    max_concurrent: usize,
}

impl CheckScheduler {
    /// `max_concurrent` bounds how many checks of one sweep are in flight at once
    pub fn new(
        storage: Arc<dyn Storage>,
        prober: Arc<dyn Prober>,
        processor: Arc<OutcomeProcessor>,
        max_concurrent: usize,
    ) -> Self {
        Self { storage, prober, processor, max_concurrent: max_concurrent.max(1) }
    }

    /// Run one check's pipeline. Steps are strictly sequential.
    pub async fn run_check(&self, id: &str) -> Result<Evaluation, WorkerError> {
        let raw = self.storage.read(CHECKS, id).await?;
        let check = validate_check(&raw)?;
        let outcome = self.prober.probe(&check).await;
        self.processor.process(&check, outcome).await
    }

    /// One pass over all stored checks
    ///
    /// Checks run independently and in no particular order; a failing check
    /// is logged and counted, the rest of the sweep carries on.
    pub async fn sweep(self: &Arc<Self>) -> SweepReport {
        let mut report = SweepReport::default();

        let ids = match self.storage.list(CHECKS).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list checks: {}", WorkerError::from(e));
                return report;
            }
        };
        report.listed = ids.len();

        if ids.is_empty() {
            debug!("No checks to process");
            return report;
        }

        // Permits belong to this sweep only. An overlapping sweep gets its own,
        // so sweeps never queue up behind each other.
        let permits = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();
        for id in ids {
            let scheduler = Arc::clone(self);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // Semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                let result = scheduler.run_check(&id).await;
                (id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(evaluation))) => {
                    report.processed += 1;
                    if evaluation.alert_warranted {
                        report.alerts += 1;
                    }
                }
                Ok((id, Err(WorkerError::Notification(e)))) => {
                    // Only raised after the new state was persisted
                    report.processed += 1;
                    report.alerts += 1;
                    report.notify_failed += 1;
                    warn!(check_id = %id, "Could not alert owner: {e}");
                }
                Ok((id, Err(WorkerError::ValidationRejected(rejection)))) => {
                    report.rejected += 1;
                    warn!(check_id = %id, "Skipping malformed check: {rejection}");
                }
                Ok((id, Err(e))) => {
                    report.failed += 1;
                    warn!(check_id = %id, kind = e.kind(), "Check failed: {e}");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Check task aborted: {e}");
                }
            }
        }

        report
    }

    /// Sweep now and then every `every`, until the returned task is aborted
    ///
    /// Each sweep runs on its own task, so a slow sweep can overlap the next.
    /// Overlap is tolerated: updates are last-write-wins per check and at worst
    /// a check is logged twice.
    pub fn start_periodic(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut timer = interval(every);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    let report = scheduler.sweep().await;
                    info!(
                        "Sweep finished: {} listed, {} processed, {} rejected, {} failed, {} alerts ({} undelivered)",
                        report.listed,
                        report.processed,
                        report.rejected,
                        report.failed,
                        report.alerts,
                        report.notify_failed
                    );
                });
            }
        })
    }
}
