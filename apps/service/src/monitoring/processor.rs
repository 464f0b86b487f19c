use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::{Check, CheckState, LogEntry, ProbeOutcome};
use crate::archive::LogArchive;
use crate::error::WorkerError;
use crate::notify::Notifier;
use crate::storage::{CHECKS, Storage, StorageError};

/// Decision taken for one probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub state: CheckState,
    pub alert_warranted: bool,
}

/// Decide the new state of `check` and whether the owner is told about it
///
/// A check that was never evaluated has no previous state to compare with,
/// so its first result never alerts, whatever it is.
pub fn evaluate(check: &Check, outcome: &ProbeOutcome) -> Evaluation {
    let up = outcome.error.is_none()
        && outcome.response_code.is_some_and(|code| check.success_codes.contains(&code));
    let state = if up { CheckState::Up } else { CheckState::Down };

    Evaluation { state, alert_warranted: check.has_been_checked() && state != check.state }
}

/// SMS body sent on a state transition
pub fn alert_message(check: &Check) -> String {
    format!(
        "Alert: your check for: {} {}://{} is currently {}",
        check.method, check.protocol, check.url, check.state
    )
}

/// Applies probe outcomes: audit log, persisted state, alert
pub struct OutcomeProcessor {
    storage: Arc<dyn Storage>,
    archive: Arc<dyn LogArchive>,
    notifier: Arc<dyn Notifier>,
}

impl OutcomeProcessor {
    pub fn new(
        storage: Arc<dyn Storage>,
        archive: Arc<dyn LogArchive>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { storage, archive, notifier }
    }

    /// Evaluate `outcome`, log it, persist the new state and alert if warranted
    ///
    /// No alert goes out when the new state could not be persisted.
    pub async fn process(
        &self,
        check: &Check,
        outcome: ProbeOutcome,
    ) -> Result<Evaluation, WorkerError> {
        let evaluation = evaluate(check, &outcome);
        let now = chrono::Utc::now().timestamp_millis();

        if let Some(error) = &outcome.error {
            let error = WorkerError::from(error.clone());
            debug!(check_id = %check.id, kind = error.kind(), "{error}");
        }

        let entry = LogEntry {
            check: check.clone(),
            outcome,
            state: evaluation.state,
            alert_triggered: evaluation.alert_warranted,
            timestamp: now,
        };
        self.append_log(&entry).await;

        let updated = Check { state: evaluation.state, last_checked: Some(now), ..check.clone() };
        let record = serde_json::to_value(&updated).map_err(StorageError::from)?;
        self.storage.update(CHECKS, &updated.id, &record).await?;

        if evaluation.alert_warranted {
            let message = alert_message(&updated);
            self.notifier.send(&updated.user_phone, &message).await?;
            info!(check_id = %updated.id, state = %updated.state, "Alerted owner: {message}");
        } else {
            debug!(check_id = %updated.id, state = %updated.state, "No state change, no alert");
        }

        Ok(evaluation)
    }

    /// A lost audit line does not stop the state update
    async fn append_log(&self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                warn!(check_id = %entry.check.id, "Failed to serialize log entry: {e}");
                return;
            }
        };

        if let Err(e) = self.archive.append(&entry.check.id, &line).await {
            warn!(check_id = %entry.check.id, "{}", WorkerError::from(e));
        }
    }
}
