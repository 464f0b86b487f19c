use thiserror::Error;

use crate::archive::ArchiveError;
use crate::monitoring::types::ProbeError;
use crate::monitoring::validation::Rejection;
use crate::notify::NotifyError;
use crate::storage::StorageError;

/// Failure of one unit of work: a single check's tick or a single log's rotation
///
/// Nothing here is fatal to the worker. Each error is logged where the unit of
/// work started and the next interval tries again.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    ValidationRejected(#[from] Rejection),

    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),

    #[error("notification failed: {0}")]
    Notification(#[from] NotifyError),

    #[error("archival failed: {0}")]
    Archival(#[from] ArchiveError),
}

impl WorkerError {
    /// Short stable label for structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerError::ValidationRejected(_) => "validation_rejected",
            WorkerError::Probe(ProbeError::NetworkError(_)) => "probe_network_error",
            WorkerError::Probe(ProbeError::Timeout(_)) => "probe_timeout",
            WorkerError::Persistence(_) => "persistence",
            WorkerError::Notification(_) => "notification",
            WorkerError::Archival(_) => "archival",
        }
    }
}
