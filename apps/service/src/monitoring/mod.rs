/// Monitoring engine module - the check pipeline
///
/// This module is responsible for:
/// - Validating stored check records
/// - Probing HTTP/HTTPS targets
/// - Deciding state transitions and alerts
/// - Sweeping all checks on a fixed cadence
pub mod checker;
pub mod processor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{HttpProber, Prober};
pub use processor::OutcomeProcessor;
pub use scheduler::{CheckScheduler, SweepReport};
