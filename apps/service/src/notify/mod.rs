//! Outbound alert delivery.

pub mod twilio;

pub use twilio::TwilioNotifier;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notifier is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("Invalid notification: {0}")]
    InvalidMessage(String),
    #[error("Provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// Sends a text message to a user's phone
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError>;
}
