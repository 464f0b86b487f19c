use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{Notifier, NotifyError};
use crate::config::TwilioConfig;

const PHONE_LENGTH: usize = 10;
const MAX_MESSAGE_LENGTH: usize = 1600;

/// SMS delivery through the Twilio Messages API
pub struct TwilioNotifier {
    client: Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        let phone = phone.trim();
        let message = message.trim();

        if phone.chars().count() != PHONE_LENGTH {
            return Err(NotifyError::InvalidMessage(format!("phone number {phone:?} is not 10 digits")));
        }
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_LENGTH {
            return Err(NotifyError::InvalidMessage(format!(
                "message must be 1 to {MAX_MESSAGE_LENGTH} characters"
            )));
        }
        if self.config.account_sid.is_empty() || self.config.auth_token.is_empty() {
            return Err(NotifyError::NotConfigured("twilio account_sid and auth_token are required"));
        }

        let to = format!("{}{}", self.config.country_prefix, phone);
        let form = [("From", self.config.from_phone.as_str()), ("To", to.as_str()), ("Body", message)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status == 200 || status == 201 {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected { status, body })
        }
    }
}
