use std::time::{Duration, Instant};

use url::Url;

use super::types::{Check, ProbeError, ProbeOutcome};

/// Issues a single probe against a check's target
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Probe the check once. Transport failures are part of the outcome,
    /// this never fails on its own.
    async fn probe(&self, check: &Check) -> ProbeOutcome;
}

/// HTTP/HTTPS prober
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> reqwest::Result<Self> {
        // Redirects are reported as-is, a 301 is only "up" if the check lists it.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self, check: &Check) -> ProbeOutcome {
        let start = Instant::now();

        let target = match Url::parse(&check.target()) {
            Ok(target) => target,
            Err(e) => {
                return ProbeOutcome::failure(
                    ProbeError::NetworkError(format!("invalid target {}: {e}", check.target())),
                    0,
                );
            }
        };

        // The timeout covers connect through response head and is enforced by
        // the client. A single awaited send yields exactly one outcome.
        let timeout = Duration::from_secs(check.timeout_seconds);
        let result = self
            .client
            .request(check.method.as_reqwest(), target)
            .timeout(timeout)
            .send()
            .await;

        let latency = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => ProbeOutcome::response(response.status().as_u16(), latency),
            Err(e) => ProbeOutcome::failure(classify(e, timeout), latency),
        }
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout(format!("no response within {}ms", timeout.as_millis()))
    } else {
        ProbeError::NetworkError(error_chain(&error))
    }
}

/// reqwest's top-level message hides the cause ("error sending request")
fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
