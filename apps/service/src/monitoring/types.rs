use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Observed state of a check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Up,
    /// Also the state of a check that has never been probed
    #[default]
    Down,
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Up => write!(f, "up"),
            CheckState::Down => write!(f, "down"),
        }
    }
}

/// Scheme used to reach a check's target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Protocol::Http),
            "https" => Some(Protocol::Https),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb a check is probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl CheckMethod {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "get" => Some(CheckMethod::Get),
            "post" => Some(CheckMethod::Post),
            "put" => Some(CheckMethod::Put),
            "delete" => Some(CheckMethod::Delete),
            _ => None,
        }
    }

    pub fn as_reqwest(&self) -> reqwest::Method {
        match self {
            CheckMethod::Get => reqwest::Method::GET,
            CheckMethod::Post => reqwest::Method::POST,
            CheckMethod::Put => reqwest::Method::PUT,
            CheckMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for CheckMethod {
    /// Upper-case verb, as it appears on the wire and in alert messages
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckMethod::Get => write!(f, "GET"),
            CheckMethod::Post => write!(f, "POST"),
            CheckMethod::Put => write!(f, "PUT"),
            CheckMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// A fully validated check, as stored in the `checks` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// 20 character identifier, also the name of the check's live log
    pub id: String,

    /// Phone number of the owning user, alerts are sent here
    pub user_phone: String,

    pub protocol: Protocol,

    /// Host, path and query without the scheme
    pub url: String,

    pub method: CheckMethod,

    /// Status codes that count as "up"
    pub success_codes: Vec<u16>,

    /// Request timeout, 1 to 5 seconds
    pub timeout_seconds: u64,

    pub state: CheckState,

    /// Epoch milliseconds of the last evaluation, absent if never checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<i64>,
}

impl Check {
    /// `protocol://url` as the probe requests it
    pub fn target(&self) -> String {
        format!("{}://{}", self.protocol, self.url)
    }

    pub fn has_been_checked(&self) -> bool {
        self.last_checked.is_some()
    }
}

/// Transport level failure of a probe
///
/// A non-success HTTP status is not a probe error, it is a response code
/// evaluated against the check's success codes.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum ProbeError {
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

/// Result of one probe attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// HTTP status code, absent on transport failure
    pub response_code: Option<u16>,

    pub error: Option<ProbeError>,

    /// Time until the response head arrived (or the failure surfaced)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl ProbeOutcome {
    pub fn response(code: u16, latency_ms: u64) -> Self {
        Self { response_code: Some(code), error: None, latency_ms: Some(latency_ms) }
    }

    pub fn failure(error: ProbeError, latency_ms: u64) -> Self {
        Self { response_code: None, error: Some(error), latency_ms: Some(latency_ms) }
    }
}

/// Audit record appended to a check's live log on every evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// The check as it was before this evaluation
    pub check: Check,
    pub outcome: ProbeOutcome,
    pub state: CheckState,
    pub alert_triggered: bool,
    /// Epoch milliseconds
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(ProbeError::Timeout("after 3s".into())).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "timeout", "detail": "after 3s" }));

        let json = serde_json::to_value(ProbeError::NetworkError("refused".into())).unwrap();
        assert_eq!(json["kind"], "network-error");
    }

    #[test]
    fn test_check_uses_camel_case_keys() {
        let check = Check {
            id: "abcdefghijklmnopqrst".into(),
            user_phone: "5551234567".into(),
            protocol: Protocol::Https,
            url: "example.com/health?full=1".into(),
            method: CheckMethod::Post,
            success_codes: vec![200, 201],
            timeout_seconds: 2,
            state: CheckState::Up,
            last_checked: None,
        };

        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["userPhone"], "5551234567");
        assert_eq!(json["successCodes"], serde_json::json!([200, 201]));
        assert_eq!(json["timeoutSeconds"], 2);
        assert!(json.get("lastChecked").is_none());
        assert_eq!(check.target(), "https://example.com/health?full=1");
    }

    #[test]
    fn test_method_display_is_upper_case() {
        assert_eq!(CheckMethod::Delete.to_string(), "DELETE");
        assert_eq!(CheckMethod::parse("GET"), None);
        assert_eq!(CheckMethod::parse("get"), Some(CheckMethod::Get));
    }
}
