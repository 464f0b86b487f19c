//! Normalization of raw check records read from storage.
//!
//! The CRUD layer and the scheduler share the `checks` collection, so a record
//! can be hand edited, half written or produced by an older version. Every
//! field is checked on its own; a field that fails its rule is treated as
//! missing, and a record missing any required field never reaches the probe.

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{Check, CheckMethod, CheckState, Protocol};

pub const ID_LENGTH: usize = 20;
pub const PHONE_LENGTH: usize = 10;
pub const MIN_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_TIMEOUT_SECONDS: u64 = 5;

/// A stored record that cannot be probed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("check {} rejected, invalid or missing: {}", .id.as_deref().unwrap_or("<unknown>"), .missing.join(", "))]
pub struct Rejection {
    /// The record's id when that field itself was valid
    pub id: Option<String>,
    pub missing: Vec<&'static str>,
}

/// Validate a raw stored record into a [`Check`]
///
/// `state` defaults to down and `lastChecked` to "never" when absent or
/// malformed. This is the only place those defaults are applied.
pub fn validate_check(raw: &Value) -> Result<Check, Rejection> {
    let empty = Map::new();
    let record = raw.as_object().unwrap_or(&empty);

    let id = trimmed_with_len(record.get("id"), ID_LENGTH);
    let user_phone = trimmed_with_len(record.get("userPhone"), PHONE_LENGTH);
    let protocol = record.get("protocol").and_then(Value::as_str).and_then(Protocol::parse);
    let url = record
        .get("url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string);
    let method = record.get("method").and_then(Value::as_str).and_then(CheckMethod::parse);
    let success_codes = success_codes(record.get("successCodes"));
    let timeout_seconds = record
        .get("timeoutSeconds")
        .and_then(whole_number)
        .filter(|secs| (MIN_TIMEOUT_SECONDS..=MAX_TIMEOUT_SECONDS).contains(secs));

    let state = match record.get("state").and_then(Value::as_str) {
        Some("up") => CheckState::Up,
        _ => CheckState::Down,
    };
    let last_checked = record
        .get("lastChecked")
        .and_then(Value::as_f64)
        .filter(|ts| *ts > 0.0)
        .map(|ts| ts as i64);

    match (id, user_phone, protocol, url, method, success_codes, timeout_seconds) {
        (
            Some(id),
            Some(user_phone),
            Some(protocol),
            Some(url),
            Some(method),
            Some(success_codes),
            Some(timeout_seconds),
        ) => Ok(Check {
            id,
            user_phone,
            protocol,
            url,
            method,
            success_codes,
            timeout_seconds,
            state,
            last_checked,
        }),
        (id, user_phone, protocol, url, method, success_codes, timeout_seconds) => {
            let missing = [
                ("id", id.is_none()),
                ("userPhone", user_phone.is_none()),
                ("protocol", protocol.is_none()),
                ("url", url.is_none()),
                ("method", method.is_none()),
                ("successCodes", success_codes.is_none()),
                ("timeoutSeconds", timeout_seconds.is_none()),
            ]
            .into_iter()
            .filter_map(|(field, absent)| absent.then_some(field))
            .collect();

            Err(Rejection { id, missing })
        }
    }
}

fn trimmed_with_len(value: Option<&Value>, len: usize) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| s.chars().count() == len)
        .map(str::to_string)
}

/// Accepts `3` and `3.0`, rejects `3.5` and negatives
fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value.as_f64().filter(|n| n.fract() == 0.0 && *n >= 0.0).map(|n| n as u64)
}

fn success_codes(value: Option<&Value>) -> Option<Vec<u16>> {
    let codes = value?.as_array()?;
    if codes.is_empty() {
        return None;
    }

    codes
        .iter()
        .map(|code| whole_number(code).and_then(|code| u16::try_from(code).ok()))
        .collect()
}
