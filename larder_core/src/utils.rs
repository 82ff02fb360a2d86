use crate::error::ProviderError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

pub const USER_AGENT: &str = concat!(
    "larder/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/larder-dev/larder)"
);

/// Kilojoules per kilocalorie.
pub const KJ_PER_KCAL: f64 = 4.184;

/// Longest upstream error body kept in a [`ProviderError::Status`].
const MAX_ERROR_BODY: usize = 300;

/// HTTP client with the provider's timeout applied to every request.
pub fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Send `request` and decode a JSON body.
///
/// A 404 is reported as `Ok(None)` so lookups can tell "unknown item" apart
/// from a failing provider. Any other non-2xx status is an error.
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<Option<T>, ProviderError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let body = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body: truncate(&body, MAX_ERROR_BODY),
        });
    }

    Ok(Some(serde_json::from_str(&body)?))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Read a number that may arrive as a JSON number or a numeric string.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Serde helper for optional fields that providers send as either numbers or
/// strings. Anything unparseable becomes `None`.
pub fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_number))
}

/// Non-negative figure, or zero when missing.
pub fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// Strip whitespace and leading zeros so GTIN/UPC variants compare equal.
pub fn canonical_barcode(code: &str) -> String {
    let trimmed = code.trim().trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
