use std::time::Duration;

/// Failure inside a single provider adapter.
///
/// Never surfaces through the façade: the orchestrator turns it into an
/// empty result and records it on the search report.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ProviderError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ProviderError::Http(e) if e.is_timeout() => "timeout",
            ProviderError::Http(_) => "upstream_error",
            ProviderError::Status { status, .. } if *status == 429 => "rate_limited",
            ProviderError::Status { .. } => "upstream_error",
            ProviderError::Parse(_) => "parse_error",
            ProviderError::Timeout(_) => "timeout",
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Io(_) => "io_error",
            ProviderError::Catalog(_) => "catalog_error",
            ProviderError::Url(_) => "internal_error",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            ProviderError::Timeout(_) => true,
            ProviderError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Caller-side input errors, rejected before any provider is contacted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Search query exceeds {max} characters")]
    QueryTooLong { max: usize },

    #[error("Malformed barcode '{0}': expected 8, 12, 13 or 14 digits")]
    InvalidBarcode(String),
}

impl SearchError {
    pub fn code_str(&self) -> &'static str {
        match self {
            SearchError::EmptyQuery => "empty_query",
            SearchError::QueryTooLong { .. } => "query_too_long",
            SearchError::InvalidBarcode(_) => "invalid_barcode",
        }
    }
}

/// Why a record was refused at the orchestrator boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidRecord {
    #[error("record has an empty name")]
    EmptyName,

    #[error("record has an empty source id")]
    EmptySourceId,

    #[error("{field} is negative or not a number ({value})")]
    BadMacro { field: &'static str, value: f64 },

    #[error("serving size must be positive ({0})")]
    BadServing(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_codes() {
        assert_eq!(
            ProviderError::Timeout(Duration::from_secs(5)).code_str(),
            "timeout"
        );
        assert!(ProviderError::Timeout(Duration::from_secs(5)).is_timeout());
        assert_eq!(
            ProviderError::Status {
                status: 429,
                body: String::new()
            }
            .code_str(),
            "rate_limited"
        );
        assert_eq!(
            ProviderError::Status {
                status: 503,
                body: "down".into()
            }
            .code_str(),
            "upstream_error"
        );
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(ProviderError::from(parse).code_str(), "parse_error");
    }

    #[test]
    fn test_search_error_messages() {
        assert_eq!(SearchError::EmptyQuery.code_str(), "empty_query");
        assert!(SearchError::InvalidBarcode("12ab".into())
            .to_string()
            .contains("12ab"));
    }
}
