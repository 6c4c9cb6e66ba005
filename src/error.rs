use thiserror::Error;

/// Failures at the HTTP boundary. None of these escape the cache; they are
/// logged and turned into a missing value.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("GitHub rejected the token (401) for {url}")]
    AuthInvalid { url: String },

    #[error("GitHub API rate limit exceeded (403) for {url}")]
    RateLimited { url: String },

    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Response from {url} is not valid JSON: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Conditions that are surfaced to the user instead of being absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiSignal {
    AuthInvalid,
    RateLimited,
}

impl FetchError {
    pub fn signal(&self) -> Option<ApiSignal> {
        match self {
            FetchError::AuthInvalid { .. } => Some(ApiSignal::AuthInvalid),
            FetchError::RateLimited { .. } => Some(ApiSignal::RateLimited),
            _ => None,
        }
    }
}
