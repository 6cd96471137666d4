use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status { status: StatusCode, url: String },

    #[error("cannot write download: {0}")]
    Io(#[from] std::io::Error),

    #[error("no version tag for '{dictionary_id}' found on the download page")]
    VersionNotFound { dictionary_id: String },

    #[error("invalid version pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: StatusCode) -> FetchError {
        FetchError::Status {
            status: code,
            url: "https://example.org".to_string(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retryable() {
        assert!(status(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(status(StatusCode::TOO_MANY_REQUESTS).is_retryable());
        assert!(!status(StatusCode::NOT_FOUND).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(
            !FetchError::VersionNotFound {
                dictionary_id: "concised".to_string()
            }
            .is_retryable()
        );
    }
}
