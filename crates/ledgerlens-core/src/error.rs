//! Error types for LedgerLens

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Extraction service is not configured")]
    ServiceUnavailable,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response from extraction service: {0}")]
    MalformedResponse(String),

    #[error("Document rejected: {0}")]
    InvalidDocument(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl Error {
    /// Whether this is a failure of the extraction service itself: the call
    /// did not complete, or the payload could not be decoded.
    ///
    /// A clean `InvalidDocument` classification is a legitimate rejection,
    /// not a service failure.
    pub fn is_service_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::MalformedResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_failure_classification() {
        assert!(Error::Transport("connection refused".into()).is_service_failure());
        assert!(Error::MalformedResponse("not json".into()).is_service_failure());
        assert!(!Error::InvalidDocument("not a financial document".into()).is_service_failure());
        assert!(!Error::ServiceUnavailable.is_service_failure());
    }
}
