use std::time::Duration;

use thiserror::Error;

/// Why a wait on the readiness gate ended without a live instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("timed out after {0:?} waiting for the graph view")]
    Timeout(Duration),

    #[error("wait was cancelled")]
    Cancelled,

    #[error("graph view was shut down")]
    Closed,
}

/// Failures the explorer can surface to the user. Missing data and unmatched
/// search tokens are not errors; they come back as ordinary values.
#[derive(Error, Debug)]
pub enum ExplorerError {
    /// The request never produced a response
    #[error("Connection error: {0}")]
    Transport(String),

    /// Non-success HTTP status from a collaborator
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Collaborator answered with `success: false`
    #[error("Server error: {0}")]
    Backend(String),

    #[error("Malformed payload: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Graph view not ready: {0}")]
    NotReady(#[from] GateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display_carries_body() {
        let err = ExplorerError::Status { status: 500, body: "boom".into() };
        assert_eq!(err.to_string(), "Server returned 500: boom");
    }

    #[test]
    fn gate_errors_convert() {
        let err: ExplorerError = GateError::Cancelled.into();
        assert!(matches!(err, ExplorerError::NotReady(GateError::Cancelled)));
    }

    #[test]
    fn json_errors_convert() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ExplorerError = json_err.into();
        assert!(err.to_string().starts_with("Malformed payload"));
    }
}
