//! Error types for the algorithm visualizer.

use thiserror::Error;

/// A specialized `Result` type for visualizer operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Defines the errors that can occur within the `algoviz` crate.
#[derive(Error, Debug)]
pub enum Error {
    /// The run that issued the call is no longer the live run.
    ///
    /// Raised by [`RunController::pause_if_needed`](crate::RunController::pause_if_needed)
    /// and friends when a newer run superseded this one or the user stopped it.
    /// Step sequences propagate it with `?`; the run driver swallows it.
    #[error("Algorithm run was cancelled")]
    RunCancelled,

    /// No algorithm is registered under the requested identifier.
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The input supplied for an algorithm could not be used.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An error related to the web server (e.g., binding to a port).
    #[error("Server error: {0}")]
    Server(String),

    /// An error related to WebSocket communication.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// An error related to the server's configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An error that occurred during data serialization or deserialization.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An error from the underlying I/O system.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for the cooperative cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::RunCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (Error::RunCancelled, "Algorithm run was cancelled"),
            (
                Error::UnknownAlgorithm("bogoSort".into()),
                "Unknown algorithm: bogoSort",
            ),
            (
                Error::InvalidInput("empty array".into()),
                "Invalid input: empty array",
            ),
            (Error::Server("bind failed".into()), "Server error: bind failed"),
            (
                Error::WebSocket("connection closed".into()),
                "WebSocket error: connection closed",
            ),
            (
                Error::Config("invalid port".into()),
                "Configuration error: invalid port",
            ),
        ];

        for (error, expected) in errors {
            assert_eq!(format!("{}", error), expected);
        }
    }

    #[test]
    fn test_is_cancelled() {
        assert!(Error::RunCancelled.is_cancelled());
        assert!(!Error::Server("x".into()).is_cancelled());
        assert!(!Error::UnknownAlgorithm("x".into()).is_cancelled());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port in use");
        let error: Error = io_err.into();
        assert!(matches!(error, Error::Io(_)));
        assert!(format!("{}", error).contains("IO error"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_result: std::result::Result<serde_json::Value, _> = serde_json::from_str("not json");
        let error: Error = json_result.unwrap_err().into();
        assert!(matches!(error, Error::Serialization(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_error() -> Result<()> {
            Err(Error::RunCancelled)
        }
        assert!(returns_error().is_err());
    }
}
