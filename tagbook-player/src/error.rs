//! Error types for tagbook-player
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for tagbook-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (bad button action names, invalid wiring)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Errors bubbled up from the shared bootstrap code
    #[error(transparent)]
    Common(#[from] tagbook_common::Error),

    /// Audio daemon could not be reached or the connection dropped
    #[error("Audio daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// Audio daemon did not answer within the configured timeout
    #[error("Audio daemon timed out during '{0}'")]
    DaemonTimeout(String),

    /// Audio daemon rejected a command (ACK response)
    #[error("Audio daemon rejected '{command}': {message}")]
    DaemonCommand { command: String, message: String },

    /// Audio daemon sent something that is not valid protocol
    #[error("Audio daemon protocol error: {0}")]
    DaemonProtocol(String),

    /// Operation not valid in the current playback state
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Malformed RFID frame
    #[error("Invalid tag frame: {0}")]
    InvalidTag(String),

    /// File I/O errors (serial device, GPIO files)
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure is expected to clear up on a later attempt
    ///
    /// Daemon and storage faults are retried by the next poll cycle; the
    /// controller never treats them as fatal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::DaemonUnavailable(_)
                | Error::DaemonTimeout(_)
                | Error::DaemonProtocol(_)
                | Error::DaemonCommand { .. }
                | Error::Database(_)
        )
    }
}

/// Convenience Result type using tagbook-player Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_faults_are_transient() {
        assert!(Error::DaemonTimeout("status".to_string()).is_transient());
        assert!(Error::DaemonUnavailable("refused".to_string()).is_transient());
        assert!(!Error::InvalidTransition("pause".to_string()).is_transient());
        assert!(!Error::Config("bad".to_string()).is_transient());
    }

    #[test]
    fn test_command_error_message() {
        let err = Error::DaemonCommand {
            command: "seek".to_string(),
            message: "Bad song index".to_string(),
        };
        assert_eq!(err.to_string(), "Audio daemon rejected 'seek': Bad song index");
    }
}
