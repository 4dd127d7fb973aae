//! CLI error types and exit codes.

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, or runtime errors
    pub const GENERAL_ERROR: i32 = 1;
    /// Poll failure - no configured server could be polled
    pub const POLL_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Runtime or serialization error
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Every server in the fleet failed to poll
    #[error("Poll failed: {0}")]
    PollFailed(String),
}

impl CliError {
    /// Exit code for this error
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::PollFailed(_) => exit_codes::POLL_FAILURE,
            Self::Config(_) | Self::Runtime(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("x".into()).exit_code(), 1);
        assert_eq!(CliError::Runtime("x".into()).exit_code(), 1);
        assert_eq!(CliError::PollFailed("x".into()).exit_code(), 2);
    }
}
