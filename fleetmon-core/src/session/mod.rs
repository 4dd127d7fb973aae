//! Remote command-execution contract
//!
//! The poller drives metric collection through the [`Connector`] and
//! [`RemoteSession`] traits rather than a concrete transport, so tests can
//! script entire sessions without a network. The production implementation
//! is [`ssh::SshConnector`], which wraps the OpenSSH client subprocess.
//!
//! A session is single-host and runs one command at a time. Neither trait
//! retries implicitly; retry policy (if any) belongs to callers.

pub mod ssh;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ServerConfig;

pub use ssh::SshConnector;

/// Errors raised while establishing a session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The private key file does not exist
    #[error("SSH key file not found: {0}")]
    KeyNotFound(PathBuf),

    /// The remote host rejected the credentials
    #[error("SSH authentication failed - check key and permissions")]
    AuthFailed,

    /// The remote host key did not match the known value
    #[error("SSH host key verification failed")]
    HostKeyMismatch,

    /// The transport failed below the authentication layer
    #[error("SSH connection error: {0}")]
    Protocol(String),

    /// The connection attempt exceeded its deadline
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// The hostname did not resolve
    #[error("Could not resolve hostname: {0}")]
    DnsFailure(String),

    /// Anything the transport could not classify
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

/// Errors raised while running a command on an established session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The session was never connected or has been closed
    #[error("Not connected to server")]
    NotConnected,

    /// The underlying channel died between commands
    #[error("SSH connection is not active")]
    ChannelInactive,

    /// The command exceeded its deadline
    #[error("Command timeout after {0} seconds")]
    Timeout(u64),

    /// The transport failed while executing the command
    #[error("SSH error executing command: {0}")]
    Protocol(String),

    /// Anything the transport could not classify
    #[error("Error executing command: {0}")]
    Unknown(String),
}

/// Captured result of one remote command.
///
/// A non-zero `exit_code` is data, not an error: extractors decide what a
/// failed command means for their metric. [`RunError`] is reserved for
/// transport-level failures where no exit status exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Remote exit code (`-1` when the transport reported none)
    pub exit_code: i32,
    /// Captured standard output, trimmed
    pub stdout: String,
    /// Captured standard error, trimmed
    pub stderr: String,
}

impl ExecOutput {
    /// Whether the command exited cleanly
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An established channel to one host that runs commands sequentially
#[async_trait]
pub trait RemoteSession: Send + std::fmt::Debug {
    /// Runs one command, blocking up to the session's command timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] only for transport failures; a command that
    /// ran and exited non-zero is an `Ok` with that exit code.
    async fn run(&mut self, command: &str) -> Result<ExecOutput, RunError>;

    /// Releases the session. Idempotent; swallows its own errors.
    async fn close(&mut self);
}

/// Opens authenticated sessions to configured servers
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects to one server, blocking up to the connect timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectError`] classifying why the session could not
    /// be established.
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn RemoteSession>, ConnectError>;
}
