//! OpenSSH subprocess transport
//!
//! Runs remote commands through the system `ssh` client rather than an
//! in-process SSH library. A control-master socket gives the connect-once,
//! run-many session semantics the poller expects: [`SshConnector::connect`]
//! establishes the master (and classifies failures from ssh's stderr),
//! [`SshSession::run`] reuses the socket per command, and `close` tears the
//! master down with `ssh -O exit`.
//!
//! Host keys are accepted on first contact (`StrictHostKeyChecking=accept-new`);
//! a key that later changes fails the connection with
//! [`ConnectError::HostKeyMismatch`].

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ConnectError, Connector, ExecOutput, RemoteSession, RunError};
use crate::config::ServerConfig;

/// Default timeout for establishing a connection (seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default timeout for one remote command (seconds)
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// How long the control master outlives its last client (seconds).
/// Must comfortably exceed the gap between battery commands.
const CONTROL_PERSIST_SECS: u64 = 60;

/// Distinguishes control sockets of concurrent sessions to the same host
static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens [`SshSession`]s using one private key for the whole fleet
#[derive(Debug, Clone)]
pub struct SshConnector {
    key_path: PathBuf,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl SshConnector {
    /// Creates a connector with the default timeouts
    #[must_use]
    pub fn new(key_path: PathBuf) -> Self {
        Self {
            key_path,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    /// Creates a connector with explicit connect and per-command timeouts
    #[must_use]
    pub const fn with_timeouts(
        key_path: PathBuf,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Self {
        Self {
            key_path,
            connect_timeout,
            command_timeout,
        }
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn RemoteSession>, ConnectError> {
        if !self.key_path.exists() {
            return Err(ConnectError::KeyNotFound(self.key_path.clone()));
        }

        let mut session = SshSession {
            destination: format!("{}@{}", server.user, server.host),
            host: server.host.clone(),
            key_path: self.key_path.clone(),
            control_path: control_socket_path(&server.host),
            connect_timeout: self.connect_timeout,
            command_timeout: self.command_timeout,
            connected: false,
        };
        session.establish().await?;
        Ok(Box::new(session))
    }
}

/// One established connection, multiplexed over an OpenSSH control socket
#[derive(Debug)]
pub struct SshSession {
    destination: String,
    host: String,
    key_path: PathBuf,
    control_path: PathBuf,
    connect_timeout: Duration,
    command_timeout: Duration,
    connected: bool,
}

impl SshSession {
    /// Base `ssh` invocation sharing the control socket
    fn base_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o").arg("BatchMode=yes");
        cmd.arg("-o").arg("StrictHostKeyChecking=accept-new");
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout.as_secs()));
        cmd.arg("-o").arg("ControlMaster=auto");
        cmd.arg("-o")
            .arg(format!("ControlPersist={CONTROL_PERSIST_SECS}"));
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        cmd.arg("-i").arg(&self.key_path);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }

    /// Establishes the control master by running a no-op remotely
    async fn establish(&mut self) -> Result<(), ConnectError> {
        let mut cmd = self.base_command();
        cmd.arg(&self.destination).arg("true");

        let timeout_secs = self.connect_timeout.as_secs();
        match tokio::time::timeout(self.connect_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => {
                self.connected = true;
                Ok(())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(classify_connect_failure(&stderr, &self.host, timeout_secs))
            }
            Ok(Err(e)) => Err(ConnectError::Unknown(format!(
                "Failed to spawn ssh process: {e}"
            ))),
            Err(_) => Err(ConnectError::Timeout(timeout_secs)),
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn run(&mut self, command: &str) -> Result<ExecOutput, RunError> {
        if !self.connected {
            return Err(RunError::NotConnected);
        }

        let mut cmd = self.base_command();
        cmd.arg(&self.destination).arg(command);

        let timeout_secs = self.command_timeout.as_secs();
        match tokio::time::timeout(self.command_timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                // 255 is ssh's own exit status for transport failures; any
                // other code came from the remote command and is data.
                if output.status.code() == Some(255) {
                    return Err(classify_run_failure(&stderr));
                }
                Ok(ExecOutput {
                    exit_code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                    stderr,
                })
            }
            Ok(Err(e)) => Err(RunError::Unknown(format!(
                "Failed to spawn ssh process: {e}"
            ))),
            Err(_) => Err(RunError::Timeout(timeout_secs)),
        }
    }

    async fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;

        let mut cmd = Command::new("ssh");
        cmd.arg("-O").arg("exit");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()));
        cmd.arg(&self.destination);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        // Best effort only; a dead master just means there is nothing to stop
        if tokio::time::timeout(self.command_timeout, cmd.output())
            .await
            .is_err()
        {
            tracing::debug!(host = %self.host, "Timed out stopping ssh control master");
        }
    }
}

/// Unique control socket path under the temp dir
fn control_socket_path(host: &str) -> PathBuf {
    let id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let safe_host: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    std::env::temp_dir().join(format!(
        "fleetmon-{}-{}-{}.sock",
        std::process::id(),
        id,
        safe_host
    ))
}

/// Maps ssh's stderr text from a failed connection to a [`ConnectError`]
fn classify_connect_failure(stderr: &str, host: &str, timeout_secs: u64) -> ConnectError {
    let lower = stderr.to_lowercase();
    if lower.contains("permission denied") || lower.contains("authentication failed") {
        ConnectError::AuthFailed
    } else if lower.contains("host key verification failed")
        || lower.contains("remote host identification has changed")
    {
        ConnectError::HostKeyMismatch
    } else if lower.contains("could not resolve hostname")
        || lower.contains("name or service not known")
    {
        ConnectError::DnsFailure(host.to_string())
    } else if lower.contains("timed out") {
        ConnectError::Timeout(timeout_secs)
    } else if lower.contains("connection refused")
        || lower.contains("connection reset")
        || lower.contains("connection closed")
        || lower.contains("protocol")
    {
        ConnectError::Protocol(stderr.trim().to_string())
    } else if stderr.trim().is_empty() {
        ConnectError::Unknown("ssh exited without diagnostics".to_string())
    } else {
        ConnectError::Unknown(stderr.trim().to_string())
    }
}

/// Maps ssh's stderr text from an exit-255 command to a [`RunError`]
fn classify_run_failure(stderr: &str) -> RunError {
    let lower = stderr.to_lowercase();
    if lower.contains("control socket")
        || lower.contains("mux_client")
        || lower.contains("broken pipe")
        || lower.contains("connection closed")
        || lower.contains("connection reset")
    {
        RunError::ChannelInactive
    } else if stderr.trim().is_empty() {
        RunError::Protocol("ssh exited with status 255".to_string())
    } else {
        RunError::Protocol(stderr.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerConfig {
        ServerConfig {
            name: "web-1".to_string(),
            host: "web.example.com".to_string(),
            user: "deploy".to_string(),
        }
    }

    #[tokio::test]
    async fn test_connect_missing_key_fails_fast() {
        let connector = SshConnector::new(PathBuf::from("/nonexistent/id_ed25519"));
        let err = connector.connect(&server()).await.unwrap_err();
        assert!(matches!(err, ConnectError::KeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_run_on_unconnected_session() {
        let mut session = SshSession {
            destination: "deploy@web.example.com".to_string(),
            host: "web.example.com".to_string(),
            key_path: PathBuf::from("/tmp/key"),
            control_path: PathBuf::from("/tmp/sock"),
            connect_timeout: Duration::from_secs(1),
            command_timeout: Duration::from_secs(1),
            connected: false,
        };
        assert_eq!(session.run("uptime").await, Err(RunError::NotConnected));
        // close on a never-connected session is a no-op, twice
        session.close().await;
        session.close().await;
    }

    #[test]
    fn test_classify_auth_failure() {
        let err = classify_connect_failure(
            "deploy@web: Permission denied (publickey,password).",
            "web",
            10,
        );
        assert_eq!(err, ConnectError::AuthFailed);
    }

    #[test]
    fn test_classify_host_key_mismatch() {
        let err = classify_connect_failure("Host key verification failed.", "web", 10);
        assert_eq!(err, ConnectError::HostKeyMismatch);

        let err = classify_connect_failure(
            "WARNING: REMOTE HOST IDENTIFICATION HAS CHANGED!",
            "web",
            10,
        );
        assert_eq!(err, ConnectError::HostKeyMismatch);
    }

    #[test]
    fn test_classify_dns_failure() {
        let err =
            classify_connect_failure("ssh: Could not resolve hostname web: ...", "web", 10);
        assert_eq!(err, ConnectError::DnsFailure("web".to_string()));
    }

    #[test]
    fn test_classify_timeout() {
        let err = classify_connect_failure(
            "ssh: connect to host web port 22: Connection timed out",
            "web",
            10,
        );
        assert_eq!(err, ConnectError::Timeout(10));
    }

    #[test]
    fn test_classify_refused_is_protocol() {
        let err = classify_connect_failure(
            "ssh: connect to host web port 22: Connection refused",
            "web",
            10,
        );
        assert!(matches!(err, ConnectError::Protocol(_)));
    }

    #[test]
    fn test_classify_unknown() {
        let err = classify_connect_failure("something novel happened", "web", 10);
        assert!(matches!(err, ConnectError::Unknown(_)));
    }

    #[test]
    fn test_classify_run_channel_inactive() {
        let err = classify_run_failure("mux_client_request_session: session request failed");
        assert_eq!(err, RunError::ChannelInactive);
    }

    #[test]
    fn test_classify_run_protocol() {
        let err = classify_run_failure("some ssh failure");
        assert!(matches!(err, RunError::Protocol(_)));
    }

    #[test]
    fn test_control_socket_paths_are_unique() {
        let a = control_socket_path("db.internal");
        let b = control_socket_path("db.internal");
        assert_ne!(a, b);
    }

    #[test]
    fn test_exec_output_success() {
        let ok = ExecOutput {
            exit_code: 0,
            stdout: "x".to_string(),
            stderr: String::new(),
        };
        assert!(ok.success());
        let bad = ExecOutput {
            exit_code: 1,
            ..ok
        };
        assert!(!bad.success());
    }
}
