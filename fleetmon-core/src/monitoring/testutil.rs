//! Scripted transport mocks shared by poller and collector tests

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::session::{ConnectError, Connector, ExecOutput, RemoteSession, RunError};

/// Command-to-result script for one session; later entries override earlier
#[derive(Debug, Clone, Default)]
pub struct ScriptedSession {
    responses: HashMap<String, Result<ExecOutput, RunError>>,
}

impl ScriptedSession {
    /// Empty script; every command exits unclean
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a clean exit with the given stdout
    #[must_use]
    pub fn ok(mut self, command: &str, stdout: &str) -> Self {
        self.responses.insert(
            command.to_string(),
            Ok(ExecOutput {
                exit_code: 0,
                stdout: stdout.trim().to_string(),
                stderr: String::new(),
            }),
        );
        self
    }

    /// Scripts a transport failure
    #[must_use]
    pub fn err(mut self, command: &str, error: RunError) -> Self {
        self.responses.insert(command.to_string(), Err(error));
        self
    }
}

/// One live mock session handed out by [`MockConnector::connect`]
#[derive(Debug)]
struct MockSessionInstance {
    script: ScriptedSession,
    close_count: Arc<AtomicUsize>,
    closed: bool,
}

#[async_trait]
impl RemoteSession for MockSessionInstance {
    async fn run(&mut self, command: &str) -> Result<ExecOutput, RunError> {
        if self.closed {
            return Err(RunError::NotConnected);
        }
        self.script
            .responses
            .get(command)
            .cloned()
            .unwrap_or_else(|| {
                Ok(ExecOutput {
                    exit_code: 127,
                    stdout: String::new(),
                    stderr: "command not scripted".to_string(),
                })
            })
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Connector yielding scripted sessions, with per-host connect failures
/// and counters for observing poller behavior
#[derive(Clone, Default)]
pub struct MockConnector {
    session: ScriptedSession,
    connect_error: Option<ConnectError>,
    failing_hosts: HashMap<String, ConnectError>,
    close_count: Arc<AtomicUsize>,
    connect_count: Arc<AtomicUsize>,
}

impl MockConnector {
    /// Every connect succeeds and yields a fresh copy of `session`
    #[must_use]
    pub fn with_session(session: ScriptedSession) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    /// Every connect fails with `error`
    #[must_use]
    pub fn failing(error: ConnectError) -> Self {
        Self {
            connect_error: Some(error),
            ..Self::default()
        }
    }

    /// Makes connects to one host fail while others succeed
    #[must_use]
    pub fn failing_host(mut self, host: &str, error: ConnectError) -> Self {
        self.failing_hosts.insert(host.to_string(), error);
        self
    }

    /// How many sessions have been closed so far
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// How many connects have been attempted so far
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, server: &ServerConfig) -> Result<Box<dyn RemoteSession>, ConnectError> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.failing_hosts.get(&server.host) {
            return Err(error.clone());
        }
        if let Some(error) = &self.connect_error {
            return Err(error.clone());
        }
        Ok(Box::new(MockSessionInstance {
            script: self.session.clone(),
            close_count: Arc::clone(&self.close_count),
            closed: false,
        }))
    }
}
