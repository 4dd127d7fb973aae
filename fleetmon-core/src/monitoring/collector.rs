//! Scheduling collector and fleet snapshot store
//!
//! [`MetricsCollector`] owns the refresh lifecycle: `start` performs one
//! synchronous full poll (so the first consumer read is never empty) and
//! then launches a background loop that re-polls the fleet every refresh
//! interval; `stop` signals the loop and waits for it with a bound.
//!
//! The snapshot store is replaced wholesale after each cycle, so readers
//! always see a complete fleet from a single cycle, never a mix. The
//! store lock is held only for the swap or the copy-out, never across an
//! await or any network operation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::metrics::FleetSnapshot;
use super::poller::ServerPoller;
use crate::config::{MonitorConfig, ServerConfig};
use crate::session::{Connector, SshConnector};

/// Bounded wait for the refresh loop to terminate after a stop signal.
/// If the loop is stuck in a slow poll, `stop` proceeds without it.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the spawned refresh loop
struct RunningLoop {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Collects fleet metrics on a schedule and publishes atomic snapshots
pub struct MetricsCollector {
    config: MonitorConfig,
    poller: ServerPoller,
    store: Arc<RwLock<FleetSnapshot>>,
    running: AtomicBool,
    run_state: Mutex<Option<RunningLoop>>,
}

impl MetricsCollector {
    /// Creates a collector over an explicit transport.
    ///
    /// The configuration must already be validated; see
    /// [`MonitorConfig::load`](crate::config::MonitorConfig::load).
    #[must_use]
    pub fn new(config: MonitorConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            poller: ServerPoller::new(connector),
            store: Arc::new(RwLock::new(FleetSnapshot::new())),
            running: AtomicBool::new(false),
            run_state: Mutex::new(None),
            config,
        }
    }

    /// Creates a collector using the OpenSSH subprocess transport with
    /// the key path from the configuration
    #[must_use]
    pub fn with_ssh_transport(config: MonitorConfig) -> Self {
        let connector = Arc::new(SshConnector::new(config.key_path()));
        Self::new(config, connector)
    }

    /// Starts collection: one full poll now, then the background loop.
    ///
    /// No-op when already running.
    pub async fn start(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let fleet = self.poller.poll_fleet(&self.config.servers).await;
        publish(&self.store, fleet);

        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let handle = spawn_refresh_loop(
            self.poller.clone(),
            self.config.servers.clone(),
            Arc::clone(&self.store),
            self.config.refresh_interval(),
            stop_rx,
        );

        let mut state = lock_state(&self.run_state);
        if self.running.load(Ordering::SeqCst) {
            *state = Some(RunningLoop { stop_tx, handle });
        } else {
            // stop raced the initial poll; tear the fresh loop down
            handle.abort();
        }
    }

    /// Stops the background loop and waits for it with a bound.
    ///
    /// No-op when not running. After this returns, no further snapshot
    /// publications occur.
    pub async fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let state = lock_state(&self.run_state).take();
        let Some(RunningLoop { stop_tx, handle }) = state else {
            return;
        };

        let _ = stop_tx.send(()).await;
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, handle).await.is_err() {
            tracing::warn!(
                timeout_secs = STOP_JOIN_TIMEOUT.as_secs(),
                "Refresh loop did not terminate in time, proceeding with shutdown"
            );
        }
    }

    /// Independent copy of the latest fleet snapshot.
    ///
    /// Never blocks on an in-progress poll; mutating the returned map has
    /// no effect on the store. Empty until the first `start`.
    #[must_use]
    pub fn snapshot(&self) -> FleetSnapshot {
        match self.store.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Whether the background loop is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Configured refresh interval, exposed as a cadence hint for consumers
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        self.config.refresh_interval()
    }
}

/// Spawns the periodic refresh loop.
///
/// Each iteration polls the whole fleet, publishes the snapshot, then
/// waits out the refresh interval. The wait races the stop channel, so a
/// stop request interrupts it immediately instead of after the full
/// interval. A failed or slow cycle never terminates the loop.
fn spawn_refresh_loop(
    poller: ServerPoller,
    servers: Vec<ServerConfig>,
    store: Arc<RwLock<FleetSnapshot>>,
    interval: Duration,
    mut stop_rx: mpsc::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                () = refresh_cycle(&poller, &servers, &store, interval) => {}
            }
        }
        tracing::debug!("Refresh loop terminated");
    })
}

/// One full cycle: poll, publish, sleep
async fn refresh_cycle(
    poller: &ServerPoller,
    servers: &[ServerConfig],
    store: &RwLock<FleetSnapshot>,
    interval: Duration,
) {
    let started = std::time::Instant::now();
    let fleet = poller.poll_fleet(servers).await;
    let errors = fleet
        .values()
        .filter(|s| s.error.is_some())
        .count();
    publish(store, fleet);
    tracing::debug!(
        servers = servers.len(),
        errors,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Refresh cycle complete"
    );
    tokio::time::sleep(interval).await;
}

/// Atomically replaces the stored snapshot
fn publish(store: &RwLock<FleetSnapshot>, fleet: FleetSnapshot) {
    let mut guard = match store.write() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    *guard = fleet;
}

/// Locks the run-state mutex, recovering from poisoning
fn lock_state(state: &Mutex<Option<RunningLoop>>) -> std::sync::MutexGuard<'_, Option<RunningLoop>> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
