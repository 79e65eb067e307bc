//! Reconnecting Client Wrapper
//!
//! Owns a single underlying connection handle and a reconnect timer, and
//! forwards get/set to the current connection. When the connection drops in
//! custom-reconnect mode, the wrapper schedules fixed-delay reconnect
//! attempts until one succeeds, the retry budget runs out, or close() is
//! called.
//!
//! All wrapper state lives behind one std mutex that is never held across an
//! await point; connection watchers and timers report back through a signal
//! channel consumed by a single driver task, so at most one reconnect
//! attempt is ever in flight.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::state::{ConnectionState, Effect, LifecycleEvent, StateMachine};
use crate::client::stats::ClientStats;
use crate::client::timer::ReconnectTimer;
use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::transport::{Connection, Transport};

// == Internal Signals ==
/// Messages from timers and connection watchers to the driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// The pending reconnect timer elapsed
    TimerElapsed,
    /// The connection installed at `generation` dropped
    ConnectionLost {
        /// Generation counter of the connection the notification belongs to
        generation: u64,
    },
}

// == Shared State ==
/// Mutable wrapper state, guarded by a single mutex.
struct Shared<C> {
    machine: StateMachine,
    conn: Option<Arc<C>>,
    timer: Option<ReconnectTimer>,
    /// Incremented every time a connection is installed, so lost
    /// notifications from replaced connections are ignored.
    generation: u64,
}

struct Inner<T: Transport> {
    transport: T,
    config: Config,
    shared: StdMutex<Shared<T::Conn>>,
    signals: mpsc::UnboundedSender<Signal>,
    state_tx: watch::Sender<ConnectionState>,
    stats: StdMutex<ClientStats>,
    shutdown: CancellationToken,
}

// == Reconnecting Client ==
/// A cache client that re-establishes its connection after failures.
pub struct ReconnectingClient<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> ReconnectingClient<T> {
    // == Constructor ==
    /// Creates a new wrapper around `transport` with the given configuration.
    ///
    /// The wrapper starts Disconnected; call [`connect`](Self::connect) to
    /// establish the first connection.
    pub fn new(transport: T, config: Config) -> Self {
        let (signals, signal_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        let inner = Arc::new(Inner {
            shared: StdMutex::new(Shared {
                machine: StateMachine::new(&config),
                conn: None,
                timer: None,
                generation: 0,
            }),
            transport,
            config,
            signals,
            state_tx,
            stats: StdMutex::new(ClientStats::new()),
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(drive(inner.clone(), signal_rx));

        Self { inner }
    }

    // == Connect ==
    /// Establishes the underlying connection.
    ///
    /// Fails with [`ClientError::Connection`] if the target is unreachable,
    /// or [`ClientError::Timeout`] if it does not answer within the
    /// configured timeout. A no-op when already connected; an error while a
    /// connect or reconnect attempt is already in flight.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut shared = self.inner.lock_shared();
            if shared.machine.is_closed() {
                return Err(ClientError::Closed);
            }
            match shared.machine.state() {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => {
                    return Err(ClientError::Connection(
                        "connect already in progress".to_string(),
                    ))
                }
                ConnectionState::Disconnected => {}
                ConnectionState::Closed => return Err(ClientError::Closed),
            }
            shared.machine.apply(LifecycleEvent::ConnectRequested);
            self.inner.publish_state(&shared);
        }

        match dial_once(&self.inner).await {
            Ok(conn) => {
                let mut shared = self.inner.lock_shared();
                let effects = shared.machine.apply(LifecycleEvent::ConnectSucceeded);
                if effects.contains(&Effect::DropConnection) {
                    // close() won the race against the in-flight dial.
                    drop(shared);
                    conn.close().await;
                    return Err(ClientError::Closed);
                }
                install_connection(&self.inner, &mut shared, conn);
                self.inner.publish_state(&shared);
                drop(shared);
                self.inner.record(|s| s.record_connect());
                info!(address = %self.inner.config.address, "connected");
                Ok(())
            }
            Err(e) => {
                let mut shared = self.inner.lock_shared();
                shared.machine.apply(LifecycleEvent::ConnectFailed);
                self.inner.publish_state(&shared);
                drop(shared);
                warn!(address = %self.inner.config.address, error = %e, "connect failed");
                Err(e)
            }
        }
    }

    // == Get ==
    /// Retrieves the value stored under `key` through the current connection.
    ///
    /// Fails with [`ClientError::NotConnected`] if no connection is
    /// established, or [`ClientError::Closed`] after close().
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.current_connection()?;
        conn.get(key).await
    }

    // == Set ==
    /// Stores `value` under `key` through the current connection.
    ///
    /// Fails with [`ClientError::NotConnected`] if no connection is
    /// established, or [`ClientError::Closed`] after close().
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.current_connection()?;
        conn.set(key, value).await
    }

    // == Close ==
    /// Marks the wrapper closed, cancels any pending reconnect timer, and
    /// releases the connection. Idempotent; no further connection attempts
    /// occur afterwards.
    pub async fn close(&self) {
        let (timer, conn) = {
            let mut shared = self.inner.lock_shared();
            shared.machine.apply(LifecycleEvent::CloseRequested);
            let timer = shared.timer.take();
            let conn = shared.conn.take();
            self.inner.publish_state(&shared);
            (timer, conn)
        };

        if let Some(timer) = timer {
            timer.cancel();
        }
        if let Some(conn) = conn {
            conn.close().await;
        }
        self.inner.shutdown.cancel();
        info!("client closed");
    }

    // == Observability ==
    /// Returns the current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock_shared().machine.state()
    }

    /// Returns true while a live connection is established.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns a watch receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// Returns a snapshot of the connection statistics.
    pub fn stats(&self) -> ClientStats {
        self.inner.stats.lock().expect("stats lock poisoned").clone()
    }

    fn current_connection(&self) -> Result<Arc<T::Conn>> {
        let shared = self.inner.lock_shared();
        if shared.machine.is_closed() {
            return Err(ClientError::Closed);
        }
        shared.conn.clone().ok_or(ClientError::NotConnected)
    }
}

impl<T: Transport> Drop for ReconnectingClient<T> {
    fn drop(&mut self) {
        self.inner.shutdown.cancel();
    }
}

impl<T: Transport> Inner<T> {
    fn lock_shared(&self) -> std::sync::MutexGuard<'_, Shared<T::Conn>> {
        self.shared.lock().expect("wrapper state lock poisoned")
    }

    fn publish_state(&self, shared: &Shared<T::Conn>) {
        self.state_tx.send_replace(shared.machine.state());
    }

    fn record(&self, f: impl FnOnce(&mut ClientStats)) {
        f(&mut self.stats.lock().expect("stats lock poisoned"));
    }
}

// == Dialing ==
/// Runs one connection attempt under the configured timeout.
async fn dial_once<T: Transport>(inner: &Arc<Inner<T>>) -> Result<T::Conn> {
    let timeout = inner.config.connection_timeout();
    match tokio::time::timeout(timeout, inner.transport.connect(&inner.config.address)).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout(inner.config.connection_timeout_ms)),
    }
}

/// Installs a fresh connection handle and spawns its disconnect watcher.
///
/// Bumps the generation counter so lost notifications from the previous
/// connection are discarded.
fn install_connection<T: Transport>(
    inner: &Arc<Inner<T>>,
    shared: &mut Shared<T::Conn>,
    conn: T::Conn,
) {
    shared.generation += 1;
    let generation = shared.generation;

    let closed = conn.closed();
    let signals = inner.signals.clone();
    tokio::spawn(async move {
        closed.cancelled().await;
        let _ = signals.send(Signal::ConnectionLost { generation });
    });

    shared.conn = Some(Arc::new(conn));
}

// == Driver Task ==
/// Consumes lifecycle signals for one wrapper instance.
async fn drive<T: Transport>(inner: Arc<Inner<T>>, mut signals: mpsc::UnboundedReceiver<Signal>) {
    loop {
        let signal = tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };

        match signal {
            Signal::ConnectionLost { generation } => handle_connection_lost(&inner, generation),
            Signal::TimerElapsed => handle_timer_elapsed(&inner).await,
        }
    }
    debug!("driver task stopped");
}

/// Reacts to a dropped connection: releases the handle and, in
/// custom-reconnect mode, arms exactly one reconnect timer.
fn handle_connection_lost<T: Transport>(inner: &Arc<Inner<T>>, generation: u64) {
    let mut shared = inner.lock_shared();
    if generation != shared.generation {
        debug!(generation, "stale connection-lost signal ignored");
        return;
    }

    let effects = shared.machine.apply(LifecycleEvent::ConnectionLost);
    if effects.is_empty() {
        return;
    }
    warn!("connection lost");

    for effect in effects {
        match effect {
            Effect::DropConnection => {
                shared.conn = None;
            }
            Effect::ArmTimer => arm_timer(inner, &mut shared),
            _ => {}
        }
    }
    inner.publish_state(&shared);
    drop(shared);
    inner.record(|s| s.record_disconnect());
}

/// Runs one reconnect attempt after the timer elapsed.
async fn handle_timer_elapsed<T: Transport>(inner: &Arc<Inner<T>>) {
    let attempt = {
        let mut shared = inner.lock_shared();
        let effects = shared.machine.apply(LifecycleEvent::TimerFired);
        if !effects.contains(&Effect::Dial) {
            return;
        }
        shared.timer = None;
        match shared.machine.state() {
            ConnectionState::Reconnecting { attempt } => attempt,
            _ => 1,
        }
    };

    inner.record(|s| s.record_reconnect_attempt());
    info!(attempt, address = %inner.config.address, "reconnecting");

    match dial_once(inner).await {
        Ok(conn) => {
            let raced = {
                let mut shared = inner.lock_shared();
                let effects = shared.machine.apply(LifecycleEvent::ConnectSucceeded);
                if effects.contains(&Effect::DropConnection) {
                    Some(conn)
                } else {
                    install_connection(inner, &mut shared, conn);
                    inner.publish_state(&shared);
                    None
                }
            };
            if let Some(conn) = raced {
                // close() raced the reconnect attempt and wins.
                conn.close().await;
                return;
            }
            inner.record(|s| s.record_connect());
            info!(attempt, "reconnected");
        }
        Err(e) => {
            warn!(attempt, error = %e, "reconnect attempt failed");
            let mut shared = inner.lock_shared();
            let effects = shared.machine.apply(LifecycleEvent::ConnectFailed);
            for effect in effects {
                match effect {
                    Effect::ArmTimer => arm_timer(inner, &mut shared),
                    Effect::GiveUp => {
                        warn!(attempt, "retry limit reached, giving up on reconnect");
                    }
                    _ => {}
                }
            }
            inner.publish_state(&shared);
        }
    }
}

/// Arms the single fixed-delay reconnect timer.
fn arm_timer<T: Transport>(inner: &Arc<Inner<T>>, shared: &mut Shared<T::Conn>) {
    debug_assert!(shared.timer.is_none(), "duplicate reconnect timer");
    shared.timer = Some(ReconnectTimer::schedule(
        inner.config.reconnect_delay(),
        inner.signals.clone(),
    ));
}
