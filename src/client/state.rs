//! Connection Lifecycle State Machine
//!
//! Pure transition function for the reconnecting client. Consumes
//! connection-lifecycle events and emits effects for the wrapper to execute,
//! with no I/O of its own, so every transition is testable without a network.

use crate::config::Config;

// == Connection State ==
/// Externally observable connection state of the wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no attempt in progress
    Disconnected,
    /// Initial connect attempt in progress
    Connecting,
    /// A live connection is established
    Connected,
    /// Connection lost; a reconnect timer or attempt is active
    Reconnecting {
        /// 1-based number of the current reconnect attempt
        attempt: u32,
    },
    /// Terminal state entered by close()
    Closed,
}

// == Lifecycle Events ==
/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Caller asked for an initial connect
    ConnectRequested,
    /// A connect or reconnect attempt produced a live connection
    ConnectSucceeded,
    /// A connect or reconnect attempt failed
    ConnectFailed,
    /// The live connection dropped
    ConnectionLost,
    /// The pending reconnect timer elapsed
    TimerFired,
    /// Caller asked to close the wrapper
    CloseRequested,
}

// == Effects ==
/// Actions the wrapper must execute after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Begin one connection attempt
    Dial,
    /// Arm one fixed-delay reconnect timer
    ArmTimer,
    /// Cancel the pending reconnect timer
    DisarmTimer,
    /// Release the current (or freshly created) connection handle
    DropConnection,
    /// Retry budget exhausted; reconnecting stops
    GiveUp,
}

// == State Machine ==
/// Lifecycle state machine for one wrapper instance.
///
/// Invariants maintained across all transitions:
/// - at most one of {armed timer, in-flight attempt} exists at any time
/// - once closed, no `Dial` or `ArmTimer` effect is ever emitted again
/// - stale events (a timer firing after cancellation, a lost notification
///   for a connection that was already replaced) are ignored
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: ConnectionState,
    closed: bool,
    reconnecting: bool,
    timer_pending: bool,
    attempt: u32,
    custom_reconnect: bool,
    max_retries: u32,
}

impl StateMachine {
    // == Constructor ==
    /// Creates a new state machine in the Disconnected state.
    pub fn new(config: &Config) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            closed: false,
            reconnecting: false,
            timer_pending: false,
            attempt: 0,
            custom_reconnect: config.custom_reconnect,
            max_retries: config.max_retries,
        }
    }

    // == Accessors ==
    /// Returns the current externally observable state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns true once close() has been requested.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns true while a reconnect timer or attempt is active.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting
    }

    /// Returns true while a reconnect timer is armed.
    pub fn timer_pending(&self) -> bool {
        self.timer_pending
    }

    // == Transition ==
    /// Applies one lifecycle event and returns the effects to execute.
    pub fn apply(&mut self, event: LifecycleEvent) -> Vec<Effect> {
        match event {
            LifecycleEvent::CloseRequested => self.on_close(),
            LifecycleEvent::ConnectRequested => self.on_connect_requested(),
            LifecycleEvent::ConnectSucceeded => self.on_connect_succeeded(),
            LifecycleEvent::ConnectFailed => self.on_connect_failed(),
            LifecycleEvent::ConnectionLost => self.on_connection_lost(),
            LifecycleEvent::TimerFired => self.on_timer_fired(),
        }
    }

    /// Close is idempotent and terminal. Cancels the timer and releases the
    /// connection; no attempt is ever scheduled afterwards.
    fn on_close(&mut self) -> Vec<Effect> {
        if self.closed {
            return Vec::new();
        }

        let mut effects = Vec::new();
        if self.timer_pending {
            effects.push(Effect::DisarmTimer);
        }
        effects.push(Effect::DropConnection);

        self.closed = true;
        self.reconnecting = false;
        self.timer_pending = false;
        self.state = ConnectionState::Closed;
        effects
    }

    /// Initial connect only starts from Disconnected; a busy or closed
    /// machine ignores the request (the wrapper reports the error).
    fn on_connect_requested(&mut self) -> Vec<Effect> {
        if self.closed || self.state != ConnectionState::Disconnected {
            return Vec::new();
        }
        self.state = ConnectionState::Connecting;
        vec![Effect::Dial]
    }

    /// Success clears all reconnect bookkeeping. A close() that raced the
    /// in-flight attempt wins: the fresh handle is dropped.
    fn on_connect_succeeded(&mut self) -> Vec<Effect> {
        if self.closed {
            return vec![Effect::DropConnection];
        }
        self.state = ConnectionState::Connected;
        self.reconnecting = false;
        self.timer_pending = false;
        self.attempt = 0;
        Vec::new()
    }

    /// An initial connect failure surfaces to the caller; a reconnect
    /// failure re-arms exactly one timer, unless the retry budget ran out.
    fn on_connect_failed(&mut self) -> Vec<Effect> {
        if self.closed {
            return Vec::new();
        }

        if self.reconnecting {
            if self.max_retries > 0 && self.attempt >= self.max_retries {
                self.reconnecting = false;
                self.timer_pending = false;
                self.state = ConnectionState::Disconnected;
                return vec![Effect::GiveUp];
            }
            self.attempt += 1;
            self.timer_pending = true;
            self.state = ConnectionState::Reconnecting {
                attempt: self.attempt,
            };
            return vec![Effect::ArmTimer];
        }

        self.state = ConnectionState::Disconnected;
        Vec::new()
    }

    /// A lost connection schedules at most one reconnect timer, and only in
    /// custom-reconnect mode. Duplicate notifications are no-ops.
    fn on_connection_lost(&mut self) -> Vec<Effect> {
        if self.closed || self.state != ConnectionState::Connected {
            return Vec::new();
        }

        self.state = ConnectionState::Disconnected;
        let mut effects = vec![Effect::DropConnection];

        // scheduleReconnect: no-op if already reconnecting, closed, or a
        // timer is already pending.
        if self.custom_reconnect && !self.reconnecting && !self.timer_pending {
            self.reconnecting = true;
            self.timer_pending = true;
            self.attempt = 1;
            self.state = ConnectionState::Reconnecting { attempt: 1 };
            effects.push(Effect::ArmTimer);
        }
        effects
    }

    /// A fired timer consumes the pending slot and starts one attempt.
    /// Timers that outlived a close() or a successful reconnect are stale.
    fn on_timer_fired(&mut self) -> Vec<Effect> {
        if self.closed || !self.reconnecting || !self.timer_pending {
            return Vec::new();
        }
        self.timer_pending = false;
        vec![Effect::Dial]
    }
}
