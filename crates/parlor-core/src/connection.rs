//! Connection lifecycle state machine.
//!
//! Owns the socket's state, the reconnect backoff and the heartbeat. Uses the
//! action pattern: methods take time as input and return actions for the
//! driver to execute. The driver reports socket events back through
//! [`Connection::handle_opened`] and [`Connection::handle_closed`].
//!
//! # State Machine
//!
//! ```text
//!          connect            opened
//! ┌──────┐ ───────> ┌────────────┐ ─────> ┌──────┐
//! │ Idle │          │ Connecting │        │ Open │
//! └──────┘          └────────────┘        └──────┘
//!                     ↑   │ abnormal close    │ disconnect / timeout
//!     backoff elapsed │   ↓                   ↓
//!                   ┌────────┐   close   ┌─────────┐
//!                   │ Closed │ <──────── │ Closing │
//!                   └────────┘           └─────────┘
//! ```
//!
//! Abnormal closes schedule a reconnect after `min(base · 2^attempt, max)`.
//! Once `max_reconnect_attempts` consecutive attempts have failed the machine
//! gives up and stays `Closed` until an explicit [`Connection::connect`].

use std::time::Duration;

use parlor_proto::{CLOSE_CONNECT_TIMEOUT, CLOSE_LIVENESS_TIMEOUT, CLOSE_NORMAL};

use crate::{env::Moment, error::ConnectionError};

/// Base delay of the reconnect backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound of the reconnect backoff.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Consecutive failed attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Interval between `ping` frames while open.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Time allowed for the opening handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for the socket to confirm a close we requested.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Silence tolerated while open before the socket is considered dead.
///
/// Two missed heartbeats plus margin.
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(75);

/// Connection state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected, or torn down before the first attempt.
    #[default]
    Idle,
    /// Socket requested, waiting for the open event.
    Connecting,
    /// Socket open.
    Open,
    /// Close requested, waiting for the close event.
    Closing,
    /// Socket closed; a reconnect may be pending.
    Closed,
}

/// Connection status as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// An attempt is in flight.
    Connecting,
    /// Socket open.
    Connected,
    /// Closed and not retrying.
    Disconnected,
    /// Closed abnormally; next attempt scheduled.
    Reconnecting {
        /// Attempt number of the scheduled reconnect (1-based).
        attempt: u32,
        /// Delay before that attempt.
        delay: Duration,
    },
    /// Reconnect attempts exhausted; user action required.
    Failed {
        /// Failed attempts before giving up.
        attempts: u32,
    },
}

impl ConnectionStatus {
    /// True while the socket is usable.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a new socket to the configured endpoint.
    OpenSocket,
    /// Send a heartbeat `ping` frame.
    SendPing,
    /// Close the current socket.
    CloseSocket {
        /// WebSocket close code
        code: u16,
        /// Close reason
        reason: String,
    },
    /// Status changed; forward to the UI.
    Status(ConnectionStatus),
    /// Reconnect attempts exhausted. Terminal until the next `connect`.
    GaveUp {
        /// Failed attempts before giving up.
        attempts: u32,
    },
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Backoff base delay.
    pub base_delay: Duration,
    /// Backoff cap.
    pub max_delay: Duration,
    /// Consecutive failures before giving up.
    pub max_reconnect_attempts: u32,
    /// Heartbeat interval. `None` disables pings.
    pub heartbeat_interval: Option<Duration>,
    /// Handshake timeout. `None` leaves it to the socket implementation.
    pub connect_timeout: Option<Duration>,
    /// Liveness timeout. `None` makes reconnection purely close-driven.
    pub liveness_timeout: Option<Duration>,
    /// How long `Closing` waits for the close report before treating the
    /// socket as closed anyway. `None` waits forever.
    pub close_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            liveness_timeout: Some(DEFAULT_LIVENESS_TIMEOUT),
            close_timeout: Some(DEFAULT_CLOSE_TIMEOUT),
        }
    }
}

/// Reconnect delay for the given attempt: `min(base · 2^attempt, max)`.
///
/// Saturates to `max` instead of overflowing.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    1u32.checked_shl(attempt).and_then(|factor| base.checked_mul(factor)).map_or(max, |d| d.min(max))
}

/// Connection state machine.
///
/// Pure: no I/O, no clock. Generic over the instant type so tests can drive
/// it with virtual time.
#[derive(Debug, Clone)]
pub struct Connection<I: Moment> {
    state: ConnectionState,
    config: ConnectionConfig,
    /// Consecutive failed attempts since the last successful open.
    attempt: u32,
    /// Current backoff delay.
    delay: Duration,
    last_error: Option<String>,
    /// Backoff timer. Only armed while `Closed`.
    reconnect_at: Option<I>,
    /// Heartbeat timer. Only armed while `Open`.
    next_heartbeat: Option<I>,
    /// Handshake deadline. Only armed while `Connecting`.
    connect_deadline: Option<I>,
    /// Close confirmation deadline. Only armed while `Closing`.
    close_deadline: Option<I>,
    last_activity: Option<I>,
    /// Whether the pending close should be treated as abnormal.
    reconnect_on_close: bool,
    exhausted: bool,
}

impl<I: Moment> Connection<I> {
    /// Create an idle connection.
    pub fn new(config: ConnectionConfig) -> Self {
        let delay = config.base_delay;
        Self {
            state: ConnectionState::Idle,
            config,
            attempt: 0,
            delay,
            last_error: None,
            reconnect_at: None,
            next_heartbeat: None,
            connect_deadline: None,
            close_deadline: None,
            last_activity: None,
            reconnect_on_close: false,
            exhausted: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while frames can be transmitted.
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay used for the most recently scheduled reconnect, or the base
    /// delay after a successful open.
    pub fn backoff(&self) -> Duration {
        self.delay
    }

    /// Reason of the most recent failure.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// True once reconnect attempts are exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// When the pending reconnect fires. `None` if none is scheduled.
    pub fn reconnect_at(&self) -> Option<I> {
        self.reconnect_at
    }

    /// True while the heartbeat timer is armed.
    pub fn heartbeat_armed(&self) -> bool {
        self.next_heartbeat.is_some()
    }

    /// True while the backoff timer is armed.
    pub fn backoff_armed(&self) -> bool {
        self.reconnect_at.is_some()
    }

    /// Configuration in use.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Start connecting.
    ///
    /// No-op while `Connecting`, `Open` or `Closing`. After exhaustion this
    /// is the explicit user retry: the attempt counter starts over. Cancels
    /// a pending backoff timer.
    pub fn connect(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::Closing => {
                tracing::debug!(state = ?self.state, "connect ignored, attempt already in flight");
                vec![]
            },
            ConnectionState::Idle | ConnectionState::Closed => {
                if self.exhausted {
                    self.exhausted = false;
                    self.attempt = 0;
                    self.delay = self.config.base_delay;
                }
                self.begin_attempt(now)
            },
        }
    }

    /// The socket reported open.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not `Connecting` (the attempt was
    ///   cancelled or timed out meanwhile)
    pub fn handle_opened(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Connecting {
            return Err(ConnectionError::InvalidState {
                state: self.state,
                operation: "handle_opened",
            });
        }

        tracing::info!(after_attempts = self.attempt, "connection open");

        self.state = ConnectionState::Open;
        self.attempt = 0;
        self.delay = self.config.base_delay;
        self.connect_deadline = None;
        self.last_activity = Some(now);
        self.next_heartbeat = self.config.heartbeat_interval.map(|interval| now + interval);

        Ok(vec![ConnectionAction::Status(ConnectionStatus::Connected)])
    }

    /// Any inbound frame arrived. Refreshes the liveness clock.
    pub fn handle_activity(&mut self, now: I) {
        if self.state == ConnectionState::Open {
            self.last_activity = Some(now);
        }
    }

    /// A socket error was reported. A close report is expected to follow.
    pub fn record_error(&mut self, reason: &str) {
        tracing::warn!(state = ?self.state, %reason, "socket error");
        self.last_error = Some(reason.to_string());
    }

    /// The socket reported closed.
    ///
    /// Code 1000, or a close we requested through [`Connection::disconnect`],
    /// is normal. Anything else (including no code at all, which is how a
    /// failed open is reported) is abnormal and schedules a reconnect.
    pub fn handle_closed(&mut self, code: Option<u16>, reason: &str, now: I) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Closed => {
                tracing::debug!(?code, %reason, "stale close report ignored");
                vec![]
            },
            ConnectionState::Closing if !self.reconnect_on_close => self.finish_normal_close(),
            ConnectionState::Closing => self.fail(reason, now),
            ConnectionState::Connecting | ConnectionState::Open => {
                if code == Some(CLOSE_NORMAL) {
                    tracing::info!(%reason, "connection closed normally by server");
                    self.finish_normal_close()
                } else {
                    self.fail(reason, now)
                }
            },
        }
    }

    /// Explicit teardown.
    ///
    /// Cancels the backoff and heartbeat timers. Never reconnects.
    pub fn disconnect(&mut self, now: I) -> Vec<ConnectionAction> {
        let was_retrying = self.reconnect_at.is_some();
        self.reconnect_at = None;
        self.next_heartbeat = None;
        self.connect_deadline = None;
        self.reconnect_on_close = false;

        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.state = ConnectionState::Closing;
                self.close_deadline = self.config.close_timeout.map(|timeout| now + timeout);
                vec![ConnectionAction::CloseSocket {
                    code: CLOSE_NORMAL,
                    reason: "client disconnect".to_string(),
                }]
            },
            ConnectionState::Closing => vec![],
            ConnectionState::Idle | ConnectionState::Closed => {
                if was_retrying {
                    vec![ConnectionAction::Status(ConnectionStatus::Disconnected)]
                } else {
                    vec![]
                }
            },
        }
    }

    /// Drop back to `Idle` without touching any socket.
    ///
    /// Used when a reconnect fires but there is nothing to connect with (the
    /// user logged out meanwhile).
    pub fn abandon(&mut self) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Idle;
        self.reconnect_at = None;
        self.next_heartbeat = None;
        self.connect_deadline = None;
        self.close_deadline = None;
        self.last_activity = None;
        self.reconnect_on_close = false;
        vec![ConnectionAction::Status(ConnectionStatus::Disconnected)]
    }

    /// Process timers: backoff, handshake deadline, close deadline, liveness,
    /// heartbeat.
    ///
    /// Call periodically.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.state {
            ConnectionState::Closed => {
                if let Some(at) = self.reconnect_at
                    && now >= at
                {
                    tracing::debug!(attempt = self.attempt, "backoff elapsed, reconnecting");
                    return self.begin_attempt(now);
                }
                vec![]
            },
            ConnectionState::Connecting => {
                if let Some(deadline) = self.connect_deadline
                    && now >= deadline
                {
                    tracing::warn!("connect timeout");
                    self.connect_deadline = None;
                    return self.close_abnormally(CLOSE_CONNECT_TIMEOUT, "connect timeout", now);
                }
                vec![]
            },
            ConnectionState::Open => {
                if let (Some(limit), Some(last)) = (self.config.liveness_timeout, self.last_activity)
                    && now - last >= limit
                {
                    tracing::warn!(silent_for = ?(now - last), "liveness timeout");
                    return self.close_abnormally(CLOSE_LIVENESS_TIMEOUT, "liveness timeout", now);
                }

                if let Some(at) = self.next_heartbeat
                    && now >= at
                {
                    self.next_heartbeat = self.config.heartbeat_interval.map(|i| now + i);
                    return vec![ConnectionAction::SendPing];
                }
                vec![]
            },
            ConnectionState::Closing => {
                if let Some(deadline) = self.close_deadline
                    && now >= deadline
                {
                    // The close report is expected to follow as a stale event.
                    tracing::warn!(abnormal = self.reconnect_on_close, "close not confirmed, giving up on the socket");
                    if !self.reconnect_on_close {
                        return self.finish_normal_close();
                    }
                    let reason = self.last_error.clone().unwrap_or_else(|| "close not confirmed".to_string());
                    return self.fail(&reason, now);
                }
                vec![]
            },
            ConnectionState::Idle => vec![],
        }
    }

    fn begin_attempt(&mut self, now: I) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Connecting;
        self.reconnect_at = None;
        self.next_heartbeat = None;
        self.reconnect_on_close = false;
        self.close_deadline = None;
        self.connect_deadline = self.config.connect_timeout.map(|timeout| now + timeout);

        vec![
            ConnectionAction::Status(ConnectionStatus::Connecting),
            ConnectionAction::OpenSocket,
        ]
    }

    fn close_abnormally(&mut self, code: u16, reason: &str, now: I) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Closing;
        self.reconnect_on_close = true;
        self.close_deadline = self.config.close_timeout.map(|timeout| now + timeout);
        self.next_heartbeat = None;
        self.last_error = Some(reason.to_string());
        vec![ConnectionAction::CloseSocket { code, reason: reason.to_string() }]
    }

    fn finish_normal_close(&mut self) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Closed;
        self.reconnect_on_close = false;
        self.next_heartbeat = None;
        self.connect_deadline = None;
        self.close_deadline = None;
        self.last_activity = None;
        vec![ConnectionAction::Status(ConnectionStatus::Disconnected)]
    }

    fn fail(&mut self, reason: &str, now: I) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Closed;
        self.reconnect_on_close = false;
        self.next_heartbeat = None;
        self.connect_deadline = None;
        self.close_deadline = None;
        self.last_activity = None;
        self.last_error = Some(reason.to_string());

        if self.attempt >= self.config.max_reconnect_attempts {
            tracing::warn!(attempts = self.attempt, %reason, "giving up on reconnection");
            self.exhausted = true;
            let attempts = self.attempt;
            return vec![
                ConnectionAction::Status(ConnectionStatus::Failed { attempts }),
                ConnectionAction::GaveUp { attempts },
            ];
        }

        self.attempt += 1;
        self.delay = backoff_delay(self.attempt, self.config.base_delay, self.config.max_delay);
        self.reconnect_at = Some(now + self.delay);

        tracing::info!(attempt = self.attempt, delay = ?self.delay, %reason, "connection lost, reconnect scheduled");

        vec![ConnectionAction::Status(ConnectionStatus::Reconnecting {
            attempt: self.attempt,
            delay: self.delay,
        })]
    }
}
