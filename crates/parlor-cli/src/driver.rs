//! Tokio driver for the command-line client.
//!
//! Implements [`Driver`] with real sockets (tokio-tungstenite through
//! [`SocketHandle`]), REST requests (reqwest through [`HttpApi`]) and lines
//! from standard input. Everything that completes in the background is
//! funnelled through channels and surfaced by [`Driver::poll_event`].

use std::{
    collections::VecDeque,
    io::{self, Write},
    time::{Duration, Instant},
};

use parlor_app::Driver;
use parlor_client::{
    SessionEvent, SyncRequest,
    rest::HttpApi,
    transport::{SocketEvent, SocketHandle, TransportError},
};
use parlor_proto::UserId;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    time::{Interval, MissedTickBehavior},
};
use url::Url;

use crate::commands::{self, Command};

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// No socket is open.
    #[error("not connected")]
    NotConnected,

    /// Socket task is gone.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Driver backed by tokio, tokio-tungstenite and reqwest.
pub struct TokioDriver {
    api: HttpApi,
    socket: Option<SocketHandle>,
    generation: u64,
    socket_tx: mpsc::UnboundedSender<(u64, SocketEvent)>,
    socket_rx: mpsc::UnboundedReceiver<(u64, SocketEvent)>,
    sync_tx: mpsc::UnboundedSender<SessionEvent>,
    sync_rx: mpsc::UnboundedReceiver<SessionEvent>,
    input: mpsc::Receiver<String>,
    ticker: Interval,
    active: Option<UserId>,
    pending: VecDeque<SessionEvent>,
}

impl TokioDriver {
    /// Driver reading commands from standard input.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(api: HttpApi, tick: Duration) -> Self {
        let (input_tx, input) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if input_tx.send(line).await.is_err() {
                            break;
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "stdin read failed");
                        break;
                    },
                }
            }
        });
        Self::with_input(api, tick, input)
    }

    /// Driver reading command lines from `input`. Closing the channel quits.
    pub fn with_input(api: HttpApi, tick: Duration, input: mpsc::Receiver<String>) -> Self {
        let (socket_tx, socket_rx) = mpsc::unbounded_channel();
        let (sync_tx, sync_rx) = mpsc::unbounded_channel();
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            api,
            socket: None,
            generation: 0,
            socket_tx,
            socket_rx,
            sync_tx,
            sync_rx,
            input,
            ticker,
            active: None,
            pending: VecDeque::new(),
        }
    }

    /// Conversation plain text goes to.
    pub fn active(&self) -> Option<UserId> {
        self.active
    }

    /// Turn one input line into session events. Returns `false` on quit.
    fn interpret(&mut self, line: &str) -> bool {
        let command = match commands::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return true,
            Err(e) => {
                say(format_args!("{e}"));
                return true;
            },
        };

        let event = match command {
            Command::Say(content) => match self.active {
                Some(to) => SessionEvent::SendMessage { to, content },
                None => {
                    say(format_args!("no open conversation: /open <user> or /msg <user> <text>"));
                    return true;
                },
            },
            Command::Message { to, content } => SessionEvent::SendMessage { to, content },
            Command::Open { peer } => {
                self.active = Some(peer);
                SessionEvent::SelectConversation { peer }
            },
            Command::Close => {
                self.active = None;
                SessionEvent::CloseConversation
            },
            Command::Read { peer } => match peer.or(self.active) {
                Some(peer) => SessionEvent::MarkRead { peer },
                None => {
                    say(format_args!("usage: /read [user]"));
                    return true;
                },
            },
            Command::Typing { to } => match to.or(self.active) {
                Some(to) => SessionEvent::SendTyping { to },
                None => {
                    say(format_args!("usage: /typing [user]"));
                    return true;
                },
            },
            Command::Connect => SessionEvent::Connect,
            Command::Disconnect => SessionEvent::Disconnect,
            Command::Hide => SessionEvent::SetVisible(false),
            Command::Show => SessionEvent::SetVisible(true),
            Command::Help => {
                say(format_args!("{}", commands::HELP));
                return true;
            },
            Command::Quit => return false,
        };

        self.pending.push_back(event);
        true
    }
}

impl Driver for TokioDriver {
    type Error = DriverError;
    type Instant = Instant;

    async fn poll_event(&mut self) -> Result<Option<SessionEvent>, Self::Error> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            tokio::select! {
                Some((generation, event)) = self.socket_rx.recv() => {
                    if generation != self.generation {
                        tracing::trace!(generation, current = self.generation, "stale socket event");
                        continue;
                    }
                    return Ok(Some(match event {
                        SocketEvent::Opened => SessionEvent::SocketOpened,
                        SocketEvent::Frame(text) => SessionEvent::FrameReceived(text),
                        SocketEvent::Error(reason) => SessionEvent::SocketError { reason },
                        SocketEvent::Closed { code, reason } => {
                            self.socket = None;
                            SessionEvent::SocketClosed { code, reason }
                        },
                    }));
                }

                Some(event) = self.sync_rx.recv() => return Ok(Some(event)),

                line = self.input.recv() => match line {
                    Some(line) => {
                        if !self.interpret(&line) {
                            return Ok(None);
                        }
                    },
                    None => return Ok(None),
                },

                now = self.ticker.tick() => {
                    return Ok(Some(SessionEvent::Tick { now: now.into_std() }));
                }
            }
        }
    }

    fn open_socket(&mut self, url: &Url) -> Result<(), Self::Error> {
        if let Some(old) = self.socket.take() {
            old.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        tracing::debug!(generation = self.generation, "opening socket");
        self.socket = Some(SocketHandle::open(url.clone(), self.generation, self.socket_tx.clone()));
        Ok(())
    }

    fn send_text(&mut self, text: String) -> Result<(), Self::Error> {
        let socket = self.socket.as_ref().ok_or(DriverError::NotConnected)?;
        socket.send_text(text)?;
        Ok(())
    }

    fn close_socket(&mut self, code: u16, reason: &str) -> Result<(), Self::Error> {
        let socket = self.socket.as_ref().ok_or(DriverError::NotConnected)?;
        socket.close(code, reason);
        Ok(())
    }

    fn fetch(&mut self, request: SyncRequest) -> Result<(), Self::Error> {
        let api = self.api.clone();
        let results = self.sync_tx.clone();
        tokio::spawn(async move {
            let event = match api.execute(request).await {
                Ok(response) => SessionEvent::SyncCompleted(response),
                Err(e) => {
                    tracing::debug!(?request, error = %e, "sync failed");
                    SessionEvent::SyncFailed { request, unauthorized: e.is_unauthorized(), error: e.to_string() }
                },
            };
            let _ = results.send(event);
        });
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(socket) = self.socket.take() {
            socket.abort();
        }
    }
}

/// Derive the REST base from a socket endpoint: same host, `http(s)`
/// scheme, `/api/` path.
pub fn api_base(endpoint: &Url) -> Option<Url> {
    let mut base = endpoint.clone();
    let scheme = if endpoint.scheme() == "wss" { "https" } else { "http" };
    base.set_scheme(scheme).ok()?;
    base.set_path("/api/");
    base.set_query(None);
    Some(base)
}

/// Make sure relative joins land below `base` rather than beside it.
pub fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn say(args: std::fmt::Arguments<'_>) {
    let mut out = io::stdout().lock();
    if writeln!(out, "{args}").is_err() {
        tracing::warn!("stdout closed");
    }
}
