//! WebSocket transport for the session.
//!
//! Provides [`SocketHandle`], a thin layer that opens a socket with
//! tokio-tungstenite and reports everything that happens to it as
//! [`SocketEvent`]s on a channel. Session logic stays in the Sans-IO
//! [`crate::Session`].
//!
//! Every socket carries a generation number so the caller can discard events
//! from sockets it already abandoned.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        Message,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use url::Url;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The socket task is gone; nothing more can be sent.
    #[error("socket closed")]
    Closed,
}

/// What happened to a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Handshake completed.
    Opened,
    /// Text frame received.
    Frame(String),
    /// Socket-level error. `Closed` follows.
    Error(String),
    /// Socket closed. Always the last event of a socket.
    Closed {
        /// Close code from the peer's close frame, if any.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// Commands for the socket task.
#[derive(Debug)]
enum Command {
    Text(String),
    Close { code: u16, reason: String },
}

/// Handle to one socket.
///
/// Dropping the handle does not close the socket; call
/// [`SocketHandle::close`] or [`SocketHandle::abort`].
#[derive(Debug)]
pub struct SocketHandle {
    generation: u64,
    commands: mpsc::UnboundedSender<Command>,
    abort_handle: tokio::task::AbortHandle,
}

impl SocketHandle {
    /// Open a socket to `url` in a background task.
    ///
    /// Returns immediately; the outcome arrives on `events` tagged with
    /// `generation`.
    pub fn open(url: Url, generation: u64, events: mpsc::UnboundedSender<(u64, SocketEvent)>) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_socket(url, generation, command_rx, events));
        Self { generation, commands, abort_handle: task.abort_handle() }
    }

    /// Generation this socket was opened with.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Queue a text frame.
    ///
    /// # Errors
    ///
    /// - `TransportError::Closed` if the socket task has ended
    pub fn send_text(&self, text: String) -> Result<(), TransportError> {
        self.commands.send(Command::Text(text)).map_err(|_| TransportError::Closed)
    }

    /// Send a close frame and let the socket wind down.
    ///
    /// A socket still in its handshake stops there and reports `Closed`
    /// with `code`.
    pub fn close(&self, code: u16, reason: &str) {
        if self.commands.send(Command::Close { code, reason: reason.to_string() }).is_err() {
            tracing::debug!(generation = self.generation, "close on a finished socket");
        }
    }

    /// Kill the socket task without a close handshake.
    pub fn abort(&self) {
        self.abort_handle.abort();
    }
}

async fn run_socket(
    url: Url,
    generation: u64,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<(u64, SocketEvent)>,
) {
    let emit = |event: SocketEvent| {
        let _ = events.send((generation, event));
    };

    // A close requested mid-handshake abandons the handshake; frames queued
    // meanwhile go out once it completes.
    let handshake = connect_async(url.as_str());
    tokio::pin!(handshake);
    let mut early = Vec::new();

    let stream = loop {
        tokio::select! {
            result = &mut handshake => match result {
                Ok((stream, _response)) => break stream,
                Err(e) => {
                    tracing::warn!(generation, error = %e, "websocket connect failed");
                    emit(SocketEvent::Error(e.to_string()));
                    emit(SocketEvent::Closed { code: None, reason: "connect failed".to_string() });
                    return;
                },
            },
            command = commands.recv() => match command {
                Some(Command::Text(text)) => early.push(text),
                Some(Command::Close { code, reason }) => {
                    tracing::debug!(generation, code, %reason, "handshake abandoned");
                    emit(SocketEvent::Closed { code: Some(code), reason });
                    return;
                },
                None => {
                    emit(SocketEvent::Closed { code: None, reason: "handle dropped".to_string() });
                    return;
                },
            },
        }
    };

    tracing::debug!(generation, "websocket open");
    emit(SocketEvent::Opened);

    let (mut write, mut read) = stream.split();

    for text in early {
        if let Err(e) = write.send(Message::text(text)).await {
            emit(SocketEvent::Error(e.to_string()));
            emit(SocketEvent::Closed { code: None, reason: "send failed".to_string() });
            return;
        }
    }

    let (code, reason) = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = write.send(Message::text(text)).await {
                        emit(SocketEvent::Error(e.to_string()));
                        break (None, "send failed".to_string());
                    }
                },
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.clone().into() };
                    let _ = write.send(Message::Close(Some(frame))).await;
                    let _ = write.close().await;
                    break (Some(code), reason);
                },
                None => {
                    let _ = write.close().await;
                    break (Some(1000), "handle dropped".to_string());
                },
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => emit(SocketEvent::Frame(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    emit(SocketEvent::Error(e.to_string()));
                    break (None, e.to_string());
                },
                None => break (None, "stream ended".to_string()),
            },
        }
    };

    tracing::debug!(generation, ?code, %reason, "websocket closed");
    emit(SocketEvent::Closed { code, reason });
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn close_during_handshake_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept, then never answer the upgrade.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let (events, mut rx) = mpsc::unbounded_channel();
        let socket = SocketHandle::open(Url::parse(&format!("ws://{addr}/ws")).unwrap(), 7, events);
        tokio::time::sleep(Duration::from_millis(100)).await;

        socket.close(4001, "connect timeout");

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(event, Some((7, SocketEvent::Closed { code: Some(4001), reason: "connect timeout".into() })));
        server.abort();
    }
}
