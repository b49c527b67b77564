//! Control channel - the live link to the mixer server
//!
//! Owns the connection lifecycle, reconnect policy and message dispatch:
//! - [`ControlChannel`] is the event-driven state machine. It performs no I/O
//!   itself; it drives a [`Transport`] and a [`RetryTimer`] and notifies a
//!   [`StateSink`](crate::sink::StateSink).
//! - [`ControlChannelHandle`] runs a `ControlChannel` on its own tokio task
//!   with a WebSocket transport and a tokio retry timer, and exposes a
//!   fire-and-forget API to the presentation layer.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

mod backoff;
mod events;
mod handle;
mod machine;
mod timer;
mod transport;


pub use backoff::ReconnectBackoff;
pub use events::{ChannelCommand, ChannelInput, TransportEvent};
pub use handle::ControlChannelHandle;
pub use machine::ControlChannel;
pub use timer::TokioRetryTimer;
pub use transport::WsTransport;

/// Lifecycle state of the control connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected and no retry scheduled
    Disconnected,
    /// Transport is being opened
    Connecting,
    /// Transport is open and the server is reachable
    Open,
    /// Transport was lost; a retry is scheduled
    Reconnecting,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

/// Errors raised when writing to a transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,

    #[error("transport writer has shut down")]
    WriterClosed,
}

/// A bidirectional message transport
///
/// `open` starts an attempt and returns immediately; its outcome and all
/// inbound traffic come back as [`TransportEvent`]s tagged with `epoch`.
/// Implementations must tolerate `close` when nothing is open.
pub trait Transport: Send {
    /// Start a new connection attempt identified by `epoch`
    fn open(&mut self, epoch: u64);

    /// Queue a text frame on the current connection
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Close and discard the current connection, if any
    fn close(&mut self);
}

/// A single-shot timer that reports expiry as [`TransportEvent::RetryElapsed`]
///
/// Scheduling while a timer is pending replaces it.
pub trait RetryTimer: Send {
    fn schedule(&mut self, delay: Duration, generation: u64);

    fn cancel(&mut self);
}
