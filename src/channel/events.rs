//! Inputs processed by the control channel task
//!
//! Everything the channel reacts to arrives as one of these values on a
//! single queue and is handled to completion before the next one.

use tokio::sync::oneshot;

use super::ConnectionState;
use crate::protocol::ChannelId;

/// Events raised by the transport and the retry timer
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Connection attempt `epoch` completed its handshake
    Opened { epoch: u64 },
    /// Connection `epoch` was closed (by either side, or never opened)
    Closed { epoch: u64 },
    /// Connection `epoch` hit an unrecoverable error
    Failed { epoch: u64, reason: String },
    /// Text frame received on connection `epoch`
    Message { epoch: u64, text: String },
    /// Retry timer `generation` expired
    RetryElapsed { generation: u64 },
}

/// Requests from the presentation layer
#[derive(Debug)]
pub enum ChannelCommand {
    Connect,
    Disconnect,
    SendFader {
        channel: ChannelId,
        value: f64,
    },
    SendMute {
        channel: ChannelId,
        muted: bool,
    },
    GetState {
        response: oneshot::Sender<ConnectionState>,
    },
    /// Close the transport and stop the task
    Shutdown,
}

/// Single queue item for the channel task
#[derive(Debug)]
pub enum ChannelInput {
    Event(TransportEvent),
    Command(ChannelCommand),
}

impl From<TransportEvent> for ChannelInput {
    fn from(event: TransportEvent) -> Self {
        ChannelInput::Event(event)
    }
}

impl From<ChannelCommand> for ChannelInput {
    fn from(command: ChannelCommand) -> Self {
        ChannelInput::Command(command)
    }
}
