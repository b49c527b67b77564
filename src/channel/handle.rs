//! ControlChannelHandle - Public API for a running control channel
//!
//! The channel runs on a dedicated tokio task that owns the state machine,
//! the WebSocket transport and the retry timer. Transport events, timer
//! expiries and commands from this handle share one queue, so the state
//! machine is only ever touched by that task.
//!
//! # Fire-and-forget methods
//! - `connect` / `disconnect`
//! - `send_fader` / `send_mute` (dropped unless the connection is open)
//!
//! # Query methods (async with response)
//! - `state`

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{
    ChannelCommand, ChannelInput, ConnectionState, ControlChannel, ReconnectBackoff,
    TokioRetryTimer, WsTransport,
};
use crate::protocol::ChannelId;
use crate::sink::StateSink;

/// Handle for interacting with a spawned control channel
#[derive(Clone)]
pub struct ControlChannelHandle {
    input_tx: mpsc::UnboundedSender<ChannelInput>,
}

impl ControlChannelHandle {
    /// Spawn a control channel for the WebSocket endpoint `url`
    ///
    /// The channel starts `Disconnected`; call [`connect`](Self::connect) to
    /// bring it up. Returns the handle and the task's join handle.
    pub fn spawn<S>(url: impl Into<String>, backoff: ReconnectBackoff, sink: S) -> (Self, JoinHandle<()>)
    where
        S: StateSink + 'static,
    {
        let (input_tx, input_rx) = mpsc::unbounded_channel();

        let transport = WsTransport::new(url, input_tx.clone());
        let timer = TokioRetryTimer::new(input_tx.clone());
        let channel = ControlChannel::new(transport, timer, sink, backoff);

        let task = tokio::spawn(run(channel, input_rx));
        (Self { input_tx }, task)
    }

    /// Request a connection (no-op while open or connecting)
    pub fn connect(&self) {
        self.command(ChannelCommand::Connect);
    }

    /// Close the connection and stop retrying
    pub fn disconnect(&self) {
        self.command(ChannelCommand::Disconnect);
    }

    /// Send a fader position for a channel
    pub fn send_fader(&self, channel: ChannelId, value: f64) {
        self.command(ChannelCommand::SendFader { channel, value });
    }

    /// Send a mute state for a channel
    pub fn send_mute(&self, channel: ChannelId, muted: bool) {
        self.command(ChannelCommand::SendMute { channel, muted });
    }

    /// Current connection state, or `None` if the task has stopped
    pub async fn state(&self) -> Option<ConnectionState> {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .input_tx
            .send(ChannelCommand::GetState { response: response_tx }.into())
            .is_err()
        {
            return None;
        }
        response_rx.await.ok()
    }

    /// Close the transport and stop the channel task
    pub fn shutdown(&self) {
        self.command(ChannelCommand::Shutdown);
    }

    fn command(&self, command: ChannelCommand) {
        let _ = self.input_tx.send(command.into());
    }
}

async fn run<S: StateSink>(
    mut channel: ControlChannel<WsTransport, TokioRetryTimer, S>,
    mut input_rx: mpsc::UnboundedReceiver<ChannelInput>,
) {
    debug!("Control channel task started");

    while let Some(input) = input_rx.recv().await {
        match input {
            ChannelInput::Event(event) => channel.handle_event(event),
            ChannelInput::Command(command) => match command {
                ChannelCommand::Connect => channel.connect(),
                ChannelCommand::Disconnect => channel.disconnect(),
                ChannelCommand::SendFader { channel: id, value } => {
                    channel.send_fader(id, value);
                }
                ChannelCommand::SendMute { channel: id, muted } => {
                    channel.send_mute(id, muted);
                }
                ChannelCommand::GetState { response } => {
                    let _ = response.send(channel.state());
                }
                ChannelCommand::Shutdown => {
                    channel.disconnect();
                    break;
                }
            },
        }
    }

    info!("Control channel stopped");
}
