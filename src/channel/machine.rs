//! Control channel state machine
//!
//! Lifecycle:
//! `Disconnected → Connecting → Open → Reconnecting → Connecting → Open → …`
//!
//! Each connection attempt gets a fresh epoch and each scheduled retry a fresh
//! generation. Events carrying an outdated epoch or generation belong to a
//! transport or timer that has already been discarded and are ignored.

use std::time::Duration;
use tracing::{debug, info, trace, warn};

use super::{ConnectionState, ReconnectBackoff, RetryTimer, Transport, TransportEvent};
use crate::level::map_level;
use crate::protocol::{ChannelId, InboundMessage, OutboundMessage};
use crate::sink::StateSink;

#[derive(Debug, Clone, Copy)]
enum ChannelUpdate {
    Fader(f64),
    Mute(bool),
}

/// Event-driven owner of the mixer connection
pub struct ControlChannel<T: Transport, R: RetryTimer, S: StateSink> {
    state: ConnectionState,
    backoff: ReconnectBackoff,
    transport: T,
    timer: R,
    sink: S,
    /// Last epoch handed to the transport
    epoch: u64,
    /// Epoch whose events are currently accepted
    live_epoch: Option<u64>,
    retry_generation: u64,
    retry_pending: bool,
}

impl<T: Transport, R: RetryTimer, S: StateSink> ControlChannel<T, R, S> {
    pub fn new(transport: T, timer: R, sink: S, backoff: ReconnectBackoff) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff,
            transport,
            timer,
            sink,
            epoch: 0,
            live_epoch: None,
            retry_generation: 0,
            retry_pending: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Current reconnect delay
    pub fn backoff(&self) -> Duration {
        self.backoff.current()
    }

    /// Whether a retry timer is scheduled
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timer(&self) -> &R {
        &self.timer
    }

    /// Start a connection attempt
    ///
    /// No-op while `Open` or `Connecting`. Any previous transport is closed
    /// and a pending retry is cancelled first.
    pub fn connect(&mut self) {
        if matches!(self.state, ConnectionState::Open | ConnectionState::Connecting) {
            debug!("Connect ignored, channel already {}", self.state);
            return;
        }

        self.cancel_retry();
        self.transport.close();

        self.epoch += 1;
        self.live_epoch = Some(self.epoch);
        self.set_state(ConnectionState::Connecting);
        debug!("Opening transport (epoch {})", self.epoch);
        self.transport.open(self.epoch);
    }

    /// Close the connection and stop retrying
    pub fn disconnect(&mut self) {
        self.cancel_retry();
        self.transport.close();
        self.live_epoch = None;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Handle one transport or timer event to completion
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Opened { epoch } => {
                if self.is_live(epoch) {
                    self.on_open();
                } else {
                    debug!("Ignoring open from stale transport (epoch {})", epoch);
                }
            }
            TransportEvent::Closed { epoch } => {
                if self.is_live(epoch) {
                    info!("🔌 Mixer connection closed");
                    self.begin_reconnect();
                } else {
                    trace!("Ignoring close from stale transport (epoch {})", epoch);
                }
            }
            TransportEvent::Failed { epoch, reason } => {
                if self.is_live(epoch) {
                    warn!("Mixer connection error: {}", reason);
                    self.begin_reconnect();
                } else {
                    trace!("Ignoring error from stale transport (epoch {}): {}", epoch, reason);
                }
            }
            TransportEvent::Message { epoch, text } => {
                if self.is_live(epoch) && self.state == ConnectionState::Open {
                    self.on_message(&text);
                } else {
                    trace!("Dropping message outside open connection (epoch {})", epoch);
                }
            }
            TransportEvent::RetryElapsed { generation } => {
                if !self.retry_pending || generation != self.retry_generation {
                    trace!("Ignoring cancelled retry timer (generation {})", generation);
                    return;
                }
                self.retry_pending = false;
                if self.state == ConnectionState::Reconnecting {
                    info!("🔄 Reconnecting to mixer...");
                    self.connect();
                }
            }
        }
    }

    /// Send a fader move; dropped unless `Open`
    pub fn send_fader(&mut self, channel: ChannelId, value: f64) -> bool {
        self.send(OutboundMessage::fader(channel, value))
    }

    /// Send a mute change; dropped unless `Open`
    pub fn send_mute(&mut self, channel: ChannelId, muted: bool) -> bool {
        self.send(OutboundMessage::mute(channel, muted))
    }

    fn send(&mut self, message: OutboundMessage) -> bool {
        if self.state != ConnectionState::Open {
            trace!("Channel {}, dropping {:?}", self.state, message);
            return false;
        }

        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to encode {:?}: {}", message, e);
                return false;
            }
        };

        debug!("📤 {}", text);
        match self.transport.send(text) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send to mixer: {}", e);
                false
            }
        }
    }

    fn is_live(&self, epoch: u64) -> bool {
        self.live_epoch == Some(epoch)
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!("Ignoring duplicate open while {}", self.state);
            return;
        }

        self.set_state(ConnectionState::Open);
        self.backoff.reset();
        self.cancel_retry();
        info!("✅ Connected to mixer");
        self.send(OutboundMessage::RequestInitialValues);
        self.sink.on_ready();
    }

    fn begin_reconnect(&mut self) {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting => {}
            ConnectionState::Reconnecting => {
                debug!("Already reconnecting, close signal ignored");
                return;
            }
            ConnectionState::Disconnected => return,
        }

        self.transport.close();
        self.live_epoch = None;

        let delay = self.backoff.advance();
        self.set_state(ConnectionState::Reconnecting);
        self.schedule_retry(delay);
    }

    fn schedule_retry(&mut self, delay: Duration) {
        self.timer.cancel();
        self.retry_generation += 1;
        self.retry_pending = true;
        debug!("⏳ Mixer reconnect in {}ms", delay.as_millis());
        self.timer.schedule(delay, self.retry_generation);
    }

    fn cancel_retry(&mut self) {
        if self.retry_pending {
            self.timer.cancel();
            self.retry_pending = false;
        }
    }

    fn on_message(&mut self, text: &str) {
        let message = match InboundMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed message from mixer: {} ({})", e, text);
                return;
            }
        };
        self.dispatch(message);
    }

    fn dispatch(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Fader { channel, value } => {
                debug!("📥 Fader {} = {:.3}", channel, value.get());
                self.notify_channel(&channel, ChannelUpdate::Fader(value.get()));
            }
            InboundMessage::Mute { channel, muted } => {
                debug!("📥 Mute {} = {}", channel, muted);
                self.notify_channel(&channel, ChannelUpdate::Mute(muted));
            }
            InboundMessage::Meters { left, right } => {
                trace!("📥 Meters L={} R={}", left, right);
                self.sink.on_meters(map_level(left), map_level(right));
            }
            InboundMessage::Unrecognized { kind } => {
                warn!("Dropping message with unknown type '{}'", kind);
            }
        }
    }

    /// Forward a per-channel update, plus the master presentation for the master bus
    fn notify_channel(&mut self, channel: &ChannelId, update: ChannelUpdate) {
        match update {
            ChannelUpdate::Fader(value) => self.sink.on_fader(channel, value),
            ChannelUpdate::Mute(muted) => self.sink.on_mute(channel, muted),
        }

        if channel.is_master() {
            match update {
                ChannelUpdate::Fader(value) => self.sink.on_master_fader(value),
                ChannelUpdate::Mute(muted) => self.sink.on_master_mute(muted),
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!("Channel state {} → {}", self.state, state);
        self.state = state;
        self.sink.on_connection_state(state);
    }
}

impl<T: Transport, R: RetryTimer, S: StateSink> Drop for ControlChannel<T, R, S> {
    fn drop(&mut self) {
        self.timer.cancel();
        self.transport.close();
    }
}
