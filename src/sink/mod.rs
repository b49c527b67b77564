//! State sinks - consumers of decoded mixer state
//!
//! The control channel never touches presentation directly. It notifies a
//! [`StateSink`] of every authoritative update and of its own readiness.
//! The sink is the only thing allowed to mutate presentation.

use crate::channel::ConnectionState;
use crate::level::LevelReading;
use crate::protocol::ChannelId;

pub mod console;
pub mod view;

pub use console::ConsoleSink;
pub use view::{MixerView, StripState, ViewSnapshot};

/// Receiver of decoded channel events
///
/// All methods run on the control channel's task and must not block.
/// Updates for channels the sink does not know are expected to be no-ops.
pub trait StateSink: Send {
    /// The connection is open; (re)build presentation and re-attach input.
    fn on_ready(&mut self);

    /// Fader position for a channel (already clamped to [0, 1])
    fn on_fader(&mut self, channel: &ChannelId, value: f64);

    /// Mute state for a channel
    fn on_mute(&mut self, channel: &ChannelId, muted: bool);

    /// Mapped stereo meter readings
    fn on_meters(&mut self, left: LevelReading, right: LevelReading);

    /// Additional notification for the master bus fader
    fn on_master_fader(&mut self, _value: f64) {}

    /// Additional notification for the master bus mute
    fn on_master_mute(&mut self, _muted: bool) {}

    /// Connection state changed
    ///
    /// Default implementation: no-op (sinks may ignore connection state)
    fn on_connection_state(&mut self, _state: ConnectionState) {}
}

/// Fan out every notification to two sinks, left first
impl<A: StateSink, B: StateSink> StateSink for (A, B) {
    fn on_ready(&mut self) {
        self.0.on_ready();
        self.1.on_ready();
    }

    fn on_fader(&mut self, channel: &ChannelId, value: f64) {
        self.0.on_fader(channel, value);
        self.1.on_fader(channel, value);
    }

    fn on_mute(&mut self, channel: &ChannelId, muted: bool) {
        self.0.on_mute(channel, muted);
        self.1.on_mute(channel, muted);
    }

    fn on_meters(&mut self, left: LevelReading, right: LevelReading) {
        self.0.on_meters(left, right);
        self.1.on_meters(left, right);
    }

    fn on_master_fader(&mut self, value: f64) {
        self.0.on_master_fader(value);
        self.1.on_master_fader(value);
    }

    fn on_master_mute(&mut self, muted: bool) {
        self.0.on_master_mute(muted);
        self.1.on_master_mute(muted);
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        self.0.on_connection_state(state);
        self.1.on_connection_state(state);
    }
}

impl<S: StateSink + ?Sized> StateSink for Box<S> {
    fn on_ready(&mut self) {
        (**self).on_ready()
    }

    fn on_fader(&mut self, channel: &ChannelId, value: f64) {
        (**self).on_fader(channel, value)
    }

    fn on_mute(&mut self, channel: &ChannelId, muted: bool) {
        (**self).on_mute(channel, muted)
    }

    fn on_meters(&mut self, left: LevelReading, right: LevelReading) {
        (**self).on_meters(left, right)
    }

    fn on_master_fader(&mut self, value: f64) {
        (**self).on_master_fader(value)
    }

    fn on_master_mute(&mut self, muted: bool) {
        (**self).on_master_mute(muted)
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        (**self).on_connection_state(state)
    }
}
