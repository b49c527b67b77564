//! Mixer Remote - control client for a networked audio mixer bridge
//!
//! Keeps one WebSocket control channel to the bridge alive, pushes fader and
//! mute changes, and mirrors the state the bridge pushes back into a
//! [`sink::StateSink`].

pub mod channel;
pub mod cli;
pub mod config;
pub mod level;
pub mod protocol;
pub mod sink;
pub mod sound;

pub use channel::{ConnectionState, ControlChannelHandle, ReconnectBackoff};
pub use config::AppConfig;
pub use protocol::ChannelId;
