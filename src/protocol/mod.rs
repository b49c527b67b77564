//! Wire protocol between the remote and the mixer server
//!
//! JSON text frames over the control WebSocket. See [`messages`] for the
//! message set and [`types`] for the value types carried in them.

pub mod messages;
pub mod types;

pub use messages::{DecodeError, InboundMessage, OutboundMessage};
pub use types::{ChannelId, ControlValue};
