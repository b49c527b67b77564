//! Control protocol messages
//!
//! One JSON object per text frame, discriminated by its `type` field.

use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use super::types::{mute_from_wire, mute_to_wire, ChannelId, ControlValue};
use crate::level::level_from_json;

/// Messages sent to the mixer server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask the server to push the full current state
    RequestInitialValues,
    /// Move a fader
    Fader { channel: ChannelId, value: ControlValue },
    /// Set a mute state (0 = muted, 1 = unmuted)
    Mute { channel: ChannelId, value: u8 },
}

impl OutboundMessage {
    pub fn fader(channel: ChannelId, value: f64) -> Self {
        Self::Fader {
            channel,
            value: ControlValue::new(value),
        }
    }

    pub fn mute(channel: ChannelId, muted: bool) -> Self {
        Self::Mute {
            channel,
            value: mute_to_wire(muted),
        }
    }

    /// Encode as a JSON text frame
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Messages pushed by the mixer server
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Authoritative fader position (already clamped)
    Fader { channel: ChannelId, value: ControlValue },
    /// Authoritative mute state
    Mute { channel: ChannelId, muted: bool },
    /// Stereo meter levels in dB (non-numeric values degraded to -inf)
    Meters { left: f64, right: f64 },
    /// Well-formed message with a `type` this client does not know
    Unrecognized { kind: String },
}

/// Reasons an inbound frame could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no string 'type' field")]
    MissingType,

    #[error("invalid '{kind}' payload: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level fields of a frame, values left unparsed
///
/// Numbers are scanned but not evaluated here, so literals outside the f64
/// range (`1e400`) survive until [`number`] reads them as infinities.
type Fields = BTreeMap<String, Box<RawValue>>;

impl InboundMessage {
    /// Decode a text frame
    ///
    /// Unknown `type` values yield [`InboundMessage::Unrecognized`]; anything
    /// that is not an object with a string `type` or carries a broken payload
    /// is an error. Out-of-range numbers are clamped, never rejected.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let mut fields: Fields = serde_json::from_str(text).map_err(|e| {
            if e.is_data() {
                DecodeError::NotAnObject
            } else {
                DecodeError::Json(e)
            }
        })?;
        let kind = fields
            .remove("type")
            .and_then(|raw| serde_json::from_str::<String>(raw.get()).ok())
            .ok_or(DecodeError::MissingType)?;

        match kind.as_str() {
            "fader" => Ok(Self::Fader {
                channel: channel_field("fader", &fields)?,
                value: ControlValue::new(number_field("fader", &fields, "value")?),
            }),
            "mute" => Ok(Self::Mute {
                channel: channel_field("mute", &fields)?,
                muted: mute_from_wire(number_field("mute", &fields, "value")?),
            }),
            "meters" => Ok(Self::Meters {
                left: meter_field(&fields, "left"),
                right: meter_field(&fields, "right"),
            }),
            _ => Ok(Self::Unrecognized { kind }),
        }
    }
}

/// Read a JSON number literal; overflow saturates to an infinity
fn number(raw: &RawValue) -> Option<f64> {
    let text = raw.get().trim();
    match text.as_bytes().first() {
        Some(b'-' | b'0'..=b'9') => text.parse::<f64>().ok(),
        _ => None,
    }
}

fn field<'a>(kind: &'static str, fields: &'a Fields, name: &'static str) -> Result<&'a RawValue, DecodeError> {
    fields
        .get(name)
        .map(|raw| &**raw)
        .ok_or_else(|| DecodeError::Payload {
            kind,
            source: serde::de::Error::missing_field(name),
        })
}

fn channel_field(kind: &'static str, fields: &Fields) -> Result<ChannelId, DecodeError> {
    let raw = field(kind, fields, "channel")?;
    serde_json::from_str(raw.get()).map_err(|source| DecodeError::Payload { kind, source })
}

fn number_field(kind: &'static str, fields: &Fields, name: &'static str) -> Result<f64, DecodeError> {
    let raw = field(kind, fields, name)?;
    match number(raw) {
        Some(value) => Ok(value),
        // Not a number literal; let serde_json report the type mismatch
        None => serde_json::from_str::<f64>(raw.get())
            .map_err(|source| DecodeError::Payload { kind, source }),
    }
}

fn meter_field(fields: &Fields, name: &str) -> f64 {
    let Some(raw) = fields.get(name) else {
        return f64::NEG_INFINITY;
    };
    number(raw).unwrap_or_else(|| {
        serde_json::from_str::<Value>(raw.get())
            .map(|value| level_from_json(&value))
            .unwrap_or(f64::NEG_INFINITY)
    })
}
