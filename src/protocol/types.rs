//! Protocol value types
//!
//! Channel identifiers, clamped fader values and the inverted mute encoding.

use serde::{Deserialize, Serialize};

/// Identifier of an audio channel as used on the wire
///
/// Opaque string. The literal `"master"` denotes the master bus and is the
/// only value the dispatcher treats specially.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Reserved identifier of the master bus
    pub const MASTER: &'static str = "master";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The master bus sentinel
    pub fn master() -> Self {
        Self(Self::MASTER.to_string())
    }

    pub fn is_master(&self) -> bool {
        self.0 == Self::MASTER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ChannelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fader position in [0.0, 1.0]
///
/// Construction always clamps; NaN collapses to 0.0.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct ControlValue(f64);

impl ControlValue {
    pub const MIN: ControlValue = ControlValue(0.0);
    pub const MAX: ControlValue = ControlValue(1.0);

    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl From<f64> for ControlValue {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for ControlValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(ControlValue::new)
    }
}

/// Wire encoding of a mute state: 0 = muted, 1 = unmuted
pub fn mute_to_wire(muted: bool) -> u8 {
    if muted {
        0
    } else {
        1
    }
}

/// Decode a wire mute value; only an exact 0 means muted
pub fn mute_from_wire(value: f64) -> bool {
    value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_master_sentinel() {
        assert!(ChannelId::master().is_master());
        assert!(ChannelId::from("master").is_master());
        assert!(!ChannelId::from("Master").is_master());
        assert!(!ChannelId::from("Headset 1").is_master());
    }

    #[test]
    fn test_control_value_clamps() {
        assert_eq!(ControlValue::new(1.5).get(), 1.0);
        assert_eq!(ControlValue::new(-0.2).get(), 0.0);
        assert_eq!(ControlValue::new(0.42).get(), 0.42);
        assert_eq!(ControlValue::new(f64::NAN).get(), 0.0);
        assert_eq!(ControlValue::new(f64::INFINITY).get(), 1.0);
    }

    #[test]
    fn test_control_value_deserialize_clamps() {
        let value: ControlValue = serde_json::from_str("7.5").unwrap();
        assert_eq!(value, ControlValue::MAX);
    }

    #[test]
    fn test_mute_inversion() {
        assert_eq!(mute_to_wire(true), 0);
        assert_eq!(mute_to_wire(false), 1);
        assert!(mute_from_wire(0.0));
        assert!(!mute_from_wire(1.0));
        assert!(!mute_from_wire(2.0));
    }

    proptest! {
        #[test]
        fn prop_control_value_in_range(v in proptest::num::f64::ANY) {
            let clamped = ControlValue::new(v).get();
            prop_assert!((0.0..=1.0).contains(&clamped));
        }
    }
}
