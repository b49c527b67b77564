//! Meter level mapping
//!
//! Converts a decibel telemetry value into a bounded display percentage and a
//! severity band. Pure and total: every input, including NaN and infinities,
//! produces a defined reading.

use serde::Serialize;
use serde_json::Value;

/// Silence floor of the meter scale (0%)
pub const FLOOR_DB: f64 = -48.0;
/// Full scale (100%)
pub const CEILING_DB: f64 = 0.0;
/// Lower bound of the High band
pub const HIGH_THRESHOLD_DB: f64 = -6.0;
/// Lower bound of the Medium band
pub const MEDIUM_THRESHOLD_DB: f64 = -12.0;

/// Severity band of a meter reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Below -12 dB
    Low,
    /// -12 dB up to (excluding) -6 dB
    Medium,
    /// -6 dB and above
    High,
}

impl Band {
    /// Lowercase display name (`low`, `medium`, `high`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Low => "low",
            Band::Medium => "medium",
            Band::High => "high",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapped meter value for one side
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelReading {
    /// Display height in percent (0-100)
    pub percent: f64,
    /// Severity band derived from the dB value
    pub band: Band,
}

impl LevelReading {
    /// Reading of a silent input
    pub const SILENT: LevelReading = LevelReading {
        percent: 0.0,
        band: Band::Low,
    };
}

impl Default for LevelReading {
    fn default() -> Self {
        Self::SILENT
    }
}

/// Map a dB value to a display percentage and band
///
/// Non-finite input is treated as negative infinity. Between the floor and
/// full scale the percentage is linear; the band is classified on the dB
/// value, not on the percentage.
pub fn map_level(db: f64) -> LevelReading {
    let db = if db.is_finite() { db } else { f64::NEG_INFINITY };

    let percent = if db <= FLOOR_DB {
        0.0
    } else if db >= CEILING_DB {
        100.0
    } else {
        (db - FLOOR_DB) * 100.0 / (CEILING_DB - FLOOR_DB)
    };

    let band = if db >= HIGH_THRESHOLD_DB {
        Band::High
    } else if db >= MEDIUM_THRESHOLD_DB {
        Band::Medium
    } else {
        Band::Low
    };

    LevelReading { percent, band }
}

/// Coerce a loosely typed telemetry value into dB
///
/// Numbers pass through, numeric strings (including `"-inf"`) are parsed,
/// everything else degrades to the silence floor.
pub fn level_from_json(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NEG_INFINITY),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NEG_INFINITY),
        _ => f64::NEG_INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_midpoint_is_exactly_half() {
        let reading = map_level(-24.0);
        assert_eq!(reading.percent, 50.0);
        assert_eq!(reading.band, Band::Low);
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(map_level(-6.0).band, Band::High);
        assert_eq!(map_level(-6.01).band, Band::Medium);
        assert_eq!(map_level(-12.0).band, Band::Medium);
        assert_eq!(map_level(-12.01).band, Band::Low);
    }

    #[test]
    fn test_non_finite_is_silence() {
        assert_eq!(map_level(f64::NEG_INFINITY), LevelReading::SILENT);
        assert_eq!(map_level(f64::NAN), LevelReading::SILENT);
        assert_eq!(map_level(f64::INFINITY), LevelReading::SILENT);
    }

    #[test]
    fn test_level_from_json() {
        assert_eq!(level_from_json(&json!(-12.5)), -12.5);
        assert_eq!(level_from_json(&json!("-3")), -3.0);
        assert_eq!(level_from_json(&json!("-inf")), f64::NEG_INFINITY);
        assert_eq!(level_from_json(&json!("loud")), f64::NEG_INFINITY);
        assert_eq!(level_from_json(&json!(null)), f64::NEG_INFINITY);
        assert_eq!(map_level(level_from_json(&json!({"db": 0}))), LevelReading::SILENT);
    }

    proptest! {
        #[test]
        fn prop_below_floor_is_zero_low(db in -1.0e9f64..=FLOOR_DB) {
            let reading = map_level(db);
            prop_assert_eq!(reading.percent, 0.0);
            prop_assert_eq!(reading.band, Band::Low);
        }

        #[test]
        fn prop_above_ceiling_is_full_high(db in CEILING_DB..1.0e9f64) {
            let reading = map_level(db);
            prop_assert_eq!(reading.percent, 100.0);
            prop_assert_eq!(reading.band, Band::High);
        }

        #[test]
        fn prop_percent_bounded_and_monotonic(a in -100.0f64..20.0, b in -100.0f64..20.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (p_lo, p_hi) = (map_level(lo).percent, map_level(hi).percent);
            prop_assert!((0.0..=100.0).contains(&p_lo));
            prop_assert!((0.0..=100.0).contains(&p_hi));
            prop_assert!(p_lo <= p_hi);
        }
    }
}
