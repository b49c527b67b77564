//! Console sink - logs all mixer updates for monitoring and debugging

use tracing::{debug, info, trace};

use super::StateSink;
use crate::channel::ConnectionState;
use crate::level::LevelReading;
use crate::protocol::ChannelId;

/// ConsoleSink logs every update it receives
///
/// Useful for:
/// - Running headless and watching the console from a terminal
/// - Debugging the server's push traffic
pub struct ConsoleSink {
    /// Update counter for debugging
    update_count: u64,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self { update_count: 0 }
    }

    /// Number of updates logged so far (readiness and state changes excluded)
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    fn stamp() -> String {
        chrono::Local::now().format("%H:%M:%S%.3f").to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSink for ConsoleSink {
    fn on_ready(&mut self) {
        info!("✅ [{}] Mixer connection ready, requesting current values", Self::stamp());
    }

    fn on_fader(&mut self, channel: &ChannelId, value: f64) {
        self.update_count += 1;
        info!(
            "🎚️  [{}] Fader '{}' → {:.3} [update #{}]",
            Self::stamp(),
            channel,
            value,
            self.update_count
        );
    }

    fn on_mute(&mut self, channel: &ChannelId, muted: bool) {
        self.update_count += 1;
        info!(
            "🔇 [{}] Mute '{}' → {} [update #{}]",
            Self::stamp(),
            channel,
            if muted { "muted" } else { "live" },
            self.update_count
        );
    }

    fn on_meters(&mut self, left: LevelReading, right: LevelReading) {
        self.update_count += 1;
        trace!(
            left_percent = left.percent,
            left_band = %left.band,
            right_percent = right.percent,
            right_band = %right.band,
            "Meters"
        );
    }

    fn on_master_fader(&mut self, value: f64) {
        debug!("Master fader presentation → {:.3}", value);
    }

    fn on_master_mute(&mut self, muted: bool) {
        debug!("Master mute presentation → {}", muted);
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        info!("🔌 [{}] Connection {}", Self::stamp(), state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::map_level;

    #[test]
    fn test_console_sink_counts_updates() {
        let mut sink = ConsoleSink::new();
        sink.on_ready();
        sink.on_fader(&"Hand 1".into(), 0.5);
        sink.on_mute(&"Hand 1".into(), true);
        sink.on_meters(map_level(-10.0), map_level(-20.0));
        sink.on_connection_state(ConnectionState::Open);

        assert_eq!(sink.update_count(), 3);
    }
}
