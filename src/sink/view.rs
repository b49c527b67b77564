//! In-memory mixer presentation
//!
//! Holds what a UI would render: one strip per configured channel, the master
//! strip, the stereo meter and the connection state. Cloning the view shares
//! the same underlying state, so the REPL can read what the channel task writes.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use super::StateSink;
use crate::channel::ConnectionState;
use crate::config::ChannelConfig;
use crate::level::LevelReading;
use crate::protocol::ChannelId;

/// Presentation state of one strip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripState {
    /// Display name
    pub name: String,
    /// Fader position (0.0-1.0)
    pub fader: f64,
    /// Mute button lit
    pub muted: bool,
}

impl StripState {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fader: 0.0,
            muted: false,
        }
    }
}

#[derive(Debug)]
struct Bus {
    master: StripState,
    meters: (LevelReading, LevelReading),
    connection: ConnectionState,
    ready_count: u64,
}

/// Point-in-time copy of the view, strips in configuration order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub connection: ConnectionState,
    pub strips: Vec<(ChannelId, StripState)>,
    pub master: StripState,
    pub meters: (LevelReading, LevelReading),
    /// How many times the channel reported ready
    pub ready_count: u64,
}

/// Shared mixer presentation
#[derive(Clone)]
pub struct MixerView {
    layout: Arc<Vec<ChannelConfig>>,
    strips: Arc<DashMap<ChannelId, StripState>>,
    bus: Arc<RwLock<Bus>>,
}

impl MixerView {
    /// Create a view for the given channel layout
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        let view = Self {
            layout: Arc::new(channels),
            strips: Arc::new(DashMap::new()),
            bus: Arc::new(RwLock::new(Bus {
                master: StripState::new("Master"),
                meters: (LevelReading::SILENT, LevelReading::SILENT),
                connection: ConnectionState::Disconnected,
                ready_count: 0,
            })),
        };
        view.rebuild();
        view
    }

    /// Reset every strip of the layout to default values
    ///
    /// The key set is fixed by the layout, so entries are overwritten in place
    /// and a concurrent reader never sees a strip missing.
    fn rebuild(&self) {
        for channel in self.layout.iter() {
            self.strips
                .insert(ChannelId::new(channel.id.clone()), StripState::new(&channel.name));
        }
        self.bus.write().master = StripState::new("Master");
    }

    /// Look up a strip by id
    pub fn strip(&self, channel: &ChannelId) -> Option<StripState> {
        self.strips.get(channel).map(|entry| entry.value().clone())
    }

    /// Find a strip id by display name or id (case-insensitive)
    pub fn resolve(&self, name: &str) -> Option<ChannelId> {
        if name.eq_ignore_ascii_case(ChannelId::MASTER) {
            return Some(ChannelId::master());
        }
        self.layout
            .iter()
            .find(|c| c.id.eq_ignore_ascii_case(name) || c.name.eq_ignore_ascii_case(name))
            .map(|c| ChannelId::new(c.id.clone()))
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.bus.read().connection
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let strips = self
            .layout
            .iter()
            .filter_map(|c| {
                let id = ChannelId::new(c.id.clone());
                self.strip(&id).map(|strip| (id, strip))
            })
            .collect();

        let bus = self.bus.read();
        ViewSnapshot {
            connection: bus.connection,
            strips,
            master: bus.master.clone(),
            meters: bus.meters,
            ready_count: bus.ready_count,
        }
    }
}

impl StateSink for MixerView {
    fn on_ready(&mut self) {
        self.rebuild();
        self.bus.write().ready_count += 1;
        debug!("Mixer view rebuilt with {} strips", self.layout.len());
    }

    fn on_fader(&mut self, channel: &ChannelId, value: f64) {
        match self.strips.get_mut(channel) {
            Some(mut strip) => strip.fader = value,
            None if channel.is_master() => {}
            None => debug!("No strip for channel '{}', fader update ignored", channel),
        }
    }

    fn on_mute(&mut self, channel: &ChannelId, muted: bool) {
        match self.strips.get_mut(channel) {
            Some(mut strip) => strip.muted = muted,
            None if channel.is_master() => {}
            None => debug!("No strip for channel '{}', mute update ignored", channel),
        }
    }

    fn on_meters(&mut self, left: LevelReading, right: LevelReading) {
        self.bus.write().meters = (left, right);
    }

    fn on_master_fader(&mut self, value: f64) {
        self.bus.write().master.fader = value;
    }

    fn on_master_mute(&mut self, muted: bool) {
        self.bus.write().master.muted = muted;
    }

    fn on_connection_state(&mut self, state: ConnectionState) {
        self.bus.write().connection = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{map_level, Band};

    fn layout() -> Vec<ChannelConfig> {
        vec![
            ChannelConfig::new("Headset 1", "Headset 1"),
            ChannelConfig::new("HDMI", "hdmi"),
        ]
    }

    #[test]
    fn test_updates_known_strips() {
        let mut view = MixerView::new(layout());
        view.on_fader(&"Headset 1".into(), 0.75);
        view.on_mute(&"hdmi".into(), true);

        let snapshot = view.snapshot();
        assert_eq!(snapshot.strips.len(), 2);
        assert_eq!(snapshot.strips[0].1.fader, 0.75);
        assert!(snapshot.strips[1].1.muted);
    }

    #[test]
    fn test_ready_keeps_every_strip_visible_to_readers() {
        let mut view = MixerView::new(layout());
        let reader = view.clone();

        let watcher = std::thread::spawn(move || {
            for _ in 0..2_000 {
                assert_eq!(reader.snapshot().strips.len(), 2);
            }
        });

        for _ in 0..2_000 {
            view.on_fader(&"hdmi".into(), 0.5);
            view.on_ready();
        }

        watcher.join().unwrap();
        assert_eq!(view.strip(&"hdmi".into()).unwrap().fader, 0.0);
    }

    #[test]
    fn test_unknown_channel_is_noop() {
        let mut view = MixerView::new(layout());
        let before = view.snapshot();
        view.on_fader(&"Hand 9".into(), 0.5);
        view.on_mute(&"Hand 9".into(), true);
        assert_eq!(view.snapshot(), before);
    }

    #[test]
    fn test_master_presentation() {
        let mut view = MixerView::new(layout());
        let master = ChannelId::master();
        view.on_fader(&master, 0.9);
        view.on_master_fader(0.9);
        view.on_master_mute(true);

        let snapshot = view.snapshot();
        assert_eq!(snapshot.master.fader, 0.9);
        assert!(snapshot.master.muted);
        assert!(snapshot.strips.iter().all(|(_, s)| s.fader == 0.0));
    }

    #[test]
    fn test_ready_rebuilds_strips() {
        let mut view = MixerView::new(layout());
        view.on_fader(&"hdmi".into(), 0.3);
        view.on_ready();

        let snapshot = view.snapshot();
        assert_eq!(snapshot.ready_count, 1);
        assert_eq!(snapshot.strips[1].1.fader, 0.0);
    }

    #[test]
    fn test_clones_share_state() {
        let view = MixerView::new(layout());
        let mut writer = view.clone();
        writer.on_meters(map_level(-3.0), map_level(-30.0));
        writer.on_connection_state(ConnectionState::Open);

        let snapshot = view.snapshot();
        assert_eq!(snapshot.meters.0.band, Band::High);
        assert_eq!(snapshot.meters.1.band, Band::Low);
        assert_eq!(view.connection_state(), ConnectionState::Open);
    }

    #[test]
    fn test_resolve_by_name_or_id() {
        let view = MixerView::new(layout());
        assert_eq!(view.resolve("HDMI"), Some(ChannelId::new("hdmi")));
        assert_eq!(view.resolve("headset 1"), Some(ChannelId::new("Headset 1")));
        assert_eq!(view.resolve("MASTER"), Some(ChannelId::master()));
        assert_eq!(view.resolve("Hand 2"), None);
    }
}
