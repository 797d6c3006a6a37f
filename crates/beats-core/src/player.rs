//! Reconciled player state and the field reconciler.
//!
//! Every control field is a `Held` value.  Poll results are *offered* to the
//! state one field at a time; a held field rejects the offer, an unheld
//! field takes it (decibel fields after `round_db`).  Playback time,
//! duration and play/pause state are not user-editable and are written
//! directly.

use std::collections::BTreeMap;

use beats_proto::format::round_db;
use beats_proto::protocol::NowPlaying;
use tracing::debug;

use crate::hold::{FieldKey, Held};

/// One incoming or outgoing value for a control field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldUpdate {
    Volume(f64),
    EqEnabled(bool),
    EqPreset(usize),
    Preamp(f64),
    Band(usize, f64),
}

impl FieldUpdate {
    pub fn key(&self) -> FieldKey {
        match self {
            FieldUpdate::Volume(_) => FieldKey::Volume,
            FieldUpdate::EqEnabled(_) => FieldKey::EqEnabled,
            FieldUpdate::EqPreset(_) => FieldKey::EqPreset,
            FieldUpdate::Preamp(_) => FieldKey::Preamp,
            FieldUpdate::Band(band, _) => FieldKey::Band(*band),
        }
    }

    /// Decibel values rounded to one decimal; everything else unchanged.
    pub fn canonical(self) -> Self {
        match self {
            FieldUpdate::Preamp(level) => FieldUpdate::Preamp(round_db(level)),
            FieldUpdate::Band(band, level) => FieldUpdate::Band(band, round_db(level)),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Applied,
    /// The field is held by a local edit; the incoming value was dropped.
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerState {
    volume: Held<f64>,
    eq_enabled: Held<bool>,
    eq_preset: Held<usize>,
    preamp: Held<f64>,
    bands: BTreeMap<usize, Held<f64>>,
    pub playback_time: f64,
    pub playback_duration: f64,
    pub is_playing: bool,
}

impl PlayerState {
    pub fn volume(&self) -> f64 {
        *self.volume.value()
    }

    pub fn eq_enabled(&self) -> bool {
        *self.eq_enabled.value()
    }

    pub fn eq_preset(&self) -> usize {
        *self.eq_preset.value()
    }

    pub fn preamp(&self) -> f64 {
        *self.preamp.value()
    }

    pub fn band_level(&self, band: usize) -> Option<f64> {
        self.bands.get(&band).map(|slot| *slot.value())
    }

    /// `(band index, level)` in band order.
    pub fn band_levels(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.bands.iter().map(|(band, slot)| (*band, *slot.value()))
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Current value of `key`, as an update.  `None` for an unknown band.
    pub fn current(&self, key: FieldKey) -> Option<FieldUpdate> {
        Some(match key {
            FieldKey::Volume => FieldUpdate::Volume(self.volume()),
            FieldKey::EqEnabled => FieldUpdate::EqEnabled(self.eq_enabled()),
            FieldKey::EqPreset => FieldUpdate::EqPreset(self.eq_preset()),
            FieldKey::Preamp => FieldUpdate::Preamp(self.preamp()),
            FieldKey::Band(band) => FieldUpdate::Band(band, self.band_level(band)?),
        })
    }

    /// Make sure a slot exists for `band`; new slots start at 0 dB, unheld.
    pub fn ensure_band(&mut self, band: usize) {
        self.bands.entry(band).or_insert_with(|| Held::new(0.0));
    }

    pub fn is_held(&self, key: FieldKey) -> bool {
        match key {
            FieldKey::Volume => self.volume.is_held(),
            FieldKey::EqEnabled => self.eq_enabled.is_held(),
            FieldKey::EqPreset => self.eq_preset.is_held(),
            FieldKey::Preamp => self.preamp.is_held(),
            FieldKey::Band(band) => self.bands.get(&band).is_some_and(|s| s.is_held()),
        }
    }

    /// No-op for a band without a slot.
    pub fn set_hold(&mut self, key: FieldKey, hold: bool) {
        match key {
            FieldKey::Volume => self.volume.set_hold(hold),
            FieldKey::EqEnabled => self.eq_enabled.set_hold(hold),
            FieldKey::EqPreset => self.eq_preset.set_hold(hold),
            FieldKey::Preamp => self.preamp.set_hold(hold),
            FieldKey::Band(band) => {
                if let Some(slot) = self.bands.get_mut(&band) {
                    slot.set_hold(hold);
                }
            }
        }
    }

    /// Write a locally-produced value, ignoring the hold flag.  Only
    /// `reconcile` and `ensure_band` create band slots, so a band without
    /// one is left alone.
    pub fn set_local(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Volume(v) => self.volume.set_local(v),
            FieldUpdate::EqEnabled(v) => self.eq_enabled.set_local(v),
            FieldUpdate::EqPreset(v) => self.eq_preset.set_local(v),
            FieldUpdate::Preamp(v) => self.preamp.set_local(v),
            FieldUpdate::Band(band, v) => {
                if let Some(slot) = self.bands.get_mut(&band) {
                    slot.set_local(v);
                }
            }
        }
    }

    /// Offer a remote value for one field.
    pub fn reconcile(&mut self, update: FieldUpdate) -> Reconciled {
        let update = update.canonical();
        let accepted = match update {
            FieldUpdate::Volume(v) => self.volume.offer(v),
            FieldUpdate::EqEnabled(v) => self.eq_enabled.offer(v),
            FieldUpdate::EqPreset(v) => self.eq_preset.offer(v),
            FieldUpdate::Preamp(v) => self.preamp.offer(v),
            // A band seen for the first time gets an unheld slot and accepts.
            FieldUpdate::Band(band, v) => self
                .bands
                .entry(band)
                .or_insert_with(|| Held::new(0.0))
                .offer(v),
        };
        if accepted {
            Reconciled::Applied
        } else {
            debug!("reconcile: {} held, dropped remote {:?}", update.key(), update);
            Reconciled::Rejected
        }
    }

    /// Merge a `now_playing` snapshot.  Returns `true` when the snapshot
    /// carried equalizer fields, i.e. every decibel label may have changed.
    pub fn apply_now_playing(&mut self, snapshot: &NowPlaying) -> bool {
        let (time, duration) = snapshot.timeline_secs();
        self.playback_time = time;
        self.playback_duration = duration;

        let status = &snapshot.player_status;
        self.reconcile(FieldUpdate::Volume(status.volume));

        let Some(enabled) = status.equalizer_enabled else {
            self.is_playing = status.is_playing();
            return false;
        };
        self.reconcile(FieldUpdate::EqEnabled(enabled));
        if let Some(preset) = status.equalizer_preset {
            self.reconcile(FieldUpdate::EqPreset(preset));
        }
        if let Some(preamp) = status.equalizer_preamp_level {
            self.reconcile(FieldUpdate::Preamp(preamp));
        }
        if let Some(levels) = &status.equalizer_band_levels {
            for (band, level) in levels.iter().enumerate() {
                self.reconcile(FieldUpdate::Band(band, *level));
            }
        }
        self.is_playing = status.is_playing();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beats_proto::protocol::{Media, PlayerStatus};

    fn snapshot(volume: f64, bands: Vec<f64>) -> NowPlaying {
        NowPlaying {
            media: Some(Media {
                length: 200.0,
                ..Default::default()
            }),
            player_status: PlayerStatus {
                current_time: 30_500.0,
                volume,
                state: "State.Playing".to_string(),
                equalizer_enabled: Some(true),
                equalizer_preset: Some(2),
                equalizer_preamp_level: Some(1.26),
                equalizer_band_levels: Some(bands),
            },
        }
    }

    fn every_update() -> Vec<FieldUpdate> {
        vec![
            FieldUpdate::Volume(77.0),
            FieldUpdate::EqEnabled(true),
            FieldUpdate::EqPreset(5),
            FieldUpdate::Preamp(-4.44),
            FieldUpdate::Band(0, 6.05),
            FieldUpdate::Band(3, -1.0),
        ]
    }

    #[test]
    fn test_held_fields_never_change() {
        for update in every_update() {
            let mut state = PlayerState::default();
            if let FieldKey::Band(band) = update.key() {
                state.ensure_band(band);
            }
            state.set_hold(update.key(), true);
            let before = state.current(update.key());
            assert_eq!(state.reconcile(update), Reconciled::Rejected);
            assert_eq!(state.current(update.key()), before, "{:?}", update);
        }
    }

    #[test]
    fn test_unheld_fields_adopt_canonical_value() {
        for update in every_update() {
            let mut state = PlayerState::default();
            assert_eq!(state.reconcile(update), Reconciled::Applied);
            assert_eq!(state.current(update.key()), Some(update.canonical()));
        }
        let mut state = PlayerState::default();
        state.reconcile(FieldUpdate::Preamp(-4.44));
        assert_eq!(state.preamp(), -4.4);
    }

    #[test]
    fn test_volume_is_not_rounded() {
        let mut state = PlayerState::default();
        state.reconcile(FieldUpdate::Volume(41.6));
        assert_eq!(state.volume(), 41.6);
    }

    #[test]
    fn test_unknown_band_is_created_unheld() {
        let mut state = PlayerState::default();
        assert!(!state.is_held(FieldKey::Band(7)));
        assert_eq!(state.band_level(7), None);
        assert_eq!(state.reconcile(FieldUpdate::Band(7, 2.0)), Reconciled::Applied);
        assert_eq!(state.band_level(7), Some(2.0));
        assert!(!state.is_held(FieldKey::Band(7)));
    }

    #[test]
    fn test_local_edits_never_create_bands() {
        let mut state = PlayerState::default();
        state.ensure_band(0);
        state.set_hold(FieldKey::Band(4), true);
        state.set_local(FieldUpdate::Band(4, 3.0));
        assert_eq!(state.band_count(), 1);
        assert_eq!(state.band_level(4), None);
        assert!(!state.is_held(FieldKey::Band(4)));
    }

    #[test]
    fn test_poll_skips_held_band_only() {
        let mut state = PlayerState::default();
        state.ensure_band(0);
        state.ensure_band(1);
        state.set_local(FieldUpdate::Band(1, 5.5));
        state.set_hold(FieldKey::Band(1), true);

        assert!(state.apply_now_playing(&snapshot(50.0, vec![1.0, -2.0])));
        assert_eq!(state.band_level(0), Some(1.0));
        assert_eq!(state.band_level(1), Some(5.5));
    }

    #[test]
    fn test_poll_applies_timeline_even_when_held() {
        let mut state = PlayerState::default();
        state.set_hold(FieldKey::Volume, true);
        state.set_local(FieldUpdate::Volume(12.0));

        state.apply_now_playing(&snapshot(90.0, vec![]));
        assert_eq!(state.playback_time, 30.5);
        assert_eq!(state.playback_duration, 200.0);
        assert!(state.is_playing);
        assert_eq!(state.volume(), 12.0);
        assert_eq!(state.eq_preset(), 2);
        assert_eq!(state.preamp(), 1.3);
    }

    #[test]
    fn test_poll_without_equalizer_leaves_eq_fields() {
        let mut state = PlayerState::default();
        state.set_local(FieldUpdate::Preamp(3.0));
        let snap = NowPlaying {
            media: None,
            player_status: PlayerStatus {
                current_time: 999.0,
                volume: 33.0,
                state: "State.Paused".to_string(),
                ..Default::default()
            },
        };
        assert!(!state.apply_now_playing(&snap));
        assert_eq!(state.playback_time, 0.0);
        assert_eq!(state.playback_duration, 0.0);
        assert_eq!(state.volume(), 33.0);
        assert_eq!(state.preamp(), 3.0);
        assert!(!state.is_playing);
    }
}
