//! Command dispatcher: turns control gestures and votes into commands.
//!
//! A gesture is `begin` → any number of `drag`s → `end`.  `begin` holds the
//! field so polls stop overwriting it, `drag` edits the local value live,
//! and `end` releases the hold, canonicalises the value and yields the one
//! command to send.  The hold is released here, before the command is even
//! sent; see `crate::hold` for why that is the contract.

use std::collections::HashMap;

use beats_proto::config::EqualizerConfig;
use beats_proto::format::round_db;
use beats_proto::protocol::{Command, Song};
use tracing::debug;

use crate::control::{BarControl, Orientation, ToggleGesture};
use crate::error::ClientError;
use crate::hold::FieldKey;
use crate::player::FieldUpdate;
use crate::view::ViewState;

pub const VOLUME_MIN: f64 = 0.0;
pub const VOLUME_MAX: f64 = 100.0;

/// Per-gesture scratch state.
#[derive(Debug, Clone, Copy)]
enum Gesture {
    Bar,
    Toggle(ToggleGesture),
    Select,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    volume_bar: BarControl,
    db_bar: BarControl,
    active: HashMap<FieldKey, Gesture>,
}

impl Dispatcher {
    pub fn new(equalizer: &EqualizerConfig) -> Self {
        Self {
            volume_bar: BarControl::new(VOLUME_MIN, VOLUME_MAX, Orientation::Horizontal),
            db_bar: BarControl::new(equalizer.min_db, equalizer.max_db, Orientation::Vertical),
            active: HashMap::new(),
        }
    }

    /// The slider backing `key`, if it is slider-driven.
    pub fn bar(&self, key: FieldKey) -> Option<&BarControl> {
        match key {
            FieldKey::Volume => Some(&self.volume_bar),
            FieldKey::Preamp | FieldKey::Band(_) => Some(&self.db_bar),
            FieldKey::EqEnabled | FieldKey::EqPreset => None,
        }
    }

    /// Pointer pressed on a control.  Supersedes any unfinished gesture on
    /// the same field.  Returns `false`, holding nothing, for a band the
    /// equalizer catalogue does not list.
    pub fn begin(&mut self, view: &mut ViewState, key: FieldKey) -> bool {
        if let FieldKey::Band(band) = key {
            if band >= view.equalizer.band_frequencies.len() {
                debug!("band {} not in the equalizer catalogue, ignored", band);
                return false;
            }
        }
        let gesture = match key {
            FieldKey::EqEnabled => Gesture::Toggle(ToggleGesture::new()),
            FieldKey::EqPreset => Gesture::Select,
            _ => Gesture::Bar,
        };
        view.player.set_hold(key, true);
        self.active.insert(key, gesture);
        debug!("gesture: begin {}", key);
        true
    }

    /// Pointer moved to `ratio` along the control.  Returns `true` when the
    /// local value changed.  Ignored unless a gesture is in progress.
    pub fn drag(&mut self, view: &mut ViewState, key: FieldKey, ratio: f64) -> bool {
        let Some(gesture) = self.active.get_mut(&key) else {
            return false;
        };
        let update = match (key, gesture) {
            (FieldKey::EqEnabled, Gesture::Toggle(toggle)) => {
                FieldUpdate::EqEnabled(toggle.drag(ratio))
            }
            (FieldKey::Volume, _) => FieldUpdate::Volume(self.volume_bar.value_at(ratio)),
            (FieldKey::Preamp, _) => FieldUpdate::Preamp(self.db_bar.value_at(ratio)),
            (FieldKey::Band(band), _) => FieldUpdate::Band(band, self.db_bar.value_at(ratio)),
            _ => return false,
        };
        let changed = view.player.current(key) != Some(update);
        view.player.set_local(update);
        changed
    }

    /// Pointer released.  Releases the hold and returns the command carrying
    /// the final canonical value, or `None` when there is nothing to send.
    pub fn end(&mut self, view: &mut ViewState, key: FieldKey) -> Option<Command> {
        let gesture = self.active.remove(&key)?;
        view.player.set_hold(key, false);

        let command = match key {
            FieldKey::Volume => {
                let volume = self.volume_bar.clamp(view.player.volume().round());
                view.player.set_local(FieldUpdate::Volume(volume));
                Command::Volume {
                    volume: volume as u8,
                }
            }
            FieldKey::Preamp => {
                let level = round_db(view.player.preamp());
                view.player.set_local(FieldUpdate::Preamp(level));
                Command::AdjustPreamp { level }
            }
            FieldKey::Band(band) => {
                let level = round_db(view.player.band_level(band)?);
                view.player.set_local(FieldUpdate::Band(band, level));
                Command::AdjustBand { band, level }
            }
            FieldKey::EqEnabled => {
                let current = view.player.eq_enabled();
                let enabled = match gesture {
                    Gesture::Toggle(toggle) => toggle.release(current),
                    _ => current,
                };
                view.player.set_local(FieldUpdate::EqEnabled(enabled));
                Command::EnableEqualizer { enabled }
            }
            FieldKey::EqPreset => Command::AdjustPreset {
                index: view.player.eq_preset(),
            },
        };
        debug!("gesture: end {} -> {:?}", key, command);
        Some(command)
    }

    /// A complete gesture that lands on `update` in one step (keyboard or
    /// command-line input).
    pub fn set(&mut self, view: &mut ViewState, update: FieldUpdate) -> Option<Command> {
        let key = update.key();
        if let FieldUpdate::EqPreset(index) = update {
            if index >= view.equalizer.presets.len() {
                debug!("preset {} out of range, ignored", index);
                return None;
            }
        }
        if !self.begin(view, key) {
            return None;
        }
        match update {
            FieldUpdate::Volume(v) => {
                view.player
                    .set_local(FieldUpdate::Volume(self.volume_bar.clamp(v)));
            }
            FieldUpdate::Preamp(v) => {
                view.player
                    .set_local(FieldUpdate::Preamp(self.db_bar.clamp(v)));
            }
            FieldUpdate::Band(band, v) => {
                view.player
                    .set_local(FieldUpdate::Band(band, self.db_bar.clamp(v)));
            }
            FieldUpdate::EqEnabled(v) => {
                self.drag(view, key, if v { 1.0 } else { 0.0 });
            }
            FieldUpdate::EqPreset(_) => view.player.set_local(update),
        }
        self.end(view, key)
    }

    /// Build the enqueue command for a vote, or `ValidationSkipped` when the
    /// song is playing, already voted for, or has no identity.
    pub fn vote(&self, view: &ViewState, song: &Song) -> Result<Command, ClientError> {
        if !view.is_song_votable(song) {
            debug!("vote: {:?} not votable", song.key());
            return Err(ClientError::ValidationSkipped);
        }
        let key = song.key().ok_or(ClientError::ValidationSkipped)?;
        Ok(Command::Enqueue(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beats_proto::protocol::{QueueEntry, SongKey};

    fn setup() -> (Dispatcher, ViewState) {
        let mut view = ViewState::default();
        view.equalizer.presets = vec!["Flat".into(), "Rock".into(), "Pop".into()];
        view.equalizer.band_frequencies = vec![60.0, 1000.0];
        view.player.ensure_band(0);
        view.player.ensure_band(1);
        (Dispatcher::new(&EqualizerConfig::default()), view)
    }

    #[test]
    fn test_preamp_drag_then_release() {
        let (mut dispatcher, mut view) = setup();
        let bar = *dispatcher.bar(FieldKey::Preamp).unwrap();

        dispatcher.begin(&mut view, FieldKey::Preamp);
        assert!(view.player.is_held(FieldKey::Preamp));

        dispatcher.drag(&mut view, FieldKey::Preamp, bar.ratio_for(3.27));
        assert!((view.player.preamp() - 3.27).abs() < 1e-9);
        assert!(view.player.is_held(FieldKey::Preamp));

        let cmd = dispatcher.end(&mut view, FieldKey::Preamp).unwrap();
        assert_eq!(cmd, Command::AdjustPreamp { level: 3.3 });
        assert_eq!(view.player.preamp(), 3.3);
        assert!(!view.player.is_held(FieldKey::Preamp));
    }

    #[test]
    fn test_volume_rounds_to_integer_on_release() {
        let (mut dispatcher, mut view) = setup();
        dispatcher.begin(&mut view, FieldKey::Volume);
        dispatcher.drag(&mut view, FieldKey::Volume, 0.426);
        assert!((view.player.volume() - 42.6).abs() < 1e-9);
        let cmd = dispatcher.end(&mut view, FieldKey::Volume).unwrap();
        assert_eq!(cmd, Command::Volume { volume: 43 });
        assert_eq!(view.player.volume(), 43.0);
    }

    #[test]
    fn test_drag_clamps_to_range() {
        let (mut dispatcher, mut view) = setup();
        dispatcher.begin(&mut view, FieldKey::Band(1));
        dispatcher.drag(&mut view, FieldKey::Band(1), 1.4);
        assert_eq!(view.player.band_level(1), Some(20.0));
        dispatcher.drag(&mut view, FieldKey::Band(1), -3.0);
        assert_eq!(view.player.band_level(1), Some(-20.0));
        assert_eq!(
            dispatcher.end(&mut view, FieldKey::Band(1)),
            Some(Command::AdjustBand {
                band: 1,
                level: -20.0
            })
        );
    }

    #[test]
    fn test_drag_without_begin_is_ignored() {
        let (mut dispatcher, mut view) = setup();
        assert!(!dispatcher.drag(&mut view, FieldKey::Volume, 0.9));
        assert_eq!(view.player.volume(), 0.0);
        assert_eq!(dispatcher.end(&mut view, FieldKey::Volume), None);
    }

    #[test]
    fn test_toggle_click_and_drag() {
        let (mut dispatcher, mut view) = setup();
        dispatcher.begin(&mut view, FieldKey::EqEnabled);
        assert_eq!(
            dispatcher.end(&mut view, FieldKey::EqEnabled),
            Some(Command::EnableEqualizer { enabled: true })
        );
        assert!(view.player.eq_enabled());

        dispatcher.begin(&mut view, FieldKey::EqEnabled);
        dispatcher.drag(&mut view, FieldKey::EqEnabled, 0.8);
        assert_eq!(
            dispatcher.end(&mut view, FieldKey::EqEnabled),
            Some(Command::EnableEqualizer { enabled: true })
        );
    }

    #[test]
    fn test_set_runs_whole_gesture() {
        let (mut dispatcher, mut view) = setup();
        assert_eq!(
            dispatcher.set(&mut view, FieldUpdate::Band(0, -4.44)),
            Some(Command::AdjustBand {
                band: 0,
                level: -4.4
            })
        );
        assert!(!view.player.is_held(FieldKey::Band(0)));
        assert_eq!(
            dispatcher.set(&mut view, FieldUpdate::EqEnabled(false)),
            Some(Command::EnableEqualizer { enabled: false })
        );
        assert_eq!(
            dispatcher.set(&mut view, FieldUpdate::Volume(250.0)),
            Some(Command::Volume { volume: 100 })
        );
    }

    #[test]
    fn test_preset_must_exist() {
        let (mut dispatcher, mut view) = setup();
        assert_eq!(dispatcher.set(&mut view, FieldUpdate::EqPreset(3)), None);
        assert_eq!(view.player.eq_preset(), 0);
        assert!(!view.player.is_held(FieldKey::EqPreset));
        assert_eq!(
            dispatcher.set(&mut view, FieldUpdate::EqPreset(2)),
            Some(Command::AdjustPreset { index: 2 })
        );
        assert_eq!(view.player.eq_preset(), 2);
    }

    #[test]
    fn test_band_outside_catalogue_is_rejected() {
        let (mut dispatcher, mut view) = setup();
        assert_eq!(dispatcher.set(&mut view, FieldUpdate::Band(99, 3.0)), None);
        assert!(!dispatcher.begin(&mut view, FieldKey::Band(2)));
        assert!(!dispatcher.drag(&mut view, FieldKey::Band(2), 0.9));
        assert_eq!(dispatcher.end(&mut view, FieldKey::Band(2)), None);
        assert_eq!(view.player.band_count(), 2);
        assert_eq!(
            view.player.band_levels().collect::<Vec<_>>(),
            vec![(0, 0.0), (1, 0.0)]
        );
    }

    #[test]
    fn test_vote_rules() {
        let (dispatcher, mut view) = setup();
        let playing = Song {
            id: Some(1),
            ..Default::default()
        };
        let next = Song {
            id: Some(2),
            ..Default::default()
        };
        view.queue = vec![
            QueueEntry {
                song: playing.clone(),
                ..Default::default()
            },
            QueueEntry {
                song: next.clone(),
                ..Default::default()
            },
        ];
        assert_eq!(
            dispatcher.vote(&view, &playing),
            Err(ClientError::ValidationSkipped)
        );
        assert_eq!(
            dispatcher.vote(&view, &next),
            Ok(Command::Enqueue(SongKey::Id(2)))
        );
        assert_eq!(
            dispatcher.vote(&view, &Song::default()),
            Err(ClientError::ValidationSkipped)
        );
    }
}
