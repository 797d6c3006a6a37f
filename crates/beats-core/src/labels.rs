//! Decibel label observers.
//!
//! Each label (the preamp, or one band) is registered under its own key and
//! owns a `watch` channel carrying its rendered text.  A change to one field
//! recomputes one label; only a full poll refresh walks all of them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use beats_proto::format::format_db;
use tokio::sync::watch;

use crate::hold::FieldKey;
use crate::player::PlayerState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LabelKey {
    Preamp,
    Band(usize),
}

impl LabelKey {
    /// The label showing `field`, if that field has one.
    pub fn for_field(field: FieldKey) -> Option<Self> {
        match field {
            FieldKey::Preamp => Some(LabelKey::Preamp),
            FieldKey::Band(band) => Some(LabelKey::Band(band)),
            FieldKey::Volume | FieldKey::EqEnabled | FieldKey::EqPreset => None,
        }
    }

    fn render(&self, state: &PlayerState) -> Option<String> {
        match self {
            LabelKey::Preamp => Some(format_db(state.preamp())),
            LabelKey::Band(band) => state.band_level(*band).map(format_db),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    One(LabelKey),
    All,
}

/// Shared registry of label channels.  Clones observe the same labels.
#[derive(Debug, Clone, Default)]
pub struct LabelBoard {
    labels: Arc<Mutex<BTreeMap<LabelKey, watch::Sender<String>>>>,
}

impl LabelBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<LabelKey, watch::Sender<String>>> {
        self.labels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register interest in a label.  The text is empty until the first
    /// refresh that covers it.
    pub fn subscribe(&self, key: LabelKey) -> watch::Receiver<String> {
        self.lock()
            .entry(key)
            .or_insert_with(|| watch::channel(String::new()).0)
            .subscribe()
    }

    /// Register interest in a label and render it from `state` right away.
    /// A label with text is reported as changed to the new receiver.
    pub fn subscribe_current(
        &self,
        key: LabelKey,
        state: &PlayerState,
    ) -> watch::Receiver<String> {
        let mut labels = self.lock();
        let tx = labels
            .entry(key)
            .or_insert_with(|| watch::channel(String::new()).0);
        Self::update(tx, key.render(state));
        let mut rx = tx.subscribe();
        if !rx.borrow().is_empty() {
            rx.mark_changed();
        }
        rx
    }

    pub fn text(&self, key: LabelKey) -> Option<String> {
        self.lock().get(&key).map(|tx| tx.borrow().clone())
    }

    /// Recompute the requested labels from `state`.  Returns how many labels
    /// were rendered.
    pub fn refresh(&self, state: &PlayerState, which: Refresh) -> usize {
        let labels = self.lock();
        match which {
            Refresh::One(key) => match labels.get(&key) {
                Some(tx) => {
                    Self::update(tx, key.render(state));
                    1
                }
                None => 0,
            },
            Refresh::All => {
                for (key, tx) in labels.iter() {
                    Self::update(tx, key.render(state));
                }
                labels.len()
            }
        }
    }

    fn update(tx: &watch::Sender<String>, text: Option<String>) {
        let Some(text) = text else {
            return;
        };
        tx.send_if_modified(|current| {
            if *current == text {
                false
            } else {
                *current = text;
                true
            }
        });
    }
}
