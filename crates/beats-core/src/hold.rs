//! Hold flags: per-field arbitration between local edits and polled state.
//!
//! A field is *held* while the user is directly manipulating it.  While held,
//! values arriving from the backend are discarded so a poll response cannot
//! yank a slider out from under the pointer.
//!
//! Contract: the hold is released when the gesture ends and its command has
//! been issued, not when the backend acknowledges it.  On a slow link the
//! next poll can therefore briefly show the pre-edit value before the
//! backend catches up.  A lost response can never leave a field held.

use std::fmt;

/// Identifies one user-adjustable player control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Volume,
    EqEnabled,
    EqPreset,
    Preamp,
    Band(usize),
}

impl FieldKey {
    /// Decibel-valued fields are canonicalised with `round_db`.
    pub fn is_decibel(&self) -> bool {
        matches!(self, FieldKey::Preamp | FieldKey::Band(_))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Volume => write!(f, "volume"),
            FieldKey::EqEnabled => write!(f, "equalizer-enabled"),
            FieldKey::EqPreset => write!(f, "equalizer-preset"),
            FieldKey::Preamp => write!(f, "preamp"),
            FieldKey::Band(n) => write!(f, "band-{}", n),
        }
    }
}

/// A value paired with its hold flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Held<T> {
    value: T,
    hold: bool,
}

impl<T: Clone + PartialEq> Held<T> {
    pub fn new(value: T) -> Self {
        Self { value, hold: false }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_held(&self) -> bool {
        self.hold
    }

    pub fn set_hold(&mut self, hold: bool) {
        self.hold = hold;
    }

    /// Local edit; applies regardless of the hold flag.
    pub fn set_local(&mut self, value: T) {
        self.value = value;
    }

    /// Offer a remote value.  Returns `true` if it was accepted.
    pub fn offer(&mut self, incoming: T) -> bool {
        if self.hold {
            return false;
        }
        self.value = incoming;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_respects_hold() {
        let mut field = Held::new(10.0);
        assert!(field.offer(20.0));
        assert_eq!(*field.value(), 20.0);

        field.set_hold(true);
        assert!(!field.offer(30.0));
        assert_eq!(*field.value(), 20.0);

        field.set_local(25.0);
        assert_eq!(*field.value(), 25.0);

        field.set_hold(false);
        assert!(field.offer(30.0));
        assert_eq!(*field.value(), 30.0);
    }

    #[test]
    fn test_decibel_keys() {
        assert!(FieldKey::Preamp.is_decibel());
        assert!(FieldKey::Band(4).is_decibel());
        assert!(!FieldKey::Volume.is_decibel());
        assert!(!FieldKey::EqPreset.is_decibel());
        assert_eq!(FieldKey::Band(4).to_string(), "band-4");
    }
}
