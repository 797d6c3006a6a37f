//! Pointer-driven input controls: bar sliders and toggle switches.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Horizontal,
    /// Bottom of the bar is the minimum.
    Vertical,
}

/// A bar slider mapping a pointer position linearly onto `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarControl {
    pub min: f64,
    pub max: f64,
    pub orientation: Orientation,
}

impl BarControl {
    pub fn new(min: f64, max: f64, orientation: Orientation) -> Self {
        Self {
            min,
            max,
            orientation,
        }
    }

    /// Position of the pointer along the bar as a ratio.  `offset` is the
    /// bar's leading edge and `extent` its length on the relevant axis.
    /// Not clamped: pointers past either end give ratios outside 0..1.
    pub fn ratio_at(&self, pointer: f64, offset: f64, extent: f64) -> f64 {
        if extent <= 0.0 {
            return 0.0;
        }
        let along = (pointer - offset) / extent;
        match self.orientation {
            Orientation::Horizontal => along,
            Orientation::Vertical => 1.0 - along,
        }
    }

    /// Value for a ratio, clamped into `[min, max]`.
    pub fn value_at(&self, ratio: f64) -> f64 {
        let value = ratio * (self.max - self.min) + self.min;
        self.clamp(value)
    }

    /// Inverse of `value_at`.
    pub fn ratio_for(&self, value: f64) -> f64 {
        if self.max == self.min {
            return 0.0;
        }
        (self.clamp(value) - self.min) / (self.max - self.min)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.max(self.min).min(self.max)
    }
}

/// One press-drag-release interaction with a toggle switch.
///
/// Releasing without having moved flips the switch; dragging sets it to
/// whichever half of the switch the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ToggleGesture {
    moved: bool,
}

impl ToggleGesture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer moved while pressed.  Returns the switch's new value.
    pub fn drag(&mut self, ratio: f64) -> bool {
        self.moved = true;
        ratio >= 0.5
    }

    /// Pointer released.  Returns the final value given the current one.
    pub fn release(self, current: bool) -> bool {
        if self.moved {
            current
        } else {
            !current
        }
    }
}
