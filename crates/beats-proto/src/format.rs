//! Display formatting for playback times, band frequencies and decibel levels.
//!
//! Decibel values travel as one-decimal fixed point.  `round_db` is the
//! canonical form used everywhere a level is stored or sent; `format_db`
//! renders a level through the same tenths decomposition so a value that
//! arrives already rounded from the backend prints identically.

/// Frequencies strictly above this render in kHz.  Sits half a hertz below
/// 1000 so a band reported as 999.7 Hz reads "1 kHz" instead of "1000 Hz".
pub const KHZ_THRESHOLD: f64 = 999.5;

/// `M:SS` with zero-padded seconds.  Fractional input is floored; minutes
/// are unbounded.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// `"<n> Hz"` or `"<n> kHz"`, rounded half up.
pub fn format_frequency(hz: f64) -> String {
    let (value, unit) = if hz > KHZ_THRESHOLD {
        (hz / 1000.0, "kHz")
    } else {
        (hz, "Hz")
    };
    format!("{} {}", (value + 0.5).floor() as i64, unit)
}

/// Magnitude of `level` in tenths of a decibel, rounded half away from zero,
/// plus whether the input was negative.
fn tenths(level: f64) -> (bool, u64) {
    let negative = level < 0.0;
    let magnitude = (level.abs() * 10.0 + 0.5).floor();
    (negative, magnitude as u64)
}

/// Canonicalise a decibel level to the nearest 0.1 dB.
///
/// The absolute value is rounded and the sign re-applied, so `2.45` and
/// `-2.45` land on `2.5` and `-2.5` respectively.
pub fn round_db(level: f64) -> f64 {
    if !level.is_finite() {
        return 0.0;
    }
    let (negative, magnitude) = tenths(level);
    if magnitude == 0 {
        return 0.0;
    }
    let rounded = magnitude as f64 / 10.0;
    if negative {
        -rounded
    } else {
        rounded
    }
}

/// `"<sign><whole>.<tenth> dB"`.  The sign follows the input, so a small
/// negative level prints as `-0.0 dB`.
pub fn format_db(level: f64) -> String {
    let (negative, magnitude) = if level.is_finite() {
        tenths(level)
    } else {
        (false, 0)
    };
    let sign = if negative { "-" } else { "" };
    format!("{}{}.{} dB", sign, magnitude / 10, magnitude % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(65.0), "1:05");
        assert_eq!(format_duration(59.0), "0:59");
        assert_eq!(format_duration(59.99), "0:59");
        assert_eq!(format_duration(0.0), "0:00");
        assert_eq!(format_duration(3600.0 * 2.0 + 1.0), "120:01");
    }

    #[test]
    fn test_format_frequency_boundary() {
        assert_eq!(format_frequency(999.0), "999 Hz");
        assert_eq!(format_frequency(999.5), "1000 Hz");
        assert_eq!(format_frequency(999.6), "1 kHz");
        assert_eq!(format_frequency(1000.0), "1 kHz");
        assert_eq!(format_frequency(60.0), "60 Hz");
        assert_eq!(format_frequency(170.4), "170 Hz");
        assert_eq!(format_frequency(14000.0), "14 kHz");
    }

    #[test]
    fn test_round_db_half_away_from_zero() {
        assert_eq!(round_db(2.449), 2.4);
        assert_eq!(round_db(2.45), 2.5);
        assert_eq!(round_db(-2.45), -2.5);
        assert_eq!(round_db(3.27), 3.3);
        assert_eq!(round_db(-0.04), 0.0);
        assert_eq!(round_db(12.0), 12.0);
    }

    #[test]
    fn test_round_db_idempotent() {
        let mut x = -20.0;
        while x <= 20.0 {
            let once = round_db(x);
            assert_eq!(round_db(once), once, "not idempotent at {}", x);
            x += 0.037;
        }
    }

    #[test]
    fn test_format_db() {
        assert_eq!(format_db(round_db(3.14)), "3.1 dB");
        assert_eq!(format_db(-0.05), "-0.1 dB");
        assert_eq!(format_db(0.0), "0.0 dB");
        assert_eq!(format_db(-0.01), "-0.0 dB");
        assert_eq!(format_db(-0.0), "0.0 dB");
        assert_eq!(format_db(-12.0), "-12.0 dB");
        assert_eq!(format_db(20.0), "20.0 dB");
    }

    #[test]
    fn test_format_db_agrees_with_round_db() {
        for level in [-7.65, -3.35, 0.15, 1.05, 4.449, 9.95] {
            assert_eq!(format_db(level), format_db(round_db(level)));
        }
    }
}
