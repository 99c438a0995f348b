//! Conversions between frequency, scale-note number and note name.
//!
//! Scale-note numbers put reference A (440 Hz) at 69 with one unit per
//! semitone, so middle C is 60.

use serde::Serialize;

pub const A4_HZ: f64 = 440.0;
pub const A4_NUMBER: f64 = 69.0;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Semitones of padding above and below the script's pitch span.
const DISPLAY_PADDING: i32 = 2;

/// Script pitches must be whole scale-note numbers in this range.
pub const SCRIPT_PITCH_RANGE: std::ops::RangeInclusive<i32> = 0..=127;

/// Continuous scale-note number for a frequency.
pub fn freq_to_scale_number(hz: f64) -> f64 {
    A4_NUMBER + 12.0 * (hz / A4_HZ).log2()
}

pub fn scale_number_to_freq(n: f64) -> f64 {
    A4_HZ * 2f64.powf((n - A4_NUMBER) / 12.0)
}

/// Name of the nearest note, e.g. `61.2 -> "C#4"`.
pub fn scale_number_to_name(n: f64) -> String {
    let rounded = n.round() as i32;
    let name = NOTE_NAMES[rounded.rem_euclid(12) as usize];
    let octave = rounded.div_euclid(12) - 1;
    format!("{}{}", name, octave)
}

/// Signed distance in cents from a target scale-note number.
pub fn cents_between(scale_number: f64, target: f64) -> f64 {
    (scale_number - target) * 100.0
}

/// Apply the listener's octave calibration to a script pitch.
/// The stored pitch is never changed; callers shift on the fly.
pub fn shift_by_octaves(pitch: i32, octave_offset: i32) -> i32 {
    pitch.saturating_add(octave_offset.saturating_mul(12))
}

/// Vertical span a renderer should show for a script, in scale-note numbers.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayRange {
    pub low: i32,
    pub high: i32,
}

impl DisplayRange {
    pub fn for_pitches<I>(pitches: I, octave_offset: i32) -> Option<Self>
    where
        I: IntoIterator<Item = i32>,
    {
        let mut bounds: Option<(i32, i32)> = None;
        for p in pitches {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(p), hi.max(p)),
                None => (p, p),
            });
        }
        bounds.map(|(lo, hi)| DisplayRange {
            low: shift_by_octaves(lo, octave_offset).saturating_sub(DISPLAY_PADDING),
            high: shift_by_octaves(hi, octave_offset).saturating_add(DISPLAY_PADDING),
        })
    }

    pub fn contains(&self, scale_number: f64) -> bool {
        scale_number >= self.low as f64 && scale_number <= self.high as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_pitch() {
        assert!((freq_to_scale_number(440.0) - 69.0).abs() < 1e-12);
        assert!((scale_number_to_freq(69.0) - 440.0).abs() < 1e-9);
        assert!((scale_number_to_freq(60.0) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let mut n = 20.0;
        while n <= 110.0 {
            let back = freq_to_scale_number(scale_number_to_freq(n));
            assert!((back - n).abs() < 1e-6, "{} came back as {}", n, back);
            n += 0.37;
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(scale_number_to_name(60.0), "C4");
        assert_eq!(scale_number_to_name(69.0), "A4");
        assert_eq!(scale_number_to_name(61.4), "C#4");
        assert_eq!(scale_number_to_name(71.6), "C5");
        assert_eq!(scale_number_to_name(0.0), "C-1");
        assert_eq!(scale_number_to_name(-1.0), "B-2");
    }

    #[test]
    fn test_cents() {
        assert!((cents_between(60.25, 60.0) - 25.0).abs() < 1e-9);
        assert!((cents_between(59.0, 60.0) + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_octave_shift() {
        assert_eq!(shift_by_octaves(60, -1), 48);
        assert_eq!(shift_by_octaves(60, 0), 60);
        assert_eq!(shift_by_octaves(60, 2), 84);
        assert_eq!(shift_by_octaves(i32::MAX, 1), i32::MAX);
        assert_eq!(shift_by_octaves(0, i32::MIN), i32::MIN);
    }

    #[test]
    fn test_display_range() {
        let range = DisplayRange::for_pitches([64, 60, 67], -1).unwrap();
        assert_eq!(range, DisplayRange { low: 46, high: 57 });
        assert!(range.contains(50.5));
        assert!(!range.contains(58.0));
        assert_eq!(DisplayRange::for_pitches(Vec::new(), 0), None);
    }

    #[test]
    fn test_display_range_saturates_at_extremes() {
        let range = DisplayRange::for_pitches([i32::MIN, i32::MAX], 4).unwrap();
        assert_eq!(range, DisplayRange { low: i32::MIN, high: i32::MAX });
    }
}
