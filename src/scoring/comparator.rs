use serde::Serialize;

use crate::scale::{cents_between, shift_by_octaves};
use crate::scoring::types::{FeedbackKind, TargetNote};

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct Comparison {
    pub kind: FeedbackKind,
    pub cents_off: Option<f64>,
}

/// Classify the sung pitch against the active note.
///
/// Returns `None` when there is no active note: nothing is scored.
pub fn compare(
    smoothed_scale_number: Option<f64>,
    active_note: Option<&TargetNote>,
    octave_offset: i32,
    tolerance_cents: f64,
) -> Option<Comparison> {
    let note = active_note?;
    let Some(sung) = smoothed_scale_number else {
        return Some(Comparison {
            kind: FeedbackKind::NoInput,
            cents_off: None,
        });
    };

    let target = shift_by_octaves(note.pitch, octave_offset) as f64;
    let cents = cents_between(sung, target);
    let kind = if cents.abs() <= tolerance_cents {
        FeedbackKind::Match
    } else if cents > 0.0 {
        FeedbackKind::MissHigh
    } else {
        FeedbackKind::MissLow
    };

    Some(Comparison {
        kind,
        cents_off: Some(cents),
    })
}
