use crate::scoring::types::TargetNote;

/// Shift the media clock back by the capture latency.
pub fn compensated_playhead(playback_time: f64, latency_ms: f64) -> f64 {
    playback_time - latency_ms / 1000.0
}

/// The note whose window contains `playhead`, both ends inclusive.
pub fn resolve(playhead: f64, notes: &[TargetNote]) -> Option<&TargetNote> {
    notes
        .iter()
        .find(|n| n.start_time <= playhead && playhead <= n.end_time())
}

/// True once the playhead has moved strictly past the end of the note.
pub fn has_elapsed(note: &TargetNote, playhead: f64) -> bool {
    playhead > note.end_time()
}
