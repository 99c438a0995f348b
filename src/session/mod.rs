//! Session lifecycle: `new -> load_script -> start -> (pause/resume)* -> finish -> reset`.
//!
//! The controller owns every piece of mutable engine state. Share it across
//! threads as a [`SharedSession`]; the native [`sampler`] drives it on a
//! fixed cadence while a renderer reads snapshots.

pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod sampler;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::pitch::{self, PitchSample, PitchSmoother};
use crate::scale::{self, DisplayRange};
use crate::scoring::{
    compare, compensated_playhead, has_elapsed, resolve, summarize, FeedbackRecord, Ledger,
    NoteState, ScoreSummary, TargetNote, TargetStatus,
};

pub use config::{Calibration, SessionConfig};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Ready,
    Playing,
    Paused,
    Finished,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Ready => "ready",
            SessionState::Playing => "playing",
            SessionState::Paused => "paused",
            SessionState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Everything a renderer needs for one frame, captured atomically.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Latency-compensated playhead in seconds.
    pub playhead: Option<f64>,
    pub sample: Option<PitchSample>,
    pub smoothed_hz: Option<f64>,
    pub scale_number: Option<f64>,
    pub note_name: Option<String>,
    pub active_note: Option<TargetNote>,
    pub status: TargetStatus,
    pub cents_off: Option<f64>,
    pub display_range: Option<DisplayRange>,
    /// Whether the sung pitch falls inside `display_range`.
    pub in_range: Option<bool>,
    pub live: Vec<FeedbackRecord>,
    pub scored_notes: usize,
}

impl SessionSnapshot {
    fn idle(state: SessionState, display_range: Option<DisplayRange>) -> Self {
        SessionSnapshot {
            state,
            playhead: None,
            sample: None,
            smoothed_hz: None,
            scale_number: None,
            note_name: None,
            active_note: None,
            status: TargetStatus::NoTarget,
            cents_off: None,
            display_range,
            in_range: None,
            live: Vec::new(),
            scored_notes: 0,
        }
    }
}

pub type SharedSession = Arc<Mutex<SessionController>>;

pub fn shared(controller: SessionController) -> SharedSession {
    Arc::new(Mutex::new(controller))
}

/// Lock a shared session. A panic in another holder cannot leave the
/// controller half-updated between operations, so poisoning is ignored.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, SessionController> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionController {
    config: SessionConfig,
    calibration: Calibration,
    state: SessionState,
    notes: Vec<TargetNote>,
    ledger: Ledger,
    smoother: PitchSmoother,
    display_range: Option<DisplayRange>,
    snapshot: SessionSnapshot,
    summary: Option<ScoreSummary>,
    last_tick_at: Option<Duration>,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(SessionController {
            calibration: config.calibration.clone(),
            smoother: PitchSmoother::new(config.smoothing_window()),
            config,
            state: SessionState::Ready,
            notes: Vec::new(),
            ledger: Ledger::default(),
            display_range: None,
            snapshot: SessionSnapshot::idle(SessionState::Ready, None),
            summary: None,
            last_tick_at: None,
        })
    }

    /// Validate and install the target notes. Sequence ids follow load order.
    pub fn load_script(&mut self, notes: Vec<TargetNote>) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(EngineError::InvalidState {
                operation: "load a script",
                state: self.state,
            });
        }
        let notes = validate_script(notes)?;
        info!("loaded script with {} notes", notes.len());

        self.ledger = Ledger::new(notes.iter().map(|n| n.sequence_id));
        self.notes = notes;
        self.smoother.reset();
        self.summary = None;
        self.refresh_display_range();
        self.snapshot = SessionSnapshot::idle(self.state, self.display_range);
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(EngineError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        if self.notes.is_empty() {
            return Err(EngineError::InvalidScript("no script loaded".to_string()));
        }
        self.set_state(SessionState::Playing);
        info!("session started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state != SessionState::Playing {
            return Err(EngineError::InvalidState {
                operation: "pause",
                state: self.state,
            });
        }
        self.set_state(SessionState::Paused);
        info!("session paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.state != SessionState::Paused {
            return Err(EngineError::InvalidState {
                operation: "resume",
                state: self.state,
            });
        }
        self.set_state(SessionState::Playing);
        info!("session resumed");
        Ok(())
    }

    /// Run one sampling step: estimate, smooth, resolve the active note,
    /// retire elapsed notes and record feedback for the active one.
    pub fn tick(
        &mut self,
        buffer: Option<&[f64]>,
        playback_time: Option<f64>,
        now: Duration,
    ) -> Result<SessionSnapshot> {
        if self.state != SessionState::Playing {
            return Err(EngineError::NotPlaying(self.state));
        }
        let buffer = buffer.ok_or(EngineError::InputUnavailable("no audio buffer"))?;
        let playback_time = playback_time
            .filter(|t| t.is_finite())
            .ok_or(EngineError::InputUnavailable("no playback time"))?;

        if self.last_tick_at.is_some_and(|last| now < last) {
            debug!("tick clock went backwards to {:?}", now);
        }
        self.last_tick_at = Some(now);

        let raw = pitch::estimate(buffer, &self.config.estimator);
        let sample = PitchSample {
            frequency_hz: raw,
            timestamp: now,
        };
        let smoothed_hz = self.smoother.update(raw, now);
        let scale_number = smoothed_hz.map(scale::freq_to_scale_number);

        let playhead = compensated_playhead(playback_time, self.calibration.latency_ms);
        self.retire_elapsed(playhead);

        let active = resolve(playhead, &self.notes);
        let comparison = compare(
            scale_number,
            active,
            self.calibration.octave_offset,
            self.calibration.tolerance_cents,
        );

        if let (Some(note), Some(cmp)) = (active, comparison) {
            match self.ledger.state(note.sequence_id) {
                Some(NoteState::Finalized(_)) => {
                    debug!("note {} already finalized, not rescoring", note.sequence_id)
                }
                _ => {
                    self.ledger
                        .record(note.sequence_id, cmp.kind, cmp.cents_off, now);
                }
            }
        }

        trace!(
            "tick at {:.3}s: raw={:?} smoothed={:?} note={:?} result={:?}",
            playhead,
            raw,
            smoothed_hz,
            active.map(|n| n.sequence_id),
            comparison.map(|c| c.kind)
        );

        let snapshot = SessionSnapshot {
            state: self.state,
            playhead: Some(playhead),
            sample: Some(sample),
            smoothed_hz,
            scale_number,
            note_name: scale_number.map(scale::scale_number_to_name),
            active_note: active.cloned(),
            status: comparison.map(|c| c.kind).into(),
            cents_off: comparison.and_then(|c| c.cents_off),
            display_range: self.display_range,
            in_range: scale_number
                .zip(self.display_range)
                .map(|(n, range)| range.contains(n)),
            live: self.ledger.live().copied().collect(),
            scored_notes: self.ledger.permanent_len(),
        };
        self.snapshot = snapshot.clone();
        Ok(snapshot)
    }

    /// End of content: freeze every verdict and compute the final score.
    pub fn finish(&mut self) -> Result<ScoreSummary> {
        match self.state {
            SessionState::Playing | SessionState::Paused => {
                self.ledger.retire_all();
                let summary = summarize(self.ledger.permanent());
                info!(
                    "session finished: {}/{} notes matched ({}%, grade {})",
                    summary.matched, summary.total, summary.percentage, summary.grade
                );
                self.summary = Some(summary.clone());
                self.set_state(SessionState::Finished);
                Ok(summary)
            }
            SessionState::Finished => self.summary.clone().ok_or(EngineError::InvalidState {
                operation: "finish",
                state: self.state,
            }),
            SessionState::Ready => Err(EngineError::InvalidState {
                operation: "finish",
                state: self.state,
            }),
        }
    }

    /// Return to `Ready` with a clean ledger, keeping the loaded script.
    /// Calibration returns to the configured defaults unless preserved.
    pub fn reset(&mut self, preserve_calibration: bool) {
        self.ledger.clear();
        self.smoother.reset();
        self.summary = None;
        if !preserve_calibration {
            self.calibration = self.config.calibration.clone();
            self.refresh_display_range();
        }
        self.state = SessionState::Ready;
        self.snapshot = SessionSnapshot::idle(self.state, self.display_range);
        info!(
            "session reset (calibration {})",
            if preserve_calibration { "kept" } else { "restored" }
        );
    }

    pub fn set_octave_offset(&mut self, value: i32) -> Result<()> {
        Calibration::check_octave_offset(value).inspect_err(|e| warn!("{}", e))?;
        self.calibration.octave_offset = value;
        self.refresh_display_range();
        self.snapshot.display_range = self.display_range;
        Ok(())
    }

    pub fn set_latency_ms(&mut self, value: f64) -> Result<()> {
        Calibration::check_latency_ms(value).inspect_err(|e| warn!("{}", e))?;
        self.calibration.latency_ms = value;
        Ok(())
    }

    pub fn set_tolerance_cents(&mut self, value: f64) -> Result<()> {
        Calibration::check_tolerance_cents(value).inspect_err(|e| warn!("{}", e))?;
        self.calibration.tolerance_cents = value;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn notes(&self) -> &[TargetNote] {
        &self.notes
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn display_range(&self) -> Option<DisplayRange> {
        self.display_range
    }

    /// Instant passed to the most recent tick. Drivers that start their own
    /// clock continue from here so instants never run backwards.
    pub fn last_tick_at(&self) -> Option<Duration> {
        self.last_tick_at
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.clone()
    }

    /// The frozen summary, available once finished.
    pub fn summary(&self) -> Option<&ScoreSummary> {
        self.summary.as_ref()
    }

    /// Score so far, computed from the current permanent view.
    pub fn live_summary(&self) -> ScoreSummary {
        summarize(self.ledger.permanent())
    }

    fn retire_elapsed(&mut self, playhead: f64) {
        let elapsed: Vec<u32> = self
            .ledger
            .live()
            .map(|r| r.note_id)
            .filter(|&id| {
                self.notes
                    .get(id as usize)
                    .is_some_and(|note| has_elapsed(note, playhead))
            })
            .collect();
        for id in elapsed {
            self.ledger.retire(id);
        }
    }

    fn refresh_display_range(&mut self) {
        self.display_range = DisplayRange::for_pitches(
            self.notes.iter().map(|n| n.pitch),
            self.calibration.octave_offset,
        );
    }

    fn set_state(&mut self, state: SessionState) {
        self.state = state;
        self.snapshot.state = state;
    }
}

fn validate_script(mut notes: Vec<TargetNote>) -> Result<Vec<TargetNote>> {
    if notes.is_empty() {
        return Err(EngineError::InvalidScript("script has no notes".to_string()));
    }
    let mut prev: Option<(f64, f64)> = None;
    for (i, note) in notes.iter_mut().enumerate() {
        if !note.start_time.is_finite() || note.start_time < 0.0 {
            return Err(EngineError::InvalidScript(format!(
                "note {} starts at {}",
                i, note.start_time
            )));
        }
        if !note.duration.is_finite() || note.duration <= 0.0 {
            return Err(EngineError::InvalidScript(format!(
                "note {} has duration {}",
                i, note.duration
            )));
        }
        if let Some((prev_start, prev_end)) = prev {
            if note.start_time < prev_start {
                return Err(EngineError::InvalidScript(format!(
                    "note {} starts before the note preceding it",
                    i
                )));
            }
            if note.start_time < prev_end {
                warn!("note {} overlaps the previous note", i);
            }
        }
        if !scale::SCRIPT_PITCH_RANGE.contains(&note.pitch) {
            return Err(EngineError::InvalidScript(format!(
                "note {} has pitch {} outside {:?}",
                i,
                note.pitch,
                scale::SCRIPT_PITCH_RANGE
            )));
        }
        note.sequence_id = i as u32;
        if note.display_name.is_empty() {
            note.display_name = scale::scale_number_to_name(note.pitch as f64);
        }
        prev = Some((note.start_time, note.end_time()));
    }
    Ok(notes)
}
