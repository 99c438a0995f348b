//! Per-note feedback store.
//!
//! Every note walks `Pending -> Evaluating -> Finalized`. While a note is
//! evaluating, each tick overwrites its record; once finalized the record is
//! frozen. The live view is the evaluating notes, the permanent view is
//! everything that has ever been evaluated.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::scoring::types::{FeedbackKind, FeedbackRecord};

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "state", content = "record", rename_all = "snake_case")]
pub enum NoteState {
    Pending,
    Evaluating(FeedbackRecord),
    Finalized(FeedbackRecord),
}

impl NoteState {
    pub fn record(&self) -> Option<&FeedbackRecord> {
        match self {
            NoteState::Pending => None,
            NoteState::Evaluating(r) | NoteState::Finalized(r) => Some(r),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Ledger {
    notes: BTreeMap<u32, NoteState>,
}

impl Ledger {
    pub fn new<I>(note_ids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Ledger {
            notes: note_ids
                .into_iter()
                .map(|id| (id, NoteState::Pending))
                .collect(),
        }
    }

    /// Store the latest verdict for a note that has not been finalized.
    /// Returns false when the write was refused.
    pub fn record(
        &mut self,
        note_id: u32,
        kind: FeedbackKind,
        cents_off: Option<f64>,
        now: Duration,
    ) -> bool {
        let Some(state) = self.notes.get_mut(&note_id) else {
            warn!("ignoring feedback for unknown note {}", note_id);
            return false;
        };
        let record = FeedbackRecord {
            note_id,
            result: kind,
            recorded_at: now,
            cents_off,
        };
        match state {
            NoteState::Pending | NoteState::Evaluating(_) => {
                *state = NoteState::Evaluating(record);
                true
            }
            NoteState::Finalized(_) => {
                warn!("ignoring feedback for finalized note {}", note_id);
                false
            }
        }
    }

    /// Freeze a note's verdict. Idempotent; a note that was never evaluated
    /// stays pending.
    pub fn retire(&mut self, note_id: u32) {
        if let Some(state) = self.notes.get_mut(&note_id) {
            if let NoteState::Evaluating(record) = *state {
                debug!("note {} finalized as {:?}", note_id, record.result);
                *state = NoteState::Finalized(record);
            }
        }
    }

    /// Finalize every note still being evaluated.
    pub fn retire_all(&mut self) {
        let live: Vec<u32> = self.live().map(|r| r.note_id).collect();
        for id in live {
            self.retire(id);
        }
    }

    pub fn state(&self, note_id: u32) -> Option<&NoteState> {
        self.notes.get(&note_id)
    }

    pub fn live(&self) -> impl Iterator<Item = &FeedbackRecord> + '_ {
        self.notes.values().filter_map(|s| match s {
            NoteState::Evaluating(r) => Some(r),
            _ => None,
        })
    }

    pub fn permanent(&self) -> impl Iterator<Item = &FeedbackRecord> + '_ {
        self.notes.values().filter_map(NoteState::record)
    }

    pub fn permanent_len(&self) -> usize {
        self.permanent().count()
    }

    /// Forget every verdict, keeping the set of known notes.
    pub fn clear(&mut self) {
        for state in self.notes.values_mut() {
            *state = NoteState::Pending;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_latest_wins_while_live() {
        let mut ledger = Ledger::new(0..3);
        assert!(ledger.record(0, FeedbackKind::NoInput, None, ms(0)));
        assert!(ledger.record(0, FeedbackKind::Match, Some(3.0), ms(50)));
        let live: Vec<_> = ledger.live().collect();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].result, FeedbackKind::Match);
        // Permanent mirrors the live value
        assert_eq!(ledger.permanent().next().unwrap().result, FeedbackKind::Match);
    }

    #[test]
    fn test_retire_freezes_and_is_idempotent() {
        let mut ledger = Ledger::new(0..2);
        ledger.record(0, FeedbackKind::MissLow, Some(-80.0), ms(10));
        ledger.retire(0);
        let frozen = *ledger.permanent().next().unwrap();
        ledger.retire(0);
        assert_eq!(*ledger.permanent().next().unwrap(), frozen);
        assert_eq!(ledger.live().count(), 0);

        assert!(!ledger.record(0, FeedbackKind::Match, Some(0.0), ms(20)));
        assert_eq!(ledger.permanent().next().unwrap().result, FeedbackKind::MissLow);
    }

    #[test]
    fn test_permanent_never_shrinks() {
        let mut ledger = Ledger::new(0..4);
        let mut last = 0;
        let ops: [(u32, bool); 6] = [(0, false), (0, true), (1, false), (2, false), (1, true), (2, true)];
        for (i, (id, retire)) in ops.into_iter().enumerate() {
            if retire {
                ledger.retire(id);
            } else {
                ledger.record(id, FeedbackKind::Match, Some(0.0), ms(i as u64));
            }
            let len = ledger.permanent_len();
            assert!(len >= last);
            last = len;
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn test_pending_retire_is_noop() {
        let mut ledger = Ledger::new(0..1);
        ledger.retire(0);
        assert_eq!(ledger.state(0), Some(&NoteState::Pending));
        assert_eq!(ledger.permanent_len(), 0);
    }

    #[test]
    fn test_unknown_note_rejected() {
        let mut ledger = Ledger::new(0..1);
        assert!(!ledger.record(7, FeedbackKind::Match, None, ms(0)));
        assert_eq!(ledger.state(7), None);
    }

    #[test]
    fn test_retire_all_and_clear() {
        let mut ledger = Ledger::new(0..3);
        ledger.record(0, FeedbackKind::Match, Some(1.0), ms(0));
        ledger.record(1, FeedbackKind::NoInput, None, ms(0));
        ledger.retire_all();
        assert_eq!(ledger.live().count(), 0);
        assert!(matches!(ledger.state(1), Some(NoteState::Finalized(_))));

        ledger.clear();
        assert_eq!(ledger.permanent_len(), 0);
        assert_eq!(ledger.state(2), Some(&NoteState::Pending));
    }
}
