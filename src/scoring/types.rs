use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One timed note of the melodic script.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TargetNote {
    pub start_time: f64,
    pub duration: f64,
    pub pitch: i32,
    #[serde(default)]
    pub display_name: String,
    /// Assigned in load order; any incoming value is overwritten.
    #[serde(default)]
    pub sequence_id: u32,
}

impl TargetNote {
    pub fn new(start_time: f64, duration: f64, pitch: i32, display_name: impl Into<String>) -> Self {
        TargetNote {
            start_time,
            duration,
            pitch,
            display_name: display_name.into(),
            sequence_id: 0,
        }
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Match,
    MissHigh,
    MissLow,
    NoInput,
}

/// The latest verdict for one note.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct FeedbackRecord {
    pub note_id: u32,
    pub result: FeedbackKind,
    pub recorded_at: Duration,
    /// Signed deviation in cents on the tick that produced this record.
    pub cents_off: Option<f64>,
}

/// What the accuracy indicator shows on a tick. `NoTarget` is distinct from
/// `NoInput`: there is nothing to sing, rather than nothing being sung.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum TargetStatus {
    NoTarget,
    Scored(FeedbackKind),
}

impl From<Option<FeedbackKind>> for TargetStatus {
    fn from(kind: Option<FeedbackKind>) -> Self {
        match kind {
            Some(kind) => TargetStatus::Scored(kind),
            None => TargetStatus::NoTarget,
        }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GradeTier {
    S,
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl GradeTier {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            95.. => GradeTier::S,
            90..=94 => GradeTier::APlus,
            80..=89 => GradeTier::A,
            70..=79 => GradeTier::B,
            60..=69 => GradeTier::C,
            50..=59 => GradeTier::D,
            _ => GradeTier::F,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GradeTier::S => "S",
            GradeTier::APlus => "A+",
            GradeTier::A => "A",
            GradeTier::B => "B",
            GradeTier::C => "C",
            GradeTier::D => "D",
            GradeTier::F => "F",
        }
    }
}

impl fmt::Display for GradeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PitchTendency {
    Sharp,
    Flat,
    Accurate,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ScoreSummary {
    pub total: u32,
    pub matched: u32,
    pub miss_high: u32,
    pub miss_low: u32,
    pub no_input: u32,
    pub percentage: u32, // 0-100
    pub grade: GradeTier,
    pub avg_cents_off: f64,
    pub pitch_tendency: PitchTendency,
    pub feedback: Vec<String>,
}
