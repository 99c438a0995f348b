pub mod smoother;
pub mod yin;

use std::time::Duration;

use serde::Serialize;

pub use smoother::PitchSmoother;
pub use yin::{estimate, estimate_detailed, EstimatorConfig, PitchEstimate};

/// One raw estimate taken on a sampling tick.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct PitchSample {
    pub frequency_hz: Option<f64>,
    pub timestamp: Duration,
}
