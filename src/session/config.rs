use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::pitch::EstimatorConfig;

pub const MAX_OCTAVE_OFFSET: i32 = 4;

/// Listener-adjustable parameters. Each can change between ticks.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Calibration {
    /// Octaves added to every target pitch before comparison and display.
    pub octave_offset: i32,
    /// Delay between audio capture and the media clock, subtracted from playback time.
    pub latency_ms: f64,
    /// Largest deviation still counted as a match.
    pub tolerance_cents: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            octave_offset: -1,
            latency_ms: 300.0,
            tolerance_cents: 50.0,
        }
    }
}

impl Calibration {
    pub fn check_octave_offset(value: i32) -> Result<()> {
        if !(-MAX_OCTAVE_OFFSET..=MAX_OCTAVE_OFFSET).contains(&value) {
            return Err(EngineError::out_of_range(
                "octave_offset",
                value,
                "must lie within four octaves of the script",
            ));
        }
        Ok(())
    }

    pub fn check_latency_ms(value: f64) -> Result<()> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(EngineError::out_of_range(
                "latency_ms",
                value,
                "must be a non-negative number of milliseconds",
            ));
        }
        Ok(())
    }

    pub fn check_tolerance_cents(value: f64) -> Result<()> {
        if !(value.is_finite() && value > 0.0) {
            return Err(EngineError::out_of_range(
                "tolerance_cents",
                value,
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Self::check_octave_offset(self.octave_offset)?;
        Self::check_latency_ms(self.latency_ms)?;
        Self::check_tolerance_cents(self.tolerance_cents)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub estimator: EstimatorConfig,
    /// Initial calibration, and the values `reset(false)` returns to.
    pub calibration: Calibration,
    /// How long a smoothed pitch survives without fresh input.
    pub smoothing_window_ms: u64,
    pub sampling_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            estimator: EstimatorConfig::default(),
            calibration: Calibration::default(),
            smoothing_window_ms: 500,
            sampling_interval_ms: 50,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        self.estimator.validate()?;
        self.calibration.validate()?;
        if self.sampling_interval_ms == 0 {
            return Err(EngineError::out_of_range(
                "sampling_interval_ms",
                self.sampling_interval_ms,
                "must be at least 1 ms",
            ));
        }
        Ok(())
    }

    pub fn smoothing_window(&self) -> Duration {
        Duration::from_millis(self.smoothing_window_ms)
    }

    pub fn sampling_interval(&self) -> Duration {
        Duration::from_millis(self.sampling_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calibration.octave_offset, -1);
        assert_eq!(config.calibration.latency_ms, 300.0);
        assert_eq!(config.calibration.tolerance_cents, 50.0);
        assert_eq!(config.sampling_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_rejects_bad_calibration() {
        assert!(Calibration::check_latency_ms(-1.0).is_err());
        assert!(Calibration::check_latency_ms(f64::NAN).is_err());
        assert!(Calibration::check_latency_ms(0.0).is_ok());
        assert!(Calibration::check_tolerance_cents(0.0).is_err());
        assert!(Calibration::check_tolerance_cents(-5.0).is_err());
        assert!(Calibration::check_octave_offset(5).is_err());
        assert!(Calibration::check_octave_offset(-4).is_ok());
    }

    #[test]
    fn test_octave_offset_extremes_rejected() {
        for value in [i32::MIN, i32::MAX, -5] {
            assert!(matches!(
                Calibration::check_octave_offset(value),
                Err(EngineError::ConfigurationOutOfRange {
                    name: "octave_offset",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_rejects_zero_interval() {
        let config = SessionConfig {
            sampling_interval_ms: 0,
            ..SessionConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EngineError::ConfigurationOutOfRange {
                name: "sampling_interval_ms",
                ..
            })
        ));
    }
}
