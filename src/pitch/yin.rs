use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::scale;

/// Best normalized difference above which a frame is treated as unvoiced.
const UNVOICED_CMND: f64 = 0.5;

/// Fixed parameters of the fundamental-frequency estimator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EstimatorConfig {
    pub sample_rate: f64,
    /// RMS at or below which a buffer counts as silence.
    pub silence_rms: f64,
    /// YIN absolute threshold. Lower values reject more borderline frames.
    pub threshold: f64,
    pub min_hz: f64,
    pub max_hz: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            sample_rate: 44_100.0,
            silence_rms: 0.01,
            threshold: 0.15,
            min_hz: 50.0,
            max_hz: 2000.0,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(EngineError::out_of_range(
                "sample_rate",
                self.sample_rate,
                "must be positive",
            ));
        }
        if !(self.silence_rms.is_finite() && self.silence_rms >= 0.0) {
            return Err(EngineError::out_of_range(
                "silence_rms",
                self.silence_rms,
                "must be non-negative",
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(EngineError::out_of_range(
                "threshold",
                self.threshold,
                "must lie in (0, 1)",
            ));
        }
        if !(self.min_hz > 0.0 && self.max_hz > self.min_hz && self.max_hz.is_finite()) {
            return Err(EngineError::out_of_range(
                "max_hz",
                self.max_hz,
                "band must satisfy 0 < min_hz < max_hz",
            ));
        }
        Ok(())
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct PitchEstimate {
    pub hz: f64,
    pub confidence: f64,
}

impl PitchEstimate {
    pub fn scale_number(&self) -> f64 {
        scale::freq_to_scale_number(self.hz)
    }
}

/// Root-mean-square energy of a buffer, mean removed.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let energy: f64 = samples.iter().map(|&s| (s - mean) * (s - mean)).sum();
    (energy / samples.len() as f64).sqrt()
}

/// Estimate the fundamental frequency of one buffer, or `None` for silence
/// and unvoiced input.
pub fn estimate(samples: &[f64], config: &EstimatorConfig) -> Option<f64> {
    estimate_detailed(samples, config).map(|e| e.hz)
}

/// YIN estimate with its confidence (`1 - cmnd` at the chosen lag).
pub fn estimate_detailed(samples: &[f64], config: &EstimatorConfig) -> Option<PitchEstimate> {
    let sample_rate = config.sample_rate;
    if samples.len() < 2 || !(sample_rate > 0.0) {
        return None;
    }

    // Silence gate. `<=` keeps an all-zero frame silent even with a zero threshold.
    let level = rms(samples);
    if !(level > config.silence_rms) {
        return None;
    }

    let min_lag = (sample_rate / config.max_hz).ceil().max(1.0) as usize;
    let max_lag = (sample_rate / config.min_hz).floor() as usize;

    let half_len = samples.len() / 2;
    let max_lag = max_lag.min(half_len);

    if min_lag >= max_lag || max_lag < 2 {
        return None;
    }

    let cmnd = normalized_difference(samples, max_lag, half_len);
    let best_tau = pick_lag(&cmnd, min_lag, max_lag, config.threshold)?;
    let tau_refined = refine_lag(&cmnd, best_tau);

    if tau_refined <= 0.0 {
        return None;
    }

    let hz = sample_rate / tau_refined;
    if !hz.is_finite() || hz < config.min_hz || hz > config.max_hz {
        return None;
    }

    Some(PitchEstimate {
        hz,
        confidence: 1.0 - cmnd[best_tau].min(1.0),
    })
}

/// Squared-difference function turned into its cumulative mean normalized
/// form. Index 0 is pinned to 1.
fn normalized_difference(samples: &[f64], max_lag: usize, window: usize) -> Vec<f64> {
    let mut cmnd = vec![1.0f64; max_lag + 1];
    let mut running = 0.0f64;
    for tau in 1..=max_lag {
        let d: f64 = samples[..window]
            .iter()
            .zip(&samples[tau..tau + window])
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        running += d;
        if running > 0.0 {
            cmnd[tau] = d * tau as f64 / running;
        }
    }
    cmnd
}

/// Lag of the first valley dipping under `threshold`. With no such valley
/// fall back to the lowest point, unless even that is too aperiodic.
fn pick_lag(cmnd: &[f64], min_lag: usize, max_lag: usize, threshold: f64) -> Option<usize> {
    if let Some(dip) = (min_lag..=max_lag).find(|&tau| cmnd[tau] < threshold) {
        let bottom = (dip..max_lag)
            .find(|&t| cmnd[t + 1] >= cmnd[t])
            .unwrap_or(max_lag);
        return Some(bottom);
    }

    let (tau, &lowest) = cmnd[min_lag..=max_lag]
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    (lowest <= UNVOICED_CMND).then_some(min_lag + tau)
}

/// Sub-sample lag from a parabola through the neighbours of `tau`.
fn refine_lag(cmnd: &[f64], tau: usize) -> f64 {
    if tau == 0 || tau + 1 >= cmnd.len() {
        return tau as f64;
    }
    let (left, mid, right) = (cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
    let curvature = 2.0 * (left - 2.0 * mid + right);
    if curvature.abs() > 1e-12 {
        tau as f64 + (left - right) / curvature
    } else {
        tau as f64
    }
}
