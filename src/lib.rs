//! Real-time singing pitch tracker and note-accuracy scorer.
//!
//! The engine consumes fixed-length audio buffers, a decoded list of timed
//! target notes and a playback clock; it produces a smoothed pitch, per-note
//! feedback and an end-of-session grade. Native callers drive a
//! [`session::SessionController`] directly or through
//! [`session::sampler::Sampler`]; the browser uses [`VocalSession`].

use std::time::Duration;

use wasm_bindgen::prelude::*;

pub mod error;
pub mod pitch;
pub mod scale;
pub mod scoring;
pub mod session;

pub use error::EngineError;
use scoring::TargetNote;
use session::{SessionConfig, SessionController};

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// YIN pitch estimate for one buffer as Float64Array [hz, confidence, scale_number].
/// Silence and unvoiced input return all zeros.
#[wasm_bindgen]
pub fn estimate_pitch(samples: &[f32], sample_rate: f64) -> js_sys::Float64Array {
    let buffer: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
    let config = pitch::EstimatorConfig {
        sample_rate,
        ..pitch::EstimatorConfig::default()
    };
    let (hz, confidence, scale_number) = match pitch::estimate_detailed(&buffer, &config) {
        Some(e) => (e.hz, e.confidence, e.scale_number()),
        None => (0.0, 0.0, 0.0),
    };

    let arr = js_sys::Float64Array::new_with_length(3);
    arr.set_index(0, hz);
    arr.set_index(1, confidence);
    arr.set_index(2, scale_number);
    arr
}

/// One singing session, owned by the page.
#[wasm_bindgen]
pub struct VocalSession {
    inner: SessionController,
}

#[wasm_bindgen]
impl VocalSession {
    /// Pass a config object, or `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_js: JsValue) -> Result<VocalSession, JsValue> {
        let config: SessionConfig = if config_js.is_null() || config_js.is_undefined() {
            SessionConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config_js).map_err(to_js)?
        };
        let inner = SessionController::new(config).map_err(to_js)?;
        Ok(VocalSession { inner })
    }

    #[wasm_bindgen(js_name = loadScript)]
    pub fn load_script(&mut self, notes_js: JsValue) -> Result<(), JsValue> {
        let notes: Vec<TargetNote> = serde_wasm_bindgen::from_value(notes_js).map_err(to_js)?;
        self.inner.load_script(notes).map_err(to_js)
    }

    pub fn start(&mut self) -> Result<(), JsValue> {
        self.inner.start().map_err(to_js)
    }

    pub fn pause(&mut self) -> Result<(), JsValue> {
        self.inner.pause().map_err(to_js)
    }

    pub fn resume(&mut self) -> Result<(), JsValue> {
        self.inner.resume().map_err(to_js)
    }

    /// Media `ended` event. Returns the frozen summary.
    pub fn finish(&mut self) -> Result<JsValue, JsValue> {
        let summary = self.inner.finish().map_err(to_js)?;
        serde_wasm_bindgen::to_value(&summary).map_err(to_js)
    }

    pub fn reset(&mut self, preserve_calibration: bool) {
        self.inner.reset(preserve_calibration);
    }

    /// One sampling step. An empty buffer or a non-finite playback time is
    /// reported as unavailable input.
    pub fn tick(
        &mut self,
        samples: &[f32],
        playback_time: f64,
        now_ms: f64,
    ) -> Result<JsValue, JsValue> {
        let buffer: Vec<f64> = samples.iter().map(|&s| s as f64).collect();
        let buffer = (!buffer.is_empty()).then_some(buffer.as_slice());
        let playback_time = playback_time.is_finite().then_some(playback_time);
        let now = Duration::try_from_secs_f64(now_ms / 1000.0).map_err(to_js)?;

        let snapshot = self.inner.tick(buffer, playback_time, now).map_err(to_js)?;
        serde_wasm_bindgen::to_value(&snapshot).map_err(to_js)
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.snapshot()).map_err(to_js)
    }

    /// Frozen summary, or `undefined` before the session finishes.
    pub fn summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.summary()).map_err(to_js)
    }

    #[wasm_bindgen(js_name = liveSummary)]
    pub fn live_summary(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.live_summary()).map_err(to_js)
    }

    pub fn state(&self) -> String {
        self.inner.state().to_string()
    }

    #[wasm_bindgen(js_name = setOctaveOffset)]
    pub fn set_octave_offset(&mut self, value: i32) -> Result<(), JsValue> {
        self.inner.set_octave_offset(value).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setLatencyMs)]
    pub fn set_latency_ms(&mut self, value: f64) -> Result<(), JsValue> {
        self.inner.set_latency_ms(value).map_err(to_js)
    }

    #[wasm_bindgen(js_name = setToleranceCents)]
    pub fn set_tolerance_cents(&mut self, value: f64) -> Result<(), JsValue> {
        self.inner.set_tolerance_cents(value).map_err(to_js)
    }
}
