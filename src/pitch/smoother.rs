use std::time::Duration;

/// Weight kept from the previous smoothed value on every valid update.
const RETAIN: f64 = 0.8;

/// Exponential moving average over raw pitch estimates that holds its last
/// value through short dropouts.
#[derive(Clone, Debug)]
pub struct PitchSmoother {
    value: Option<f64>,
    last_valid_at: Option<Duration>,
    validity_window: Duration,
}

impl PitchSmoother {
    pub fn new(validity_window: Duration) -> Self {
        PitchSmoother {
            value: None,
            last_valid_at: None,
            validity_window,
        }
    }

    pub fn update(&mut self, raw: Option<f64>, now: Duration) -> Option<f64> {
        match raw {
            Some(hz) => {
                // A clock that went backwards belongs to a new epoch.
                if self.last_valid_at.is_some_and(|at| now < at) {
                    self.reset();
                }
                self.value = Some(match self.value {
                    Some(prev) => RETAIN * prev + (1.0 - RETAIN) * hz,
                    None => hz,
                });
                self.last_valid_at = Some(now);
            }
            None => {
                let expired = match self.last_valid_at {
                    Some(at) => now < at || now - at > self.validity_window,
                    None => true,
                };
                if expired {
                    self.value = None;
                    self.last_valid_at = None;
                }
            }
        }
        self.value
    }

    pub fn current(&self) -> Option<f64> {
        self.value
    }

    pub fn last_valid_at(&self) -> Option<Duration> {
        self.last_valid_at
    }

    pub fn reset(&mut self) {
        self.value = None;
        self.last_valid_at = None;
    }
}
