//! Cumulative degradation of an engineered barrier.

use cyder_core::errors::{CyderError, CyderResult};
use cyder_core::mat_tools::validate_percent;
use cyder_core::types::{FloatValue, Time};
use log::error;
use serde::{Deserialize, Serialize};

/// Degraded fraction of a barrier, accumulated at a constant rate
///
/// $$ D(t) = \min\left(1, D(t_{last}) + d (t - t_{last})\right) $$
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Degradation {
    /// Fraction degraded per time step
    rate: FloatValue,
    total: FloatValue,
    last_degraded: Time,
}

impl Degradation {
    pub fn new(rate: FloatValue, time: Time) -> CyderResult<Self> {
        let mut degradation = Self {
            rate: 0.0,
            total: 0.0,
            last_degraded: time,
        };
        degradation.set_rate(rate)?;
        Ok(degradation)
    }

    /// Same rate, nothing degraded yet
    pub fn restarted_at(&self, time: Time) -> Self {
        Self {
            rate: self.rate,
            total: 0.0,
            last_degraded: time,
        }
    }

    pub fn rate(&self) -> FloatValue {
        self.rate
    }

    /// Fails with a range error outside [0, 1]
    pub fn set_rate(&mut self, rate: FloatValue) -> CyderResult<()> {
        validate_percent(rate).map_err(|_| {
            let msg = format!(
                "The degradation rate range is 0 to 1, inclusive. The value provided was {}.",
                rate
            );
            error!("{}", msg);
            CyderError::Range(msg)
        })?;
        self.rate = rate;
        Ok(())
    }

    /// Fraction degraded so far
    pub fn total(&self) -> FloatValue {
        self.total
    }

    pub fn last_degraded(&self) -> Time {
        self.last_degraded
    }

    /// Accumulate degradation up to `time`
    pub fn update(&mut self, time: Time) -> CyderResult<FloatValue> {
        if time < self.last_degraded {
            return Err(CyderError::Ordering {
                requested: time,
                last: self.last_degraded,
            });
        }
        let elapsed = (time - self.last_degraded) as FloatValue;
        self.total = (self.total + self.rate * elapsed).min(1.0);
        self.last_degraded = time;
        Ok(self.total)
    }
}
