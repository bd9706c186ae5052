use rand::Rng;
use std::time::Duration;

use crate::config::StreamConfig;

/// Delay between two emitted orders: `min + (1 - U)^skew * spread`.
///
/// With the default skew of 3 most waits land close to the minimum and a
/// thin tail stretches toward `min + spread`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalPolicy {
    pub min_delay_ms: u64,
    pub spread_ms: u64,
    pub skew: f64,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            min_delay_ms: 50,
            spread_ms: 2000,
            skew: 3.0,
        }
    }
}

impl From<&StreamConfig> for IntervalPolicy {
    fn from(config: &StreamConfig) -> Self {
        Self {
            min_delay_ms: config.min_delay_ms,
            spread_ms: config.delay_spread_ms,
            skew: config.delay_skew,
        }
    }
}

impl IntervalPolicy {
    pub fn delay_for(&self, u: f64) -> Duration {
        let tail = (1.0 - u.clamp(0.0, 1.0)).powf(self.skew) * self.spread_ms as f64;
        Duration::from_micros(((self.min_delay_ms as f64 + tail) * 1000.0).round() as u64)
    }

    pub fn next_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        self.delay_for(rng.gen_range(0.0..1.0))
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms + self.spread_ms)
    }
}
