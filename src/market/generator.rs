use crate::domain::{Order, OrderSide};
use crate::market::OrderSource;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Builder;

/// One bucket of the volume mixture: picked with `weight`, then a uniform
/// integer in `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeTier {
    pub weight: f64,
    pub low: u32,
    pub high: u32,
}

impl VolumeTier {
    fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.low..self.high) as f64
    }
}

/// Most orders small, few large.
pub const VOLUME_TIERS: [VolumeTier; 3] = [
    VolumeTier { weight: 0.60, low: 10, high: 110 },
    VolumeTier { weight: 0.25, low: 100, high: 600 },
    VolumeTier { weight: 0.15, low: 500, high: 2500 },
];

pub struct OrderGenerator {
    rng: StdRng,
    buy_bias: f64,
    last_timestamp: Option<DateTime<Utc>>,
}

impl OrderGenerator {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            buy_bias: 0.5,
            last_timestamp: None,
        }
    }

    fn pick_tier(&mut self) -> usize {
        let roll: f64 = self.rng.gen_range(0.0..1.0);
        let mut acc = 0.0;
        for (idx, tier) in VOLUME_TIERS.iter().enumerate() {
            acc += tier.weight;
            if roll < acc {
                return idx;
            }
        }
        VOLUME_TIERS.len() - 1
    }

    /// Wall clock, but never earlier than the previous order.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_timestamp = Some(ts);
        ts
    }
}

impl Default for OrderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderSource for OrderGenerator {
    fn generate(&mut self) -> Order {
        let tier = VOLUME_TIERS[self.pick_tier()];
        let volume = tier.sample(&mut self.rng);

        let side = if self.rng.gen_bool(self.buy_bias) {
            OrderSide::Buy
        } else {
            OrderSide::Sell
        };

        Order {
            id: Builder::from_random_bytes(self.rng.gen()).into_uuid(),
            side,
            volume,
            timestamp: self.next_timestamp(),
        }
    }
}
