use serde::{Deserialize, Serialize};

use crate::domain::OrderSide;

/// Clamp band applied to every computed ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for RatioBounds {
    fn default() -> Self {
        Self { min: 0.1, max: 0.9 }
    }
}

/// Aggregate volume per side over the orders visible in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SideVolumes {
    pub buy: f64,
    pub sell: f64,
}

impl SideVolumes {
    pub fn add(&mut self, side: OrderSide, volume: f64) {
        match side {
            OrderSide::Buy => self.buy += volume,
            OrderSide::Sell => self.sell += volume,
        }
    }

    pub fn get(&self, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => self.buy,
            OrderSide::Sell => self.sell,
        }
    }

    pub fn total(&self) -> f64 {
        self.buy + self.sell
    }
}

/// Sell share of the visible volume, `sell / (buy + sell)`.
///
/// Drives the height split of the destination blocks: the buy block
/// (top) takes `1 - ratio` of the span, the sell block (bottom) takes
/// `ratio`. The intake block is sliced the same way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlowRatio(f64);

impl FlowRatio {
    pub const NEUTRAL: FlowRatio = FlowRatio(0.5);

    pub fn from_volumes(buy_volume: f64, sell_volume: f64, bounds: RatioBounds) -> Self {
        let total = buy_volume + sell_volume;
        if total <= 0.0 {
            return Self::NEUTRAL;
        }
        FlowRatio((sell_volume / total).clamp(bounds.min, bounds.max))
    }

    pub fn from_side_volumes(volumes: SideVolumes, bounds: RatioBounds) -> Self {
        Self::from_volumes(volumes.buy, volumes.sell, bounds)
    }

    /// Vertical share of `side` in the intake and destination split.
    pub fn share(self, side: OrderSide) -> f64 {
        match side {
            OrderSide::Buy => self.buy_share(),
            OrderSide::Sell => self.sell_share(),
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn sell_share(self) -> f64 {
        self.0
    }

    pub fn buy_share(self) -> f64 {
        1.0 - self.0
    }
}

impl Default for FlowRatio {
    fn default() -> Self {
        Self::NEUTRAL
    }
}
