use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("Unknown order side: {0}")]
    UnknownSide(String),
    #[error("Order volume must be positive and finite, got {0}")]
    InvalidVolume(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        f.write_str(s)
    }
}

impl FromStr for OrderSide {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(OrderSide::Buy),
            "sell" => Ok(OrderSide::Sell),
            _ => Err(OrderError::UnknownSide(s.to_string())),
        }
    }
}

/// One synthetic trade event. Lifecycle data (progress, glyph) is attached
/// once the diagram adopts the order, see `engine::lifecycle`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub side: OrderSide,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn new(side: OrderSide, volume: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            volume,
            timestamp,
        }
    }

    /// Rejects orders that would corrupt volume aggregation.
    pub fn validate(&self) -> Result<(), OrderError> {
        if !self.volume.is_finite() || self.volume <= 0.0 {
            return Err(OrderError::InvalidVolume(self.volume));
        }
        Ok(())
    }
}
