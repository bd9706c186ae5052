pub mod generator;
pub mod schedule;
pub mod stream;

pub use generator::{OrderGenerator, VolumeTier, VOLUME_TIERS};
pub use schedule::IntervalPolicy;
pub use stream::OrderStream;

use crate::domain::Order;

/// Anything that can produce the next synthetic order on demand.
pub trait OrderSource {
    fn generate(&mut self) -> Order;
}
