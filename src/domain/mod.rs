pub mod order;
pub mod ratio;

pub use order::{Order, OrderError, OrderSide};
pub use ratio::{FlowRatio, RatioBounds, SideVolumes};
