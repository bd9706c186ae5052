//! Animated order-flow diagram: a synthetic order stream split into buy
//! and sell bands whose geometry follows the live volume ratio.

pub mod config;
pub mod diagram;
pub mod domain;
pub mod engine;
pub mod error;
pub mod market;
pub mod render;

pub use config::{AppConfig, ConfigError, DiagramConfig, StreamConfig};
pub use diagram::{DiagramPhase, OrderFlowDiagram, OrderIntake};
pub use domain::{FlowRatio, Order, OrderError, OrderSide, SideVolumes};
pub use engine::{FlowEngine, FlowStats};
pub use error::DiagramError;
pub use market::{OrderGenerator, OrderSource, OrderStream};
pub use render::{Renderer, Scene};
