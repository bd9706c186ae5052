pub mod flow;
pub mod history;
pub mod layout;
pub mod lifecycle;
pub mod path;
pub mod scale;

pub use flow::{FlowEngine, FlowStats};
pub use history::HistoryWindow;
pub use layout::{FlowLayout, LayoutNodes};
pub use lifecycle::{AnimationState, FlowOrder, OrderLifecycle, OrderTrack, Phase, TickSummary};
pub use path::{cubic_bezier, flow_outline, CurveSpan};
pub use scale::LinearScale;
