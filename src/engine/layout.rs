use tracing::debug;

use crate::config::DiagramConfig;
use crate::domain::{FlowRatio, OrderSide, SideVolumes};
use crate::engine::path::{flow_outline, CurveSpan};
use crate::engine::LinearScale;
use crate::render::{Color, NodeId, PathCommand, Point, Rect, Renderer, Style, TextSpec};

const FLOW_OPACITY: f64 = 0.2;

/// Intake block, both destination blocks and both flow bands, as a
/// function of the current [`FlowRatio`].
#[derive(Debug, Clone)]
pub struct FlowLayout {
    x_scale: LinearScale,
    y_scale: LinearScale,
    curve: CurveSpan,
    curve_pct: (f64, f64),
    intake: Rect,
    block_width: f64,
    destination_span: f64,
    height: f64,
    flow_gap: f64,
    ratio: FlowRatio,
}

impl FlowLayout {
    pub fn new(config: &DiagramConfig) -> Self {
        let x_scale = LinearScale::percent((config.text_padding, config.width - config.text_padding));
        let y_scale = LinearScale::percent((0.0, config.height));
        let block_width = x_scale.span(config.block_width_pct);

        let intake = Rect {
            x: x_scale.apply(0.0),
            y: y_scale.apply(config.intake_top_pct),
            width: block_width,
            height: y_scale.apply(config.intake_height_pct),
        };

        Self {
            x_scale,
            y_scale,
            curve: CurveSpan {
                x_start: x_scale.apply(config.curve_start_pct),
                x_end: x_scale.apply(config.curve_end_pct),
                curvature: config.curvature,
            },
            curve_pct: (config.curve_start_pct, config.curve_end_pct),
            intake,
            block_width,
            destination_span: y_scale.apply(config.destination_span_pct),
            height: config.height,
            flow_gap: config.flow_gap,
            ratio: FlowRatio::NEUTRAL,
        }
    }

    pub fn x_scale(&self) -> LinearScale {
        self.x_scale
    }

    pub fn y_scale(&self) -> LinearScale {
        self.y_scale
    }

    pub fn curve(&self) -> CurveSpan {
        self.curve
    }

    pub fn curve_start_pct(&self) -> f64 {
        self.curve_pct.0
    }

    pub fn curve_end_pct(&self) -> f64 {
        self.curve_pct.1
    }

    pub fn ratio(&self) -> FlowRatio {
        self.ratio
    }

    /// Returns whether the geometry changed.
    pub fn set_ratio(&mut self, ratio: FlowRatio) -> bool {
        if ratio == self.ratio {
            return false;
        }
        debug!(from = self.ratio.value(), to = ratio.value(), "flow ratio changed");
        self.ratio = ratio;
        true
    }

    pub fn intake(&self) -> Rect {
        self.intake
    }

    /// Buy block hangs from the top edge, sell block stands on the bottom edge.
    pub fn destination(&self, side: OrderSide) -> Rect {
        let height = self.destination_span * self.ratio.share(side);
        let y = match side {
            OrderSide::Buy => 0.0,
            OrderSide::Sell => self.height - height,
        };
        Rect {
            x: self.x_scale.apply(100.0) - self.block_width,
            y,
            width: self.block_width,
            height,
        }
    }

    /// Part of the intake block's trailing edge that feeds `side`'s band:
    /// buy on top, sell below.
    pub fn intake_slice(&self, side: OrderSide) -> (f64, f64) {
        let buy_height = self.intake.height * self.ratio.buy_share();
        match side {
            OrderSide::Buy => (self.intake.y, buy_height),
            OrderSide::Sell => (self.intake.y + buy_height, self.intake.height - buy_height),
        }
    }

    pub fn flow_outline(&self, side: OrderSide) -> Vec<PathCommand> {
        let (top, height) = self.intake_slice(side);
        let (top, bottom) = match side {
            OrderSide::Buy => (top, top + height - self.flow_gap),
            OrderSide::Sell => (top + self.flow_gap, top + height),
        };
        flow_outline(self.intake.right(), top, bottom, self.destination(side), self.curve)
    }
}

fn side_fill(side: OrderSide) -> Color {
    match side {
        OrderSide::Buy => Color::GREEN,
        OrderSide::Sell => Color::RED,
    }
}

pub(crate) fn glyph_style(side: OrderSide) -> Style {
    Style::solid(side_fill(side))
}

fn label_text(block: Option<OrderSide>, volumes: SideVolumes) -> String {
    match block {
        None => format!("Orders {:.0}", volumes.total()),
        Some(OrderSide::Buy) => format!("Buys {:.0}", volumes.buy),
        Some(OrderSide::Sell) => format!("Sells {:.0}", volumes.sell),
    }
}

/// Handles of the static primitives drawn for a [`FlowLayout`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutNodes {
    intake: NodeId,
    buy_block: NodeId,
    sell_block: NodeId,
    buy_flow: NodeId,
    sell_flow: NodeId,
    intake_label: NodeId,
    buy_label: NodeId,
    sell_label: NodeId,
    font_size: f64,
    width: f64,
}

impl LayoutNodes {
    /// Creates every static primitive. Flows go first so blocks and labels
    /// stack above them.
    pub fn mount<R: Renderer + ?Sized>(
        layout: &FlowLayout,
        renderer: &mut R,
        config: &DiagramConfig,
    ) -> Self {
        let flow_style = Style::translucent(Color::WHITE, FLOW_OPACITY);
        let buy_flow = renderer.create_path(&layout.flow_outline(OrderSide::Buy), flow_style);
        let sell_flow = renderer.create_path(&layout.flow_outline(OrderSide::Sell), flow_style);

        let label = |renderer: &mut R, rotation: f64| {
            renderer.create_text(TextSpec {
                text: String::new(),
                font_size: config.label_font_size,
                fill: Color::WHITE,
                rotation,
                position: Point::default(),
            })
        };
        let intake_label = label(renderer, -90.0);
        let intake = renderer.create_rect(layout.intake(), Style::solid(Color::BLUE));
        let buy_label = label(renderer, 90.0);
        let buy_block = renderer.create_rect(layout.destination(OrderSide::Buy), glyph_style(OrderSide::Buy));
        let sell_label = label(renderer, 90.0);
        let sell_block = renderer.create_rect(layout.destination(OrderSide::Sell), glyph_style(OrderSide::Sell));

        let nodes = Self {
            intake,
            buy_block,
            sell_block,
            buy_flow,
            sell_flow,
            intake_label,
            buy_label,
            sell_label,
            font_size: config.label_font_size,
            width: config.width,
        };
        nodes.sync_labels(layout, renderer, SideVolumes::default());
        nodes
    }

    /// Pushes ratio-dependent geometry to the renderer.
    pub fn sync_blocks<R: Renderer + ?Sized>(&self, layout: &FlowLayout, renderer: &mut R) {
        for (side, block, flow) in [
            (OrderSide::Buy, self.buy_block, self.buy_flow),
            (OrderSide::Sell, self.sell_block, self.sell_flow),
        ] {
            let rect = layout.destination(side);
            renderer.set_position(block, Point::new(rect.x, rect.y));
            renderer.set_size(block, rect.width, rect.height);
            renderer.set_path(flow, &layout.flow_outline(side));
        }
    }

    /// Refreshes label texts and re-centres each label on its block.
    pub fn sync_labels<R: Renderer + ?Sized>(
        &self,
        layout: &FlowLayout,
        renderer: &mut R,
        volumes: SideVolumes,
    ) {
        let intake = layout.intake();
        let text = label_text(None, volumes);
        let text_width = renderer.measure_text(&text, self.font_size);
        renderer.set_text(self.intake_label, &text);
        // rotated -90°: text runs upward from its origin
        renderer.set_position(self.intake_label, Point::new(0.0, intake.center_y() + text_width / 2.0));

        for (side, label) in [(OrderSide::Buy, self.buy_label), (OrderSide::Sell, self.sell_label)] {
            let block = layout.destination(side);
            let text = label_text(Some(side), volumes);
            let text_width = renderer.measure_text(&text, self.font_size);
            renderer.set_text(label, &text);
            renderer.set_position(label, Point::new(self.width, block.center_y() - text_width / 2.0));
        }
    }

    pub fn intake(&self) -> NodeId {
        self.intake
    }

    pub fn block(&self, side: OrderSide) -> NodeId {
        match side {
            OrderSide::Buy => self.buy_block,
            OrderSide::Sell => self.sell_block,
        }
    }

    pub fn flow(&self, side: OrderSide) -> NodeId {
        match side {
            OrderSide::Buy => self.buy_flow,
            OrderSide::Sell => self.sell_flow,
        }
    }

    pub fn label(&self, block: Option<OrderSide>) -> NodeId {
        match block {
            None => self.intake_label,
            Some(OrderSide::Buy) => self.buy_label,
            Some(OrderSide::Sell) => self.sell_label,
        }
    }
}
