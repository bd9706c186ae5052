use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use std::mem;
use tracing::trace;

use crate::config::DiagramConfig;
use crate::domain::{Order, OrderError, OrderSide, SideVolumes};
use crate::engine::history::HistoryWindow;
use crate::engine::layout::{glyph_style, FlowLayout};
use crate::engine::path::cubic_bezier;
use crate::engine::LinearScale;
use crate::render::{NodeId, Point, Rect, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Entering,
    Animating,
    Completing,
    Completed,
}

/// Per-order animation state. The glyph handle only exists while the
/// order is on screen.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationState {
    Entering,
    Animating { glyph: NodeId, track: OrderTrack },
    Completing { glyph: NodeId },
    Completed,
}

impl AnimationState {
    pub fn phase(&self) -> Phase {
        match self {
            AnimationState::Entering => Phase::Entering,
            AnimationState::Animating { .. } => Phase::Animating,
            AnimationState::Completing { .. } => Phase::Completing,
            AnimationState::Completed => Phase::Completed,
        }
    }

    pub fn glyph(&self) -> Option<NodeId> {
        match self {
            AnimationState::Animating { glyph, .. } | AnimationState::Completing { glyph } => Some(*glyph),
            _ => None,
        }
    }
}

/// Path followed by one order through its side's flow band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTrack {
    side: OrderSide,
    y_position: u32,
    /// Ends at the right edge minus the glyph width so the glyph stops flush.
    x_scale: LinearScale,
}

impl OrderTrack {
    pub fn new(layout: &FlowLayout, side: OrderSide, y_position: u32, glyph_width: f64) -> Self {
        let x = layout.x_scale();
        Self {
            side,
            y_position,
            x_scale: LinearScale::percent((x.apply(0.0), x.apply(100.0) - glyph_width)),
        }
    }

    fn fraction(&self) -> f64 {
        self.y_position as f64 / 100.0
    }

    /// Height of the straight entry segment, inside the side's intake slice.
    pub fn start_y(&self, layout: &FlowLayout) -> f64 {
        let (top, height) = layout.intake_slice(self.side);
        top + height * self.fraction()
    }

    /// Height of the straight exit segment, inside the destination block.
    pub fn end_y(&self, layout: &FlowLayout) -> f64 {
        let dest = layout.destination(self.side);
        dest.y + dest.height * self.fraction()
    }

    /// Screen coordinate at `progress` (0..=1) along the band.
    pub fn position_for(&self, layout: &FlowLayout, progress: f64) -> Point {
        let p = progress * 100.0;
        let x = self.x_scale.apply(p);
        let curve_start = layout.curve_start_pct();
        let curve_end = layout.curve_end_pct();
        let start_y = self.start_y(layout);
        let end_y = self.end_y(layout);

        let y = if p <= curve_start {
            start_y
        } else if p >= curve_end {
            end_y
        } else {
            let t = (progress - curve_start / 100.0) / ((curve_end - curve_start) / 100.0);
            cubic_bezier(start_y, start_y, end_y, end_y, t)
        };
        Point::new(x, y)
    }
}

#[derive(Debug, Clone)]
pub struct FlowOrder {
    order: Order,
    state: AnimationState,
    ticks: u32,
    ticks_total: u32,
    y_position: u32,
    hidden: bool,
}

impl FlowOrder {
    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn side(&self) -> OrderSide {
        self.order.side
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn glyph(&self) -> Option<NodeId> {
        self.state.glyph()
    }

    pub fn y_position(&self) -> u32 {
        self.y_position
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Fraction of the animation done, derived from whole ticks so it lands
    /// on exactly 1.
    pub fn progress(&self) -> f64 {
        (self.ticks as f64 / self.ticks_total as f64).min(1.0)
    }
}

/// Geometry shared by every glyph.
#[derive(Debug, Clone, Copy)]
struct GlyphShape {
    size_scale: LinearScale,
    height: f64,
}

impl GlyphShape {
    fn origin(&self, center_left: Point) -> Point {
        Point::new(center_left.x, center_left.y - self.height / 2.0)
    }
}

/// Result of one lifecycle tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    pub volumes: SideVolumes,
    pub visible: usize,
    pub skipped: usize,
    pub completed: usize,
}

/// Owns every order the diagram has seen and advances them tick by tick.
pub struct OrderLifecycle {
    orders: VecDeque<FlowOrder>,
    ticks_total: u32,
    glyph: GlyphShape,
    y_range: [u32; 2],
    max_retained: usize,
    rng: StdRng,
}

impl OrderLifecycle {
    pub fn new(config: &DiagramConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            orders: VecDeque::new(),
            ticks_total: config.animation_ticks.max(1),
            glyph: GlyphShape {
                size_scale: LinearScale::new(
                    (config.size_domain[0], config.size_domain[1]),
                    (config.size_range[0], config.size_range[1]),
                ),
                height: config.glyph_height,
            },
            y_range: config.y_position_range,
            max_retained: config.max_retained_orders,
            rng,
        }
    }

    /// Queues `order` in the entering state with a fixed vertical slot.
    pub fn adopt(&mut self, order: Order) -> Result<(), OrderError> {
        order.validate()?;
        let [lo, hi] = self.y_range;
        let y_position = self.rng.gen_range(lo..=hi);
        self.orders.push_back(FlowOrder {
            order,
            state: AnimationState::Entering,
            ticks: 0,
            ticks_total: self.ticks_total,
            y_position,
            hidden: false,
        });
        Ok(())
    }

    pub fn orders(&self) -> impl Iterator<Item = &FlowOrder> {
        self.orders.iter()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.orders.iter().filter(|o| o.glyph().is_some()).count()
    }

    /// Advances every order inside the history window by one tick and sums
    /// their volume per side. Orders outside the window keep their state and
    /// their glyph, if any, is hidden.
    pub fn tick<R: Renderer + ?Sized>(
        &mut self,
        layout: &FlowLayout,
        renderer: &mut R,
        window: &HistoryWindow,
    ) -> TickSummary {
        let cutoff = window.cutoff_for(self.orders.iter().map(|o| o.order.timestamp));
        let mut summary = TickSummary::default();
        let glyph = self.glyph;

        for flow in self.orders.iter_mut() {
            let included = cutoff.map_or(true, |c| HistoryWindow::includes(c, flow.order.timestamp));
            if !included {
                if let (Some(id), false) = (flow.glyph(), flow.hidden) {
                    renderer.set_visible(id, false);
                    flow.hidden = true;
                }
                summary.skipped += 1;
                continue;
            }
            if flow.hidden {
                if let Some(id) = flow.glyph() {
                    renderer.set_visible(id, true);
                }
                flow.hidden = false;
            }

            if flow.phase() != Phase::Completed {
                advance(flow, &glyph, layout, renderer);
                if flow.phase() == Phase::Completed {
                    summary.completed += 1;
                }
            }
            summary.volumes.add(flow.order.side, flow.order.volume);
            summary.visible += 1;
        }

        self.evict_completed();
        summary
    }

    /// Drops the oldest completed orders beyond the retention bound.
    fn evict_completed(&mut self) {
        let mut excess = self.orders.len().saturating_sub(self.max_retained);
        if excess == 0 {
            return;
        }
        self.orders.retain(|o| {
            if excess > 0 && o.phase() == Phase::Completed {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    /// Destroys every live glyph. Used when the diagram is torn down.
    pub fn release_all<R: Renderer + ?Sized>(&mut self, renderer: &mut R) {
        for flow in self.orders.iter_mut() {
            if let Some(id) = flow.glyph() {
                renderer.destroy(id);
                flow.state = AnimationState::Completed;
            }
        }
    }
}

/// One state-machine step for a single order.
fn advance<R: Renderer + ?Sized>(flow: &mut FlowOrder, glyph: &GlyphShape, layout: &FlowLayout, renderer: &mut R) {
    flow.state = match mem::replace(&mut flow.state, AnimationState::Completed) {
        AnimationState::Entering => {
            let width = glyph.size_scale.apply_clamped(flow.order.volume);
            let track = OrderTrack::new(layout, flow.order.side, flow.y_position, width);
            let origin = glyph.origin(track.position_for(layout, 0.0));
            let id = renderer.create_rect(
                Rect {
                    x: origin.x,
                    y: origin.y,
                    width,
                    height: glyph.height,
                },
                glyph_style(flow.order.side),
            );
            flow.ticks = 1;
            trace!(id = %flow.order.id, glyph = id.0, "order entered");
            if flow.ticks >= flow.ticks_total {
                AnimationState::Completing { glyph: id }
            } else {
                AnimationState::Animating { glyph: id, track }
            }
        }
        AnimationState::Animating { glyph: id, track } => {
            flow.ticks = (flow.ticks + 1).min(flow.ticks_total);
            if flow.ticks >= flow.ticks_total {
                AnimationState::Completing { glyph: id }
            } else {
                let at = track.position_for(layout, flow.progress());
                renderer.set_position(id, glyph.origin(at));
                AnimationState::Animating { glyph: id, track }
            }
        }
        other => other,
    };

    // completing releases the glyph on the same tick
    if let AnimationState::Completing { glyph: id } = flow.state {
        renderer.destroy(id);
        flow.state = AnimationState::Completed;
        trace!(id = %flow.order.id, "order completed");
    }
}
