use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{ConfigError, DiagramConfig};
use crate::domain::{FlowRatio, Order, OrderError, SideVolumes};
use crate::engine::history::HistoryWindow;
use crate::engine::layout::{FlowLayout, LayoutNodes};
use crate::engine::lifecycle::{FlowOrder, OrderLifecycle, TickSummary};
use crate::error::DiagramError;
use crate::render::Renderer;

/// Host-readable counters for one diagram.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FlowStats {
    pub buy_volume: f64,
    pub sell_volume: f64,
    pub ratio: f64,
    pub in_flight: usize,
    pub retained: usize,
    pub visible: usize,
    pub frames: u64,
    pub history_percentage: f64,
}

/// Everything one diagram instance owns: scales, ratio, order list and the
/// primitives drawn for them.
pub struct FlowEngine<R: Renderer> {
    config: DiagramConfig,
    layout: FlowLayout,
    nodes: LayoutNodes,
    lifecycle: OrderLifecycle,
    history: HistoryWindow,
    renderer: R,
    last_tick: TickSummary,
    frames: u64,
}

impl<R: Renderer> FlowEngine<R> {
    /// Validates `config` and draws the static geometry at the neutral ratio.
    pub fn new(config: DiagramConfig, mut renderer: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let layout = FlowLayout::new(&config);
        let nodes = LayoutNodes::mount(&layout, &mut renderer, &config);
        renderer.draw();

        Ok(Self {
            lifecycle: OrderLifecycle::new(&config),
            config,
            layout,
            nodes,
            history: HistoryWindow::default(),
            renderer,
            last_tick: TickSummary::default(),
            frames: 0,
        })
    }

    pub fn config(&self) -> &DiagramConfig {
        &self.config
    }

    pub fn layout(&self) -> &FlowLayout {
        &self.layout
    }

    pub fn nodes(&self) -> &LayoutNodes {
        &self.nodes
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn orders(&self) -> impl Iterator<Item = &FlowOrder> {
        self.lifecycle.orders()
    }

    pub fn ratio(&self) -> FlowRatio {
        self.layout.ratio()
    }

    pub fn volumes(&self) -> SideVolumes {
        self.last_tick.volumes
    }

    pub fn add_order(&mut self, order: Order) -> Result<(), OrderError> {
        let id = order.id;
        self.lifecycle.adopt(order).map_err(|e| {
            warn!(%id, error = %e, "order rejected");
            e
        })
    }

    pub fn set_history_percentage(&mut self, percentage: f64) -> Result<f64, DiagramError> {
        let stored = self.history.set_percentage(percentage)?;
        if stored != percentage {
            warn!(requested = percentage, stored, "history percentage clamped");
        }
        debug!(percentage = stored, "history window updated");
        Ok(stored)
    }

    /// Advances every visible order, then re-derives the ratio from the
    /// volume seen this tick and pushes any geometry change.
    pub fn tick(&mut self) -> TickSummary {
        let summary = self.lifecycle.tick(&self.layout, &mut self.renderer, &self.history);

        let ratio = FlowRatio::from_side_volumes(summary.volumes, self.config.ratio_bounds);
        let resized = self.layout.set_ratio(ratio);
        if resized {
            self.nodes.sync_blocks(&self.layout, &mut self.renderer);
        }
        if resized || summary.volumes != self.last_tick.volumes {
            self.nodes.sync_labels(&self.layout, &mut self.renderer, summary.volumes);
        }

        self.last_tick = summary;
        summary
    }

    /// One animation frame: a tick followed by a redraw.
    pub fn frame(&mut self) -> TickSummary {
        let summary = self.tick();
        self.renderer.draw();
        self.frames += 1;
        summary
    }

    pub fn stats(&self) -> FlowStats {
        FlowStats {
            buy_volume: self.last_tick.volumes.buy,
            sell_volume: self.last_tick.volumes.sell,
            ratio: self.layout.ratio().value(),
            in_flight: self.lifecycle.in_flight(),
            retained: self.lifecycle.len(),
            visible: self.last_tick.visible,
            frames: self.frames,
            history_percentage: self.history.percentage(),
        }
    }

    /// Releases every live glyph and hands the surface back.
    pub fn into_renderer(mut self) -> R {
        self.lifecycle.release_all(&mut self.renderer);
        self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::engine::lifecycle::{OrderTrack, Phase};
    use crate::render::Scene;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    const STATIC_NODES: usize = 8;

    fn ts(offset_ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(offset_ms)
    }

    fn config(ticks: u32) -> DiagramConfig {
        DiagramConfig {
            animation_ticks: ticks,
            seed: Some(17),
            ..Default::default()
        }
    }

    fn engine(ticks: u32) -> FlowEngine<Scene> {
        FlowEngine::new(config(ticks), Scene::new(600.0, 300.0)).unwrap()
    }

    #[test]
    fn test_new_draws_static_geometry() {
        let engine = engine(10);
        assert_eq!(engine.renderer().len(), STATIC_NODES);
        assert_eq!(engine.renderer().frames(), 1);
        assert_eq!(engine.ratio(), FlowRatio::NEUTRAL);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = DiagramConfig {
            curve_start_pct: 90.0,
            ..Default::default()
        };
        assert!(FlowEngine::new(bad, Scene::new(600.0, 300.0)).is_err());
    }

    #[test]
    fn test_order_completes_after_exact_tick_count() {
        let ticks = 10;
        let mut engine = engine(ticks);
        engine.add_order(Order::new(OrderSide::Buy, 250.0, ts(0))).unwrap();

        let mut last_progress = 0.0;
        let mut glyph = None;
        for n in 1..=ticks {
            engine.tick();
            let flow = engine.orders().next().unwrap();
            assert!(flow.progress() >= last_progress);
            last_progress = flow.progress();

            if n < ticks {
                assert_eq!(flow.phase(), Phase::Animating);
                glyph = flow.glyph();
                assert!(engine.renderer().contains(glyph.unwrap()));
            }
        }

        let flow = engine.orders().next().unwrap();
        assert_eq!(flow.phase(), Phase::Completed);
        assert_eq!(flow.progress(), 1.0);
        assert_eq!(flow.glyph(), None);
        assert!(!engine.renderer().contains(glyph.unwrap()));
        assert_eq!(engine.renderer().len(), STATIC_NODES);
    }

    #[test]
    fn test_single_tick_animation() {
        let mut engine = engine(1);
        engine.add_order(Order::new(OrderSide::Sell, 10.0, ts(0))).unwrap();
        engine.tick();
        assert_eq!(engine.orders().next().unwrap().phase(), Phase::Completed);
        assert_eq!(engine.renderer().len(), STATIC_NODES);
    }

    #[test]
    fn test_volume_aggregation_scenario() {
        let mut engine = engine(100);
        engine.add_order(Order::new(OrderSide::Buy, 100.0, ts(0))).unwrap();
        engine.add_order(Order::new(OrderSide::Sell, 100.0, ts(10))).unwrap();
        engine.add_order(Order::new(OrderSide::Buy, 300.0, ts(20))).unwrap();
        engine.set_history_percentage(100.0).unwrap();

        let summary = engine.tick();
        assert_eq!(summary.volumes.buy, 400.0);
        assert_eq!(summary.volumes.sell, 100.0);
        assert!((engine.ratio().value() - 0.2).abs() < 1e-12);

        let scene = engine.renderer();
        let nodes = engine.nodes();
        assert_eq!(scene.text(nodes.label(Some(OrderSide::Buy))), Some("Buys 400"));
        assert_eq!(scene.text(nodes.label(Some(OrderSide::Sell))), Some("Sells 100"));
        let buy = scene.rect(nodes.block(OrderSide::Buy)).unwrap();
        assert!((buy.height - engine.layout().destination(OrderSide::Buy).height).abs() < 1e-9);
    }

    #[test]
    fn test_zero_volume_ratio_stays_neutral() {
        let mut engine = engine(10);
        engine.tick();
        assert_eq!(engine.ratio().value(), 0.5);
        assert_eq!(engine.volumes().total(), 0.0);
    }

    #[test]
    fn test_ratio_clamped_for_one_sided_flow() {
        let mut engine = engine(10);
        engine.add_order(Order::new(OrderSide::Buy, 2000.0, ts(0))).unwrap();
        engine.tick();
        assert_eq!(engine.ratio().value(), 0.1);
    }

    #[test]
    fn test_history_zero_keeps_only_newest() {
        let mut engine = engine(100);
        engine.add_order(Order::new(OrderSide::Buy, 100.0, ts(0))).unwrap();
        engine.add_order(Order::new(OrderSide::Sell, 200.0, ts(500))).unwrap();
        engine.add_order(Order::new(OrderSide::Buy, 300.0, ts(1000))).unwrap();
        engine.set_history_percentage(0.0).unwrap();

        let summary = engine.tick();
        assert_eq!(summary.visible, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.volumes.buy, 300.0);
        assert_eq!(summary.volumes.sell, 0.0);

        let phases: Vec<Phase> = engine.orders().map(|o| o.phase()).collect();
        assert_eq!(phases, vec![Phase::Entering, Phase::Entering, Phase::Animating]);
        assert_eq!(engine.renderer().len(), STATIC_NODES + 1);
    }

    #[test]
    fn test_filtered_glyph_hidden_then_restored() {
        let mut engine = engine(100);
        engine.add_order(Order::new(OrderSide::Buy, 100.0, ts(0))).unwrap();
        engine.tick();
        let glyph = engine.orders().next().unwrap().glyph().unwrap();

        engine.add_order(Order::new(OrderSide::Sell, 100.0, ts(1000))).unwrap();
        engine.set_history_percentage(0.0).unwrap();
        engine.tick();
        let first = engine.orders().next().unwrap();
        assert!(first.is_hidden());
        assert!(!engine.renderer().node(glyph).unwrap().visible);
        let frozen = first.progress();

        engine.set_history_percentage(100.0).unwrap();
        engine.tick();
        let first = engine.orders().next().unwrap();
        assert!(!first.is_hidden());
        assert!(engine.renderer().node(glyph).unwrap().visible);
        assert!(first.progress() > frozen);
    }

    #[test]
    fn test_position_continuous_at_curve_boundaries() {
        let mut engine = engine(10);
        engine.add_order(Order::new(OrderSide::Sell, 300.0, ts(0))).unwrap();
        engine.add_order(Order::new(OrderSide::Buy, 100.0, ts(1))).unwrap();
        engine.tick();

        let layout = engine.layout();
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let track = OrderTrack::new(layout, side, 37, 12.0);
            for pct in [layout.curve_start_pct(), layout.curve_end_pct()] {
                let at = pct / 100.0;
                let exact = track.position_for(layout, at);
                let before = track.position_for(layout, at - 1e-9);
                let after = track.position_for(layout, at + 1e-9);
                assert!((exact.y - before.y).abs() < 1e-4, "{side} at {pct}");
                assert!((exact.y - after.y).abs() < 1e-4, "{side} at {pct}");
                assert!((exact.x - after.x).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn test_track_stays_inside_band() {
        let engine = engine(10);
        let layout = engine.layout();
        let width = 20.0;
        for side in [OrderSide::Buy, OrderSide::Sell] {
            let track = OrderTrack::new(layout, side, 50, width);
            let (slice_top, slice_height) = layout.intake_slice(side);
            let dest = layout.destination(side);

            let start = track.position_for(layout, 0.0);
            assert!((start.x - layout.x_scale().apply(0.0)).abs() < 1e-9);
            assert!(start.y > slice_top && start.y < slice_top + slice_height);

            let end = track.position_for(layout, 1.0);
            assert!((end.x + width - layout.x_scale().apply(100.0)).abs() < 1e-9);
            assert!(end.y > dest.y && end.y < dest.bottom());
        }
    }

    #[test]
    fn test_rejects_invalid_order() {
        let mut engine = engine(10);
        let err = engine
            .add_order(Order::new(OrderSide::Buy, f64::INFINITY, ts(0)))
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidVolume(_)));
        assert_eq!(engine.orders().count(), 0);
    }

    #[test]
    fn test_retention_evicts_oldest_completed() {
        let mut engine = FlowEngine::new(
            DiagramConfig {
                animation_ticks: 1,
                max_retained_orders: 2,
                seed: Some(1),
                ..Default::default()
            },
            Scene::new(600.0, 300.0),
        )
        .unwrap();
        for i in 0..4 {
            engine.add_order(Order::new(OrderSide::Buy, 10.0, ts(i))).unwrap();
        }
        engine.tick();
        let kept: Vec<DateTime<Utc>> = engine.orders().map(|o| o.order().timestamp).collect();
        assert_eq!(kept, vec![ts(2), ts(3)]);
    }

    #[test]
    fn test_frame_draws_and_stats() {
        let mut engine = engine(10);
        engine.add_order(Order::new(OrderSide::Buy, 100.0, ts(0))).unwrap();
        engine.frame();
        engine.frame();
        let stats = engine.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.in_flight, 1);
        assert_eq!(stats.retained, 1);
        assert_eq!(stats.buy_volume, 100.0);
        assert_eq!(engine.renderer().frames(), 3);

        let scene = engine.into_renderer();
        assert_eq!(scene.len(), STATIC_NODES);
    }
}
