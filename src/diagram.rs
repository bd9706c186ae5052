use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace, warn};

use crate::config::DiagramConfig;
use crate::domain::Order;
use crate::engine::{FlowEngine, FlowStats, TickSummary};
use crate::error::DiagramError;
use crate::render::Renderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagramPhase {
    Created,
    /// Fired once, after `init` has drawn the static geometry.
    Ready,
    Running,
    Paused,
}

/// Host mutations, applied by the engine at the start of the next frame.
#[derive(Debug)]
enum Command {
    AddOrder(Order),
    SetHistory(f64),
}

struct Shared<R: Renderer> {
    engine: FlowEngine<R>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl<R: Renderer> Shared<R> {
    fn apply_pending(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::AddOrder(order) => {
                    // validated on the host side already
                    let _ = self.engine.add_order(order);
                }
                Command::SetHistory(pct) => {
                    if let Err(e) = self.engine.set_history_percentage(pct) {
                        warn!(error = %e, "history update dropped");
                    }
                }
            }
        }
    }

    fn frame(&mut self) -> TickSummary {
        self.apply_pending();
        let summary = self.engine.frame();
        trace!(
            visible = summary.visible,
            buy = summary.volumes.buy,
            sell = summary.volumes.sell,
            "frame"
        );
        summary
    }
}

/// Cloneable handle for feeding a diagram from other tasks, e.g. an
/// [`OrderStream`](crate::market::OrderStream) callback.
#[derive(Debug, Clone)]
pub struct OrderIntake {
    commands: mpsc::UnboundedSender<Command>,
}

impl OrderIntake {
    /// Queues `order`; it enters the diagram on the next frame.
    pub fn add_order(&self, order: Order) -> Result<(), DiagramError> {
        order.validate()?;
        // a closed queue means the diagram is gone; nothing left to feed
        let _ = self.commands.send(Command::AddOrder(order));
        Ok(())
    }

    /// Clamps into 0..=100 and applies from the next frame. Returns the value used.
    pub fn set_history_percentage(&self, percentage: f64) -> Result<f64, DiagramError> {
        if !percentage.is_finite() {
            return Err(DiagramError::InvalidHistoryPercentage(percentage));
        }
        let clamped = percentage.clamp(0.0, 100.0);
        let _ = self.commands.send(Command::SetHistory(clamped));
        Ok(clamped)
    }
}

/// Animated buy/sell flow diagram driven by a frame loop.
///
/// `add_order` and `set_history_percentage` may be called from any task;
/// they go through one queue that the engine drains at the start of each
/// frame, so a frame never sees a half-added order.
pub struct OrderFlowDiagram<R: Renderer + 'static> {
    config: DiagramConfig,
    container: Option<String>,
    shared: Option<Arc<Mutex<Shared<R>>>>,
    intake: OrderIntake,
    pending: Option<mpsc::UnboundedReceiver<Command>>,
    running: watch::Sender<bool>,
    phase: watch::Sender<DiagramPhase>,
    animation: Option<JoinHandle<()>>,
}

impl<R: Renderer + 'static> OrderFlowDiagram<R> {
    pub fn new(config: DiagramConfig) -> Self {
        let (commands, pending) = mpsc::unbounded_channel();
        let (running, _) = watch::channel(false);
        let (phase, _) = watch::channel(DiagramPhase::Created);
        Self {
            config,
            container: None,
            shared: None,
            intake: OrderIntake { commands },
            pending: Some(pending),
            running,
            phase,
            animation: None,
        }
    }

    /// One-time setup: validates the config and draws the intake block,
    /// destination blocks, flows and labels onto `renderer`.
    pub fn init(&mut self, container: &str, renderer: R) -> Result<(), DiagramError> {
        let commands = match (&self.shared, self.pending.take()) {
            (None, Some(rx)) => rx,
            _ => return Err(DiagramError::AlreadyInitialized),
        };
        let engine = match FlowEngine::new(self.config.clone(), renderer) {
            Ok(engine) => engine,
            Err(e) => {
                // keep the queue so init can be retried
                self.pending = Some(commands);
                return Err(e.into());
            }
        };

        self.shared = Some(Arc::new(Mutex::new(Shared { engine, commands })));
        self.container = Some(container.to_string());
        info!(
            container,
            width = self.config.width,
            height = self.config.height,
            "order flow diagram initialized"
        );
        self.phase.send_replace(DiagramPhase::Ready);
        Ok(())
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Queues `order`; it enters the diagram on the next frame. Orders may
    /// be queued before `init`.
    pub fn add_order(&self, order: Order) -> Result<(), DiagramError> {
        self.intake.add_order(order)
    }

    pub fn set_history_percentage(&self, percentage: f64) -> Result<f64, DiagramError> {
        self.intake.set_history_percentage(percentage)
    }

    pub fn intake(&self) -> OrderIntake {
        self.intake.clone()
    }

    /// Starts (or resumes) the frame loop. Must be called inside a tokio runtime.
    pub fn run(&mut self) -> Result<(), DiagramError> {
        let shared = self.shared.clone().ok_or(DiagramError::NotInitialized)?;

        if self.animation.is_none() {
            let frame_interval = Duration::from_millis(self.config.frame_interval_ms);
            self.animation = Some(tokio::spawn(animate(
                shared,
                self.running.subscribe(),
                frame_interval,
            )));
        }

        let changed = self.running.send_if_modified(|running| {
            let was = *running;
            *running = true;
            !was
        });
        if changed {
            info!("animation running");
            self.phase.send_replace(DiagramPhase::Running);
        }
        Ok(())
    }

    /// Stops scheduling frames; a frame already in progress still completes.
    pub fn pause(&self) {
        let changed = self.running.send_if_modified(|running| {
            let was = *running;
            *running = false;
            was
        });
        if changed {
            info!("animation paused");
            self.phase.send_replace(DiagramPhase::Paused);
        }
    }

    pub fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub fn phase(&self) -> DiagramPhase {
        *self.phase.borrow()
    }

    /// Lifecycle notifications (`Ready`, then `Running`/`Paused`).
    pub fn subscribe(&self) -> watch::Receiver<DiagramPhase> {
        self.phase.subscribe()
    }

    /// Runs one frame immediately, outside the loop.
    pub async fn step(&self) -> Result<TickSummary, DiagramError> {
        let shared = self.shared.as_ref().ok_or(DiagramError::NotInitialized)?;
        let summary = shared.lock().await.frame();
        Ok(summary)
    }

    pub async fn stats(&self) -> Result<FlowStats, DiagramError> {
        self.with_engine(|engine| engine.stats()).await
    }

    /// Read access to the engine between frames.
    pub async fn with_engine<T>(&self, f: impl FnOnce(&FlowEngine<R>) -> T) -> Result<T, DiagramError> {
        let shared = self.shared.as_ref().ok_or(DiagramError::NotInitialized)?;
        let guard = shared.lock().await;
        Ok(f(&guard.engine))
    }
}

impl<R: Renderer + 'static> Drop for OrderFlowDiagram<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.animation.take() {
            handle.abort();
        }
    }
}

/// Frame loop. Parks while paused instead of exiting, so `run` after
/// `pause` never races a loop that is shutting down.
async fn animate<R: Renderer + 'static>(
    shared: Arc<Mutex<Shared<R>>>,
    mut running: watch::Receiver<bool>,
    frame_interval: Duration,
) {
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        if !*running.borrow_and_update() {
            if running.changed().await.is_err() {
                return;
            }
            continue;
        }

        tokio::select! {
            _ = ticker.tick() => {
                shared.lock().await.frame();
            }
            changed = running.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderSide;
    use crate::engine::Phase;
    use crate::render::Scene;
    use chrono::Utc;

    fn diagram() -> OrderFlowDiagram<Scene> {
        OrderFlowDiagram::new(DiagramConfig {
            animation_ticks: 50,
            seed: Some(9),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_init_once_and_ready() {
        let mut diagram = diagram();
        let mut phases = diagram.subscribe();
        assert_eq!(diagram.phase(), DiagramPhase::Created);

        diagram.init("flow", Scene::new(600.0, 300.0)).unwrap();
        phases.changed().await.unwrap();
        assert_eq!(*phases.borrow(), DiagramPhase::Ready);
        assert_eq!(diagram.container(), Some("flow"));

        let err = diagram.init("flow", Scene::new(600.0, 300.0)).unwrap_err();
        assert!(matches!(err, DiagramError::AlreadyInitialized));
    }

    #[tokio::test]
    async fn test_init_rejects_bad_config_and_can_retry() {
        let mut diagram = OrderFlowDiagram::<Scene>::new(DiagramConfig {
            animation_ticks: 0,
            ..Default::default()
        });
        let err = diagram.init("flow", Scene::new(600.0, 300.0)).unwrap_err();
        assert!(matches!(err, DiagramError::Config(_)));
        assert_eq!(diagram.phase(), DiagramPhase::Created);
        assert!(diagram.pending.is_some());
    }

    #[tokio::test]
    async fn test_requires_init() {
        let mut diagram = diagram();
        assert!(matches!(diagram.run(), Err(DiagramError::NotInitialized)));
        assert!(matches!(diagram.step().await, Err(DiagramError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_orders_queued_before_init_enter_on_first_frame() {
        let mut diagram = diagram();
        diagram
            .add_order(Order::new(OrderSide::Buy, 120.0, Utc::now()))
            .unwrap();
        diagram.init("flow", Scene::new(600.0, 300.0)).unwrap();

        let summary = diagram.step().await.unwrap();
        assert_eq!(summary.volumes.buy, 120.0);
        let phases = diagram
            .with_engine(|engine| engine.orders().map(|o| o.phase()).collect::<Vec<_>>())
            .await
            .unwrap();
        assert_eq!(phases, vec![Phase::Animating]);
    }

    #[tokio::test]
    async fn test_add_order_validates() {
        let diagram = diagram();
        let err = diagram
            .add_order(Order::new(OrderSide::Sell, -1.0, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, DiagramError::Order(_)));
    }

    #[tokio::test]
    async fn test_history_percentage() {
        let mut diagram = diagram();
        diagram.init("flow", Scene::new(600.0, 300.0)).unwrap();
        assert_eq!(diagram.set_history_percentage(250.0).unwrap(), 100.0);
        assert_eq!(diagram.set_history_percentage(40.0).unwrap(), 40.0);
        assert!(matches!(
            diagram.set_history_percentage(f64::NAN),
            Err(DiagramError::InvalidHistoryPercentage(_))
        ));

        diagram.step().await.unwrap();
        assert_eq!(diagram.stats().await.unwrap().history_percentage, 40.0);
    }

    #[tokio::test]
    async fn test_intake_handle_feeds_diagram() {
        let mut diagram = diagram();
        diagram.init("flow", Scene::new(600.0, 300.0)).unwrap();
        let intake = diagram.intake();
        let handle = tokio::spawn(async move {
            intake
                .add_order(Order::new(OrderSide::Sell, 80.0, Utc::now()))
                .unwrap();
        });
        handle.await.unwrap();

        let summary = diagram.step().await.unwrap();
        assert_eq!(summary.volumes.sell, 80.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_and_pause_loop() {
        let mut diagram = diagram();
        diagram.init("flow", Scene::new(600.0, 300.0)).unwrap();
        diagram
            .add_order(Order::new(OrderSide::Buy, 500.0, Utc::now()))
            .unwrap();

        diagram.run().unwrap();
        diagram.run().unwrap();
        assert!(diagram.is_running());
        assert_eq!(diagram.phase(), DiagramPhase::Running);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let running_frames = diagram.stats().await.unwrap().frames;
        assert!(running_frames >= 5, "only {running_frames} frames");

        diagram.pause();
        diagram.pause();
        assert_eq!(diagram.phase(), DiagramPhase::Paused);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let paused_frames = diagram.stats().await.unwrap().frames;
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(diagram.stats().await.unwrap().frames, paused_frames);

        diagram.run().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(diagram.stats().await.unwrap().frames > paused_frames);
    }
}
