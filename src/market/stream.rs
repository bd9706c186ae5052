use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::StreamConfig;
use crate::domain::Order;
use crate::market::{IntervalPolicy, OrderSource};

const EVENT_FEED_CAPACITY: usize = 256;

/// Pausable emitter of synthetic orders.
///
/// While running, the background task waits a random interval (see
/// [`IntervalPolicy`]), generates one order, hands it to the registered
/// callback and publishes it on the event feed. Pausing cancels the pending
/// wait; resuming starts over with a fresh wait, without catching up.
pub struct OrderStream {
    control: watch::Sender<bool>,
    events: broadcast::Sender<Order>,
    task: JoinHandle<()>,
}

impl OrderStream {
    pub fn spawn<S>(source: S, config: &StreamConfig) -> Self
    where
        S: OrderSource + Send + 'static,
    {
        Self::spawn_with(source, config, |_| {})
    }

    /// `on_order` runs on the stream task for every emitted order, before
    /// the order is published to subscribers.
    pub fn spawn_with<S, F>(source: S, config: &StreamConfig, on_order: F) -> Self
    where
        S: OrderSource + Send + 'static,
        F: FnMut(&Order) + Send + 'static,
    {
        let (control, control_rx) = watch::channel(config.enabled);
        let (events, _) = broadcast::channel(EVENT_FEED_CAPACITY);
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let task = tokio::spawn(run_stream(
            source,
            on_order,
            IntervalPolicy::from(config),
            rng,
            control_rx,
            events.clone(),
        ));

        info!(enabled = config.enabled, "order stream started");
        Self {
            control,
            events,
            task,
        }
    }

    pub fn pause(&self) {
        let changed = self.control.send_if_modified(|streaming| {
            let was = *streaming;
            *streaming = false;
            was
        });
        if changed {
            info!("order stream paused");
        }
    }

    pub fn resume(&self) {
        let changed = self.control.send_if_modified(|streaming| {
            let was = *streaming;
            *streaming = true;
            !was
        });
        if changed {
            info!("order stream resumed");
        }
    }

    pub fn toggle(&self) {
        if self.is_streaming() {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn is_streaming(&self) -> bool {
        *self.control.borrow()
    }

    /// Streaming flag as a watchable value, for keeping host UI in sync.
    pub fn streaming_state(&self) -> watch::Receiver<bool> {
        self.control.subscribe()
    }

    /// Feed of every order emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Order> {
        self.events.subscribe()
    }
}

impl Drop for OrderStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_stream<S, F>(
    mut source: S,
    mut on_order: F,
    policy: IntervalPolicy,
    mut rng: StdRng,
    mut control: watch::Receiver<bool>,
    events: broadcast::Sender<Order>,
) where
    S: OrderSource,
    F: FnMut(&Order),
{
    loop {
        if !*control.borrow_and_update() {
            // 멈춘 상태: 다음 상태 변경까지 대기
            if control.changed().await.is_err() {
                return;
            }
            continue;
        }

        let delay = policy.next_delay(&mut rng);
        tokio::select! {
            _ = sleep(delay) => {
                let order = source.generate();
                debug!(id = %order.id, side = %order.side, volume = order.volume, ?delay, "order emitted");
                on_order(&order);
                // no subscribers is fine
                let _ = events.send(order);
            }
            changed = control.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
