use std::env;
use std::str::FromStr;
use std::time::Duration;

use color_eyre::eyre::{self, WrapErr};
use tokio::time::{interval, sleep};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use order_flow::{
    AppConfig, DiagramPhase, OrderFlowDiagram, OrderGenerator, OrderStream, Scene,
};

const CONTAINER: &str = "order-flow";

/// Reads `key` and parses it, treating an unset variable as `None`.
fn env_parse<T>(key: &str) -> eyre::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| eyre::eyre!("{key}={raw}: {e}")),
        Err(_) => Ok(None),
    }
}

fn load_config() -> eyre::Result<AppConfig> {
    let mut config = match env::var("ORDER_FLOW_CONFIG") {
        Ok(path) => AppConfig::from_file(&path).wrap_err_with(|| format!("loading {path}"))?,
        Err(_) => AppConfig::default(),
    };
    if let Some(seed) = env_parse::<u64>("ORDER_FLOW_SEED")? {
        config = config.with_seed(seed);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv::dotenv().ok();

    // init error reporting
    color_eyre::install()?;

    // init logging
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = load_config()?;
    let run_for = env_parse::<u64>("ORDER_FLOW_RUN_SECS")?.map(Duration::from_secs);
    let toggle_every = env_parse::<u64>("ORDER_FLOW_TOGGLE_SECS")?.map(Duration::from_secs);

    let mut diagram = OrderFlowDiagram::new(config.diagram.clone());
    let mut phases = diagram.subscribe();
    diagram.init(
        CONTAINER,
        Scene::new(config.diagram.width, config.diagram.height),
    )?;

    let generator = match config.stream.seed {
        Some(seed) => OrderGenerator::with_seed(seed),
        None => OrderGenerator::new(),
    };
    let intake = diagram.intake();
    let stream = OrderStream::spawn_with(generator, &config.stream, move |order| {
        if let Err(e) = intake.add_order(order.clone()) {
            warn!(error = %e, "order not forwarded");
        }
    });

    // ready 알림 이후 스트림 상태에 맞춰 애니메이션 시작 여부 결정
    phases
        .wait_for(|phase| *phase == DiagramPhase::Ready)
        .await
        .wrap_err("diagram never became ready")?;
    if stream.is_streaming() {
        diagram.run()?;
    }

    let shutdown = async {
        match run_for {
            Some(duration) => sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "ctrl-c handler unavailable");
                    std::future::pending::<()>().await;
                }
            }
        }
    };
    tokio::pin!(shutdown);

    let mut report = interval(Duration::from_secs(1));
    let mut toggle = interval(toggle_every.unwrap_or(Duration::from_secs(3600)));
    toggle.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = report.tick() => {
                let stats = diagram.stats().await?;
                info!(
                    buy = stats.buy_volume,
                    sell = stats.sell_volume,
                    ratio = stats.ratio,
                    in_flight = stats.in_flight,
                    retained = stats.retained,
                    frames = stats.frames,
                    "flow"
                );
            }
            _ = toggle.tick(), if toggle_every.is_some() => {
                stream.toggle();
                if stream.is_streaming() {
                    diagram.run()?;
                } else {
                    diagram.pause();
                }
            }
        }
    }

    stream.pause();
    diagram.pause();

    let stats = diagram.stats().await?;
    info!(?stats, "shutting down");
    let scene = diagram
        .with_engine(|engine| engine.renderer().to_json())
        .await??;
    debug!(scene = %scene, "final scene");

    Ok(())
}
