mod activity;
mod api;
mod config;
mod container;
mod daemon;
mod engine;
mod image;
mod router;
mod websocket;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Level;

use activity::ActivityKind;
use container::lifecycle::LifecycleManager;
use container::power::PowerManager;
use engine::{DockerEngine, Engine};
use image::ImageManager;
use websocket::{ContainerPoller, EventHub};

#[derive(Parser)]
#[command(name = "harbord")]
#[command(about = "Container dashboard backend with live updates", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(long = "dev")]
    dev: bool,

    #[arg(long = "config", default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.dev { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if let Err(e) = main_app(cli).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn main_app(cli: Cli) -> anyhow::Result<()> {
    let config = config::config::Config::load_or_default(&cli.config)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", cli.config, e))?;

    daemon::start::print_banner(config.get_version());

    // Engine availability is checked before anything else starts
    let engine: Arc<dyn Engine> = Arc::new(
        DockerEngine::connect(&config.docker.socket_path)
            .context("Cannot connect to the container engine")?,
    );
    daemon::start::check_engine(engine.as_ref())
        .await
        .context("Container engine not reachable")?;

    let event_hub = Arc::new(EventHub::new());
    let lifecycle = Arc::new(LifecycleManager::new(engine.clone(), event_hub.clone()));
    let power = Arc::new(PowerManager::new(engine.clone(), event_hub.clone()));
    let images = Arc::new(ImageManager::new(engine.clone(), event_hub.clone()));

    event_hub
        .record_activity(ActivityKind::System, "Harbor backend started", None)
        .await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = ContainerPoller::new(lifecycle.clone(), event_hub.clone(), config.live.poll_interval())
        .spawn(shutdown_rx);

    let app = router::app_router(
        router::AppComponents {
            event_hub,
            lifecycle,
            power,
            images,
        },
        &config,
    );

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Backend server listening on http://{}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server failed")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = poller.await {
        tracing::warn!("Container poller ended abnormally: {}", e);
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
