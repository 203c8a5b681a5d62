//! viewlink viewer — entry point.
//!
//! ```text
//! viewlink-viewer                      Connect with defaults
//! viewlink-viewer --server <addr>     Override producer address
//! viewlink-viewer --quality medium    Start at a given quality level
//! viewlink-viewer --gen-config        Dump default config and exit
//! ```
//!
//! Headless: subscribes to the stream event bus and logs lifecycle
//! transitions and per-second link health. Rendering is left to
//! embedding frontends.

mod config;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use viewlink_core::{ConnectionManager, QualityLevel, StreamEvent, TcpConnector};

use crate::config::ViewerConfig;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "viewlink-viewer", about = "viewlink remote desktop stream viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "viewlink.toml")]
    config: PathBuf,

    /// Producer address (overrides config). Example: 192.168.1.100:8080
    #[arg(short, long)]
    server: Option<String>,

    /// Initial quality level (overrides config): high, medium, low.
    #[arg(short, long)]
    quality: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(addr) = cli.server {
        config.network.server_address = addr;
    }
    if let Some(level) = cli.quality {
        config.quality.level = level;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("viewlink-viewer v{}", env!("CARGO_PKG_VERSION"));

    let initial_quality: QualityLevel = config.quality.level.parse()?;
    let addr = config.network.server_address.parse()?;

    // ── 1. Build the pipeline ───────────────────────────────────

    let connector = TcpConnector::new(addr);
    let (manager, handle) =
        ConnectionManager::new(Box::new(connector), config.connection_config(initial_quality));

    let mut events = handle.subscribe();
    let manager_task = tokio::spawn(manager.run());

    // ── 2. Connect and watch the stream ─────────────────────────

    handle.connect().await?;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(StreamEvent::Connected) => info!("stream connected"),
                Ok(StreamEvent::Disconnected) => info!("stream disconnected"),
                Ok(StreamEvent::Error { reason }) => error!(%reason, "stream error"),
                Ok(StreamEvent::Frame(frame)) => {
                    tracing::debug!(
                        frame_id = frame.metadata.frame_id,
                        width = frame.metadata.width,
                        height = frame.metadata.height,
                        "frame buffered"
                    );
                }
                Ok(StreamEvent::Stats(stats)) => {
                    info!(
                        fps = stats.fps,
                        latency_ms = stats.latency,
                        total = stats.total_frames,
                        dropped = stats.dropped_frames,
                        "link health"
                    );
                }
                Ok(StreamEvent::ReconnectScheduled { attempt, delay }) => {
                    warn!(attempt, delay_ms = delay.as_millis() as u64, "reconnecting");
                }
                Err(e) => {
                    warn!("event stream lagged or closed: {e}");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                handle.disconnect().await?;
                break;
            }
        }
    }

    // ── 3. Shutdown ─────────────────────────────────────────────

    drop(handle);
    let _ = manager_task.await;
    info!("shutdown complete");

    Ok(())
}
