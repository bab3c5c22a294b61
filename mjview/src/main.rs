//! mjview: latest-frame MJPEG viewer, entry point.
//!
//! ```text
//! mjview                          Connect with defaults
//! mjview --config <path>          Use custom config TOML
//! mjview --host 10.0.0.7 --port 8080
//! mjview --gen-config             Dump default config and exit
//! ```
//!
//! Runtime commands are read from stdin, one per line (see `input`).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mjview_core::{
    DecodeRateLimiter, HttpStreamSource, JpegDecoder, LatestFrameSelector, StreamEndpoint,
    Surface, Tick, TorchControl, Viewer,
};

use mjview::config::ViewerConfig;
use mjview::display::DisplaySink;
use mjview::input::{InputAction, spawn_stdin_reader};
use mjview::status::{StatusLine, format_stats};

type HttpViewer = Viewer<HttpStreamSource, JpegDecoder>;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "mjview", about = "Latest-frame MJPEG camera viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "mjview.toml")]
    config: PathBuf,

    /// Camera host (overrides config). Example: 192.168.2.198
    #[arg(long)]
    host: Option<String>,

    /// Camera port (overrides config).
    #[arg(short, long, value_parser = parse_port)]
    port: Option<u16>,

    /// Minimum milliseconds between decodes (overrides config).
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

fn parse_port(text: &str) -> Result<u16, String> {
    StreamEndpoint::parse_port(text).map_err(|e| e.to_string())
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewerConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(ms) = cli.interval_ms {
        config.decode.interval_ms = ms;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("mjview v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Build the pipeline ───────────────────────────────────

    let endpoint = config.endpoint()?;
    let http = config.http();
    let selector =
        LatestFrameSelector::new(HttpStreamSource::new(&http)?, endpoint, config.selector());
    let mut viewer = Viewer::new(
        selector,
        DecodeRateLimiter::new(config.decode_interval()),
        JpegDecoder::new(),
        Surface::new(config.display.width, config.display.height),
    );
    viewer.set_rotation(config.display.rotation);
    viewer.set_swap_bytes(config.display.swap_bytes);

    let mut torch = TorchControl::new(&http)?;
    let mut sink = DisplaySink::open(&config.display.framebuffer)?;

    // ── 2. Stop signal and input ────────────────────────────────

    let running = Arc::new(AtomicBool::new(true));
    let signal_running = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted");
            signal_running.store(false, Ordering::SeqCst);
        }
    });

    let (input_tx, mut input_rx) = mpsc::channel(16);
    let input_handle = spawn_stdin_reader(input_tx);

    if config.network.autoconnect {
        // A failed first connect is reported in the status line.
        let _ = viewer.connect().await;
    }

    // ── 3. Main loop ────────────────────────────────────────────

    let stats_interval = config.stats_interval();
    let mut last_stats = Instant::now();
    let mut last_status: Option<StatusLine> = None;

    while running.load(Ordering::SeqCst) {
        while let Ok(action) = input_rx.try_recv() {
            apply(action, &mut viewer, &mut torch, &running).await;
        }

        let tick = viewer.tick().await;
        if tick == Tick::Presented {
            if let Err(e) = sink.flush(viewer.surface()) {
                warn!("display write failed: {e}");
            }
        }

        let status = StatusLine::new(
            viewer.endpoint(),
            viewer.status(),
            viewer.rotation(),
            torch.is_on(),
            viewer.swap_bytes(),
        );
        if last_status.as_ref() != Some(&status) {
            info!("{status}");
            last_status = Some(status);
        }

        if let Some(interval) = stats_interval {
            if last_stats.elapsed() >= interval {
                info!("{}", format_stats(&viewer.stats(), viewer.status()));
                last_stats = Instant::now();
            }
        }

        let pause = config.pacing.pause_after(tick);
        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(pause).await;
        }
    }

    // ── 4. Shutdown ─────────────────────────────────────────────

    info!("shutting down");
    viewer.shutdown().await;
    info!("{}", format_stats(&viewer.stats(), viewer.status()));
    input_handle.abort();

    // The stdin reader sits in a blocking read that cannot be cancelled,
    // and the runtime would wait for it on drop.
    std::process::exit(0);
}

/// Apply one user command to the running viewer.
async fn apply(
    action: InputAction,
    viewer: &mut HttpViewer,
    torch: &mut TorchControl,
    running: &AtomicBool,
) {
    match action {
        InputAction::RotateLeft => viewer.set_rotation(viewer.rotation().rotate_left()),
        InputAction::RotateRight => viewer.set_rotation(viewer.rotation().rotate_right()),
        InputAction::ToggleSwap => viewer.set_swap_bytes(!viewer.swap_bytes()),
        InputAction::ToggleTorch => {
            if !viewer.status().is_connected() {
                info!("torch needs an open stream");
                return;
            }
            if let Err(e) = torch.toggle(viewer.endpoint()).await {
                warn!("torch request failed: {e}");
            }
        }
        InputAction::Reconnect => {
            info!("connecting to {}", viewer.endpoint());
            // Failure already logged; the status line shows the result.
            let _ = viewer.connect().await;
        }
        InputAction::Quit => running.store(false, Ordering::SeqCst),
    }
}
