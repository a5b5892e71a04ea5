//! pod-gw - FBV Express Mk II to Pocket POD gateway.
//!
//! Wires the bridge core to the midir backend, the hotplug watcher, and
//! the interactive console, then renders status events until quit.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pod_gw::bridge::{Bridge, Target};
use pod_gw::cli;
use pod_gw::events::{BridgeEvent, ChannelSink, EventKind, EventSink};
use pod_gw::platform::midir::{print_ports, MidirPlatform};
use pod_gw::platform::watcher::DeviceWatcher;
use pod_gw::platform::{DeviceIdentity, MidiPlatform, MANUFACTURER, PRODUCT_FBV, PRODUCT_POD};

const CLIENT_NAME: &str = "pod-gw";

/// Bridge a Line 6 FBV Express Mk II foot controller to a Pocket POD
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Start with the foot controller disabled
    #[arg(long)]
    no_fbv: bool,

    /// Start with the Pocket POD disabled
    #[arg(long)]
    no_pod: bool,

    /// Run without the interactive console (daemon style)
    #[arg(long)]
    no_repl: bool,

    /// Minimum pedal movement (in controller steps) forwarded to the POD
    #[arg(long, env = "PEDAL_THRESHOLD", default_value = "0")]
    pedal_threshold: u8,

    /// Device poll interval in milliseconds
    #[arg(long, default_value = "1000")]
    poll_interval_ms: u64,

    /// Product string the foot controller enumerates under
    #[arg(long, default_value = PRODUCT_FBV)]
    fbv_product: String,

    /// Product string the Pocket POD enumerates under
    #[arg(long, default_value = PRODUCT_POD)]
    pod_product: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    if args.list_ports {
        print_ports(CLIENT_NAME)?;
        return Ok(());
    }

    info!("Starting pod-gw...");

    let fbv = DeviceIdentity::new(MANUFACTURER, args.fbv_product.clone());
    let pod = DeviceIdentity::new(MANUFACTURER, args.pod_product.clone());

    let platform = Arc::new(MidirPlatform::new(
        CLIENT_NAME,
        vec![fbv.clone(), pod.clone()],
    ));

    let (sink, mut events) = ChannelSink::new(1000);
    let bridge = Arc::new(Bridge::with_identities(
        Arc::clone(&platform) as Arc<dyn MidiPlatform>,
        sink as Arc<dyn EventSink>,
        fbv,
        pod,
        args.pedal_threshold,
    ));

    // Initial enables run on the blocking pool: a device open can block
    // for up to its timeout.
    {
        let bridge = Arc::clone(&bridge);
        let enable_fbv = !args.no_fbv;
        let enable_pod = !args.no_pod;
        tokio::task::spawn_blocking(move || {
            if enable_fbv {
                bridge.set_enabled(Target::Fbv, true);
            }
            if enable_pod {
                bridge.set_enabled(Target::Pod, true);
            }
        })
        .await?;
    }

    let watcher = DeviceWatcher::spawn(
        Arc::clone(&platform) as Arc<dyn MidiPlatform>,
        Arc::clone(&bridge),
        Duration::from_millis(args.poll_interval_ms),
    );
    info!("Device watcher started ({}ms poll)", args.poll_interval_ms);

    // The console runs on a plain OS thread so a blocked readline never
    // holds a runtime worker; quit comes back through the channel.
    let (quit_tx, mut quit_rx) = mpsc::channel::<()>(1);
    if args.no_repl {
        info!("Console disabled, running until interrupted");
    } else {
        let bridge = Arc::clone(&bridge);
        std::thread::spawn(move || {
            if let Err(e) = cli::run_repl(bridge, CLIENT_NAME.to_string(), quit_tx) {
                warn!("Console failed: {}", e);
            }
        });
    }

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                render_event(&event);
            }

            Some(()) = quit_rx.recv() => {
                info!("Console quit");
                break;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    watcher.abort();
    let bridge = Arc::clone(&bridge);
    tokio::task::spawn_blocking(move || bridge.shutdown()).await?;
    info!("pod-gw shutdown complete");

    Ok(())
}

fn render_event(event: &BridgeEvent) {
    let tag = format!("{:7}", event.kind.to_string());
    let tag = match event.kind {
        EventKind::CtlChn => tag.cyan().bold(),
        _ if event.status < 0 => tag.red(),
        _ => tag.green(),
    };
    println!("{} {} ({})", tag, event.message, event.status);
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
