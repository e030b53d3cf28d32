mod settings;
mod tui;

use std::env;
use std::fs::OpenOptions;
use std::io;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, bail};
use carsimbus::{Bus, ClientId, LocalBus};
use carsimclient::RadioClient;
use carsimconfig::Config;
use carsimengine::EngineService;
use carsimradio::RadioService;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

const CLIENT_ID: ClientId = ClientId(0x0100);

struct AppOptions {
    config_dir: String,
    client: bool,
    autoplay: bool,
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(options) = resolve_options()? else {
        print_usage();
        return Ok(());
    };

    // ========== PHASE 1 : Configuration ==========
    let config = Config::load_config(&options.config_dir)
        .context("Cannot load CarSim configuration")?;
    init_tracing(&config, options.client);
    info!(config_dir = %config.directory(), "📁 Configuration loaded");

    let mut radio_settings = settings::radio_settings(&config)?;
    radio_settings.autoplay |= options.autoplay;
    radio_settings.verbose |= options.verbose;
    let engine_settings = settings::engine_settings(&config)?;
    let catalog = Arc::new(settings::load_catalog(&config)?);

    // ========== PHASE 2 : Devices ==========
    let bus = LocalBus::new();
    let dyn_bus: Arc<dyn Bus> = bus.clone();

    let radio = Arc::new(RadioService::new(
        Arc::clone(&dyn_bus),
        catalog,
        radio_settings,
    ));
    radio.init().context("Cannot initialize radio")?;

    let engine = Arc::new(EngineService::new(Arc::clone(&dyn_bus), engine_settings));
    engine.start().context("Cannot start engine")?;
    info!("🚗 Engine started");

    radio.start().context("Cannot start radio")?;
    info!("📻 Radio started");

    // ========== PHASE 3 : Run until asked to stop ==========
    if options.client {
        let step = settings::volume_step(&config)?;
        let client = RadioClient::connect(Arc::clone(&dyn_bus), CLIENT_ID);
        tokio::task::spawn_blocking(move || tui::run(&client, step))
            .await
            .context("Client task failed")??;
    } else {
        info!("✅ CarSim is ready! Press Ctrl+C to stop...");
        tokio::signal::ctrl_c()
            .await
            .context("Cannot listen for Ctrl+C")?;
    }

    info!("Shutting down...");
    tokio::task::spawn_blocking(move || {
        radio.stop();
        engine.stop();
        bus.shutdown();
    })
    .await
    .context("Shutdown task failed")?;

    info!("👋 Bye");
    Ok(())
}

/// Returns `None` when usage was requested.
fn resolve_options() -> Result<Option<AppOptions>> {
    let mut options = AppOptions {
        config_dir: String::new(),
        client: false,
        autoplay: false,
        verbose: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => {
                options.config_dir = args
                    .next()
                    .context("--config expects a directory")?;
            }
            "--client" => options.client = true,
            "--autoplay" => options.autoplay = true,
            "-v" | "--verbose" => options.verbose = true,
            "-h" | "--help" => return Ok(None),
            other => bail!("Unknown argument: {other} (see --help)"),
        }
    }
    Ok(Some(options))
}

fn print_usage() {
    println!("Usage: CarSim [options]");
    println!();
    println!("Options:");
    println!("  -c, --config <dir>  Configuration directory (default: $CARSIM_CONFIG or .carsim)");
    println!("      --client        Run the interactive radio client in this terminal");
    println!("      --autoplay      Start playing as soon as the radio starts");
    println!("  -v, --verbose       Log every radio request");
    println!("  -h, --help          Show this help");
    println!();
    println!("Environment:");
    println!("  RUST_LOG            Log filter, overrides host.logger.min_level");
    println!("  CARSIM_LOG_FILE     Append logs to this file instead of stderr");
}

fn init_tracing(config: &Config, interactive: bool) {
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(log_writer(interactive))
        .try_init();
}

fn log_writer(interactive: bool) -> BoxMakeWriter {
    if let Ok(path) = env::var("CARSIM_LOG_FILE") {
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => return BoxMakeWriter::new(Mutex::new(file)),
            Err(err) => eprintln!("Cannot open {path} for logging: {err}"),
        }
    }
    if interactive {
        // Logs on stderr would tear the client screen
        eprintln!("Client mode: set CARSIM_LOG_FILE to keep logs");
        BoxMakeWriter::new(io::sink)
    } else {
        BoxMakeWriter::new(io::stderr)
    }
}
