//! tagbook reader - Main entry point
//!
//! Wires the RFID reader, buttons and status light to the playback
//! controller and runs until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tagbook_common::config::{resolve_config_path, ConfigOverrides, TomlConfig};
use tagbook_common::db::init_database;
use tagbook_player::daemon::MpdClient;
use tagbook_player::db::{settings, SqliteProgressStore};
use tagbook_player::input::{spawn_button_poller, spawn_dispatcher, ButtonAction, SerialTagReader, SysfsButton};
use tagbook_player::observers::{spawn_light_observer, spawn_volume_persister};
use tagbook_player::playback::{ControllerSettings, PlaybackController};
use tagbook_player::poll_loop::PollLoop;
use tagbook_player::status_light::{LogPin, PatternName, StatusLight, SysfsPin};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Queued button presses before pollers wait on the dispatcher
const BUTTON_QUEUE: usize = 16;

/// Command-line arguments for tagbook
#[derive(Parser, Debug)]
#[command(name = "tagbook")]
#[command(about = "RFID audiobook reader")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database holding listening progress
    #[arg(long, env = "TAGBOOK_DATABASE")]
    database: Option<PathBuf>,

    /// Audio daemon host
    #[arg(long, env = "TAGBOOK_DAEMON_HOST")]
    daemon_host: Option<String>,

    /// Audio daemon port
    #[arg(long, env = "TAGBOOK_DAEMON_PORT")]
    daemon_port: Option<u16>,

    /// Log level when RUST_LOG is not set
    #[arg(long, env = "TAGBOOK_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;
    config.apply_overrides(ConfigOverrides {
        database_path: args.database,
        daemon_host: args.daemon_host,
        daemon_port: args.daemon_port,
        log_level: args.log_level,
    });

    // Initialize tracing
    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("tagbook={0},tagbook_player={0},tagbook_common={0}", level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting tagbook reader v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) if path.exists() => info!("Configuration: {}", path.display()),
        _ => warn!("No configuration file, using built-in defaults"),
    }

    let db = init_database(&config.database_path)
        .await
        .context("Failed to open database")?;
    let volume = settings::get_volume(&db, config.daemon.initial_volume)
        .await
        .context("Failed to read saved volume")?;

    let daemon = MpdClient::connect(&config.daemon.host, config.daemon.port, config.daemon.timeout())
        .await
        .with_context(|| {
            format!(
                "Failed to connect to audio daemon at {}:{}",
                config.daemon.host, config.daemon.port
            )
        })?;

    let store = Arc::new(SqliteProgressStore::new(db.clone()));
    let controller = Arc::new(PlaybackController::new(
        Box::new(daemon),
        store,
        ControllerSettings::from(&config.playback),
        volume,
    ));

    // Status light and its observers
    let light = StatusLight::new(PatternName::On);
    let light_task = match config.status_light.pin {
        Some(pin) => match SysfsPin::open(&config.gpio_root, pin) {
            Ok(output) => light.spawn(output),
            Err(e) => {
                warn!("Status light on GPIO {} unavailable, logging only: {}", pin, e);
                light.spawn(LogPin::default())
            }
        },
        None => light.spawn(LogPin::default()),
    };
    let light_observer = spawn_light_observer(controller.subscribe(), light.clone());
    let volume_persister = spawn_volume_persister(controller.subscribe(), db.clone());

    if let Err(e) = controller.set_volume(volume).await {
        warn!("Failed to apply volume {}%: {}", volume, e);
    }

    // Buttons
    let shutdown = CancellationToken::new();
    let (button_tx, button_rx) = mpsc::channel(BUTTON_QUEUE);
    let dispatcher = spawn_dispatcher(Arc::clone(&controller), button_rx);

    let mut pollers = Vec::new();
    for wiring in &config.buttons.pins {
        let action: ButtonAction = wiring
            .action
            .parse()
            .with_context(|| format!("Invalid action for button on GPIO {}", wiring.pin))?;

        match SysfsButton::open(&config.gpio_root, wiring.pin, action, config.buttons.debounce()) {
            Ok(button) => pollers.push(spawn_button_poller(
                button,
                config.buttons.poll_interval(),
                button_tx.clone(),
                shutdown.clone(),
            )),
            Err(e) => warn!("Button {} on GPIO {} unavailable: {}", action, wiring.pin, e),
        }
    }
    drop(button_tx);

    // Tag reader and main loop
    let tags = SerialTagReader::open(
        &config.rfid.device,
        config.rfid.baud_rate,
        config.rfid.frame_length,
        config.rfid.read_timeout(),
    )
    .with_context(|| format!("Failed to open RFID reader {}", config.rfid.device.display()))?;

    let poll_loop = tokio::spawn(
        PollLoop::new(Arc::clone(&controller), tags, config.playback.poll_interval())
            .run(shutdown.clone()),
    );

    shutdown_signal().await;
    shutdown.cancel();

    if let Err(e) = poll_loop.await {
        error!("Poll loop task failed: {}", e);
    }
    for poller in pollers {
        if let Err(e) = poller.await {
            error!("Button poller task failed: {}", e);
        }
    }
    // Ends once every poller dropped its sender
    if let Err(e) = dispatcher.await {
        error!("Button dispatcher task failed: {}", e);
    }

    if let Err(e) = controller.close().await {
        warn!("Failed to close audio daemon connection: {}", e);
    }
    light.request_exit();
    if let Err(e) = light_task.await {
        error!("Status light task failed: {}", e);
    }

    // Observers end when the controller's event channel closes
    drop(controller);
    for observer in [light_observer, volume_persister] {
        if let Err(e) = observer.await {
            error!("Observer task failed: {}", e);
        }
    }
    db.close().await;

    info!("tagbook reader stopped");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
