//! padmux - watch input devices and print logical input events
//!
//! Opens every attached joystick and game controller, applies the stored (or
//! default) mappings and prints what each control triggers.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use padmux::config::{Settings, StoreKind};
use padmux::input::diagnostics::{device_summaries, print_device_diagnostics};
use padmux::input::gilrs_backend::load_controller_db;
use padmux::input::{DeviceRef, GilrsBackend, InputEvent, InputManager};
use padmux::mapping::InputKind;
use padmux::paths::AppPaths;
use padmux::store::{ConfigStore, FileConfigStore, SledConfigStore};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// padmux - joystick and game controller input layer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to settings file (defaults to the data directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Print attached devices and their mappings, then exit
    #[arg(long)]
    list_devices: bool,

    /// Save the current mapping of every connected device, then exit
    #[arg(long)]
    save_configs: bool,

    /// Mapping store (json or sled), overrides the settings file
    #[arg(long)]
    store: Option<StoreKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let paths = AppPaths::detect();
    let settings_path = args.config.clone().unwrap_or_else(|| paths.settings.clone());

    let mut settings = Settings::load_or_default(&settings_path).await?;
    if let Some(store) = args.store {
        settings.store = store;
    }

    paths.ensure_directories()?;
    let _log_guard = init_logging(
        &args.log_level,
        settings.log_file.then_some(paths.logs_dir.as_path()),
    )?;

    info!("Starting padmux v{}...", env!("CARGO_PKG_VERSION"));
    info!("Settings file: {}", settings_path.display());
    info!("Data directory: {}", paths.base_dir().display());

    if args.list_devices || args.save_configs {
        let mut manager = build_manager(&settings, &paths)?;
        manager.init();
        if args.save_configs {
            save_configs(&mut manager)?;
        } else {
            print_device_diagnostics(&manager);
        }
        manager.deinit();
        return Ok(());
    }

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<InputEvent>();
    let running = Arc::new(AtomicBool::new(true));

    // gilrs is not Send-safe; everything touching it lives on this thread
    let input_thread = std::thread::spawn({
        let running = running.clone();
        let settings = settings.clone();
        let paths = paths.clone();
        move || run_input_loop(&settings, &paths, event_tx, &running)
    });

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            event = event_rx.recv() => match event {
                Some(event) => print_event(&event),
                None => {
                    warn!("Input thread stopped");
                    break;
                },
            },
        }
    }

    running.store(false, Ordering::SeqCst);
    match input_thread.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("Input thread panicked"),
    }

    info!("padmux shutdown complete");
    Ok(())
}

/// Poll devices until `running` is cleared, forwarding logical events
fn run_input_loop(
    settings: &Settings,
    paths: &AppPaths,
    mut event_tx: mpsc::UnboundedSender<InputEvent>,
    running: &AtomicBool,
) -> Result<()> {
    let mut manager = build_manager(settings, paths)?;
    manager.init();

    for line in device_summaries(&manager) {
        info!("  - {}", line);
    }

    let interval = Duration::from_millis(settings.poll_interval_ms);
    while running.load(Ordering::SeqCst) {
        manager.pump_events(&mut event_tx);
        if event_tx.is_closed() {
            warn!("Event receiver dropped, stopping input loop");
            break;
        }
        std::thread::sleep(interval);
    }

    manager.deinit();
    Ok(())
}

fn build_manager(settings: &Settings, paths: &AppPaths) -> Result<InputManager<GilrsBackend>> {
    let mappings = settings
        .controller_db_path
        .as_deref()
        .and_then(load_controller_db);

    let mut backend = GilrsBackend::new(mappings.as_deref())
        .context("Failed to initialize gamepad backend")?;
    backend.settle(Duration::from_millis(settings.settle_ms));

    let store = open_store(settings, paths)?;
    Ok(InputManager::new(backend, store).with_on_finish(settings.on_finish.clone()))
}

fn open_store(settings: &Settings, paths: &AppPaths) -> Result<Box<dyn ConfigStore>> {
    match settings.store {
        StoreKind::Json => {
            let path = settings
                .input_config_path
                .clone()
                .unwrap_or_else(|| paths.input_config.clone());
            info!("Input mappings: {}", path.display());
            Ok(Box::new(FileConfigStore::new(path)))
        },
        StoreKind::Sled => {
            let store = SledConfigStore::open(paths.sled_db_path())
                .context("Failed to open input config database")?;
            Ok(Box::new(store))
        },
    }
}

/// Persist every live mapping, then run the on-finish commands
fn save_configs(manager: &mut InputManager<GilrsBackend>) -> Result<()> {
    let devices = std::iter::once(DeviceRef::Keyboard)
        .chain(manager.slots().into_iter().map(DeviceRef::Slot))
        .collect::<Vec<_>>();

    for device in devices {
        let Some(config) = manager.input_config(device).cloned() else {
            continue;
        };
        manager
            .write_device_config(&config)
            .with_context(|| format!("Failed to save mapping for {}", device))?;
        println!("{} {} ({})", "saved".green(), device, config.device_name);
    }

    let succeeded = manager.run_on_finish_commands();
    info!("{} on-finish command(s) succeeded", succeeded);
    Ok(())
}

fn print_event(event: &InputEvent) {
    let state = match event.input.kind {
        InputKind::Button | InputKind::Key if event.input.value != 0 => "pressed".green(),
        InputKind::Button | InputKind::Key => "released".red(),
        _ => event.input.value.to_string().yellow(),
    };
    let names = if event.names.is_empty() {
        "-".dimmed()
    } else {
        event.names.join(", ").bright_white()
    };
    println!(
        "{:<10} {:<16} {:<10} {}",
        event.device.to_string().cyan(),
        event.input.describe(),
        state,
        names
    );
}

fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "padmux.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
