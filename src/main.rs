use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;

use log::{info, warn};
use tokio::sync::broadcast;

use bms_hash_watcher::beatoraja_source::BeatorajaSource;
use bms_hash_watcher::clipboard_watcher::ClipboardWatcher;
use bms_hash_watcher::config::{sanitize_config, Config};
use bms_hash_watcher::display_manager::DisplayManager;
use bms_hash_watcher::lookup_manager::LookupManager;
use bms_hash_watcher::lr2_source::Lr2Source;
use bms_hash_watcher::polling_controller::PollingController;
use bms_hash_watcher::protocol::{ClipboardMessage, ConfigMessage, Message, StatusMessage};
use bms_hash_watcher::song_source::SongSource;
use bms_hash_watcher::source_poller::SourcePoller;

fn warn_on_invalid_root(source: &dyn SongSource, root_path: &str) {
    if !root_path.is_empty() && !source.is_valid_path(Path::new(root_path)) {
        warn!(
            "{}: no song database found under {}; lookups against it will fail",
            source.name(),
            root_path
        );
    }
}

fn main() {
    let mut clog = colog::default_builder();
    clog.filter(None, log::LevelFilter::Debug);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        log::error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config_dir = dirs::config_dir().unwrap();
    let config_file = config_dir.join("bms_hash_watcher.toml");

    if !config_file.exists() {
        let default_config = Config::default();

        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        std::fs::write(&config_file, toml::to_string(&default_config).unwrap()).unwrap();
    }

    let config_content = std::fs::read_to_string(&config_file).unwrap();
    let config = sanitize_config(toml::from_str::<Config>(&config_content).unwrap_or_default());

    // Bus for communication between components
    let (bus_sender, _) = broadcast::channel(1024);

    let config_state = Arc::new(Mutex::new(config.clone()));

    // Fallback chain in precedence order: beatoraja first, LR2 second.
    let beatoraja_source = BeatorajaSource::new();
    warn_on_invalid_root(&beatoraja_source, &config.beatoraja.root_path);
    let lr2_source = Lr2Source::new();
    warn_on_invalid_root(&lr2_source, &config.lr2.root_path);

    let mut controller = PollingController::new(bus_sender.clone(), config.chain.fallback_enabled);
    let mut beatoraja_poller = SourcePoller::new(
        Box::new(beatoraja_source),
        Arc::clone(&config_state),
        bus_sender.clone(),
    );
    beatoraja_poller
        .set_enabled(config.beatoraja.enabled && !config.beatoraja.root_path.is_empty());
    controller.add_poller(beatoraja_poller);
    let mut lr2_poller = SourcePoller::new(
        Box::new(lr2_source),
        Arc::clone(&config_state),
        bus_sender.clone(),
    );
    lr2_poller.set_enabled(config.lr2.enabled && !config.lr2.root_path.is_empty());
    controller.add_poller(lr2_poller);

    // Setup display manager (runs on the main thread below)
    let mut display_manager = DisplayManager::new(bus_sender.subscribe());

    // Setup lookup manager
    let lookup_bus_consumer = bus_sender.subscribe();
    let lookup_bus_producer = bus_sender.clone();
    let lookup_config_state = Arc::clone(&config_state);
    thread::spawn(move || {
        let mut lookup_manager = LookupManager::new(
            controller,
            lookup_config_state,
            lookup_bus_consumer,
            lookup_bus_producer,
        );
        lookup_manager.run();
    });

    // Setup clipboard watcher feeding the bus
    let mut clipboard_watcher = ClipboardWatcher::new(config.watcher.poll_interval_ms);
    let watcher_bus_sender = bus_sender.clone();
    clipboard_watcher.set_callback(move |text| {
        let _ = watcher_bus_sender.send(Message::Clipboard(ClipboardMessage::Changed(text)));
    });
    let watcher_error_bus_sender = bus_sender.clone();
    clipboard_watcher.set_error_callback(move |message| {
        let _ = watcher_error_bus_sender.send(Message::Status(StatusMessage::Error(message)));
    });

    let _ = bus_sender.send(Message::Config(ConfigMessage::Changed(config.clone())));

    if config.watcher.watch_on_start {
        clipboard_watcher.start();
        let _ = bus_sender.send(Message::Status(StatusMessage::Info(
            "clipboard watch started".to_string(),
        )));
    } else {
        info!("clipboard watch is disabled; set watch_on_start = true in the config to enable it");
    }

    info!("startup complete");
    display_manager.run();

    info!("Application exiting");
}
