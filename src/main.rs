pub mod controller;
pub mod error;
pub mod persistence;
pub mod recorder;
pub mod ui;

use crate::controller::device_poller::{Acquiring, DevicePoller};
use crate::controller::gilrs_backend::GilrsBackend;
use crate::controller::{PollerError, PollerSettings};
use crate::error::JoyMonError;
use crate::persistence::config_store::ConfigStore;
use crate::persistence::{Config, WindowGeometry};
use crate::ui::monitor::Monitor;
use crate::ui::{JoyMonApp, APP_NAME};
use color_eyre::{eyre::eyre, Result};
use eframe::egui;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    setup()?;

    let mut startup_notices = Vec::new();

    let store = ConfigStore::default_location()?;
    info!("Loading configuration from {}", store.path().display());
    let config = match store.load() {
        Ok(config) => config,
        Err(e) => {
            startup_notices.push(JoyMonError::ConfigLoadFailure(e));
            Config::default()
        }
    };

    let backend =
        GilrsBackend::new().map_err(|e| eyre!("Error initializing gamepad input: {}", e))?;
    let poller =
        DevicePoller::<Acquiring>::create(Box::new(backend), PollerSettings::from(&config))
            .acquire();
    match poller.device_name() {
        Some(name) => info!("Using joystick {}", name),
        None => {
            warn!("No joystick connected");
            startup_notices.push(JoyMonError::DeviceUnavailable(
                PollerError::DeviceUnavailable("no gamepad connected".to_string()),
            ));
        }
    }

    let restore = config.remember_window && config.window.is_restorable();
    let geometry = if restore {
        info!("Restoring window geometry {:?}", config.window);
        config.window
    } else {
        WindowGeometry::default()
    };
    let mut viewport = egui::ViewportBuilder::default()
        .with_title(APP_NAME)
        .with_min_inner_size([210.0, 200.0])
        .with_inner_size([geometry.width as f32, geometry.height as f32]);
    if restore {
        viewport = viewport.with_position([geometry.x as f32, geometry.y as f32]);
    }
    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    let monitor = Monitor::new(config, poller);

    info!("Starting UI");
    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| {
            Ok(Box::new(JoyMonApp::new(
                cc,
                monitor,
                store,
                startup_notices,
            )))
        }),
    )
    .map_err(|e| eyre!("UI exited with an error: {}", e))?;

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
