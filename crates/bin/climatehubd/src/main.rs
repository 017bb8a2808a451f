//! # climatehubd — climatehub daemon
//!
//! Composition root that wires the room, the virtual devices and the
//! controller together and reads operator commands from stdin.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise tracing
//! - Build the room and the event bus
//! - Build the device roster and register it with the controller
//! - Start the room updater, the controller loop and the console reporter
//! - Handle graceful shutdown (`off` command, closed stdin, SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod console;
mod reporter;
mod telemetry;

use std::sync::Arc;

use anyhow::Context;

use climatehub_adapter_virtual::DeviceFactory;
use climatehub_app::controller::Controller;
use climatehub_app::event_bus::InProcessEventBus;
use climatehub_app::services::command_service::CommandService;
use climatehub_app::shutdown;
use climatehub_domain::command::Command;

use config::Config;

const EVENT_BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging.filter);

    let room = Arc::new(
        config
            .room_builder()
            .build()
            .context("invalid environment configuration")?,
    );
    tracing::info!(
        outside_temperature = room.outside_temperature(),
        "room ready"
    );

    let bus = Arc::new(InProcessEventBus::new(EVENT_BUS_CAPACITY));
    let (trigger, signal) = shutdown::channel();
    let reporter = reporter::spawn(bus.subscribe(), trigger.subscribe());

    let controller = Arc::new(
        Controller::new(
            config.controller.name.clone(),
            config.controller_settings(),
            Arc::clone(&bus),
            signal.clone(),
        )
        .context("invalid controller configuration")?,
    );

    let mut factory = DeviceFactory::new(room.clone());
    for spec in &config.devices {
        let device = factory
            .build(spec.kind, &spec.description, spec.rated_power, spec.efficiency)
            .with_context(|| format!("invalid device {}", spec.description))?;
        if let Err(error) = controller.register_device(device).await {
            tracing::warn!(device = %spec.description, %error, "device not registered");
        }
    }

    let room_task = room.run(config.update_interval(), signal);
    let controller_task = controller.run();
    let commands = CommandService::new(Arc::clone(&controller), Arc::clone(&room), Arc::clone(&bus));
    tracing::info!(controller = controller.name(), "climatehubd started");

    tokio::select! {
        () = console::run(&commands, console::stdin_lines()) => {}
        () = telemetry::shutdown_signal() => {
            commands.execute(Command::Off).await?;
        }
    }

    trigger.trigger();
    room_task.await.context("room task failed")?;
    controller_task.await.context("controller task failed")?;
    controller.join_reporters().await;
    reporter.await.context("reporter task failed")?;
    tracing::info!("climatehubd stopped");
    Ok(())
}
