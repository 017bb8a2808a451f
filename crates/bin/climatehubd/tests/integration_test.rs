//! End-to-end tests for the full climatehubd stack.
//!
//! Each test wires the real room, the real virtual devices, the real
//! controller and the command service. Time is paused so ramp delays and
//! periodic ticks run in virtual time.

use std::sync::Arc;
use std::time::Duration;

use climatehub_adapter_virtual::{DeviceFactory, VirtualDevice};
use climatehub_app::controller::{Controller, ControllerSettings};
use climatehub_app::environment::Room;
use climatehub_app::event_bus::InProcessEventBus;
use climatehub_app::ports::{ClimateDevice, Environment, Switchable};
use climatehub_app::services::command_service::{CommandService, Flow};
use climatehub_app::shutdown::{self, ShutdownTrigger};
use climatehub_domain::command::Command;
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::DeviceKind;
use climatehub_domain::event::EventType;

type Bus = Arc<InProcessEventBus>;

struct Stack {
    room: Arc<Room>,
    bus: Bus,
    controller: Arc<Controller<VirtualDevice, Bus>>,
    commands: CommandService<VirtualDevice, Bus>,
    trigger: ShutdownTrigger,
}

/// Build the stack around a room starting at `temperature`, with the
/// outside at `outside`, and register `roster`.
async fn stack(temperature: f64, outside: f64, roster: &[(DeviceKind, &str, f64, f64)]) -> Stack {
    let room = Arc::new(
        Room::builder()
            .standard_conditions()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(temperature))
            .outside_temperature(outside)
            .seed(42)
            .build()
            .unwrap(),
    );
    let bus = Arc::new(InProcessEventBus::new(256));
    let (trigger, signal) = shutdown::channel();
    let controller = Arc::new(
        Controller::new(
            "SmartHouseController",
            ControllerSettings::default(),
            Arc::clone(&bus),
            signal,
        )
        .unwrap(),
    );

    let mut factory = DeviceFactory::new(room.clone());
    for (kind, description, rated_power, efficiency) in roster {
        let device = factory
            .build(*kind, description, *rated_power, *efficiency)
            .unwrap();
        controller.register_device(device).await.unwrap();
    }

    let commands = CommandService::new(Arc::clone(&controller), Arc::clone(&room), Arc::clone(&bus));
    Stack {
        room,
        bus,
        controller,
        commands,
        trigger,
    }
}

const THERMOMETER: (DeviceKind, &str, f64, f64) = (DeviceKind::Thermometer, "ThermoWatch", 0.0, 0.0);
const HEATER: (DeviceKind, &str, f64, f64) = (DeviceKind::Heater, "SunHeat", 2000.0, 3.0);
const CONDITIONER: (DeviceKind, &str, f64, f64) =
    (DeviceKind::Conditioner, "CoolMaster", 1500.0, -2.0);

const FULL_ROSTER: [(DeviceKind, &str, f64, f64); 7] = [
    THERMOMETER,
    (DeviceKind::HumiditySensor, "HumidityMonitor", 0.0, 0.0),
    (DeviceKind::LightSensor, "BrightnessControl", 0.0, 0.0),
    HEATER,
    CONDITIONER,
    (DeviceKind::Illumination, "MagicBright", 100.0, 1000.0),
    (DeviceKind::Humidifier, "OceanMoisture", 45.0, 10.0),
];

fn device(stack: &Stack, description: &str) -> Arc<VirtualDevice> {
    stack
        .controller
        .devices()
        .into_iter()
        .find(|device| device.identity().description() == description)
        .unwrap()
}

fn temperature(stack: &Stack) -> f64 {
    stack
        .room
        .condition(ConditionKind::Temperature)
        .unwrap()
        .value()
}

#[tokio::test(start_paused = true)]
async fn should_register_full_roster_with_influencers_off_and_sensors_on() {
    let stack = stack(20.0, 20.0, &FULL_ROSTER).await;

    let devices = stack.controller.devices();
    assert_eq!(devices.len(), 7);
    for device in &devices {
        let is_sensor = device.as_measurer().is_some();
        assert_eq!(device.is_online(), is_sensor, "{}", device.identity());
    }
    assert!(stack.room.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_engage_heater_not_conditioner_when_below_preference() {
    let stack = stack(20.0, 20.0, &[THERMOMETER, HEATER, CONDITIONER]).await;
    stack
        .commands
        .execute("accuracy 0.5".parse().unwrap())
        .await
        .unwrap();
    stack
        .commands
        .execute("temp 25".parse().unwrap())
        .await
        .unwrap();

    stack
        .controller
        .regulate(ConditionKind::Temperature, 25.0)
        .await
        .unwrap();

    let heater = device(&stack, "SunHeat");
    let conditioner = device(&stack, "CoolMaster");
    assert!(heater.is_online());
    assert!(!conditioner.is_online());
    assert!(stack.room.registry().contains(heater.identity()));
    assert!(!stack.room.registry().contains(conditioner.identity()));
}

#[tokio::test(start_paused = true)]
async fn should_leave_everything_offline_after_off_command() {
    let stack = stack(20.0, 20.0, &FULL_ROSTER).await;
    stack.controller.power_on_all().await;
    assert_eq!(stack.room.registry().len(), 4);

    let flow = stack.commands.execute(Command::Off).await.unwrap();

    assert_eq!(flow, Flow::Stop);
    assert!(stack.controller.devices().iter().all(|device| !device.is_online()));
    assert!(stack.room.registry().is_empty());
}

#[tokio::test(start_paused = true)]
async fn should_warm_towards_outside_temperature_without_influencers() {
    let stack = stack(20.0, 0.0, &[THERMOMETER]).await;
    stack
        .commands
        .execute("Temp 30".parse().unwrap())
        .await
        .unwrap();

    let room_task = stack
        .room
        .run(Duration::from_millis(200), stack.trigger.subscribe());
    let mut previous = temperature(&stack);
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let current = temperature(&stack);
        assert!(current > previous);
        assert!(current < 30.0);
        previous = current;
    }

    stack.trigger.trigger();
    room_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn should_hold_temperature_near_preference_with_real_devices() {
    let stack = stack(20.0, 22.0, &[THERMOMETER, HEATER, CONDITIONER]).await;
    stack
        .commands
        .execute("power 100".parse().unwrap())
        .await
        .unwrap();

    let room_task = stack
        .room
        .run(Duration::from_millis(200), stack.trigger.subscribe());
    let controller_task = stack.controller.run();

    tokio::time::sleep(Duration::from_secs(90)).await;
    let mut samples = Vec::new();
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_secs(1)).await;
        samples.push(temperature(&stack));
    }

    stack.trigger.trigger();
    room_task.await.unwrap();
    controller_task.await.unwrap();
    stack.controller.join_reporters().await;

    for sample in samples {
        assert!(
            (23.0..=26.5).contains(&sample),
            "temperature {sample} drifted away from the preference"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn should_publish_measurements_and_status_while_running() {
    let stack = stack(20.0, 20.0, &[THERMOMETER, HEATER]).await;
    let mut events = stack.bus.subscribe();
    let controller_task = stack.controller.run();

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    stack.trigger.trigger();
    controller_task.await.unwrap();
    stack.controller.join_reporters().await;

    let mut measurements = 0;
    let mut statuses = 0;
    while let Ok(event) = events.try_recv() {
        match event.event_type {
            EventType::MeasurementReported => measurements += 1,
            EventType::StatusReported => statuses += 1,
            _ => {}
        }
    }
    assert!(measurements >= 1);
    assert!(statuses >= 1);
}
