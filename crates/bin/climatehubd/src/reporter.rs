//! Console reporter — prints measurements and status broadcasts to stdout.

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use climatehub_app::shutdown::ShutdownSignal;
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::event::{Event, EventType};

/// Print every renderable event until shutdown or until the bus closes.
pub fn spawn(receiver: broadcast::Receiver<Event>, mut shutdown: ShutdownSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = BroadcastStream::new(receiver);
        loop {
            tokio::select! {
                biased;
                () = shutdown.triggered() => break,
                next = events.next() => match next {
                    Some(Ok(event)) => {
                        for line in render(&event) {
                            println!("{line}");
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        tracing::warn!(skipped, "reporter lagging behind");
                    }
                    None => break,
                },
            }
        }
    })
}

/// Human-readable lines for `event`; empty for events that are only logged.
#[must_use]
pub fn render(event: &Event) -> Vec<String> {
    match event.event_type {
        EventType::MeasurementReported => event
            .device
            .as_ref()
            .zip(describe_reading(&event.data))
            .map(|(device, reading)| format!("{device}: {reading}"))
            .into_iter()
            .collect(),
        EventType::StatusReported => event
            .data
            .as_array()
            .map(|entries| entries.iter().filter_map(render_status).collect())
            .unwrap_or_default(),
        EventType::SystemStopping => vec!["system stopping".to_string()],
        _ => Vec::new(),
    }
}

fn describe_reading(reading: &Value) -> Option<String> {
    let kind: ConditionKind = serde_json::from_value(reading.get("kind")?.clone()).ok()?;
    let value = reading.get("value")?.as_f64()?;
    Some(kind.describe(value))
}

fn render_status(entry: &Value) -> Option<String> {
    let description = entry.pointer("/identity/description")?.as_str()?;
    let online = entry.get("online")?.as_bool()?;

    if online && let Some(reading) = entry.get("reading").and_then(describe_reading) {
        return Some(format!("{description}: {reading}"));
    }
    let mut line = format!("{description}: is {}", if online { "on" } else { "off" });
    if let Some(factor) = entry.get("power_factor").and_then(Value::as_u64) {
        line.push_str(&format!(" at {factor}% power"));
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use climatehub_domain::condition::Condition;
    use climatehub_domain::device::{DeviceIdentity, DeviceKind, DeviceStatus, PowerFactor};

    fn identity(kind: DeviceKind, description: &str) -> DeviceIdentity {
        DeviceIdentity::new(kind, 1, description).unwrap()
    }

    #[test]
    fn should_render_status_like_device_display() {
        let mut heater = DeviceStatus::new(identity(DeviceKind::Heater, "SunHeat"), true);
        heater.power_factor = PowerFactor::new(30);
        heater.actual_influence = Some(0.9);
        let mut thermometer =
            DeviceStatus::new(identity(DeviceKind::Thermometer, "ThermoWatch"), true);
        thermometer.reading =
            Some(Condition::new(ConditionKind::Temperature, 5.0, 45.0, 21.5).unwrap());
        let humidifier = DeviceStatus::new(identity(DeviceKind::Humidifier, "OceanMoisture"), false);
        let statuses = vec![heater, thermometer, humidifier];

        let event = Event::new(
            EventType::StatusReported,
            None,
            serde_json::to_value(&statuses).unwrap(),
        );

        let expected: Vec<String> = statuses.iter().map(ToString::to_string).collect();
        assert_eq!(render(&event), expected);
    }

    #[test]
    fn should_render_measurement_with_device_prefix() {
        let reading = Condition::new(ConditionKind::Humidity, 40.0, 86.0, 55.25).unwrap();
        let event = Event::new(
            EventType::MeasurementReported,
            Some(identity(DeviceKind::HumiditySensor, "HumidityMonitor")),
            serde_json::to_value(reading).unwrap(),
        );

        assert_eq!(
            render(&event),
            vec!["HumidityMonitor: relative humidity 55.25 %".to_string()]
        );
    }

    #[test]
    fn should_render_nothing_for_setting_changes() {
        let event = Event::new(EventType::AccuracyChanged, None, serde_json::json!(0.5));
        assert!(render(&event).is_empty());
    }

    #[tokio::test]
    async fn should_stop_on_shutdown() {
        let (sender, receiver) = broadcast::channel(4);
        let (trigger, signal) = climatehub_app::shutdown::channel();
        let handle = spawn(receiver, signal);

        sender
            .send(Event::new(EventType::SystemStopping, None, Value::Null))
            .unwrap();
        trigger.trigger();

        handle.await.unwrap();
    }
}
