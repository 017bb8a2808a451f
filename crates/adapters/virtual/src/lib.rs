//! # climatehub-adapter-virtual
//!
//! Simulated climate devices acting on an in-memory room.
//!
//! ## Provided devices
//!
//! | Kind | Condition | Behaviour |
//! |------|-----------|-----------|
//! | Heater | temperature | positive influence, 10 % power ramp, starts at 20 % |
//! | Conditioner | temperature | negative influence, 10 % power ramp, starts at 20 % |
//! | Illumination | illuminance | instant power changes, resumes at 30 % |
//! | Humidifier | humidity | fixed influence, not adjustable |
//! | Thermometer, humidity sensor, light sensor | their condition | live reading while online |
//!
//! ## Dependency rule
//!
//! Depends on `climatehub-app` (port traits) and `climatehub-domain` only.

mod devices;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use climatehub_app::ports::Environment;
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::{DeviceIdentity, DeviceKind, PowerFactor};
use climatehub_domain::error::ValidationError;

pub use devices::{
    Actuator, DEFAULT_STEP_DELAY, Humidifier, Motion, Sensor, VirtualDevice, ramp_steps,
};

/// Factor heaters and conditioners start and resume at.
const CLIMATIZER_FACTOR: u8 = 20;
/// Factor illumination resumes at after its first power-on.
const ILLUMINATION_RESUME_FACTOR: u8 = 30;

/// Builds virtual devices bound to one environment, numbering each kind
/// from 1.
pub struct DeviceFactory {
    environment: Arc<dyn Environment>,
    serials: HashMap<DeviceKind, u32>,
    step_delay: Duration,
}

impl DeviceFactory {
    #[must_use]
    pub fn new(environment: Arc<dyn Environment>) -> Self {
        Self {
            environment,
            serials: HashMap::new(),
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    /// Delay between ramp steps of heaters and conditioners.
    #[must_use]
    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    /// Build one device. `rated_power` and `efficiency` are ignored for
    /// sensors.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDescription`] for a blank description
    /// and [`ValidationError::NonFiniteValue`] for a non-finite rating.
    pub fn build(
        &mut self,
        kind: DeviceKind,
        description: &str,
        rated_power: f64,
        efficiency: f64,
    ) -> Result<VirtualDevice, ValidationError> {
        if !(rated_power.is_finite() && efficiency.is_finite()) {
            return Err(ValidationError::NonFiniteValue);
        }
        let identity = DeviceIdentity::new(kind, self.peek_serial(kind), description)?;
        self.serials.insert(kind, identity.serial());

        let environment = Arc::clone(&self.environment);
        let ramped = Motion::Ramped {
            step_delay: self.step_delay,
        };
        let device = match kind {
            DeviceKind::Heater => VirtualDevice::Actuator(climatizer(
                identity,
                efficiency,
                rated_power,
                "heating",
                ramped,
                environment,
            )),
            DeviceKind::Conditioner => VirtualDevice::Actuator(climatizer(
                identity,
                efficiency,
                rated_power,
                "cooling",
                ramped,
                environment,
            )),
            DeviceKind::Illumination => VirtualDevice::Actuator(Actuator::new(
                identity,
                ConditionKind::Illuminance,
                efficiency,
                rated_power,
                "shining",
                Motion::Instant,
                factor(CLIMATIZER_FACTOR),
                factor(ILLUMINATION_RESUME_FACTOR),
                environment,
            )),
            DeviceKind::Humidifier => {
                VirtualDevice::Humidifier(Humidifier::new(identity, efficiency, environment))
            }
            DeviceKind::Thermometer => VirtualDevice::Sensor(Sensor::new(
                identity,
                ConditionKind::Temperature,
                environment,
            )),
            DeviceKind::HumiditySensor => VirtualDevice::Sensor(Sensor::new(
                identity,
                ConditionKind::Humidity,
                environment,
            )),
            DeviceKind::LightSensor => VirtualDevice::Sensor(Sensor::new(
                identity,
                ConditionKind::Illuminance,
                environment,
            )),
        };
        tracing::debug!(kind = %kind, description, "device built");
        Ok(device)
    }

    fn peek_serial(&self, kind: DeviceKind) -> u32 {
        self.serials.get(&kind).map_or(1, |last| last.saturating_add(1))
    }
}

fn climatizer(
    identity: DeviceIdentity,
    efficiency: f64,
    rated_power: f64,
    verb: &'static str,
    motion: Motion,
    environment: Arc<dyn Environment>,
) -> Actuator {
    Actuator::new(
        identity,
        ConditionKind::Temperature,
        efficiency,
        rated_power,
        verb,
        motion,
        factor(CLIMATIZER_FACTOR),
        factor(CLIMATIZER_FACTOR),
        environment,
    )
}

fn factor(percent: u8) -> PowerFactor {
    PowerFactor::new(percent).unwrap_or(PowerFactor::FULL)
}
