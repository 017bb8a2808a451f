//! Virtual device implementations and the enum the controller drives.

mod actuator;
mod humidifier;
mod sensor;

pub use actuator::{Actuator, DEFAULT_STEP_DELAY, Motion, ramp_steps};
pub use humidifier::Humidifier;
pub use sensor::Sensor;

use std::future::Future;

use climatehub_app::ports::{Adjustable, ClimateDevice, Influencer, Measurer, Switchable};
use climatehub_domain::device::{
    Capabilities, Capability, DeviceIdentity, DeviceStatus, PowerFactor,
};
use climatehub_domain::error::DeviceError;

/// Wrapper enum for the concrete virtual device types.
pub enum VirtualDevice {
    Actuator(Actuator),
    Humidifier(Humidifier),
    Sensor(Sensor),
}

impl Switchable for VirtualDevice {
    fn power_on(&self) -> impl Future<Output = ()> + Send {
        async move {
            match self {
                Self::Actuator(device) => device.power_on().await,
                Self::Humidifier(device) => device.power_on(),
                Self::Sensor(device) => device.power_on(),
            }
        }
    }

    fn power_off(&self) -> impl Future<Output = ()> + Send {
        async move {
            match self {
                Self::Actuator(device) => device.power_off().await,
                Self::Humidifier(device) => device.power_off(),
                Self::Sensor(device) => device.power_off(),
            }
        }
    }

    fn is_online(&self) -> bool {
        match self {
            Self::Actuator(device) => device.is_online(),
            Self::Humidifier(device) => device.is_online(),
            Self::Sensor(device) => device.is_online(),
        }
    }
}

impl ClimateDevice for VirtualDevice {
    fn identity(&self) -> &DeviceIdentity {
        match self {
            Self::Actuator(device) => device.identity(),
            Self::Humidifier(device) => device.identity(),
            Self::Sensor(device) => device.identity(),
        }
    }

    fn capabilities(&self) -> Capabilities {
        match self {
            Self::Actuator(_) => Capabilities::of(&[
                Capability::Switchable,
                Capability::Influencer,
                Capability::Adjustable,
            ]),
            Self::Humidifier(_) => {
                Capabilities::of(&[Capability::Switchable, Capability::Influencer])
            }
            Self::Sensor(_) => Capabilities::of(&[Capability::Switchable, Capability::Measurer]),
        }
    }

    fn as_influencer(&self) -> Option<&dyn Influencer> {
        match self {
            Self::Actuator(device) => Some(device.output()),
            Self::Humidifier(device) => Some(device.output()),
            Self::Sensor(_) => None,
        }
    }

    fn as_measurer(&self) -> Option<&dyn Measurer> {
        match self {
            Self::Sensor(device) => Some(device),
            Self::Actuator(_) | Self::Humidifier(_) => None,
        }
    }

    fn adjust(&self, factor: PowerFactor) -> impl Future<Output = Result<(), DeviceError>> + Send {
        async move {
            match self {
                Self::Actuator(device) => {
                    device.set_power_factor(factor).await;
                    Ok(())
                }
                Self::Humidifier(_) | Self::Sensor(_) => Err(DeviceError::Unsupported {
                    device: self.identity().to_string(),
                    capability: Capability::Adjustable,
                }),
            }
        }
    }

    fn status(&self) -> DeviceStatus {
        match self {
            Self::Actuator(device) => device.status(),
            Self::Humidifier(device) => device.status(),
            Self::Sensor(device) => device.status(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use climatehub_app::environment::Room;
    use climatehub_domain::condition::ConditionKind;
    use climatehub_domain::device::{DeviceKind, InfluenceSign};

    use crate::DeviceFactory;

    fn factory() -> (DeviceFactory, Arc<Room>) {
        let room = Arc::new(
            Room::builder()
                .standard_conditions()
                .outside_temperature(20.0)
                .build()
                .unwrap(),
        );
        (DeviceFactory::new(room.clone()), room)
    }

    #[test]
    fn should_expose_influencer_view_that_agrees_with_capabilities() {
        let (mut factory, _room) = factory();
        let conditioner = factory
            .build(DeviceKind::Conditioner, "CoolMaster", 1500.0, -2.0)
            .unwrap();

        assert!(conditioner.capabilities().contains(Capability::Adjustable));
        let influencer = conditioner.as_influencer().unwrap();
        assert_eq!(influencer.target(), ConditionKind::Temperature);
        assert_eq!(influencer.sign(), Some(InfluenceSign::Negative));
        assert!(conditioner.as_measurer().is_none());
    }

    #[test]
    fn should_expose_measurer_view_for_sensors_only() {
        let (mut factory, _room) = factory();
        let sensor = factory
            .build(DeviceKind::LightSensor, "BrightnessControl", 0.0, 0.0)
            .unwrap();

        assert!(sensor.capabilities().contains(Capability::Measurer));
        assert!(!sensor.capabilities().contains(Capability::Influencer));
        assert_eq!(
            sensor.as_measurer().map(|measurer| measurer.measured_kind()),
            Some(ConditionKind::Illuminance)
        );
        assert!(sensor.as_influencer().is_none());
    }

    #[tokio::test]
    async fn should_reject_power_factor_on_humidifier() {
        let (mut factory, _room) = factory();
        let humidifier = factory
            .build(DeviceKind::Humidifier, "OceanMoisture", 45.0, 10.0)
            .unwrap();

        let result = humidifier.adjust(PowerFactor::FULL).await;

        assert_eq!(
            result,
            Err(DeviceError::Unsupported {
                device: "OceanMoisture".to_string(),
                capability: Capability::Adjustable,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_adjust_actuator_through_device_port() {
        let (mut factory, _room) = factory();
        let lamp = factory
            .build(DeviceKind::Illumination, "MagicBright", 100.0, 1000.0)
            .unwrap();
        lamp.power_on().await;

        lamp.adjust(PowerFactor::FULL).await.unwrap();

        assert_eq!(lamp.status().power_factor, Some(PowerFactor::FULL));
        let influence = lamp.as_influencer().unwrap().actual_influence();
        assert!((influence - 1000.0).abs() < 1e-9);
    }
}
