//! Humidifier — a fixed-output influencer with no power adjustment.

use std::sync::Arc;

use climatehub_app::ports::{Environment, Influencer};
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::{DeviceIdentity, DeviceStatus, PowerFactor};

use super::actuator::Output;

/// Pushes humidity up by its full efficiency whenever it is on.
pub struct Humidifier {
    output: Arc<Output>,
    environment: Arc<dyn Environment>,
}

impl Humidifier {
    pub(crate) fn new(
        identity: DeviceIdentity,
        efficiency: f64,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            output: Arc::new(Output::new(
                identity,
                ConditionKind::Humidity,
                efficiency,
                PowerFactor::FULL,
            )),
            environment,
        }
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        self.output.identity()
    }

    pub(crate) fn output(&self) -> &Output {
        &self.output
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.output.is_online()
    }

    pub fn power_on(&self) {
        self.output.set_online(true);
        tracing::info!(device = %self.identity(), "powered on");
        self.environment.add_influencer(self.output.clone());
        tracing::info!(device = %self.identity(), "humidifying");
    }

    pub fn power_off(&self) {
        self.environment.remove_influencer(self.identity());
        self.output.set_online(false);
        tracing::info!(device = %self.identity(), "powered off");
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        let mut status = DeviceStatus::new(self.identity().clone(), self.is_online());
        status.actual_influence = Some(self.output.actual_influence());
        status
    }
}
