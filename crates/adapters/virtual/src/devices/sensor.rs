//! Sensors — thermometer, hygrometer and light sensor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use climatehub_app::ports::{Environment, Measurer};
use climatehub_domain::condition::{Condition, ConditionKind};
use climatehub_domain::device::{DeviceIdentity, DeviceStatus};

/// Reads one condition straight from the room while online.
pub struct Sensor {
    identity: DeviceIdentity,
    kind: ConditionKind,
    environment: Arc<dyn Environment>,
    online: AtomicBool,
}

impl Sensor {
    pub(crate) fn new(
        identity: DeviceIdentity,
        kind: ConditionKind,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            identity,
            kind,
            environment,
            online: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub fn power_on(&self) {
        self.online.store(true, Ordering::SeqCst);
        tracing::debug!(device = %self.identity, kind = %self.kind, "sensor online");
    }

    pub fn power_off(&self) {
        self.online.store(false, Ordering::SeqCst);
        tracing::debug!(device = %self.identity, kind = %self.kind, "sensor offline");
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        let mut status = DeviceStatus::new(self.identity.clone(), self.is_online());
        status.reading = self.reading();
        status
    }
}

impl Measurer for Sensor {
    fn measured_kind(&self) -> ConditionKind {
        self.kind
    }

    fn reading(&self) -> Option<Condition> {
        if self.is_online() {
            self.environment.condition(self.kind)
        } else {
            None
        }
    }
}
