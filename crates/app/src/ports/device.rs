//! Device ports — the capability traits a climate device may implement.
//!
//! A device implements any subset of [`Switchable`], [`Influencer`],
//! [`Adjustable`] and [`Measurer`], and advertises that subset through
//! [`ClimateDevice::capabilities`]. The controller works exclusively through
//! [`ClimateDevice`]: it selects devices by capability flag and influence
//! sign, never by concrete kind.

use std::future::Future;

use climatehub_domain::condition::{Condition, ConditionKind};
use climatehub_domain::device::{
    Capabilities, DeviceIdentity, DeviceStatus, InfluenceSign, PowerFactor,
};
use climatehub_domain::error::DeviceError;

/// A device that can be powered on and off.
pub trait Switchable: Send + Sync {
    /// Power the device on. Influencers register with their environment here.
    fn power_on(&self) -> impl Future<Output = ()> + Send;

    /// Power the device off. Influencers unregister from their environment here.
    fn power_off(&self) -> impl Future<Output = ()> + Send;

    fn is_online(&self) -> bool;
}

/// A device that pushes one condition in a signed direction.
///
/// Influencers are shared with the environment's registry as
/// `Arc<dyn Influencer>`, so every method is synchronous.
pub trait Influencer: Send + Sync {
    fn identity(&self) -> &DeviceIdentity;

    /// The condition this device influences.
    fn target(&self) -> ConditionKind;

    /// Influence at full power. Positive raises the value, negative lowers it.
    fn max_influence(&self) -> f64;

    /// Current contribution, scaled by the working power factor.
    fn actual_influence(&self) -> f64;

    /// Direction of influence derived from [`max_influence`](Self::max_influence).
    fn sign(&self) -> Option<InfluenceSign> {
        InfluenceSign::of(self.max_influence())
    }
}

/// A device whose working power can be tuned.
pub trait Adjustable: Send + Sync {
    /// Factor the device is currently working at.
    fn power_factor(&self) -> PowerFactor;

    /// Move towards `factor`.
    ///
    /// While online the change may take time (actuator latency); while
    /// offline the factor is only remembered for the next power-on.
    fn set_power_factor(&self, factor: PowerFactor) -> impl Future<Output = ()> + Send;
}

/// A device that measures one condition.
pub trait Measurer: Send + Sync {
    fn measured_kind(&self) -> ConditionKind;

    /// Latest reading, `None` when offline or never sampled.
    fn reading(&self) -> Option<Condition>;
}

/// A device as seen by the controller.
///
/// Implementations expose their optional capabilities through the
/// `as_*` accessors and [`adjust`](Self::adjust); the accessors must agree
/// with [`capabilities`](Self::capabilities).
pub trait ClimateDevice: Switchable + 'static {
    fn identity(&self) -> &DeviceIdentity;

    fn capabilities(&self) -> Capabilities;

    fn as_influencer(&self) -> Option<&dyn Influencer> {
        None
    }

    fn as_measurer(&self) -> Option<&dyn Measurer> {
        None
    }

    /// Forward a power-factor request to the device's [`Adjustable`] part.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Unsupported`] if the device is not adjustable.
    fn adjust(&self, factor: PowerFactor) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Snapshot for status broadcasts.
    fn status(&self) -> DeviceStatus;
}
