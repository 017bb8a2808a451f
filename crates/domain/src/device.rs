//! Device — identity, capabilities, and status of a climate device.
//!
//! The controller never inspects a device's concrete kind to decide what to
//! do with it. Devices advertise a [`Capabilities`] set and the controller
//! selects them by capability and influence sign only. [`DeviceKind`] exists
//! for identity and display.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::ValidationError;

/// Concrete device families known to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Heater,
    Conditioner,
    Illumination,
    Humidifier,
    Thermometer,
    HumiditySensor,
    LightSensor,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Heater => "heater",
            Self::Conditioner => "conditioner",
            Self::Illumination => "illumination",
            Self::Humidifier => "humidifier",
            Self::Thermometer => "thermometer",
            Self::HumiditySensor => "humidity_sensor",
            Self::LightSensor => "light_sensor",
        })
    }
}

/// Identity of a device.
///
/// Two identities are equal only when kind, serial, and description all
/// match; changing the description alone makes them unequal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceIdentity {
    kind: DeviceKind,
    serial: u32,
    description: String,
}

impl DeviceIdentity {
    /// Create an identity.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyDescription`] when `description` is
    /// empty or whitespace.
    pub fn new(
        kind: DeviceKind,
        serial: u32,
        description: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        Ok(Self {
            kind,
            serial,
            description,
        })
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    /// Monotonic number within the device kind.
    #[must_use]
    pub fn serial(&self) -> u32 {
        self.serial
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// A single capability a device may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Switchable,
    Influencer,
    Adjustable,
    Measurer,
}

impl Capability {
    fn bit(self) -> u8 {
        match self {
            Self::Switchable => 1,
            Self::Influencer => 1 << 1,
            Self::Adjustable => 1 << 2,
            Self::Measurer => 1 << 3,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Switchable => "switchable",
            Self::Influencer => "influencer",
            Self::Adjustable => "adjustable",
            Self::Measurer => "measurer",
        })
    }
}

/// Set of [`Capability`] flags advertised by a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Build a set from a list of capabilities.
    #[must_use]
    pub fn of(capabilities: &[Capability]) -> Self {
        capabilities
            .iter()
            .fold(Self::default(), |set, cap| set.with(*cap))
    }

    #[must_use]
    pub fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    #[must_use]
    pub fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }
}

/// Direction in which an influencer pushes its condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InfluenceSign {
    Positive,
    Negative,
}

impl InfluenceSign {
    /// Sign of a non-zero finite number, `None` for zero or NaN.
    #[must_use]
    pub fn of(value: f64) -> Option<Self> {
        if value > 0.0 {
            Some(Self::Positive)
        } else if value < 0.0 {
            Some(Self::Negative)
        } else {
            None
        }
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }
}

/// Percentage of rated power an adjustable device works at, in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PowerFactor(u8);

impl PowerFactor {
    pub const OFF: Self = Self(0);
    /// Factor a ramped device idles at while powered off.
    pub const STANDBY: Self = Self(10);
    pub const FULL: Self = Self(100);

    /// Create a factor, `None` if above 100.
    #[must_use]
    pub fn new(percent: u8) -> Option<Self> {
        (percent <= 100).then_some(Self(percent))
    }

    /// Clamp any number into `0..=100`, truncating the fractional part.
    /// NaN maps to [`Self::OFF`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn saturating(value: f64) -> Self {
        if value.is_nan() {
            return Self::OFF;
        }
        Self(value.clamp(0.0, 100.0) as u8)
    }

    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }

    /// Factor as a fraction in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for PowerFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Point-in-time snapshot of a device, used for status broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub identity: DeviceIdentity,
    pub online: bool,
    pub power_factor: Option<PowerFactor>,
    pub actual_influence: Option<f64>,
    /// Cumulative power delivered across ramp steps.
    pub delivered_power: Option<f64>,
    pub reading: Option<Condition>,
}

impl DeviceStatus {
    /// Status with only the on/off state filled in.
    #[must_use]
    pub fn new(identity: DeviceIdentity, online: bool) -> Self {
        Self {
            identity,
            online,
            power_factor: None,
            actual_influence: None,
            delivered_power: None,
            reading: None,
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (true, Some(reading)) = (self.online, &self.reading) {
            return write!(f, "{}: {reading}", self.identity);
        }
        write!(
            f,
            "{}: is {}",
            self.identity,
            if self.online { "on" } else { "off" }
        )?;
        if let Some(factor) = self.power_factor {
            write!(f, " at {factor} power")?;
        }
        Ok(())
    }
}
