//! Condition — a tracked physical quantity with a bounded value.
//!
//! A [`Condition`] always satisfies `min <= value <= max`. Every mutation
//! goes through [`Condition::set_value`] or [`Condition::advance`], both of
//! which clamp.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The physical quantities a room tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    Temperature,
    Humidity,
    Illuminance,
}

impl ConditionKind {
    /// Every tracked kind, in display order.
    pub const ALL: [Self; 3] = [Self::Temperature, Self::Humidity, Self::Illuminance];

    /// Human-readable name of the quantity.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "relative humidity",
            Self::Illuminance => "light illuminance",
        }
    }

    /// Display unit.
    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "C",
            Self::Humidity => "%",
            Self::Illuminance => "lx",
        }
    }

    /// Render a value of this kind, e.g. `temperature 21.50 C`.
    #[must_use]
    pub fn describe(self, value: f64) -> String {
        format!("{} {value:5.2} {}", self.name(), self.unit())
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A bounded value for one [`ConditionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Condition {
    kind: ConditionKind,
    value: f64,
    min: f64,
    max: f64,
}

impl Condition {
    /// Create a condition starting at `initial`, clamped into `[min, max]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFiniteValue`] if any input is not finite,
    /// or [`ValidationError::InvertedBounds`] when `min >= max`.
    pub fn new(kind: ConditionKind, min: f64, max: f64, initial: f64) -> Result<Self, ValidationError> {
        if !(min.is_finite() && max.is_finite() && initial.is_finite()) {
            return Err(ValidationError::NonFiniteValue);
        }
        if min >= max {
            return Err(ValidationError::InvertedBounds { min, max });
        }
        Ok(Self {
            kind,
            value: initial.clamp(min, max),
            min,
            max,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Width of the admissible range.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Replace the value, clamping into bounds. Non-finite input is ignored.
    pub fn set_value(&mut self, value: f64) {
        if value.is_finite() {
            self.value = value.clamp(self.min, self.max);
        }
    }

    /// Shift the value by `delta`, clamping into bounds.
    pub fn advance(&mut self, delta: f64) {
        self.set_value(self.value + delta);
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind.describe(self.value))
    }
}
