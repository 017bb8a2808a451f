//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`ClimateError`] via `#[from]`.

use crate::condition::ConditionKind;
use crate::device::Capability;

/// Root error type shared by the domain and application layers.
#[derive(Debug, thiserror::Error)]
pub enum ClimateError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),
}

/// A domain invariant was violated by an input value.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("accuracy must be a positive finite number, got {0}")]
    InvalidAccuracy(f64),

    #[error("value must be finite")]
    NonFiniteValue,

    #[error("bounds are inverted: min {min} is not below max {max}")]
    InvertedBounds { min: f64, max: f64 },

    #[error("device description must not be empty")]
    EmptyDescription,

    #[error("condition {0} is not tracked by this environment")]
    UnknownCondition(ConditionKind),
}

/// A device could not perform the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device {device} failed its self-test")]
    SelfTestFailed { device: String },

    #[error("device {device} is already registered")]
    AlreadyRegistered { device: String },

    #[error("device {device} does not support the {capability} capability")]
    Unsupported {
        device: String,
        capability: Capability,
    },
}
