//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the control loop and the
//! device adapters can depend on them without creating circular dependencies.

pub mod device;
pub mod environment;
pub mod event_bus;

pub use device::{Adjustable, ClimateDevice, Influencer, Measurer, Switchable};
pub use environment::Environment;
pub use event_bus::EventPublisher;
