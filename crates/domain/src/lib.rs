//! # climatehub-domain
//!
//! Pure domain model for the climatehub climate-control system.
//!
//! ## Responsibilities
//! - Foundational types: error conventions
//! - Define **Conditions** (bounded physical quantities: temperature, humidity, illuminance)
//! - Define **Device identity** and the **capabilities** a device may advertise
//! - Define the **power factor** value object used by adjustable devices
//! - Define **Events** (records of regulation and device activity)
//! - Define **Commands** accepted by the operator console
//! - Contain all invariant enforcement (bounds clamping, factor range, …)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;

pub mod command;
pub mod condition;
pub mod device;
pub mod event;
