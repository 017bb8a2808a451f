//! # climatehub-app
//!
//! Application layer — the concurrent control loop and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement:
//!   - `ClimateDevice` and the capability traits `Switchable`, `Influencer`,
//!     `Adjustable`, `Measurer`
//!   - `Environment` — what a device may read from and register with
//!   - `EventPublisher` — where activity is reported
//! - Own the shared physical state:
//!   - `Room` — the condition store and its periodic updater
//!   - `InfluenceRegistry` — the set of active influencers, safe to read
//!     while devices register and unregister
//! - Run the `Controller` regulation loop (dead-band / hysteresis logic)
//! - Provide **in-process infrastructure** (event bus, shutdown signal,
//!   periodic task runner) that doesn't need IO
//! - Dispatch operator commands via `CommandService`
//!
//! ## Dependency rule
//! Depends on `climatehub-domain` only (plus `tokio` for tasks, timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod controller;
pub mod environment;
pub mod event_bus;
pub mod influence_registry;
pub mod ports;
pub mod services;
pub mod shutdown;
