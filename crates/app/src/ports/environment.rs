//! Environment port — what a device may read from and register with.
//!
//! The binary constructs one environment and hands an explicit
//! `Arc<dyn Environment>` to every device that needs it.

use std::sync::Arc;

use climatehub_domain::condition::{Condition, ConditionKind};
use climatehub_domain::device::DeviceIdentity;

use super::device::Influencer;

/// Shared physical state that devices observe and influence.
pub trait Environment: Send + Sync {
    /// Snapshot of the condition for `kind`, if tracked.
    fn condition(&self, kind: ConditionKind) -> Option<Condition>;

    /// Start folding `influencer` into condition updates.
    fn add_influencer(&self, influencer: Arc<dyn Influencer>);

    /// Stop folding the influencer with `identity` into condition updates.
    fn remove_influencer(&self, identity: &DeviceIdentity);
}
