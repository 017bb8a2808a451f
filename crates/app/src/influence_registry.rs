//! Influence registry — the influencers currently acting on a room.
//!
//! Devices add themselves on power-on and remove themselves on power-off,
//! each from its own task, while the room updater iterates the set every
//! tick. Readers get a cloned snapshot so iteration never overlaps a
//! mutation.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::DeviceIdentity;

use crate::ports::Influencer;

/// Mutex-guarded set of active influencers, keyed by device identity.
#[derive(Default)]
pub struct InfluenceRegistry {
    entries: Mutex<Vec<Arc<dyn Influencer>>>,
}

impl InfluenceRegistry {
    /// Register an influencer. Returns `false` if one with the same
    /// identity is already registered.
    pub fn add(&self, influencer: Arc<dyn Influencer>) -> bool {
        let mut entries = self.lock();
        if entries
            .iter()
            .any(|existing| existing.identity() == influencer.identity())
        {
            return false;
        }
        entries.push(influencer);
        true
    }

    /// Unregister the influencer with `identity`. Returns `false` if absent.
    pub fn remove(&self, identity: &DeviceIdentity) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|existing| existing.identity() != identity);
        entries.len() != before
    }

    /// Copy of the current set; safe to iterate while devices keep
    /// registering.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<dyn Influencer>> {
        self.lock().clone()
    }

    /// Sum of actual influence over every registered influencer targeting `kind`.
    #[must_use]
    pub fn total_influence(&self, kind: ConditionKind) -> f64 {
        self.snapshot()
            .iter()
            .filter(|influencer| influencer.target() == kind)
            .map(|influencer| influencer.actual_influence())
            .sum()
    }

    #[must_use]
    pub fn contains(&self, identity: &DeviceIdentity) -> bool {
        self.lock()
            .iter()
            .any(|existing| existing.identity() == identity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<dyn Influencer>>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use climatehub_domain::device::DeviceKind;

    /// Influencer with a fixed contribution.
    pub(crate) struct FixedInfluencer {
        pub identity: DeviceIdentity,
        pub target: ConditionKind,
        pub influence: f64,
    }

    impl FixedInfluencer {
        pub(crate) fn arc(
            kind: DeviceKind,
            serial: u32,
            target: ConditionKind,
            influence: f64,
        ) -> Arc<dyn Influencer> {
            Arc::new(Self {
                identity: DeviceIdentity::new(kind, serial, format!("{kind}-{serial}")).unwrap(),
                target,
                influence,
            })
        }
    }

    impl Influencer for FixedInfluencer {
        fn identity(&self) -> &DeviceIdentity {
            &self.identity
        }

        fn target(&self) -> ConditionKind {
            self.target
        }

        fn max_influence(&self) -> f64 {
            self.influence
        }

        fn actual_influence(&self) -> f64 {
            self.influence
        }
    }

    #[test]
    fn should_ignore_duplicate_identity() {
        let registry = InfluenceRegistry::default();
        let heater = FixedInfluencer::arc(DeviceKind::Heater, 1, ConditionKind::Temperature, 3.0);

        assert!(registry.add(Arc::clone(&heater)));
        assert!(!registry.add(heater));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn should_remove_by_identity() {
        let registry = InfluenceRegistry::default();
        let heater = FixedInfluencer::arc(DeviceKind::Heater, 1, ConditionKind::Temperature, 3.0);
        let identity = heater.identity().clone();
        registry.add(heater);

        assert!(registry.remove(&identity));
        assert!(!registry.remove(&identity));
        assert!(registry.is_empty());
    }

    #[test]
    fn should_sum_influence_for_matching_condition_only() {
        let registry = InfluenceRegistry::default();
        registry.add(FixedInfluencer::arc(
            DeviceKind::Heater,
            1,
            ConditionKind::Temperature,
            3.0,
        ));
        registry.add(FixedInfluencer::arc(
            DeviceKind::Conditioner,
            1,
            ConditionKind::Temperature,
            -2.0,
        ));
        registry.add(FixedInfluencer::arc(
            DeviceKind::Humidifier,
            1,
            ConditionKind::Humidity,
            10.0,
        ));

        assert!((registry.total_influence(ConditionKind::Temperature) - 1.0).abs() < 1e-9);
        assert!((registry.total_influence(ConditionKind::Humidity) - 10.0).abs() < 1e-9);
        assert!(registry.total_influence(ConditionKind::Illuminance).abs() < 1e-9);
    }

    #[test]
    fn should_keep_snapshot_stable_while_registry_mutates() {
        let registry = InfluenceRegistry::default();
        let heater = FixedInfluencer::arc(DeviceKind::Heater, 1, ConditionKind::Temperature, 3.0);
        let identity = heater.identity().clone();
        registry.add(heater);

        let snapshot = registry.snapshot();
        registry.remove(&identity);

        assert_eq!(snapshot.len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn should_survive_concurrent_add_remove_and_read() {
        let registry = Arc::new(InfluenceRegistry::default());
        let writers: Vec<_> = (0..4u32)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for round in 0..200u32 {
                        let influencer = FixedInfluencer::arc(
                            DeviceKind::Heater,
                            worker * 1_000 + round,
                            ConditionKind::Temperature,
                            1.0,
                        );
                        let identity = influencer.identity().clone();
                        registry.add(influencer);
                        let _ = registry.total_influence(ConditionKind::Temperature);
                        registry.remove(&identity);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }
        assert!(registry.is_empty());
    }
}
