//! Room — the condition store and its periodic physical update.
//!
//! Each tick, for every tracked condition:
//!
//! 1. a drift step is computed: `span / 300` with a random sign, except for
//!    temperature, which is pulled towards the outside temperature by
//!    `(outside - value) / 200`;
//! 2. the actual influence of every registered influencer targeting the
//!    condition is added, divided by 60;
//! 3. the result is clamped into `[min, max]`.
//!
//! The room is the only writer of condition values. Readers receive whole
//! [`Condition`] snapshots taken under the same lock, so a reading never
//! mixes fields from two different ticks.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;

use climatehub_domain::condition::{Condition, ConditionKind};
use climatehub_domain::device::DeviceIdentity;
use climatehub_domain::error::ValidationError;

use crate::influence_registry::InfluenceRegistry;
use crate::ports::{Environment, Influencer};
use crate::shutdown::{ShutdownSignal, spawn_periodic};

/// Fraction of a condition's span it randomly drifts by per tick.
const DRIFT_DIVISOR: f64 = 300.0;
/// Temperature closes `1/200` of the gap to the outside each tick.
const OUTSIDE_PULL_DIVISOR: f64 = 200.0;
/// Influence is expressed per minute; ticks apply `1/60` of it.
const INFLUENCE_DIVISOR: f64 = 60.0;

/// Default bounds: `(kind, min, max)`.
const STANDARD_BOUNDS: [(ConditionKind, f64, f64); 3] = [
    (ConditionKind::Temperature, 5.0, 45.0),
    (ConditionKind::Humidity, 40.0, 86.0),
    (ConditionKind::Illuminance, 0.0, 1000.0),
];

struct RoomState {
    conditions: BTreeMap<ConditionKind, Condition>,
    outside_temperature: f64,
    rng: StdRng,
}

/// A single room: bounded conditions, an outside temperature, and the
/// influencers currently acting on it.
pub struct Room {
    state: Mutex<RoomState>,
    registry: InfluenceRegistry,
}

impl Room {
    /// Create a builder for constructing a [`Room`].
    #[must_use]
    pub fn builder() -> RoomBuilder {
        RoomBuilder::default()
    }

    /// Advance every condition by one tick.
    pub fn update(&self) {
        let influencers = self.registry.snapshot();
        let mut state = self.lock();
        let RoomState {
            conditions,
            outside_temperature,
            rng,
        } = &mut *state;

        for condition in conditions.values_mut() {
            let influence: f64 = influencers
                .iter()
                .filter(|influencer| influencer.target() == condition.kind())
                .map(|influencer| influencer.actual_influence())
                .sum();
            let step = drift(condition, *outside_temperature, rng.gen_bool(0.5))
                + influence / INFLUENCE_DIVISOR;
            condition.advance(step);
        }
        tracing::trace!(
            influencers = influencers.len(),
            outside = *outside_temperature,
            "room updated"
        );
    }

    /// Run [`update`](Self::update) every `period` until `shutdown` fires.
    pub fn run(self: &Arc<Self>, period: Duration, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let room = Arc::clone(self);
        spawn_periodic("room", period, shutdown, move |_| {
            room.update();
            async {}
        })
    }

    /// Snapshots of every tracked condition, in [`ConditionKind`] order.
    #[must_use]
    pub fn conditions(&self) -> Vec<Condition> {
        self.lock().conditions.values().copied().collect()
    }

    #[must_use]
    pub fn outside_temperature(&self) -> f64 {
        self.lock().outside_temperature
    }

    /// Change the outside temperature the room temperature is pulled towards.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFiniteValue`] for NaN or infinite input.
    pub fn set_outside_temperature(&self, temperature: f64) -> Result<(), ValidationError> {
        if !temperature.is_finite() {
            return Err(ValidationError::NonFiniteValue);
        }
        self.lock().outside_temperature = temperature;
        tracing::info!(temperature, "outside temperature changed");
        Ok(())
    }

    #[must_use]
    pub fn registry(&self) -> &InfluenceRegistry {
        &self.registry
    }

    fn lock(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for Room {
    fn condition(&self, kind: ConditionKind) -> Option<Condition> {
        self.lock().conditions.get(&kind).copied()
    }

    fn add_influencer(&self, influencer: Arc<dyn Influencer>) {
        let identity = influencer.identity().clone();
        if !self.registry.add(influencer) {
            tracing::debug!(device = %identity, "influencer already registered");
        }
    }

    fn remove_influencer(&self, identity: &DeviceIdentity) {
        if !self.registry.remove(identity) {
            tracing::debug!(device = %identity, "influencer was not registered");
        }
    }
}

/// Drift of one tick before influences are applied.
fn drift(condition: &Condition, outside_temperature: f64, rising: bool) -> f64 {
    match condition.kind() {
        ConditionKind::Temperature => {
            (outside_temperature - condition.value()) / OUTSIDE_PULL_DIVISOR
        }
        ConditionKind::Humidity | ConditionKind::Illuminance => {
            let step = condition.span() / DRIFT_DIVISOR;
            if rising { step } else { -step }
        }
    }
}

/// Step-by-step builder for [`Room`].
#[derive(Debug, Default)]
pub struct RoomBuilder {
    conditions: Vec<(ConditionKind, f64, f64, Option<f64>)>,
    outside_temperature: Option<f64>,
    seed: Option<u64>,
}

impl RoomBuilder {
    /// Track `kind` within `[min, max]`, starting at `initial`
    /// (or at `min` when `None`). Later calls for the same kind win.
    #[must_use]
    pub fn condition(mut self, kind: ConditionKind, min: f64, max: f64, initial: Option<f64>) -> Self {
        self.conditions.retain(|(existing, ..)| *existing != kind);
        self.conditions.push((kind, min, max, initial));
        self
    }

    /// Track temperature 5–45 C, humidity 40–86 %, illuminance 0–1000 lx,
    /// each starting at its lower bound.
    #[must_use]
    pub fn standard_conditions(self) -> Self {
        STANDARD_BOUNDS
            .into_iter()
            .fold(self, |builder, (kind, min, max)| {
                builder.condition(kind, min, max, None)
            })
    }

    #[must_use]
    pub fn outside_temperature(mut self, temperature: f64) -> Self {
        self.outside_temperature = Some(temperature);
        self
    }

    /// Seed the drift randomness, for reproducible runs.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Consume the builder, validate, and return a [`Room`].
    ///
    /// Without an explicit outside temperature a random whole number in
    /// `(-35, 35)` is picked.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvertedBounds`] or
    /// [`ValidationError::NonFiniteValue`] for invalid conditions or a
    /// non-finite outside temperature.
    pub fn build(self) -> Result<Room, ValidationError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut conditions = BTreeMap::new();
        for (kind, min, max, initial) in self.conditions {
            let condition = Condition::new(kind, min, max, initial.unwrap_or(min))?;
            conditions.insert(kind, condition);
        }

        let outside_temperature = match self.outside_temperature {
            Some(temperature) if temperature.is_finite() => temperature,
            Some(_) => return Err(ValidationError::NonFiniteValue),
            None => f64::from(rng.gen_range(-34..=34)),
        };

        Ok(Room {
            state: Mutex::new(RoomState {
                conditions,
                outside_temperature,
                rng,
            }),
            registry: InfluenceRegistry::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::influence_registry::tests::FixedInfluencer;
    use crate::shutdown;
    use climatehub_domain::device::DeviceKind;

    fn room(outside: f64) -> Room {
        Room::builder()
            .standard_conditions()
            .outside_temperature(outside)
            .seed(7)
            .build()
            .unwrap()
    }

    fn value(room: &Room, kind: ConditionKind) -> f64 {
        room.condition(kind).unwrap().value()
    }

    #[test]
    fn should_start_each_condition_at_its_lower_bound_by_default() {
        let room = room(20.0);
        assert!((value(&room, ConditionKind::Temperature) - 5.0).abs() < 1e-9);
        assert!((value(&room, ConditionKind::Humidity) - 40.0).abs() < 1e-9);
        assert!(value(&room, ConditionKind::Illuminance).abs() < 1e-9);
    }

    #[test]
    fn should_reject_inverted_bounds() {
        let result = Room::builder()
            .condition(ConditionKind::Temperature, 30.0, 10.0, None)
            .build();
        assert!(matches!(result, Err(ValidationError::InvertedBounds { .. })));
    }

    #[test]
    fn should_pick_random_outside_temperature_within_range() {
        let room = Room::builder().standard_conditions().seed(1).build().unwrap();
        let outside = room.outside_temperature();
        assert!(outside > -35.0 && outside < 35.0);
        assert!((outside - outside.round()).abs() < f64::EPSILON);
    }

    #[test]
    fn should_pull_temperature_up_towards_warmer_outside() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
            .outside_temperature(30.0)
            .seed(3)
            .build()
            .unwrap();

        let mut previous = value(&room, ConditionKind::Temperature);
        for _ in 0..50 {
            room.update();
            let current = value(&room, ConditionKind::Temperature);
            assert!(current > previous);
            assert!(current < 30.0);
            previous = current;
        }
    }

    #[test]
    fn should_apply_exact_outside_pull_step() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
            .outside_temperature(30.0)
            .build()
            .unwrap();
        room.update();
        // (30 - 20) / 200
        assert!((value(&room, ConditionKind::Temperature) - 20.05).abs() < 1e-9);
    }

    #[test]
    fn should_pull_temperature_down_towards_colder_outside() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(25.0))
            .outside_temperature(-10.0)
            .build()
            .unwrap();
        room.update();
        assert!(value(&room, ConditionKind::Temperature) < 25.0);
    }

    #[test]
    fn should_drift_humidity_by_one_three_hundredth_of_span() {
        let room = Room::builder()
            .condition(ConditionKind::Humidity, 40.0, 100.0, Some(70.0))
            .seed(11)
            .build()
            .unwrap();
        room.update();
        let moved = (value(&room, ConditionKind::Humidity) - 70.0).abs();
        assert!((moved - 0.2).abs() < 1e-9);
    }

    #[test]
    fn should_add_registered_influence_divided_by_sixty() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
            .outside_temperature(20.0)
            .build()
            .unwrap();
        room.add_influencer(FixedInfluencer::arc(
            DeviceKind::Heater,
            1,
            ConditionKind::Temperature,
            3.0,
        ));
        room.update();
        assert!((value(&room, ConditionKind::Temperature) - 20.05).abs() < 1e-9);
    }

    #[test]
    fn should_ignore_influencers_of_other_conditions() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
            .outside_temperature(20.0)
            .build()
            .unwrap();
        room.add_influencer(FixedInfluencer::arc(
            DeviceKind::Humidifier,
            1,
            ConditionKind::Humidity,
            10.0,
        ));
        room.update();
        assert!((value(&room, ConditionKind::Temperature) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn should_keep_every_condition_within_bounds_under_extreme_influence() {
        let room = room(1_000.0);
        for (serial, kind) in ConditionKind::ALL.into_iter().enumerate() {
            room.add_influencer(FixedInfluencer::arc(
                DeviceKind::Heater,
                u32::try_from(serial).unwrap(),
                kind,
                1.0e6,
            ));
        }

        for _ in 0..100 {
            room.update();
            for condition in room.conditions() {
                assert!(condition.min() <= condition.value());
                assert!(condition.value() <= condition.max());
            }
        }
        assert!((value(&room, ConditionKind::Temperature) - 45.0).abs() < 1e-9);
    }

    #[test]
    fn should_keep_every_condition_within_bounds_under_random_drift() {
        let room = room(-1_000.0);
        for _ in 0..5_000 {
            room.update();
            for condition in room.conditions() {
                assert!(condition.min() <= condition.value());
                assert!(condition.value() <= condition.max());
            }
        }
    }

    #[test]
    fn should_stop_folding_influence_after_removal() {
        let room = Room::builder()
            .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
            .outside_temperature(20.0)
            .build()
            .unwrap();
        let heater = FixedInfluencer::arc(DeviceKind::Heater, 1, ConditionKind::Temperature, 3.0);
        let identity = heater.identity().clone();
        room.add_influencer(heater);
        room.remove_influencer(&identity);

        room.update();
        assert!((value(&room, ConditionKind::Temperature) - 20.0).abs() < 1e-9);
        assert!(room.registry().is_empty());
    }

    #[test]
    fn should_reject_non_finite_outside_temperature() {
        let room = room(10.0);
        assert_eq!(
            room.set_outside_temperature(f64::NAN),
            Err(ValidationError::NonFiniteValue)
        );
        assert!((room.outside_temperature() - 10.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn should_update_periodically_until_shutdown() {
        let room = Arc::new(
            Room::builder()
                .condition(ConditionKind::Temperature, 5.0, 45.0, Some(20.0))
                .outside_temperature(40.0)
                .build()
                .unwrap(),
        );
        let (trigger, signal) = shutdown::channel();
        let handle = room.run(Duration::from_millis(200), signal);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        trigger.trigger();
        handle.await.unwrap();

        let after_stop = value(&room, ConditionKind::Temperature);
        assert!(after_stop > 20.0);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert!((value(&room, ConditionKind::Temperature) - after_stop).abs() < f64::EPSILON);
    }
}
