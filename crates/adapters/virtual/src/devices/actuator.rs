//! Adjustable influencers — heater, conditioner, illumination.
//!
//! An [`Actuator`] keeps its working power factor in an [`Output`] shared
//! with the room's influence registry, so the room always sees the factor of
//! the step the actuator is currently at.
//!
//! Ramped actuators (heater, conditioner) move in 10 % steps with a delay
//! between steps and fall back to a standby factor when powered off. Instant
//! actuators (illumination) jump straight to the requested factor.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use climatehub_app::ports::{Adjustable, Environment, Influencer};
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::{DeviceIdentity, DeviceStatus, PowerFactor};

/// Delay between two ramp steps.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(300);

const STEP: u8 = 10;

/// Factors visited when moving from `from` to `to`: every multiple of ten
/// strictly between them, in travel order, then `to` itself.
#[must_use]
pub fn ramp_steps(from: PowerFactor, to: PowerFactor) -> Vec<PowerFactor> {
    let (from, to) = (from.percent(), to.percent());
    let mut steps: Vec<u8> = if from < to {
        (from / STEP + 1..=to / STEP)
            .map(|tens| tens * STEP)
            .filter(|percent| *percent < to)
            .collect()
    } else {
        (to / STEP + 1..=from.saturating_sub(1) / STEP)
            .rev()
            .map(|tens| tens * STEP)
            .filter(|percent| *percent < from && *percent > to)
            .collect()
    };
    if from != to {
        steps.push(to);
    }
    steps.into_iter().filter_map(PowerFactor::new).collect()
}

/// The part of an influencer the room reads every tick.
pub(crate) struct Output {
    identity: DeviceIdentity,
    target: ConditionKind,
    efficiency: f64,
    factor: AtomicU8,
    online: AtomicBool,
}

impl Output {
    pub(crate) fn new(
        identity: DeviceIdentity,
        target: ConditionKind,
        efficiency: f64,
        factor: PowerFactor,
    ) -> Self {
        Self {
            identity,
            target,
            efficiency,
            factor: AtomicU8::new(factor.percent()),
            online: AtomicBool::new(false),
        }
    }

    pub(crate) fn factor(&self) -> PowerFactor {
        PowerFactor::saturating(f64::from(self.factor.load(Ordering::SeqCst)))
    }

    fn set_factor(&self, factor: PowerFactor) {
        self.factor.store(factor.percent(), Ordering::SeqCst);
    }

    pub(crate) fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Influencer for Output {
    fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    fn target(&self) -> ConditionKind {
        self.target
    }

    fn max_influence(&self) -> f64 {
        self.efficiency
    }

    fn actual_influence(&self) -> f64 {
        if self.is_online() {
            self.efficiency * self.factor().fraction()
        } else {
            0.0
        }
    }
}

/// How an actuator moves between power factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// 10 % steps with a delay; powering off ramps down to standby.
    Ramped { step_delay: Duration },
    /// Immediate jump.
    Instant,
}

/// An adjustable influencer.
pub struct Actuator {
    output: Arc<Output>,
    environment: Arc<dyn Environment>,
    rated_power: f64,
    /// Verb used in progress messages, e.g. `heating`.
    verb: &'static str,
    motion: Motion,
    /// Factor to come back to on the next power-on. Held for the whole of a
    /// ramp so two ramps on one device never interleave.
    resume: tokio::sync::Mutex<PowerFactor>,
    delivered: Mutex<f64>,
}

impl Actuator {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: DeviceIdentity,
        target: ConditionKind,
        efficiency: f64,
        rated_power: f64,
        verb: &'static str,
        motion: Motion,
        working: PowerFactor,
        resume: PowerFactor,
        environment: Arc<dyn Environment>,
    ) -> Self {
        Self {
            output: Arc::new(Output::new(identity, target, efficiency, working)),
            environment,
            rated_power,
            verb,
            motion,
            resume: tokio::sync::Mutex::new(resume),
            delivered: Mutex::new(0.0),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        &self.output.identity
    }

    pub(crate) fn output(&self) -> &Output {
        &self.output
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.output.is_online()
    }

    /// Factor the next power-on will resume at.
    pub async fn resume_factor(&self) -> PowerFactor {
        *self.resume.lock().await
    }

    /// Sum of `rated_power × factor` over every step taken so far.
    #[must_use]
    pub fn delivered_power(&self) -> f64 {
        *self.delivered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn power_on(&self) {
        let resume = self.resume.lock().await;
        self.output.set_online(true);
        self.move_to(*resume).await;
        self.environment.add_influencer(self.output.clone());
        drop(resume);
        tracing::info!(device = %self.identity(), "powered on");
    }

    pub async fn power_off(&self) {
        let mut resume = self.resume.lock().await;
        if !self.is_online() {
            tracing::debug!(device = %self.identity(), "already off");
            return;
        }
        let previous = self.power_factor();
        if matches!(self.motion, Motion::Ramped { .. }) {
            self.move_to(PowerFactor::STANDBY).await;
        }
        *resume = previous;
        self.environment.remove_influencer(self.identity());
        self.output.set_online(false);
        drop(resume);
        tracing::info!(device = %self.identity(), "powered off");
    }

    /// Walk the working factor to `target`. Callers hold the resume lock.
    async fn move_to(&self, target: PowerFactor) {
        match self.motion {
            Motion::Instant => {
                self.output.set_factor(target);
                self.record_step(target);
            }
            Motion::Ramped { step_delay } => {
                for step in ramp_steps(self.power_factor(), target) {
                    self.output.set_factor(step);
                    self.record_step(step);
                    tokio::time::sleep(step_delay).await;
                }
            }
        }
    }

    fn record_step(&self, factor: PowerFactor) {
        *self.delivered.lock().unwrap_or_else(PoisonError::into_inner) +=
            self.rated_power * factor.fraction();
        tracing::info!(device = %self.identity(), "{} at {factor} power", self.verb);
    }

    #[must_use]
    pub fn status(&self) -> DeviceStatus {
        let mut status = DeviceStatus::new(self.identity().clone(), self.is_online());
        status.power_factor = Some(self.power_factor());
        status.actual_influence = Some(self.output.actual_influence());
        status.delivered_power = Some(self.delivered_power());
        status
    }
}

impl Adjustable for Actuator {
    fn power_factor(&self) -> PowerFactor {
        self.output.factor()
    }

    /// Move to `factor` while online; remember it for the next power-on
    /// while offline.
    async fn set_power_factor(&self, factor: PowerFactor) {
        let mut resume = self.resume.lock().await;
        if self.is_online() {
            self.move_to(factor).await;
        }
        *resume = factor;
    }
}
