//! Controller — device set and regulation loop.
//!
//! Every tick the controller reads each preferred condition from the online
//! measurers, compares it with the preference, and toggles influencers with a
//! two-threshold dead-band:
//!
//! | `|delta|`                 | action                                          |
//! |---------------------------|-------------------------------------------------|
//! | `< accuracy`              | power off online influencers pushing towards `sign(delta)` |
//! | `accuracy ..= 1.2 × accuracy` | nothing                                     |
//! | `> 1.2 × accuracy`        | power off opposing influencers, then power on matching ones |
//!
//! Devices are selected by capability flag, target condition, and influence
//! sign only.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};

use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::{
    Capability, DeviceIdentity, DeviceStatus, InfluenceSign, PowerFactor,
};
use climatehub_domain::error::{ClimateError, DeviceError, ValidationError};
use climatehub_domain::event::{Event, EventType};

use crate::ports::{ClimateDevice, EventPublisher};
use crate::shutdown::{ShutdownSignal, spawn_periodic};

/// Drive starts only once `|delta|` exceeds this multiple of the accuracy.
const DRIVE_THRESHOLD: f64 = 1.2;

/// Timing and regulation parameters of a [`Controller`].
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub tick_interval: Duration,
    /// Broadcast a full status every this many ticks; `0` disables it.
    pub status_every_ticks: u64,
    /// Period of each measurer's reporting loop.
    pub report_interval: Duration,
    pub accuracy: f64,
    pub preferences: BTreeMap<ConditionKind, f64>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            status_every_ticks: 5,
            report_interval: Duration::from_secs(5),
            accuracy: 0.5,
            preferences: BTreeMap::from([
                (ConditionKind::Temperature, 25.0),
                (ConditionKind::Humidity, 65.0),
                (ConditionKind::Illuminance, 550.0),
            ]),
        }
    }
}

/// What the dead-band logic decided for one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Inside the band: power off influencers with this sign.
    Cancel(Option<InfluenceSign>),
    /// Between the two thresholds.
    Hold,
    /// Outside the band: push the value in this direction.
    Drive(InfluenceSign),
}

impl Decision {
    #[must_use]
    pub fn from_delta(delta: f64, accuracy: f64) -> Self {
        let magnitude = delta.abs();
        if magnitude < accuracy {
            Self::Cancel(InfluenceSign::of(delta))
        } else if magnitude > DRIVE_THRESHOLD * accuracy {
            InfluenceSign::of(delta).map_or(Self::Hold, Self::Drive)
        } else {
            Self::Hold
        }
    }
}

/// Outcome of regulating one condition for one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Regulation {
    pub kind: ConditionKind,
    pub current: f64,
    pub delta: f64,
    pub decision: Decision,
    /// Devices powered off this tick.
    pub released: Vec<DeviceIdentity>,
    /// Devices powered on this tick.
    pub engaged: Vec<DeviceIdentity>,
}

/// Owns the registered devices and regulates the room through them.
pub struct Controller<D, P> {
    name: String,
    devices: RwLock<Vec<Arc<D>>>,
    preferences: Mutex<BTreeMap<ConditionKind, f64>>,
    accuracy: Mutex<f64>,
    settings: ControllerSettings,
    publisher: P,
    shutdown: ShutdownSignal,
    reporters: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the whole of a tick.
    ticking: tokio::sync::Mutex<()>,
    halted: AtomicBool,
}

impl<D, P> Controller<D, P>
where
    D: ClimateDevice,
    P: EventPublisher + Clone + Send + Sync + 'static,
{
    /// Create a controller with no devices.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAccuracy`] for a non-positive
    /// accuracy and [`ValidationError::NonFiniteValue`] for a non-finite
    /// preference.
    pub fn new(
        name: impl Into<String>,
        settings: ControllerSettings,
        publisher: P,
        shutdown: ShutdownSignal,
    ) -> Result<Self, ValidationError> {
        validate_accuracy(settings.accuracy)?;
        if settings.preferences.values().any(|value| !value.is_finite()) {
            return Err(ValidationError::NonFiniteValue);
        }
        Ok(Self {
            name: name.into(),
            devices: RwLock::new(Vec::new()),
            preferences: Mutex::new(settings.preferences.clone()),
            accuracy: Mutex::new(settings.accuracy),
            settings,
            publisher,
            shutdown,
            reporters: Mutex::new(Vec::new()),
            ticking: tokio::sync::Mutex::new(()),
            halted: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Self-test `device` and add it to the device set.
    ///
    /// The self-test powers the device on, checks it reports online, and
    /// powers it off again. Measurers are then powered back on and get a
    /// reporting loop.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::AlreadyRegistered`] for a device whose identity
    /// is already in the set and [`DeviceError::SelfTestFailed`] when the
    /// device does not come online.
    pub async fn register_device(&self, device: D) -> Result<Arc<D>, ClimateError> {
        let identity = device.identity().clone();
        if self.is_registered(&identity) {
            return Err(already_registered(&identity).into());
        }

        tracing::info!(device = %identity, "testing device");
        device.power_on().await;
        let online = device.is_online();
        device.power_off().await;
        if !online {
            tracing::warn!(device = %identity, "device failed its self-test");
            return Err(DeviceError::SelfTestFailed {
                device: identity.to_string(),
            }
            .into());
        }

        let device = Arc::new(device);
        {
            let mut devices = self.devices.write().unwrap_or_else(PoisonError::into_inner);
            if devices.iter().any(|existing| existing.identity() == &identity) {
                return Err(already_registered(&identity).into());
            }
            devices.push(Arc::clone(&device));
        }

        if device.capabilities().contains(Capability::Measurer) {
            device.power_on().await;
            self.spawn_reporter(Arc::clone(&device));
        }

        tracing::info!(device = %identity, controller = %self.name, "device successfully registered");
        self.publisher
            .publish(Event::new(
                EventType::DeviceRegistered,
                Some(identity),
                serde_json::Value::Null,
            ))
            .await;
        Ok(device)
    }

    /// Snapshot of the registered devices, in registration order.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<D>> {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_registered(&self, identity: &DeviceIdentity) -> bool {
        self.devices
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|device| device.identity() == identity)
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        *lock(&self.accuracy)
    }

    /// Change the dead-band width.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAccuracy`] unless `accuracy` is
    /// positive and finite.
    pub async fn set_accuracy(&self, accuracy: f64) -> Result<(), ValidationError> {
        validate_accuracy(accuracy)?;
        *lock(&self.accuracy) = accuracy;
        tracing::info!(accuracy, "accuracy changed");
        self.publisher
            .publish(Event::new(
                EventType::AccuracyChanged,
                None,
                serde_json::json!(accuracy),
            ))
            .await;
        Ok(())
    }

    #[must_use]
    pub fn preferences(&self) -> BTreeMap<ConditionKind, f64> {
        lock(&self.preferences).clone()
    }

    /// Set the target value for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFiniteValue`] for NaN or infinite input.
    pub async fn set_preference(&self, kind: ConditionKind, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteValue);
        }
        lock(&self.preferences).insert(kind, value);
        tracing::info!(kind = %kind, value, "preference changed");
        self.publisher
            .publish(Event::new(
                EventType::PreferenceChanged,
                None,
                serde_json::json!({ "condition": kind, "value": value }),
            ))
            .await;
        Ok(())
    }

    /// Average over every online measurer of `kind`, `None` if there is none.
    #[must_use]
    pub fn current_value(&self, kind: ConditionKind) -> Option<f64> {
        let readings: Vec<f64> = self
            .devices()
            .iter()
            .filter(|device| {
                device.capabilities().contains(Capability::Measurer) && device.is_online()
            })
            .filter_map(|device| device.as_measurer())
            .filter(|measurer| measurer.measured_kind() == kind)
            .filter_map(|measurer| measurer.reading())
            .map(|reading| reading.value())
            .collect();

        if readings.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let count = readings.len() as f64;
        Some(readings.iter().sum::<f64>() / count)
    }

    /// Run one regulation step for `kind` towards `preference`.
    ///
    /// Returns `None` when no measurer for `kind` is online.
    pub async fn regulate(&self, kind: ConditionKind, preference: f64) -> Option<Regulation> {
        let Some(current) = self.current_value(kind) else {
            tracing::debug!(kind = %kind, "no online measurer, skipping");
            return None;
        };
        let delta = preference - current;
        let decision = Decision::from_delta(delta, self.accuracy());

        let (released, engaged) = match decision {
            Decision::Hold | Decision::Cancel(None) => (Vec::new(), Vec::new()),
            Decision::Cancel(Some(sign)) => {
                let released = self.influencers(kind, sign, true);
                on_each(&released, |device| async move { device.power_off().await }).await;
                (identities(&released), Vec::new())
            }
            Decision::Drive(sign) => {
                let released = self.influencers(kind, sign.opposite(), true);
                on_each(&released, |device| async move { device.power_off().await }).await;
                let engaged = self.influencers(kind, sign, false);
                on_each(&engaged, |device| async move { device.power_on().await }).await;
                (identities(&released), identities(&engaged))
            }
        };

        tracing::debug!(
            kind = %kind,
            current,
            delta,
            decision = ?decision,
            released = released.len(),
            engaged = engaged.len(),
            "regulated"
        );
        Some(Regulation {
            kind,
            current,
            delta,
            decision,
            released,
            engaged,
        })
    }

    /// Influencers of `kind` pushing in `sign` whose online state equals `online`.
    fn influencers(&self, kind: ConditionKind, sign: InfluenceSign, online: bool) -> Vec<Arc<D>> {
        self.devices()
            .into_iter()
            .filter(|device| {
                let capabilities = device.capabilities();
                capabilities.contains(Capability::Switchable)
                    && capabilities.contains(Capability::Influencer)
                    && device.is_online() == online
            })
            .filter(|device| {
                device.as_influencer().is_some_and(|influencer| {
                    influencer.target() == kind && influencer.sign() == Some(sign)
                })
            })
            .collect()
    }

    /// One controller tick: periodic status, then regulation of every preference.
    ///
    /// Does nothing once the controller is [halted](Self::halt).
    pub async fn tick(&self, count: u64) {
        let _ticking = self.ticking.lock().await;
        if self.is_halted() {
            return;
        }
        let every = self.settings.status_every_ticks;
        if every > 0 && count % every == 0 {
            self.broadcast_status().await;
        }
        for (kind, preference) in self.preferences() {
            self.regulate(kind, preference).await;
        }
    }

    /// Run [`tick`](Self::tick) every tick interval until shutdown.
    pub fn run(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        spawn_periodic(
            "controller",
            self.settings.tick_interval,
            self.shutdown.clone(),
            move |count| {
                let controller = Arc::clone(&controller);
                async move { controller.tick(count).await }
            },
        )
    }

    /// Stop regulating. Waits for a tick in progress to finish; every later
    /// tick is a no-op.
    pub async fn halt(&self) {
        let _ticking = self.ticking.lock().await;
        self.halted.store(true, Ordering::SeqCst);
        tracing::info!(controller = %self.name, "regulation halted");
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn status(&self) -> Vec<DeviceStatus> {
        self.devices().iter().map(|device| device.status()).collect()
    }

    /// Publish a [`EventType::StatusReported`] event carrying every device status.
    pub async fn broadcast_status(&self) {
        let status = self.status();
        tracing::debug!(devices = status.len(), "broadcasting status");
        let data = serde_json::to_value(&status).unwrap_or_default();
        self.publisher
            .publish(Event::new(EventType::StatusReported, None, data))
            .await;
    }

    pub async fn power_on_all(&self) {
        on_each(&self.devices(), |device| async move { device.power_on().await }).await;
    }

    pub async fn power_off_all(&self) {
        on_each(&self.devices(), |device| async move { device.power_off().await }).await;
        tracing::info!(controller = %self.name, "all devices powered off");
    }

    /// Request `factor` from every adjustable influencer, ramping in parallel.
    ///
    /// Returns how many devices accepted the request.
    pub async fn set_power_factor_all(&self, factor: PowerFactor) -> usize {
        let targets: Vec<_> = self
            .devices()
            .into_iter()
            .filter(|device| {
                let capabilities = device.capabilities();
                capabilities.contains(Capability::Adjustable)
                    && capabilities.contains(Capability::Influencer)
            })
            .collect();

        self.publisher
            .publish(Event::new(
                EventType::PowerFactorRequested,
                None,
                serde_json::json!(factor.percent()),
            ))
            .await;

        let mut tasks = JoinSet::new();
        for device in targets {
            tasks.spawn(async move {
                let result = device.adjust(factor).await;
                (device.identity().clone(), result)
            });
        }

        let mut accepted = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => accepted += 1,
                Ok((identity, Err(error))) => {
                    tracing::warn!(device = %identity, %error, "power factor rejected");
                }
                Err(error) => tracing::warn!(%error, "power factor task failed"),
            }
        }
        accepted
    }

    /// Wait for every measurer reporting loop to observe shutdown.
    pub async fn join_reporters(&self) {
        let handles = std::mem::take(&mut *lock(&self.reporters));
        for handle in handles {
            if let Err(error) = handle.await {
                tracing::warn!(%error, "measurer reporter failed");
            }
        }
    }

    fn spawn_reporter(&self, device: Arc<D>) {
        let publisher = self.publisher.clone();
        let handle = spawn_periodic(
            "measurer",
            self.settings.report_interval,
            self.shutdown.clone(),
            move |_| {
                let device = Arc::clone(&device);
                let publisher = publisher.clone();
                async move {
                    if !device.is_online() {
                        return;
                    }
                    let Some(reading) = device.as_measurer().and_then(|measurer| measurer.reading())
                    else {
                        return;
                    };
                    tracing::info!(device = %device.identity(), "{reading}");
                    let data = serde_json::to_value(reading).unwrap_or_default();
                    publisher
                        .publish(Event::new(
                            EventType::MeasurementReported,
                            Some(device.identity().clone()),
                            data,
                        ))
                        .await;
                }
            },
        );
        lock(&self.reporters).push(handle);
    }
}

/// Run `action` on every device concurrently and wait for all of them.
async fn on_each<D, F, Fut>(devices: &[Arc<D>], action: F)
where
    D: ClimateDevice,
    F: Fn(Arc<D>) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut tasks = JoinSet::new();
    for device in devices {
        tasks.spawn(action(Arc::clone(device)));
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(error) = joined {
            tracing::warn!(%error, "device task failed");
        }
    }
}

fn identities<D: ClimateDevice>(devices: &[Arc<D>]) -> Vec<DeviceIdentity> {
    devices.iter().map(|device| device.identity().clone()).collect()
}

fn already_registered(identity: &DeviceIdentity) -> DeviceError {
    DeviceError::AlreadyRegistered {
        device: identity.to_string(),
    }
}

fn validate_accuracy(accuracy: f64) -> Result<(), ValidationError> {
    if accuracy.is_finite() && accuracy > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidAccuracy(accuracy))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
