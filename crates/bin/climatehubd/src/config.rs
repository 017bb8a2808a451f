//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `climatehub.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use climatehub_app::controller::ControllerSettings;
use climatehub_app::environment::{Room, RoomBuilder};
use climatehub_domain::condition::ConditionKind;
use climatehub_domain::device::DeviceKind;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Room bounds and update period.
    pub environment: EnvironmentConfig,
    /// Regulation loop settings.
    pub controller: ControllerConfig,
    /// Devices to build and register, in order.
    pub devices: Vec<DeviceConfig>,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Room configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub update_interval_ms: u64,
    /// Random whole number in (-35, 35) when absent.
    pub outside_temperature: Option<f64>,
    pub temperature: BoundsConfig,
    pub humidity: BoundsConfig,
    pub illuminance: BoundsConfig,
}

/// Bounds of one condition.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BoundsConfig {
    pub min: f64,
    pub max: f64,
    /// Starting value, the lower bound when absent.
    #[serde(default)]
    pub initial: Option<f64>,
}

/// Controller configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub name: String,
    pub tick_interval_ms: u64,
    pub status_every_ticks: u64,
    /// Period of each measurer's report.
    pub report_interval_ms: u64,
    /// Dead-band width shared by every condition.
    pub accuracy: f64,
    pub preferences: PreferencesConfig,
}

/// Initial target per condition.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PreferencesConfig {
    pub temperature: f64,
    pub humidity: f64,
    pub illuminance: f64,
}

/// One device of the roster.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub kind: DeviceKind,
    pub description: String,
    #[serde(default)]
    pub rated_power: f64,
    /// Influence at full power; ignored for sensors.
    #[serde(default)]
    pub efficiency: f64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `climatehub.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("climatehub.toml")?;
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("CLIMATEHUB_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("CLIMATEHUB_OUTSIDE_TEMPERATURE") {
            match val.parse() {
                Ok(temperature) => self.environment.outside_temperature = Some(temperature),
                Err(_) => tracing::warn!(value = %val, "ignoring invalid outside temperature"),
            }
        }
        if let Some(val) = var("CLIMATEHUB_ACCURACY") {
            match val.parse() {
                Ok(accuracy) => self.controller.accuracy = accuracy,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid accuracy"),
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Validation(message));

        if self.environment.update_interval_ms == 0
            || self.controller.tick_interval_ms == 0
            || self.controller.report_interval_ms == 0
        {
            return invalid("intervals must be non-zero".to_string());
        }
        if !(self.controller.accuracy.is_finite() && self.controller.accuracy > 0.0) {
            return invalid(format!(
                "accuracy must be positive, got {}",
                self.controller.accuracy
            ));
        }
        if self
            .environment
            .outside_temperature
            .is_some_and(|temperature| !temperature.is_finite())
        {
            return invalid("outside temperature must be finite".to_string());
        }
        for (kind, bounds) in self.environment.bounds() {
            if !(bounds.min.is_finite() && bounds.max.is_finite()) || bounds.min >= bounds.max {
                return invalid(format!("{kind} bounds are inverted"));
            }
            if let Some(initial) = bounds.initial
                && !(bounds.min..=bounds.max).contains(&initial)
            {
                return invalid(format!("initial {kind} {initial} is out of bounds"));
            }
        }
        if let Some(device) = self
            .devices
            .iter()
            .find(|device| device.description.trim().is_empty())
        {
            return invalid(format!("a {} has an empty description", device.kind));
        }
        Ok(())
    }

    /// Builder for the room described by `[environment]`.
    #[must_use]
    pub fn room_builder(&self) -> RoomBuilder {
        let builder = self.environment.bounds().into_iter().fold(
            Room::builder(),
            |builder, (kind, bounds)| builder.condition(kind, bounds.min, bounds.max, bounds.initial),
        );
        match self.environment.outside_temperature {
            Some(temperature) => builder.outside_temperature(temperature),
            None => builder,
        }
    }

    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.environment.update_interval_ms)
    }

    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        let preferences = &self.controller.preferences;
        ControllerSettings {
            tick_interval: Duration::from_millis(self.controller.tick_interval_ms),
            status_every_ticks: self.controller.status_every_ticks,
            report_interval: Duration::from_millis(self.controller.report_interval_ms),
            accuracy: self.controller.accuracy,
            preferences: BTreeMap::from([
                (ConditionKind::Temperature, preferences.temperature),
                (ConditionKind::Humidity, preferences.humidity),
                (ConditionKind::Illuminance, preferences.illuminance),
            ]),
        }
    }
}

impl EnvironmentConfig {
    fn bounds(&self) -> [(ConditionKind, BoundsConfig); 3] {
        [
            (ConditionKind::Temperature, self.temperature),
            (ConditionKind::Humidity, self.humidity),
            (ConditionKind::Illuminance, self.illuminance),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            controller: ControllerConfig::default(),
            devices: default_roster(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: 200,
            outside_temperature: None,
            temperature: BoundsConfig::new(5.0, 45.0),
            humidity: BoundsConfig::new(40.0, 86.0),
            illuminance: BoundsConfig::new(0.0, 1000.0),
        }
    }
}

impl BoundsConfig {
    fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            initial: None,
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name: "SmartHouseController".to_string(),
            tick_interval_ms: 1000,
            status_every_ticks: 5,
            report_interval_ms: 5000,
            accuracy: 0.5,
            preferences: PreferencesConfig::default(),
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 65.0,
            illuminance: 550.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "climatehubd=info,climatehub_app=info,climatehub_adapter_virtual=info"
                .to_string(),
        }
    }
}

fn default_roster() -> Vec<DeviceConfig> {
    let device = |kind, description: &str, rated_power, efficiency| DeviceConfig {
        kind,
        description: description.to_string(),
        rated_power,
        efficiency,
    };
    vec![
        device(DeviceKind::Thermometer, "ThermoWatch", 0.0, 0.0),
        device(DeviceKind::HumiditySensor, "HumidityMonitor", 0.0, 0.0),
        device(DeviceKind::LightSensor, "BrightnessControl", 0.0, 0.0),
        device(DeviceKind::Heater, "SunHeat", 2000.0, 3.0),
        device(DeviceKind::Conditioner, "CoolMaster", 1500.0, -2.0),
        device(DeviceKind::Illumination, "MagicBright", 100.0, 1000.0),
        device(DeviceKind::Humidifier, "OceanMoisture", 45.0, 10.0),
    ]
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
