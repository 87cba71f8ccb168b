// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Configuration file handling.
//!
//! Fans, sensors and their curves are declared in TOML.
//! Default path: `/etc/hwfan/config.toml`

use crate::curve::CurvePoint;
use crate::error::{Error, Result};
use crate::fan::{FanSpec, SensorCurve};
use crate::hwmon;
use crate::sensor::SensorSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hwfan/config.toml";

/// Default poll interval in seconds.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Default sensor divisor (hwmon reports millidegrees).
pub const DEFAULT_DIVISOR: f64 = 1000.0;

/// Default native PWM value for 100%.
pub const DEFAULT_MAX_CONTROL_VALUE: u32 = 255;

/// Default lowest duty cycle percentage.
pub const DEFAULT_MINIMUM_DUTY_CYCLE: u32 = 30;

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Poll interval for the control loop, in seconds.
    #[serde(default = "default_interval")]
    pub interval: f64,

    /// Sensor inputs, in polling order.
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,

    /// Controlled fans, in polling order.
    #[serde(default)]
    pub fans: Vec<FanConfig>,
}

/// A sensor input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Unique name, referenced from `fans.sensors`
    pub name: String,
    /// hwmon driver name, as found in `/sys/class/hwmon/*/name`
    pub driver_name: String,
    /// Input file relative to the driver directory, e.g. "temp1_input"
    pub input: String,
    #[serde(default = "default_divisor")]
    pub divisor: f64,
    #[serde(default)]
    pub offset: f64,
}

/// A PWM fan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanConfig {
    /// Unique name
    pub name: String,
    /// hwmon driver name, as found in `/sys/class/hwmon/*/name`
    pub driver_name: String,
    /// PWM file, e.g. "pwm1". The enable file is `<handle>_enable`.
    pub handle: String,
    /// Tachometer file, e.g. "fan1_input"
    pub fan_input: String,
    #[serde(default)]
    pub min_control_value: u32,
    #[serde(default = "default_max_control_value")]
    pub max_control_value: u32,
    #[serde(default)]
    pub allow_shutoff: bool,
    #[serde(default = "default_minimum_duty_cycle")]
    pub minimum_duty_cycle: u32,
    /// Sensors driving this fan. The most demanding curve wins.
    #[serde(default)]
    pub sensors: Vec<FanSensorConfig>,
}

/// A sensor feeding a fan, with its curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanSensorConfig {
    pub name: String,
    pub curve: CurveConfig,
}

/// Curve control points, either as a list or in the older low/mid/high form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CurveConfig {
    Points(Vec<CurvePoint>),
    LowMidHigh {
        low: CurvePoint,
        mid: CurvePoint,
        high: CurvePoint,
    },
}

impl CurveConfig {
    pub fn points(&self) -> Vec<CurvePoint> {
        match self {
            Self::Points(points) => points.clone(),
            Self::LowMidHigh { low, mid, high } => vec![*low, *mid, *high],
        }
    }
}

impl Config {
    /// Check file-level consistency. Per-entity checks happen when the
    /// fans and sensors are built.
    pub fn validate(&self) -> Result<()> {
        self.poll_interval()?;

        let mut sensor_names = HashSet::new();
        for sensor in &self.sensors {
            if !sensor_names.insert(sensor.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate sensor name '{}'",
                    sensor.name
                )));
            }
        }

        let mut fan_names = HashSet::new();
        for fan in &self.fans {
            if !fan_names.insert(fan.name.as_str()) {
                return Err(Error::Config(format!("Duplicate fan name '{}'", fan.name)));
            }
            if fan.sensors.is_empty() {
                log::warn!("Fan '{}' has no sensors and will never be adjusted", fan.name);
            }
            for assoc in &fan.sensors {
                if !sensor_names.contains(assoc.name.as_str()) {
                    log::warn!(
                        "Fan '{}' references undeclared sensor '{}'",
                        fan.name,
                        assoc.name
                    );
                }
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.interval)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                Error::Config(format!(
                    "Interval must be a positive number of seconds, got {}",
                    self.interval
                ))
            })
    }

    /// Resolve driver names under `hwmon_root` into device file paths.
    pub fn resolve(&self, hwmon_root: &Path) -> Result<(Vec<FanSpec>, Vec<SensorSpec>)> {
        let drivers = hwmon::list_drivers(hwmon_root)?;
        let driver_dir = |name: &str| {
            drivers
                .get(name)
                .cloned()
                .ok_or_else(|| Error::DeviceNotFound(name.to_string()))
        };

        let sensors = self
            .sensors
            .iter()
            .map(|s| -> Result<SensorSpec> {
                Ok(SensorSpec {
                    name: s.name.clone(),
                    path: driver_dir(&s.driver_name)?.join(&s.input),
                    divisor: s.divisor,
                    offset: s.offset,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let fans = self
            .fans
            .iter()
            .map(|f| -> Result<FanSpec> {
                let dir = driver_dir(&f.driver_name)?;
                Ok(FanSpec {
                    name: f.name.clone(),
                    pwm_path: dir.join(&f.handle),
                    enable_path: dir.join(format!("{}_enable", f.handle)),
                    rpm_path: dir.join(&f.fan_input),
                    min_control_value: f.min_control_value,
                    max_control_value: f.max_control_value,
                    allow_shutoff: f.allow_shutoff,
                    minimum_duty_cycle: f.minimum_duty_cycle,
                    sensors: f
                        .sensors
                        .iter()
                        .map(|assoc| SensorCurve {
                            sensor: assoc.name.clone(),
                            points: assoc.curve.points(),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((fans, sensors))
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Parse and validate a TOML configuration.
pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents)
        .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let config = parse_config(&contents)?;

    log::info!(
        "Loaded config from {}: {} fan(s), {} sensor(s)",
        path.display(),
        config.fans.len(),
        config.sensors.len()
    );
    Ok(config)
}

/// Resolve the config file path from CLI arg or default.
pub fn resolve_config_path(cli_path: Option<&str>) -> PathBuf {
    cli_path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn default_interval() -> f64 {
    DEFAULT_INTERVAL_SECS
}

fn default_divisor() -> f64 {
    DEFAULT_DIVISOR
}

fn default_max_control_value() -> u32 {
    DEFAULT_MAX_CONTROL_VALUE
}

fn default_minimum_duty_cycle() -> u32 {
    DEFAULT_MINIMUM_DUTY_CYCLE
}
