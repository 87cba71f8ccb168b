// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! PWM fan control.
//!
//! A [`Fan`] owns the `pwmN`, `pwmN_enable` and `fanN_input` files of one
//! fan. Whether the daemon is in control is never remembered: it is read
//! back from `pwmN_enable` every time it matters.

use crate::curve::{Curve, CurvePoint};
use crate::error::{Error, Result};
use crate::hwmon;
use std::collections::HashMap;
use std::path::PathBuf;

/// `pwmN_enable` value for manual (userspace) control.
const PWM_ENABLE_MANUAL: &str = "1";
/// `pwmN_enable` value that hands the fan back to the kernel.
const PWM_ENABLE_AUTOMATIC: &str = "0";

/// A sensor feeding a fan, with the curve applied to its readings.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorCurve {
    pub sensor: String,
    pub points: Vec<CurvePoint>,
}

/// Resolved fan description, built once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FanSpec {
    /// Unique fan name
    pub name: String,
    /// Absolute path to the `pwmN` file
    pub pwm_path: PathBuf,
    /// Absolute path to the `pwmN_enable` file
    pub enable_path: PathBuf,
    /// Absolute path to the `fanN_input` file (RPM)
    pub rpm_path: PathBuf,
    /// Native PWM value for 0%
    pub min_control_value: u32,
    /// Native PWM value for 100%
    pub max_control_value: u32,
    /// Turn the fan off below `minimum_duty_cycle` instead of clamping
    pub allow_shutoff: bool,
    /// Lowest duty cycle percentage the fan runs at
    pub minimum_duty_cycle: u32,
    /// Sensors driving this fan, in declaration order
    pub sensors: Vec<SensorCurve>,
}

#[derive(Debug)]
pub struct Fan {
    name: String,
    pwm_path: PathBuf,
    enable_path: PathBuf,
    rpm_path: PathBuf,
    min_control_value: u32,
    max_control_value: u32,
    allow_shutoff: bool,
    minimum_duty_cycle: u32,
    curves: Vec<(String, Curve)>,
}

impl Fan {
    pub fn new(spec: FanSpec) -> Result<Self> {
        if spec.min_control_value >= spec.max_control_value {
            return Err(Error::Config(format!(
                "Fan '{}': min_control_value ({}) must be below max_control_value ({})",
                spec.name, spec.min_control_value, spec.max_control_value
            )));
        }
        if spec.minimum_duty_cycle > 100 {
            return Err(Error::Config(format!(
                "Fan '{}': minimum_duty_cycle {} is above 100",
                spec.name, spec.minimum_duty_cycle
            )));
        }

        let curves = spec
            .sensors
            .into_iter()
            .map(|sc| match Curve::new(sc.points) {
                Ok(curve) => Ok((sc.sensor, curve)),
                Err(e) => Err(Error::Config(format!(
                    "Fan '{}', sensor '{}': {e}",
                    spec.name, sc.sensor
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: spec.name,
            pwm_path: spec.pwm_path,
            enable_path: spec.enable_path,
            rpm_path: spec.rpm_path,
            min_control_value: spec.min_control_value,
            max_control_value: spec.max_control_value,
            allow_shutoff: spec.allow_shutoff,
            minimum_duty_cycle: spec.minimum_duty_cycle,
            curves,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sensor names feeding this fan, in declaration order.
    pub fn sensor_names(&self) -> impl Iterator<Item = &str> {
        self.curves.iter().map(|(name, _)| name.as_str())
    }

    // -----------------------------------------------------------------------
    // Control state
    // -----------------------------------------------------------------------

    /// Whether the daemon currently owns this fan, read from the hardware.
    pub fn is_manual(&self) -> Result<bool> {
        Ok(hwmon::read_trimmed(&self.enable_path)? == PWM_ENABLE_MANUAL)
    }

    /// Switch to manual control. Returns whether the switch was confirmed.
    pub fn take_control(&self) -> Result<bool> {
        hwmon::write_value(&self.enable_path, PWM_ENABLE_MANUAL)?;
        self.is_manual()
    }

    /// Hand the fan back to the kernel. Returns whether the switch was confirmed.
    pub fn release_control(&self) -> Result<bool> {
        hwmon::write_value(&self.enable_path, PWM_ENABLE_AUTOMATIC)?;
        Ok(!self.is_manual()?)
    }

    // -----------------------------------------------------------------------
    // Duty cycle
    // -----------------------------------------------------------------------

    /// Write a duty cycle percentage and return the native value written.
    ///
    /// Requests at or below `minimum_duty_cycle` are raised to it, or turn
    /// the fan off when `allow_shutoff` is set. Fails with
    /// [`Error::ControlLost`] rather than writing while the kernel owns the fan.
    pub fn set_duty_cycle(&self, requested: i32) -> Result<u32> {
        let requested = u32::try_from(requested)
            .ok()
            .filter(|&d| d <= 100)
            .ok_or(Error::Range(requested))?;

        let duty = self.apply_policy(requested);
        let range = u64::from(self.max_control_value - self.min_control_value);
        // At most `range`, so narrowing back is lossless
        let native = (u64::from(duty) * range / 100) as u32;

        if !self.is_manual()? {
            return Err(Error::ControlLost(self.name.clone()));
        }

        hwmon::write_value(&self.pwm_path, native)?;
        log::debug!("Fan {}: duty {requested}% -> {duty}% (pwm {native})", self.name);
        Ok(native)
    }

    fn apply_policy(&self, requested: u32) -> u32 {
        if requested > self.minimum_duty_cycle {
            requested
        } else if self.allow_shutoff {
            0
        } else {
            self.minimum_duty_cycle
        }
    }

    /// Read the tachometer. The value is passed through unconverted.
    pub fn read_rpm(&self) -> Result<u32> {
        hwmon::read_value(&self.rpm_path)
    }

    /// Evaluate every sensor curve of this fan against this tick's readings
    /// and return the most demanding duty cycle.
    ///
    /// Sensors without a reading are skipped with a warning. Returns `None`
    /// when no sensor produced a value.
    pub fn desired_duty(&self, readings: &HashMap<String, f64>) -> Option<f64> {
        let mut desired: Option<f64> = None;

        for (sensor, curve) in &self.curves {
            let Some(&value) = readings.get(sensor) else {
                log::warn!("Sensor '{sensor}' has no value for fan '{}'", self.name);
                continue;
            };
            let duty = curve.evaluate(value);
            log::debug!("Fan {}: sensor {sensor} = {value} -> {duty:.1}%", self.name);
            desired = Some(desired.map_or(duty, |d| d.max(duty)));
        }

        desired
    }
}
