// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Sensor inputs (temperature, power, ...) read from hwmon files.

use crate::error::{Error, Result};
use crate::hwmon;
use std::path::PathBuf;

/// Resolved sensor description, built once from configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSpec {
    /// Unique sensor name, referenced by fan curves
    pub name: String,
    /// Absolute path to the input file
    pub path: PathBuf,
    /// Raw value is divided by this (1000 for millidegrees)
    pub divisor: f64,
    /// Added after dividing
    pub offset: f64,
}

#[derive(Debug)]
pub struct Sensor {
    spec: SensorSpec,
}

impl Sensor {
    pub fn new(spec: SensorSpec) -> Result<Self> {
        if spec.divisor == 0.0 || !spec.divisor.is_finite() {
            return Err(Error::Config(format!(
                "Sensor '{}' has invalid divisor {}",
                spec.name, spec.divisor
            )));
        }
        if !spec.offset.is_finite() {
            return Err(Error::Config(format!(
                "Sensor '{}' has invalid offset {}",
                spec.name, spec.offset
            )));
        }
        Ok(Self { spec })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Read the hardware and return `raw / divisor + offset`.
    ///
    /// Contents that do not scale to a finite number ("nan", "inf", ...)
    /// are a parse error.
    pub fn read(&self) -> Result<f64> {
        let contents = hwmon::read_trimmed(&self.spec.path)?;
        let value = contents
            .parse::<f64>()
            .map(|raw| raw / self.spec.divisor + self.spec.offset)
            .ok()
            .filter(|value| value.is_finite());
        value.ok_or_else(|| Error::Parse {
            path: self.spec.path.clone(),
            contents,
        })
    }
}
