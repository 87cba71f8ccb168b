// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! hwmon sysfs discovery and device file access.
//!
//! Drivers are looked up by the contents of `<root>/hwmonN/name`. Every
//! function takes the hwmon root so the same code runs against a fake tree.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default hwmon class directory.
pub const HWMON_ROOT: &str = "/sys/class/hwmon";

/// Highest attribute index probed when listing drivers.
const MAX_CHANNELS: u32 = 16;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Fan related attributes exposed by one driver.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct FanDriver {
    pub path: PathBuf,
    /// Tachometer files, e.g. `fan1_input`
    pub inputs: Vec<String>,
    /// PWM files that have a matching `pwmN_enable`
    pub pwms: Vec<String>,
    /// Target files that have a matching `fanN_enable`
    pub targets: Vec<String>,
}

/// Sensor related attributes exposed by one driver.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SensorDriver {
    pub path: PathBuf,
    /// Temperature files, e.g. `temp1_input`
    pub temps: Vec<String>,
    /// Power files, e.g. `power1_average`
    pub powers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Map every driver name under `root` to its device directory.
///
/// If two devices report the same name the later one in directory order wins.
pub fn list_drivers(root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut drivers = BTreeMap::new();

    let mut dirs: Vec<PathBuf> = fs::read_dir(root)
        .map_err(|e| Error::io(root, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    dirs.sort();

    for dir in dirs {
        match read_trimmed(&dir.join("name")) {
            Ok(name) => {
                drivers.insert(name, dir);
            }
            Err(e) => log::debug!("Skipping {}: {e}", dir.display()),
        }
    }

    Ok(drivers)
}

/// Find the device directory of the driver called `driver_name`.
pub fn find_driver_path(root: &Path, driver_name: &str) -> Result<PathBuf> {
    list_drivers(root)?
        .remove(driver_name)
        .ok_or_else(|| Error::DeviceNotFound(driver_name.to_string()))
}

/// List drivers that expose at least one usable fan attribute.
pub fn list_fan_drivers(root: &Path) -> Result<BTreeMap<String, FanDriver>> {
    let mut fans = BTreeMap::new();

    for (name, path) in list_drivers(root)? {
        let inputs = probe(&path, |n| format!("fan{n}_input"), |_| true);
        let pwms = probe(
            &path,
            |n| format!("pwm{n}"),
            |n| path.join(format!("pwm{n}_enable")).exists(),
        );
        let targets = probe(
            &path,
            |n| format!("fan{n}_target"),
            |n| path.join(format!("fan{n}_enable")).exists(),
        );

        if inputs.is_empty() && pwms.is_empty() && targets.is_empty() {
            continue;
        }
        fans.insert(
            name,
            FanDriver {
                path,
                inputs,
                pwms,
                targets,
            },
        );
    }

    Ok(fans)
}

/// List drivers that expose temperature or power readings.
pub fn list_sensor_drivers(root: &Path) -> Result<BTreeMap<String, SensorDriver>> {
    let mut sensors = BTreeMap::new();

    for (name, path) in list_drivers(root)? {
        let temps = probe(&path, |n| format!("temp{n}_input"), |_| true);
        let powers = probe(&path, |n| format!("power{n}_average"), |_| true);

        if temps.is_empty() && powers.is_empty() {
            continue;
        }
        sensors.insert(
            name,
            SensorDriver {
                path,
                temps,
                powers,
            },
        );
    }

    Ok(sensors)
}

/// Collect the attribute names `attr(n)` that exist under `dir` and pass `usable`.
fn probe(
    dir: &Path,
    attr: impl Fn(u32) -> String,
    usable: impl Fn(u32) -> bool,
) -> Vec<String> {
    (1..=MAX_CHANNELS)
        .filter(|&n| dir.join(attr(n)).exists() && usable(n))
        .map(&attr)
        .collect()
}

// ---------------------------------------------------------------------------
// Device file I/O
// ---------------------------------------------------------------------------

/// Read a device file and strip surrounding whitespace.
pub fn read_trimmed(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| Error::io(path, e))
}

/// Read a device file and parse its contents.
pub fn read_value<T: FromStr>(path: &Path) -> Result<T> {
    let contents = read_trimmed(path)?;
    contents.parse().map_err(|_| Error::Parse {
        path: path.to_path_buf(),
        contents,
    })
}

/// Write a value to a device file as text.
pub fn write_value(path: &Path, value: impl Display) -> Result<()> {
    fs::write(path, value.to_string()).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeHwmon;

    #[test]
    fn test_find_driver_path() {
        let hw = FakeHwmon::new();
        let k10 = hw.device("hwmon0", "k10temp");
        let ec = hw.device("hwmon1", "oxpec");

        assert_eq!(find_driver_path(hw.root(), "k10temp").unwrap(), k10);
        assert_eq!(find_driver_path(hw.root(), "oxpec").unwrap(), ec);
    }

    #[test]
    fn test_find_driver_path_missing() {
        let hw = FakeHwmon::new();
        hw.device("hwmon0", "k10temp");

        let err = find_driver_path(hw.root(), "amdgpu").unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(name) if name == "amdgpu"));
    }

    #[test]
    fn test_list_drivers_skips_nameless_devices() {
        let hw = FakeHwmon::new();
        hw.device("hwmon0", "acpitz");
        std::fs::create_dir(hw.root().join("hwmon1")).unwrap();

        let drivers = list_drivers(hw.root()).unwrap();
        assert_eq!(drivers.keys().collect::<Vec<_>>(), vec!["acpitz"]);
    }

    #[test]
    fn test_list_fan_drivers_filters_unusable_pwms() {
        let hw = FakeHwmon::new();
        let dev = hw.device("hwmon2", "oxpec");
        hw.write(&dev, "fan1_input", "2300");
        hw.write(&dev, "pwm1", "128");
        hw.write(&dev, "pwm1_enable", "0");
        // No pwm2_enable, so pwm2 cannot be taken over
        hw.write(&dev, "pwm2", "128");
        hw.device("hwmon3", "k10temp");

        let fans = list_fan_drivers(hw.root()).unwrap();
        assert_eq!(fans.len(), 1);
        let oxp = &fans["oxpec"];
        assert_eq!(oxp.inputs, vec!["fan1_input"]);
        assert_eq!(oxp.pwms, vec!["pwm1"]);
        assert!(oxp.targets.is_empty());
    }

    #[test]
    fn test_list_sensor_drivers() {
        let hw = FakeHwmon::new();
        let cpu = hw.device("hwmon0", "k10temp");
        hw.write(&cpu, "temp1_input", "45000");
        hw.write(&cpu, "temp3_input", "47000");
        let gpu = hw.device("hwmon1", "amdgpu");
        hw.write(&gpu, "power1_average", "15000000");
        hw.device("hwmon2", "oxpec");

        let sensors = list_sensor_drivers(hw.root()).unwrap();
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors["k10temp"].temps, vec!["temp1_input", "temp3_input"]);
        assert_eq!(sensors["amdgpu"].powers, vec!["power1_average"]);
    }

    #[test]
    fn test_read_value_errors() {
        let hw = FakeHwmon::new();
        let dev = hw.device("hwmon0", "k10temp");
        hw.write(&dev, "temp1_input", "n/a\n");

        let err = read_value::<f64>(&dev.join("temp1_input")).unwrap_err();
        assert!(matches!(err, Error::Parse { contents, .. } if contents == "n/a"));

        let err = read_value::<f64>(&dev.join("temp2_input")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
