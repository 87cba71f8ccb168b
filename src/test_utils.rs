// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Fake hwmon trees for unit tests.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory laid out like `/sys/class/hwmon`.
pub struct FakeHwmon {
    dir: TempDir,
}

impl FakeHwmon {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp hwmon root"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create `<root>/<dir>` reporting `name` and return its path.
    pub fn device(&self, dir: &str, name: &str) -> PathBuf {
        let path = self.root().join(dir);
        fs::create_dir_all(&path).expect("create device dir");
        fs::write(path.join("name"), format!("{name}\n")).expect("write name");
        path
    }

    pub fn write(&self, device: &Path, attr: &str, contents: &str) {
        fs::write(device.join(attr), contents).expect("write attribute");
    }

    pub fn read(&self, device: &Path, attr: &str) -> String {
        fs::read_to_string(device.join(attr)).expect("read attribute")
    }

    /// A device with one controllable fan (`pwm1`) in automatic mode.
    pub fn fan_device(&self, dir: &str, name: &str) -> PathBuf {
        let dev = self.device(dir, name);
        self.write(&dev, "pwm1", "0");
        self.write(&dev, "pwm1_enable", "0\n");
        self.write(&dev, "fan1_input", "1800\n");
        dev
    }
}
