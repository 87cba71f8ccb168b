// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! Userspace fan curve daemon for Linux hwmon devices.
//!
//! Sensors are polled on a fixed interval, each fan's curves are evaluated
//! against the readings and the most demanding duty cycle is written to the
//! fan's PWM file. Fans are handed back to the kernel when the daemon stops.

pub mod config;
pub mod controller;
pub mod curve;
pub mod error;
pub mod fan;
pub mod hwmon;
pub mod sensor;

#[cfg(test)]
mod test_utils;

pub use controller::{Controller, Shutdown};
pub use error::{Error, Result};
