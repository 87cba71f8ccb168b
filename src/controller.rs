// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! The polling control loop.
//!
//! [`Controller::run`] takes over every fan, runs the curve engine on a
//! single worker task until [`Shutdown::cancel`] is called or a tick fails,
//! then hands every fan back to the kernel before returning.

use crate::error::{Error, Result};
use crate::fan::Fan;
use crate::sensor::Sensor;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cancellation signal for the control loop.
///
/// Cloning shares the same signal. Cancelling is idempotent and sticks, so
/// a cancel issued before the loop starts is still observed.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // Cannot fail: the sender is owned by `self`
        let _ = rx.wait_for(|&cancelled| cancelled).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Outcome of a takeover or release attempt for one fan.
pub type SweepOutcome = (String, Result<bool>);

pub struct Controller {
    inner: Arc<Inner>,
}

struct Inner {
    fans: Vec<Fan>,
    sensors: Vec<Sensor>,
    interval: Duration,
    monitor: bool,
}

impl Controller {
    /// Build a controller. In `monitor` mode nothing is ever written.
    pub fn new(fans: Vec<Fan>, sensors: Vec<Sensor>, interval: Duration, monitor: bool) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::Config("Poll interval must be above zero".to_string()));
        }
        Ok(Self {
            inner: Arc::new(Inner {
                fans,
                sensors,
                interval,
                monitor,
            }),
        })
    }

    pub fn fans(&self) -> &[Fan] {
        &self.inner.fans
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.inner.sensors
    }

    pub fn is_monitor(&self) -> bool {
        self.inner.monitor
    }

    /// Run until `shutdown` is cancelled or a tick fails.
    ///
    /// Outside monitor mode every fan is released before this returns,
    /// whichever way the loop ended. A tick error is returned after that.
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let controlled: Vec<bool> = if self.inner.monitor {
            log::info!("Monitor mode: fans are left under automatic control");
            vec![false; self.inner.fans.len()]
        } else {
            log::info!("Taking over {} fan(s)", self.inner.fans.len());
            self.take_control_all()
                .iter()
                .map(|(_, outcome)| matches!(outcome, Ok(true)))
                .collect()
        };

        log::info!(
            "Starting control loop with interval {}ms",
            self.inner.interval.as_millis()
        );
        let inner = self.inner.clone();
        let worker_shutdown = shutdown.clone();
        let worker =
            tokio::spawn(async move { inner.poll_loop(&controlled, &worker_shutdown).await });

        let mut panic = None;
        let result = match worker.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => {
                log::error!("Control loop panicked");
                panic = Some(e.into_panic());
                Ok(())
            }
            Err(e) => {
                log::error!("Control loop task was aborted: {e}");
                Ok(())
            }
        };

        if let Err(e) = &result {
            log::error!("Control loop stopped: {e}");
        }

        if !self.inner.monitor {
            log::info!("Restoring fans to automatic control");
            self.release_control_all();
        }

        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        result
    }

    /// Try to take over every fan. One failure does not stop the others.
    pub fn take_control_all(&self) -> Vec<SweepOutcome> {
        self.sweep(Fan::take_control, "take control")
    }

    /// Try to release every fan. One failure does not stop the others.
    pub fn release_control_all(&self) -> Vec<SweepOutcome> {
        self.sweep(Fan::release_control, "release control")
    }

    fn sweep(&self, transition: fn(&Fan) -> Result<bool>, action: &str) -> Vec<SweepOutcome> {
        self.inner
            .fans
            .iter()
            .map(|fan| {
                let outcome = transition(fan);
                match &outcome {
                    Ok(true) => log::info!("Fan {}: {action} confirmed", fan.name()),
                    Ok(false) => log::warn!("Fan {}: could not {action} (not confirmed)", fan.name()),
                    Err(e) => log::error!("Fan {}: could not {action}: {e}", fan.name()),
                }
                (fan.name().to_string(), outcome)
            })
            .collect()
    }
}

impl Inner {
    async fn poll_loop(&self, controlled: &[bool], shutdown: &Shutdown) -> Result<()> {
        while !shutdown.is_cancelled() {
            self.tick(controlled)?;

            tokio::select! {
                _ = time::sleep(self.interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }
        log::info!("Control loop cancelled");
        Ok(())
    }

    /// Read every sensor once.
    fn read_sensors(&self) -> Result<HashMap<String, f64>> {
        let mut readings = HashMap::with_capacity(self.sensors.len());
        for sensor in &self.sensors {
            let value = sensor.read()?;
            log::debug!("Sensor {}: {value}", sensor.name());
            readings.insert(sensor.name().to_string(), value);
        }
        Ok(readings)
    }

    /// One control iteration. `controlled[i]` says whether fan `i` may be written.
    fn tick(&self, controlled: &[bool]) -> Result<()> {
        let readings = self.read_sensors()?;

        for (fan, &owned) in self.fans.iter().zip(controlled) {
            let Some(desired) = fan.desired_duty(&readings) else {
                log::warn!("Fan {}: no sensor readings, leaving it unchanged", fan.name());
                continue;
            };
            if !desired.is_finite() {
                return Err(Error::Config(format!(
                    "Fan {}: curve produced {desired}, refusing to set it",
                    fan.name()
                )));
            }
            // Saturating cast: truncates, and a polynomial overshoot stays in range
            let duty = (desired as i32).clamp(0, 100);

            if owned {
                let pwm = fan.set_duty_cycle(duty)?;
                log::info!("Fan {}: {duty}% (pwm {pwm}), {} RPM", fan.name(), fan.read_rpm()?);
            } else {
                log::info!("Fan {}: wants {duty}%, {} RPM", fan.name(), fan.read_rpm()?);
            }
        }

        Ok(())
    }
}
