// Copyright (c) 2026 Pegasus Heavy Industries LLC
// Licensed under the MIT License

//! hwfand: system service that drives hwmon fans from sensor curves and
//! hands them back to the kernel on exit.

use anyhow::Context;
use clap::Parser;
use hwfan::config;
use hwfan::fan::Fan;
use hwfan::hwmon::{self, FanDriver, SensorDriver};
use hwfan::sensor::Sensor;
use hwfan::{Controller, Shutdown};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::signal::unix::{Signal, SignalKind, signal};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "hwfand", about = "Linux hwmon fan curve daemon")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = config::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Compute and log fan duty cycles without writing them.
    #[arg(short, long)]
    monitor: bool,

    /// Log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(short, long, default_value = "info")]
    log_level: log::LevelFilter,

    /// List hwmon drivers with fan or sensor attributes and exit.
    #[arg(long)]
    list_drivers: bool,

    /// Print the driver list as JSON.
    #[arg(long, requires = "list_drivers")]
    json: bool,

    /// hwmon class directory.
    #[arg(long, default_value = hwmon::HWMON_ROOT, hide = true)]
    hwmon_root: PathBuf,
}

#[derive(Serialize)]
struct DriverListing {
    fans: BTreeMap<String, FanDriver>,
    sensors: BTreeMap<String, SensorDriver>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.to_string()),
    )
    .init();

    if cli.list_drivers {
        return list_drivers(&cli.hwmon_root, cli.json);
    }

    let config_path = config::resolve_config_path(Some(&cli.config));
    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Could not load config from {}", config_path.display()))?;

    // Resolve hardware once; entities are never rebuilt after this
    let (fan_specs, sensor_specs) = cfg
        .resolve(&cli.hwmon_root)
        .context("Could not resolve hwmon drivers")?;
    let fans = fan_specs
        .into_iter()
        .map(Fan::new)
        .collect::<hwfan::Result<Vec<_>>>()?;
    let sensors = sensor_specs
        .into_iter()
        .map(Sensor::new)
        .collect::<hwfan::Result<Vec<_>>>()?;

    if !cli.monitor && !nix::unistd::geteuid().is_root() {
        log::warn!("Not running as root, taking over fans will probably fail");
    }

    let controller = Controller::new(fans, sensors, cfg.poll_interval()?, cli.monitor)?;
    log::info!(
        "Configured {} fan(s) and {} sensor(s)",
        controller.fans().len(),
        controller.sensors().len()
    );
    for fan in controller.fans() {
        let sources: Vec<&str> = fan.sensor_names().collect();
        log::info!("Fan {} follows: {}", fan.name(), sources.join(", "));
    }

    // Install handlers before any fan is touched
    let sigint = signal(SignalKind::interrupt()).context("Could not install SIGINT handler")?;
    let sigterm = signal(SignalKind::terminate()).context("Could not install SIGTERM handler")?;
    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(sigint, sigterm, shutdown.clone()));

    controller
        .run(shutdown)
        .await
        .context("Fan control stopped on error, fans were restored to automatic")?;

    log::info!("Daemon shutting down");
    Ok(())
}

async fn wait_for_signal(mut sigint: Signal, mut sigterm: Signal, shutdown: Shutdown) {
    tokio::select! {
        _ = sigint.recv() => log::info!("Received SIGINT"),
        _ = sigterm.recv() => log::info!("Received SIGTERM"),
    }
    shutdown.cancel();
}

// ---------------------------------------------------------------------------
// Driver listing
// ---------------------------------------------------------------------------

fn list_drivers(root: &Path, json: bool) -> anyhow::Result<()> {
    let listing = DriverListing {
        fans: hwmon::list_fan_drivers(root)?,
        sensors: hwmon::list_sensor_drivers(root)?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("Fan drivers:");
    for (name, fan) in &listing.fans {
        println!("  {name} ({})", fan.path.display());
        print_attrs("inputs", &fan.inputs);
        print_attrs("pwm", &fan.pwms);
        print_attrs("targets", &fan.targets);
    }

    println!("Sensor drivers:");
    for (name, sensor) in &listing.sensors {
        println!("  {name} ({})", sensor.path.display());
        print_attrs("temp", &sensor.temps);
        print_attrs("power", &sensor.powers);
    }

    Ok(())
}

fn print_attrs(label: &str, attrs: &[String]) {
    if !attrs.is_empty() {
        println!("    {label}: {}", attrs.join(", "));
    }
}
