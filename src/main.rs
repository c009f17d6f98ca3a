use akmd_config::{DaemonConfig, DeviceConfig};
use akmd_core::{Akmd, Orchestrator};
use akmd_device::akm8973::Akm8973Device;
use akmd_device::bma150::Bma150Device;
use akmd_device::input::EventDevice;
use akmd_device::kxtf9::Kxtf9Device;
use akmd_sensors::types::Calibration;
use akmd_sensors::{shared, Accelerometer, Akm8973, Bma150, Kxtf9};
use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Compass daemon: fuses accelerometer and magnetometer readings and feeds
/// the result back to the AKM8973 driver.
#[derive(Debug, Parser)]
#[command(name = "akmd", version, allow_negative_numbers = true)]
struct Cli {
    /// Handset model, which selects the accelerometer.
    #[arg(value_enum)]
    device: DeviceModel,

    /// AKM8973 gain register value, in 0.4 dB steps.
    #[arg(value_parser = clap::value_parser!(u8).range(0..=15))]
    magnetometer_gain: u8,

    /// Temperature sensor reading at 0 °C.
    temperature_zero: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceModel {
    /// HTC Hero (BMA150).
    Hero,
    /// Motorola Milestone (KXTF9).
    Jordan,
}

impl Cli {
    fn calibration(&self) -> Calibration {
        Calibration {
            magnetometer_gain: self.magnetometer_gain,
            temperature_zero: self.temperature_zero,
        }
    }
}

/// Parse the command line, or print the problem and usage to stdout and exit 1.
fn parse_args() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", e.render());
            println!("{}", Cli::command().render_help());
            std::process::exit(1);
        }
    }
}

fn open_accelerometer(
    model: DeviceModel,
    devices: &DeviceConfig,
    interval: Duration,
) -> Result<Accelerometer> {
    let accelerometer = match model {
        DeviceModel::Hero => {
            let control = Bma150Device::open(&devices.bma150).context("Failed to open BMA150")?;
            Bma150::new(Box::new(control), interval).into()
        }
        DeviceModel::Jordan => {
            let control = Kxtf9Device::open(&devices.kxtf9).context("Failed to open KXTF9")?;
            match control.is_enabled() {
                Ok(enabled) => info!(enabled, "KXTF9 initial state"),
                Err(e) => warn!(?e, "Could not query KXTF9 state"),
            }
            let events = match &devices.kxtf9_input {
                Some(path) => EventDevice::open(path),
                None => EventDevice::open_by_name(&devices.kxtf9_input_name),
            }
            .context("Failed to open KXTF9 input device")?;
            info!(path = %events.path().display(), "KXTF9 input device");
            Kxtf9::new(Box::new(control), Box::new(events), interval).into()
        }
    };
    Ok(accelerometer)
}

fn main() -> Result<()> {
    // Arguments first: a bad invocation must not touch any device.
    let cli = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "akmd=info,akmd_core=info,akmd_sensors=info,akmd_device=info".into()
            }),
        )
        .init();

    let config = akmd_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        DaemonConfig::default()
    });
    let calibration = cli.calibration();
    let interval = config.sampling.interval();
    info!(
        device = ?cli.device,
        ?calibration,
        interval_ms = interval.as_millis() as u64,
        "Starting akmd"
    );

    let control = Akm8973Device::open(&config.devices.akm_daemon)
        .context("Failed to open magnetometer control device")?;
    let magnetometer = Akm8973::new(
        Arc::new(control),
        calibration.magnetometer_gain,
        interval,
        config.sampling.filter_len(),
    );
    let signal = magnetometer.signal();
    let accelerometer = open_accelerometer(cli.device, &config.devices, interval)?;
    info!(model = accelerometer.model(), "Accelerometer ready");

    let akmd = Akmd::new(
        shared(accelerometer),
        shared(magnetometer),
        calibration.temperature_zero,
    );
    let never = Orchestrator::new(signal, akmd)
        .run()
        .context("Sampling loop failed")?;
    match never {}
}
