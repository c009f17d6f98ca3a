use crate::magnetometer::Akm8973;
use crate::types::TemperatureReport;
use crate::{lock, ChipError, ChipReader, Shared};
use std::time::Duration;
use tracing::trace;

/// °C per TMPS count. The sensor counts down as it warms.
pub const TEMPERATURE_SCALE: f32 = -0.625;

pub fn celsius(raw: u8, zero: f32) -> f32 {
    (raw as f32 - zero) * TEMPERATURE_SCALE
}

/// Ambient temperature from the magnetometer's TMPS channel.
pub struct TemperatureReaderAdapter {
    magnetometer: Shared<Akm8973>,
    zero: f32,
    report: TemperatureReport,
}

impl TemperatureReaderAdapter {
    pub fn new(magnetometer: Shared<Akm8973>, zero: f32) -> Self {
        Self {
            magnetometer,
            zero,
            report: TemperatureReport::default(),
        }
    }

    pub fn report(&self) -> TemperatureReport {
        self.report
    }
}

impl ChipReader for TemperatureReaderAdapter {
    fn start(&mut self) -> Result<(), ChipError> {
        self.magnetometer.start()?;
        self.report = TemperatureReport::default();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        self.magnetometer.stop()
    }

    fn measure(&mut self) {
        if let Some(raw) = lock(&self.magnetometer).temperature_raw() {
            self.report.celsius = celsius(raw, self.zero);
            trace!(raw, celsius = self.report.celsius, "Temperature");
        }
    }

    fn update_interval(&self) -> Duration {
        lock(&self.magnetometer).update_interval()
    }
}
