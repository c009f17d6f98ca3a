use crate::composite::CompositeResult;
use akmd_sensors::{
    lock, Accelerometer, Akm8973, ChipError, ChipReader, OrientationAdapter, Shared,
    TemperatureReaderAdapter,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cycles between two periodic debug summaries.
const LOG_EVERY: u64 = 1000;

/// The daemon's measurer: every reader, measured in dependency order, with
/// the result published back through the magnetometer each cycle.
pub struct Akmd {
    orientation: OrientationAdapter,
    magnetometer: Shared<Akm8973>,
    accelerometer: Shared<Accelerometer>,
    temperature: TemperatureReaderAdapter,
    sample_count: u64,
    last: Option<CompositeResult>,
}

impl Akmd {
    /// Wire the adapters onto the two chips. `temperature_zero` is the TMPS
    /// reading that corresponds to 0 °C.
    pub fn new(
        accelerometer: Shared<Accelerometer>,
        magnetometer: Shared<Akm8973>,
        temperature_zero: f32,
    ) -> Self {
        Self {
            orientation: OrientationAdapter::new(accelerometer.clone(), magnetometer.clone()),
            temperature: TemperatureReaderAdapter::new(magnetometer.clone(), temperature_zero),
            magnetometer,
            accelerometer,
            sample_count: 0,
            last: None,
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Result of the most recent cycle.
    pub fn last_result(&self) -> Option<CompositeResult> {
        self.last
    }

    fn composite(&self) -> CompositeResult {
        let accel = lock(&self.accelerometer);
        CompositeResult {
            orientation: self.orientation.report(),
            magnetic: lock(&self.magnetometer).field(),
            acceleration: accel.acceleration(),
            acceleration_accuracy: accel.accuracy(),
            temperature: self.temperature.report(),
            rotation: accel.rotation_hint(),
        }
    }
}

/// Run `op` on every reader, log each failure, and report the first one.
fn fan_out(
    readers: [(&str, &mut dyn ChipReader); 4],
    what: &str,
    op: fn(&mut dyn ChipReader) -> Result<(), ChipError>,
) -> Result<(), ChipError> {
    let mut first = Ok(());
    for (name, reader) in readers {
        if let Err(e) = op(reader) {
            warn!(reader = name, ?e, "Failed to {what}");
            if first.is_ok() {
                first = Err(e);
            }
        }
    }
    first
}

impl Akmd {
    fn readers(&mut self) -> [(&str, &mut dyn ChipReader); 4] {
        [
            ("orientation", &mut self.orientation),
            ("magnetometer", &mut self.magnetometer),
            ("accelerometer", &mut self.accelerometer),
            ("temperature", &mut self.temperature),
        ]
    }
}

impl ChipReader for Akmd {
    fn start(&mut self) -> Result<(), ChipError> {
        self.sample_count = 0;
        fan_out(self.readers(), "start", |r| r.start())?;
        info!(
            accelerometer = lock(&self.accelerometer).model(),
            interval_ms = self.update_interval().as_millis() as u64,
            "Sensors started"
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        let result = fan_out(self.readers(), "stop", |r| r.stop());
        info!(samples = self.sample_count, "Sensors stopped");
        result
    }

    fn measure(&mut self) {
        self.accelerometer.measure();
        self.magnetometer.measure();
        self.orientation.measure();
        self.temperature.measure();

        let result = self.composite();
        if let Err(e) = lock(&self.magnetometer).publish(&result.to_record()) {
            warn!(?e, "Failed to publish sensor record");
        }
        self.last = Some(result);

        self.sample_count += 1;
        if self.sample_count % LOG_EVERY == 0 {
            let accel_age = lock(&self.accelerometer).last_sample().map(|s| s.age());
            let mag_age = lock(&self.magnetometer).last_sample().map(|s| s.age());
            debug!(
                sample_count = self.sample_count,
                ?accel_age,
                ?mag_age,
                azimuth = result.orientation.azimuth,
                pitch = result.orientation.pitch,
                roll = result.orientation.roll,
                accuracy = ?result.orientation.accuracy,
                celsius = result.temperature.celsius,
                rotation = ?result.rotation,
                "Sampling"
            );
        }
    }

    fn update_interval(&self) -> Duration {
        lock(&self.magnetometer).update_interval()
    }
}
