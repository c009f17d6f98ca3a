pub mod accelerometer;
pub mod magnetometer;
pub mod orientation;
pub mod temperature;
pub mod types;

pub use accelerometer::{Accelerometer, Bma150, Kxtf9};
pub use magnetometer::{Akm8973, ControlSignal};
pub use orientation::OrientationAdapter;
pub use temperature::TemperatureReaderAdapter;

use akmd_device::DeviceError;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChipError {
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Uniform surface over raw chip drivers and the adapters built on them.
///
/// `measure` never fails: a driver that cannot read logs the error and keeps
/// its previous value, so the sampling loop always has something to publish.
pub trait ChipReader: Send {
    /// Open resources and reset filter state. A second call is a no-op.
    fn start(&mut self) -> Result<(), ChipError>;

    /// Release resources. A second call is a no-op.
    fn stop(&mut self) -> Result<(), ChipError>;

    /// Take one sample (raw drivers) or recompute from dependencies (adapters).
    fn measure(&mut self);

    /// Block until the hardware asks for sampling to begin.
    fn wait_start(&self) -> Result<(), ChipError> {
        Ok(())
    }

    /// Block until the hardware asks for sampling to end.
    fn wait_stop(&self) -> Result<(), ChipError> {
        Ok(())
    }

    /// Minimum time between two measurements.
    fn update_interval(&self) -> Duration;

    fn sleep_until_next_update(&self) {
        std::thread::sleep(self.update_interval());
    }
}

/// Handle to a reader that is owned by the measurer and decorated by adapters.
///
/// Only one thread touches a reader at a time (the orchestrator during
/// start/stop, the sampling thread in between), so the lock is never contended.
pub type Shared<R> = Arc<Mutex<R>>;

pub fn shared<R>(reader: R) -> Shared<R> {
    Arc::new(Mutex::new(reader))
}

/// Lock a shared reader, recovering the data if a previous holder panicked.
pub fn lock<R>(reader: &Shared<R>) -> MutexGuard<'_, R> {
    reader.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<R: ChipReader> ChipReader for Shared<R> {
    fn start(&mut self) -> Result<(), ChipError> {
        lock(self).start()
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        lock(self).stop()
    }

    fn measure(&mut self) {
        lock(self).measure()
    }

    fn wait_start(&self) -> Result<(), ChipError> {
        lock(self).wait_start()
    }

    fn wait_stop(&self) -> Result<(), ChipError> {
        lock(self).wait_stop()
    }

    fn update_interval(&self) -> Duration {
        lock(self).update_interval()
    }
}

#[cfg(test)]
pub(crate) mod testing;
