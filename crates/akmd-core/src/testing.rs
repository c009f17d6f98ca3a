//! Scripted chips for measurer and orchestrator tests.

use crate::measurer::Akmd;
use akmd_device::akm8973::{MagnetometerControl, DATA_LEN, YPR_LEN};
use akmd_device::bma150::Bma150Control;
use akmd_device::DeviceError;
use akmd_sensors::{shared, Accelerometer, Akm8973, Bma150};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const INTERVAL: Duration = Duration::from_millis(5);
pub const TEMPERATURE_ZERO: f32 = 130.0;

fn timeout(request: &'static str) -> DeviceError {
    DeviceError::Ioctl {
        request,
        source: io::Error::from(io::ErrorKind::TimedOut),
    }
}

#[derive(Default)]
pub struct FakeAkm {
    reads: Mutex<VecDeque<[u8; DATA_LEN]>>,
    writes: Mutex<Vec<(u8, Vec<u8>)>>,
    published: Mutex<Vec<[i16; YPR_LEN]>>,
}

impl FakeAkm {
    pub fn push_read(&self, data: [u8; DATA_LEN]) {
        self.reads.lock().unwrap().push_back(data);
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<[i16; YPR_LEN]> {
        self.published.lock().unwrap().clone()
    }
}

impl MagnetometerControl for FakeAkm {
    fn set_mode(&self, _mode: i16) -> Result<(), DeviceError> {
        Ok(())
    }

    fn write_registers(&self, start: u8, values: &[u8]) -> Result<(), DeviceError> {
        self.writes.lock().unwrap().push((start, values.to_vec()));
        Ok(())
    }

    fn read_data(&self) -> Result<[u8; DATA_LEN], DeviceError> {
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| timeout("ECS_IOCTL_GETDATA"))
    }

    fn publish(&self, record: &[i16; YPR_LEN]) -> Result<(), DeviceError> {
        self.published.lock().unwrap().push(*record);
        Ok(())
    }

    fn wait_open(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn wait_close(&self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn requested_delay(&self) -> Result<Option<Duration>, DeviceError> {
        Ok(None)
    }
}

/// BMA150 stand-in; clones share the same script and call log.
#[derive(Default, Clone)]
pub struct FakeBma150 {
    calls: Arc<Mutex<Vec<&'static str>>>,
    reads: Arc<Mutex<VecDeque<[i16; 3]>>>,
}

impl FakeBma150 {
    pub fn push(&self, counts: [i16; 3]) {
        self.reads.lock().unwrap().push_back(counts);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl Bma150Control for FakeBma150 {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push("init");
        Ok(())
    }

    fn set_mode(&mut self, _mode: i16) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push("mode");
        Ok(())
    }

    fn read_acceleration(&mut self) -> Result<[i16; 3], DeviceError> {
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| timeout("BMA_IOCTL_READ_ACCELERATION"))
    }
}

pub struct Rig {
    pub akmd: Akmd,
    pub akm: Arc<FakeAkm>,
    pub bma: FakeBma150,
}

/// A hero-style measurer over fake chips.
pub fn rig() -> Rig {
    let akm = Arc::new(FakeAkm::default());
    let bma = FakeBma150::default();
    let accelerometer = shared(Accelerometer::from(Bma150::new(Box::new(bma.clone()), INTERVAL)));
    let magnetometer = shared(Akm8973::new(akm.clone(), 0, INTERVAL, 4));
    Rig {
        akmd: Akmd::new(accelerometer, magnetometer, TEMPERATURE_ZERO),
        akm,
        bma,
    }
}
