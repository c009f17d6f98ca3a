//! In-memory stand-ins for the kernel nodes.

use akmd_device::akm8973::{MagnetometerControl, DATA_LEN, YPR_LEN};
use akmd_device::bma150::Bma150Control;
use akmd_device::input::{EventSource, InputEvent};
use akmd_device::kxtf9::Kxtf9Control;
use akmd_device::DeviceError;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn failure(request: &'static str) -> DeviceError {
    DeviceError::Ioctl {
        request,
        source: io::Error::from(io::ErrorKind::TimedOut),
    }
}

/// Scripted AKM8973 node. Reads pop from a queue and time out when it is empty.
#[derive(Default)]
pub struct FakeAkm {
    reads: Mutex<VecDeque<[u8; DATA_LEN]>>,
    modes: Mutex<Vec<i16>>,
    writes: Mutex<Vec<(u8, Vec<u8>)>>,
    published: Mutex<Vec<[i16; YPR_LEN]>>,
    delay: Mutex<Option<Duration>>,
    waits: Mutex<(usize, usize)>,
}

impl FakeAkm {
    pub fn push_read(&self, data: [u8; DATA_LEN]) {
        self.reads.lock().unwrap().push_back(data);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn modes(&self) -> Vec<i16> {
        self.modes
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|&m| m != akmd_device::akm8973::MODE_MEASURE)
            .collect()
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<[i16; YPR_LEN]> {
        self.published.lock().unwrap().clone()
    }

    /// (opens, closes) waited for.
    pub fn waits(&self) -> (usize, usize) {
        *self.waits.lock().unwrap()
    }
}

impl MagnetometerControl for FakeAkm {
    fn set_mode(&self, mode: i16) -> Result<(), DeviceError> {
        self.modes.lock().unwrap().push(mode);
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
            .ok_or_else(|| failure("ECS_IOCTL_GETDATA"))
    }

    fn publish(&self, record: &[i16; YPR_LEN]) -> Result<(), DeviceError> {
        self.published.lock().unwrap().push(*record);
        Ok(())
    }

    fn wait_open(&self) -> Result<(), DeviceError> {
        self.waits.lock().unwrap().0 += 1;
        Ok(())
    }

    fn wait_close(&self) -> Result<(), DeviceError> {
        self.waits.lock().unwrap().1 += 1;
        Ok(())
    }

    fn requested_delay(&self) -> Result<Option<Duration>, DeviceError> {
        Ok(*self.delay.lock().unwrap())
    }
}

/// Calls observed by the accelerometer fakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init,
    Mode(i16),
    Enable(bool),
    Delay(Duration),
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

#[derive(Default)]
pub struct FakeBma150 {
    pub calls: CallLog,
    pub reads: Arc<Mutex<VecDeque<[i16; 3]>>>,
}

impl Bma150Control for FakeBma150 {
    fn init(&mut self) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push(Call::Init);
        Ok(())
    }

    fn set_mode(&mut self, mode: i16) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push(Call::Mode(mode));
        Ok(())
    }

    fn read_acceleration(&mut self) -> Result<[i16; 3], DeviceError> {
        self.reads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| failure("BMA_IOCTL_READ_ACCELERATION"))
    }
}

#[derive(Default)]
pub struct FakeKxtf9 {
    pub calls: CallLog,
}

impl Kxtf9Control for FakeKxtf9 {
    fn set_enable(&mut self, enabled: bool) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push(Call::Enable(enabled));
        Ok(())
    }

    fn set_delay(&mut self, delay: Duration) -> Result<(), DeviceError> {
        self.calls.lock().unwrap().push(Call::Delay(delay));
        Ok(())
    }
}

/// Hands out one scripted batch per read; `None` batches fail.
#[derive(Default, Clone)]
pub struct FakeEvents {
    pub batches: Arc<Mutex<VecDeque<Option<Vec<InputEvent>>>>>,
}

impl FakeEvents {
    pub fn push(&self, batch: Vec<InputEvent>) {
        self.batches.lock().unwrap().push_back(Some(batch));
    }

    pub fn push_error(&self) {
        self.batches.lock().unwrap().push_back(None);
    }
}

impl EventSource for FakeEvents {
    fn read_events(&mut self, _timeout: Duration) -> Result<Vec<InputEvent>, DeviceError> {
        match self.batches.lock().unwrap().pop_front() {
            Some(Some(batch)) => Ok(batch),
            Some(None) => Err(DeviceError::Read {
                path: "/dev/input/fake".into(),
                source: io::Error::from(io::ErrorKind::Other),
            }),
            None => Ok(Vec::new()),
        }
    }
}
