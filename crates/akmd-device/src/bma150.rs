//! BMA150 accelerometer node (`/dev/bma150`).

use crate::ioctl::{io, ioctl_none, ioctl_with, iow, iowr};
use crate::{open_rw, DeviceError};
use std::fs::File;
use std::path::Path;

const BMAIO: u32 = 0xA1;

/// Register block returned by `READ_ACCELERATION`: x, y, z, then driver-private words.
pub const ACCEL_BLOCK_LEN: usize = 7;

pub const BMA_IOCTL_INIT: u32 = io(BMAIO, 0x31);
pub const BMA_IOCTL_READ_ACCELERATION: u32 = iowr::<[i16; ACCEL_BLOCK_LEN]>(BMAIO, 0x34);
pub const BMA_IOCTL_SET_MODE: u32 = iow::<i16>(BMAIO, 0x35);

pub const MODE_NORMAL: i16 = 0;
pub const MODE_SLEEP: i16 = 1;

pub trait Bma150Control: Send {
    fn init(&mut self) -> Result<(), DeviceError>;
    fn set_mode(&mut self, mode: i16) -> Result<(), DeviceError>;
    /// Raw x, y, z counts.
    fn read_acceleration(&mut self) -> Result<[i16; 3], DeviceError>;
}

pub struct Bma150Device {
    file: File,
}

impl Bma150Device {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = open_rw(path)?;
        tracing::info!(path = %path.display(), "Opened BMA150 device");
        Ok(Self { file })
    }
}

impl Bma150Control for Bma150Device {
    fn init(&mut self) -> Result<(), DeviceError> {
        ioctl_none(&self.file, BMA_IOCTL_INIT).map_err(DeviceError::ioctl("BMA_IOCTL_INIT"))?;
        Ok(())
    }

    fn set_mode(&mut self, mode: i16) -> Result<(), DeviceError> {
        let mut arg = mode;
        ioctl_with(&self.file, BMA_IOCTL_SET_MODE, &mut arg)
            .map_err(DeviceError::ioctl("BMA_IOCTL_SET_MODE"))?;
        Ok(())
    }

    fn read_acceleration(&mut self) -> Result<[i16; 3], DeviceError> {
        let mut block = [0i16; ACCEL_BLOCK_LEN];
        ioctl_with(&self.file, BMA_IOCTL_READ_ACCELERATION, &mut block)
            .map_err(DeviceError::ioctl("BMA_IOCTL_READ_ACCELERATION"))?;
        Ok([block[0], block[1], block[2]])
    }
}
