//! AKM8973 daemon node (`/dev/akm8973_daemon`).
//!
//! The kernel driver exposes raw register access, single-shot measurement,
//! the blocking open/close notifications of the HAL-side node and the
//! `SET_YPR` ioctl through which the daemon hands results back.

use crate::ioctl::{ioctl_with, ior, iow};
use crate::{open_rw, DeviceError};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

const AKMIO: u32 = 0xA1;

/// Bytes returned by `GETDATA`: ST, TMPS, H1X, H1Y, H1Z.
pub const DATA_LEN: usize = 5;
/// Entries of the `SET_YPR` record.
pub const YPR_LEN: usize = 12;
/// Registers written by one `ECS_IOCTL_WRITE` (the buffer also holds length and address).
pub const MAX_WRITE: usize = 3;

pub const ECS_IOCTL_WRITE: u32 = iow::<[u8; 5]>(AKMIO, 0x02);
pub const ECS_IOCTL_SET_MODE: u32 = iow::<i16>(AKMIO, 0x07);
pub const ECS_IOCTL_GETDATA: u32 = ior::<[u8; DATA_LEN]>(AKMIO, 0x08);
pub const ECS_IOCTL_SET_YPR: u32 = iow::<[i16; YPR_LEN]>(AKMIO, 0x0C);
pub const ECS_IOCTL_GET_OPEN_STATUS: u32 = ior::<libc::c_int>(AKMIO, 0x0D);
pub const ECS_IOCTL_GET_CLOSE_STATUS: u32 = ior::<libc::c_int>(AKMIO, 0x0E);
pub const ECS_IOCTL_GET_DELAY: u32 = ior::<i16>(AKMIO, 0x30);

/// Offset DACs, X/Y/Z consecutive.
pub const REG_HXDA: u8 = 0xE1;
/// Gain, X/Y/Z consecutive.
pub const REG_HXGA: u8 = 0xE4;

pub const MODE_MEASURE: i16 = 0x00;
pub const MODE_POWERDOWN: i16 = 0x03;

/// Operations the magnetometer reader needs from the daemon node.
///
/// All methods take `&self`: the orchestrator thread sits in `wait_close`
/// while the sampling thread measures through the same node.
pub trait MagnetometerControl: Send + Sync {
    fn set_mode(&self, mode: i16) -> Result<(), DeviceError>;

    /// Write up to `MAX_WRITE` consecutive registers starting at `start`.
    fn write_registers(&self, start: u8, values: &[u8]) -> Result<(), DeviceError>;

    /// Wait for the pending measurement and return ST, TMPS, H1X, H1Y, H1Z.
    fn read_data(&self) -> Result<[u8; DATA_LEN], DeviceError>;

    /// Hand a result record to the kernel for the HAL to pick up.
    fn publish(&self, record: &[i16; YPR_LEN]) -> Result<(), DeviceError>;

    /// Block until a client opens the HAL-side node.
    fn wait_open(&self) -> Result<(), DeviceError>;

    /// Block until the last client closes the HAL-side node.
    fn wait_close(&self) -> Result<(), DeviceError>;

    /// Sample delay requested by the HAL, if any.
    fn requested_delay(&self) -> Result<Option<Duration>, DeviceError>;
}

pub struct Akm8973Device {
    file: File,
}

impl Akm8973Device {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = open_rw(path)?;
        tracing::info!(path = %path.display(), "Opened AKM8973 daemon device");
        Ok(Self { file })
    }
}

impl MagnetometerControl for Akm8973Device {
    fn set_mode(&self, mode: i16) -> Result<(), DeviceError> {
        let mut arg = mode;
        ioctl_with(&self.file, ECS_IOCTL_SET_MODE, &mut arg)
            .map_err(DeviceError::ioctl("ECS_IOCTL_SET_MODE"))?;
        Ok(())
    }

    fn write_registers(&self, start: u8, values: &[u8]) -> Result<(), DeviceError> {
        if values.is_empty() || values.len() > MAX_WRITE {
            return Err(DeviceError::Ioctl {
                request: "ECS_IOCTL_WRITE",
                source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
            });
        }
        // [byte count incl. address, address, values...]
        let mut buf = [0u8; 5];
        buf[0] = (values.len() + 1) as u8;
        buf[1] = start;
        buf[2..2 + values.len()].copy_from_slice(values);
        ioctl_with(&self.file, ECS_IOCTL_WRITE, &mut buf).map_err(DeviceError::ioctl("ECS_IOCTL_WRITE"))?;
        Ok(())
    }

    fn read_data(&self) -> Result<[u8; DATA_LEN], DeviceError> {
        let mut buf = [0u8; DATA_LEN];
        ioctl_with(&self.file, ECS_IOCTL_GETDATA, &mut buf)
            .map_err(DeviceError::ioctl("ECS_IOCTL_GETDATA"))?;
        Ok(buf)
    }

    fn publish(&self, record: &[i16; YPR_LEN]) -> Result<(), DeviceError> {
        let mut buf = *record;
        ioctl_with(&self.file, ECS_IOCTL_SET_YPR, &mut buf)
            .map_err(DeviceError::ioctl("ECS_IOCTL_SET_YPR"))?;
        Ok(())
    }

    fn wait_open(&self) -> Result<(), DeviceError> {
        let mut status: libc::c_int = 0;
        ioctl_with(&self.file, ECS_IOCTL_GET_OPEN_STATUS, &mut status)
            .map_err(DeviceError::ioctl("ECS_IOCTL_GET_OPEN_STATUS"))?;
        tracing::debug!(status, "AKM8973 opened by client");
        Ok(())
    }

    fn wait_close(&self) -> Result<(), DeviceError> {
        let mut status: libc::c_int = 0;
        ioctl_with(&self.file, ECS_IOCTL_GET_CLOSE_STATUS, &mut status)
            .map_err(DeviceError::ioctl("ECS_IOCTL_GET_CLOSE_STATUS"))?;
        tracing::debug!(status, "AKM8973 closed by client");
        Ok(())
    }

    fn requested_delay(&self) -> Result<Option<Duration>, DeviceError> {
        let mut delay_ms: i16 = 0;
        ioctl_with(&self.file, ECS_IOCTL_GET_DELAY, &mut delay_ms)
            .map_err(DeviceError::ioctl("ECS_IOCTL_GET_DELAY"))?;
        Ok((delay_ms > 0).then(|| Duration::from_millis(delay_ms as u64)))
    }
}
