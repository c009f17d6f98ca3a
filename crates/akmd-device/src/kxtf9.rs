//! KXTF9 accelerometer control node (`/dev/kxtf9`).
//!
//! Samples arrive on a separate input node; this node only switches the
//! chip on and off and sets its report rate.

use crate::ioctl::{ioctl_with, ior, iow};
use crate::{open_rw, DeviceError};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

const KXTF9_IOCTL_BASE: u32 = 77;

pub const KXTF9_IOCTL_SET_DELAY: u32 = iow::<libc::c_int>(KXTF9_IOCTL_BASE, 0);
pub const KXTF9_IOCTL_SET_ENABLE: u32 = iow::<libc::c_int>(KXTF9_IOCTL_BASE, 2);
pub const KXTF9_IOCTL_GET_ENABLE: u32 = ior::<libc::c_int>(KXTF9_IOCTL_BASE, 3);

/// Mask selecting the screen-rotation bits of an `ABS_MISC` value.
pub const ROTATION_MASK: i32 = 0x3F;

pub trait Kxtf9Control: Send {
    fn set_enable(&mut self, enabled: bool) -> Result<(), DeviceError>;
    fn set_delay(&mut self, delay: Duration) -> Result<(), DeviceError>;
}

pub struct Kxtf9Device {
    file: File,
}

impl Kxtf9Device {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = open_rw(path)?;
        tracing::info!(path = %path.display(), "Opened KXTF9 device");
        Ok(Self { file })
    }

    pub fn is_enabled(&self) -> Result<bool, DeviceError> {
        let mut enabled: libc::c_int = 0;
        ioctl_with(&self.file, KXTF9_IOCTL_GET_ENABLE, &mut enabled)
            .map_err(DeviceError::ioctl("KXTF9_IOCTL_GET_ENABLE"))?;
        Ok(enabled != 0)
    }
}

impl Kxtf9Control for Kxtf9Device {
    fn set_enable(&mut self, enabled: bool) -> Result<(), DeviceError> {
        let mut arg = libc::c_int::from(enabled);
        ioctl_with(&self.file, KXTF9_IOCTL_SET_ENABLE, &mut arg)
            .map_err(DeviceError::ioctl("KXTF9_IOCTL_SET_ENABLE"))?;
        Ok(())
    }

    fn set_delay(&mut self, delay: Duration) -> Result<(), DeviceError> {
        // The driver takes milliseconds.
        let mut arg = delay.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        ioctl_with(&self.file, KXTF9_IOCTL_SET_DELAY, &mut arg)
            .map_err(DeviceError::ioctl("KXTF9_IOCTL_SET_DELAY"))?;
        Ok(())
    }
}
