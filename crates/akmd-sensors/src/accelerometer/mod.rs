//! Interchangeable accelerometer backends.
//!
//! The model given on the command line picks one variant; everything above
//! this module only sees an acceleration vector in m/s^2.

mod bma150;
mod kxtf9;

pub use bma150::Bma150;
pub use kxtf9::{roll_from_code, Kxtf9};

use crate::types::{Accuracy, RawSample, RotationHint};
use crate::{ChipError, ChipReader};
use glam::Vec3;
use std::time::Duration;

pub enum Accelerometer {
    Bma150(Bma150),
    Kxtf9(Kxtf9),
}

impl Accelerometer {
    pub fn model(&self) -> &'static str {
        match self {
            Self::Bma150(_) => "bma150",
            Self::Kxtf9(_) => "kxtf9",
        }
    }

    /// Latest acceleration in m/s^2, device frame.
    pub fn acceleration(&self) -> Vec3 {
        match self {
            Self::Bma150(chip) => chip.acceleration(),
            Self::Kxtf9(chip) => chip.acceleration(),
        }
    }

    /// `Unreliable` until the first complete sample, `High` afterwards.
    pub fn accuracy(&self) -> Accuracy {
        if self.last_sample().is_some() {
            Accuracy::High
        } else {
            Accuracy::Unreliable
        }
    }

    pub fn last_sample(&self) -> Option<RawSample> {
        match self {
            Self::Bma150(chip) => chip.last_sample(),
            Self::Kxtf9(chip) => chip.last_sample(),
        }
    }

    /// Screen-rotation hint, for chips that compute one.
    pub fn rotation_hint(&self) -> Option<RotationHint> {
        match self {
            Self::Bma150(_) => None,
            Self::Kxtf9(chip) => chip.rotation_hint(),
        }
    }
}

impl From<Bma150> for Accelerometer {
    fn from(chip: Bma150) -> Self {
        Self::Bma150(chip)
    }
}

impl From<Kxtf9> for Accelerometer {
    fn from(chip: Kxtf9) -> Self {
        Self::Kxtf9(chip)
    }
}

impl ChipReader for Accelerometer {
    fn start(&mut self) -> Result<(), ChipError> {
        match self {
            Self::Bma150(chip) => chip.start(),
            Self::Kxtf9(chip) => chip.start(),
        }
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        match self {
            Self::Bma150(chip) => chip.stop(),
            Self::Kxtf9(chip) => chip.stop(),
        }
    }

    fn measure(&mut self) {
        match self {
            Self::Bma150(chip) => chip.measure(),
            Self::Kxtf9(chip) => chip.measure(),
        }
    }

    fn update_interval(&self) -> Duration {
        match self {
            Self::Bma150(chip) => chip.update_interval(),
            Self::Kxtf9(chip) => chip.update_interval(),
        }
    }
}
