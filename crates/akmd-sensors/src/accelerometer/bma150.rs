use crate::types::{RawSample, GRAVITY_EARTH};
use crate::{ChipError, ChipReader};
use akmd_device::bma150::{Bma150Control, MODE_NORMAL, MODE_SLEEP};
use glam::{IVec3, Vec3};
use std::time::Duration;
use tracing::{info, warn};

/// Counts per g in the ±2 g range the driver configures.
const COUNTS_PER_G: f32 = 256.0;

/// BMA150 read through the register ioctl (HTC Hero).
pub struct Bma150 {
    control: Box<dyn Bma150Control>,
    interval: Duration,
    acceleration: Vec3,
    raw: Option<RawSample>,
    initialized: bool,
    started: bool,
}

impl Bma150 {
    pub fn new(control: Box<dyn Bma150Control>, interval: Duration) -> Self {
        Self {
            control,
            interval,
            acceleration: Vec3::ZERO,
            raw: None,
            initialized: false,
            started: false,
        }
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn last_sample(&self) -> Option<RawSample> {
        self.raw
    }
}

impl ChipReader for Bma150 {
    fn start(&mut self) -> Result<(), ChipError> {
        if self.started {
            return Ok(());
        }
        if !self.initialized {
            self.control.init()?;
            self.initialized = true;
        }
        self.control.set_mode(MODE_NORMAL)?;
        self.acceleration = Vec3::ZERO;
        self.raw = None;
        self.started = true;
        info!("BMA150 started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.control.set_mode(MODE_SLEEP)?;
        info!("BMA150 stopped");
        Ok(())
    }

    fn measure(&mut self) {
        match self.control.read_acceleration() {
            Ok(counts) => {
                let axes = IVec3::from(counts.map(i32::from));
                self.acceleration = axes.as_vec3() * (GRAVITY_EARTH / COUNTS_PER_G);
                self.raw = Some(RawSample::now(axes));
            }
            Err(e) => warn!(?e, "BMA150 read failed, keeping previous acceleration"),
        }
    }

    fn update_interval(&self) -> Duration {
        self.interval
    }
}
