//! Tilt-compensated orientation from the accelerometer and magnetometer.
//!
//! The accelerometer gives the gravity reference, the magnetic field is
//! projected onto the horizontal plane it defines, and the heading is read
//! off the device y axis.

use crate::accelerometer::Accelerometer;
use crate::magnetometer::Akm8973;
use crate::types::{Accuracy, OrientationReport};
use crate::{lock, ChipError, ChipReader, Shared};
use glam::Vec3;
use std::time::Duration;
use tracing::{debug, info};

/// Below this acceleration (m/s^2) the device is treated as in free fall.
pub const MIN_GRAVITY: f32 = 1.0;

/// Fraction of |a| under which the x/z plane carries no roll information.
const ROLL_SINGULARITY: f32 = 1e-3;

/// Pitch and roll in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attitude {
    pub pitch: f32,
    pub roll: f32,
}

/// Pitch and roll from a single acceleration vector, or `None` in free fall.
pub fn attitude(accel: Vec3) -> Option<Attitude> {
    let norm = accel.length();
    if norm < MIN_GRAVITY {
        return None;
    }
    let horizontal = accel.x.hypot(accel.z);
    let pitch = (-accel.y).atan2(horizontal).to_degrees().clamp(-90.0, 90.0);
    let roll = if horizontal <= ROLL_SINGULARITY * norm {
        // Standing on an edge: the roll axis is undefined.
        0.0
    } else {
        accel.x.atan2(accel.z).to_degrees().clamp(-180.0, 180.0)
    };
    Some(Attitude { pitch, roll })
}

/// Heading of the device y axis from magnetic north, in [0, 360).
pub fn azimuth(accel: Vec3, magnetic: Vec3) -> Option<f32> {
    if accel.length() < MIN_GRAVITY {
        return None;
    }
    let up = accel.normalize();
    let north = magnetic - magnetic.dot(up) * up;
    let east = north.cross(up);
    let degrees = east.y.atan2(north.y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative angles.
    Some(if degrees >= 360.0 { 0.0 } else { degrees })
}

pub struct OrientationAdapter {
    accelerometer: Shared<Accelerometer>,
    magnetometer: Shared<Akm8973>,
    report: OrientationReport,
}

impl OrientationAdapter {
    pub fn new(accelerometer: Shared<Accelerometer>, magnetometer: Shared<Akm8973>) -> Self {
        Self {
            accelerometer,
            magnetometer,
            report: OrientationReport::default(),
        }
    }

    pub fn report(&self) -> OrientationReport {
        self.report
    }
}

impl ChipReader for OrientationAdapter {
    fn start(&mut self) -> Result<(), ChipError> {
        self.accelerometer.start()?;
        self.magnetometer.start()?;
        self.report = OrientationReport::default();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        let accel = self.accelerometer.stop();
        let mag = self.magnetometer.stop();
        accel.and(mag)
    }

    fn measure(&mut self) {
        let accel = lock(&self.accelerometer).acceleration();
        let (field, sample_ok) = {
            let mag = lock(&self.magnetometer);
            (mag.field(), mag.sample_ok())
        };

        let (Some(tilt), Some(heading)) = (attitude(accel), azimuth(accel, field)) else {
            if self.report.accuracy != Accuracy::Unreliable {
                info!(accel = ?accel, "No gravity reference, orientation unreliable");
            }
            self.report.accuracy = Accuracy::Unreliable;
            return;
        };

        self.report = OrientationReport {
            azimuth: heading,
            pitch: tilt.pitch,
            roll: tilt.roll,
            accuracy: if sample_ok { Accuracy::High } else { Accuracy::Low },
        };
        debug!(report = ?self.report, "Orientation");
    }

    fn update_interval(&self) -> Duration {
        lock(&self.magnetometer).update_interval()
    }
}
