use akmd_device::akm8973::YPR_LEN;
use akmd_sensors::types::{Accuracy, OrientationReport, RotationHint, TemperatureReport, GRAVITY_EARTH};
use glam::Vec3;

/// Angle resolution of the record (counts per degree).
const ANGLE_SCALE: f32 = 64.0;
/// Acceleration resolution of the record (counts per g).
const ACCEL_COUNTS_PER_G: f32 = 720.0;
/// Field resolution of the record (counts per µT).
const MAGNETIC_SCALE: f32 = 16.0;

/// Everything published for one sampling cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeResult {
    pub orientation: OrientationReport,
    /// µT, device frame.
    pub magnetic: Vec3,
    /// m/s^2, device frame.
    pub acceleration: Vec3,
    pub acceleration_accuracy: Accuracy,
    pub temperature: TemperatureReport,
    /// Not part of the kernel record; logged only.
    pub rotation: Option<RotationHint>,
}

impl CompositeResult {
    /// The `SET_YPR` record:
    ///
    /// | index | content                      |
    /// |-------|------------------------------|
    /// | 0..3  | azimuth, pitch, roll × 64    |
    /// | 3     | temperature, °C              |
    /// | 4     | orientation accuracy         |
    /// | 5     | accelerometer accuracy       |
    /// | 6..9  | acceleration × 720 / g       |
    /// | 9..12 | magnetic field × 16 (µT)     |
    pub fn to_record(&self) -> [i16; YPR_LEN] {
        let o = &self.orientation;
        let accel = self.acceleration * (ACCEL_COUNTS_PER_G / GRAVITY_EARTH);
        let mag = self.magnetic * MAGNETIC_SCALE;
        [
            saturate(o.azimuth * ANGLE_SCALE),
            saturate(o.pitch * ANGLE_SCALE),
            saturate(o.roll * ANGLE_SCALE),
            saturate(self.temperature.celsius),
            o.accuracy as i16,
            self.acceleration_accuracy as i16,
            saturate(accel.x),
            saturate(accel.y),
            saturate(accel.z),
            saturate(mag.x),
            saturate(mag.y),
            saturate(mag.z),
        ]
    }
}

/// Round to the nearest count; `as` saturates at the i16 bounds.
fn saturate(value: f32) -> i16 {
    value.round() as i16
}
