use glam::IVec3;
use std::time::{Duration, Instant};

/// Standard gravity (m/s^2).
pub const GRAVITY_EARTH: f32 = 9.806_65;

/// One register or event-frame capture from a chip.
#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    /// Raw per-axis counts as the chip reported them.
    pub axes: IVec3,
    pub timestamp: Instant,
}

impl RawSample {
    pub fn now(axes: IVec3) -> Self {
        Self {
            axes,
            timestamp: Instant::now(),
        }
    }

    /// Time since the capture.
    pub fn age(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Per-deployment constants given on the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// AKM8973 gain register value, in 0.4 dB steps.
    pub magnetometer_gain: u8,
    /// TMPS reading that corresponds to 0 °C.
    pub temperature_zero: f32,
}

/// Sensor accuracy, numbered as the Android sensor HAL numbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(i16)]
pub enum Accuracy {
    #[default]
    Unreliable = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

/// Fused orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationReport {
    /// Heading from magnetic north, [0, 360).
    pub azimuth: f32,
    /// Rotation about the device x axis, [-90, 90].
    pub pitch: f32,
    /// Rotation about the device y axis, [-180, 180].
    pub roll: f32,
    pub accuracy: Accuracy,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TemperatureReport {
    pub celsius: f32,
}

/// Screen-rotation hint computed by the accelerometer chip itself.
///
/// Separate from [`OrientationReport`]: this is the chip's coarse idea of
/// which way the screen faces, not a fused angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationHint {
    /// 1 = screen down, 2 = screen up, 0 = neither.
    pub pitch: u8,
    /// Quarter turns from portrait (1 = 90°, 2 = 180°, 3 = 270°); `None` until the chip reports one.
    pub roll_quarter_turns: Option<u8>,
}
