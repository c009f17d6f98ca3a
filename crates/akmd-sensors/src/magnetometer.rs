use crate::types::RawSample;
use crate::{ChipError, ChipReader};
use akmd_device::akm8973::{
    MagnetometerControl, MODE_MEASURE, MODE_POWERDOWN, REG_HXDA, REG_HXGA, YPR_LEN,
};
use glam::{IVec3, Vec3};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// ADC reading for a field in the middle of the current window.
const ADC_CENTER: i32 = 128;
/// Saturated readings: the field is outside the window the DAC selects.
const ADC_MIN: u8 = 0x00;
const ADC_MAX: u8 = 0xFF;

/// ADC counts the window moves per DAC step.
const DAC_COUNTS_PER_STEP: f32 = 8.0;
/// DAC steps applied after a saturated reading.
const DAC_ADJUST: i8 = 4;
/// DAC registers are sign-magnitude with 7 magnitude bits.
const DAC_LIMIT: i8 = 127;

/// Field per ADC count at gain 0 (µT).
const BASE_LSB_MICROTESLA: f32 = 0.8;
/// Gain register resolution (dB per step).
const GAIN_STEP_DB: f32 = 0.4;

/// Outcome of the most recent `measure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleStatus {
    /// Nothing measured since `start`.
    NoData,
    Valid,
    /// At least one axis saturated; the sample was dropped.
    Overflow,
    /// The chip could not be read.
    ReadError,
}

/// Field per ADC count for a gain register value.
pub fn lsb_microtesla(gain: u8) -> f32 {
    BASE_LSB_MICROTESLA * 10f32.powf(-GAIN_STEP_DB * gain as f32 / 20.0)
}

/// DAC register encoding: bit 7 is the sign.
fn encode_dac(offset: i8) -> u8 {
    let magnitude = offset.unsigned_abs().min(DAC_LIMIT as u8);
    if offset < 0 {
        0x80 | magnitude
    } else {
        magnitude
    }
}

/// AKM8973 magnetometer.
///
/// Measures on demand through the daemon node, re-centres the offset DACs
/// whenever an axis saturates, and averages the last few valid samples.
/// It also owns the publishing path back to the kernel.
pub struct Akm8973 {
    control: Arc<dyn MagnetometerControl>,
    gain: u8,
    lsb: f32,
    interval: Duration,
    dac: [i8; 3],
    window: VecDeque<Vec3>,
    window_len: usize,
    field: Vec3,
    raw: Option<RawSample>,
    temperature_raw: Option<u8>,
    status: SampleStatus,
    started: bool,
}

impl Akm8973 {
    pub fn new(
        control: Arc<dyn MagnetometerControl>,
        gain: u8,
        interval: Duration,
        window_len: usize,
    ) -> Self {
        let window_len = window_len.max(1);
        Self {
            control,
            gain,
            lsb: lsb_microtesla(gain),
            interval,
            dac: [0; 3],
            window: VecDeque::with_capacity(window_len),
            window_len,
            field: Vec3::ZERO,
            raw: None,
            temperature_raw: None,
            status: SampleStatus::NoData,
            started: false,
        }
    }

    /// Reader sharing this chip's control node, used only to wait for
    /// enable/disable. Waiting on it never touches the measurement state.
    pub fn signal(&self) -> ControlSignal {
        ControlSignal {
            control: self.control.clone(),
            interval: self.interval,
        }
    }

    /// Filtered field in µT.
    pub fn field(&self) -> Vec3 {
        self.field
    }

    pub fn status(&self) -> SampleStatus {
        self.status
    }

    /// Whether the latest measurement passed the saturation guard.
    pub fn sample_ok(&self) -> bool {
        self.status == SampleStatus::Valid
    }

    /// Latest TMPS register value.
    pub fn temperature_raw(&self) -> Option<u8> {
        self.temperature_raw
    }

    pub fn last_sample(&self) -> Option<RawSample> {
        self.raw
    }

    pub fn dac_offsets(&self) -> [i8; 3] {
        self.dac
    }

    /// Write a result record to the daemon node.
    pub fn publish(&self, record: &[i16; YPR_LEN]) -> Result<(), ChipError> {
        self.control.publish(record)?;
        Ok(())
    }

    fn write_dac(&self, dac: [i8; 3]) -> Result<(), ChipError> {
        self.control.write_registers(REG_HXDA, &dac.map(encode_dac))?;
        Ok(())
    }

    /// Step the DAC of every saturated axis toward the field.
    fn recenter(&mut self, raw: [u8; 3]) {
        let mut dac = self.dac;
        for (offset, value) in dac.iter_mut().zip(raw) {
            if value == ADC_MAX {
                *offset = offset.saturating_add(DAC_ADJUST).min(DAC_LIMIT);
            } else if value == ADC_MIN {
                *offset = offset.saturating_sub(DAC_ADJUST).max(-DAC_LIMIT);
            }
        }
        if dac == self.dac {
            // Already at the end of the DAC range.
            return;
        }
        match self.write_dac(dac) {
            Ok(()) => {
                debug!(?dac, "Magnetometer DAC re-centred");
                self.dac = dac;
            }
            Err(e) => warn!(?e, "Failed to write magnetometer DAC"),
        }
    }

    fn to_microtesla(&self, raw: [u8; 3]) -> Vec3 {
        let counts = IVec3::from(raw.map(|v| v as i32 - ADC_CENTER)).as_vec3();
        let window = Vec3::from(self.dac.map(f32::from)) * DAC_COUNTS_PER_STEP;
        (counts + window) * self.lsb
    }
}

impl ChipReader for Akm8973 {
    fn start(&mut self) -> Result<(), ChipError> {
        if self.started {
            return Ok(());
        }
        self.control.set_mode(MODE_POWERDOWN)?;
        self.control.write_registers(REG_HXGA, &[self.gain; 3])?;
        self.write_dac(self.dac)?;

        self.window.clear();
        self.field = Vec3::ZERO;
        self.raw = None;
        self.temperature_raw = None;
        self.status = SampleStatus::NoData;
        self.started = true;
        info!(gain = self.gain, lsb_ut = self.lsb, dac = ?self.dac, "Magnetometer started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.window.clear();
        self.control.set_mode(MODE_POWERDOWN)?;
        info!("Magnetometer stopped");
        Ok(())
    }

    fn measure(&mut self) {
        let data = match self
            .control
            .set_mode(MODE_MEASURE)
            .and_then(|()| self.control.read_data())
        {
            Ok(data) => data,
            Err(e) => {
                warn!(?e, "Magnetometer read failed, keeping previous field");
                self.status = SampleStatus::ReadError;
                return;
            }
        };

        let [st, tmps, hx, hy, hz] = data;
        let raw = [hx, hy, hz];
        trace!(st, tmps, ?raw, "Magnetometer sample");
        self.temperature_raw = Some(tmps);
        self.raw = Some(RawSample::now(IVec3::from(raw.map(i32::from))));

        if raw.iter().any(|&v| v == ADC_MIN || v == ADC_MAX) {
            self.status = SampleStatus::Overflow;
            self.recenter(raw);
            return;
        }

        if self.window.len() == self.window_len {
            self.window.pop_front();
        }
        self.window.push_back(self.to_microtesla(raw));
        self.field = self.window.iter().copied().sum::<Vec3>() / self.window.len() as f32;
        self.status = SampleStatus::Valid;
    }

    fn wait_start(&self) -> Result<(), ChipError> {
        self.control.wait_open()?;
        Ok(())
    }

    fn wait_stop(&self) -> Result<(), ChipError> {
        self.control.wait_close()?;
        Ok(())
    }

    fn update_interval(&self) -> Duration {
        requested_interval(self.control.as_ref(), self.interval)
    }
}

/// The configured interval, stretched to the HAL's requested delay when longer.
fn requested_interval(control: &dyn MagnetometerControl, minimum: Duration) -> Duration {
    match control.requested_delay() {
        Ok(Some(delay)) => delay.max(minimum),
        Ok(None) => minimum,
        Err(e) => {
            trace!(?e, "No requested delay");
            minimum
        }
    }
}

/// Start/stop signalling half of the AKM8973.
///
/// The orchestrator blocks on this from its own thread while the sampling
/// thread owns the [`Akm8973`] itself.
#[derive(Clone)]
pub struct ControlSignal {
    control: Arc<dyn MagnetometerControl>,
    interval: Duration,
}

impl ChipReader for ControlSignal {
    fn start(&mut self) -> Result<(), ChipError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        Ok(())
    }

    fn measure(&mut self) {}

    fn wait_start(&self) -> Result<(), ChipError> {
        self.control.wait_open()?;
        Ok(())
    }

    fn wait_stop(&self) -> Result<(), ChipError> {
        self.control.wait_close()?;
        Ok(())
    }

    fn update_interval(&self) -> Duration {
        requested_interval(self.control.as_ref(), self.interval)
    }
}
