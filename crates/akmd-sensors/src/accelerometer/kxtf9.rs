use crate::types::{RawSample, RotationHint, GRAVITY_EARTH};
use crate::{ChipError, ChipReader};
use akmd_device::input::{EventSource, InputEvent, ABS_MISC, ABS_X, ABS_Y, ABS_Z, EV_ABS, EV_SYN};
use akmd_device::kxtf9::{Kxtf9Control, ROTATION_MASK};
use glam::{IVec3, Vec3};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The driver reports milli-g.
const CONVERT_A: f32 = GRAVITY_EARTH / 1000.0;

/// Screen-down / screen-up bits of an `ABS_MISC` value.
const PITCH_MASK: i32 = 0x03;

/// Roll codes of the `ABS_MISC` rotation state, in quarter turns:
/// 0x04 portrait, 0x20 landscape with the USB port down, 0x08 portrait
/// reversed, 0x10 landscape with the USB port up.
const ROLL_CODES: [(i32, u8); 4] = [(0x04, 0), (0x20, 1), (0x08, 2), (0x10, 3)];

/// Look up the roll (quarter turns) for a masked rotation state.
pub fn roll_from_code(state: i32) -> Option<u8> {
    ROLL_CODES
        .iter()
        .find(|&&(code, _)| code == state)
        .map(|&(_, quarter_turns)| quarter_turns)
}

/// KXTF9 fed from its input node (Motorola Milestone / Defy).
///
/// Axis events accumulate into a pending sample that becomes current at
/// `EV_SYN`. Unchanged axes are not repeated by evdev, so the pending
/// values carry over between frames.
pub struct Kxtf9 {
    control: Box<dyn Kxtf9Control>,
    events: Box<dyn EventSource>,
    interval: Duration,
    pending: IVec3,
    seen_axis: bool,
    acceleration: Vec3,
    raw: Option<RawSample>,
    rotation: Option<RotationHint>,
    started: bool,
}

impl Kxtf9 {
    pub fn new(control: Box<dyn Kxtf9Control>, events: Box<dyn EventSource>, interval: Duration) -> Self {
        Self {
            control,
            events,
            interval,
            pending: IVec3::ZERO,
            seen_axis: false,
            acceleration: Vec3::ZERO,
            raw: None,
            rotation: None,
            started: false,
        }
    }

    pub fn acceleration(&self) -> Vec3 {
        self.acceleration
    }

    pub fn last_sample(&self) -> Option<RawSample> {
        self.raw
    }

    pub fn rotation_hint(&self) -> Option<RotationHint> {
        self.rotation
    }

    fn process_event(&mut self, event: InputEvent) {
        match event.kind {
            EV_ABS => self.process_abs(event.code, event.value),
            EV_SYN => self.commit(),
            kind => warn!(kind, code = event.code, value = event.value, "KXTF9: unknown event"),
        }
    }

    fn process_abs(&mut self, code: u16, value: i32) {
        match code {
            ABS_X => self.set_axis(0, value),
            ABS_Y => self.set_axis(1, value),
            ABS_Z => self.set_axis(2, value),
            ABS_MISC => self.update_rotation(value),
            code => warn!(code, value, "KXTF9: unknown axis"),
        }
    }

    fn set_axis(&mut self, axis: usize, value: i32) {
        self.pending[axis] = value;
        self.seen_axis = true;
    }

    fn commit(&mut self) {
        if !self.seen_axis {
            return;
        }
        self.acceleration = self.pending.as_vec3() * CONVERT_A;
        self.raw = Some(RawSample::now(self.pending));
    }

    fn update_rotation(&mut self, value: i32) {
        let state = value & ROTATION_MASK;
        let mut hint = self.rotation.unwrap_or_default();
        // Codes outside the table keep the previous roll.
        if let Some(quarter_turns) = roll_from_code(state) {
            hint.roll_quarter_turns = Some(quarter_turns);
        }
        hint.pitch = (value & PITCH_MASK) as u8;
        debug!(value, state, ?hint, "KXTF9: rotation event");
        self.rotation = Some(hint);
    }
}

impl ChipReader for Kxtf9 {
    fn start(&mut self) -> Result<(), ChipError> {
        if self.started {
            return Ok(());
        }
        self.control.set_enable(true)?;
        self.control.set_delay(self.interval)?;
        self.pending = IVec3::ZERO;
        self.seen_axis = false;
        self.acceleration = Vec3::ZERO;
        self.raw = None;
        self.rotation = None;
        self.started = true;
        info!(delay_ms = self.interval.as_millis() as u64, "KXTF9 enabled");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ChipError> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        self.control.set_enable(false)?;
        info!("KXTF9 disabled");
        Ok(())
    }

    fn measure(&mut self) {
        let events = match self.events.read_events(self.interval) {
            Ok(events) => events,
            Err(e) => {
                warn!(?e, "KXTF9 read failed, keeping previous acceleration");
                return;
            }
        };
        for event in events {
            self.process_event(event);
        }
    }

    fn update_interval(&self) -> Duration {
        self.interval
    }
}
