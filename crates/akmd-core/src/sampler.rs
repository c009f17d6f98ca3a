use crate::SamplerError;
use akmd_sensors::ChipReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingLoopState {
    Idle,
    Running,
    /// The flag is set; the thread finishes its current cycle and exits.
    StopRequested,
}

/// Background measure/sleep loop over a measurer.
///
/// The measurer is moved into the thread on `spawn` and handed back by
/// `join`; while the thread runs, nothing else can reach it.
pub struct SamplingLoop<R> {
    measurer: Option<R>,
    state: SamplingLoopState,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<R>>,
}

impl<R: ChipReader + 'static> SamplingLoop<R> {
    pub fn new(measurer: R) -> Self {
        Self {
            measurer: Some(measurer),
            state: SamplingLoopState::Idle,
            cancel: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn state(&self) -> SamplingLoopState {
        self.state
    }

    /// The measurer, while no thread owns it.
    pub fn measurer(&self) -> Option<&R> {
        self.measurer.as_ref()
    }

    pub fn measurer_mut(&mut self) -> Result<&mut R, SamplerError> {
        self.measurer.as_mut().ok_or(SamplerError::MeasurerMissing)
    }

    /// Idle -> Running.
    pub fn spawn(&mut self) -> Result<(), SamplerError> {
        if self.state != SamplingLoopState::Idle {
            return Err(SamplerError::AlreadyRunning);
        }
        let mut measurer = self.measurer.take().ok_or(SamplerError::MeasurerMissing)?;
        self.cancel.store(false, Ordering::Release);
        let cancel = self.cancel.clone();

        let handle = thread::Builder::new()
            .name("akmd-sampler".into())
            .spawn(move || {
                debug!("Sampling thread started");
                while !cancel.load(Ordering::Acquire) {
                    measurer.measure();
                    measurer.sleep_until_next_update();
                }
                debug!("Sampling thread exiting");
                measurer
            })
            .map_err(SamplerError::Spawn)?;

        self.handle = Some(handle);
        self.state = SamplingLoopState::Running;
        Ok(())
    }

    /// Running -> StopRequested. Returns without waiting for the thread.
    pub fn request_stop(&mut self) -> Result<(), SamplerError> {
        if self.state != SamplingLoopState::Running {
            return Err(SamplerError::NotRunning);
        }
        self.cancel.store(true, Ordering::Release);
        self.state = SamplingLoopState::StopRequested;
        Ok(())
    }

    /// StopRequested -> Idle, taking the measurer back from the thread.
    pub fn join(&mut self) -> Result<(), SamplerError> {
        match self.state {
            SamplingLoopState::Idle => return Err(SamplerError::NotRunning),
            SamplingLoopState::Running => return Err(SamplerError::StopNotRequested),
            SamplingLoopState::StopRequested => {}
        }
        let handle = self.handle.take().ok_or(SamplerError::NotRunning)?;
        self.state = SamplingLoopState::Idle;
        let measurer = handle.join().map_err(|_| SamplerError::Panicked)?;
        self.measurer = Some(measurer);
        Ok(())
    }
}

impl<R> Drop for SamplingLoop<R> {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Sampling thread panicked");
            }
        }
    }
}
