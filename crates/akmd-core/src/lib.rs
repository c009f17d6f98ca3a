//! Sampling orchestration for the compass daemon.
//!
//! [`Akmd`] bundles the chip readers into one measurer, [`SamplingLoop`]
//! runs it on a background thread, and [`Orchestrator`] ties both to the
//! kernel's enable/disable signal.

pub mod composite;
pub mod measurer;
pub mod orchestrator;
pub mod sampler;

pub use composite::CompositeResult;
pub use measurer::Akmd;
pub use orchestrator::Orchestrator;
pub use sampler::{SamplingLoop, SamplingLoopState};

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("sampling thread already running")]
    AlreadyRunning,
    #[error("sampling thread not running")]
    NotRunning,
    #[error("stop must be requested before joining the sampling thread")]
    StopNotRequested,
    #[error("failed to spawn sampling thread")]
    Spawn(#[source] io::Error),
    #[error("sampling thread panicked")]
    Panicked,
    #[error("measurer is owned by a running sampling thread")]
    MeasurerMissing,
}

#[cfg(test)]
pub(crate) mod testing;
