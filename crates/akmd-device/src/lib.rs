//! Kernel-facing contract of the compass daemon.
//!
//! Everything here talks to character devices: ioctl request encoding, the
//! `input_event` record layout, and one node type per chip. The sensor
//! layer only sees the `*Control` / [`input::EventSource`] traits, so the
//! numbers below are the single place where the bit-exact contract with the
//! kernel drivers (and the HAL reading the same nodes) lives.

pub mod akm8973;
pub mod bma150;
pub mod input;
pub mod ioctl;
pub mod kxtf9;

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{request} ioctl failed")]
    Ioctl {
        request: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Read from {} failed", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No input device named {0:?}")]
    InputNotFound(String),
}

impl DeviceError {
    pub(crate) fn ioctl(request: &'static str) -> impl FnOnce(io::Error) -> Self {
        move |source| Self::Ioctl { request, source }
    }
}

/// Open a control node read/write.
pub(crate) fn open_rw(path: &Path) -> Result<File, DeviceError> {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| DeviceError::Open {
            path: path.to_path_buf(),
            source,
        })
}
