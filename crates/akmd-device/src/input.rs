//! `struct input_event` records from evdev nodes.

use crate::ioctl::{ioctl_with, ior};
use crate::DeviceError;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read};
use std::mem::size_of;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const EV_SYN: u16 = 0x00;
pub const EV_ABS: u16 = 0x03;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_Z: u16 = 0x02;
pub const ABS_MISC: u16 = 0x28;

/// `timeval` is two native `long`s.
const TIME_FIELD_LEN: usize = size_of::<libc::c_long>();

/// Size of one record: timeval + type (u16) + code (u16) + value (i32).
pub const EVENT_SIZE: usize = 2 * TIME_FIELD_LEN + 8;

/// Records pulled per read.
const READ_BATCH: usize = 32;

const INPUT_DIR: &str = "/dev/input";
const NAME_LEN: usize = 80;
const EVIOCGNAME: u32 = ior::<[u8; NAME_LEN]>(b'E' as u32, 0x06);

/// One decoded input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Kernel timestamp.
    pub time: Duration,
    /// `EV_*` type.
    pub kind: u16,
    /// Axis or key code.
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self {
            time: Duration::ZERO,
            kind,
            code,
            value,
        }
    }

    /// Decode one native-layout record. `record` must be `EVENT_SIZE` long.
    pub fn decode(record: &[u8]) -> Option<Self> {
        if record.len() != EVENT_SIZE {
            return None;
        }
        let sec = read_long(&record[..TIME_FIELD_LEN]);
        let usec = read_long(&record[TIME_FIELD_LEN..2 * TIME_FIELD_LEN]);
        let tail = &record[2 * TIME_FIELD_LEN..];

        let time = Duration::from_secs(sec.max(0) as u64)
            + Duration::from_micros(usec.clamp(0, 999_999) as u64);
        Some(Self {
            time,
            kind: u16::from_ne_bytes([tail[0], tail[1]]),
            code: u16::from_ne_bytes([tail[2], tail[3]]),
            value: i32::from_ne_bytes([tail[4], tail[5], tail[6], tail[7]]),
        })
    }

    /// Encode into the native record layout the kernel produces.
    pub fn encode(&self) -> [u8; EVENT_SIZE] {
        let mut out = [0u8; EVENT_SIZE];
        let sec = self.time.as_secs() as libc::c_long;
        let usec = self.time.subsec_micros() as libc::c_long;
        out[..TIME_FIELD_LEN].copy_from_slice(&sec.to_ne_bytes());
        out[TIME_FIELD_LEN..2 * TIME_FIELD_LEN].copy_from_slice(&usec.to_ne_bytes());
        let tail = &mut out[2 * TIME_FIELD_LEN..];
        tail[0..2].copy_from_slice(&self.kind.to_ne_bytes());
        tail[2..4].copy_from_slice(&self.code.to_ne_bytes());
        tail[4..8].copy_from_slice(&self.value.to_ne_bytes());
        out
    }
}

fn read_long(bytes: &[u8]) -> i64 {
    let mut buf = [0u8; TIME_FIELD_LEN];
    buf.copy_from_slice(bytes);
    libc::c_long::from_ne_bytes(buf) as i64
}

/// Streaming parser for evdev reads.
///
/// Feed raw bytes via `push_data`, then drain complete records via `next_event`.
/// A record split across two reads is held until its tail arrives.
#[derive(Debug, Default)]
pub struct EventParser {
    buffer: VecDeque<u8>,
}

impl EventParser {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(EVENT_SIZE * READ_BATCH),
        }
    }

    pub fn push_data(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Next complete record, or `None` if fewer than `EVENT_SIZE` bytes are buffered.
    pub fn next_event(&mut self) -> Option<InputEvent> {
        if self.buffer.len() < EVENT_SIZE {
            return None;
        }
        let record: Vec<u8> = self.buffer.drain(..EVENT_SIZE).collect();
        InputEvent::decode(&record)
    }

    /// Bytes held back waiting for the rest of a record.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Source of input events for a chip reader.
pub trait EventSource: Send {
    /// Wait up to `timeout` for data and return every complete record that arrived.
    /// An empty vector means the timeout elapsed.
    fn read_events(&mut self, timeout: Duration) -> Result<Vec<InputEvent>, DeviceError>;
}

/// An opened `/dev/input/eventN` node.
pub struct EventDevice {
    file: File,
    path: PathBuf,
    parser: EventParser,
}

impl EventDevice {
    pub fn open(path: &Path) -> Result<Self, DeviceError> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|source| DeviceError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), "Opened input device");
        Ok(Self {
            file,
            path: path.to_path_buf(),
            parser: EventParser::new(),
        })
    }

    /// Open the input node whose driver registered under `name`.
    pub fn open_by_name(name: &str) -> Result<Self, DeviceError> {
        let path = find_by_name(Path::new(INPUT_DIR), name)?;
        Self::open(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, source: io::Error) -> DeviceError {
        DeviceError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

impl EventSource for EventDevice {
    fn read_events(&mut self, timeout: Duration) -> Result<Vec<InputEvent>, DeviceError> {
        if !poll_readable(&self.file, timeout).map_err(|e| self.read_error(e))? {
            return Ok(Vec::new());
        }

        let mut buf = [0u8; EVENT_SIZE * READ_BATCH];
        match self.file.read(&mut buf) {
            Ok(n) => self.parser.push_data(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
            Err(e) => return Err(self.read_error(e)),
        }

        let mut events = Vec::new();
        while let Some(event) = self.parser.next_event() {
            events.push(event);
        }
        Ok(events)
    }
}

/// Block until `file` is readable or `timeout` passes.
fn poll_readable(file: &File, timeout: Duration) -> io::Result<bool> {
    let mut fds = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    // SAFETY: one valid pollfd, count 1.
    let ret = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
    match ret {
        n if n < 0 => {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            }
        }
        0 => Ok(false),
        _ => Ok(fds.revents & libc::POLLIN != 0),
    }
}

/// Scan `dir` for an `event*` node whose `EVIOCGNAME` matches `name`.
pub fn find_by_name(dir: &Path, name: &str) -> Result<PathBuf, DeviceError> {
    let entries = std::fs::read_dir(dir).map_err(|source| DeviceError::Open {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let is_event_node = path
            .file_name()
            .and_then(|f| f.to_str())
            .is_some_and(|f| f.starts_with("event"));
        if !is_event_node {
            continue;
        }

        let Ok(file) = File::open(&path) else {
            tracing::trace!(path = %path.display(), "Skipping unreadable input node");
            continue;
        };
        let mut raw = [0u8; NAME_LEN];
        if ioctl_with(&file, EVIOCGNAME, &mut raw).is_err() {
            continue;
        }
        if device_name(&raw) == name {
            tracing::debug!(path = %path.display(), name, "Found input device");
            return Ok(path);
        }
    }

    Err(DeviceError::InputNotFound(name.to_string()))
}

/// NUL-terminated name as returned by `EVIOCGNAME`.
fn device_name(raw: &[u8]) -> &str {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).unwrap_or("")
}
