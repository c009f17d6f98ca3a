use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Kernel device nodes.
    pub devices: DeviceConfig,
    /// Sampling loop tuning.
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// AKM8973 daemon node: register access, enable/disable waits and result publishing.
    pub akm_daemon: PathBuf,
    /// BMA150 control node (hero).
    pub bma150: PathBuf,
    /// KXTF9 control node (jordan).
    pub kxtf9: PathBuf,
    /// Input device name the KXTF9 driver registers its event node under.
    pub kxtf9_input_name: String,
    /// Explicit KXTF9 event node. `None` means look it up by name.
    pub kxtf9_input: Option<PathBuf>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            akm_daemon: PathBuf::from("/dev/akm8973_daemon"),
            bma150: PathBuf::from("/dev/bma150"),
            kxtf9: PathBuf::from("/dev/kxtf9"),
            kxtf9_input_name: "accelerometer".into(),
            kxtf9_input: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Minimum time between two sampling cycles, in milliseconds.
    /// The kernel may request a longer delay at runtime.
    pub interval_ms: u64,
    /// Number of valid magnetometer samples in the moving average.
    pub filter_len: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            filter_len: 4,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn filter_len(&self) -> usize {
        self.filter_len.max(1)
    }
}
