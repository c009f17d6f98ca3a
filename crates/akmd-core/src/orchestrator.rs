use crate::sampler::SamplingLoop;
use crate::SamplerError;
use akmd_sensors::{ChipError, ChipReader};
use std::convert::Infallible;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

/// Pause before retrying a failed wait on the control node.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Drives the measurer through the kernel's open/close cycles.
///
/// The signal reader is only ever waited on; the measurer is only ever
/// started, handed to the sampling thread, and stopped.
pub struct Orchestrator<S, R> {
    signal: S,
    sampler: SamplingLoop<R>,
    retry_delay: Duration,
    cycles: u64,
}

impl<S: ChipReader, R: ChipReader + 'static> Orchestrator<S, R> {
    pub fn new(signal: S, measurer: R) -> Self {
        Self {
            signal,
            sampler: SamplingLoop::new(measurer),
            retry_delay: RETRY_DELAY,
            cycles: 0,
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn sampler(&self) -> &SamplingLoop<R> {
        &self.sampler
    }

    /// Completed open/close cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycle forever. Only a lost or panicked sampling thread ends the loop.
    pub fn run(mut self) -> Result<Infallible, SamplerError> {
        loop {
            self.run_cycle()?;
        }
    }

    /// One enable/disable cycle: wait for an opener, sample until the last
    /// one closes, then power everything down.
    pub fn run_cycle(&mut self) -> Result<(), SamplerError> {
        self.wait("open", |s| s.wait_start());
        info!(cycle = self.cycles, "Sensors enabled");

        if let Err(e) = self.sampler.measurer_mut()?.start() {
            error!(?e, "Failed to start sensors");
            self.stop_measurer()?;
            // Stay in step with the kernel's open/close pairing.
            self.wait("close", |s| s.wait_stop());
            self.cycles += 1;
            return Ok(());
        }
        self.sampler.spawn()?;

        self.wait("close", |s| s.wait_stop());
        info!(cycle = self.cycles, "Sensors disabled");

        self.sampler.request_stop()?;
        self.sampler.join()?;
        self.stop_measurer()?;
        self.cycles += 1;
        Ok(())
    }

    fn stop_measurer(&mut self) -> Result<(), SamplerError> {
        if let Err(e) = self.sampler.measurer_mut()?.stop() {
            warn!(?e, "Failed to stop sensors");
        }
        Ok(())
    }

    /// Block on the signal reader until `op` succeeds.
    fn wait(&self, what: &str, op: impl Fn(&S) -> Result<(), ChipError>) {
        loop {
            match op(&self.signal) {
                Ok(()) => return,
                Err(e) => {
                    warn!(?e, "Waiting for {what} failed, retrying");
                    thread::sleep(self.retry_delay);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::SamplingLoopState;
    use crate::testing::{rig, Rig};
    use akmd_device::DeviceError;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Control node driven from the test: `true` wakes the waiter, `false`
    /// makes the wait fail.
    struct ScriptedSignal {
        opens: Receiver<bool>,
        closes: Receiver<bool>,
        attempts: Arc<AtomicUsize>,
    }

    struct Script {
        opens: Sender<bool>,
        closes: Sender<bool>,
        attempts: Arc<AtomicUsize>,
    }

    fn scripted() -> (ScriptedSignal, Script) {
        let (open_tx, open_rx) = mpsc::channel();
        let (close_tx, close_rx) = mpsc::channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        (
            ScriptedSignal {
                opens: open_rx,
                closes: close_rx,
                attempts: attempts.clone(),
            },
            Script {
                opens: open_tx,
                closes: close_tx,
                attempts,
            },
        )
    }

    fn wait_on(rx: &Receiver<bool>, attempts: &AtomicUsize) -> Result<(), ChipError> {
        attempts.fetch_add(1, Ordering::SeqCst);
        match rx.recv() {
            Ok(true) => Ok(()),
            _ => Err(DeviceError::Ioctl {
                request: "ECS_IOCTL_GET_OPEN_STATUS",
                source: io::Error::from(io::ErrorKind::Interrupted),
            }
            .into()),
        }
    }

    impl ChipReader for ScriptedSignal {
        fn start(&mut self) -> Result<(), ChipError> {
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ChipError> {
            Ok(())
        }

        fn measure(&mut self) {}

        fn wait_start(&self) -> Result<(), ChipError> {
            wait_on(&self.opens, &self.attempts)
        }

        fn wait_stop(&self) -> Result<(), ChipError> {
            wait_on(&self.closes, &self.attempts)
        }

        fn update_interval(&self) -> Duration {
            Duration::from_millis(1)
        }
    }

    /// Measurer that records its lifecycle calls.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_start: bool,
    }

    impl ChipReader for Recorder {
        fn start(&mut self) -> Result<(), ChipError> {
            self.calls.lock().unwrap().push("start");
            if self.fail_start {
                return Err(DeviceError::InputNotFound("accelerometer".into()).into());
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ChipError> {
            self.calls.lock().unwrap().push("stop");
            Ok(())
        }

        fn measure(&mut self) {
            self.calls.lock().unwrap().push("measure");
        }

        fn update_interval(&self) -> Duration {
            Duration::from_millis(2)
        }
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        done()
    }

    #[test]
    fn cycle_starts_samples_and_stops() {
        let (signal, script) = scripted();
        let recorder = Recorder::default();
        let calls = recorder.calls.clone();
        let mut orchestrator = Orchestrator::new(signal, recorder);

        let worker = thread::spawn(move || {
            orchestrator.run_cycle().unwrap();
            orchestrator
        });
        script.opens.send(true).unwrap();
        assert!(wait_until(Duration::from_secs(2), || {
            calls.lock().unwrap().iter().filter(|&&c| c == "measure").count() >= 3
        }));
        script.closes.send(true).unwrap();
        let orchestrator = worker.join().unwrap();

        let calls = calls.lock().unwrap().clone();
        assert_eq!(calls.first(), Some(&"start"));
        assert_eq!(calls.last(), Some(&"stop"));
        assert_eq!(calls.iter().filter(|&&c| c == "start").count(), 1);
        assert_eq!(orchestrator.sampler().state(), SamplingLoopState::Idle);
        assert_eq!(orchestrator.cycles(), 1);
    }

    #[test]
    fn failed_waits_are_retried() {
        let (signal, script) = scripted();
        let mut orchestrator =
            Orchestrator::new(signal, Recorder::default()).with_retry_delay(Duration::from_millis(1));

        script.opens.send(false).unwrap();
        script.opens.send(true).unwrap();
        script.closes.send(false).unwrap();
        script.closes.send(true).unwrap();
        orchestrator.run_cycle().unwrap();

        assert_eq!(script.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(orchestrator.cycles(), 1);
    }

    #[test]
    fn failed_start_skips_sampling_but_follows_close() {
        let (signal, script) = scripted();
        let recorder = Recorder {
            fail_start: true,
            ..Recorder::default()
        };
        let calls = recorder.calls.clone();
        let mut orchestrator = Orchestrator::new(signal, recorder);

        script.opens.send(true).unwrap();
        script.closes.send(true).unwrap();
        orchestrator.run_cycle().unwrap();

        assert_eq!(*calls.lock().unwrap(), vec!["start", "stop"]);
        assert_eq!(orchestrator.sampler().state(), SamplingLoopState::Idle);
    }

    #[test]
    fn repeated_cycles_publish_through_magnetometer() {
        let Rig { akmd, akm, bma } = rig();
        let (signal, script) = scripted();
        let mut orchestrator = Orchestrator::new(signal, akmd);

        for _ in 0..4 {
            bma.push([0, 0, 256]);
            akm.push_read([0, 98, 128, 128 + 25, 128 - 50]);
        }
        let worker = thread::spawn(move || {
            for _ in 0..2 {
                orchestrator.run_cycle().unwrap();
            }
            orchestrator
        });

        for _ in 0..2 {
            let before = akm.published().len();
            script.opens.send(true).unwrap();
            assert!(wait_until(Duration::from_secs(2), || akm.published().len() > before));
            script.closes.send(true).unwrap();
        }
        let orchestrator = worker.join().unwrap();

        assert_eq!(orchestrator.cycles(), 2);
        let measurer = orchestrator.sampler().measurer().unwrap();
        assert!(measurer.sample_count() >= 1);
        // BMA150: init and wake on the first cycle, sleep, then wake and sleep again.
        assert_eq!(bma.calls(), vec!["init", "mode", "mode", "mode", "mode"]);
        // The first published record carries the scripted flat, north-facing sample.
        assert_eq!(&akm.published()[0][..6], &[0, 0, 0, 20, 3, 3]);
    }
}
