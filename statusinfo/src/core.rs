//! Status reactor and main loop.
//!
//! The `Reactor` waits on up to three readiness sources (device events,
//! termination signals, mixer events) with an adaptive timeout:
//!
//! - a notification (device or mixer) is emitted on its own and the next
//!   refresh is scheduled after the short notify interval;
//! - a timeout, or a notification that produced nothing to show, emits the
//!   full periodic line and schedules the next refresh after the long
//!   status interval;
//! - a termination signal ends the loop.
//!
//! POLLERR/POLLNVAL on any source, a source that hung up with nothing left
//! to read, and sink failures are fatal.

use std::os::fd::AsFd;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use statusinfo_common::config::StatusConfig;
use statusinfo_common::consts::INITIAL_TIMEOUT_MS;
use statusinfo_common::status::StatusLine;
use tracing::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::composer::Composer;
use crate::error::{SinkError, StatusError};
use crate::mixer::{AudioSource, MixerSnapshot};
use crate::sink::{StatusSink, emit_closing_line};
use crate::sources::{DeviceSource, TerminationSource};

/// Returned revents of one wait.
#[derive(Debug, Clone, Copy)]
struct Readiness {
    device: PollFlags,
    termination: PollFlags,
    audio: PollFlags,
}

impl Readiness {
    fn is_timeout(&self) -> bool {
        self.device.is_empty() && self.termination.is_empty() && self.audio.is_empty()
    }

    /// First source reporting an error condition.
    fn failed_source(&self) -> Option<&'static str> {
        [
            (self.device, "udev"),
            (self.termination, "signal"),
            (self.audio, "mixer"),
        ]
        .into_iter()
        .find(|(flags, _)| is_failed(*flags))
        .map(|(_, name)| name)
    }
}

/// Error condition, or a hang-up with nothing left to read.
///
/// A hung-up source stays ready forever and would never let the loop idle.
fn is_failed(flags: PollFlags) -> bool {
    flags.intersects(PollFlags::POLLERR | PollFlags::POLLNVAL)
        || (flags.contains(PollFlags::POLLHUP) && !flags.contains(PollFlags::POLLIN))
}

/// Poll timeout covering `remaining`, rounded up to whole milliseconds.
fn poll_timeout(remaining: Duration) -> PollTimeout {
    PollTimeout::try_from(remaining.as_micros().div_ceil(1000)).unwrap_or(PollTimeout::MAX)
}

/// Cycle counters, logged on exit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    /// Periodic lines emitted.
    pub periodic: u64,
    /// Notification lines emitted.
    pub notifications: u64,
    /// Wakeups that produced no output.
    pub idle_wakeups: u64,
}

/// Event reactor driving the status line.
pub struct Reactor {
    composer: Composer,
    classifier: Classifier,
    devices: Option<Box<dyn DeviceSource>>,
    termination: Box<dyn TerminationSource>,
    audio: Option<Box<dyn AudioSource>>,
    sink: Box<dyn StatusSink>,
    initial_timeout: Duration,
    status_timeout: Duration,
    notify_timeout: Duration,
    /// Latest mixer state; only valid in the cycle its event fired.
    mixer_state: Option<MixerSnapshot>,
    stats: CycleStats,
}

impl Reactor {
    /// Create a reactor with only the timer and the termination source.
    pub fn new(
        config: &StatusConfig,
        composer: Composer,
        classifier: Classifier,
        termination: Box<dyn TerminationSource>,
        sink: Box<dyn StatusSink>,
    ) -> Self {
        Self {
            composer,
            classifier,
            devices: None,
            termination,
            audio: None,
            sink,
            initial_timeout: Duration::from_millis(INITIAL_TIMEOUT_MS),
            status_timeout: config.status_timeout(),
            notify_timeout: config.notify_timeout(),
            mixer_state: None,
            stats: CycleStats::default(),
        }
    }

    /// Watch device events.
    pub fn with_devices(mut self, devices: Box<dyn DeviceSource>) -> Self {
        self.devices = Some(devices);
        self
    }

    /// Watch mixer events.
    pub fn with_audio(mut self, audio: Box<dyn AudioSource>) -> Self {
        self.audio = Some(audio);
        self
    }

    /// Override the timeout of the first wait.
    pub fn with_initial_timeout(mut self, timeout: Duration) -> Self {
        self.initial_timeout = timeout;
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Mixer state of the last cycle, if a mixer event fired in it.
    pub fn mixer_state(&self) -> Option<&MixerSnapshot> {
        self.mixer_state.as_ref()
    }

    /// Run until a termination signal arrives.
    ///
    /// Returns the name of the signal (if it could be read).
    ///
    /// # Errors
    /// Poll failures, POLLERR/POLLNVAL on a source and sink errors.
    pub fn run(&mut self) -> Result<Option<String>, StatusError> {
        info!(
            "Reactor started (udev={}, mixer={}, sink={}, status={}ms, notify={}ms)",
            self.devices.is_some(),
            self.audio.is_some(),
            self.sink.name(),
            self.status_timeout.as_millis(),
            self.notify_timeout.as_millis()
        );

        let mut deadline = Instant::now() + self.initial_timeout;
        loop {
            let ready = self.wait(deadline.saturating_duration_since(Instant::now()))?;

            if let Some(source_name) = ready.failed_source() {
                error!("Poll error on {source_name} source");
                return Err(StatusError::PollFlag { source_name });
            }

            if ready.is_timeout() {
                // Waits are capped by the poll timeout range; keep waiting.
                if Instant::now() < deadline {
                    continue;
                }
                self.refresh()?;
                deadline = Instant::now() + self.status_timeout;
                continue;
            }

            self.mixer_state = None;
            let mut notified = false;
            let mut line = StatusLine::new();

            if ready.device.contains(PollFlags::POLLIN) {
                if let Some(device_line) = self.device_notification() {
                    line = device_line;
                    notified = true;
                }
            }

            if ready.termination.contains(PollFlags::POLLIN) {
                let signal = self.termination.read_signal();
                info!(
                    "{} received, stopping after {} periodic and {} notification lines",
                    signal.as_deref().unwrap_or("termination request"),
                    self.stats.periodic,
                    self.stats.notifications
                );
                return Ok(signal);
            }

            if ready.audio.contains(PollFlags::POLLIN) {
                notified = true;
                if let Some(mixer_line) = self.mixer_notification() {
                    line = mixer_line;
                }
            }

            if !line.is_empty() {
                self.sink.emit(line.as_str())?;
                self.stats.notifications += 1;
                deadline = Instant::now() + self.notify_timeout;
            } else if notified {
                self.refresh()?;
                deadline = Instant::now() + self.status_timeout;
            } else {
                self.stats.idle_wakeups += 1;
            }
        }
    }

    /// Emit the closing line.
    pub fn close(&mut self) -> Result<(), SinkError> {
        emit_closing_line(self.sink.as_mut())
    }

    fn wait(&self, timeout: Duration) -> Result<Readiness, StatusError> {
        let mut fds = Vec::with_capacity(3);
        let mut device_slot = None;
        let mut audio_slot = None;

        fds.push(PollFd::new(self.termination.as_fd(), PollFlags::POLLIN));
        if let Some(devices) = &self.devices {
            device_slot = Some(fds.len());
            fds.push(PollFd::new(devices.as_fd(), PollFlags::POLLIN));
        }
        if let Some(audio) = &self.audio {
            audio_slot = Some(fds.len());
            fds.push(PollFd::new(audio.as_fd(), PollFlags::POLLIN));
        }

        let timeout = poll_timeout(timeout);
        loop {
            match poll(&mut fds, timeout) {
                Ok(_) => break,
                Err(Errno::EINTR) => continue,
                Err(source) => {
                    error!("poll failed: {source}");
                    return Err(StatusError::Poll { source });
                }
            }
        }

        let revents = |slot: Option<usize>| {
            slot.and_then(|i| fds.get(i))
                .and_then(|fd| fd.revents())
                .unwrap_or(PollFlags::empty())
        };
        Ok(Readiness {
            termination: revents(Some(0)),
            device: revents(device_slot),
            audio: revents(audio_slot),
        })
    }

    /// Line for one pending device event; `None` when nothing was received.
    fn device_notification(&mut self) -> Option<StatusLine> {
        let devices = self.devices.as_mut()?;
        match devices.receive() {
            Ok(Some(event)) => {
                debug!(
                    "Device event: {} {} ({})",
                    event.action(),
                    event.sysname(),
                    event.subsystem().unwrap_or("-")
                );
                Some(
                    self.classifier
                        .classify(&event)
                        .map(|slots| slots.assemble())
                        .unwrap_or_default(),
                )
            }
            Ok(None) => {
                debug!("No watched device event pending");
                None
            }
            Err(e) => {
                warn!("Device event receive failed: {e}");
                None
            }
        }
    }

    /// Line for the mixer change, if a watched control changed.
    fn mixer_notification(&mut self) -> Option<StatusLine> {
        let audio = self.audio.as_mut()?;
        match audio.handle_events() {
            Ok(snapshot) => self.mixer_state = snapshot,
            Err(e) => warn!("Mixer event handling failed: {e}"),
        }
        self.mixer_state.as_ref().map(MixerSnapshot::render)
    }

    fn refresh(&mut self) -> Result<(), StatusError> {
        let line = self.composer.compose();
        self.sink.emit(line.as_str())?;
        self.stats.periodic += 1;
        Ok(())
    }
}
