//! Reactor integration tests.
//!
//! Drives the full loop with socketpair-backed sources: a stub network, a
//! temporary sysfs tree, a recording sink that requests termination after a
//! number of lines, and scripted device and mixer sources.

use std::collections::VecDeque;
use std::fs;
use std::io::{Read, Write};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use statusinfo::classifier::{Classifier, ClassifierContext};
use statusinfo::composer::Composer;
use statusinfo::core::{CycleStats, Reactor};
use statusinfo::error::{MixerError, SinkError, StatusError, UeventError};
use statusinfo::mixer::{AudioSource, ChannelState, MixerSnapshot};
use statusinfo::net::NetworkProbe;
use statusinfo::sink::StatusSink;
use statusinfo::sources::{DeviceEvent, DeviceSource, TerminationSource};
use statusinfo_common::config::StatusConfig;
use statusinfo_common::status::Fragment;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct StubNetwork;

impl NetworkProbe for StubNetwork {
    fn summary(&mut self) -> Fragment {
        Fragment::from_text("e2:1000M ")
    }
}

/// Readable once a byte was written to the peer end.
struct PipeTermination {
    stream: UnixStream,
}

impl AsFd for PipeTermination {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl TerminationSource for PipeTermination {
    fn read_signal(&mut self) -> Option<String> {
        let mut byte = [0u8; 1];
        self.stream.read_exact(&mut byte).ok()?;
        Some("SIGTERM".to_string())
    }
}

/// Records every line; writes to the termination peer after `stop_after` lines.
struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
    stop_after: usize,
    terminate: UnixStream,
    fail: bool,
}

impl StatusSink for RecordingSink {
    fn emit(&mut self, line: &str) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Text(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )));
        }
        let mut lines = self.lines.lock().unwrap();
        lines.push(line.to_string());
        if lines.len() == self.stop_after {
            self.terminate.write_all(b"t").unwrap();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Device events queued behind a readable socket; one byte per event.
struct ScriptedDevices {
    stream: UnixStream,
    _peer: UnixStream,
    events: VecDeque<DeviceEvent>,
}

impl AsFd for ScriptedDevices {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl DeviceSource for ScriptedDevices {
    fn receive(&mut self) -> Result<Option<DeviceEvent>, UeventError> {
        let mut byte = [0u8; 1];
        self.stream.read_exact(&mut byte).map_err(UeventError::Io)?;
        Ok(self.events.pop_front())
    }
}

/// Mixer source reporting a fixed snapshot per wakeup.
struct ScriptedMixer {
    stream: UnixStream,
    snapshot: Option<MixerSnapshot>,
}

impl AsFd for ScriptedMixer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl AudioSource for ScriptedMixer {
    fn handle_events(&mut self) -> Result<Option<MixerSnapshot>, MixerError> {
        let mut byte = [0u8; 1];
        self.stream
            .read_exact(&mut byte)
            .map_err(|e| MixerError::Alsa(e.to_string()))?;
        Ok(self.snapshot.clone())
    }
}

/// Read end of a pipe whose writer is gone: POLLHUP without POLLIN.
struct HungUpMixer {
    fd: OwnedFd,
}

impl AsFd for HungUpMixer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AudioSource for HungUpMixer {
    fn handle_events(&mut self) -> Result<Option<MixerSnapshot>, MixerError> {
        Ok(None)
    }
}

fn hung_up_mixer() -> HungUpMixer {
    let (read, write) = nix::unistd::pipe().unwrap();
    drop(write);
    HungUpMixer { fd: read }
}

struct Harness {
    _sysfs: TempDir,
    config: StatusConfig,
    lines: Arc<Mutex<Vec<String>>>,
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn harness() -> Harness {
    let sysfs = TempDir::new().unwrap();
    write(sysfs.path(), "class/power_supply/BAT1/capacity", "64\n");
    let config = StatusConfig {
        sysfs_root: sysfs.path().to_path_buf(),
        status_timeout_ms: 40,
        notify_timeout_ms: 20,
        ..StatusConfig::default()
    };
    Harness {
        _sysfs: sysfs,
        config,
        lines: Arc::new(Mutex::new(Vec::new())),
    }
}

fn reactor(h: &Harness, stop_after: usize, fail: bool) -> Reactor {
    let (watch, terminate) = UnixStream::pair().unwrap();
    let sink = RecordingSink {
        lines: Arc::clone(&h.lines),
        stop_after,
        terminate,
        fail,
    };
    Reactor::new(
        &h.config,
        Composer::new(&h.config, Box::new(StubNetwork)),
        Classifier::new(ClassifierContext::from_config(&h.config)),
        Box::new(PipeTermination { stream: watch }),
        Box::new(sink),
    )
    .with_initial_timeout(Duration::from_millis(5))
}

fn device_dir(root: &Path, name: &str, attrs: &[(&str, &str)]) -> PathBuf {
    let dir = root.join("devices").join(name);
    fs::create_dir_all(&dir).unwrap();
    for (attr, value) in attrs {
        fs::write(dir.join(attr), value).unwrap();
    }
    dir
}

/// Scripted device source with every event already signalled.
fn devices(events: Vec<DeviceEvent>) -> ScriptedDevices {
    let (stream, mut peer) = UnixStream::pair().unwrap();
    peer.write_all(&vec![b'd'; events.len()]).unwrap();
    // A closed peer would keep the source readable (POLLHUP).
    ScriptedDevices {
        stream,
        _peer: peer,
        events: events.into(),
    }
}

fn is_periodic(line: &str) -> bool {
    line.starts_with("e2:1000M bat:64% ") && line.len() == "e2:1000M bat:64% ".len() + 16
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_periodic_refresh_until_termination() {
    let h = harness();
    let mut reactor = reactor(&h, 3, false);

    let started = Instant::now();
    let signal = reactor.run().unwrap();

    assert_eq!(signal.as_deref(), Some("SIGTERM"));
    assert!(started.elapsed() < Duration::from_secs(5));

    let lines = h.lines.lock().unwrap();
    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|l| is_periodic(l)), "{lines:?}");
    assert_eq!(
        reactor.stats(),
        CycleStats {
            periodic: 3,
            notifications: 0,
            idle_wakeups: 0
        }
    );
}

#[test]
fn test_close_emits_closing_line() {
    let h = harness();
    let mut reactor = reactor(&h, 1, false);
    reactor.run().unwrap();
    reactor.close().unwrap();

    let lines = h.lines.lock().unwrap();
    assert_eq!(lines.last().map(String::as_str), Some("Status Bar Closed"));
}

#[test]
fn test_device_notification_then_periodic_line() {
    let h = harness();
    let root = h.config.sysfs_root.clone();
    let backlight = device_dir(
        &root,
        "backlight",
        &[("actual_brightness", "96"), ("max_brightness", "255")],
    );
    let event = DeviceEvent::new("change", Some("backlight"), "amdgpu_bl0", backlight);

    let mut reactor = reactor(&h, 2, false).with_devices(Box::new(devices(vec![event])));
    reactor.run().unwrap();

    let lines = h.lines.lock().unwrap();
    assert_eq!(lines[0], "LCD: 37% ");
    assert!(is_periodic(&lines[1]), "{lines:?}");
    assert_eq!(reactor.stats().notifications, 1);
    assert_eq!(reactor.stats().periodic, 1);
}

#[test]
fn test_adaptor_event_reports_plug_state() {
    let h = harness();
    let root = h.config.sysfs_root.clone();
    let adaptor = device_dir(&root, "AC", &[("online", "0\n")]);
    let event = DeviceEvent::new("change", Some("power_supply"), "AC", adaptor);

    let mut reactor = reactor(&h, 1, false).with_devices(Box::new(devices(vec![event])));
    reactor.run().unwrap();

    let lines = h.lines.lock().unwrap();
    assert_eq!(lines[0], "power_supply: AC: Unplugged ");
}

#[test]
fn test_battery_event_forces_periodic_refresh() {
    let h = harness();
    let root = h.config.sysfs_root.clone();
    let battery = device_dir(&root, "BAT1", &[]);
    let event = DeviceEvent::new("change", Some("power_supply"), "BAT1", battery);

    // Long first timeout: the only way to get a line quickly is the event.
    let mut reactor = reactor(&h, 1, false)
        .with_initial_timeout(Duration::from_secs(30))
        .with_devices(Box::new(devices(vec![event])));

    let started = Instant::now();
    reactor.run().unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    let lines = h.lines.lock().unwrap();
    assert!(is_periodic(&lines[0]), "{lines:?}");
    assert_eq!(reactor.stats().notifications, 0);
    assert_eq!(reactor.stats().periodic, 1);
}

#[test]
fn test_mixer_notification_and_state() {
    let h = harness();
    let (stream, mut peer) = UnixStream::pair().unwrap();
    peer.write_all(b"m").unwrap();
    let snapshot = MixerSnapshot {
        control: "Master".into(),
        left: ChannelState {
            percent: Some(50),
            muted: false,
        },
        right: ChannelState {
            percent: Some(50),
            muted: false,
        },
    };
    let mixer = ScriptedMixer {
        stream,
        snapshot: Some(snapshot.clone()),
    };

    let mut reactor = reactor(&h, 1, false)
        .with_initial_timeout(Duration::from_secs(30))
        .with_audio(Box::new(mixer));
    reactor.run().unwrap();
    drop(peer);

    let lines = h.lines.lock().unwrap();
    assert_eq!(lines[0], "Master: 50%");
    assert_eq!(reactor.stats().notifications, 1);
}

#[test]
fn test_sink_failure_is_fatal() {
    let h = harness();
    let mut reactor = reactor(&h, 1, true);
    let err = reactor.run().unwrap_err();
    assert!(matches!(
        err,
        StatusError::Sink {
            source: SinkError::Text(_)
        }
    ));
}

#[test]
fn test_hung_up_source_is_fatal() {
    let h = harness();
    let mut reactor = reactor(&h, 100, false)
        .with_initial_timeout(Duration::from_secs(30))
        .with_audio(Box::new(hung_up_mixer()));

    let started = Instant::now();
    let err = reactor.run().unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(matches!(
        err,
        StatusError::PollFlag {
            source_name: "mixer"
        }
    ));
    assert!(h.lines.lock().unwrap().is_empty());
    assert_eq!(reactor.stats().idle_wakeups, 0);
}
