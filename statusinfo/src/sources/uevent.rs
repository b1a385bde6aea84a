//! Kernel device events (`NETLINK_KOBJECT_UEVENT`).
//!
//! Each datagram looks like
//! `change@/devices/...\0ACTION=change\0DEVPATH=/devices/...\0SUBSYSTEM=backlight\0...`.
//! Device attributes are read lazily from `<sysfs_root><DEVPATH>/<name>`.

use std::io;
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use nix::sys::socket::SockProtocol;
use tracing::{debug, trace};

use crate::error::UeventError;
use crate::net::socket::{NetlinkSocket, UEVENT_KERNEL_GROUP};
use crate::sysfs::read_attr;

/// Largest uevent datagram the kernel sends.
const UEVENT_BUFFER_BYTES: usize = 8192;

/// One device change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    action: String,
    devpath: String,
    subsystem: Option<String>,
    sysname: String,
    syspath: PathBuf,
}

impl DeviceEvent {
    /// Build an event whose attributes live in `syspath`.
    pub fn new(action: &str, subsystem: Option<&str>, sysname: &str, syspath: PathBuf) -> Self {
        Self {
            action: action.to_string(),
            devpath: String::new(),
            subsystem: subsystem.map(str::to_string),
            sysname: sysname.to_string(),
            syspath,
        }
    }

    /// Decode a kernel uevent datagram.
    ///
    /// Returns `None` for udevd re-broadcasts (`libudev` header) and for
    /// datagrams lacking `ACTION` or `DEVPATH`.
    pub fn parse(datagram: &[u8], sysfs_root: &Path) -> Option<Self> {
        if datagram.starts_with(b"libudev") {
            return None;
        }

        let mut action = None;
        let mut devpath = None;
        let mut subsystem = None;
        for field in datagram.split(|&b| b == 0).skip(1) {
            let Ok(field) = std::str::from_utf8(field) else {
                continue;
            };
            match field.split_once('=') {
                Some(("ACTION", value)) => action = Some(value),
                Some(("DEVPATH", value)) => devpath = Some(value),
                Some(("SUBSYSTEM", value)) => subsystem = Some(value),
                _ => {}
            }
        }

        let (action, devpath) = (action?, devpath?);
        let sysname = devpath.rsplit('/').next().unwrap_or(devpath);
        Some(Self {
            action: action.to_string(),
            devpath: devpath.to_string(),
            subsystem: subsystem.map(str::to_string),
            sysname: sysname.to_string(),
            syspath: sysfs_root.join(devpath.trim_start_matches('/')),
        })
    }

    /// `add`, `remove`, `change`, ...
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Kernel device path, empty for events not built from a datagram.
    pub fn devpath(&self) -> &str {
        &self.devpath
    }

    /// Subsystem name, when the kernel provided one.
    pub fn subsystem(&self) -> Option<&str> {
        self.subsystem.as_deref()
    }

    /// Last component of the device path.
    pub fn sysname(&self) -> &str {
        &self.sysname
    }

    /// Trimmed value of a sysfs attribute of the device.
    pub fn attribute(&self, name: &str) -> Option<String> {
        read_attr(&self.syspath.join(name))
    }
}

/// Readiness source delivering device events.
pub trait DeviceSource: AsFd {
    /// Next pending event of a watched subsystem, `None` once drained.
    fn receive(&mut self) -> Result<Option<DeviceEvent>, UeventError>;
}

/// Non-blocking uevent socket filtered to a set of subsystems.
#[derive(Debug)]
pub struct UeventSocket {
    socket: NetlinkSocket,
    sysfs_root: PathBuf,
    subsystems: Vec<&'static str>,
    buf: Vec<u8>,
}

impl UeventSocket {
    /// Join the kernel uevent group and watch `subsystems`.
    pub fn open(sysfs_root: &Path, subsystems: &[&'static str]) -> Result<Self, UeventError> {
        if subsystems.is_empty() {
            return Err(UeventError::NoFilters);
        }
        let socket = NetlinkSocket::open(SockProtocol::NetlinkKObjectUEvent, UEVENT_KERNEL_GROUP, true)?;
        debug!("uevent socket watching {}", subsystems.join(", "));
        Ok(Self {
            socket,
            sysfs_root: sysfs_root.to_path_buf(),
            subsystems: subsystems.to_vec(),
            buf: vec![0; UEVENT_BUFFER_BYTES],
        })
    }

    fn watched(&self, event: &DeviceEvent) -> bool {
        // Events without a subsystem are passed on so they can be rejected
        // and logged by the classifier.
        event
            .subsystem()
            .is_none_or(|s| self.subsystems.contains(&s))
    }
}

impl AsFd for UeventSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl DeviceSource for UeventSocket {
    fn receive(&mut self) -> Result<Option<DeviceEvent>, UeventError> {
        loop {
            let n = match self.socket.recv(&mut self.buf) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            let Some(event) = DeviceEvent::parse(&self.buf[..n], &self.sysfs_root) else {
                continue;
            };
            if self.watched(&event) {
                return Ok(Some(event));
            }
            trace!("Ignoring {} event on {}", event.action(), event.devpath());
        }
    }
}
