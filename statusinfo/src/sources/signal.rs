//! Termination signals read through a `signalfd`.

use std::os::fd::{AsFd, BorrowedFd};

use nix::sys::signal::{SigSet, Signal};
use nix::sys::signalfd::{SfdFlags, SignalFd};
use tracing::{debug, warn};

use crate::error::StatusError;

/// Signals that end the reactor loop.
pub const TERMINATION_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// Readiness source that ends the loop.
pub trait TerminationSource: AsFd {
    /// Consume the pending termination request and return its name.
    fn read_signal(&mut self) -> Option<String>;
}

/// SIGINT, SIGTERM and SIGHUP, blocked and delivered through a descriptor.
#[derive(Debug)]
pub struct SignalTerminator {
    fd: SignalFd,
}

impl SignalTerminator {
    /// Block the termination signals for this thread and open the descriptor.
    pub fn install() -> Result<Self, StatusError> {
        let mut mask = SigSet::empty();
        for signal in TERMINATION_SIGNALS {
            mask.add(signal);
        }
        mask.thread_block()
            .map_err(|source| StatusError::Signal { source })?;
        let fd = SignalFd::with_flags(&mask, SfdFlags::SFD_CLOEXEC)
            .map_err(|source| StatusError::Signal { source })?;
        debug!("signalfd installed for SIGINT, SIGTERM, SIGHUP");
        Ok(Self { fd })
    }
}

impl AsFd for SignalTerminator {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl TerminationSource for SignalTerminator {
    fn read_signal(&mut self) -> Option<String> {
        match self.fd.read_signal() {
            Ok(Some(info)) => {
                let name = i32::try_from(info.ssi_signo)
                    .ok()
                    .and_then(|signo| Signal::try_from(signo).ok())
                    .map_or_else(
                        || format!("signal {}", info.ssi_signo),
                        |signal| signal.as_str().to_string(),
                    );
                Some(name)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("signalfd read failed: {e}");
                None
            }
        }
    }
}
