//! Readiness sources multiplexed by the reactor.
//!
//! - [`uevent`]: kernel device events
//! - [`signal`]: termination signals
//! - `alsa_mixer`: mixer change events (feature `alsa`)

#[cfg(feature = "alsa")]
pub mod alsa_mixer;
pub mod signal;
pub mod uevent;

#[cfg(feature = "alsa")]
pub use alsa_mixer::AlsaMixer;
pub use signal::{SignalTerminator, TerminationSource};
pub use uevent::{DeviceEvent, DeviceSource, UeventSocket};
