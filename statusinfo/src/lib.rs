//! # statusinfo
//!
//! Event-driven status line for window-manager bars, terminal multiplexers
//! and plain text sinks.
//!
//! # Module Structure
//!
//! - [`core`] - `Reactor`: readiness loop, adaptive timeout, dispatch
//! - [`classifier`] - Device event action table and notification slots
//! - [`composer`] - Periodic line (network, temperature, power, battery, clock)
//! - [`mixer`] - Mixer snapshots and their rendering
//! - [`net`] - Interface summary, nl80211 signal and ethtool link speed queries
//! - [`sources`] - uevent socket, signalfd and ALSA mixer sources
//! - [`sink`] - Text, dwlb and X root window output
//! - [`sysfs`] - sysfs readers and thermal zone discovery
//! - [`error`] - Error types
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Reactor                               │
//! │   uevent ──► Classifier ──┐                                     │
//! │   mixer  ──► MixerSnapshot├──► StatusLine ──► StatusSink        │
//! │   timeout ─► Composer ────┘        ▲                            │
//! │                 │                  │                            │
//! │                 ▼            statusinfo_common::assemble        │
//! │        net::{wifi, ethtool}, sysfs                              │
//! │   signalfd ──► exit                                             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod classifier;
pub mod composer;
pub mod core;
pub mod error;
pub mod mixer;
pub mod net;
pub mod sink;
pub mod sources;
pub mod sysfs;

// Re-export key types for convenience
pub use crate::classifier::{Classifier, ClassifierContext};
pub use crate::composer::Composer;
pub use crate::core::{CycleStats, Reactor};
pub use crate::error::StatusError;
pub use crate::sink::{DwlbSink, OutputMode, StatusSink, TextSink};
