//! Network status: interface walk and the two link query sub-protocols.
//!
//! - [`wifi`]: station signal level over generic netlink (nl80211)
//! - [`ethtool`]: wired link speed via `SIOCETHTOOL`
//! - [`interfaces`]: the summary fragment built from both
//!
//! [`genl`] and [`socket`] carry the netlink plumbing shared with the
//! kernel uevent source.

pub mod ethtool;
pub mod genl;
pub mod interfaces;
pub mod socket;
pub mod wifi;

pub use interfaces::{NetworkProbe, SystemNetwork};
pub use wifi::{WifiQuery, WifiSignal};
