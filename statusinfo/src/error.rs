//! Error types for the status reactor, its event sources and sub-protocols.
//!
//! Only [`StatusError`] ever leaves the reactor. Source and sub-protocol
//! errors are turned into degraded fragments for the current cycle, or into
//! a "feature disabled" warning when they happen at startup.

use statusinfo_common::config::ConfigError;
use thiserror::Error;

/// Fatal reactor and startup errors.
#[derive(Error, Debug)]
pub enum StatusError {
    /// A multiplexed source reported POLLERR or POLLNVAL
    #[error("Poll error on {source_name} source")]
    PollFlag {
        /// Source that reported the condition
        source_name: &'static str,
    },

    /// The readiness wait itself failed
    #[error("Poll failed: {source}")]
    Poll {
        /// Source nix error
        source: nix::Error,
    },

    /// Signal handling could not be set up
    #[error("Unable to initialise signal handling: {source}")]
    Signal {
        /// Source nix error
        source: nix::Error,
    },

    /// The output sink rejected a line
    #[error("Output failed: {source}")]
    Sink {
        /// Source sink error
        #[from]
        source: SinkError,
    },

    /// Configuration error
    #[error("Configuration error: {source}")]
    Config {
        /// Source configuration error
        #[from]
        source: ConfigError,
    },
}

/// Output sink delivery errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Writing to the text stream failed
    #[error("text output: {0}")]
    Text(#[source] std::io::Error),

    /// Talking to the dwlb socket failed
    #[error("dwlb socket {path}: {source}")]
    Dwlb {
        /// Socket path
        path: String,
        /// Source IO error
        source: std::io::Error,
    },

    /// XDG_RUNTIME_DIR is not set, so the dwlb socket cannot be located
    #[error("could not retrieve XDG_RUNTIME_DIR")]
    NoRuntimeDir,

    /// Connecting to or talking with the X server failed
    #[error("X11: {0}")]
    X11(String),
}

/// Wifi signal query errors.
#[derive(Error, Debug)]
pub enum WifiError {
    /// Negative interface index supplied by the caller
    #[error("invalid interface index {0}")]
    InvalidInterface(i32),

    /// Socket level failure
    #[error("netlink socket: {0}")]
    Io(#[from] std::io::Error),

    /// The kernel answered with an error code
    #[error("netlink error {errno}")]
    Kernel {
        /// Positive errno
        errno: i32,
    },

    /// Generic netlink family could not be resolved
    #[error("generic netlink family {0} not found")]
    FamilyNotFound(String),

    /// The socket was closed before the dump completed
    #[error("netlink stream ended before completion")]
    Closed,
}

/// Ethernet link settings errors.
#[derive(Error, Debug)]
pub enum EthtoolError {
    /// Socket for the ioctl could not be created
    #[error("ethtool socket: {0}")]
    Socket(#[source] std::io::Error),

    /// The SIOCETHTOOL ioctl failed
    #[error("{ifname}: {source}")]
    Ioctl {
        /// Interface name
        ifname: String,
        /// Source IO error
        source: std::io::Error,
    },

    /// The kernel asked for a size that cannot be expressed
    #[error("{ifname}: unusable link mode size {nwords}")]
    BadSize {
        /// Interface name
        ifname: String,
        /// Size returned by the kernel
        nwords: i8,
    },
}

/// Device event source errors.
#[derive(Error, Debug)]
pub enum UeventError {
    /// Socket level failure
    #[error("uevent socket: {0}")]
    Io(#[from] std::io::Error),

    /// None of the configured subsystems could be watched
    #[error("no subsystem filter could be installed")]
    NoFilters,
}

/// Audio control errors.
#[derive(Error, Debug)]
pub enum MixerError {
    /// The ALSA library reported an error
    #[error("alsa: {0}")]
    Alsa(String),

    /// None of the configured controls exist on the device
    #[error("no watched mixer control found on {device}")]
    NoControls {
        /// ALSA device name
        device: String,
    },

    /// The mixer exposes no poll descriptor
    #[error("mixer exposes no poll descriptor")]
    NoDescriptor,
}
