//! Wired link speed through the `SIOCETHTOOL` ioctl.
//!
//! `ETHTOOL_GLINKSETTINGS` is a two-phase exchange: the first request
//! carries a zero link-mode word count and the kernel answers with the
//! negated size it actually supports; the second request uses that size
//! and returns the real settings.

use std::io;
use std::mem;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::sys::socket::{AddressFamily, SockFlag, SockType, socket};
use static_assertions::const_assert_eq;
use statusinfo_common::status::Fragment;

use crate::error::EthtoolError;

/// `SIOCETHTOOL` request number.
const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GLINKSETTINGS: u32 = 0x4c;
/// `ETHTOOL_LINK_MODE_MASK_MAX_KERNEL_NU32`.
const LINK_MODE_MASK_MAX_NU32: usize = 127;
/// Speed reported when the link has no carrier.
pub const SPEED_UNKNOWN: u32 = u32::MAX;

/// `struct ethtool_link_settings` header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
struct EthtoolLinkSettings {
    cmd: u32,
    speed: u32,
    duplex: u8,
    port: u8,
    phy_address: u8,
    autoneg: u8,
    mdio_support: u8,
    eth_tp_mdix: u8,
    eth_tp_mdix_ctrl: u8,
    link_mode_masks_nwords: i8,
    transceiver: u8,
    master_slave_cfg: u8,
    master_slave_state: u8,
    rate_matching: u8,
    reserved: [u32; 7],
}

const_assert_eq!(mem::size_of::<EthtoolLinkSettings>(), 48);

/// Header plus room for the supported/advertising/peer bitmaps.
#[repr(C)]
struct LinkSettingsBuffer {
    settings: EthtoolLinkSettings,
    link_mode_data: [u32; 3 * LINK_MODE_MASK_MAX_NU32],
}

const IFREQ_UNION_BYTES: usize = 24;

/// `struct ifreq` with the `ifr_data` member of the union.
#[repr(C)]
struct IfReq {
    name: [libc::c_char; libc::IFNAMSIZ],
    data: *mut libc::c_void,
    pad: [u8; IFREQ_UNION_BYTES - mem::size_of::<*mut libc::c_void>()],
}

const_assert_eq!(mem::size_of::<IfReq>(), libc::IFNAMSIZ + IFREQ_UNION_BYTES);

impl IfReq {
    /// Interface names longer than `IFNAMSIZ - 1` bytes are clamped.
    fn new(ifname: &str, data: *mut libc::c_void) -> Self {
        let mut name = [0 as libc::c_char; libc::IFNAMSIZ];
        for (dst, &src) in name
            .iter_mut()
            .zip(ifname.as_bytes().iter().take(libc::IFNAMSIZ - 1))
        {
            *dst = src as libc::c_char;
        }
        Self {
            name,
            data,
            pad: [0; IFREQ_UNION_BYTES - mem::size_of::<*mut libc::c_void>()],
        }
    }
}

/// Reply of one `ETHTOOL_GLINKSETTINGS` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkReply {
    /// Link mode word count as returned by the kernel (negative during the handshake).
    pub nwords: i8,
    /// Link speed in Mb/s.
    pub speed: u32,
}

/// One `ETHTOOL_GLINKSETTINGS` round trip.
pub trait LinkSettingsIoctl {
    /// Issue the request for `ifname` announcing `nwords` link mode words.
    fn get_link_settings(&mut self, ifname: &str, nwords: i8) -> Result<LinkReply, EthtoolError>;
}

/// Datagram socket used as the ioctl handle.
#[derive(Debug)]
pub struct EthtoolSocket {
    fd: OwnedFd,
}

impl EthtoolSocket {
    /// Open an `AF_INET`/`SOCK_DGRAM` socket.
    pub fn open() -> Result<Self, EthtoolError> {
        let fd = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::SOCK_CLOEXEC,
            None,
        )
        .map_err(|e| EthtoolError::Socket(io::Error::from(e)))?;
        Ok(Self { fd })
    }
}

impl LinkSettingsIoctl for EthtoolSocket {
    fn get_link_settings(&mut self, ifname: &str, nwords: i8) -> Result<LinkReply, EthtoolError> {
        let mut buffer = LinkSettingsBuffer {
            settings: EthtoolLinkSettings {
                cmd: ETHTOOL_GLINKSETTINGS,
                link_mode_masks_nwords: nwords,
                ..Default::default()
            },
            link_mode_data: [0; 3 * LINK_MODE_MASK_MAX_NU32],
        };
        let mut ifr = IfReq::new(
            ifname,
            (&mut buffer as *mut LinkSettingsBuffer).cast::<libc::c_void>(),
        );

        // SAFETY: `ifr` points at `buffer`; both outlive the call and are
        // sized for the largest reply the kernel can write.
        let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), SIOCETHTOOL as _, &mut ifr as *mut IfReq) };
        if rc < 0 {
            return Err(EthtoolError::Ioctl {
                ifname: ifname.to_string(),
                source: io::Error::last_os_error(),
            });
        }

        Ok(LinkReply {
            nwords: buffer.settings.link_mode_masks_nwords,
            speed: buffer.settings.speed,
        })
    }
}

/// Link speed of `ifname` in Mb/s.
///
/// Sends the zero-sized probe; when the kernel answers with a negative word
/// count, repeats the request once with its absolute value.
pub fn query_link_speed<I>(ioctl: &mut I, ifname: &str) -> Result<u32, EthtoolError>
where
    I: LinkSettingsIoctl + ?Sized,
{
    let probe = ioctl.get_link_settings(ifname, 0)?;
    if probe.nwords >= 0 {
        return Ok(probe.speed);
    }

    let nwords = probe.nwords.checked_neg().ok_or_else(|| EthtoolError::BadSize {
        ifname: ifname.to_string(),
        nwords: probe.nwords,
    })?;
    Ok(ioctl.get_link_settings(ifname, nwords)?.speed)
}

/// Network summary item for a wired or bridged interface.
pub fn ethernet_item(ifname: &str, ifindex: u32, speed: &Result<u32, EthtoolError>) -> Fragment {
    let first = ifname.chars().next().unwrap_or('?');
    match speed {
        Ok(SPEED_UNKNOWN) => Fragment::from_fmt(format_args!("{first}{ifindex}:?M ")),
        Ok(mbps) => Fragment::from_fmt(format_args!("{first}{ifindex}:{mbps}M ")),
        Err(_) => Fragment::from_fmt(format_args!("{first}({ifindex}):err ")),
    }
}
