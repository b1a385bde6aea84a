//! Network summary fragment.
//!
//! Walks the address list of the host, keeps live interfaces only and asks
//! the matching sub-protocol for one short item per interface: link speed
//! for wired/bridged names (`e*`, `b*`), signal level for wireless ones
//! (`w*`). Items are concatenated until the fragment is full.

use nix::ifaddrs::{InterfaceAddress, getifaddrs};
use nix::net::if_::{InterfaceFlags, if_nametoindex};
use nix::sys::socket::{AddressFamily, SockaddrLike};
use statusinfo_common::consts::{MAX_INTERFACES, MAX_NET_ITEM_CHARS};
use statusinfo_common::status::Fragment;
use tracing::{debug, warn};

use super::ethtool::{EthtoolSocket, ethernet_item, query_link_speed};
use super::wifi::{WifiQuery, wifi_item};

/// Source of the network summary fragment.
pub trait NetworkProbe {
    /// Compose the summary for this refresh.
    fn summary(&mut self) -> Fragment;
}

/// Interface category, from the first letter of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// Wired or bridged.
    Ethernet,
    /// Wireless.
    Wifi,
}

impl LinkKind {
    /// Category of `name`, `None` for interfaces that are not reported.
    pub fn of(name: &str) -> Option<Self> {
        match name.as_bytes().first()? {
            b'e' | b'b' => Some(Self::Ethernet),
            b'w' => Some(Self::Wifi),
            _ => None,
        }
    }
}

/// Live interface filter: has an IPv4/IPv6 address, is running, and is
/// neither loopback nor point-to-point.
fn is_live(ifa: &InterfaceAddress) -> bool {
    let Some(address) = ifa.address.as_ref() else {
        return false;
    };
    if ifa
        .flags
        .intersects(InterfaceFlags::IFF_LOOPBACK | InterfaceFlags::IFF_POINTOPOINT)
    {
        return false;
    }
    matches!(
        address.family(),
        Some(AddressFamily::Inet | AddressFamily::Inet6)
    ) && ifa.flags.contains(InterfaceFlags::IFF_RUNNING)
}

/// Longest prefix of `text` that fits one network item.
fn clamp_item(text: &str) -> &str {
    let mut end = text.len().min(MAX_NET_ITEM_CHARS - 1);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Concatenate one item per distinct interface name.
///
/// `item` returns `None` for interfaces that are not reported. At most
/// [`MAX_INTERFACES`] names are remembered for de-duplication; the walk
/// stops once the fragment is full.
pub fn summarize<'a, I, F>(names: I, mut item: F) -> Fragment
where
    I: IntoIterator<Item = &'a str>,
    F: FnMut(&str) -> Option<Fragment>,
{
    let mut summary = Fragment::new();
    let mut seen: Vec<&str> = Vec::with_capacity(MAX_INTERFACES);

    for name in names {
        if seen.contains(&name) {
            continue;
        }
        if seen.len() < MAX_INTERFACES {
            seen.push(name);
        }
        let Some(part) = item(name) else {
            continue;
        };
        if !summary.push_fmt(format_args!("{}", clamp_item(part.as_str()))) {
            break;
        }
    }

    summary
}

/// Network probe backed by `getifaddrs`, ethtool and nl80211.
#[derive(Debug)]
pub struct SystemNetwork {
    wifi: Option<WifiQuery>,
}

impl SystemNetwork {
    /// Wireless interfaces are skipped when `wifi` is `None`.
    pub fn new(wifi: Option<WifiQuery>) -> Self {
        Self { wifi }
    }

    fn ethernet(name: &str) -> Fragment {
        let ifindex = if_nametoindex(name).unwrap_or(0);
        let speed = EthtoolSocket::open().and_then(|mut socket| query_link_speed(&mut socket, name));
        if let Err(e) = &speed {
            debug!("Link speed query failed: {e}");
        }
        ethernet_item(name, ifindex, &speed)
    }

    fn wireless(wifi: &mut WifiQuery, name: &str) -> Fragment {
        let ifindex = if_nametoindex(name).map_or(-1, |index| index as i32);
        let signal = wifi.query_signal(ifindex);
        if let Err(e) = &signal {
            debug!("Signal query on {name} failed: {e}");
        }
        wifi_item(ifindex, &signal)
    }
}

impl NetworkProbe for SystemNetwork {
    fn summary(&mut self) -> Fragment {
        let addrs = match getifaddrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!("getifaddrs failed: {e}");
                return Fragment::EMPTY;
            }
        };
        let live: Vec<String> = addrs
            .filter(is_live)
            .map(|ifa| ifa.interface_name)
            .collect();

        let wifi = &mut self.wifi;
        summarize(live.iter().map(String::as_str), |name| {
            match (LinkKind::of(name)?, wifi.as_mut()) {
                (LinkKind::Ethernet, _) => Some(Self::ethernet(name)),
                (LinkKind::Wifi, Some(query)) => Some(Self::wireless(query, name)),
                (LinkKind::Wifi, None) => None,
            }
        })
    }
}
