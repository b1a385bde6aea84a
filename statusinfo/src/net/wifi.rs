//! Wifi signal strength over generic netlink (nl80211).
//!
//! The query channel is opened once at startup: a `NETLINK_GENERIC` socket
//! plus the resolved `nl80211` family id. Each [`WifiQuery::query_signal`]
//! call then dumps the station table of one interface and pumps the receive
//! side until the kernel reports `NLMSG_DONE`.

use std::io;

use nix::sys::socket::SockProtocol;
use statusinfo_common::status::Fragment;
use tracing::{debug, trace};

use super::genl::{
    Attributes, CTRL_ATTR_FAMILY_ID, CTRL_ATTR_FAMILY_NAME, CTRL_CMD_GETFAMILY, GENL_ID_CTRL,
    GenlRequest, Messages, NLMSG_DONE, NLMSG_ERROR, NLMSG_NOOP, NLMSG_OVERRUN, NlMsg, NlmFlags,
    read_u16,
};
use super::socket::NetlinkSocket;
use crate::error::WifiError;

/// Generic netlink family name of the 802.11 configuration API.
pub const NL80211_FAMILY: &str = "nl80211";

const NL80211_CMD_GET_STATION: u8 = 17;
const NL80211_ATTR_IFINDEX: u16 = 3;
const NL80211_ATTR_STA_INFO: u16 = 21;
const NL80211_STA_INFO_SIGNAL: u16 = 7;

/// Socket send/receive buffer size.
const SOCKET_BUFFER_BYTES: usize = 8192;
/// Receive scratch buffer; one dump datagram always fits.
const RECV_BUFFER_BYTES: usize = 16 * 1024;

/// Signal level in dBm. `None` when the station reported no signal attribute.
pub type WifiSignal = Option<i8>;

/// Message transport used by [`WifiQuery`].
pub trait NetlinkTransport {
    /// Send one complete request.
    fn send(&mut self, msg: &[u8]) -> io::Result<()>;

    /// Receive one datagram. `Ok(0)` means the peer went away.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl NetlinkTransport for NetlinkSocket {
    fn send(&mut self, msg: &[u8]) -> io::Result<()> {
        NetlinkSocket::send(self, msg).map(|_| ())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        NetlinkSocket::recv(self, buf)
    }
}

/// Per-call state of a station dump.
#[derive(Debug)]
struct StationDump {
    ifindex: u32,
    signal: WifiSignal,
    done: bool,
}

impl StationDump {
    fn new(ifindex: u32) -> Self {
        Self {
            ifindex,
            signal: None,
            done: false,
        }
    }

    fn process(&mut self, msg: &NlMsg<'_>) -> Result<(), WifiError> {
        match msg.ty {
            NLMSG_DONE => self.done = true,
            NLMSG_ERROR => match msg.error_code() {
                Some(0) => {}
                Some(code) => {
                    return Err(WifiError::Kernel {
                        errno: code.wrapping_neg(),
                    });
                }
                None => {
                    return Err(WifiError::Kernel {
                        errno: libc::EPROTO,
                    });
                }
            },
            NLMSG_NOOP | NLMSG_OVERRUN => {}
            _ => self.station(msg),
        }
        Ok(())
    }

    fn station(&mut self, msg: &NlMsg<'_>) {
        let Some(info) = msg.genl_attrs().payload_of(NL80211_ATTR_STA_INFO) else {
            debug!("ifindex {}: station message without STA_INFO", self.ifindex);
            return;
        };
        if let Some(&[level, ..]) = Attributes::new(info).payload_of(NL80211_STA_INFO_SIGNAL) {
            self.signal = Some(level as i8);
        }
    }
}

/// Open nl80211 query channel.
#[derive(Debug)]
pub struct WifiQuery<T = NetlinkSocket> {
    transport: T,
    family: u16,
    seq: u32,
    buf: Vec<u8>,
}

impl WifiQuery<NetlinkSocket> {
    /// Open a generic netlink socket and resolve the nl80211 family.
    pub fn connect() -> Result<Self, WifiError> {
        let socket = NetlinkSocket::open(SockProtocol::NetlinkGeneric, 0, false)?;
        socket.set_buffer_sizes(SOCKET_BUFFER_BYTES)?;
        Self::with_transport(socket)
    }
}

impl<T: NetlinkTransport> WifiQuery<T> {
    /// Resolve the nl80211 family over an already connected transport.
    pub fn with_transport(transport: T) -> Result<Self, WifiError> {
        let mut query = Self {
            transport,
            family: 0,
            seq: 0,
            buf: vec![0; RECV_BUFFER_BYTES],
        };
        query.family = query.resolve_family(NL80211_FAMILY)?;
        debug!("{} family id {}", NL80211_FAMILY, query.family);
        Ok(query)
    }

    /// Resolved nl80211 family id.
    pub fn family_id(&self) -> u16 {
        self.family
    }

    fn next_seq(&mut self) -> u32 {
        self.seq = self.seq.wrapping_add(1);
        self.seq
    }

    fn resolve_family(&mut self, name: &str) -> Result<u16, WifiError> {
        let seq = self.next_seq();
        let request = GenlRequest::new(
            GENL_ID_CTRL,
            CTRL_CMD_GETFAMILY,
            1,
            NlmFlags::REQUEST | NlmFlags::ACK,
            seq,
        )
        .put_str(CTRL_ATTR_FAMILY_NAME, name)
        .finish();
        self.transport.send(&request)?;

        let mut family = None;
        loop {
            let n = self.transport.recv(&mut self.buf)?;
            if n == 0 {
                return Err(WifiError::Closed);
            }
            for msg in Messages::new(&self.buf[..n]) {
                if msg.seq != seq {
                    continue;
                }
                match (msg.ty, msg.error_code()) {
                    (NLMSG_ERROR, Some(0)) | (NLMSG_DONE, _) => {
                        return family.ok_or_else(|| WifiError::FamilyNotFound(name.to_string()));
                    }
                    (NLMSG_ERROR, Some(code)) if code == -libc::ENOENT => {
                        return Err(WifiError::FamilyNotFound(name.to_string()));
                    }
                    (NLMSG_ERROR, code) => {
                        return Err(WifiError::Kernel {
                            errno: code.map_or(libc::EPROTO, i32::wrapping_neg),
                        });
                    }
                    (GENL_ID_CTRL, _) => {
                        family = msg.genl_attrs().payload_of(CTRL_ATTR_FAMILY_ID).and_then(read_u16);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Signal level of the station associated on interface `ifindex`.
    ///
    /// Blocks until the dump completes. A negative index fails immediately
    /// without touching the transport.
    pub fn query_signal(&mut self, ifindex: i32) -> Result<WifiSignal, WifiError> {
        let index = u32::try_from(ifindex).map_err(|_| WifiError::InvalidInterface(ifindex))?;
        let seq = self.next_seq();
        let request = GenlRequest::new(
            self.family,
            NL80211_CMD_GET_STATION,
            0,
            NlmFlags::REQUEST | NlmFlags::DUMP,
            seq,
        )
        .put_u32(NL80211_ATTR_IFINDEX, index)
        .finish();
        self.transport.send(&request)?;

        let mut dump = StationDump::new(index);
        while !dump.done {
            let n = self.transport.recv(&mut self.buf)?;
            if n == 0 {
                return Err(WifiError::Closed);
            }
            for msg in Messages::new(&self.buf[..n]) {
                if msg.seq != seq {
                    trace!("skipping netlink message with seq {} (want {})", msg.seq, seq);
                    continue;
                }
                dump.process(&msg)?;
                if dump.done {
                    break;
                }
            }
        }
        Ok(dump.signal)
    }
}

/// Network summary item for a wireless interface.
pub fn wifi_item(ifindex: i32, signal: &Result<WifiSignal, WifiError>) -> Fragment {
    match signal {
        Ok(Some(dbm)) => Fragment::from_fmt(format_args!("w{ifindex}:{dbm}dBm ")),
        Ok(None) => Fragment::from_fmt(format_args!("w{ifindex}:?dBm ")),
        Err(_) => Fragment::from_fmt(format_args!("w({ifindex}):err ")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::genl::{NLMSG_HDRLEN, encode_attr, read_u32};
    use std::collections::VecDeque;

    const FAMILY: u16 = 0x1c;

    #[derive(Debug, Default)]
    struct MockTransport {
        sent: Vec<Vec<u8>>,
        replies: VecDeque<Vec<u8>>,
    }

    impl NetlinkTransport for MockTransport {
        fn send(&mut self, msg: &[u8]) -> io::Result<()> {
            self.sent.push(msg.to_vec());
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.replies.pop_front() {
                Some(reply) => {
                    buf[..reply.len()].copy_from_slice(&reply);
                    Ok(reply.len())
                }
                None => Ok(0),
            }
        }
    }

    fn family_reply(seq: u32) -> Vec<u8> {
        let mut data = GenlRequest::new(GENL_ID_CTRL, 1, 2, NlmFlags::empty(), seq)
            .put_str(CTRL_ATTR_FAMILY_NAME, NL80211_FAMILY)
            .put_bytes(CTRL_ATTR_FAMILY_ID, &FAMILY.to_ne_bytes())
            .finish();
        data.extend(error_msg(seq, 0));
        data
    }

    fn error_msg(seq: u32, code: i32) -> Vec<u8> {
        let len = (NLMSG_HDRLEN + 4 + NLMSG_HDRLEN) as u32;
        let mut msg = Vec::new();
        msg.extend_from_slice(&len.to_ne_bytes());
        msg.extend_from_slice(&NLMSG_ERROR.to_ne_bytes());
        msg.extend_from_slice(&0u16.to_ne_bytes());
        msg.extend_from_slice(&seq.to_ne_bytes());
        msg.extend_from_slice(&0u32.to_ne_bytes());
        msg.extend_from_slice(&code.to_ne_bytes());
        msg.extend_from_slice(&[0; NLMSG_HDRLEN]);
        msg
    }

    fn station(seq: u32, signal: Option<i8>) -> Vec<u8> {
        let mut info = encode_attr(1, &0u32.to_ne_bytes());
        if let Some(dbm) = signal {
            info.extend(encode_attr(NL80211_STA_INFO_SIGNAL, &[dbm as u8]));
        }
        GenlRequest::new(FAMILY, NL80211_CMD_GET_STATION, 1, NlmFlags::MULTI, seq)
            .put_u32(NL80211_ATTR_IFINDEX, 3)
            .put_bytes(NL80211_ATTR_STA_INFO | 0x8000, &info)
            .finish()
    }

    fn done(seq: u32) -> Vec<u8> {
        GenlRequest::new(NLMSG_DONE, 0, 0, NlmFlags::MULTI, seq).finish()
    }

    fn connected(replies: Vec<Vec<u8>>) -> WifiQuery<MockTransport> {
        let mut transport = MockTransport::default();
        transport.replies.push_back(family_reply(1));
        transport.replies.extend(replies);
        WifiQuery::with_transport(transport).unwrap()
    }

    #[test]
    fn resolves_family_id() {
        let query = connected(Vec::new());
        assert_eq!(query.family_id(), FAMILY);
        let request = Messages::new(&query.transport.sent[0]).next().unwrap();
        assert_eq!(request.ty, GENL_ID_CTRL);
        assert_eq!(
            request.genl_attrs().payload_of(CTRL_ATTR_FAMILY_NAME),
            Some(&b"nl80211\0"[..])
        );
    }

    #[test]
    fn unknown_family_is_reported() {
        let mut transport = MockTransport::default();
        transport.replies.push_back(error_msg(1, -libc::ENOENT));
        let err = WifiQuery::with_transport(transport).unwrap_err();
        assert!(matches!(err, WifiError::FamilyNotFound(_)));
    }

    #[test]
    fn signal_read_from_multipart_dump() {
        let mut query = connected(vec![station(2, Some(-52)), done(2)]);
        assert_eq!(query.query_signal(3).unwrap(), Some(-52));

        let request = Messages::new(&query.transport.sent[1]).next().unwrap();
        assert_eq!(request.ty, FAMILY);
        assert!(request.flags.contains(NlmFlags::DUMP));
        assert_eq!(
            request.genl_attrs().payload_of(NL80211_ATTR_IFINDEX).and_then(read_u32),
            Some(3)
        );
    }

    #[test]
    fn messages_in_one_datagram_are_all_processed() {
        let mut datagram = station(2, Some(-70));
        datagram.extend(done(2));
        let mut query = connected(vec![datagram]);
        assert_eq!(query.query_signal(3).unwrap(), Some(-70));
    }

    #[test]
    fn absent_signal_is_none() {
        let mut query = connected(vec![station(2, None), done(2)]);
        assert_eq!(query.query_signal(3).unwrap(), None);
    }

    #[test]
    fn foreign_sequence_numbers_are_skipped() {
        let mut query = connected(vec![station(99, Some(-10)), station(2, Some(-60)), done(2)]);
        assert_eq!(query.query_signal(3).unwrap(), Some(-60));
    }

    #[test]
    fn kernel_error_fails_the_query() {
        let mut query = connected(vec![error_msg(2, -libc::ENODEV)]);
        let err = query.query_signal(3).unwrap_err();
        assert!(matches!(err, WifiError::Kernel { errno } if errno == libc::ENODEV));
    }

    #[test]
    fn negative_index_is_rejected_without_io() {
        let mut query = connected(Vec::new());
        assert!(matches!(
            query.query_signal(-1),
            Err(WifiError::InvalidInterface(-1))
        ));
        assert_eq!(query.transport.sent.len(), 1);
    }

    #[test]
    fn closed_stream_before_done() {
        let mut query = connected(vec![station(2, Some(-40))]);
        assert!(matches!(query.query_signal(3), Err(WifiError::Closed)));
    }

    #[test]
    fn item_formats() {
        assert_eq!(wifi_item(3, &Ok(Some(-52))).as_str(), "w3:-52dBm ");
        assert_eq!(wifi_item(3, &Ok(None)).as_str(), "w3:?dBm ");
        assert_eq!(wifi_item(3, &Err(WifiError::Closed)).as_str(), "w(3):err ");
    }
}
