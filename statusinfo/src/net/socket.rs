//! Raw netlink sockets.
//!
//! Thin owner of an `AF_NETLINK` descriptor used by both the kernel uevent
//! source and the generic netlink (nl80211) query channel.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd};

use nix::errno::Errno;
use nix::sys::socket::{
    AddressFamily, MsgFlags, NetlinkAddr, SockFlag, SockProtocol, SockType, bind, recv, send,
    setsockopt, socket, sockopt,
};

/// Kernel uevent multicast group.
pub const UEVENT_KERNEL_GROUP: u32 = 1;

/// An open, bound netlink socket.
#[derive(Debug)]
pub struct NetlinkSocket {
    fd: OwnedFd,
}

impl NetlinkSocket {
    /// Open a netlink socket for `protocol` and bind it to `groups`.
    ///
    /// The kernel assigns the local port id.
    pub fn open(protocol: SockProtocol, groups: u32, nonblocking: bool) -> io::Result<Self> {
        let mut flags = SockFlag::SOCK_CLOEXEC;
        if nonblocking {
            flags |= SockFlag::SOCK_NONBLOCK;
        }

        let fd = socket(AddressFamily::Netlink, SockType::Raw, flags, protocol)?;
        bind(fd.as_raw_fd(), &NetlinkAddr::new(0, groups))?;
        Ok(Self { fd })
    }

    /// Set both send and receive buffer sizes.
    pub fn set_buffer_sizes(&self, bytes: usize) -> io::Result<()> {
        setsockopt(&self.fd, sockopt::SndBuf, &bytes)?;
        setsockopt(&self.fd, sockopt::RcvBuf, &bytes)?;
        Ok(())
    }

    /// Send one message to the kernel.
    pub fn send(&self, msg: &[u8]) -> io::Result<usize> {
        loop {
            match send(self.fd.as_raw_fd(), msg, MsgFlags::empty()) {
                Err(Errno::EINTR) => continue,
                result => return result.map_err(io::Error::from),
            }
        }
    }

    /// Receive one datagram into `buf`.
    pub fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            match recv(self.fd.as_raw_fd(), buf, MsgFlags::empty()) {
                Err(Errno::EINTR) => continue,
                result => return result.map_err(io::Error::from),
            }
        }
    }
}

impl AsFd for NetlinkSocket {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}
