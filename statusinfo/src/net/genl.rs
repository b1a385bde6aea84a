//! Generic netlink message codec.
//!
//! Just enough of the netlink wire format to issue a generic netlink
//! request and walk the (possibly multi-part) reply: the 16-byte message
//! header, the 4-byte generic header and 4-byte aligned attributes, which
//! may nest. All integers are in host byte order.

use bitflags::bitflags;

/// Netlink message header length.
pub const NLMSG_HDRLEN: usize = 16;
/// Generic netlink header length.
pub const GENL_HDRLEN: usize = 4;
/// Attribute header length.
pub const NLA_HDRLEN: usize = 4;

/// No-op message.
pub const NLMSG_NOOP: u16 = 1;
/// Error (or ACK when the code is zero).
pub const NLMSG_ERROR: u16 = 2;
/// End of a multi-part dump.
pub const NLMSG_DONE: u16 = 3;
/// Data lost.
pub const NLMSG_OVERRUN: u16 = 4;

/// Generic netlink controller family.
pub const GENL_ID_CTRL: u16 = 0x10;
/// Controller command resolving a family name.
pub const CTRL_CMD_GETFAMILY: u8 = 3;
/// Controller attribute: numeric family id (u16).
pub const CTRL_ATTR_FAMILY_ID: u16 = 1;
/// Controller attribute: family name (NUL-terminated string).
pub const CTRL_ATTR_FAMILY_NAME: u16 = 2;

const NLA_F_NESTED: u16 = 1 << 15;
const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

bitflags! {
    /// `nlmsg_flags` values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NlmFlags: u16 {
        /// Request message.
        const REQUEST = 0x001;
        /// Part of a multi-part reply.
        const MULTI = 0x002;
        /// Ask for an acknowledgement.
        const ACK = 0x004;
        /// Return the whole table.
        const ROOT = 0x100;
        /// Return all matching entries.
        const MATCH = 0x200;
        /// Dump request.
        const DUMP = Self::ROOT.bits() | Self::MATCH.bits();
    }
}

/// Round `len` up to the 4-byte netlink alignment.
pub const fn align4(len: usize) -> usize {
    (len + 3) & !3
}

/// Encode one attribute, padding included.
pub fn encode_attr(ty: u16, payload: &[u8]) -> Vec<u8> {
    let len = NLA_HDRLEN + payload.len();
    let mut out = Vec::with_capacity(align4(len));
    out.extend_from_slice(&(len as u16).to_ne_bytes());
    out.extend_from_slice(&ty.to_ne_bytes());
    out.extend_from_slice(payload);
    out.resize(align4(len), 0);
    out
}

/// Builder for a generic netlink request.
#[derive(Debug, Clone)]
pub struct GenlRequest {
    buf: Vec<u8>,
}

impl GenlRequest {
    /// Start a message for `family` carrying command `cmd`.
    pub fn new(family: u16, cmd: u8, version: u8, flags: NlmFlags, seq: u32) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&0u32.to_ne_bytes()); // patched by finish()
        buf.extend_from_slice(&family.to_ne_bytes());
        buf.extend_from_slice(&flags.bits().to_ne_bytes());
        buf.extend_from_slice(&seq.to_ne_bytes());
        buf.extend_from_slice(&0u32.to_ne_bytes()); // port id, filled by the kernel
        buf.extend_from_slice(&[cmd, version, 0, 0]);
        Self { buf }
    }

    /// Append a raw attribute.
    pub fn put_bytes(mut self, ty: u16, payload: &[u8]) -> Self {
        self.buf.extend_from_slice(&encode_attr(ty, payload));
        self
    }

    /// Append a u32 attribute.
    pub fn put_u32(self, ty: u16, value: u32) -> Self {
        self.put_bytes(ty, &value.to_ne_bytes())
    }

    /// Append a NUL-terminated string attribute.
    pub fn put_str(self, ty: u16, value: &str) -> Self {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
        self.put_bytes(ty, &payload)
    }

    /// Patch the total length and return the wire bytes.
    pub fn finish(mut self) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[..4].copy_from_slice(&len.to_ne_bytes());
        self.buf
    }
}

/// One netlink message borrowed from a receive buffer.
#[derive(Debug, Clone, Copy)]
pub struct NlMsg<'a> {
    /// Message type (family id or one of the `NLMSG_*` control types).
    pub ty: u16,
    /// Message flags.
    pub flags: NlmFlags,
    /// Sequence number echoed from the request.
    pub seq: u32,
    /// Sender port id.
    pub port: u32,
    /// Everything after the netlink header.
    pub payload: &'a [u8],
}

impl<'a> NlMsg<'a> {
    /// Error code of an `NLMSG_ERROR` message (0 is an ACK, negative an errno).
    pub fn error_code(&self) -> Option<i32> {
        if self.ty != NLMSG_ERROR {
            return None;
        }
        read_i32(self.payload)
    }

    /// Attribute area following the generic netlink header.
    pub fn genl_attrs(&self) -> Attributes<'a> {
        Attributes::new(self.payload.get(GENL_HDRLEN..).unwrap_or_default())
    }
}

/// Iterator over the messages in one received datagram.
///
/// Stops at the first truncated or malformed header.
#[derive(Debug, Clone)]
pub struct Messages<'a> {
    data: &'a [u8],
}

impl<'a> Messages<'a> {
    /// Iterate over `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for Messages<'a> {
    type Item = NlMsg<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = read_u32(self.data)? as usize;
        if len < NLMSG_HDRLEN || len > self.data.len() {
            self.data = &[];
            return None;
        }

        let ty = read_u16(&self.data[4..])?;
        let flags = NlmFlags::from_bits_retain(read_u16(&self.data[6..])?);
        let seq = read_u32(&self.data[8..])?;
        let port = read_u32(&self.data[12..])?;
        let payload = &self.data[NLMSG_HDRLEN..len];

        self.data = &self.data[align4(len).min(self.data.len())..];
        Some(NlMsg {
            ty,
            flags,
            seq,
            port,
            payload,
        })
    }
}

/// Iterator over `(type, payload)` attribute pairs.
///
/// The nested/byte-order flag bits are stripped from the type.
#[derive(Debug, Clone)]
pub struct Attributes<'a> {
    data: &'a [u8],
}

impl<'a> Attributes<'a> {
    /// Iterate over an attribute area.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Payload of the first attribute of type `ty`.
    pub fn payload_of(mut self, ty: u16) -> Option<&'a [u8]> {
        Iterator::find(&mut self, |(attr_ty, _)| *attr_ty == ty).map(|(_, payload)| payload)
    }
}

impl<'a> Iterator for Attributes<'a> {
    type Item = (u16, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let len = read_u16(self.data)? as usize;
        if len < NLA_HDRLEN || len > self.data.len() {
            self.data = &[];
            return None;
        }
        let ty = read_u16(&self.data[2..])? & NLA_TYPE_MASK;
        let payload = &self.data[NLA_HDRLEN..len];
        self.data = &self.data[align4(len).min(self.data.len())..];
        Some((ty, payload))
    }
}

/// Leading u16 in host byte order.
pub fn read_u16(bytes: &[u8]) -> Option<u16> {
    Some(u16::from_ne_bytes(bytes.get(..2)?.try_into().ok()?))
}

/// Leading u32 in host byte order.
pub fn read_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_ne_bytes(bytes.get(..4)?.try_into().ok()?))
}

/// Leading i32 in host byte order.
pub fn read_i32(bytes: &[u8]) -> Option<i32> {
    Some(i32::from_ne_bytes(bytes.get(..4)?.try_into().ok()?))
}
