//! Netlink message header, payload and message codec.

use std::fmt;

use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::attr::Attr;
use super::error::{Error, Result};
use super::parse::{FromNetlink, ToNetlink, parse_i32_ne};
use super::stream::AttrStream;

/// Netlink message header alignment.
pub const NLMSG_ALIGNTO: usize = 4;

/// Align a length to NLMSG_ALIGNTO boundary.
#[inline]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// Size of the netlink message header.
pub const NLMSG_HDRLEN: usize = nlmsg_align(std::mem::size_of::<NlMsgHdr>());

/// Netlink message header (mirrors struct nlmsghdr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgHdr {
    /// Length of message including header.
    pub nlmsg_len: u32,
    /// Message type.
    pub nlmsg_type: u16,
    /// Additional flags.
    pub nlmsg_flags: u16,
    /// Sequence number.
    pub nlmsg_seq: u32,
    /// Sending process port ID.
    pub nlmsg_pid: u32,
}

impl NlMsgHdr {
    /// Create a new message header.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            nlmsg_len: NLMSG_HDRLEN as u32,
            nlmsg_type: msg_type,
            nlmsg_flags: flags,
            nlmsg_seq: 0,
            nlmsg_pid: 0,
        }
    }

    /// Convert header to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }
}

/// Standard netlink message types.
pub struct NlMsgType;

impl NlMsgType {
    /// No operation, message must be discarded.
    pub const NOOP: u16 = 1;
    /// Error message or ACK.
    pub const ERROR: u16 = 2;
    /// End of multipart message.
    pub const DONE: u16 = 3;
    /// Data lost, request resend.
    pub const OVERRUN: u16 = 4;
}

/// Smallest type value available to protocol families.
pub const NLMSG_MIN_TYPE: u16 = 0x10;

/// Netlink message flags.
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
pub const NLM_F_ECHO: u16 = 0x08;
pub const NLM_F_DUMP_INTR: u16 = 0x10;
pub const NLM_F_DUMP_FILTERED: u16 = 0x20;

// Modifiers to GET request
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_ATOMIC: u16 = 0x400;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Modifiers to NEW request
pub const NLM_F_REPLACE: u16 = 0x100;
pub const NLM_F_EXCL: u16 = 0x200;
pub const NLM_F_CREATE: u16 = 0x400;
pub const NLM_F_APPEND: u16 = 0x800;

// Flags for ACK message
pub const NLM_F_CAPPED: u16 = 0x100;
pub const NLM_F_ACK_TLVS: u16 = 0x200;

/// Extended ACK attribute types.
pub const NLMSGERR_ATTR_MSG: u16 = 1;
pub const NLMSGERR_ATTR_OFFS: u16 = 2;
pub const NLMSGERR_ATTR_COOKIE: u16 = 3;

/// Describe an errno the way the C library does.
pub fn error_string(errno: u32) -> String {
    let text = std::io::Error::from_raw_os_error(errno as i32).to_string();
    match text.rfind(" (os error ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

/// Opaque message payload: subsystem header bytes followed by attributes.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload {
    buf: BytesMut,
}

impl Payload {
    /// Create an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a payload holding a copy of `data`.
    pub fn from_bytes(data: impl AsRef<[u8]>) -> Self {
        Self {
            buf: BytesMut::from(data.as_ref()),
        }
    }

    /// Append one attribute's full encoded form, padding included.
    pub fn add_attr(&mut self, attr: &Attr) -> &mut Self {
        attr.write_to(&mut self.buf);
        self
    }

    /// Append raw bytes as-is.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    /// Put `header` in front of the current bytes, zero padded to 4 bytes.
    pub fn prepend<H: ToNetlink + ?Sized>(&mut self, header: &H) {
        let mut buf = BytesMut::with_capacity(nlmsg_align(header.netlink_len()) + self.buf.len());
        header.write_to(&mut buf);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf.extend_from_slice(&self.buf);
        self.buf = buf;
    }

    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if the payload holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Iterate attributes starting `offset` bytes in, typically just past
    /// a subsystem header.
    pub fn attrs(&self, offset: usize) -> AttrStream<'_> {
        AttrStream::new(&self.buf, offset)
    }
}

impl ToNetlink for Payload {
    fn netlink_len(&self) -> usize {
        self.buf.len()
    }

    fn write_to(&self, buf: &mut BytesMut) {
        buf.extend_from_slice(&self.buf);
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.buf.len())
            .field("bytes", &&self.buf[..])
            .finish()
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self {
            buf: BytesMut::from(&data[..]),
        }
    }
}

impl From<&[u8]> for Payload {
    fn from(data: &[u8]) -> Self {
        Self::from_bytes(data)
    }
}

/// Netlink error payload (mirrors struct nlmsgerr).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlMsgErr {
    /// Error code (negative errno or 0 for ACK).
    pub error: i32,
    /// Header of the request this reply is about.
    pub msg: NlMsgHdr,
}

impl NlMsgErr {
    /// Decode from the front of an ERROR payload.
    pub fn from_payload(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(err, _)| err)
            .map_err(|_| Error::Truncated {
                expected: std::mem::size_of::<Self>(),
                actual: data.len(),
            })
    }

    /// Check if this is an ACK (no error).
    pub fn is_ack(&self) -> bool {
        self.error == 0
    }
}

/// A single netlink message.
///
/// The length field is never stored for encoding: it is computed from the
/// payload every time the message is serialized. A decoded message keeps
/// the length it arrived with only for inspection via
/// [`declared_len`](Self::declared_len).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    msg_type: u16,
    flags: u16,
    seq: u32,
    port_id: u32,
    declared_len: Option<u32>,
    payload: Option<Payload>,
}

impl Message {
    /// Create a message with no payload attached.
    pub fn new(msg_type: u16, flags: u16) -> Self {
        Self {
            msg_type,
            flags,
            ..Self::default()
        }
    }

    /// Message type.
    pub fn msg_type(&self) -> u16 {
        self.msg_type
    }

    /// Set the message type.
    pub fn set_msg_type(&mut self, msg_type: u16) {
        self.msg_type = msg_type;
    }

    /// Message flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Replace the message flags.
    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
    }

    /// Sequence number.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    /// Set the sequence number.
    pub fn set_seq(&mut self, seq: u32) {
        self.seq = seq;
    }

    /// Sender port ID.
    pub fn port_id(&self) -> u32 {
        self.port_id
    }

    /// Set the port ID.
    pub fn set_port_id(&mut self, port_id: u32) {
        self.port_id = port_id;
    }

    /// Length field found in the header this message was decoded from.
    pub fn declared_len(&self) -> Option<u32> {
        self.declared_len
    }

    /// Attached payload, if any.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Attached payload, attaching an empty one first if needed.
    pub fn payload_mut(&mut self) -> &mut Payload {
        self.payload.get_or_insert_with(Payload::new)
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = Some(payload);
    }

    /// Append `data` to the payload, attaching it if there is none yet.
    pub fn add_payload(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.payload_mut().extend_from_slice(data.as_ref());
        self
    }

    /// Detach and return the payload.
    pub fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }

    /// Append an attribute to the payload.
    pub fn add_attr(&mut self, attr: &Attr) -> &mut Self {
        self.payload_mut().add_attr(attr);
        self
    }

    /// Prepend a fixed subsystem header in front of the current payload.
    ///
    /// The header is zero padded to a 4-byte boundary, so attributes that
    /// follow stay aligned. Calling this twice leaves the last header
    /// first.
    pub fn put_extra_header<H: ToNetlink + ?Sized>(&mut self, header: &H) -> &mut Self {
        self.payload_mut().prepend(header);
        self
    }

    /// Payload bytes, empty if none is attached.
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_ref().map(Payload::as_bytes).unwrap_or(&[])
    }

    /// Header plus current payload, unpadded.
    pub fn len(&self) -> usize {
        NLMSG_HDRLEN + self.payload_bytes().len()
    }

    /// Check if the message is header-only.
    pub fn is_empty(&self) -> bool {
        self.payload_bytes().is_empty()
    }

    /// Size of the encoded form, which is also its length field.
    pub fn encoded_len(&self) -> usize {
        nlmsg_align(self.len())
    }

    /// Header as it would be encoded now.
    pub fn header(&self) -> NlMsgHdr {
        NlMsgHdr {
            nlmsg_len: self.encoded_len() as u32,
            nlmsg_type: self.msg_type,
            nlmsg_flags: self.flags,
            nlmsg_seq: self.seq,
            nlmsg_pid: self.port_id,
        }
    }

    /// Check the message is at least a full header.
    pub fn ok(&self) -> bool {
        self.len() >= NLMSG_HDRLEN
    }

    /// Sequence check: 0 on either side matches anything.
    pub fn seq_ok(&self, expected: u32) -> bool {
        expected == 0 || self.seq == 0 || self.seq == expected
    }

    /// Port ID check: 0 on either side matches anything.
    pub fn portid_ok(&self, expected: u32) -> bool {
        expected == 0 || self.port_id == 0 || self.port_id == expected
    }

    /// Check that this message answers request `seq` sent from `port_id`.
    pub fn check_reply(&self, seq: u32, port_id: u32) -> Result<()> {
        if !self.seq_ok(seq) {
            return Err(Error::SequenceMismatch {
                expected: seq,
                actual: self.seq,
            });
        }
        if !self.portid_ok(port_id) {
            return Err(Error::PortIdMismatch {
                expected: port_id,
                actual: self.port_id,
            });
        }
        Ok(())
    }

    /// Check if this is an error message.
    pub fn is_error(&self) -> bool {
        self.msg_type == NlMsgType::ERROR
    }

    /// Check if this is a done message.
    pub fn is_done(&self) -> bool {
        self.msg_type == NlMsgType::DONE
    }

    /// Check if this is a noop message.
    pub fn is_noop(&self) -> bool {
        self.msg_type == NlMsgType::NOOP
    }

    /// Check if this message has the multi flag.
    pub fn is_multi(&self) -> bool {
        self.flags & NLM_F_MULTI != 0
    }

    /// Check if the kernel flagged a dump as inconsistent.
    pub fn is_dump_interrupted(&self) -> bool {
        self.flags & NLM_F_DUMP_INTR != 0
    }

    /// Absolute errno of an ERROR message (0 for an ACK).
    pub fn errno(&self) -> Result<u32> {
        if !self.is_error() {
            return Err(Error::InvalidMessage(format!(
                "errno requested from message type {}",
                self.msg_type
            )));
        }
        let mut input = self.payload_bytes();
        let error = parse_i32_ne(&mut input).map_err(|_| Error::Truncated {
            expected: 4,
            actual: self.payload_bytes().len(),
        })?;
        Ok(error.unsigned_abs())
    }

    /// Full error payload of an ERROR message.
    pub fn error_info(&self) -> Result<NlMsgErr> {
        if !self.is_error() {
            return Err(Error::InvalidMessage(format!(
                "message type {} is not an error",
                self.msg_type
            )));
        }
        NlMsgErr::from_payload(self.payload_bytes())
    }

    /// Extended ACK attributes following the error payload.
    ///
    /// Empty unless the kernel set `NLM_F_ACK_TLVS`.
    pub fn ext_ack_attrs(&self) -> Result<AttrStream<'_>> {
        let err = self.error_info()?;
        let data = self.payload_bytes();
        if self.flags & NLM_F_ACK_TLVS == 0 {
            return Ok(AttrStream::new(data, data.len()));
        }
        // Without NLM_F_CAPPED the whole request is echoed back.
        let offset = if self.flags & NLM_F_CAPPED != 0 {
            std::mem::size_of::<NlMsgErr>()
        } else {
            4 + nlmsg_align(err.msg.nlmsg_len as usize)
        };
        Ok(AttrStream::new(data, offset))
    }

    /// Human-readable message from the extended ACK, if present.
    pub fn ext_ack_message(&self) -> Option<String> {
        self.ext_ack_attrs()
            .ok()?
            .filter_map(|attr| attr.ok())
            .find(|attr| attr.kind() == NLMSGERR_ATTR_MSG)
            .and_then(|attr| attr.get_str().ok().map(str::to_string))
    }

    /// Turn a kernel error reply into [`Error::Kernel`].
    ///
    /// ACKs and non-error messages pass.
    pub fn check(&self) -> Result<()> {
        if !self.is_error() {
            return Ok(());
        }
        let errno = self.errno()?;
        if errno == 0 {
            return Ok(());
        }
        let message = match self.ext_ack_message() {
            Some(ext) => format!("{}: {}", error_string(errno), ext),
            None => error_string(errno),
        };
        Err(Error::Kernel { errno, message })
    }

    /// Iterate the payload attributes, skipping `offset` header bytes.
    pub fn attrs(&self, offset: usize) -> AttrStream<'_> {
        AttrStream::new(self.payload_bytes(), offset)
    }

    /// Serialize header, payload and trailing padding.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = self.payload.as_ref().ok_or(Error::MissingPayload)?;
        let total = self.encoded_len();

        let mut buf = BytesMut::with_capacity(total);
        buf.extend_from_slice(self.header().as_bytes());
        payload.write_to(&mut buf);
        buf.resize(total, 0);
        Ok(buf.to_vec())
    }

    /// Decode one message; everything after the header becomes payload.
    ///
    /// The caller hands over exactly one message's bytes, usually via
    /// [`MessageList::split`](super::multipart::MessageList::split).
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < NLMSG_HDRLEN {
            return Err(Error::Truncated {
                expected: NLMSG_HDRLEN,
                actual: data.len(),
            });
        }
        let hdr = NlMsgHdr::from_prefix(data)?;

        Ok(Self {
            msg_type: hdr.nlmsg_type,
            flags: hdr.nlmsg_flags,
            seq: hdr.nlmsg_seq,
            port_id: hdr.nlmsg_pid,
            declared_len: Some(hdr.nlmsg_len),
            payload: Some(Payload::from_bytes(&data[NLMSG_HDRLEN..])),
        })
    }
}
