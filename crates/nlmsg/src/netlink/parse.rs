//! Wire traits and parser combinators shared by the codec.
//!
//! This module provides:
//! - `FromNetlink` for fixed structures decoded from the front of a buffer
//! - `ToNetlink`, the "serializable wire fragment" used for attributes,
//!   payloads and subsystem headers
//! - Core parser combinators using winnow
//!
//! All multi-byte fields are in host byte order, which is what the kernel
//! uses for netlink headers and attribute headers.

use std::mem::size_of;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bytes::BytesMut;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::take;
use zerocopy::FromBytes;

use super::error::{Error, Result};
use super::message::NlMsgHdr;

/// Result type for winnow parsers.
pub type PResult<T> = core::result::Result<T, ErrMode<ContextError>>;

/// Trait for types that can be parsed from netlink wire format.
pub trait FromNetlink: Sized {
    /// Parse from a mutable byte slice reference.
    /// The slice is advanced past the consumed bytes.
    fn parse(input: &mut &[u8]) -> PResult<Self>;

    /// Parse from the front of a byte slice, ignoring any trailing bytes.
    fn from_prefix(data: &[u8]) -> Result<Self> {
        let mut input = data;
        Self::parse(&mut input).map_err(|e| Error::Parse(format!("{}", e)))
    }
}

/// Trait for values that serialize to a contiguous wire fragment.
///
/// Implemented by attributes, payloads and every fixed subsystem header,
/// so that [`Message::put_extra_header`](super::message::Message::put_extra_header)
/// can accept any of them.
pub trait ToNetlink {
    /// Serialized size in bytes, including any trailing padding.
    fn netlink_len(&self) -> usize;

    /// Append the wire form to `buf`.
    fn write_to(&self, buf: &mut BytesMut);

    /// Serialize to a new byte vector.
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.netlink_len());
        self.write_to(&mut buf);
        buf.to_vec()
    }
}

#[inline]
pub(crate) fn cut() -> ErrMode<ContextError> {
    ErrMode::Cut(ContextError::new())
}

// ============================================================================
// Core Parser Combinators
// ============================================================================

/// Parse a netlink message header.
pub fn parse_nlmsghdr(input: &mut &[u8]) -> PResult<NlMsgHdr> {
    let len = parse_u32_ne(input)?;
    let msg_type = parse_u16_ne(input)?;
    let flags = parse_u16_ne(input)?;
    let seq = parse_u32_ne(input)?;
    let pid = parse_u32_ne(input)?;

    Ok(NlMsgHdr {
        nlmsg_len: len,
        nlmsg_type: msg_type,
        nlmsg_flags: flags,
        nlmsg_seq: seq,
        nlmsg_pid: pid,
    })
}

/// Parse an attribute header and return (declared length, raw type).
///
/// Only the 4 header bytes are consumed; the value and padding are left
/// for the caller, which knows how much of the buffer it may claim.
pub fn parse_attr_header(input: &mut &[u8]) -> PResult<(u16, u16)> {
    let len = parse_u16_ne(input)?;
    let attr_type = parse_u16_ne(input)?;
    Ok((len, attr_type))
}

/// Parse a fixed-layout struct by copying `size_of::<T>()` bytes.
pub fn parse_struct<T: FromBytes>(input: &mut &[u8]) -> PResult<T> {
    let bytes = take_bytes(input, size_of::<T>())?;
    T::read_from_bytes(bytes).map_err(|_| cut())
}

// ============================================================================
// Primitive Parsers
// ============================================================================

/// Take exactly `count` bytes from the front of the input.
pub fn take_bytes<'a>(input: &mut &'a [u8], count: usize) -> PResult<&'a [u8]> {
    take(count).parse_next(input)
}

/// Parse a u16 in native endian.
pub fn parse_u16_ne(input: &mut &[u8]) -> PResult<u16> {
    let bytes = take_bytes(input, 2)?;
    Ok(u16::from_ne_bytes(bytes.try_into().map_err(|_| cut())?))
}

/// Parse a u32 in native endian.
pub fn parse_u32_ne(input: &mut &[u8]) -> PResult<u32> {
    let bytes = take_bytes(input, 4)?;
    Ok(u32::from_ne_bytes(bytes.try_into().map_err(|_| cut())?))
}

/// Parse an i32 in native endian.
pub fn parse_i32_ne(input: &mut &[u8]) -> PResult<i32> {
    let bytes = take_bytes(input, 4)?;
    Ok(i32::from_ne_bytes(bytes.try_into().map_err(|_| cut())?))
}

/// Parse an IP address based on address family.
pub fn parse_ip_addr(data: &[u8], family: u8) -> Result<IpAddr> {
    match i32::from(family) {
        libc::AF_INET => {
            let arr: [u8; 4] = data.try_into().map_err(|_| Error::Truncated {
                expected: 4,
                actual: data.len(),
            })?;
            Ok(IpAddr::V4(Ipv4Addr::from(arr)))
        }
        libc::AF_INET6 => {
            let arr: [u8; 16] = data.try_into().map_err(|_| Error::Truncated {
                expected: 16,
                actual: data.len(),
            })?;
            Ok(IpAddr::V6(Ipv6Addr::from(arr)))
        }
        _ => Err(Error::InvalidMessage(format!(
            "unknown address family: {}",
            family
        ))),
    }
}

/// Format a hardware address as colon-separated hex.
pub fn format_mac_addr(mac: &[u8]) -> String {
    mac.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

impl FromNetlink for NlMsgHdr {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        parse_nlmsghdr(input)
    }
}
