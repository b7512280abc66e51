//! Netlink attribute (nlattr) codec.
//!
//! Attributes are Type-Length-Value records:
//!
//! ```text
//! |<-- 2 bytes -->|<-- 2 bytes -->|<-- variable -->|<-- 0..3 -->|
//! |    length     |     type      |     value      |  padding   |
//! |<--------- header ------------>|
//! ```
//!
//! The length field covers header and value but never the padding, so a
//! reader always advances by `nla_align(length)`.

use std::fmt;

use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::error::{Error, Result};
use super::parse::{ToNetlink, parse_attr_header};
use super::stream::AttrStream;

/// Netlink attribute alignment.
pub const NLA_ALIGNTO: usize = 4;

/// Align a length to NLA_ALIGNTO boundary.
#[inline]
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}

/// Size of the attribute header.
pub const NLA_HDRLEN: usize = nla_align(std::mem::size_of::<NlAttr>());

/// Attribute type flags.
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// Largest value that still fits the 16-bit length field.
const NLA_MAX_VALUE_LEN: usize = u16::MAX as usize - NLA_HDRLEN;

/// Netlink attribute header (mirrors struct nlattr).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct NlAttr {
    /// Length including header, excluding padding.
    pub nla_len: u16,
    /// Attribute type, including flag bits.
    pub nla_type: u16,
}

impl NlAttr {
    /// Create a new attribute header.
    pub fn new(attr_type: u16, data_len: usize) -> Self {
        Self {
            nla_len: (NLA_HDRLEN + data_len) as u16,
            nla_type: attr_type,
        }
    }

    /// Convert to bytes.
    pub fn as_bytes(&self) -> &[u8] {
        <Self as IntoBytes>::as_bytes(self)
    }
}

/// Attribute payload data types (mirrors the kernel's NLA_* policy types).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDataType {
    Unspec = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    String = 5,
    Flag = 6,
    Msecs = 7,
    Nested = 8,
    NestedCompat = 9,
    NulString = 10,
    Binary = 11,
}

impl AttrDataType {
    /// Highest defined data type.
    pub const MAX: u16 = AttrDataType::Binary as u16;

    /// Exact value width for fixed-size types.
    pub fn fixed_len(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 => Some(4),
            Self::U64 | Self::Msecs => Some(8),
            Self::Flag => Some(0),
            _ => None,
        }
    }
}

/// A single netlink attribute owning its value bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Attr {
    attr_type: u16,
    value: Vec<u8>,
}

fn checked<T, V>(value: V, bits: u32) -> Result<T>
where
    V: TryInto<T> + Copy + fmt::Display,
{
    value.try_into().map_err(|_| Error::OutOfRange {
        value: value.to_string(),
        bits,
    })
}

impl Attr {
    /// Build an attribute from a raw type field and value bytes.
    pub fn new(attr_type: u16, value: impl Into<Vec<u8>>) -> Result<Self> {
        let value = value.into();
        if value.len() > NLA_MAX_VALUE_LEN {
            return Err(Error::AttributeTooLarge {
                len: NLA_HDRLEN + value.len(),
            });
        }
        Ok(Self { attr_type, value })
    }

    /// u8 attribute. Fails if `value` is negative or above `u8::MAX`.
    pub fn new_u8<V>(attr_type: u16, value: V) -> Result<Self>
    where
        V: TryInto<u8> + Copy + fmt::Display,
    {
        let v: u8 = checked(value, 8)?;
        Self::new(attr_type, [v])
    }

    /// u16 attribute in host byte order.
    pub fn new_u16<V>(attr_type: u16, value: V) -> Result<Self>
    where
        V: TryInto<u16> + Copy + fmt::Display,
    {
        let v: u16 = checked(value, 16)?;
        Self::new(attr_type, v.to_ne_bytes())
    }

    /// u32 attribute in host byte order.
    pub fn new_u32<V>(attr_type: u16, value: V) -> Result<Self>
    where
        V: TryInto<u32> + Copy + fmt::Display,
    {
        let v: u32 = checked(value, 32)?;
        Self::new(attr_type, v.to_ne_bytes())
    }

    /// u64 attribute in host byte order.
    pub fn new_u64<V>(attr_type: u16, value: V) -> Result<Self>
    where
        V: TryInto<u64> + Copy + fmt::Display,
    {
        let v: u64 = checked(value, 64)?;
        Self::new(attr_type, v.to_ne_bytes())
    }

    /// u16 attribute in network byte order.
    ///
    /// The `NLA_F_NET_BYTEORDER` flag is left to the caller.
    pub fn new_u16_be(attr_type: u16, value: u16) -> Result<Self> {
        Self::new(attr_type, value.to_be_bytes())
    }

    /// u32 attribute in network byte order.
    pub fn new_u32_be(attr_type: u16, value: u32) -> Result<Self> {
        Self::new(attr_type, value.to_be_bytes())
    }

    /// String attribute without a null terminator.
    pub fn new_strnz(attr_type: u16, value: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(attr_type, value.as_ref())
    }

    /// String attribute with exactly one null terminator appended.
    pub fn new_strz(attr_type: u16, value: impl AsRef<[u8]>) -> Result<Self> {
        let value = value.as_ref();
        let mut data = Vec::with_capacity(value.len() + 1);
        data.extend_from_slice(value);
        data.push(0);
        Self::new(attr_type, data)
    }

    /// Opaque binary attribute.
    pub fn new_binary(attr_type: u16, value: impl AsRef<[u8]>) -> Result<Self> {
        Self::new(attr_type, value.as_ref())
    }

    /// Empty (flag) attribute.
    pub fn new_flag(attr_type: u16) -> Self {
        Self {
            attr_type,
            value: Vec::new(),
        }
    }

    /// Nested attribute whose value is the serialized `children`.
    pub fn new_nested(attr_type: u16, children: &[Attr]) -> Result<Self> {
        let mut buf = BytesMut::new();
        for child in children {
            child.write_to(&mut buf);
        }
        Self::new(attr_type | NLA_F_NESTED, buf.to_vec())
    }

    /// Decode one attribute from the front of `data`.
    ///
    /// Exactly `length - 4` value bytes are copied; trailing padding is not
    /// consumed and need not be present.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < NLA_HDRLEN {
            return Err(Error::Truncated {
                expected: NLA_HDRLEN,
                actual: data.len(),
            });
        }

        let mut input = data;
        let (len, attr_type) =
            parse_attr_header(&mut input).map_err(|e| Error::Parse(format!("{}", e)))?;
        let len = len as usize;

        if len < NLA_HDRLEN {
            return Err(Error::InvalidAttribute(format!(
                "declared length {} shorter than header",
                len
            )));
        }
        if len > data.len() {
            return Err(Error::Truncated {
                expected: len,
                actual: data.len(),
            });
        }

        Ok(Self {
            attr_type,
            value: data[NLA_HDRLEN..len].to_vec(),
        })
    }

    /// Raw type field, flags included.
    pub fn raw_type(&self) -> u16 {
        self.attr_type
    }

    /// Type code without flags.
    pub fn kind(&self) -> u16 {
        self.attr_type & NLA_TYPE_MASK
    }

    /// Check if the nested flag is set.
    pub fn is_nested(&self) -> bool {
        self.attr_type & NLA_F_NESTED != 0
    }

    /// Flip the nested flag, leaving type code and byte-order flag alone.
    pub fn toggle_nested(&mut self) {
        self.attr_type ^= NLA_F_NESTED;
    }

    /// Check if the network-byte-order flag is set.
    pub fn is_net_byteorder(&self) -> bool {
        self.attr_type & NLA_F_NET_BYTEORDER != 0
    }

    /// Check the type code against the highest code a family defines.
    pub fn type_valid(&self, max: u16) -> bool {
        self.kind() <= max
    }

    /// Value length, unpadded.
    pub fn value_len(&self) -> usize {
        self.value.len()
    }

    /// Check the value against a data type.
    pub fn validate(&self, data_type: AttrDataType) -> Result<()> {
        let len = self.value.len();
        if let Some(expected) = data_type.fixed_len() {
            if len != expected {
                return Err(Error::WidthMismatch {
                    expected,
                    actual: len,
                });
            }
            return Ok(());
        }

        match data_type {
            AttrDataType::String if len == 0 => {
                Err(Error::InvalidAttribute("empty string attribute".into()))
            }
            AttrDataType::NulString if self.value.last() != Some(&0) => Err(
                Error::InvalidAttribute("string attribute is not null-terminated".into()),
            ),
            AttrDataType::Nested | AttrDataType::NestedCompat
                if len != 0 && len < NLA_HDRLEN =>
            {
                Err(Error::InvalidAttribute(format!(
                    "nested attribute of {} bytes cannot hold a header",
                    len
                )))
            }
            _ => Ok(()),
        }
    }

    fn fixed<const N: usize>(&self) -> Result<[u8; N]> {
        self.value
            .as_slice()
            .try_into()
            .map_err(|_| Error::WidthMismatch {
                expected: N,
                actual: self.value.len(),
            })
    }

    /// Read a u8 value.
    pub fn get_u8(&self) -> Result<u8> {
        Ok(self.fixed::<1>()?[0])
    }

    /// Read a u16 value (native endian).
    pub fn get_u16(&self) -> Result<u16> {
        Ok(u16::from_ne_bytes(self.fixed()?))
    }

    /// Read a u32 value (native endian).
    pub fn get_u32(&self) -> Result<u32> {
        Ok(u32::from_ne_bytes(self.fixed()?))
    }

    /// Read a u64 value (native endian).
    pub fn get_u64(&self) -> Result<u64> {
        Ok(u64::from_ne_bytes(self.fixed()?))
    }

    /// Read a u16 value (big endian / network order).
    pub fn get_u16_be(&self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.fixed()?))
    }

    /// Read a u32 value (big endian / network order).
    pub fn get_u32_be(&self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.fixed()?))
    }

    /// Raw value bytes.
    pub fn get_bytes(&self) -> &[u8] {
        &self.value
    }

    /// Value with one trailing null byte removed, if there is one.
    pub fn get_bytes_stripped(&self) -> Result<&[u8]> {
        match self.value.split_last() {
            None => Err(Error::InvalidAttribute("empty string attribute".into())),
            Some((0, rest)) => Ok(rest),
            Some(_) => Ok(&self.value),
        }
    }

    /// UTF-8 view of the stripped value.
    pub fn get_str(&self) -> Result<&str> {
        std::str::from_utf8(self.get_bytes_stripped()?)
            .map_err(|e| Error::InvalidAttribute(format!("invalid UTF-8: {}", e)))
    }

    /// Iterate the attributes nested inside this one.
    pub fn nested(&self) -> AttrStream<'_> {
        AttrStream::new(&self.value, 0)
    }

    /// Take ownership of the value bytes.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }
}

impl ToNetlink for Attr {
    fn netlink_len(&self) -> usize {
        NLA_HDRLEN + nla_align(self.value.len())
    }

    fn write_to(&self, buf: &mut BytesMut) {
        let start = buf.len();
        buf.extend_from_slice(NlAttr::new(self.attr_type, self.value.len()).as_bytes());
        buf.extend_from_slice(&self.value);
        buf.resize(start + self.netlink_len(), 0);
    }
}

impl fmt::Debug for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attr")
            .field("kind", &self.kind())
            .field("nested", &self.is_nested())
            .field("net_byteorder", &self.is_net_byteorder())
            .field("value", &self.value)
            .finish()
    }
}
