//! Attribute stream parsing and table-driven dispatch.
//!
//! [`AttrStream`] walks a buffer of back-to-back attributes. [`dispatch`]
//! drives a stream through an [`AttrTable`], a map from attribute type
//! code to a handler that fills a typed field struct. Anything the table
//! has no entry for is kept in [`Parsed::unmatched`].
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//! use nlmsg::netlink::{Attr, AttrTable, Payload, dispatch};
//!
//! #[derive(Default)]
//! struct Family {
//!     id: u16,
//!     name: String,
//! }
//!
//! static FAMILY: LazyLock<AttrTable<Family>> = LazyLock::new(|| {
//!     AttrTable::<Family>::new()
//!         .on(1, |f, a| {
//!             f.id = a.get_u16()?;
//!             Ok(())
//!         })
//!         .on(2, |f, a| {
//!             f.name = a.get_str()?.to_string();
//!             Ok(())
//!         })
//! });
//!
//! let mut payload = Payload::new();
//! payload.add_attr(&Attr::new_u16(1, 0x10)?);
//! payload.add_attr(&Attr::new_strz(2, "nlctrl")?);
//! payload.add_attr(&Attr::new_u32(3, 2)?);
//!
//! let parsed = dispatch(payload.as_bytes(), 0, &FAMILY)?;
//! assert_eq!(parsed.fields.id, 0x10);
//! assert_eq!(parsed.fields.name, "nlctrl");
//! assert_eq!(parsed.unmatched.len(), 1);
//! # Ok::<(), nlmsg::Error>(())
//! ```

use std::collections::HashMap;

use super::attr::{Attr, nla_align};
use super::error::Result;

/// Lazy iterator over the attributes in a buffer.
///
/// Each item owns a copy of its value. A malformed attribute is reported
/// once as an error, after which the stream is exhausted.
#[derive(Debug, Clone)]
pub struct AttrStream<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> AttrStream<'a> {
    /// Start reading attributes at `offset` bytes into `data`.
    pub fn new(data: &'a [u8], offset: usize) -> Self {
        Self {
            data,
            cursor: offset,
        }
    }

    /// Byte offset of the next attribute.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl Iterator for AttrStream<'_> {
    type Item = Result<Attr>;

    fn next(&mut self) -> Option<Self::Item> {
        // Not even a length field left.
        if self.data.len().saturating_sub(self.cursor) < 2 {
            return None;
        }

        match Attr::decode(&self.data[self.cursor..]) {
            Ok(attr) => {
                let end = self.cursor + 4 + attr.value_len();
                self.cursor = nla_align(end);
                Some(Ok(attr))
            }
            Err(e) => {
                self.cursor = self.data.len();
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for AttrStream<'_> {}

/// Handler invoked for one attribute type code.
pub type AttrHandler<T> = fn(&mut T, &Attr) -> Result<()>;

/// Dispatch table from attribute type code to handler.
///
/// Lookups use [`Attr::kind`], so the nested and byte-order flags never
/// affect which handler runs.
pub struct AttrTable<T> {
    handlers: HashMap<u16, AttrHandler<T>>,
}

impl<T> AttrTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler for `kind`, replacing any previous one.
    pub fn on(mut self, kind: u16, handler: AttrHandler<T>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Look up the handler for a type code.
    pub fn get(&self, kind: u16) -> Option<AttrHandler<T>> {
        self.handlers.get(&kind).copied()
    }

    /// Number of registered type codes.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<T> Default for AttrTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for AttrTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("AttrTable").field("kinds", &kinds).finish()
    }
}

/// Result of [`dispatch`]: the filled fields plus everything unrecognized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parsed<T> {
    /// Fields set by the table's handlers.
    pub fields: T,
    /// Attributes whose type code had no handler, in stream order.
    pub unmatched: Vec<Attr>,
}

/// Run every attribute of `data[offset..]` through `table`.
///
/// Stops at the first decode or handler error.
pub fn dispatch<T: Default>(data: &[u8], offset: usize, table: &AttrTable<T>) -> Result<Parsed<T>> {
    dispatch_into(data, offset, table, T::default())
}

/// Like [`dispatch`], starting from already populated `fields`.
///
/// Useful when handlers depend on the fixed header, such as an address
/// family decoded before the attributes.
pub fn dispatch_into<T>(
    data: &[u8],
    offset: usize,
    table: &AttrTable<T>,
    fields: T,
) -> Result<Parsed<T>> {
    let mut parsed = Parsed {
        fields,
        unmatched: Vec::new(),
    };
    for attr in AttrStream::new(data, offset) {
        let attr = attr?;
        match table.get(attr.kind()) {
            Some(handler) => handler(&mut parsed.fields, &attr)?,
            None => parsed.unmatched.push(attr),
        }
    }
    Ok(parsed)
}

/// Dispatch the attributes nested inside `attr`.
pub fn dispatch_nested<T: Default>(attr: &Attr, table: &AttrTable<T>) -> Result<Parsed<T>> {
    dispatch(attr.get_bytes(), 0, table)
}
