//! Netlink message codec for Linux.
//!
//! Builds and parses netlink messages and their type-length-value
//! attributes, splits multipart replies into individual messages, and
//! runs request/reply and dump exchanges over a netlink socket.
//!
//! # Features
//!
//! - `tokio` - Async socket driven by the tokio reactor
//! - `serde` - `Serialize` for parsed records (families, links, routes)
//! - `full` - All features enabled
//!
//! # Example
//!
//! ```rust,no_run
//! use nlmsg::netlink::{NetlinkSocket, Protocol};
//! use nlmsg::netlink::rtnl::link;
//!
//! # fn example() -> nlmsg::Result<()> {
//! let socket = NetlinkSocket::new(Protocol::Route)?;
//! for info in link::list_links(&socket)? {
//!     println!("{}: {}", info.index, info.ifname.unwrap_or_default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod netlink;

// Re-export common types at crate root for convenience
pub use netlink::{Attr, Error, Message, MessageList, NetlinkSocket, Protocol, Result};
