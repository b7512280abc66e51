//! Netlink message and attribute codec.
//!
//! The layers, bottom-up:
//!
//! - [`attr`]: a single type-length-value attribute ([`Attr`]) with typed
//!   constructors and getters.
//! - [`stream`]: walking a run of attributes ([`AttrStream`]) and
//!   dispatching them to per-type handlers ([`AttrTable`]).
//! - [`message`]: one netlink message ([`Message`]) with its payload,
//!   error/ACK inspection and encode/decode.
//! - [`multipart`]: splitting a received datagram into its messages
//!   ([`MessageList`]).
//! - [`socket`]: a blocking netlink socket that runs request/reply and
//!   dump exchanges on top of the codec.
//!
//! [`genl`] and [`rtnl`] build requests and parse replies for the
//! Generic Netlink controller and for route netlink links and routes.
//!
//! # Quick Start
//!
//! ```rust
//! use nlmsg::netlink::{Attr, Message, MessageList, NLM_F_ACK, NLM_F_REQUEST};
//!
//! # fn example() -> nlmsg::Result<()> {
//! let mut msg = Message::new(0x10, NLM_F_REQUEST | NLM_F_ACK);
//! msg.set_seq(1);
//! msg.add_attr(&Attr::new_strz(2, "nlctrl")?);
//!
//! let bytes = msg.encode()?;
//! let list = MessageList::split(&bytes)?;
//! assert_eq!(list.len(), 1);
//! assert_eq!(list[0].seq(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod attr;
#[cfg(feature = "tokio")]
mod async_socket;
mod error;
#[cfg(test)]
mod fixtures;
pub mod genl;
pub mod message;
pub mod multipart;
pub mod parse;
pub mod rtnl;
pub mod socket;
pub mod stream;

pub use attr::{
    Attr, AttrDataType, NLA_ALIGNTO, NLA_F_NESTED, NLA_F_NET_BYTEORDER, NLA_HDRLEN,
    NLA_TYPE_MASK, NlAttr, nla_align,
};
#[cfg(feature = "tokio")]
pub use async_socket::AsyncNetlinkSocket;
pub use error::{Error, Result};
pub use message::{
    Message, NLM_F_ACK, NLM_F_ACK_TLVS, NLM_F_APPEND, NLM_F_ATOMIC, NLM_F_CAPPED, NLM_F_CREATE,
    NLM_F_DUMP, NLM_F_DUMP_FILTERED, NLM_F_DUMP_INTR, NLM_F_ECHO, NLM_F_EXCL, NLM_F_MATCH,
    NLM_F_MULTI, NLM_F_REPLACE, NLM_F_REQUEST, NLM_F_ROOT, NLMSG_ALIGNTO, NLMSG_HDRLEN,
    NLMSG_MIN_TYPE, NlMsgErr, NlMsgHdr, NlMsgType, Payload, error_string, nlmsg_align,
};
pub use multipart::MessageList;
pub use parse::{FromNetlink, ToNetlink};
pub use socket::{NetlinkSocket, Protocol, SOCKET_AUTOPID, socket_buffer_size};
pub use stream::{
    AttrHandler, AttrStream, AttrTable, Parsed, dispatch, dispatch_into, dispatch_nested,
};
