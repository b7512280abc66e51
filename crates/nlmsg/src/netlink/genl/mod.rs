//! Generic Netlink (GENL) support.
//!
//! Generic Netlink extends the standard netlink protocol with:
//! - Dynamic family ID allocation (resolved via control family)
//! - Family-specific commands and attributes
//! - Multicast group support per family
//!
//! This module provides the GENL header and the controller family
//! (`nlctrl`) used to resolve names like `nl80211` to message types.
//!
//! # Example
//!
//! ```rust,no_run
//! use nlmsg::netlink::{NetlinkSocket, Protocol};
//! use nlmsg::netlink::genl::resolve_family;
//!
//! # fn example() -> nlmsg::Result<()> {
//! let socket = NetlinkSocket::new(Protocol::Generic)?;
//! let family = resolve_family(&socket, "nl80211")?;
//! println!("nl80211 family ID: {}", family.id);
//! # Ok(())
//! # }
//! ```

mod ctrl;
mod header;

pub use ctrl::{FamilyInfo, dump_families_request, get_family_request, list_families, resolve_family};
pub use header::{GENL_HDRLEN, GenlMsgHdr};

/// Length of a family name, terminator included.
pub const GENL_NAMSIZ: usize = 16;

pub const GENL_MIN_ID: u16 = crate::netlink::message::NLMSG_MIN_TYPE;
pub const GENL_MAX_ID: u16 = 1023;

// Control family constants (fixed, not dynamically assigned)
pub const GENL_ID_GENERATE: u16 = 0;
pub const GENL_ID_CTRL: u16 = 0x10;

// Operation flags reported in CTRL_ATTR_OP_FLAGS
pub const GENL_ADMIN_PERM: u32 = 0x01;
pub const GENL_CMD_CAP_DO: u32 = 0x02;
pub const GENL_CMD_CAP_DUMP: u32 = 0x04;
pub const GENL_CMD_CAP_HASPOL: u32 = 0x08;

/// Control family commands
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlCmd {
    Unspec = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
    NewOps = 4,
    DelOps = 5,
    GetOps = 6,
    NewMcastGrp = 7,
    DelMcastGrp = 8,
    GetMcastGrp = 9,
    GetPolicy = 10,
}

/// Control family attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttr {
    Unspec = 0,
    FamilyId = 1,
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
    Policy = 8,
    OpPolicy = 9,
    Op = 10,
}

/// Attributes inside one CTRL_ATTR_OPS entry
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrOp {
    Unspec = 0,
    Id = 1,
    Flags = 2,
}

/// Control family multicast group attributes
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtrlAttrMcastGrp {
    Unspec = 0,
    Name = 1,
    Id = 2,
}
