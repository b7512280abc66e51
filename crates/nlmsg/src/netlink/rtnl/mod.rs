//! Route netlink (NETLINK_ROUTE) headers and attribute tables.
//!
//! Only the pieces needed to list links and routes and to toggle a link
//! up or down. Each message starts with a fixed family header
//! ([`RtGenMsg`], [`IfInfoMsg`] or [`RtMsg`]) followed by attributes.

pub mod link;
pub mod route;

use bytes::BytesMut;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::netlink::parse::{FromNetlink, PResult, ToNetlink, parse_struct};

pub use link::{LinkEvent, LinkInfo, LinkMonitor};
pub use route::RouteInfo;

// Link messages
pub const RTM_NEWLINK: u16 = 16;
pub const RTM_DELLINK: u16 = 17;
pub const RTM_GETLINK: u16 = 18;
pub const RTM_SETLINK: u16 = 19;

// Route messages
pub const RTM_NEWROUTE: u16 = 24;
pub const RTM_DELROUTE: u16 = 25;
pub const RTM_GETROUTE: u16 = 26;

/// Interface flags (IFF_*).
pub const IFF_UP: u32 = 0x1;
pub const IFF_BROADCAST: u32 = 0x2;
pub const IFF_LOOPBACK: u32 = 0x8;
pub const IFF_POINTOPOINT: u32 = 0x10;
pub const IFF_RUNNING: u32 = 0x40;
pub const IFF_NOARP: u32 = 0x80;
pub const IFF_PROMISC: u32 = 0x100;
pub const IFF_MULTICAST: u32 = 0x1000;
pub const IFF_LOWER_UP: u32 = 0x10000;

/// Link attributes (IFLA_*).
pub const IFLA_UNSPEC: u16 = 0;
pub const IFLA_ADDRESS: u16 = 1;
pub const IFLA_BROADCAST: u16 = 2;
pub const IFLA_IFNAME: u16 = 3;
pub const IFLA_MTU: u16 = 4;
pub const IFLA_LINK: u16 = 5;
pub const IFLA_QDISC: u16 = 6;
pub const IFLA_STATS: u16 = 7;
pub const IFLA_MASTER: u16 = 10;
pub const IFLA_TXQLEN: u16 = 13;
pub const IFLA_OPERSTATE: u16 = 16;
pub const IFLA_LINKMODE: u16 = 17;
pub const IFLA_LINKINFO: u16 = 18;
pub const IFLA_GROUP: u16 = 27;
pub const IFLA_EXT_MASK: u16 = 29;

/// Route attributes (RTA_*).
pub const RTA_UNSPEC: u16 = 0;
pub const RTA_DST: u16 = 1;
pub const RTA_SRC: u16 = 2;
pub const RTA_IIF: u16 = 3;
pub const RTA_OIF: u16 = 4;
pub const RTA_GATEWAY: u16 = 5;
pub const RTA_PRIORITY: u16 = 6;
pub const RTA_PREFSRC: u16 = 7;
pub const RTA_METRICS: u16 = 8;
pub const RTA_MULTIPATH: u16 = 9;
pub const RTA_FLOW: u16 = 11;
pub const RTA_CACHEINFO: u16 = 12;
pub const RTA_TABLE: u16 = 15;
pub const RTA_MARK: u16 = 16;
pub const RTA_PREF: u16 = 20;

/// Route metrics, nested in RTA_METRICS (RTAX_*).
pub const RTAX_UNSPEC: u16 = 0;
pub const RTAX_LOCK: u16 = 1;
pub const RTAX_MTU: u16 = 2;
pub const RTAX_WINDOW: u16 = 3;
pub const RTAX_RTT: u16 = 4;
pub const RTAX_RTTVAR: u16 = 5;
pub const RTAX_SSTHRESH: u16 = 6;
pub const RTAX_CWND: u16 = 7;
pub const RTAX_ADVMSS: u16 = 8;
pub const RTAX_REORDERING: u16 = 9;
pub const RTAX_HOPLIMIT: u16 = 10;
pub const RTAX_INITCWND: u16 = 11;
pub const RTAX_FEATURES: u16 = 12;
pub const RTAX_RTO_MIN: u16 = 13;
pub const RTAX_INITRWND: u16 = 14;
pub const RTAX_QUICKACK: u16 = 15;

/// Route origin (RTPROT_*).
pub const RTPROT_UNSPEC: u8 = 0;
pub const RTPROT_REDIRECT: u8 = 1;
pub const RTPROT_KERNEL: u8 = 2;
pub const RTPROT_BOOT: u8 = 3;
pub const RTPROT_STATIC: u8 = 4;
pub const RTPROT_RA: u8 = 9;
pub const RTPROT_DHCP: u8 = 16;

/// Route scope (RT_SCOPE_*).
pub const RT_SCOPE_UNIVERSE: u8 = 0;
pub const RT_SCOPE_SITE: u8 = 200;
pub const RT_SCOPE_LINK: u8 = 253;
pub const RT_SCOPE_HOST: u8 = 254;
pub const RT_SCOPE_NOWHERE: u8 = 255;

/// Route type (RTN_*).
pub const RTN_UNSPEC: u8 = 0;
pub const RTN_UNICAST: u8 = 1;
pub const RTN_LOCAL: u8 = 2;
pub const RTN_BROADCAST: u8 = 3;
pub const RTN_ANYCAST: u8 = 4;
pub const RTN_MULTICAST: u8 = 5;
pub const RTN_BLACKHOLE: u8 = 6;
pub const RTN_UNREACHABLE: u8 = 7;
pub const RTN_PROHIBIT: u8 = 8;

/// Legacy multicast group masks for the bind address (RTMGRP_*).
pub const RTMGRP_LINK: u32 = 0x1;
pub const RTMGRP_NOTIFY: u32 = 0x2;
pub const RTMGRP_NEIGH: u32 = 0x4;
pub const RTMGRP_IPV4_IFADDR: u32 = 0x10;
pub const RTMGRP_IPV4_ROUTE: u32 = 0x40;
pub const RTMGRP_IPV6_IFADDR: u32 = 0x100;
pub const RTMGRP_IPV6_ROUTE: u32 = 0x400;

/// Multicast group numbers for `add_membership` (RTNLGRP_*).
pub const RTNLGRP_LINK: u32 = 1;
pub const RTNLGRP_IPV4_ROUTE: u32 = 7;
pub const RTNLGRP_IPV6_ROUTE: u32 = 11;

/// Well-known routing tables.
pub const RT_TABLE_UNSPEC: u32 = 0;
pub const RT_TABLE_DEFAULT: u32 = 253;
pub const RT_TABLE_MAIN: u32 = 254;
pub const RT_TABLE_LOCAL: u32 = 255;

/// Ask for the compact VF info in link dumps.
pub const RTEXT_FILTER_VF: u32 = 1;

/// rtgenmsg: a bare address family, used by dump requests.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtGenMsg {
    /// Address family (usually AF_UNSPEC = 0)
    pub rtgen_family: u8,
}

impl RtGenMsg {
    /// Create with a specific address family.
    pub fn with_family(family: u8) -> Self {
        Self {
            rtgen_family: family,
        }
    }
}

/// ifinfomsg: link message header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    /// Address family (usually AF_UNSPEC).
    pub ifi_family: u8,
    /// Padding.
    pub __ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Change mask.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// rtmsg: route message header.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family.
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// TOS filter.
    pub rtm_tos: u8,
    /// Routing table ID.
    pub rtm_table: u8,
    /// Routing protocol (RTPROT_*).
    pub rtm_protocol: u8,
    /// Route scope (RT_SCOPE_*).
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    /// Route flags.
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

macro_rules! fixed_header {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromNetlink for $ty {
                fn parse(input: &mut &[u8]) -> PResult<Self> {
                    parse_struct(input)
                }
            }

            impl ToNetlink for $ty {
                fn netlink_len(&self) -> usize {
                    std::mem::size_of::<Self>()
                }

                fn write_to(&self, buf: &mut BytesMut) {
                    buf.extend_from_slice(IntoBytes::as_bytes(self));
                }
            }
        )+
    };
}

fixed_header!(RtGenMsg, IfInfoMsg, RtMsg);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::Message;

    #[test]
    fn test_header_sizes() {
        assert_eq!(std::mem::size_of::<RtGenMsg>(), 1);
        assert_eq!(IfInfoMsg::SIZE, 16);
        assert_eq!(RtMsg::SIZE, 12);
    }

    #[test]
    fn test_rtgenmsg_padded_as_extra_header() {
        let mut msg = Message::new(RTM_GETLINK, 0);
        msg.put_extra_header(&RtGenMsg::with_family(libc::AF_INET6 as u8));
        assert_eq!(msg.payload_bytes(), &[libc::AF_INET6 as u8, 0, 0, 0]);
        assert_eq!(msg.encode().unwrap().len(), 20);
    }

    #[test]
    fn test_ifinfomsg_roundtrip() {
        let hdr = IfInfoMsg {
            ifi_index: 2,
            ifi_flags: IFF_UP,
            ifi_change: IFF_UP,
            ..Default::default()
        };
        let bytes = hdr.to_bytes();
        assert_eq!(bytes.len(), 16);
        assert_eq!(IfInfoMsg::from_prefix(&bytes).unwrap(), hdr);
    }
}
