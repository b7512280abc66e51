//! Route messages.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::LazyLock;

use super::{
    RT_SCOPE_LINK, RT_SCOPE_UNIVERSE, RT_TABLE_MAIN, RTA_DST, RTA_FLOW, RTA_GATEWAY, RTA_METRICS,
    RTA_OIF, RTA_PREFSRC, RTA_PRIORITY, RTA_SRC, RTA_TABLE, RTM_GETROUTE, RTM_NEWROUTE,
    RTN_UNICAST, RTPROT_BOOT, RtMsg,
};
use crate::netlink::attr::Attr;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{Message, NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_REQUEST};
use crate::netlink::parse::{FromNetlink, parse_ip_addr};
use crate::netlink::socket::NetlinkSocket;
use crate::netlink::stream::{AttrTable, Parsed, dispatch_into};

/// A routing table entry as reported by RTM_NEWROUTE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RouteInfo {
    /// Address family (AF_INET or AF_INET6).
    pub family: u8,
    pub dst_len: u8,
    pub src_len: u8,
    /// Table ID. RTA_TABLE wins over the 8-bit header field.
    pub table: u32,
    pub protocol: u8,
    pub scope: u8,
    pub route_type: u8,
    pub dst: Option<IpAddr>,
    pub src: Option<IpAddr>,
    /// Output interface index.
    pub oif: Option<u32>,
    pub flow: Option<u32>,
    pub prefsrc: Option<IpAddr>,
    pub gateway: Option<IpAddr>,
    pub priority: Option<u32>,
    /// RTAX_* metric values keyed by metric type.
    pub metrics: BTreeMap<u16, u32>,
}

impl RouteInfo {
    /// Destination in `addr/len` form, or `default`.
    pub fn destination(&self) -> String {
        match self.dst {
            Some(dst) => format!("{}/{}", dst, self.dst_len),
            None if self.dst_len == 0 => "default".to_string(),
            None => format!("?/{}", self.dst_len),
        }
    }

    /// Parse a route message, keeping attributes with no handler.
    pub fn parse(msg: &Message) -> Result<Parsed<RouteInfo>> {
        if msg.msg_type() != RTM_NEWROUTE {
            return Err(Error::InvalidMessage(format!(
                "expected RTM_NEWROUTE, got type {}",
                msg.msg_type()
            )));
        }
        let payload = msg.payload_bytes();
        let rtm = RtMsg::from_prefix(payload).map_err(|_| Error::Truncated {
            expected: RtMsg::SIZE,
            actual: payload.len(),
        })?;

        let fields = RouteInfo {
            family: rtm.rtm_family,
            dst_len: rtm.rtm_dst_len,
            src_len: rtm.rtm_src_len,
            table: u32::from(rtm.rtm_table),
            protocol: rtm.rtm_protocol,
            scope: rtm.rtm_scope,
            route_type: rtm.rtm_type,
            ..Default::default()
        };
        dispatch_into(payload, RtMsg::SIZE, &ROUTE_ATTRS, fields)
    }

    /// Parse a route message.
    pub fn from_message(msg: &Message) -> Result<Self> {
        Ok(Self::parse(msg)?.fields)
    }
}

fn ip(route: &RouteInfo, attr: &Attr) -> Result<Option<IpAddr>> {
    parse_ip_addr(attr.get_bytes(), route.family).map(Some)
}

static ROUTE_ATTRS: LazyLock<AttrTable<RouteInfo>> = LazyLock::new(|| {
    AttrTable::<RouteInfo>::new()
        .on(RTA_TABLE, |r, a| {
            r.table = a.get_u32()?;
            Ok(())
        })
        .on(RTA_DST, |r, a| {
            r.dst = ip(r, a)?;
            Ok(())
        })
        .on(RTA_SRC, |r, a| {
            r.src = ip(r, a)?;
            Ok(())
        })
        .on(RTA_PREFSRC, |r, a| {
            r.prefsrc = ip(r, a)?;
            Ok(())
        })
        .on(RTA_GATEWAY, |r, a| {
            r.gateway = ip(r, a)?;
            Ok(())
        })
        .on(RTA_OIF, |r, a| {
            r.oif = Some(a.get_u32()?);
            Ok(())
        })
        .on(RTA_FLOW, |r, a| {
            r.flow = Some(a.get_u32()?);
            Ok(())
        })
        .on(RTA_PRIORITY, |r, a| {
            r.priority = Some(a.get_u32()?);
            Ok(())
        })
        .on(RTA_METRICS, |r, a| {
            for metric in a.nested() {
                let metric = metric?;
                r.metrics.insert(metric.kind(), metric.get_u32()?);
            }
            Ok(())
        })
});

/// Build an RTM_GETROUTE dump request for one address family.
///
/// `AF_UNSPEC` dumps every family.
pub fn dump_request(family: u8) -> Message {
    let rtm = RtMsg {
        rtm_family: family,
        ..Default::default()
    };
    let mut msg = Message::new(RTM_GETROUTE, NLM_F_REQUEST | NLM_F_DUMP);
    msg.put_extra_header(&rtm);
    msg
}

fn addr_family(addr: &IpAddr) -> (u8, u8) {
    match addr {
        IpAddr::V4(_) => (libc::AF_INET as u8, 32),
        IpAddr::V6(_) => (libc::AF_INET6 as u8, 128),
    }
}

fn addr_attr(kind: u16, addr: &IpAddr) -> Result<Attr> {
    match addr {
        IpAddr::V4(v4) => Attr::new_binary(kind, v4.octets()),
        IpAddr::V6(v6) => Attr::new_binary(kind, v6.octets()),
    }
}

/// Build an RTM_NEWROUTE request for a unicast route in the main table.
///
/// Without a gateway the route is link scoped. The gateway must be of the
/// same family as the destination.
pub fn add_request(
    dst: IpAddr,
    dst_len: u8,
    oif: u32,
    gateway: Option<IpAddr>,
) -> Result<Message> {
    let (family, max_len) = addr_family(&dst);
    if dst_len > max_len {
        return Err(Error::InvalidMessage(format!(
            "prefix length {} exceeds {} for {}",
            dst_len, max_len, dst
        )));
    }
    match gateway {
        Some(gw) if addr_family(&gw).0 != family => {
            return Err(Error::InvalidMessage(format!(
                "gateway {} does not match destination {}",
                gw, dst
            )));
        }
        _ => {}
    }

    let rtm = RtMsg {
        rtm_family: family,
        rtm_dst_len: dst_len,
        rtm_table: RT_TABLE_MAIN as u8,
        rtm_protocol: RTPROT_BOOT,
        rtm_scope: if gateway.is_some() {
            RT_SCOPE_UNIVERSE
        } else {
            RT_SCOPE_LINK
        },
        rtm_type: RTN_UNICAST,
        ..Default::default()
    };

    let mut msg = Message::new(RTM_NEWROUTE, NLM_F_REQUEST | NLM_F_CREATE);
    msg.put_extra_header(&rtm);
    msg.add_attr(&addr_attr(RTA_DST, &dst)?);
    msg.add_attr(&Attr::new_u32(RTA_OIF, oif)?);
    if let Some(gw) = gateway {
        msg.add_attr(&addr_attr(RTA_GATEWAY, &gw)?);
    }
    Ok(msg)
}

/// Add a route and wait for the kernel to acknowledge it.
pub fn add_route(
    socket: &NetlinkSocket,
    dst: IpAddr,
    dst_len: u8,
    oif: u32,
    gateway: Option<IpAddr>,
) -> Result<()> {
    let mut request = add_request(dst, dst_len, oif, gateway)?;
    request.set_flags(request.flags() | NLM_F_ACK);
    socket.request(&mut request)?;
    Ok(())
}

/// List the routes of one address family.
pub fn list_routes(socket: &NetlinkSocket, family: u8) -> Result<Vec<RouteInfo>> {
    let mut request = dump_request(family);
    socket
        .dump(&mut request)?
        .iter()
        .map(RouteInfo::from_message)
        .collect()
}
