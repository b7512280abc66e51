//! Link (network interface) messages.

use std::collections::VecDeque;
use std::sync::LazyLock;

use super::{
    IFF_RUNNING, IFF_UP, IFLA_ADDRESS, IFLA_IFNAME, IFLA_MTU, IFLA_OPERSTATE, IFLA_TXQLEN,
    IfInfoMsg, RTM_DELLINK, RTM_GETLINK, RTM_NEWLINK, RTMGRP_LINK, RtGenMsg,
};
use crate::netlink::attr::Attr;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{Message, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST, NlMsgType};
use crate::netlink::parse::{FromNetlink, format_mac_addr};
use crate::netlink::socket::{NetlinkSocket, Protocol, SOCKET_AUTOPID};
use crate::netlink::stream::{AttrTable, Parsed, dispatch};

/// Operational state (IF_OPER_*).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum OperState {
    Unknown = 0,
    NotPresent = 1,
    Down = 2,
    LowerLayerDown = 3,
    Testing = 4,
    Dormant = 5,
    Up = 6,
}

impl From<u8> for OperState {
    fn from(val: u8) -> Self {
        match val {
            1 => Self::NotPresent,
            2 => Self::Down,
            3 => Self::LowerLayerDown,
            4 => Self::Testing,
            5 => Self::Dormant,
            6 => Self::Up,
            _ => Self::Unknown,
        }
    }
}

impl OperState {
    /// Get the name of this state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::NotPresent => "NOT_PRESENT",
            Self::Down => "DOWN",
            Self::LowerLayerDown => "LOWERLAYERDOWN",
            Self::Testing => "TESTING",
            Self::Dormant => "DORMANT",
            Self::Up => "UP",
        }
    }
}

/// A network interface as reported by RTM_NEWLINK.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LinkInfo {
    /// Interface index.
    pub index: i32,
    /// Device flags (IFF_*).
    pub flags: u32,
    pub ifname: Option<String>,
    pub mtu: Option<u32>,
    pub txqlen: Option<u32>,
    pub operstate: Option<OperState>,
    /// Hardware address, colon separated.
    pub address: Option<String>,
}

impl LinkInfo {
    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.flags & IFF_UP != 0
    }

    /// Check if the interface is running.
    pub fn is_running(&self) -> bool {
        self.flags & IFF_RUNNING != 0
    }

    /// Parse a link message, keeping attributes with no handler.
    pub fn parse(msg: &Message) -> Result<Parsed<LinkInfo>> {
        if msg.msg_type() != RTM_NEWLINK {
            return Err(Error::InvalidMessage(format!(
                "expected RTM_NEWLINK, got type {}",
                msg.msg_type()
            )));
        }
        Self::parse_body(msg)
    }

    fn parse_body(msg: &Message) -> Result<Parsed<LinkInfo>> {
        let payload = msg.payload_bytes();
        let ifi = IfInfoMsg::from_prefix(payload).map_err(|_| Error::Truncated {
            expected: IfInfoMsg::SIZE,
            actual: payload.len(),
        })?;

        let mut parsed = dispatch(payload, IfInfoMsg::SIZE, &LINK_ATTRS)?;
        parsed.fields.index = ifi.ifi_index;
        parsed.fields.flags = ifi.ifi_flags;
        Ok(parsed)
    }

    /// Parse a link message.
    pub fn from_message(msg: &Message) -> Result<Self> {
        Ok(Self::parse(msg)?.fields)
    }
}

/// A link change announced on the link multicast group.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "action", content = "link", rename_all = "lowercase")
)]
pub enum LinkEvent {
    /// A link appeared or changed (RTM_NEWLINK).
    New(LinkInfo),
    /// A link went away (RTM_DELLINK).
    Del(LinkInfo),
}

impl LinkEvent {
    /// Classify one received message.
    ///
    /// Kernel error replies become [`Error::Kernel`]. Control and
    /// unrelated messages give `None`.
    pub fn from_message(msg: &Message) -> Result<Option<Self>> {
        match msg.msg_type() {
            RTM_NEWLINK => Ok(Some(Self::New(LinkInfo::parse_body(msg)?.fields))),
            RTM_DELLINK => Ok(Some(Self::Del(LinkInfo::parse_body(msg)?.fields))),
            NlMsgType::ERROR => msg.check().map(|()| None),
            other => {
                tracing::trace!(msg_type = other, "ignoring non-link message");
                Ok(None)
            }
        }
    }

    /// The link this event describes.
    pub fn link(&self) -> &LinkInfo {
        match self {
            Self::New(link) | Self::Del(link) => link,
        }
    }

    /// Returns "new" or "del".
    pub fn action(&self) -> &'static str {
        match self {
            Self::New(_) => "new",
            Self::Del(_) => "del",
        }
    }
}

/// Blocking listener for link changes.
///
/// Each receive may carry several notifications; they are handed out one
/// at a time in arrival order.
///
/// ```no_run
/// use nlmsg::netlink::rtnl::LinkMonitor;
///
/// let monitor = LinkMonitor::new()?;
/// for event in monitor.take(3) {
///     let event = event?;
///     println!("{} {:?}", event.action(), event.link().ifname);
/// }
/// # Ok::<(), nlmsg::Error>(())
/// ```
pub struct LinkMonitor {
    socket: NetlinkSocket,
    pending: VecDeque<LinkEvent>,
}

impl LinkMonitor {
    /// Open a route socket subscribed to link notifications.
    pub fn new() -> Result<Self> {
        let socket = NetlinkSocket::bind(Protocol::Route, SOCKET_AUTOPID, RTMGRP_LINK)?;
        Ok(Self::from_socket(socket))
    }

    /// Listen on an already subscribed socket.
    pub fn from_socket(socket: NetlinkSocket) -> Self {
        Self {
            socket,
            pending: VecDeque::new(),
        }
    }

    /// The underlying socket.
    pub fn socket(&self) -> &NetlinkSocket {
        &self.socket
    }

    /// Block until the next link event.
    pub fn next_event(&mut self) -> Result<LinkEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            for msg in self.socket.recv()?.iter() {
                if let Some(event) = LinkEvent::from_message(msg)? {
                    self.pending.push_back(event);
                }
            }
        }
    }
}

impl Iterator for LinkMonitor {
    type Item = Result<LinkEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_event())
    }
}

static LINK_ATTRS: LazyLock<AttrTable<LinkInfo>> = LazyLock::new(|| {
    AttrTable::<LinkInfo>::new()
        .on(IFLA_IFNAME, |l, a| {
            l.ifname = Some(a.get_str()?.to_string());
            Ok(())
        })
        .on(IFLA_MTU, |l, a| {
            l.mtu = Some(a.get_u32()?);
            Ok(())
        })
        .on(IFLA_TXQLEN, |l, a| {
            l.txqlen = Some(a.get_u32()?);
            Ok(())
        })
        .on(IFLA_OPERSTATE, |l, a| {
            l.operstate = Some(OperState::from(a.get_u8()?));
            Ok(())
        })
        .on(IFLA_ADDRESS, |l, a| {
            l.address = Some(format_mac_addr(a.get_bytes()));
            Ok(())
        })
});

/// Build an RTM_GETLINK dump request.
pub fn dump_request() -> Message {
    let mut msg = Message::new(RTM_GETLINK, NLM_F_REQUEST | NLM_F_DUMP);
    msg.put_extra_header(&RtGenMsg::with_family(libc::AF_PACKET as u8));
    msg
}

/// Build a request that brings `ifname` up or down.
pub fn set_state_request(ifname: &str, up: bool) -> Result<Message> {
    let ifi = IfInfoMsg {
        ifi_family: libc::AF_UNSPEC as u8,
        ifi_change: IFF_UP,
        ifi_flags: if up { IFF_UP } else { 0 },
        ..Default::default()
    };

    let mut msg = Message::new(RTM_NEWLINK, NLM_F_REQUEST | NLM_F_ACK);
    msg.put_extra_header(&ifi);
    msg.add_attr(&Attr::new_strnz(IFLA_IFNAME, ifname)?);
    Ok(msg)
}

/// List every interface.
pub fn list_links(socket: &NetlinkSocket) -> Result<Vec<LinkInfo>> {
    let mut request = dump_request();
    socket
        .dump(&mut request)?
        .iter()
        .map(LinkInfo::from_message)
        .collect()
}

/// Bring an interface up or down and wait for the ACK.
pub fn set_link_state(socket: &NetlinkSocket, ifname: &str, up: bool) -> Result<()> {
    let mut request = set_state_request(ifname, up)?;
    socket.request(&mut request)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures;
    use crate::netlink::multipart::MessageList;
    use crate::netlink::rtnl::IFLA_LINKMODE;

    #[test]
    fn test_dump_request_bytes() {
        let msg = dump_request();
        let bytes = msg.encode().unwrap();
        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[4..6], &RTM_GETLINK.to_ne_bytes());
        assert_eq!(&bytes[6..8], &(NLM_F_REQUEST | NLM_F_DUMP).to_ne_bytes());
        assert_eq!(&bytes[16..], &[libc::AF_PACKET as u8, 0, 0, 0]);
    }

    #[test]
    fn test_set_state_request() {
        let msg = set_state_request("eth0", true).unwrap();
        let payload = msg.payload_bytes();
        let ifi = IfInfoMsg::from_prefix(payload).unwrap();
        assert_eq!(ifi.ifi_change, IFF_UP);
        assert_eq!(ifi.ifi_flags, IFF_UP);

        let attrs: Vec<Attr> = msg.attrs(IfInfoMsg::SIZE).collect::<Result<_>>().unwrap();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].kind(), IFLA_IFNAME);
        assert_eq!(attrs[0].get_bytes(), b"eth0");

        let down = set_state_request("eth0", false).unwrap();
        let ifi = IfInfoMsg::from_prefix(down.payload_bytes()).unwrap();
        assert_eq!(ifi.ifi_change, IFF_UP);
        assert_eq!(ifi.ifi_flags, 0);
    }

    #[test]
    fn test_parse_loopback() {
        let list = MessageList::split(&fixtures::link_loopback()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.has_done());

        let parsed = LinkInfo::parse(&list[0]).unwrap();

        let link = &parsed.fields;
        assert_eq!(link.index, 1);
        assert_eq!(link.ifname.as_deref(), Some("lo"));
        assert_eq!(link.mtu, Some(65536));
        assert_eq!(link.txqlen, Some(1000));
        assert_eq!(link.operstate, Some(OperState::Unknown));
        assert_eq!(link.address.as_deref(), Some("00:00:00:00:00:00"));
        assert!(link.is_up());
        assert!(link.is_running());

        let unmatched: Vec<u16> = parsed.unmatched.iter().map(Attr::kind).collect();
        assert_eq!(unmatched, [IFLA_LINKMODE]);
    }

    #[test]
    fn test_parse_rejects_other_types() {
        let mut msg = Message::new(RTM_GETLINK, 0);
        msg.put_extra_header(&IfInfoMsg::default());
        assert!(LinkInfo::from_message(&msg).is_err());

        let mut short = Message::new(RTM_NEWLINK, 0);
        short.add_payload([0u8; 8]);
        assert!(matches!(
            LinkInfo::from_message(&short),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_link_events_from_dump_chunk() {
        let list = MessageList::split(&fixtures::link_loopback()).unwrap();
        let event = LinkEvent::from_message(&list[0]).unwrap().unwrap();
        assert_eq!(event.action(), "new");
        assert_eq!(event.link().ifname.as_deref(), Some("lo"));
        // DONE carries no link.
        assert!(LinkEvent::from_message(&list[1]).unwrap().is_none());
    }

    #[test]
    fn test_link_event_del() {
        let list = MessageList::split(&fixtures::link_del_veth()).unwrap();
        assert_eq!(list.len(), 1);
        let event = LinkEvent::from_message(&list[0]).unwrap().unwrap();
        assert!(matches!(event, LinkEvent::Del(_)));
        assert_eq!(event.action(), "del");

        let link = event.link();
        assert_eq!(link.index, 5);
        assert_eq!(link.ifname.as_deref(), Some("veth0"));
        assert_eq!(link.mtu, Some(1500));
        assert!(!link.is_up());
        assert!(!link.is_running());

        // Plain parsing still wants RTM_NEWLINK.
        assert!(LinkInfo::from_message(&list[0]).is_err());
    }

    #[test]
    fn test_link_event_error_reply() {
        let mut err = Message::new(NlMsgType::ERROR, 0);
        err.add_payload((-libc::ENOBUFS).to_ne_bytes());
        err.add_payload([0u8; 16]);
        let e = LinkEvent::from_message(&err).unwrap_err();
        assert_eq!(e.errno(), Some(libc::ENOBUFS as u32));

        let mut ack = Message::new(NlMsgType::ERROR, 0);
        ack.add_payload(0i32.to_ne_bytes());
        ack.add_payload([0u8; 16]);
        assert!(LinkEvent::from_message(&ack).unwrap().is_none());
    }

    #[test]
    fn test_operstate_names() {
        assert_eq!(OperState::from(6).name(), "UP");
        assert_eq!(OperState::from(2).name(), "DOWN");
        assert_eq!(OperState::from(200), OperState::Unknown);
    }
}
