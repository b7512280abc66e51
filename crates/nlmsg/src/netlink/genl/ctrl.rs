//! Controller family (`nlctrl`): family lookup and listing.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::header::{GENL_HDRLEN, GenlMsgHdr};
use super::{CtrlAttr, CtrlAttrMcastGrp, CtrlAttrOp, CtrlCmd, GENL_ID_CTRL};
use crate::netlink::attr::Attr;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{Message, NLM_F_ACK, NLM_F_DUMP, NLM_F_REQUEST};
use crate::netlink::parse::FromNetlink;
use crate::netlink::socket::NetlinkSocket;
use crate::netlink::stream::{AttrTable, Parsed, dispatch, dispatch_nested};

/// Controller protocol version sent in requests.
const CTRL_VERSION: u8 = 1;

/// Information about a Generic Netlink family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FamilyInfo {
    /// Dynamically assigned family ID (used as nlmsg_type).
    pub id: u16,
    /// Family name.
    pub name: String,
    /// Family version.
    pub version: u32,
    /// Header size (additional bytes after genlmsghdr).
    pub hdr_size: u32,
    /// Maximum attribute number.
    pub max_attr: u32,
    /// Supported commands: command ID -> GENL_* capability flags.
    pub ops: BTreeMap<u32, u32>,
    /// Multicast groups: group ID -> name.
    pub mcast_groups: BTreeMap<u32, String>,
}

#[derive(Debug, Default)]
struct OpEntry {
    id: Option<u32>,
    flags: u32,
}

#[derive(Debug, Default)]
struct GroupEntry {
    id: Option<u32>,
    name: Option<String>,
}

static OP_ATTRS: LazyLock<AttrTable<OpEntry>> = LazyLock::new(|| {
    AttrTable::<OpEntry>::new()
        .on(CtrlAttrOp::Id as u16, |op, a| {
            op.id = Some(a.get_u32()?);
            Ok(())
        })
        .on(CtrlAttrOp::Flags as u16, |op, a| {
            op.flags = a.get_u32()?;
            Ok(())
        })
});

static GROUP_ATTRS: LazyLock<AttrTable<GroupEntry>> = LazyLock::new(|| {
    AttrTable::<GroupEntry>::new()
        .on(CtrlAttrMcastGrp::Id as u16, |grp, a| {
            grp.id = Some(a.get_u32()?);
            Ok(())
        })
        .on(CtrlAttrMcastGrp::Name as u16, |grp, a| {
            grp.name = Some(a.get_str()?.to_string());
            Ok(())
        })
});

static FAMILY_ATTRS: LazyLock<AttrTable<FamilyInfo>> = LazyLock::new(|| {
    AttrTable::<FamilyInfo>::new()
        .on(CtrlAttr::FamilyId as u16, |f, a| {
            f.id = a.get_u16()?;
            Ok(())
        })
        .on(CtrlAttr::FamilyName as u16, |f, a| {
            f.name = a.get_str()?.to_string();
            Ok(())
        })
        .on(CtrlAttr::Version as u16, |f, a| {
            f.version = a.get_u32()?;
            Ok(())
        })
        .on(CtrlAttr::HdrSize as u16, |f, a| {
            f.hdr_size = a.get_u32()?;
            Ok(())
        })
        .on(CtrlAttr::MaxAttr as u16, |f, a| {
            f.max_attr = a.get_u32()?;
            Ok(())
        })
        .on(CtrlAttr::Ops as u16, parse_ops)
        .on(CtrlAttr::McastGroups as u16, parse_mcast_groups)
});

// Each op is a nested entry (indexed by position) holding id and flags.
fn parse_ops(family: &mut FamilyInfo, attr: &Attr) -> Result<()> {
    for entry in attr.nested() {
        let op = dispatch_nested(&entry?, &OP_ATTRS)?.fields;
        let id = op
            .id
            .ok_or_else(|| Error::InvalidAttribute("operation without id".into()))?;
        family.ops.insert(id, op.flags);
    }
    Ok(())
}

fn parse_mcast_groups(family: &mut FamilyInfo, attr: &Attr) -> Result<()> {
    for entry in attr.nested() {
        let grp = dispatch_nested(&entry?, &GROUP_ATTRS)?.fields;
        match (grp.id, grp.name) {
            (Some(id), Some(name)) => {
                family.mcast_groups.insert(id, name);
            }
            _ => return Err(Error::InvalidAttribute("incomplete multicast group".into())),
        }
    }
    Ok(())
}

impl FamilyInfo {
    /// Parse a controller reply, keeping attributes with no handler.
    pub fn parse(msg: &Message) -> Result<Parsed<FamilyInfo>> {
        if msg.msg_type() != GENL_ID_CTRL {
            return Err(Error::InvalidMessage(format!(
                "expected controller message, got type {}",
                msg.msg_type()
            )));
        }
        let payload = msg.payload_bytes();
        GenlMsgHdr::from_prefix(payload).map_err(|_| Error::Truncated {
            expected: GENL_HDRLEN,
            actual: payload.len(),
        })?;

        let parsed = dispatch(payload, GENL_HDRLEN, &FAMILY_ATTRS)?;
        if parsed.fields.id == 0 {
            return Err(Error::InvalidMessage("missing family ID".into()));
        }
        Ok(parsed)
    }

    /// Parse a controller reply (CTRL_CMD_NEWFAMILY).
    pub fn from_message(msg: &Message) -> Result<Self> {
        Ok(Self::parse(msg)?.fields)
    }

    /// Check if the family supports a command.
    pub fn has_op(&self, cmd: u32) -> bool {
        self.ops.contains_key(&cmd)
    }

    /// Look up a multicast group ID by name.
    pub fn mcast_group(&self, name: &str) -> Option<u32> {
        self.mcast_groups
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(id, _)| *id)
    }
}

/// Build a CTRL_CMD_GETFAMILY request for one family, by name.
pub fn get_family_request(name: &str) -> Result<Message> {
    let mut msg = Message::new(GENL_ID_CTRL, NLM_F_REQUEST | NLM_F_ACK);
    msg.add_attr(&Attr::new_strz(CtrlAttr::FamilyName as u16, name)?);
    msg.put_extra_header(&GenlMsgHdr::new(CtrlCmd::GetFamily as u8, CTRL_VERSION));
    Ok(msg)
}

/// Build a CTRL_CMD_GETFAMILY dump request covering every family.
pub fn dump_families_request() -> Message {
    let mut msg = Message::new(GENL_ID_CTRL, NLM_F_REQUEST | NLM_F_DUMP);
    msg.put_extra_header(&GenlMsgHdr::new(CtrlCmd::GetFamily as u8, CTRL_VERSION));
    msg
}

/// Resolve a family name through the controller.
pub fn resolve_family(socket: &NetlinkSocket, name: &str) -> Result<FamilyInfo> {
    let mut request = get_family_request(name)?;
    let replies = match socket.request(&mut request) {
        Ok(replies) => replies,
        Err(e) if e.errno() == Some(libc::ENOENT as u32) => {
            return Err(Error::FamilyNotFound {
                name: name.to_string(),
            });
        }
        Err(e) => return Err(e),
    };

    replies
        .iter()
        .find(|msg| msg.msg_type() == GENL_ID_CTRL)
        .map(FamilyInfo::from_message)
        .unwrap_or_else(|| {
            Err(Error::FamilyNotFound {
                name: name.to_string(),
            })
        })
}

/// List every registered family.
pub fn list_families(socket: &NetlinkSocket) -> Result<Vec<FamilyInfo>> {
    let mut request = dump_families_request();
    socket
        .dump(&mut request)?
        .iter()
        .map(FamilyInfo::from_message)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::fixtures;
    use crate::netlink::multipart::MessageList;
    use crate::netlink::parse::ToNetlink;
    use crate::netlink::genl::{GENL_CMD_CAP_DO, GENL_CMD_CAP_DUMP, GENL_CMD_CAP_HASPOL};

    #[test]
    fn test_get_family_request_layout() {
        let mut msg = get_family_request("nl80211").unwrap();
        msg.set_seq(0x01020304);
        msg.set_port_id(0x0a0b0c0d);

        let bytes = msg.encode().unwrap();
        let mut expected = vec![0x20, 0x00, 0x00, 0x00, 0x10, 0x00, 0x05, 0x00];
        expected.extend_from_slice(&0x01020304u32.to_ne_bytes());
        expected.extend_from_slice(&0x0a0b0c0du32.to_ne_bytes());
        expected.extend_from_slice(&[0x03, 0x01, 0x00, 0x00]);
        expected.extend_from_slice(&[0x0c, 0x00, 0x02, 0x00]);
        expected.extend_from_slice(b"nl80211\0");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_get_family_request_with_id_fixture() {
        // Request carrying both the controller ID and the family name.
        let mut msg = Message::new(GENL_ID_CTRL, NLM_F_REQUEST | NLM_F_ACK);
        msg.set_seq(7);
        msg.set_port_id(0);
        msg.put_extra_header(&GenlMsgHdr::new(CtrlCmd::GetFamily as u8, 1));
        msg.add_attr(&Attr::new_u32(CtrlAttr::FamilyId as u16, GENL_ID_CTRL).unwrap());
        msg.add_attr(&Attr::new_strz(CtrlAttr::FamilyName as u16, "nl80211").unwrap());

        let mut expected = vec![0x28, 0x00, 0x00, 0x00, 0x10, 0x00, 0x05, 0x00];
        expected.extend_from_slice(&7u32.to_ne_bytes());
        expected.extend_from_slice(&0u32.to_ne_bytes());
        expected.extend_from_slice(&[
            0x03, 0x01, 0x00, 0x00, // genlmsghdr
            0x08, 0x00, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00, // CTRL_ATTR_FAMILY_ID
            0x0c, 0x00, 0x02, 0x00, // CTRL_ATTR_FAMILY_NAME
            0x6e, 0x6c, 0x38, 0x30, 0x32, 0x31, 0x31, 0x00, // "nl80211\0"
        ]);
        assert_eq!(msg.encode().unwrap(), expected);
    }

    #[test]
    fn test_dump_families_request() {
        let msg = dump_families_request();
        assert_eq!(msg.flags(), NLM_F_REQUEST | NLM_F_DUMP);
        assert_eq!(msg.payload_bytes(), GenlMsgHdr::new(3, 1).to_bytes());
        assert_eq!(msg.encode().unwrap().len(), 20);
    }

    #[test]
    fn test_parse_nlctrl_reply() {
        let list = MessageList::split(&fixtures::ctrl_family_nlctrl()).unwrap();
        assert_eq!(list.len(), 1);

        let parsed = FamilyInfo::parse(&list[0]).unwrap();
        assert!(parsed.unmatched.is_empty());

        let family = parsed.fields;
        assert_eq!(family.id, GENL_ID_CTRL);
        assert_eq!(family.name, "nlctrl");
        assert_eq!(family.version, 2);
        assert_eq!(family.hdr_size, 0);
        assert_eq!(family.max_attr, 10);
        assert_eq!(
            family.ops,
            BTreeMap::from([
                (3, GENL_CMD_CAP_DO | GENL_CMD_CAP_DUMP | GENL_CMD_CAP_HASPOL),
                (10, GENL_CMD_CAP_DUMP | GENL_CMD_CAP_HASPOL),
            ])
        );
        assert_eq!(
            family.mcast_groups,
            BTreeMap::from([(0x10, "notify".to_string())])
        );
        assert!(family.has_op(CtrlCmd::GetFamily as u32));
        assert_eq!(family.mcast_group("notify"), Some(0x10));
        assert_eq!(family.mcast_group("config"), None);
    }

    #[test]
    fn test_parse_keeps_unknown_attrs() {
        let mut msg = Message::new(GENL_ID_CTRL, 0);
        msg.put_extra_header(&GenlMsgHdr::new(CtrlCmd::NewFamily as u8, 2));
        msg.add_attr(&Attr::new_u16(CtrlAttr::FamilyId as u16, 0x1c).unwrap());
        msg.add_attr(&Attr::new_binary(CtrlAttr::Policy as u16, [0u8; 8]).unwrap());

        let parsed = FamilyInfo::parse(&msg).unwrap();
        assert_eq!(parsed.fields.id, 0x1c);
        assert_eq!(parsed.unmatched.len(), 1);
        assert_eq!(parsed.unmatched[0].kind(), CtrlAttr::Policy as u16);
    }

    #[test]
    fn test_parse_rejects_wrong_type() {
        let mut msg = Message::new(GENL_ID_CTRL + 1, 0);
        msg.put_extra_header(&GenlMsgHdr::new(1, 2));
        assert!(matches!(
            FamilyInfo::from_message(&msg),
            Err(Error::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_parse_requires_id() {
        let mut msg = Message::new(GENL_ID_CTRL, 0);
        msg.put_extra_header(&GenlMsgHdr::new(1, 2));
        msg.add_attr(&Attr::new_strz(CtrlAttr::FamilyName as u16, "nl80211").unwrap());
        assert!(FamilyInfo::from_message(&msg).is_err());

        let short = Message::new(GENL_ID_CTRL, 0);
        assert!(matches!(
            FamilyInfo::from_message(&short),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_incomplete_group_is_error() {
        let id = Attr::new_u32(CtrlAttrMcastGrp::Id as u16, 5).unwrap();
        let group = Attr::new_nested(1, &[id]).unwrap();
        let mut msg = Message::new(GENL_ID_CTRL, 0);
        msg.put_extra_header(&GenlMsgHdr::new(1, 2));
        msg.add_attr(&Attr::new_u16(CtrlAttr::FamilyId as u16, 0x1c).unwrap());
        msg.add_attr(&Attr::new_nested(CtrlAttr::McastGroups as u16, &[group]).unwrap());
        assert!(matches!(
            FamilyInfo::from_message(&msg),
            Err(Error::InvalidAttribute(_))
        ));
    }
}
