//! Tests that talk to the running kernel.
//!
//! None of them need privileges: they only query the controller and dump
//! links and routes. Run with:
//! `cargo test -p nlmsg --test socket --features integration`
//! (add `tokio` to include the async socket).

#![cfg(feature = "integration")]

use nlmsg::netlink::genl::{self, CtrlCmd, GENL_ID_CTRL};
use nlmsg::netlink::rtnl::{LinkMonitor, RTMGRP_LINK, link, route};
use nlmsg::netlink::{NetlinkSocket, Protocol};

fn generic() -> NetlinkSocket {
    NetlinkSocket::new(Protocol::Generic).expect("failed to open generic netlink socket")
}

fn route_socket() -> NetlinkSocket {
    NetlinkSocket::new(Protocol::Route).expect("failed to open route netlink socket")
}

mod genl_tests {
    use super::*;

    #[test]
    fn test_resolve_controller() {
        let socket = generic();
        assert_ne!(socket.port_id(), 0);

        let family = genl::resolve_family(&socket, "nlctrl").unwrap();
        assert_eq!(family.id, GENL_ID_CTRL);
        assert_eq!(family.name, "nlctrl");
        assert!(family.has_op(CtrlCmd::GetFamily as u32));
        assert!(family.mcast_group("notify").is_some());
    }

    #[test]
    fn test_resolve_unknown_family() {
        let socket = generic();
        let err = genl::resolve_family(&socket, "no-such-family").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_families() {
        let socket = generic();
        let families = genl::list_families(&socket).unwrap();
        assert!(families.iter().any(|f| f.name == "nlctrl"));
    }
}

mod rtnl_tests {
    use super::*;

    #[test]
    fn test_loopback_is_listed() {
        let socket = route_socket();
        let links = link::list_links(&socket).unwrap();

        let lo = links.iter().find(|l| l.ifname.as_deref() == Some("lo"));
        assert!(lo.is_some(), "loopback interface not found");
        assert_eq!(lo.unwrap().index, 1);
    }

    #[test]
    fn test_route_dump_completes() {
        let socket = route_socket();
        let routes = route::list_routes(&socket, libc::AF_INET as u8).unwrap();
        assert!(routes.iter().all(|r| r.family == libc::AF_INET as u8));
    }

    #[test]
    fn test_link_monitor_subscribes() {
        let monitor = LinkMonitor::new().unwrap();
        assert_eq!(monitor.socket().groups(), RTMGRP_LINK);
        assert_eq!(monitor.socket().protocol(), Protocol::Route);
    }
}

mod socket_tests {
    use super::*;

    #[test]
    fn test_sequence_numbers_advance() {
        let socket = generic();
        let first = socket.next_seq();
        assert_eq!(socket.next_seq(), first.wrapping_add(1));
    }

    #[test]
    fn test_no_enobufs_toggle() {
        let mut socket = generic();
        socket.set_no_enobufs(true).unwrap();
        assert!(socket.no_enobufs().unwrap());
        socket.set_no_enobufs(false).unwrap();
        assert!(!socket.no_enobufs().unwrap());
    }
}

#[cfg(feature = "tokio")]
mod async_tests {
    use nlmsg::netlink::AsyncNetlinkSocket;
    use nlmsg::netlink::genl::FamilyInfo;

    use super::*;

    #[tokio::test]
    async fn test_async_controller_lookup() {
        let socket = AsyncNetlinkSocket::new(Protocol::Generic).unwrap();

        let mut request = genl::get_family_request("nlctrl").unwrap();
        request.set_seq(socket.next_seq());
        request.set_port_id(socket.port_id());
        socket.send(&request).await.unwrap();

        let replies = socket.recv().await.unwrap();
        let reply = replies
            .iter()
            .find(|m| m.msg_type() == GENL_ID_CTRL)
            .expect("no controller reply");
        assert!(reply.seq_ok(request.seq()));

        let family = FamilyInfo::from_message(reply).unwrap();
        assert_eq!(family.id, GENL_ID_CTRL);
    }
}
