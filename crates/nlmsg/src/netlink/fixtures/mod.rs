//! Captured kernel replies for parser tests.
//!
//! Integers are little-endian, as on the hosts these were taken from.

/// CTRL_CMD_NEWFAMILY reply describing the controller itself.
pub fn ctrl_family_nlctrl() -> Vec<u8> {
    vec![
        // nlmsghdr: len=136, type=GENL_ID_CTRL, flags=0, seq=1, pid=0
        0x88, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, //
        // genlmsghdr: cmd=NEWFAMILY, version=2
        0x01, 0x02, 0x00, 0x00, //
        // CTRL_ATTR_FAMILY_NAME "nlctrl"
        0x0b, 0x00, 0x02, 0x00, 0x6e, 0x6c, 0x63, 0x74, 0x72, 0x6c, 0x00, 0x00, //
        // CTRL_ATTR_FAMILY_ID 0x10 (u16)
        0x06, 0x00, 0x01, 0x00, 0x10, 0x00, 0x00, 0x00, //
        // CTRL_ATTR_VERSION 2
        0x08, 0x00, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00, //
        // CTRL_ATTR_HDRSIZE 0
        0x08, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, //
        // CTRL_ATTR_MAXATTR 10
        0x08, 0x00, 0x05, 0x00, 0x0a, 0x00, 0x00, 0x00, //
        // CTRL_ATTR_OPS
        0x2c, 0x00, 0x06, 0x00, //
        // op #1: id=3 (GETFAMILY), flags=DO|DUMP|HASPOL
        0x14, 0x00, 0x01, 0x00, 0x08, 0x00, 0x01, 0x00, 0x03, 0x00, 0x00, 0x00, 0x08, 0x00, 0x02,
        0x00, 0x0e, 0x00, 0x00, 0x00, //
        // op #2: id=10 (GETPOLICY), flags=DUMP|HASPOL
        0x14, 0x00, 0x02, 0x00, 0x08, 0x00, 0x01, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x08, 0x00, 0x02,
        0x00, 0x0c, 0x00, 0x00, 0x00, //
        // CTRL_ATTR_MCAST_GROUPS
        0x1c, 0x00, 0x07, 0x00, //
        // group #1: id=0x10, name="notify"
        0x18, 0x00, 0x01, 0x00, 0x08, 0x00, 0x02, 0x00, 0x10, 0x00, 0x00, 0x00, 0x0b, 0x00, 0x01,
        0x00, 0x6e, 0x6f, 0x74, 0x69, 0x66, 0x79, 0x00, 0x00,
    ]
}

/// One chunk of an RTM_GETLINK dump: the loopback device, then DONE.
pub fn link_loopback() -> Vec<u8> {
    vec![
        // nlmsghdr: len=84, type=RTM_NEWLINK, flags=MULTI, seq=7, pid=0x1f40
        0x54, 0x00, 0x00, 0x00, 0x10, 0x00, 0x02, 0x00, 0x07, 0x00, 0x00, 0x00, 0x40, 0x1f, 0x00,
        0x00, //
        // ifinfomsg: family=0, type=ARPHRD_LOOPBACK, index=1,
        // flags=UP|LOOPBACK|RUNNING|LOWER_UP, change=0
        0x00, 0x00, 0x04, 0x03, 0x01, 0x00, 0x00, 0x00, 0x49, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        0x00, //
        // IFLA_IFNAME "lo"
        0x07, 0x00, 0x03, 0x00, 0x6c, 0x6f, 0x00, 0x00, //
        // IFLA_TXQLEN 1000
        0x08, 0x00, 0x0d, 0x00, 0xe8, 0x03, 0x00, 0x00, //
        // IFLA_OPERSTATE UNKNOWN
        0x05, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, //
        // IFLA_LINKMODE 0
        0x05, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, //
        // IFLA_MTU 65536
        0x08, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, //
        // IFLA_ADDRESS 00:00:00:00:00:00
        0x0a, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
        // nlmsghdr: len=20, type=NLMSG_DONE, flags=MULTI, seq=7, pid=0x1f40
        0x14, 0x00, 0x00, 0x00, 0x03, 0x00, 0x02, 0x00, 0x07, 0x00, 0x00, 0x00, 0x40, 0x1f, 0x00,
        0x00, //
        // status 0
        0x00, 0x00, 0x00, 0x00,
    ]
}

/// RTM_DELLINK notification for a removed veth device.
pub fn link_del_veth() -> Vec<u8> {
    vec![
        // nlmsghdr: len=52, type=RTM_DELLINK, flags=0, seq=0, pid=0
        0x34, 0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, //
        // ifinfomsg: family=0, type=ARPHRD_ETHER, index=5,
        // flags=BROADCAST|MULTICAST, change=0
        0x00, 0x00, 0x01, 0x00, 0x05, 0x00, 0x00, 0x00, 0x02, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, //
        // IFLA_IFNAME "veth0"
        0x0a, 0x00, 0x03, 0x00, 0x76, 0x65, 0x74, 0x68, 0x30, 0x00, 0x00, 0x00, //
        // IFLA_MTU 1500
        0x08, 0x00, 0x04, 0x00, 0xdc, 0x05, 0x00, 0x00,
    ]
}

/// RTM_NEWROUTE request adding 10.0.1.12/32 via 10.0.1.11 on ifindex 2.
pub fn route_add_ipv4() -> Vec<u8> {
    vec![
        // nlmsghdr: len=52, type=RTM_NEWROUTE, flags=REQUEST|CREATE, seq=0, pid=0
        0x34, 0x00, 0x00, 0x00, 0x18, 0x00, 0x01, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, //
        // rtmsg: family=AF_INET, dst_len=32, table=MAIN, protocol=BOOT,
        // scope=UNIVERSE, type=UNICAST
        0x02, 0x20, 0x00, 0x00, 0xfe, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, //
        // RTA_DST 10.0.1.12
        0x08, 0x00, 0x01, 0x00, 0x0a, 0x00, 0x01, 0x0c, //
        // RTA_OIF 2
        0x08, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00, //
        // RTA_GATEWAY 10.0.1.11
        0x08, 0x00, 0x05, 0x00, 0x0a, 0x00, 0x01, 0x0b,
    ]
}

/// RTM_NEWROUTE for 192.168.1.0/24 on ifindex 2.
pub fn route_ipv4() -> Vec<u8> {
    vec![
        // nlmsghdr: len=68, type=RTM_NEWROUTE, flags=MULTI, seq=9, pid=0x1f40
        0x44, 0x00, 0x00, 0x00, 0x18, 0x00, 0x02, 0x00, 0x09, 0x00, 0x00, 0x00, 0x40, 0x1f, 0x00,
        0x00, //
        // rtmsg: family=AF_INET, dst_len=24, src_len=0, tos=0, table=MAIN,
        // protocol=KERNEL, scope=LINK, type=UNICAST, flags=0
        0x02, 0x18, 0x00, 0x00, 0xfe, 0x02, 0xfd, 0x01, 0x00, 0x00, 0x00, 0x00, //
        // RTA_TABLE 254
        0x08, 0x00, 0x0f, 0x00, 0xfe, 0x00, 0x00, 0x00, //
        // RTA_DST 192.168.1.0
        0x08, 0x00, 0x01, 0x00, 0xc0, 0xa8, 0x01, 0x00, //
        // RTA_PRIORITY 100
        0x08, 0x00, 0x06, 0x00, 0x64, 0x00, 0x00, 0x00, //
        // RTA_PREFSRC 192.168.1.10
        0x08, 0x00, 0x07, 0x00, 0xc0, 0xa8, 0x01, 0x0a, //
        // RTA_OIF 2
        0x08, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00,
    ]
}

/// RTM_NEWROUTE for the IPv6 default route via fe80::1, with metrics.
pub fn route_ipv6_default() -> Vec<u8> {
    vec![
        // nlmsghdr: len=100, type=RTM_NEWROUTE, flags=MULTI, seq=10, pid=0x1f40
        0x64, 0x00, 0x00, 0x00, 0x18, 0x00, 0x02, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x40, 0x1f, 0x00,
        0x00, //
        // rtmsg: family=AF_INET6, dst_len=0, table=MAIN, protocol=RA,
        // scope=UNIVERSE, type=UNICAST
        0x0a, 0x00, 0x00, 0x00, 0xfe, 0x09, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, //
        // RTA_TABLE 254
        0x08, 0x00, 0x0f, 0x00, 0xfe, 0x00, 0x00, 0x00, //
        // RTA_PRIORITY 1024
        0x08, 0x00, 0x06, 0x00, 0x00, 0x04, 0x00, 0x00, //
        // RTA_METRICS { RTAX_MTU 1500, RTAX_HOPLIMIT 64 }
        0x14, 0x00, 0x08, 0x00, 0x08, 0x00, 0x02, 0x00, 0xdc, 0x05, 0x00, 0x00, 0x08, 0x00, 0x0a,
        0x00, 0x40, 0x00, 0x00, 0x00, //
        // RTA_GATEWAY fe80::1
        0x14, 0x00, 0x05, 0x00, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x01, //
        // RTA_OIF 2
        0x08, 0x00, 0x04, 0x00, 0x02, 0x00, 0x00, 0x00, //
        // RTA_PREF 0
        0x05, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00, 0x00,
    ]
}
