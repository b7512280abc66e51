//! Blocking netlink socket.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr};

use super::error::{Error, Result};
use super::message::{Message, NLM_F_ACK, NLM_F_REQUEST};
use super::multipart::MessageList;
use super::parse::parse_i32_ne;

/// Let the kernel pick the port ID.
pub const SOCKET_AUTOPID: u32 = 0;

/// Socket options at the netlink level (SOL_NETLINK).
pub mod sockopt {
    pub const NETLINK_ADD_MEMBERSHIP: i32 = 1;
    pub const NETLINK_DROP_MEMBERSHIP: i32 = 2;
    pub const NETLINK_PKTINFO: i32 = 3;
    pub const NETLINK_BROADCAST_ERROR: i32 = 4;
    pub const NETLINK_NO_ENOBUFS: i32 = 5;
    pub const NETLINK_LISTEN_ALL_NSID: i32 = 8;
    pub const NETLINK_CAP_ACK: i32 = 10;
    pub const NETLINK_EXT_ACK: i32 = 11;
}

/// Netlink protocol families (the socket "bus").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Routing/device hook (ip, tc, etc.)
    Route,
    /// Reserved for user mode socket protocols
    Usersock,
    /// Firewalling hook
    Firewall,
    /// Socket monitoring
    SockDiag,
    /// netfilter/iptables ULOG
    Nflog,
    /// ipsec
    Xfrm,
    /// SELinux event notifications
    Selinux,
    /// Open-iSCSI
    Iscsi,
    /// Auditing
    Audit,
    FibLookup,
    /// Kernel connector
    Connector,
    /// Netfilter subsystem
    Netfilter,
    Ip6Fw,
    /// DECnet routing messages
    Dnrtmsg,
    /// Kernel messages to userspace
    KobjectUevent,
    /// Generic netlink
    Generic,
    /// SCSI transports
    ScsiTransport,
    Ecryptfs,
}

impl Protocol {
    /// Protocol number passed to socket(2).
    pub fn number(self) -> isize {
        match self {
            Protocol::Route => 0,
            Protocol::Usersock => 2,
            Protocol::Firewall => 3,
            Protocol::SockDiag => 4,
            Protocol::Nflog => 5,
            Protocol::Xfrm => 6,
            Protocol::Selinux => 7,
            Protocol::Iscsi => 8,
            Protocol::Audit => 9,
            Protocol::FibLookup => 10,
            Protocol::Connector => 11,
            Protocol::Netfilter => 12,
            Protocol::Ip6Fw => 13,
            Protocol::Dnrtmsg => 14,
            Protocol::KobjectUevent => 15,
            Protocol::Generic => 16,
            Protocol::ScsiTransport => 18,
            Protocol::Ecryptfs => 19,
        }
    }
}

/// Default receive size: one page, capped at 8 KiB.
///
/// Large enough for any single message the kernel sends without
/// truncating it.
pub fn socket_buffer_size() -> usize {
    // SAFETY: sysconf has no preconditions and only reads configuration.
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page <= 0 {
        return 8192;
    }
    (page as usize).min(8192)
}

/// Blocking netlink socket.
///
/// Wraps one kernel endpoint. There is no internal buffering: every
/// [`recv`](Self::recv) is one datagram, split into messages.
pub struct NetlinkSocket {
    socket: Socket,
    protocol: Protocol,
    port_id: u32,
    groups: u32,
    seq: AtomicU32,
    recv_size: usize,
}

impl NetlinkSocket {
    /// Open a socket bound to a kernel-assigned port ID.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::bind(protocol, SOCKET_AUTOPID, 0)
    }

    /// Open a socket bound to `port_id` and the multicast `groups` mask.
    ///
    /// A `port_id` of [`SOCKET_AUTOPID`] lets the kernel choose.
    pub fn bind(protocol: Protocol, port_id: u32, groups: u32) -> Result<Self> {
        let mut socket = Socket::new(protocol.number())?;

        let mut addr = SocketAddr::new(port_id, groups);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;

        // Enable extended ACK for better error messages
        socket.set_ext_ack(true).ok(); // Ignore if not supported

        tracing::debug!(
            ?protocol,
            port_id = addr.port_number(),
            groups = addr.multicast_groups(),
            "netlink socket bound"
        );

        Ok(Self {
            socket,
            protocol,
            port_id: addr.port_number(),
            groups: addr.multicast_groups(),
            seq: AtomicU32::new(1),
            recv_size: socket_buffer_size(),
        })
    }

    /// Local port ID.
    pub fn port_id(&self) -> u32 {
        self.port_id
    }

    /// Multicast groups mask given at bind time.
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// Get the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Bytes requested from the kernel per [`recv`](Self::recv).
    pub fn recv_size(&self) -> usize {
        self.recv_size
    }

    /// Change the size of each [`recv`](Self::recv).
    pub fn set_recv_size(&mut self, size: usize) {
        self.recv_size = size;
    }

    /// Set the kernel receive buffer (SO_RCVBUF).
    pub fn set_recv_buffer_size(&self, size: usize) -> Result<()> {
        let size = i32::try_from(size).map_err(|_| Error::OutOfRange {
            value: size.to_string(),
            bits: 31,
        })?;
        self.setsockopt(libc::SOL_SOCKET, libc::SO_RCVBUF, size)
    }

    /// Switch between blocking and non-blocking mode.
    pub fn set_non_blocking(&self, non_blocking: bool) -> Result<()> {
        self.socket.set_non_blocking(non_blocking)?;
        Ok(())
    }

    /// Subscribe to multicast groups.
    pub fn add_membership(&mut self, group: u32) -> Result<()> {
        self.socket.add_membership(group)?;
        Ok(())
    }

    /// Unsubscribe from multicast groups.
    pub fn drop_membership(&mut self, group: u32) -> Result<()> {
        self.socket.drop_membership(group)?;
        Ok(())
    }

    /// Suppress ENOBUFS when the receive buffer overflows.
    pub fn set_no_enobufs(&mut self, value: bool) -> Result<()> {
        self.socket.set_no_enobufs(value)?;
        Ok(())
    }

    /// Read NETLINK_NO_ENOBUFS.
    pub fn no_enobufs(&self) -> Result<bool> {
        Ok(self.socket.get_no_enobufs()?)
    }

    /// Ask the kernel for extended ACK attributes on errors.
    pub fn set_ext_ack(&mut self, value: bool) -> Result<()> {
        self.socket.set_ext_ack(value)?;
        Ok(())
    }

    /// Set an integer option at the netlink level (see [`sockopt`]).
    pub fn set_option(&self, option: i32, value: i32) -> Result<()> {
        self.setsockopt(libc::SOL_NETLINK, option, value)
    }

    /// Read an integer option at the netlink level (see [`sockopt`]).
    pub fn option(&self, option: i32) -> Result<i32> {
        let mut value: libc::c_int = 0;
        let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        // SAFETY: value and len point to live locals of the advertised size.
        let ret = unsafe {
            libc::getsockopt(
                self.as_raw_fd(),
                libc::SOL_NETLINK,
                option,
                &mut value as *mut libc::c_int as *mut libc::c_void,
                &mut len,
            )
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(value)
    }

    fn setsockopt(&self, level: i32, option: i32, value: i32) -> Result<()> {
        let value: libc::c_int = value;
        // SAFETY: value is a live c_int and the length matches it.
        let ret = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                level,
                option,
                &value as *const libc::c_int as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(Error::Io(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Encode and send a message.
    pub fn send(&self, msg: &Message) -> Result<usize> {
        let bytes = msg.encode()?;
        self.send_bytes(&bytes)
    }

    /// Send pre-encoded bytes.
    pub fn send_bytes(&self, bytes: &[u8]) -> Result<usize> {
        let sent = self.socket.send(bytes, 0)?;
        tracing::trace!(len = sent, "netlink send");
        Ok(sent)
    }

    /// Receive one datagram and split it into messages.
    pub fn recv(&self) -> Result<MessageList> {
        self.recv_with_size(self.recv_size)
    }

    /// Receive at most `max` bytes and split them into messages.
    pub fn recv_with_size(&self, max: usize) -> Result<MessageList> {
        let mut buf = BytesMut::with_capacity(max);
        let len = self.socket.recv(&mut buf, 0)?;
        tracing::trace!(len, "netlink recv");
        split_received(&buf, len)
    }

    fn stamp(&self, msg: &mut Message) -> u32 {
        let seq = self.next_seq();
        msg.set_seq(seq);
        msg.set_port_id(self.port_id);
        msg.set_flags(msg.flags() | NLM_F_REQUEST);
        seq
    }

    fn is_reply(&self, reply: &Message, seq: u32) -> bool {
        match reply.check_reply(seq, self.port_id) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unrelated netlink message");
                false
            }
        }
    }

    /// Send a request and collect its replies.
    ///
    /// The message is stamped with a fresh sequence number and this
    /// socket's port ID. With `NLM_F_ACK` set, replies are collected up to
    /// the ACK; otherwise the first receive with a matching reply ends the
    /// exchange. A kernel error reply becomes [`Error::Kernel`].
    pub fn request(&self, msg: &mut Message) -> Result<MessageList> {
        let seq = self.stamp(msg);
        let wants_ack = msg.flags() & NLM_F_ACK != 0;
        self.send(msg)?;

        let mut replies = MessageList::new();
        loop {
            let mut acked = false;
            for reply in self.recv()? {
                if !self.is_reply(&reply, seq) {
                    continue;
                }
                reply.check()?;
                acked |= reply.is_error();
                replies.push(reply);
            }
            if acked || (!wants_ack && !replies.is_empty()) {
                return Ok(replies);
            }
        }
    }

    /// Send a dump request and collect every reply up to `NLMSG_DONE`.
    ///
    /// Control messages (DONE, ACK, NOOP) are not part of the result.
    pub fn dump(&self, msg: &mut Message) -> Result<Vec<Message>> {
        let seq = self.stamp(msg);
        self.send(msg)?;

        let mut results = Vec::new();
        loop {
            for reply in self.recv()? {
                if !self.is_reply(&reply, seq) {
                    continue;
                }
                if reply.is_done() {
                    check_done(&reply)?;
                    return Ok(results);
                }
                if reply.is_error() {
                    if let Err(e) = reply.check() {
                        tracing::warn!(error = %e, "kernel error during dump");
                        return Err(e);
                    }
                    continue;
                }
                if reply.is_noop() {
                    continue;
                }
                if reply.is_dump_interrupted() {
                    tracing::debug!(seq, "dump interrupted, results may be inconsistent");
                }
                results.push(reply);
            }
        }
    }
}

/// A DONE message may carry the dump's error code.
fn check_done(msg: &Message) -> Result<()> {
    let mut input = msg.payload_bytes();
    match parse_i32_ne(&mut input) {
        Ok(code) if code < 0 => Err(Error::from_errno(code)),
        _ => Ok(()),
    }
}

impl AsRawFd for NetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

impl std::fmt::Debug for NetlinkSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetlinkSocket")
            .field("protocol", &self.protocol)
            .field("port_id", &self.port_id)
            .field("groups", &self.groups)
            .finish()
    }
}

/// Split the `len` bytes a receive call reported into messages.
pub(crate) fn split_received(buf: &[u8], len: usize) -> Result<MessageList> {
    MessageList::split(&buf[..len.min(buf.len())])
}
