//! Async netlink socket on the tokio reactor.

use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU32, Ordering};
use std::task::{Context, Poll};

use bytes::BytesMut;
use netlink_sys::{Socket, SocketAddr};
use tokio::io::Interest;
use tokio::io::unix::AsyncFd;

use super::error::Result;
use super::message::Message;
use super::multipart::MessageList;
use super::socket::{Protocol, SOCKET_AUTOPID, socket_buffer_size, split_received};

/// Async netlink socket.
///
/// Same wire behaviour as [`NetlinkSocket`](super::socket::NetlinkSocket),
/// driven by readiness instead of blocking calls.
pub struct AsyncNetlinkSocket {
    /// The underlying async file descriptor.
    fd: AsyncFd<Socket>,
    /// Sequence number counter.
    seq: AtomicU32,
    /// Local port ID (assigned by kernel).
    port_id: u32,
    /// Protocol this socket uses.
    protocol: Protocol,
    recv_size: usize,
}

impl AsyncNetlinkSocket {
    /// Create a new netlink socket for the given protocol.
    pub fn new(protocol: Protocol) -> Result<Self> {
        Self::bind(protocol, SOCKET_AUTOPID, 0)
    }

    /// Create a socket bound to `port_id` and multicast `groups`.
    pub fn bind(protocol: Protocol, port_id: u32, groups: u32) -> Result<Self> {
        let mut socket = Socket::new(protocol.number())?;
        socket.set_non_blocking(true)?;

        let mut addr = SocketAddr::new(port_id, groups);
        socket.bind(&addr)?;
        socket.get_address(&mut addr)?;

        // Enable extended ACK for better error messages
        socket.set_ext_ack(true).ok(); // Ignore if not supported

        let fd = AsyncFd::new(socket)?;

        Ok(Self {
            fd,
            seq: AtomicU32::new(1),
            port_id: addr.port_number(),
            protocol,
            recv_size: socket_buffer_size(),
        })
    }

    /// Get the next sequence number.
    pub fn next_seq(&self) -> u32 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the local port ID.
    pub fn port_id(&self) -> u32 {
        self.port_id
    }

    /// Get the protocol.
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Change the size of each receive.
    pub fn set_recv_size(&mut self, size: usize) {
        self.recv_size = size;
    }

    /// Subscribe to multicast groups.
    pub fn add_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().add_membership(group)?;
        Ok(())
    }

    /// Unsubscribe from multicast groups.
    pub fn drop_membership(&mut self, group: u32) -> Result<()> {
        self.fd.get_mut().drop_membership(group)?;
        Ok(())
    }

    /// Encode and send a message.
    pub async fn send(&self, msg: &Message) -> Result<usize> {
        let bytes = msg.encode()?;
        self.send_bytes(&bytes).await
    }

    /// Send pre-encoded bytes.
    pub async fn send_bytes(&self, bytes: &[u8]) -> Result<usize> {
        loop {
            let mut guard = self.fd.ready(Interest::WRITABLE).await?;

            match guard.try_io(|inner| inner.get_ref().send(bytes, 0)) {
                Ok(result) => {
                    let sent = result?;
                    tracing::trace!(len = sent, "netlink send");
                    return Ok(sent);
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Receive one datagram and split it into messages.
    pub async fn recv(&self) -> Result<MessageList> {
        let mut buf = BytesMut::with_capacity(self.recv_size);

        loop {
            let mut guard = self.fd.ready(Interest::READABLE).await?;

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => {
                    let len = result?;
                    tracing::trace!(len, "netlink recv");
                    return split_received(&buf, len);
                }
                Err(_would_block) => continue,
            }
        }
    }

    /// Poll for an incoming datagram.
    pub fn poll_recv(&self, cx: &mut Context<'_>) -> Poll<Result<MessageList>> {
        let mut buf = BytesMut::with_capacity(self.recv_size);

        loop {
            let mut guard = match self.fd.poll_read_ready(cx) {
                Poll::Ready(Ok(guard)) => guard,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e.into())),
                Poll::Pending => return Poll::Pending,
            };

            match guard.try_io(|inner| inner.get_ref().recv(&mut buf, 0)) {
                Ok(result) => match result {
                    Ok(len) => return Poll::Ready(split_received(&buf, len)),
                    Err(e) => return Poll::Ready(Err(e.into())),
                },
                Err(_would_block) => continue,
            }
        }
    }
}

impl AsRawFd for AsyncNetlinkSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.get_ref().as_raw_fd()
    }
}
