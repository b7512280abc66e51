//! Splitting a receive buffer into messages.
//!
//! A single `recv` on a netlink socket can return several messages back to
//! back, as dump replies do. [`MessageList::split`] cuts the buffer along
//! the declared message lengths.

use std::ops::Index;

use super::error::{Error, Result};
use super::message::{Message, NLMSG_HDRLEN, nlmsg_align};
use super::parse::parse_u32_ne;

/// Messages from one receive, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList {
    messages: Vec<Message>,
}

impl MessageList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a raw buffer into messages.
    ///
    /// Each message spans exactly its declared length and the next one
    /// starts at the aligned end. A final message whose declared length
    /// runs past the buffer takes whatever is left. A tail too short to
    /// hold a header is dropped once at least one message was read; a
    /// buffer with no complete header at all is [`Error::Truncated`].
    pub fn split(raw: &[u8]) -> Result<Self> {
        let mut messages = Vec::new();
        let mut rest = raw;

        while !rest.is_empty() {
            if rest.len() < NLMSG_HDRLEN {
                if !messages.is_empty() {
                    tracing::debug!(
                        available = rest.len(),
                        "dropping netlink tail shorter than a header"
                    );
                    break;
                }
                return Err(Error::Truncated {
                    expected: NLMSG_HDRLEN,
                    actual: rest.len(),
                });
            }

            let mut input = rest;
            let declared = parse_u32_ne(&mut input).map_err(|_| Error::Truncated {
                expected: 4,
                actual: rest.len(),
            })? as usize;

            if declared < NLMSG_HDRLEN {
                return Err(Error::InvalidMessage(format!(
                    "declared length {} shorter than header",
                    declared
                )));
            }

            if declared <= rest.len() {
                messages.push(Message::decode(&rest[..declared])?);
                let advance = nlmsg_align(declared).min(rest.len());
                rest = &rest[advance..];
            } else {
                tracing::debug!(
                    declared,
                    available = rest.len(),
                    "final netlink message shorter than declared"
                );
                messages.push(Message::decode(rest)?);
                rest = &[];
            }
        }

        Ok(Self { messages })
    }

    /// Sum of each message's current encoded length.
    pub fn size(&self) -> usize {
        self.messages.iter().map(Message::encoded_len).sum()
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message.
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Iterate messages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    /// Mutable access to the messages.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Message> {
        self.messages.iter_mut()
    }

    /// Get a message by position.
    pub fn get(&self, idx: usize) -> Option<&Message> {
        self.messages.get(idx)
    }

    /// Check if the list ends a dump.
    pub fn has_done(&self) -> bool {
        self.messages.iter().any(Message::is_done)
    }

    /// Serialize all messages back to back.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        for msg in &self.messages {
            out.extend(msg.encode()?);
        }
        Ok(out)
    }

    /// Take the messages out.
    pub fn into_vec(self) -> Vec<Message> {
        self.messages
    }
}

impl Index<usize> for MessageList {
    type Output = Message;

    fn index(&self, idx: usize) -> &Message {
        &self.messages[idx]
    }
}

impl IntoIterator for MessageList {
    type Item = Message;
    type IntoIter = std::vec::IntoIter<Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl From<Message> for MessageList {
    fn from(msg: Message) -> Self {
        Self {
            messages: vec![msg],
        }
    }
}

impl From<Vec<Message>> for MessageList {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

impl FromIterator<Message> for MessageList {
    fn from_iter<I: IntoIterator<Item = Message>>(iter: I) -> Self {
        Self {
            messages: iter.into_iter().collect(),
        }
    }
}

impl Extend<Message> for MessageList {
    fn extend<I: IntoIterator<Item = Message>>(&mut self, iter: I) {
        self.messages.extend(iter);
    }
}
