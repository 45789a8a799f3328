//! Netlink message framing.
//!
//! Header layout (16 bytes):
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 4    | total length, header included |
//! | 4      | 2    | type |
//! | 6      | 2    | flags |
//! | 8      | 4    | sequence |
//! | 12     | 4    | sender port id |

use crate::{read_u16, read_u32};

pub const NLMSG_HDRLEN: usize = 16;
pub const NLMSG_ALIGNTO: usize = 4;

pub const NLMSG_NOOP: u16 = 0x1;
pub const NLMSG_ERROR: u16 = 0x2;
pub const NLMSG_DONE: u16 = 0x3;
pub const NLMSG_OVERRUN: u16 = 0x4;

pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

/// One validated netlink message inside a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub msg_type: u16,
    pub flags: u16,
    pub seq: u32,
    pub port_id: u32,
    /// Bytes after the header, up to the declared length.
    pub payload: &'a [u8],
}

/// Walks a datagram into frames, stopping silently at the first one that does
/// not fit in what is left of the buffer.
#[derive(Debug, Clone)]
pub struct FrameIter<'a> {
    rest: &'a [u8],
    truncated: bool,
}

impl<'a> FrameIter<'a> {
    /// `received` is the byte count returned by the receive call; anything in
    /// `buf` beyond it is ignored.
    pub fn new(buf: &'a [u8], received: usize) -> Self {
        let end = received.min(buf.len());
        FrameIter {
            rest: &buf[..end],
            truncated: false,
        }
    }

    /// True once iteration has stopped on a frame that was cut short or whose
    /// declared length was out of bounds.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn stop(&mut self, malformed: bool) -> Option<RawFrame<'a>> {
        self.truncated |= malformed;
        self.rest = &[];
        None
    }
}

impl<'a> Iterator for FrameIter<'a> {
    type Item = RawFrame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        if self.rest.len() < NLMSG_HDRLEN {
            return self.stop(true);
        }

        let len = match read_u32(self.rest, 0) {
            Some(len) => len as usize,
            None => return self.stop(true),
        };
        if len < NLMSG_HDRLEN || len > self.rest.len() {
            return self.stop(true);
        }

        let frame = RawFrame {
            msg_type: read_u16(self.rest, 4)?,
            flags: read_u16(self.rest, 6)?,
            seq: read_u32(self.rest, 8)?,
            port_id: read_u32(self.rest, 12)?,
            payload: &self.rest[NLMSG_HDRLEN..len],
        };

        // The last frame may omit its alignment padding.
        let advance = nlmsg_align(len).min(self.rest.len());
        self.rest = &self.rest[advance..];
        Some(frame)
    }
}
