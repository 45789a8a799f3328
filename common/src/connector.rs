//! Connector message classification.
//!
//! Connector header layout (20 bytes, follows the netlink header):
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 4    | channel idx |
//! | 4      | 4    | channel val |
//! | 8      | 4    | sequence |
//! | 12     | 4    | ack |
//! | 16     | 2    | data length |
//! | 18     | 2    | flags |

use crate::frame::{RawFrame, NLMSG_DONE, NLMSG_ERROR, NLMSG_HDRLEN, NLMSG_NOOP, NLMSG_OVERRUN};
use crate::{read_u16, read_u32};

pub const CN_MSG_HDRLEN: usize = 20;

/// Channel id pair of the process-event connector.
pub const CN_IDX_PROC: u32 = 0x1;
pub const CN_VAL_PROC: u32 = 0x1;

/// Multicast operations understood by the process-event connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum McastOp {
    Listen = 1,
    Ignore = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectorId {
    pub idx: u32,
    pub val: u32,
}

impl ConnectorId {
    pub const PROC: ConnectorId = ConnectorId {
        idx: CN_IDX_PROC,
        val: CN_VAL_PROC,
    };
}

/// What a single netlink frame turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// No-op, error, or a data frame for some other connector channel.
    ControlNoop,
    /// The kernel dropped messages because our receive queue was full.
    ControlOverrun,
    /// Process-event payload, bounded by the connector's declared data length.
    Candidate(&'a [u8]),
}

/// Sorts a frame into control or process-event data.
pub fn classify<'a>(frame: &RawFrame<'a>) -> Classified<'a> {
    match frame.msg_type {
        NLMSG_NOOP | NLMSG_ERROR => Classified::ControlNoop,
        NLMSG_OVERRUN => Classified::ControlOverrun,
        _ => match proc_payload(frame.payload) {
            Some(data) => Classified::Candidate(data),
            None => Classified::ControlNoop,
        },
    }
}

fn proc_payload(payload: &[u8]) -> Option<&[u8]> {
    let id = ConnectorId {
        idx: read_u32(payload, 0)?,
        val: read_u32(payload, 4)?,
    };
    if id != ConnectorId::PROC {
        return None;
    }
    let len = read_u16(payload, 16)? as usize;
    payload.get(CN_MSG_HDRLEN..CN_MSG_HDRLEN + len)
}

/// Total size of a multicast subscription request.
pub const MCAST_MSG_LEN: usize = NLMSG_HDRLEN + CN_MSG_HDRLEN + 4;

/// Encodes the request that turns process-event delivery on or off for the
/// sending socket.
pub fn encode_mcast_op(op: McastOp, port_id: u32) -> [u8; MCAST_MSG_LEN] {
    let mut msg = [0u8; MCAST_MSG_LEN];

    msg[0..4].copy_from_slice(&(MCAST_MSG_LEN as u32).to_ne_bytes());
    msg[4..6].copy_from_slice(&NLMSG_DONE.to_ne_bytes());
    msg[12..16].copy_from_slice(&port_id.to_ne_bytes());

    let cn = &mut msg[NLMSG_HDRLEN..];
    cn[0..4].copy_from_slice(&CN_IDX_PROC.to_ne_bytes());
    cn[4..8].copy_from_slice(&CN_VAL_PROC.to_ne_bytes());
    cn[16..18].copy_from_slice(&4u16.to_ne_bytes());
    cn[CN_MSG_HDRLEN..CN_MSG_HDRLEN + 4].copy_from_slice(&(op as u32).to_ne_bytes());

    msg
}
