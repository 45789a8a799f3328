#![cfg_attr(not(test), no_std)]

//! Wire codec for the kernel process-event connector.
//!
//! Everything here is a pure walk over caller-owned bytes: no allocation, no I/O.
//! Integers are read in host byte order, field by field, at the offsets documented
//! on each header type, so nothing depends on `#[repr(C)]` layout.

#[cfg(feature = "test-utils")]
extern crate alloc;

pub mod connector;
pub mod event;
pub mod frame;

#[cfg(feature = "test-utils")]
pub mod testing;

pub use connector::{
    classify, encode_mcast_op, Classified, ConnectorId, McastOp, CN_IDX_PROC, CN_VAL_PROC,
};
pub use event::{decode, EventHeader, Pid, ProcEvent};
pub use frame::{FrameIter, RawFrame};

/// Largest payload the connector will deliver in a single message.
pub const CONNECTOR_MAX_MSG_SIZE: usize = 16384;

/// Receive buffer size that always fits a full connector datagram.
pub const RECV_BUFFER_SIZE: usize = 4096 + CONNECTOR_MAX_MSG_SIZE;

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset + 2)?;
    Some(u16::from_ne_bytes([bytes[0], bytes[1]]))
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset + 4)?;
    Some(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset + 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Some(u64::from_ne_bytes(raw))
}
