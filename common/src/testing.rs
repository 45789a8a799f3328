//! Builders for synthetic connector datagrams.

use alloc::vec::Vec;

use crate::connector::{CN_IDX_PROC, CN_MSG_HDRLEN, CN_VAL_PROC};
use crate::event::{Pid, PROC_EVENT_EXEC, PROC_EVENT_FORK};
use crate::frame::{nlmsg_align, NLMSG_DONE, NLMSG_ERROR, NLMSG_HDRLEN, NLMSG_NOOP, NLMSG_OVERRUN};

/// Accumulates netlink frames into one datagram, padding each to alignment.
#[derive(Debug, Default, Clone)]
pub struct DatagramBuilder {
    buf: Vec<u8>,
}

impl DatagramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a frame with an arbitrary type and payload.
    pub fn frame(mut self, msg_type: u16, payload: &[u8]) -> Self {
        let len = NLMSG_HDRLEN + payload.len();
        self.buf.extend_from_slice(&(len as u32).to_ne_bytes());
        self.buf.extend_from_slice(&msg_type.to_ne_bytes());
        self.buf.extend_from_slice(&0u16.to_ne_bytes());
        self.buf.extend_from_slice(&0u32.to_ne_bytes());
        self.buf.extend_from_slice(&0u32.to_ne_bytes());
        self.buf.extend_from_slice(payload);
        self.buf.resize(self.buf.len() + nlmsg_align(len) - len, 0);
        self
    }

    /// Appends a connector message on the given channel.
    pub fn connector(self, idx: u32, val: u32, data: &[u8]) -> Self {
        let mut payload = Vec::with_capacity(CN_MSG_HDRLEN + data.len());
        payload.extend_from_slice(&idx.to_ne_bytes());
        payload.extend_from_slice(&val.to_ne_bytes());
        payload.extend_from_slice(&0u32.to_ne_bytes());
        payload.extend_from_slice(&0u32.to_ne_bytes());
        payload.extend_from_slice(&(data.len() as u16).to_ne_bytes());
        payload.extend_from_slice(&0u16.to_ne_bytes());
        payload.extend_from_slice(data);
        self.frame(NLMSG_DONE, &payload)
    }

    pub fn proc_event(self, what: u32, ids: &[Pid]) -> Self {
        self.connector(CN_IDX_PROC, CN_VAL_PROC, &proc_event_bytes(what, ids))
    }

    pub fn fork(self, parent_pid: Pid, parent_tgid: Pid, child_pid: Pid, child_tgid: Pid) -> Self {
        self.proc_event(PROC_EVENT_FORK, &[parent_pid, parent_tgid, child_pid, child_tgid])
    }

    pub fn exec(self, pid: Pid, tgid: Pid) -> Self {
        self.proc_event(PROC_EVENT_EXEC, &[pid, tgid])
    }

    pub fn overrun(self) -> Self {
        self.frame(NLMSG_OVERRUN, &[])
    }

    pub fn noop(self) -> Self {
        self.frame(NLMSG_NOOP, &[])
    }

    pub fn error(self, errno: i32) -> Self {
        self.frame(NLMSG_ERROR, &errno.to_ne_bytes())
    }

    /// Appends raw bytes with no framing, e.g. a header claiming more than follows.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Encodes a process-event body: header with zero cpu and timestamp, then `ids`.
pub fn proc_event_bytes(what: u32, ids: &[Pid]) -> Vec<u8> {
    let mut data = Vec::with_capacity(16 + ids.len() * 4);
    data.extend_from_slice(&what.to_ne_bytes());
    data.extend_from_slice(&0u32.to_ne_bytes());
    data.extend_from_slice(&0u64.to_ne_bytes());
    for id in ids {
        data.extend_from_slice(&id.to_ne_bytes());
    }
    data
}
