//! Process-event payload decoding.
//!
//! Event layout (follows the connector header):
//!
//! | offset | size | field |
//! |--------|------|-------|
//! | 0      | 4    | what (event kind) |
//! | 4      | 4    | cpu |
//! | 8      | 8    | timestamp, ns |
//! | 16     | ..   | event data |
//!
//! Fork data is four 32-bit ids at 16, 20, 24, 28: parent pid, parent tgid,
//! child pid, child tgid. Exec data is two 32-bit ids at 16, 20: pid, tgid.

use crate::{read_u32, read_u64};

pub type Pid = u32;

pub const PROC_EVENT_HDRLEN: usize = 16;

pub const PROC_EVENT_NONE: u32 = 0x0000_0000;
pub const PROC_EVENT_FORK: u32 = 0x0000_0001;
pub const PROC_EVENT_EXEC: u32 = 0x0000_0002;
pub const PROC_EVENT_UID: u32 = 0x0000_0004;
pub const PROC_EVENT_GID: u32 = 0x0000_0040;
pub const PROC_EVENT_SID: u32 = 0x0000_0080;
pub const PROC_EVENT_PTRACE: u32 = 0x0000_0100;
pub const PROC_EVENT_COMM: u32 = 0x0000_0200;
pub const PROC_EVENT_COREDUMP: u32 = 0x4000_0000;
pub const PROC_EVENT_EXIT: u32 = 0x8000_0000;

const FORK_LEN: usize = PROC_EVENT_HDRLEN + 16;
const EXEC_LEN: usize = PROC_EVENT_HDRLEN + 8;

/// Common fields carried by every process event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub what: u32,
    pub cpu: u32,
    pub timestamp_ns: u64,
}

impl EventHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        Some(EventHeader {
            what: read_u32(data, 0)?,
            cpu: read_u32(data, 4)?,
            timestamp_ns: read_u64(data, 8)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcEvent {
    Fork {
        parent_pid: Pid,
        parent_tgid: Pid,
        child_pid: Pid,
        child_tgid: Pid,
    },
    Exec {
        pid: Pid,
        tgid: Pid,
    },
    Overrun,
    Ignored,
}

impl ProcEvent {
    /// A fork whose child starts a new thread group, as opposed to a new
    /// thread joining the group led by `child_tgid`.
    pub fn is_process_fork(&self) -> bool {
        matches!(self, ProcEvent::Fork { child_pid, child_tgid, .. } if child_pid == child_tgid)
    }

    /// An exec performed by the thread-group leader itself.
    pub fn is_leader_exec(&self) -> bool {
        matches!(self, ProcEvent::Exec { pid, tgid } if pid == tgid)
    }
}

/// Decodes a process-event payload. Kinds other than fork and exec, and
/// payloads too short for their kind, decode to `Ignored`.
pub fn decode(data: &[u8]) -> ProcEvent {
    let header = match EventHeader::parse(data) {
        Some(header) => header,
        None => return ProcEvent::Ignored,
    };
    let decoded = match header.what {
        PROC_EVENT_FORK if data.len() >= FORK_LEN => decode_fork(data),
        PROC_EVENT_EXEC if data.len() >= EXEC_LEN => decode_exec(data),
        _ => None,
    };
    decoded.unwrap_or(ProcEvent::Ignored)
}

fn decode_fork(data: &[u8]) -> Option<ProcEvent> {
    Some(ProcEvent::Fork {
        parent_pid: read_u32(data, 16)?,
        parent_tgid: read_u32(data, 20)?,
        child_pid: read_u32(data, 24)?,
        child_tgid: read_u32(data, 28)?,
    })
}

fn decode_exec(data: &[u8]) -> Option<ProcEvent> {
    Some(ProcEvent::Exec {
        pid: read_u32(data, 16)?,
        tgid: read_u32(data, 20)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(what: u32, ids: &[u32]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&what.to_ne_bytes());
        buf.extend_from_slice(&3u32.to_ne_bytes());
        buf.extend_from_slice(&123_456_789u64.to_ne_bytes());
        for id in ids {
            buf.extend_from_slice(&id.to_ne_bytes());
        }
        buf
    }

    #[test]
    fn decodes_fork() {
        let ev = decode(&event(PROC_EVENT_FORK, &[10, 10, 20, 20]));
        assert_eq!(
            ev,
            ProcEvent::Fork {
                parent_pid: 10,
                parent_tgid: 10,
                child_pid: 20,
                child_tgid: 20,
            }
        );
        assert!(ev.is_process_fork());
    }

    #[test]
    fn thread_creation_is_not_a_process_fork() {
        let ev = decode(&event(PROC_EVENT_FORK, &[10, 10, 21, 20]));
        assert!(matches!(ev, ProcEvent::Fork { .. }));
        assert!(!ev.is_process_fork());
    }

    #[test]
    fn decodes_exec() {
        let leader = decode(&event(PROC_EVENT_EXEC, &[30, 30]));
        assert_eq!(leader, ProcEvent::Exec { pid: 30, tgid: 30 });
        assert!(leader.is_leader_exec());

        let sub = decode(&event(PROC_EVENT_EXEC, &[31, 30]));
        assert_eq!(sub, ProcEvent::Exec { pid: 31, tgid: 30 });
        assert!(!sub.is_leader_exec());
    }

    #[test]
    fn other_kinds_are_ignored() {
        for what in [
            PROC_EVENT_NONE,
            PROC_EVENT_UID,
            PROC_EVENT_GID,
            PROC_EVENT_SID,
            PROC_EVENT_PTRACE,
            PROC_EVENT_COMM,
            PROC_EVENT_COREDUMP,
            PROC_EVENT_EXIT,
            0xdead,
        ] {
            assert_eq!(decode(&event(what, &[1, 2, 3, 4, 5, 6])), ProcEvent::Ignored);
        }
    }

    #[test]
    fn short_payloads_are_ignored() {
        assert_eq!(decode(&[]), ProcEvent::Ignored);
        assert_eq!(decode(&event(PROC_EVENT_FORK, &[1, 2, 3])), ProcEvent::Ignored);
        assert_eq!(decode(&event(PROC_EVENT_EXEC, &[1])), ProcEvent::Ignored);
    }

    #[test]
    fn header_fields_are_read() {
        let header = EventHeader::parse(&event(PROC_EVENT_EXEC, &[1, 1])).unwrap();
        assert_eq!(header.what, PROC_EVENT_EXEC);
        assert_eq!(header.cpu, 3);
        assert_eq!(header.timestamp_ns, 123_456_789);
    }
}
