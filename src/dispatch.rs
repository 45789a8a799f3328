//! Turns decoded process events into output lines.

use std::fmt;
use std::io::{self, Write};

use common::{classify, decode, Classified, EventHeader, FrameIter, Pid, ProcEvent};
use log::{debug, log_enabled, trace, Level};

use crate::cmdline::ResolveCommandLine;
use crate::config::FilterConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Fork,
    Thread,
    ExecLeader,
    ExecThread,
    Overrun,
}

/// What to print for an event that passed the filter, before enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub kind: RecordKind,
    pub primary_id: Pid,
    pub secondary_id: Option<Pid>,
    /// Whose command line to attach, if any.
    pub target: Option<Pid>,
}

/// Applies the filter to an event. `None` means the event produces no output.
pub fn select(event: &ProcEvent, filter: &FilterConfig) -> Option<Selection> {
    match *event {
        ProcEvent::Overrun => Some(Selection {
            kind: RecordKind::Overrun,
            primary_id: 0,
            secondary_id: None,
            target: None,
        }),
        ProcEvent::Fork {
            parent_pid,
            child_pid,
            child_tgid,
            ..
        } => {
            if event.is_process_fork() {
                filter.fork.then_some(Selection {
                    kind: RecordKind::Fork,
                    primary_id: parent_pid,
                    secondary_id: Some(child_pid),
                    target: Some(child_tgid),
                })
            } else {
                (filter.fork && filter.thread).then_some(Selection {
                    kind: RecordKind::Thread,
                    primary_id: child_tgid,
                    secondary_id: Some(child_pid),
                    target: Some(child_tgid),
                })
            }
        }
        ProcEvent::Exec { pid, tgid } => {
            if event.is_leader_exec() {
                filter.exec.then_some(Selection {
                    kind: RecordKind::ExecLeader,
                    primary_id: pid,
                    secondary_id: None,
                    target: Some(tgid),
                })
            } else {
                (filter.exec && filter.thread).then_some(Selection {
                    kind: RecordKind::ExecThread,
                    primary_id: tgid,
                    secondary_id: Some(pid),
                    target: Some(tgid),
                })
            }
        }
        ProcEvent::Ignored => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub kind: RecordKind,
    pub primary_id: Pid,
    pub secondary_id: Option<Pid>,
    pub command_line: String,
}

impl fmt::Display for EnrichedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            RecordKind::Overrun => return f.write_str("overrun"),
            RecordKind::Fork => "Fork",
            RecordKind::Thread => "Thread",
            RecordKind::ExecLeader | RecordKind::ExecThread => "Exec",
        };
        match self.secondary_id {
            Some(secondary) => write!(
                f,
                "{label} {} {secondary} {}",
                self.primary_id, self.command_line
            ),
            None => write!(f, "{label} - {} {}", self.primary_id, self.command_line),
        }
    }
}

/// Running totals, logged on shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub datagrams: u64,
    pub frames: u64,
    pub truncated: u64,
    pub ignored: u64,
    pub overruns: u64,
    pub emitted: u64,
}

pub struct Dispatcher<R, W> {
    filter: FilterConfig,
    resolver: R,
    sink: W,
    counters: Counters,
}

impl<R: ResolveCommandLine, W: Write> Dispatcher<R, W> {
    pub fn new(filter: FilterConfig, resolver: R, sink: W) -> Self {
        Dispatcher {
            filter,
            resolver,
            sink,
            counters: Counters::default(),
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    /// Processes every frame of one received datagram in wire order.
    pub fn handle_datagram(&mut self, buf: &[u8], received: usize) -> io::Result<()> {
        self.counters.datagrams += 1;

        let mut frames = FrameIter::new(buf, received);
        for frame in frames.by_ref() {
            self.counters.frames += 1;
            let event = match classify(&frame) {
                Classified::ControlNoop => ProcEvent::Ignored,
                Classified::ControlOverrun => ProcEvent::Overrun,
                Classified::Candidate(data) => {
                    let event = decode(data);
                    if log_enabled!(Level::Trace) {
                        if let Some(header) = EventHeader::parse(data) {
                            trace!(
                                "cpu {} at {} ns: {event:?}",
                                header.cpu,
                                header.timestamp_ns
                            );
                        }
                    }
                    event
                }
            };
            self.handle_event(&event)?;
        }

        if frames.is_truncated() {
            self.counters.truncated += 1;
            debug!("discarding malformed tail of a {received} byte datagram");
        }
        Ok(())
    }

    /// Emits the record for one event, if the filter lets it through.
    pub fn handle_event(&mut self, event: &ProcEvent) -> io::Result<()> {
        let selection = match select(event, &self.filter) {
            Some(selection) => selection,
            None => {
                if *event == ProcEvent::Ignored {
                    self.counters.ignored += 1;
                }
                return Ok(());
            }
        };
        trace!("{event:?} selected as {:?}", selection.kind);

        let command_line = selection
            .target
            .map(|id| self.resolver.resolve(id))
            .unwrap_or_default();
        let record = EnrichedRecord {
            kind: selection.kind,
            primary_id: selection.primary_id,
            secondary_id: selection.secondary_id,
            command_line,
        };
        self.emit(&record)
    }

    /// Reports that the kernel dropped events, however we learned about it.
    pub fn overrun(&mut self) -> io::Result<()> {
        self.handle_event(&ProcEvent::Overrun)
    }

    fn emit(&mut self, record: &EnrichedRecord) -> io::Result<()> {
        if record.kind == RecordKind::Overrun {
            self.counters.overruns += 1;
        }
        writeln!(self.sink, "{record}")?;
        self.sink.flush()?;
        self.counters.emitted += 1;
        Ok(())
    }
}
