//! Best-effort command line lookup through procfs.
//!
//! The id may already belong to a different process by the time we read it.
//! Nothing here tries to detect that.

use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use common::Pid;
use log::trace;

/// Upper bound on bytes read from a cmdline file.
pub const CMDLINE_MAX: usize = 4096;

/// Substituted when the command line cannot be read.
pub const PLACEHOLDER: &str = "<N/A>";

pub trait ResolveCommandLine {
    /// Returns a printable command line for `id`, or [`PLACEHOLDER`].
    fn resolve(&mut self, id: Pid) -> String;
}

/// Reads `<root>/<id>/cmdline`, reusing one scratch buffer across lookups.
#[derive(Debug)]
pub struct ProcfsResolver {
    root: PathBuf,
    scratch: Box<[u8; CMDLINE_MAX]>,
}

impl ProcfsResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProcfsResolver {
            root: root.into(),
            scratch: Box::new([0; CMDLINE_MAX]),
        }
    }

    fn read(&mut self, id: Pid) -> io::Result<usize> {
        let path = self.root.join(id.to_string()).join("cmdline");
        let file = File::open(path)?;
        read_bounded(file, &mut self.scratch[..])
    }
}

impl Default for ProcfsResolver {
    fn default() -> Self {
        ProcfsResolver::new("/proc")
    }
}

impl ResolveCommandLine for ProcfsResolver {
    fn resolve(&mut self, id: Pid) -> String {
        match self.read(id) {
            Ok(len) => sanitize(&self.scratch[..len]),
            Err(e) => {
                trace!("cmdline of {id} unavailable: {e}");
                PLACEHOLDER.to_owned()
            }
        }
    }
}

/// Fills `buf` from `reader` until it is full or the reader is exhausted.
fn read_bounded(mut reader: impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Joins NUL-separated arguments into one line: every byte below 32 becomes a space.
pub fn sanitize(raw: &[u8]) -> String {
    let bytes: Vec<u8> = raw
        .iter()
        .map(|&b| if b < 32 { b' ' } else { b })
        .collect();
    String::from_utf8_lossy(&bytes).into_owned()
}
