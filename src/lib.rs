//! Live feed of process forks, thread creation and execs, read from the
//! kernel's process-event connector.

pub mod cmdline;
pub mod config;
pub mod dispatch;
pub mod monitor;
pub mod socket;

pub use cmdline::{ProcfsResolver, ResolveCommandLine};
pub use config::{FilterConfig, Options};
pub use dispatch::{Dispatcher, EnrichedRecord, RecordKind};
pub use socket::ConnectorSocket;
