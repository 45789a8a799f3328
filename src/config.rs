use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use thiserror::Error;

/// Which decoded events produce output. Fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterConfig {
    pub exec: bool,
    pub fork: bool,
    /// Also report thread creation and execs by non-leader threads.
    pub thread: bool,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("specify at least '--exec' or '--fork'")]
    MissingMode,
}

impl FilterConfig {
    pub fn new(exec: bool, fork: bool, thread: bool) -> Result<Self, ConfigError> {
        if !(exec || fork) {
            return Err(ConfigError::MissingMode);
        }
        Ok(FilterConfig { exec, fork, thread })
    }
}

/// Report process and thread starts as they happen.
#[derive(Debug, Parser)]
#[command(version)]
#[command(group(ArgGroup::new("mode").required(true).multiple(true).args(["exec", "fork"])))]
pub struct Options {
    /// Report program executions
    #[arg(short, long)]
    pub exec: bool,

    /// Report process forks
    #[arg(short, long)]
    pub fork: bool,

    /// Include thread creation and execs by non-leader threads
    #[arg(short, long)]
    pub thread: bool,

    /// Where procfs is mounted, for command line lookups
    #[arg(long, default_value = "/proc")]
    pub procfs: PathBuf,
}

impl Options {
    pub fn filter(&self) -> Result<FilterConfig, ConfigError> {
        FilterConfig::new(self.exec, self.fork, self.thread)
    }
}
