mod run;

use std::process::exit;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
pub struct Options {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build procsnoop and run it with the privileges the connector needs
    Run(run::Options),
}

fn main() {
    let opts = Options::parse();

    use Command::*;
    if let Err(e) = match opts.command {
        Run(opts) => run::run(opts),
    } {
        eprintln!("{e:#}");
        exit(1);
    };
}
