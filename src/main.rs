use std::io;

use anyhow::Context as _;
use clap::Parser;
use log::{info, warn};
use tokio::signal::{self, unix::SignalKind};

use procsnoop::{monitor, ConnectorSocket, Dispatcher, Options, ProcfsResolver};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init();

    let opts = Options::parse();
    let filter = opts.filter()?;

    let socket = ConnectorSocket::open()?;
    socket.subscribe()?;

    let resolver = ProcfsResolver::new(&opts.procfs);
    let mut dispatcher = Dispatcher::new(filter, resolver, io::stdout());

    info!("Waiting for process events...");
    monitor::run(&socket, &mut dispatcher, shutdown())
        .await
        .context("event loop failed")?;

    if let Err(e) = socket.unsubscribe() {
        warn!("{e}");
    }
    info!("Exiting... {:?}", dispatcher.counters());
    Ok(())
}

async fn shutdown() -> io::Result<()> {
    let mut terminate = signal::unix::signal(SignalKind::terminate())?;
    tokio::select! {
        res = signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}
