use std::future::Future;
use std::io::{self, Write};

use bytes::BytesMut;
use common::RECV_BUFFER_SIZE;
use log::{debug, warn};

use crate::cmdline::ResolveCommandLine;
use crate::dispatch::Dispatcher;
use crate::socket::ConnectorSocket;

/// Receives and dispatches datagrams until `shutdown` resolves.
///
/// Each datagram is fully processed before the next receive, so records come
/// out in delivery order.
pub async fn run<R, W, F>(
    socket: &ConnectorSocket,
    dispatcher: &mut Dispatcher<R, W>,
    shutdown: F,
) -> io::Result<()>
where
    R: ResolveCommandLine,
    W: Write,
    F: Future<Output = io::Result<()>>,
{
    let mut buf = BytesMut::zeroed(RECV_BUFFER_SIZE);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => return res,
            received = socket.recv(&mut buf) => handle_receive(dispatcher, &buf, received)?,
        }
    }
}

/// Handles the outcome of one receive call. Sink errors and errors that mean
/// the socket itself is unusable are returned; anything else is logged.
pub fn handle_receive<R, W>(
    dispatcher: &mut Dispatcher<R, W>,
    buf: &[u8],
    received: io::Result<(usize, u32)>,
) -> io::Result<()>
where
    R: ResolveCommandLine,
    W: Write,
{
    match received {
        Ok((len, 0)) => dispatcher.handle_datagram(buf, len),
        Ok((len, sender)) => {
            debug!("dropping {len} byte datagram from port id {sender}");
            Ok(())
        }
        // The socket queue overflowed and the kernel dropped messages.
        Err(e) if e.raw_os_error() == Some(libc::ENOBUFS) => dispatcher.overrun(),
        Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
        // Readiness is only cleared on WouldBlock, so these would repeat forever.
        Err(e) if is_fatal(&e) => Err(e),
        Err(e) => {
            warn!("receive failed: {e}");
            Ok(())
        }
    }
}

fn is_fatal(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EBADF | libc::ENOTSOCK | libc::EFAULT | libc::EINVAL)
    )
}
