use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};

use common::{encode_mcast_op, McastOp, CN_IDX_PROC};
use log::debug;
use thiserror::Error;
use tokio::io::unix::AsyncFd;

#[derive(Error, Debug)]
pub enum SocketError {
    #[error("unable to open a netlink socket")]
    Open(#[source] io::Error),
    #[error("unable to bind to the process connector")]
    Bind(#[source] io::Error),
    #[error("unable to listen to the process connector")]
    Subscribe(#[source] io::Error),
    #[error("unable to register the socket with the runtime")]
    Register(#[source] io::Error),
}

/// Netlink connector socket joined to the process-event multicast group.
///
/// Needs CAP_NET_ADMIN. Must be created from within a tokio runtime.
pub struct ConnectorSocket {
    fd: AsyncFd<OwnedFd>,
    port_id: u32,
}

impl ConnectorSocket {
    pub fn open() -> Result<Self, SocketError> {
        // SAFETY: plain syscall with constant arguments; the result is checked below.
        let raw = unsafe {
            libc::socket(
                libc::PF_NETLINK,
                libc::SOCK_DGRAM | libc::SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
                libc::NETLINK_CONNECTOR,
            )
        };
        if raw == -1 {
            return Err(SocketError::Open(io::Error::last_os_error()));
        }
        // SAFETY: `raw` was just returned by socket(2) and is owned by nothing else.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // Port id 0 lets the kernel pick a unique one.
        // SAFETY: sockaddr_nl is plain old data and all-zero is a valid value.
        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        addr.nl_groups = CN_IDX_PROC;
        // SAFETY: `addr` is a live sockaddr_nl and the length passed matches it.
        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if ret == -1 {
            return Err(SocketError::Bind(io::Error::last_os_error()));
        }
        let port_id = local_port_id(fd.as_raw_fd()).map_err(SocketError::Bind)?;
        debug!("bound process connector socket, port id {port_id}");

        // SAFETY: the OwnedFd moves into the AsyncFd, which keeps it open and
        // returns the same descriptor from as_raw_fd() until it is dropped.
        let fd = unsafe { AsyncFd::register(fd) }
            .map_err(|e| SocketError::Register(e.into()))?;
        Ok(ConnectorSocket { fd, port_id })
    }

    /// Asks the kernel to start delivering process events to this socket.
    pub fn subscribe(&self) -> Result<(), SocketError> {
        self.send_op(McastOp::Listen).map_err(SocketError::Subscribe)
    }

    /// Asks the kernel to stop delivering process events.
    pub fn unsubscribe(&self) -> Result<(), SocketError> {
        self.send_op(McastOp::Ignore).map_err(SocketError::Subscribe)
    }

    fn send_op(&self, op: McastOp) -> io::Result<()> {
        let msg = encode_mcast_op(op, self.port_id);
        // SAFETY: `msg` outlives the call and its length is passed alongside it.
        let sent = unsafe {
            libc::send(
                self.fd.get_ref().as_raw_fd(),
                msg.as_ptr() as *const libc::c_void,
                msg.len(),
                0,
            )
        };
        if sent == -1 {
            return Err(io::Error::last_os_error());
        }
        debug!("sent {op:?} to the process connector");
        Ok(())
    }

    /// Waits for one datagram. Returns its length and the sender's port id,
    /// which is 0 when the kernel sent it.
    pub async fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, u32)> {
        loop {
            let mut guard = self.fd.readable().await?;
            match guard.try_io(|inner| recv_from(inner.get_ref().as_raw_fd(), &mut *buf)) {
                Ok(result) => return result,
                Err(_would_block) => continue,
            }
        }
    }
}

fn local_port_id(fd: RawFd) -> io::Result<u32> {
    // SAFETY: sockaddr_nl is plain old data and all-zero is a valid value.
    let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t;
    // SAFETY: `addr` and `len` are live and `len` holds the size of `addr`.
    let ret = unsafe {
        libc::getsockname(
            fd,
            &mut addr as *mut libc::sockaddr_nl as *mut libc::sockaddr,
            &mut len,
        )
    };
    if ret == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok(addr.nl_pid)
}

fn recv_from(fd: RawFd, buf: &mut [u8]) -> io::Result<(usize, u32)> {
    // SAFETY: sockaddr_nl is plain old data and all-zero is a valid value.
    let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
    let mut len = mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t;
    // SAFETY: the kernel writes at most `buf.len()` bytes into `buf`, and at
    // most `len` bytes into `addr`.
    let received = unsafe {
        libc::recvfrom(
            fd,
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
            0,
            &mut addr as *mut libc::sockaddr_nl as *mut libc::sockaddr,
            &mut len,
        )
    };
    if received == -1 {
        return Err(io::Error::last_os_error());
    }
    Ok((received as usize, addr.nl_pid))
}
