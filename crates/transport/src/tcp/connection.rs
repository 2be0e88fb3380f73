use std::io;
use std::net::{Shutdown, TcpStream};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use crate::address::Address;
use crate::error::TransportError;
use crate::net::{Transfer, read_full, write_full};

/// One connected stream, either dialed by a client or accepted by a server.
///
/// Sends and receives are full-length: each call moves the whole buffer or
/// reports how far it got.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
    peer: Address,
}

impl TcpConnection {
    pub(crate) fn new(stream: TcpStream, peer: Address) -> Self {
        Self { stream, peer }
    }

    pub fn peer(&self) -> Address {
        self.peer
    }

    pub fn local_addr(&self) -> Result<Address, TransportError> {
        Address::from_socket_addr(self.stream.local_addr()?)
    }

    pub fn descriptor(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn send(&self, data: &[u8]) -> Transfer {
        write_full(&self.stream, data)
    }

    /// Reads exactly `buf.len()` bytes unless the peer closes, the receive
    /// timeout fires, or the socket fails first.
    pub fn receive(&self, buf: &mut [u8]) -> Transfer {
        read_full(&self.stream, buf)
    }

    /// `None` or a zero duration blocks indefinitely.
    pub fn set_receive_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        let timeout = timeout.filter(|t| !t.is_zero());
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Shuts both directions down so a reader blocked on another thread wakes
    /// up, then releases the descriptor.
    pub fn close(self) -> Result<(), TransportError> {
        self.shutdown()?;
        log::debug!("tcp connection with {} closed", self.peer);
        Ok(())
    }

    pub fn shutdown(&self) -> Result<(), TransportError> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl AsFd for TcpConnection {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.stream.as_fd()
    }
}

impl AsRawFd for TcpConnection {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}
