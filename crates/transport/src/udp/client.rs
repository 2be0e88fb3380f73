use std::net::UdpSocket;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use crate::address::Address;
use crate::error::TransportError;
use crate::net::{Readiness, SocketKind, open_reusable, poll_readable};

/// Datagram socket connected to a single peer.
///
/// `connect` performs no handshake; it fixes the default destination and
/// makes the kernel drop datagrams from anyone else.
#[derive(Debug)]
pub struct UdpClient {
    socket: UdpSocket,
    peer: Address,
}

impl UdpClient {
    pub fn connect(peer: Address) -> Result<Self, TransportError> {
        let socket = open_reusable(SocketKind::Datagram)?;
        socket
            .connect(&peer.to_native())
            .map_err(TransportError::Connect)?;

        log::debug!("udp client connected to {}", peer);

        Ok(Self {
            socket: socket.into(),
            peer,
        })
    }

    pub fn peer(&self) -> Address {
        self.peer
    }

    pub fn local_addr(&self) -> Result<Address, TransportError> {
        Address::from_socket_addr(self.socket.local_addr()?)
    }

    pub fn send(&self, data: &[u8]) -> Result<usize, TransportError> {
        Ok(self.socket.send(data)?)
    }

    /// Blocks until one datagram arrives. Anything beyond `buf.len()` is
    /// discarded by the kernel.
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(self.socket.recv(buf)?)
    }

    pub fn poll_ready(&self) -> Readiness {
        poll_readable(&self.socket)
    }

    pub fn close(self) {
        log::debug!("udp client to {} closed", self.peer);
    }
}

impl AsFd for UdpClient {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl AsRawFd for UdpClient {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
