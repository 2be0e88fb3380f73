use std::net::UdpSocket;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};

use crate::address::Address;
use crate::error::TransportError;
use crate::net::{Readiness, SocketKind, open_reusable, poll_readable};

/// Unconnected datagram socket bound to a port on every local interface.
#[derive(Debug)]
pub struct UdpServer {
    socket: UdpSocket,
    local_addr: Address,
}

impl UdpServer {
    pub fn bind(port: u16) -> Result<Self, TransportError> {
        let socket = open_reusable(SocketKind::Datagram)?;
        socket
            .bind(&Address::ANY.with_port(port).to_native())
            .map_err(TransportError::Bind)?;

        let socket: UdpSocket = socket.into();
        let local_addr = Address::from_socket_addr(socket.local_addr()?)?;

        log::debug!("udp server bound to {}", local_addr);

        Ok(Self { socket, local_addr })
    }

    pub fn local_addr(&self) -> Address {
        self.local_addr
    }

    pub fn send_to(&self, peer: Address, data: &[u8]) -> Result<usize, TransportError> {
        Ok(self.socket.send_to(data, std::net::SocketAddr::from(peer))?)
    }

    /// Blocks until a datagram arrives and returns its length and sender.
    pub fn receive_from(&self, buf: &mut [u8]) -> Result<(usize, Address), TransportError> {
        let (size, from) = self.socket.recv_from(buf)?;
        Ok((size, Address::from_socket_addr(from)?))
    }

    pub fn poll_ready(&self) -> Readiness {
        poll_readable(&self.socket)
    }

    pub fn close(self) {
        log::debug!("udp server on {} closed", self.local_addr);
    }
}

impl AsFd for UdpServer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.socket.as_fd()
    }
}

impl AsRawFd for UdpServer {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}
