use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use crate::address::Address;
use crate::error::TransportError;
use crate::net::{SocketKind, Transfer, open_reusable};

use super::TcpConnection;

#[derive(Debug)]
pub struct TcpClient {
    connection: TcpConnection,
}

impl TcpClient {
    /// Blocks until the kernel resolves the connection attempt.
    pub fn connect(peer: Address) -> Result<Self, TransportError> {
        let socket = open_reusable(SocketKind::Stream)?;
        socket
            .connect(&peer.to_native())
            .map_err(TransportError::Connect)?;

        log::debug!("tcp client connected to {}", peer);

        Ok(Self {
            connection: TcpConnection::new(socket.into(), peer),
        })
    }

    pub fn peer(&self) -> Address {
        self.connection.peer()
    }

    pub fn local_addr(&self) -> Result<Address, TransportError> {
        self.connection.local_addr()
    }

    pub fn descriptor(&self) -> RawFd {
        self.connection.descriptor()
    }

    pub fn connection(&self) -> &TcpConnection {
        &self.connection
    }

    pub fn send(&self, data: &[u8]) -> Transfer {
        self.connection.send(data)
    }

    pub fn receive(&self, buf: &mut [u8]) -> Transfer {
        self.connection.receive(buf)
    }

    pub fn set_receive_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        self.connection.set_receive_timeout(timeout)
    }

    pub fn close(self) -> Result<(), TransportError> {
        self.connection.close()
    }
}

impl From<TcpClient> for TcpConnection {
    fn from(client: TcpClient) -> Self {
        client.connection
    }
}

impl AsFd for TcpClient {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.connection.as_fd()
    }
}

impl AsRawFd for TcpClient {
    fn as_raw_fd(&self) -> RawFd {
        self.connection.as_raw_fd()
    }
}
