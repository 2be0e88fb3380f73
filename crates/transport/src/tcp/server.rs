use std::io;
use std::net::TcpListener;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::time::Duration;

use crate::address::Address;
use crate::error::TransportError;
use crate::net::{SocketKind, open_reusable};

use super::TcpConnection;

pub const DEFAULT_BACKLOG: i32 = 30;
const DEFAULT_ACCEPT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct TcpServerConfig {
    pub port: u16,
    /// Bounds both `accept` and receives on accepted connections. Zero blocks
    /// indefinitely.
    pub accept_timeout: Duration,
    pub backlog: i32,
}

impl Default for TcpServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            accept_timeout: Duration::from_secs(DEFAULT_ACCEPT_TIMEOUT_SECS),
            backlog: DEFAULT_BACKLOG,
        }
    }
}

impl TcpServerConfig {
    pub fn new(port: u16, timeout_secs: u64) -> Self {
        Self {
            port,
            accept_timeout: Duration::from_secs(timeout_secs),
            ..Default::default()
        }
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.accept_timeout).filter(|t| !t.is_zero())
    }
}

#[derive(Debug)]
pub enum Accepted {
    Connection(TcpConnection),
    /// No client arrived within the configured timeout. The listener is
    /// still usable.
    TimedOut,
}

/// Listening socket. Accepted connections are handed to the caller and are
/// not tracked here.
#[derive(Debug)]
pub struct TcpServer {
    listener: TcpListener,
    local_addr: Address,
    config: TcpServerConfig,
}

impl TcpServer {
    pub fn listen(config: TcpServerConfig) -> Result<Self, TransportError> {
        let socket = open_reusable(SocketKind::Stream)?;

        if let Err(e) = socket.set_read_timeout(config.timeout()) {
            log::warn!("failed to set accept timeout: {}", e);
        }
        socket
            .set_reuse_port(true)
            .map_err(TransportError::ReusePort)?;
        socket
            .bind(&Address::ANY.with_port(config.port).to_native())
            .map_err(TransportError::Bind)?;
        socket
            .listen(config.backlog)
            .map_err(TransportError::Listen)?;

        let listener: TcpListener = socket.into();
        let local_addr = Address::from_socket_addr(listener.local_addr()?)?;

        log::debug!(
            "tcp server listening on {} (timeout {:?}, backlog {})",
            local_addr,
            config.accept_timeout,
            config.backlog
        );

        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    pub fn local_addr(&self) -> Address {
        self.local_addr
    }

    pub fn config(&self) -> &TcpServerConfig {
        &self.config
    }

    pub fn descriptor(&self) -> RawFd {
        self.listener.as_raw_fd()
    }

    pub fn accept_connection(&self) -> Result<Accepted, TransportError> {
        let (stream, from) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                return Ok(Accepted::TimedOut);
            }
            Err(e) => return Err(e.into()),
        };

        let peer = Address::from_socket_addr(from)?;
        let connection = TcpConnection::new(stream, peer);
        connection.set_receive_timeout(self.config.timeout())?;

        log::debug!(
            "accepted {} on {} as descriptor {}",
            peer,
            self.local_addr,
            connection.descriptor()
        );

        Ok(Accepted::Connection(connection))
    }

    pub fn close(self) {
        log::debug!("tcp server on {} closed", self.local_addr);
    }
}

impl AsFd for TcpServer {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.listener.as_fd()
    }
}

impl AsRawFd for TcpServer {
    fn as_raw_fd(&self) -> RawFd {
        self.listener.as_raw_fd()
    }
}
