mod readiness;
mod stream;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::TransportError;

pub use readiness::{Readiness, poll_readable};
pub use stream::{Interruption, Transfer, read_full, write_full};

/// Largest payload the host side is expected to put in one datagram.
pub const MAX_DATAGRAM_SIZE: usize = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SocketKind {
    Datagram,
    Stream,
}

/// Opens an IPv4 socket with `SO_REUSEADDR` set, the common first step of
/// every endpoint.
pub(crate) fn open_reusable(kind: SocketKind) -> Result<Socket, TransportError> {
    let (ty, protocol) = match kind {
        SocketKind::Datagram => (Type::DGRAM, Protocol::UDP),
        SocketKind::Stream => (Type::STREAM, Protocol::TCP),
    };

    let socket =
        Socket::new(Domain::IPV4, ty, Some(protocol)).map_err(TransportError::Socket)?;
    socket
        .set_reuse_address(true)
        .map_err(TransportError::ReuseAddress)?;

    Ok(socket)
}
