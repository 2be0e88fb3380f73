use std::io;

/// Failure of a transport operation.
///
/// Setup failures carry the step that failed so callers can tell a refused
/// `bind` apart from a rejected socket option.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to set SO_REUSEADDR: {0}")]
    ReuseAddress(#[source] io::Error),
    #[error("failed to set SO_REUSEPORT: {0}")]
    ReusePort(#[source] io::Error),
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),
    #[error("connect failed: {0}")]
    Connect(#[source] io::Error),
    #[error("listen failed: {0}")]
    Listen(#[source] io::Error),
    #[error("peer address is not IPv4")]
    UnsupportedAddress,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            TransportError::Socket(e)
            | TransportError::ReuseAddress(e)
            | TransportError::ReusePort(e)
            | TransportError::Bind(e)
            | TransportError::Connect(e)
            | TransportError::Listen(e)
            | TransportError::Io(e) => Some(e),
            TransportError::UnsupportedAddress => None,
        }
    }

    pub fn raw_os_error(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }
}
