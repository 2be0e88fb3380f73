pub mod address;
pub mod error;
pub mod net;
pub mod tcp;
pub mod udp;

pub use address::{Address, DEFAULT_PORT};
pub use error::TransportError;
pub use net::{Interruption, MAX_DATAGRAM_SIZE, Readiness, Transfer};
pub use tcp::{Accepted, TcpClient, TcpConnection, TcpServer, TcpServerConfig};
pub use udp::{UdpClient, UdpServer};
