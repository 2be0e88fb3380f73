use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

use socket2::SockAddr;

use crate::error::TransportError;

pub const DEFAULT_PORT: u16 = 27015;

/// IPv4 address and port, both in host byte order.
///
/// The layout is fixed so the value can cross the C boundary unchanged:
/// `address` holds the dotted quad with the first octet in the most
/// significant byte, so `127.0.0.1` is `0x7F00_0001`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub address: u32,
    pub port: u16,
}

impl Address {
    pub const ANY: Address = Address::new(0, 0);
    pub const LOOPBACK: Address = Address::new(0x7F00_0001, 0);

    pub const fn new(address: u32, port: u16) -> Self {
        Self { address, port }
    }

    pub const fn from_octets(octets: [u8; 4], port: u16) -> Self {
        Self::new(u32::from_be_bytes(octets), port)
    }

    pub const fn octets(&self) -> [u8; 4] {
        self.address.to_be_bytes()
    }

    pub const fn with_port(self, port: u16) -> Self {
        Self::new(self.address, port)
    }

    pub fn ip(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.address)
    }

    /// Kernel socket address for this endpoint, in network byte order.
    pub fn to_native(&self) -> SockAddr {
        SockAddr::from(SocketAddrV4::from(*self))
    }

    pub fn from_native(native: &SockAddr) -> Result<Self, TransportError> {
        native
            .as_socket_ipv4()
            .map(Address::from)
            .ok_or(TransportError::UnsupportedAddress)
    }

    pub fn from_socket_addr(addr: SocketAddr) -> Result<Self, TransportError> {
        match addr {
            SocketAddr::V4(v4) => Ok(v4.into()),
            SocketAddr::V6(_) => Err(TransportError::UnsupportedAddress),
        }
    }
}

impl From<SocketAddrV4> for Address {
    fn from(addr: SocketAddrV4) -> Self {
        Self::new(u32::from(*addr.ip()), addr.port())
    }
}

impl From<Address> for SocketAddrV4 {
    fn from(addr: Address) -> Self {
        SocketAddrV4::new(addr.ip(), addr.port)
    }
}

impl From<Address> for SocketAddr {
    fn from(addr: Address) -> Self {
        SocketAddr::V4(addr.into())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
    }
}

impl FromStr for Address {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>().map(Address::from)
    }
}
