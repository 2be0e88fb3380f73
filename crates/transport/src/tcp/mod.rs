mod client;
mod connection;
mod server;

pub use client::TcpClient;
pub use connection::TcpConnection;
pub use server::{Accepted, DEFAULT_BACKLOG, TcpServer, TcpServerConfig};
