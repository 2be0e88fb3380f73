use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use sockbridge::{Address, UdpClient, UdpServer};

use crate::config::ProbeConfig;

/// Poll-driven echo loop: never blocks in `receive_from` unless a datagram
/// is already waiting.
pub struct UdpEcho {
    server: UdpServer,
    config: ProbeConfig,
}

impl UdpEcho {
    pub fn bind(port: u16, config: ProbeConfig) -> Result<Self> {
        let server = UdpServer::bind(port).context("failed to bind UDP echo server")?;
        Ok(Self { server, config })
    }

    pub fn local_addr(&self) -> Address {
        self.server.local_addr()
    }

    pub fn serve(&self, running: &AtomicBool) -> Result<u64> {
        let mut buf = vec![0u8; self.config.datagram_size];
        let mut echoed = 0;

        while running.load(Ordering::SeqCst) {
            if !self.server.poll_ready().is_ready() {
                thread::sleep(self.config.idle_sleep);
                continue;
            }

            let (size, from) = self.server.receive_from(&mut buf)?;
            self.server
                .send_to(from, &buf[..size])
                .with_context(|| format!("failed to echo to {}", from))?;
            echoed += 1;

            log::debug!("echoed {} bytes to {}", size, from);
        }

        Ok(echoed)
    }
}

/// Sends one datagram and polls for a reply until `config.reply_wait`
/// elapses.
pub fn send(peer: Address, message: &[u8], config: &ProbeConfig) -> Result<Option<Vec<u8>>> {
    let client = UdpClient::connect(peer).with_context(|| format!("failed to reach {}", peer))?;
    let sent = client.send(message)?;
    log::info!("sent {} bytes to {}", sent, peer);

    let start = Instant::now();
    while start.elapsed() < config.reply_wait {
        if client.poll_ready().is_ready() {
            let mut buf = vec![0u8; config.datagram_size];
            let size = client.receive(&mut buf)?;
            buf.truncate(size);
            client.close();
            return Ok(Some(buf));
        }
        thread::sleep(config.idle_sleep);
    }

    client.close();
    Ok(None)
}
