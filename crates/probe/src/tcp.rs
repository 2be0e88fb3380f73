use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, bail};
use sockbridge::{Accepted, Address, TcpClient, TcpConnection, TcpServer, TcpServerConfig};

use crate::config::ProbeConfig;

pub struct TcpEcho {
    server: TcpServer,
    config: ProbeConfig,
}

impl TcpEcho {
    pub fn listen(port: u16, timeout_secs: u64, config: ProbeConfig) -> Result<Self> {
        let server = TcpServer::listen(TcpServerConfig::new(port, timeout_secs))
            .context("failed to start TCP echo server")?;
        Ok(Self { server, config })
    }

    pub fn local_addr(&self) -> Address {
        self.server.local_addr()
    }

    /// Accepts until `running` is cleared, echoing each connection's frames on
    /// its own thread. The flag is checked once per accept timeout.
    pub fn serve(&self, running: &AtomicBool) -> Result<usize> {
        let mut workers: Vec<JoinHandle<()>> = Vec::new();
        let mut accepted = 0;

        while running.load(Ordering::SeqCst) {
            match self.server.accept_connection() {
                Ok(Accepted::Connection(connection)) => {
                    log::info!("client connected from {}", connection.peer());
                    accepted += 1;
                    let frame_size = self.config.frame_size;
                    workers.push(thread::spawn(move || echo_frames(connection, frame_size)));
                }
                Ok(Accepted::TimedOut) => {
                    log::trace!("no client within accept timeout");
                }
                Err(e) => log::warn!("accept failed: {}", e),
            }

            workers.retain(|worker| !worker.is_finished());
        }

        for worker in workers {
            if worker.join().is_err() {
                log::error!("echo worker panicked");
            }
        }

        Ok(accepted)
    }
}

fn echo_frames(connection: TcpConnection, frame_size: usize) {
    let peer = connection.peer();
    let mut frame = vec![0u8; frame_size];
    let mut frames = 0u64;

    loop {
        let received = connection.receive(&mut frame);
        if !received.is_complete() {
            log::debug!(
                "{} stopped after {} of {} bytes: {:?}",
                peer,
                received.transferred,
                received.requested,
                received.interruption
            );
            break;
        }

        let sent = connection.send(&frame);
        if !sent.is_complete() {
            log::warn!("echo to {} cut short: {:?}", peer, sent.interruption);
            break;
        }
        frames += 1;
    }

    log::info!("client {} done after {} frames", peer, frames);
    if let Err(e) = connection.close() {
        log::warn!("failed to close connection with {}: {}", peer, e);
    }
}

/// Sends `message` as one zero-padded frame and waits for the echoed frame.
pub fn send(peer: Address, message: &[u8], config: &ProbeConfig) -> Result<Vec<u8>> {
    if message.len() > config.frame_size {
        bail!(
            "message is {} bytes but frames are {} bytes",
            message.len(),
            config.frame_size
        );
    }

    let client = TcpClient::connect(peer).with_context(|| format!("failed to connect to {}", peer))?;
    client.set_receive_timeout(Some(config.reply_wait))?;

    let mut frame = vec![0u8; config.frame_size];
    frame[..message.len()].copy_from_slice(message);

    let sent = client.send(&frame);
    if let Some(e) = sent.error() {
        bail!("sent {} of {} bytes: {}", sent.transferred, sent.requested, e);
    }

    let received = client.receive(&mut frame);
    if !received.is_complete() {
        bail!(
            "echo short by {} bytes: {:?}",
            received.shortfall(),
            received.interruption
        );
    }

    client.close()?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_echo_frames_for_two_clients() {
        let config = ProbeConfig {
            frame_size: 16,
            ..Default::default()
        };
        let echo = Arc::new(TcpEcho::listen(0, 1, config.clone()).unwrap());
        let running = Arc::new(AtomicBool::new(true));
        let target = Address::LOOPBACK.with_port(echo.local_addr().port);

        let server = {
            let echo = Arc::clone(&echo);
            let running = Arc::clone(&running);
            thread::spawn(move || echo.serve(&running).unwrap())
        };

        let first = send(target, b"ping", &config).unwrap();
        assert_eq!(&first[..4], b"ping");
        assert!(first[4..].iter().all(|&b| b == 0));

        let second = send(target, b"0123456789abcdef", &config).unwrap();
        assert_eq!(second, b"0123456789abcdef");

        running.store(false, Ordering::SeqCst);
        assert_eq!(server.join().unwrap(), 2);
    }

    #[test]
    fn test_oversized_message_rejected() {
        let config = ProbeConfig {
            frame_size: 4,
            ..Default::default()
        };
        let err = send(Address::LOOPBACK.with_port(9), b"too long", &config).unwrap_err();
        assert!(err.to_string().contains("frames are 4 bytes"));
    }
}
