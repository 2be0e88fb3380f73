mod config;
mod tcp;
mod udp;

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use config::ProbeConfig;
use sockbridge::{Address, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "sockbridge-probe")]
#[command(about = "Exercise sockbridge endpoints from the command line")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Echo every datagram back to its sender
    UdpEcho {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
    /// Send one datagram and print the reply, if any
    UdpSend {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(short, long)]
        message: String,

        #[arg(long, default_value_t = 1000, help = "How long to poll for a reply")]
        wait_ms: u64,
    },
    /// Echo fixed-size frames on every accepted connection
    TcpEcho {
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(short, long, default_value_t = 30, help = "Accept and receive timeout in seconds, 0 blocks")]
        timeout: u64,

        #[arg(long, default_value_t = 64)]
        frame_size: usize,
    },
    /// Send one frame and print the echoed frame
    TcpSend {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        #[arg(short, long)]
        message: String,

        #[arg(long, default_value_t = 64)]
        frame_size: usize,
    },
}

fn resolve(host: &str, port: u16) -> Result<Address> {
    let address: Address = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("invalid IPv4 host {:?}", host))?;
    Ok(address)
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let running = AtomicBool::new(true);

    match args.command {
        Command::UdpEcho { port } => {
            let echo = udp::UdpEcho::bind(port, ProbeConfig::default())?;
            log::info!("UDP echo listening on {}", echo.local_addr());
            let echoed = echo.serve(&running)?;
            log::info!("echoed {} datagrams", echoed);
        }
        Command::UdpSend {
            host,
            port,
            message,
            wait_ms,
        } => {
            let config = ProbeConfig {
                reply_wait: Duration::from_millis(wait_ms),
                ..Default::default()
            };
            match udp::send(resolve(&host, port)?, message.as_bytes(), &config)? {
                Some(reply) => println!("{}", String::from_utf8_lossy(&reply)),
                None => log::warn!("no reply within {} ms", wait_ms),
            }
        }
        Command::TcpEcho {
            port,
            timeout,
            frame_size,
        } => {
            let config = ProbeConfig {
                frame_size,
                ..Default::default()
            };
            let echo = tcp::TcpEcho::listen(port, timeout, config)?;
            log::info!("TCP echo listening on {} ({} byte frames)", echo.local_addr(), frame_size);
            let accepted = echo.serve(&running)?;
            log::info!("served {} connections", accepted);
        }
        Command::TcpSend {
            host,
            port,
            message,
            frame_size,
        } => {
            let config = ProbeConfig {
                frame_size,
                ..Default::default()
            };
            let frame = tcp::send(resolve(&host, port)?, message.as_bytes(), &config)?;
            let end = frame.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            println!("{}", String::from_utf8_lossy(&frame[..end]));
        }
    }

    Ok(())
}
