use std::thread;
use std::time::{Duration, Instant};

use sockbridge::{Address, MAX_DATAGRAM_SIZE, Readiness, UdpClient, UdpServer};

fn loopback_pair() -> (UdpServer, UdpClient) {
    let server = UdpServer::bind(0).unwrap();
    let client = UdpClient::connect(Address::LOOPBACK.with_port(server.local_addr().port)).unwrap();
    (server, client)
}

fn wait_ready(poll: impl Fn() -> Readiness, timeout_ms: u64) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if poll().is_ready() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

#[test]
fn test_client_datagram_reaches_server() {
    let (server, client) = loopback_pair();

    for len in [1usize, 17, 512, MAX_DATAGRAM_SIZE] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        assert_eq!(client.send(&payload).unwrap(), len);

        assert!(wait_ready(|| server.poll_ready(), 500), "no datagram of {} bytes", len);

        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let (size, from) = server.receive_from(&mut buf).unwrap();
        assert_eq!(size, len);
        assert_eq!(&buf[..size], payload.as_slice());
        assert_eq!(from, client.local_addr().unwrap());
    }
}

#[test]
fn test_server_replies_to_sender() {
    let (server, client) = loopback_pair();

    client.send(b"ping").unwrap();
    let mut buf = [0u8; 64];
    let (size, from) = server.receive_from(&mut buf).unwrap();
    assert_eq!(&buf[..size], b"ping");

    assert_eq!(server.send_to(from, b"pong").unwrap(), 4);

    assert!(wait_ready(|| client.poll_ready(), 500));
    let size = client.receive(&mut buf).unwrap();
    assert_eq!(&buf[..size], b"pong");
}

#[test]
fn test_poll_is_idempotent_until_consumed() {
    let (server, client) = loopback_pair();

    for _ in 0..5 {
        assert_eq!(server.poll_ready(), Readiness::NoData);
    }

    client.send(&[7u8; 32]).unwrap();
    assert!(wait_ready(|| server.poll_ready(), 500));
    for _ in 0..5 {
        assert_eq!(server.poll_ready(), Readiness::DataWaiting);
    }

    let mut buf = [0u8; 64];
    server.receive_from(&mut buf).unwrap();
    assert_eq!(server.poll_ready(), Readiness::NoData);
}

#[test]
fn test_receive_truncates_to_capacity() {
    let (server, client) = loopback_pair();

    client.send(&[1u8; 100]).unwrap();
    let mut small = [0u8; 10];
    let (size, _) = server.receive_from(&mut small).unwrap();
    assert_eq!(size, 10);

    // The remainder of a datagram is discarded, not queued.
    assert_eq!(server.poll_ready(), Readiness::NoData);
}

#[test]
fn test_connected_client_ignores_strangers() {
    let (server, client) = loopback_pair();
    let stranger = UdpServer::bind(0).unwrap();

    let client_addr = client.local_addr().unwrap();
    stranger.send_to(client_addr, b"intruder").unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(client.poll_ready(), Readiness::NoData);

    server.send_to(client_addr, b"expected").unwrap();
    assert!(wait_ready(|| client.poll_ready(), 500));
    let mut buf = [0u8; 32];
    let size = client.receive(&mut buf).unwrap();
    assert_eq!(&buf[..size], b"expected");
}

#[test]
fn test_server_binds_every_interface() {
    let server = UdpServer::bind(0).unwrap();
    let local = server.local_addr();
    assert_eq!(local.address, Address::ANY.address);
    assert_ne!(local.port, 0);
}
