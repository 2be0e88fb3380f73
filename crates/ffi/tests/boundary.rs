use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use sockbridge_ffi::status::{
    ALREADY_INITIALIZED, CLOSED, DATA_WAITING, INVALID_ARGUMENT, NO_DATA, NOT_INITIALIZED,
    SUCCESS, TIMED_OUT, UNKNOWN_HANDLE,
};
use sockbridge_ffi::*;

fn wait_for(poll: impl Fn() -> i32, timeout_ms: u64) -> bool {
    let start = Instant::now();
    while start.elapsed() < Duration::from_millis(timeout_ms) {
        if poll() == DATA_WAITING {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    false
}

fn bound_port(fd: i32) -> u16 {
    use std::mem::ManuallyDrop;
    use std::net::TcpListener;
    use std::os::fd::FromRawFd;

    // SAFETY: `fd` is a live listening socket owned elsewhere; ManuallyDrop
    // keeps this temporary view from closing it.
    let view = ManuallyDrop::new(unsafe { TcpListener::from_raw_fd(fd) });
    view.local_addr().unwrap().port()
}

#[test]
fn test_logging_init_is_repeatable() {
    let first = sockbridge_init_logging();
    assert!(first == SUCCESS || first == 1);
    assert_eq!(sockbridge_init_logging(), 1);
}

#[test]
fn test_null_handles_are_rejected() {
    unsafe {
        assert_eq!(
            sockbridge_udp_client_init(ptr::null(), Address::LOOPBACK),
            INVALID_ARGUMENT
        );
        assert_eq!(sockbridge_udp_server_poll(ptr::null()), NO_DATA);
        assert_eq!(
            sockbridge_tcp_server_accept(ptr::null(), ptr::null_mut()),
            INVALID_ARGUMENT
        );
        sockbridge_udp_client_free(ptr::null_mut());
    }
}

#[test]
fn test_udp_lifecycle_codes() {
    let server = sockbridge_udp_server_new();
    let mut buf = [0u8; 16];

    unsafe {
        assert_eq!(
            sockbridge_udp_server_send_to(server, Address::LOOPBACK.with_port(9), buf.as_ptr(), 4),
            NOT_INITIALIZED
        );
        assert_eq!(sockbridge_udp_server_poll(server), NO_DATA);
        assert_eq!(sockbridge_udp_server_close(server), NOT_INITIALIZED);

        assert_eq!(sockbridge_udp_server_init(server, 0), SUCCESS);
        assert_eq!(sockbridge_udp_server_init(server, 0), ALREADY_INITIALIZED);

        assert_eq!(sockbridge_udp_server_close(server), SUCCESS);
        assert_eq!(sockbridge_udp_server_close(server), CLOSED);
        assert_eq!(
            sockbridge_udp_server_receive_from(
                server,
                buf.as_mut_ptr(),
                buf.len() as u32,
                ptr::null_mut()
            ),
            CLOSED
        );
        assert_eq!(sockbridge_udp_server_init(server, 0), CLOSED);

        sockbridge_udp_server_free(server);
    }
}

#[test]
fn test_udp_round_trip_through_boundary() {
    // The boundary does not expose the bound port, so pick one through the
    // core type and hand it to the boundary server.
    let port = sockbridge::UdpServer::bind(0).unwrap().local_addr().port;

    let server = sockbridge_udp_server_new();
    let client = sockbridge_udp_client_new();

    unsafe {
        assert_eq!(sockbridge_udp_server_init(server, port), SUCCESS);
        assert_eq!(
            sockbridge_udp_client_init(client, Address::LOOPBACK.with_port(port)),
            SUCCESS
        );

        assert_eq!(sockbridge_udp_server_poll(server), NO_DATA);

        let payload = b"hello over udp";
        assert_eq!(
            sockbridge_udp_client_send(client, payload.as_ptr(), payload.len() as u32),
            payload.len() as i32
        );
        assert!(wait_for(|| sockbridge_udp_server_poll(server), 500));

        let mut buf = [0u8; 64];
        let mut from = Address::default();
        let size =
            sockbridge_udp_server_receive_from(server, buf.as_mut_ptr(), buf.len() as u32, &mut from);
        assert_eq!(size, payload.len() as i32);
        assert_eq!(&buf[..size as usize], payload);
        assert_eq!(from.address, Address::LOOPBACK.address);
        assert_ne!(from.port, 0);
        assert_eq!(sockbridge_udp_server_poll(server), NO_DATA);

        let reply = b"ack";
        assert_eq!(
            sockbridge_udp_server_send_to(server, from, reply.as_ptr(), reply.len() as u32),
            3
        );
        assert!(wait_for(|| sockbridge_udp_client_poll(client), 500));
        assert_eq!(
            sockbridge_udp_client_receive(client, buf.as_mut_ptr(), buf.len() as u32),
            3
        );
        assert_eq!(&buf[..3], reply);

        assert_eq!(
            sockbridge_udp_client_send(client, ptr::null(), 5),
            INVALID_ARGUMENT
        );

        assert_eq!(sockbridge_udp_client_close(client), SUCCESS);
        assert_eq!(sockbridge_udp_client_poll(client), NO_DATA);
        sockbridge_udp_client_free(client);
        sockbridge_udp_server_free(server);
    }
}

#[test]
fn test_tcp_accept_timeout_sentinel() {
    let server = sockbridge_tcp_server_new();

    unsafe {
        let listener = sockbridge_tcp_server_init(server, 0, 1);
        assert!(listener > 0);

        let start = Instant::now();
        let mut peer = Address::default();
        assert_eq!(sockbridge_tcp_server_accept(server, &mut peer), TIMED_OUT);
        assert!(start.elapsed() < Duration::from_secs(3));
        assert_eq!(peer, Address::default());

        assert_eq!(
            sockbridge_tcp_server_close_listener(server, listener + 1000),
            UNKNOWN_HANDLE
        );
        assert_eq!(sockbridge_tcp_server_close_listener(server, listener), SUCCESS);
        assert_eq!(sockbridge_tcp_server_accept(server, &mut peer), CLOSED);

        sockbridge_tcp_server_free(server);
    }
}

#[test]
fn test_tcp_exchange_and_independent_closes() {
    let server = sockbridge_tcp_server_new();
    let first = sockbridge_tcp_client_new();
    let second = sockbridge_tcp_client_new();

    unsafe {
        let listener = sockbridge_tcp_server_init(server, 0, 5);
        assert!(listener > 0);
        let target = Address::LOOPBACK.with_port(bound_port(listener));

        let first_fd = sockbridge_tcp_client_init(first, target);
        assert!(first_fd > 0);
        let mut first_peer = Address::default();
        let first_conn = sockbridge_tcp_server_accept(server, &mut first_peer);
        assert!(first_conn > 0);
        assert_ne!(first_conn, listener);
        assert_eq!(first_peer.address, Address::LOOPBACK.address);

        let second_fd = sockbridge_tcp_client_init(second, target);
        assert!(second_fd > 0);
        let second_conn = sockbridge_tcp_server_accept(server, ptr::null_mut());
        assert!(second_conn > 0);
        assert_ne!(second_conn, first_conn);

        let message = b"0123456789abcdef";
        assert_eq!(
            sockbridge_tcp_client_send(first, message.as_ptr(), message.len() as u32),
            message.len() as i32
        );
        let mut buf = [0u8; 16];
        assert_eq!(
            sockbridge_tcp_server_receive(server, first_conn, buf.as_mut_ptr(), 16),
            0
        );
        assert_eq!(&buf, message);

        assert_eq!(sockbridge_tcp_server_close_client(server, first_conn), SUCCESS);
        assert_eq!(
            sockbridge_tcp_server_close_client(server, first_conn),
            UNKNOWN_HANDLE
        );
        assert_eq!(
            sockbridge_tcp_server_receive(server, first_conn, buf.as_mut_ptr(), 16),
            UNKNOWN_HANDLE
        );

        // The first client sees the close as a full shortfall.
        assert_eq!(sockbridge_tcp_client_receive(first, buf.as_mut_ptr(), 4), 4);

        assert_eq!(
            sockbridge_tcp_server_send(server, second_conn, message.as_ptr(), 8),
            8
        );
        assert_eq!(sockbridge_tcp_client_receive(second, buf.as_mut_ptr(), 8), 0);
        assert_eq!(&buf[..8], &message[..8]);

        // Partial delivery followed by a close reports the remainder.
        assert_eq!(sockbridge_tcp_client_send(second, message.as_ptr(), 6), 6);
        assert_eq!(sockbridge_tcp_client_close(second, second_fd + 1000), UNKNOWN_HANDLE);
        assert_eq!(sockbridge_tcp_client_close(second, second_fd), SUCCESS);
        assert_eq!(
            sockbridge_tcp_server_receive(server, second_conn, buf.as_mut_ptr(), 16),
            10
        );
        assert_eq!(sockbridge_tcp_client_send(second, message.as_ptr(), 6), CLOSED);

        // The listener still accepts after both connections are gone.
        let third = sockbridge_tcp_client_new();
        assert!(sockbridge_tcp_client_init(third, target) > 0);
        assert!(sockbridge_tcp_server_accept(server, ptr::null_mut()) > 0);

        sockbridge_tcp_client_free(third);
        sockbridge_tcp_client_free(second);
        sockbridge_tcp_client_free(first);
        sockbridge_tcp_server_free(server);
    }
}

#[test]
fn test_tcp_connect_refused_code() {
    let port = {
        let probe = sockbridge::TcpServer::listen(sockbridge::TcpServerConfig::new(0, 1)).unwrap();
        probe.local_addr().port
    };

    let client = sockbridge_tcp_client_new();
    unsafe {
        assert_eq!(
            sockbridge_tcp_client_init(client, Address::LOOPBACK.with_port(port)),
            -libc::ECONNREFUSED
        );
        assert_eq!(
            sockbridge_tcp_client_receive(client, ptr::null_mut(), 0),
            NOT_INITIALIZED
        );
        sockbridge_tcp_client_free(client);
    }
}
