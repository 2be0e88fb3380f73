use std::sync::Arc;

use sockbridge::{Address, UdpClient, UdpServer};

use crate::handle::{Endpoint, endpoint, input, into_raw, output, release, store_address};
use crate::status::{IntoStatus, NO_DATA, SUCCESS, guard, length};

pub type UdpClientEndpoint = Endpoint<UdpClient>;
pub type UdpServerEndpoint = Endpoint<UdpServer>;

#[unsafe(no_mangle)]
pub extern "C" fn sockbridge_udp_client_new() -> *mut UdpClientEndpoint {
    into_raw(UdpClientEndpoint::new())
}

/// Opens the socket and fixes `peer` as its only destination. Returns 0.
///
/// # Safety
///
/// `client` must come from [`sockbridge_udp_client_new`] and not be freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_init(
    client: *const UdpClientEndpoint,
    peer: Address,
) -> i32 {
    guard("udp_client_init", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?;
        client.initialize(|| UdpClient::connect(peer))?;
        Ok(SUCCESS)
    })
}

/// Sends one datagram to the connected peer. Returns the bytes written.
///
/// # Safety
///
/// `client` as for [`sockbridge_udp_client_init`]; `data` must be readable
/// for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_send(
    client: *const UdpClientEndpoint,
    data: *const u8,
    len: u32,
) -> i32 {
    guard("udp_client_send", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?.open()?;
        // SAFETY: upheld by the caller.
        let data = unsafe { input(data, len) }?;
        client
            .send(data)
            .map(length)
            .map_err(IntoStatus::into_status)
    })
}

/// Blocks for one datagram. Returns its length, truncated to `capacity`.
///
/// # Safety
///
/// `client` as for [`sockbridge_udp_client_init`]; `buf` must be writable for
/// `capacity` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_receive(
    client: *const UdpClientEndpoint,
    buf: *mut u8,
    capacity: u32,
) -> i32 {
    guard("udp_client_receive", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?.open()?;
        // SAFETY: upheld by the caller.
        let buf = unsafe { output(buf, capacity) }?;
        client
            .receive(buf)
            .map(length)
            .map_err(IntoStatus::into_status)
    })
}

/// Returns `DATA_WAITING` or `NO_DATA` without blocking. An endpoint that is
/// not open never has data.
///
/// # Safety
///
/// `client` as for [`sockbridge_udp_client_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_poll(client: *const UdpClientEndpoint) -> i32 {
    guard("udp_client_poll", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }.and_then(Endpoint::open);
        Ok(client.map_or(NO_DATA, |client| client.poll_ready().into_status()))
    })
}

/// # Safety
///
/// `client` as for [`sockbridge_udp_client_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_close(client: *const UdpClientEndpoint) -> i32 {
    guard("udp_client_close", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?.close()?;
        if let Ok(client) = Arc::try_unwrap(client) {
            client.close();
        }
        Ok(SUCCESS)
    })
}

/// Releases the endpoint, closing its socket if still open.
///
/// # Safety
///
/// `client` must be null or come from [`sockbridge_udp_client_new`], and must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_client_free(client: *mut UdpClientEndpoint) {
    guard("udp_client_free", || {
        // SAFETY: upheld by the caller.
        unsafe { release(client) };
        Ok(SUCCESS)
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn sockbridge_udp_server_new() -> *mut UdpServerEndpoint {
    into_raw(UdpServerEndpoint::new())
}

/// Binds `port` on every local interface. Returns 0.
///
/// # Safety
///
/// `server` must come from [`sockbridge_udp_server_new`] and not be freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_init(
    server: *const UdpServerEndpoint,
    port: u16,
) -> i32 {
    guard("udp_server_init", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?;
        server.initialize(|| UdpServer::bind(port))?;
        Ok(SUCCESS)
    })
}

/// Sends one datagram to `peer`. Returns the bytes written.
///
/// # Safety
///
/// `server` as for [`sockbridge_udp_server_init`]; `data` must be readable
/// for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_send_to(
    server: *const UdpServerEndpoint,
    peer: Address,
    data: *const u8,
    len: u32,
) -> i32 {
    guard("udp_server_send_to", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?.open()?;
        // SAFETY: upheld by the caller.
        let data = unsafe { input(data, len) }?;
        server
            .send_to(peer, data)
            .map(length)
            .map_err(IntoStatus::into_status)
    })
}

/// Blocks for one datagram, storing the sender in `out_peer`. Returns the
/// datagram length, truncated to `capacity`.
///
/// # Safety
///
/// `server` as for [`sockbridge_udp_server_init`]; `buf` must be writable for
/// `capacity` bytes; `out_peer` must be null or writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_receive_from(
    server: *const UdpServerEndpoint,
    buf: *mut u8,
    capacity: u32,
    out_peer: *mut Address,
) -> i32 {
    guard("udp_server_receive_from", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?.open()?;
        // SAFETY: upheld by the caller.
        let buf = unsafe { output(buf, capacity) }?;
        let (size, from) = server.receive_from(buf).map_err(IntoStatus::into_status)?;
        // SAFETY: upheld by the caller.
        unsafe { store_address(out_peer, from) };
        Ok(length(size))
    })
}

/// # Safety
///
/// `server` as for [`sockbridge_udp_server_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_poll(server: *const UdpServerEndpoint) -> i32 {
    guard("udp_server_poll", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }.and_then(Endpoint::open);
        Ok(server.map_or(NO_DATA, |server| server.poll_ready().into_status()))
    })
}

/// # Safety
///
/// `server` as for [`sockbridge_udp_server_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_close(server: *const UdpServerEndpoint) -> i32 {
    guard("udp_server_close", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?.close()?;
        if let Ok(server) = Arc::try_unwrap(server) {
            server.close();
        }
        Ok(SUCCESS)
    })
}

/// # Safety
///
/// `server` must be null or come from [`sockbridge_udp_server_new`], and must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_udp_server_free(server: *mut UdpServerEndpoint) {
    guard("udp_server_free", || {
        // SAFETY: upheld by the caller.
        unsafe { release(server) };
        Ok(SUCCESS)
    });
}
