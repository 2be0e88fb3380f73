use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sockbridge::{Accepted, Address, TcpClient, TcpConnection, TcpServer, TcpServerConfig};

use crate::handle::{Endpoint, endpoint, input, into_raw, output, release, store_address};
use crate::status::{
    IntoStatus, NO_CONNECTION, SUCCESS, TIMED_OUT, UNKNOWN_HANDLE, guard, sent, shortfall,
};

pub type TcpClientEndpoint = Endpoint<TcpClient>;

/// Listener plus the accepted connections the host refers to by descriptor.
#[derive(Debug, Default)]
pub struct TcpServerEndpoint {
    listener: Endpoint<TcpServer>,
    connections: Mutex<HashMap<i32, Arc<TcpConnection>>>,
}

impl TcpServerEndpoint {
    fn connections(&self) -> MutexGuard<'_, HashMap<i32, Arc<TcpConnection>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self, handle: i32) -> Result<Arc<TcpConnection>, i32> {
        self.connections()
            .get(&handle)
            .cloned()
            .ok_or(UNKNOWN_HANDLE)
    }

    fn track(&self, connection: TcpConnection) -> i32 {
        let handle = connection.descriptor();
        self.connections().insert(handle, Arc::new(connection));
        handle
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn sockbridge_tcp_client_new() -> *mut TcpClientEndpoint {
    into_raw(TcpClientEndpoint::new())
}

/// Connects to `peer`, blocking until the attempt resolves. Returns the
/// connected descriptor.
///
/// # Safety
///
/// `client` must come from [`sockbridge_tcp_client_new`] and not be freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_client_init(
    client: *const TcpClientEndpoint,
    peer: Address,
) -> i32 {
    guard("tcp_client_init", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?;
        let client = client.initialize(|| TcpClient::connect(peer))?;
        Ok(client.descriptor())
    })
}

/// Writes all of `data`. Returns the bytes written, which is less than `len`
/// only if the connection failed part-way.
///
/// # Safety
///
/// `client` as for [`sockbridge_tcp_client_init`]; `data` must be readable
/// for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_client_send(
    client: *const TcpClientEndpoint,
    data: *const u8,
    len: u32,
) -> i32 {
    guard("tcp_client_send", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?.open()?;
        // SAFETY: upheld by the caller.
        let data = unsafe { input(data, len) }?;
        Ok(sent(&client.send(data)))
    })
}

/// Reads exactly `len` bytes. Returns how many were NOT read: 0 on success,
/// positive if the peer closed or the socket failed first.
///
/// # Safety
///
/// `client` as for [`sockbridge_tcp_client_init`]; `buf` must be writable for
/// `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_client_receive(
    client: *const TcpClientEndpoint,
    buf: *mut u8,
    len: u32,
) -> i32 {
    guard("tcp_client_receive", || {
        // SAFETY: upheld by the caller.
        let client = unsafe { endpoint(client) }?.open()?;
        // SAFETY: upheld by the caller.
        let buf = unsafe { output(buf, len) }?;
        Ok(shortfall(&client.receive(buf)))
    })
}

/// Closes the connection identified by `handle`, the descriptor returned from
/// [`sockbridge_tcp_client_init`].
///
/// # Safety
///
/// `client` as for [`sockbridge_tcp_client_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_client_close(
    client: *const TcpClientEndpoint,
    handle: i32,
) -> i32 {
    guard("tcp_client_close", || {
        // SAFETY: upheld by the caller.
        let slot = unsafe { endpoint(client) }?;
        if slot.open()?.descriptor() != handle {
            return Err(UNKNOWN_HANDLE);
        }

        let client = slot.close()?;
        client.connection().shutdown().map_err(IntoStatus::into_status)?;
        Ok(SUCCESS)
    })
}

/// # Safety
///
/// `client` must be null or come from [`sockbridge_tcp_client_new`], and must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_client_free(client: *mut TcpClientEndpoint) {
    guard("tcp_client_free", || {
        // SAFETY: upheld by the caller.
        unsafe { release(client) };
        Ok(SUCCESS)
    });
}

#[unsafe(no_mangle)]
pub extern "C" fn sockbridge_tcp_server_new() -> *mut TcpServerEndpoint {
    into_raw(TcpServerEndpoint::default())
}

/// Starts listening on `port`. `timeout_seconds` bounds each accept and each
/// receive on accepted connections; 0 blocks indefinitely. Returns the
/// listening descriptor.
///
/// # Safety
///
/// `server` must come from [`sockbridge_tcp_server_new`] and not be freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_init(
    server: *const TcpServerEndpoint,
    port: u16,
    timeout_seconds: u16,
) -> i32 {
    guard("tcp_server_init", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?;
        let config = TcpServerConfig::new(port, u64::from(timeout_seconds));
        let listener = server.listener.initialize(|| TcpServer::listen(config))?;
        Ok(listener.descriptor())
    })
}

/// Waits for one connection. Returns its descriptor (> 0) and stores the
/// peer in `out_peer`, `TIMED_OUT` when the timeout expired, or
/// `NO_CONNECTION` on any other accept failure.
///
/// # Safety
///
/// `server` as for [`sockbridge_tcp_server_init`]; `out_peer` must be null or
/// writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_accept(
    server: *const TcpServerEndpoint,
    out_peer: *mut Address,
) -> i32 {
    guard("tcp_server_accept", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?;
        let listener = server.listener.open()?;

        match listener.accept_connection() {
            Ok(Accepted::Connection(connection)) => {
                // SAFETY: upheld by the caller.
                unsafe { store_address(out_peer, connection.peer()) };
                Ok(server.track(connection))
            }
            Ok(Accepted::TimedOut) => Ok(TIMED_OUT),
            Err(e) => {
                log::warn!("accept failed: {}", e);
                Ok(NO_CONNECTION)
            }
        }
    })
}

/// Writes all of `data` to the accepted connection `handle`.
///
/// # Safety
///
/// `server` as for [`sockbridge_tcp_server_init`]; `data` must be readable
/// for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_send(
    server: *const TcpServerEndpoint,
    handle: i32,
    data: *const u8,
    len: u32,
) -> i32 {
    guard("tcp_server_send", || {
        // SAFETY: upheld by the caller.
        let connection = unsafe { endpoint(server) }?.connection(handle)?;
        // SAFETY: upheld by the caller.
        let data = unsafe { input(data, len) }?;
        Ok(sent(&connection.send(data)))
    })
}

/// Reads exactly `len` bytes from the accepted connection `handle`. Returns
/// the shortfall.
///
/// # Safety
///
/// `server` as for [`sockbridge_tcp_server_init`]; `buf` must be writable for
/// `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_receive(
    server: *const TcpServerEndpoint,
    handle: i32,
    buf: *mut u8,
    len: u32,
) -> i32 {
    guard("tcp_server_receive", || {
        // SAFETY: upheld by the caller.
        let connection = unsafe { endpoint(server) }?.connection(handle)?;
        // SAFETY: upheld by the caller.
        let buf = unsafe { output(buf, len) }?;
        Ok(shortfall(&connection.receive(buf)))
    })
}

/// Closes one accepted connection. The listener and other connections are
/// untouched.
///
/// # Safety
///
/// `server` as for [`sockbridge_tcp_server_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_close_client(
    server: *const TcpServerEndpoint,
    handle: i32,
) -> i32 {
    guard("tcp_server_close_client", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?;
        let connection = server.connections().remove(&handle).ok_or(UNKNOWN_HANDLE)?;
        connection.shutdown().map_err(IntoStatus::into_status)?;
        log::debug!("closed accepted connection {}", handle);
        Ok(SUCCESS)
    })
}

/// Closes the listening socket identified by `handle`. Accepted connections
/// stay open.
///
/// # Safety
///
/// `server` as for [`sockbridge_tcp_server_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_close_listener(
    server: *const TcpServerEndpoint,
    handle: i32,
) -> i32 {
    guard("tcp_server_close_listener", || {
        // SAFETY: upheld by the caller.
        let server = unsafe { endpoint(server) }?;
        if server.listener.open()?.descriptor() != handle {
            return Err(UNKNOWN_HANDLE);
        }

        let listener = server.listener.close()?;
        if let Ok(listener) = Arc::try_unwrap(listener) {
            listener.close();
        }
        Ok(SUCCESS)
    })
}

/// Releases the server, its listener and every connection still tracked.
///
/// # Safety
///
/// `server` must be null or come from [`sockbridge_tcp_server_new`], and must
/// not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn sockbridge_tcp_server_free(server: *mut TcpServerEndpoint) {
    guard("tcp_server_free", || {
        // SAFETY: upheld by the caller.
        unsafe { release(server) };
        Ok(SUCCESS)
    });
}
