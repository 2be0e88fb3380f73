//! Integer status codes returned across the C boundary.
//!
//! Non-negative values carry a result (a length, a shortfall, a descriptor).
//! Negative values are either `-errno` or one of the sentinels below -999,
//! which never collide with an errno value.

use std::io;
use std::panic::{self, AssertUnwindSafe};

use sockbridge::{Readiness, Transfer, TransportError};

pub const SUCCESS: i32 = 0;

pub const NO_DATA: i32 = 0;
pub const DATA_WAITING: i32 = 1;

pub const NO_CONNECTION: i32 = 0;
pub const TIMED_OUT: i32 = -libc::EAGAIN;

pub const INVALID_ARGUMENT: i32 = -libc::EINVAL;
pub const NOT_INITIALIZED: i32 = -libc::ENOTCONN;
pub const ALREADY_INITIALIZED: i32 = -libc::EISCONN;
pub const CLOSED: i32 = -libc::EBADF;
pub const UNKNOWN_HANDLE: i32 = -libc::EBADF;

pub const FAILURE: i32 = -1000;
pub const PANICKED: i32 = -1001;
pub const SOCKET_FAILED: i32 = -1002;
pub const REUSE_ADDRESS_FAILED: i32 = -1003;
pub const REUSE_PORT_FAILED: i32 = -1004;
pub const UNSUPPORTED_ADDRESS: i32 = -1005;

pub trait IntoStatus {
    fn into_status(self) -> i32;
}

impl IntoStatus for &io::Error {
    fn into_status(self) -> i32 {
        self.raw_os_error().map(|code| -code).unwrap_or(FAILURE)
    }
}

impl IntoStatus for TransportError {
    fn into_status(self) -> i32 {
        match &self {
            TransportError::Socket(_) => SOCKET_FAILED,
            TransportError::ReuseAddress(_) => REUSE_ADDRESS_FAILED,
            TransportError::ReusePort(_) => REUSE_PORT_FAILED,
            TransportError::UnsupportedAddress => UNSUPPORTED_ADDRESS,
            TransportError::Bind(e)
            | TransportError::Connect(e)
            | TransportError::Listen(e)
            | TransportError::Io(e) => e.into_status(),
        }
    }
}

impl IntoStatus for Readiness {
    fn into_status(self) -> i32 {
        match self {
            Readiness::DataWaiting => DATA_WAITING,
            Readiness::NoData => NO_DATA,
        }
    }
}

/// Clamps a length already bounded by the caller's `u32` argument checks.
pub fn length(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Status for a full-length send: the bytes written, or the error code when
/// nothing went out at all.
pub fn sent(transfer: &Transfer) -> i32 {
    if transfer.transferred == 0 && !transfer.is_complete() {
        if let Some(e) = transfer.error() {
            return e.into_status();
        }
        return TIMED_OUT;
    }
    length(transfer.transferred)
}

/// Status for a full-length receive: always the shortfall.
pub fn shortfall(transfer: &Transfer) -> i32 {
    if let Some(interruption) = &transfer.interruption {
        log::debug!(
            "receive stopped {} bytes short: {:?}",
            transfer.shortfall(),
            interruption
        );
    }
    length(transfer.shortfall())
}

/// Runs one exported call, turning a panic into [`PANICKED`] so unwinding
/// never reaches the foreign caller.
pub fn guard<F>(name: &str, call: F) -> i32
where
    F: FnOnce() -> Result<i32, i32>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(status)) | Ok(Err(status)) => status,
        Err(_) => {
            log::error!("{} panicked", name);
            PANICKED
        }
    }
}
