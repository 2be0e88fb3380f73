use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sockbridge::{Address, TransportError};

use crate::status::{
    ALREADY_INITIALIZED, CLOSED, INVALID_ARGUMENT, IntoStatus, NOT_INITIALIZED,
};

#[derive(Debug)]
enum Lifecycle<T> {
    Uninitialized,
    Open(Arc<T>),
    Closed,
}

/// Lifecycle wrapper behind every opaque endpoint pointer.
///
/// The lock is only held to read or swap the state. Operations run on a
/// cloned `Arc`, so a close during a blocking call takes effect for later
/// calls and the descriptor is released when the in-flight call returns.
#[derive(Debug)]
pub struct Endpoint<T> {
    state: Mutex<Lifecycle<T>>,
}

impl<T> Default for Endpoint<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Endpoint<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Lifecycle::Uninitialized),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn initialize<F>(&self, init: F) -> Result<Arc<T>, i32>
    where
        F: FnOnce() -> Result<T, TransportError>,
    {
        let mut state = self.lock();
        match *state {
            Lifecycle::Uninitialized => {}
            Lifecycle::Open(_) => return Err(ALREADY_INITIALIZED),
            Lifecycle::Closed => return Err(CLOSED),
        }

        let inner = Arc::new(init().map_err(|e| {
            log::warn!("endpoint setup failed: {}", e);
            e.into_status()
        })?);
        *state = Lifecycle::Open(Arc::clone(&inner));
        Ok(inner)
    }

    pub fn open(&self) -> Result<Arc<T>, i32> {
        match &*self.lock() {
            Lifecycle::Open(inner) => Ok(Arc::clone(inner)),
            Lifecycle::Uninitialized => Err(NOT_INITIALIZED),
            Lifecycle::Closed => Err(CLOSED),
        }
    }

    /// Moves the endpoint to closed and hands back the last owned reference.
    pub fn close(&self) -> Result<Arc<T>, i32> {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, Lifecycle::Closed) {
            Lifecycle::Open(inner) => Ok(inner),
            Lifecycle::Uninitialized => {
                *state = Lifecycle::Uninitialized;
                Err(NOT_INITIALIZED)
            }
            Lifecycle::Closed => Err(CLOSED),
        }
    }
}

/// Borrows the endpoint behind an opaque pointer.
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by the matching `*_new` function
/// that has not been passed to `*_free`.
pub unsafe fn endpoint<'a, T>(ptr: *const T) -> Result<&'a T, i32> {
    // SAFETY: upheld by the caller.
    unsafe { ptr.as_ref() }.ok_or(INVALID_ARGUMENT)
}

/// # Safety
///
/// When `len` is non-zero, `data` must be valid for reads of `len` bytes.
pub unsafe fn input<'a>(data: *const u8, len: u32) -> Result<&'a [u8], i32> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() || i32::try_from(len).is_err() {
        return Err(INVALID_ARGUMENT);
    }
    // SAFETY: non-null and valid for `len` bytes per the caller contract.
    Ok(unsafe { std::slice::from_raw_parts(data, len as usize) })
}

/// # Safety
///
/// When `len` is non-zero, `buf` must be valid for writes of `len` bytes and
/// not aliased for the duration of the call.
pub unsafe fn output<'a>(buf: *mut u8, len: u32) -> Result<&'a mut [u8], i32> {
    if len == 0 {
        return Ok(&mut []);
    }
    if buf.is_null() || i32::try_from(len).is_err() {
        return Err(INVALID_ARGUMENT);
    }
    // SAFETY: non-null and valid for `len` bytes per the caller contract.
    Ok(unsafe { std::slice::from_raw_parts_mut(buf, len as usize) })
}

/// Writes `addr` through `out` unless the caller passed null.
///
/// # Safety
///
/// `out` must be null or valid for a write of one [`Address`].
pub unsafe fn store_address(out: *mut Address, addr: Address) {
    if !out.is_null() {
        // SAFETY: non-null and writable per the caller contract.
        unsafe { out.write(addr) };
    }
}

pub fn into_raw<T>(value: T) -> *mut T {
    Box::into_raw(Box::new(value))
}

/// # Safety
///
/// `ptr` must be null or a pointer produced by [`into_raw`] that has not been
/// released yet.
pub unsafe fn release<T>(ptr: *mut T) {
    if !ptr.is_null() {
        // SAFETY: created by Box::into_raw and released exactly once.
        drop(unsafe { Box::from_raw(ptr) });
    }
}
