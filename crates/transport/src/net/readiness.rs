use std::io;
use std::os::fd::{AsFd, AsRawFd};

/// Result of a zero-timeout readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NoData,
    DataWaiting,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Readiness::DataWaiting
    }
}

/// Checks whether `fd` has inbound data without blocking.
///
/// A failed `poll(2)` is logged and reported as [`Readiness::NoData`]; the
/// following receive call surfaces the underlying error.
pub fn poll_readable<F: AsFd>(fd: &F) -> Readiness {
    match poll_once(fd) {
        Ok(true) => Readiness::DataWaiting,
        Ok(false) => Readiness::NoData,
        Err(e) => {
            log::warn!("readiness poll failed: {}", e);
            Readiness::NoData
        }
    }
}

fn poll_once<F: AsFd>(fd: &F) -> io::Result<bool> {
    let mut pollfd = libc::pollfd {
        fd: fd.as_fd().as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `pollfd` is a single valid entry and the descriptor is kept
        // alive by the borrow of `fd` for the duration of the call.
        let result = unsafe { libc::poll(&mut pollfd, 1, 0) };
        if result >= 0 {
            return Ok(pollfd.revents & libc::POLLIN != 0);
        }

        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
