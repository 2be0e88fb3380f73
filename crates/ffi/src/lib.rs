//! Flat C-callable surface over the `sockbridge` endpoints.
//!
//! Every endpoint kind gets `*_new`, `*_init`, I/O, `*_close` and `*_free`
//! functions taking an opaque pointer. All results are `i32` status codes;
//! see [`status`] for their meaning.

pub mod handle;
pub mod status;
pub mod tcp;
pub mod udp;

pub use sockbridge::Address;
pub use tcp::*;
pub use udp::*;

/// Installs an `env_logger` logger filtered by `RUST_LOG` (default `info`).
/// Returns 0, or 1 if a logger was already installed.
#[unsafe(no_mangle)]
pub extern "C" fn sockbridge_init_logging() -> i32 {
    status::guard("init_logging", || {
        let installed =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .try_init()
                .is_ok();
        Ok(if installed { status::SUCCESS } else { 1 })
    })
}
