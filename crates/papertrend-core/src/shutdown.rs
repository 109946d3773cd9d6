//! Cooperative cancellation for long harvests
//!
//! Signal handlers only flip a flag; the harvester polls it between pages
//! and the run records `interrupted` instead of `ok`.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// True once SIGINT/SIGTERM arrived (or `request_shutdown` was called).
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Ask in-flight harvests to stop after their current page.
///
/// Returns whether a shutdown had already been requested.
pub fn request_shutdown() -> bool {
    SHUTDOWN.swap(true, Ordering::Relaxed)
}

/// First SIGINT/SIGTERM: stop harvesting after the current page.
/// Second signal: exit immediately with 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        // SAFETY: AtomicBool::swap and low_level::exit (_exit) are async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, || {
                if request_shutdown() {
                    signal_hook::low_level::exit(130);
                }
            })?;
        }
    }
    Ok(())
}
