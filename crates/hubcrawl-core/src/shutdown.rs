//! Graceful stop between checkpoints via an atomic flag.
//!
//! The crawler polls the flag only after a flush or between periods, so
//! stopping never loses buffered rows that a resume could not recover.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

static FLAG: LazyLock<Arc<AtomicBool>> = LazyLock::new(|| Arc::new(AtomicBool::new(false)));

/// Global shutdown flag, set by the SIGTERM/SIGINT handler
pub fn shutdown_flag() -> &'static Arc<AtomicBool> {
    &FLAG
}

pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}

/// First SIGINT/SIGTERM requests a graceful stop; a second one exits with 130.
///
/// The conditional shutdown is registered before the flag setter, so it only
/// fires when the flag was already set by an earlier signal.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register_conditional_shutdown(signal, 130, Arc::clone(shutdown_flag()))?;
        signal_hook::flag::register(signal, Arc::clone(shutdown_flag()))?;
    }
    Ok(())
}
