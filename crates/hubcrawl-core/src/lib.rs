//! Hubcrawl Core - Shared infrastructure for rate-limited API crawlers
//!
//! Transport, clock, logging, progress and shutdown plumbing that the
//! GitHub crawler and the CLI build on.

pub mod clock;
pub mod logging;
pub mod progress;
pub mod shutdown;
pub mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports for convenience
pub use clock::{Clock, SystemClock};
pub use logging::{IndicatifLogger, Verbosity, init_logging};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown};
pub use transport::{GraphqlHttp, Response, SHARED_RUNTIME, Transport, TransportError};
