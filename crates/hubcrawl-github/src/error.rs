//! Error type for the profile crawl.
//!
//! Everything recoverable (overload retries, quota waits) is absorbed inside
//! the executor and crawler; any `CrawlError` that escapes is fatal for the
//! period being crawled.

use hubcrawl_core::TransportError;

use crate::period::SubInterval;

/// Longest response body kept in error messages
const BODY_PREVIEW: usize = 512;

#[derive(Debug)]
pub enum CrawlError {
    /// Every attempt failed; carries the last status (if any) and body
    TransportExhausted {
        attempts: u32,
        status: Option<u16>,
        body: String,
    },
    /// Transport failure that retrying cannot fix
    Transport(TransportError),
    /// Still rejected after waiting for the quota reset
    QuotaExhausted { window: SubInterval },
    /// The rate-limit introspection query returned no data
    QuotaUnavailable(String),
    /// Window returned as many records as the API can enumerate; it is too wide
    WindowSaturated {
        window: SubInterval,
        count: usize,
        threshold: usize,
    },
    InvalidPeriod(String),
    Decode(String),
    Checkpoint(String),
    Io(std::io::Error),
    Csv(csv::Error),
}

fn preview(body: &str) -> &str {
    match body.char_indices().nth(BODY_PREVIEW) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

impl std::fmt::Display for CrawlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransportExhausted {
                attempts,
                status: Some(status),
                body,
            } => write!(
                f,
                "query failed after {attempts} attempts: HTTP {status}: {}",
                preview(body)
            ),
            Self::TransportExhausted {
                attempts,
                status: None,
                body,
            } => write!(f, "query failed after {attempts} attempts: {}", preview(body)),
            Self::Transport(e) => write!(f, "{e}"),
            Self::QuotaExhausted { window } => {
                write!(f, "quota still exhausted after reset wait ({window})")
            }
            Self::QuotaUnavailable(msg) => write!(f, "cannot read rate limit: {msg}"),
            Self::WindowSaturated {
                window,
                count,
                threshold,
            } => write!(
                f,
                "window {window} returned {count} records (limit {threshold}); \
                 narrow the window width"
            ),
            Self::InvalidPeriod(msg) => write!(f, "invalid period: {msg}"),
            Self::Decode(msg) => write!(f, "unexpected response: {msg}"),
            Self::Checkpoint(msg) => write!(f, "checkpoint: {msg}"),
            Self::Io(e) => write!(f, "IO: {e}"),
            Self::Csv(e) => write!(f, "CSV: {e}"),
        }
    }
}

impl std::error::Error for CrawlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CrawlError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for CrawlError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl CrawlError {
    /// Saturation means the window width is wrong for the data, not that the API misbehaved
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, Self::WindowSaturated { .. } | Self::InvalidPeriod(_))
    }
}
