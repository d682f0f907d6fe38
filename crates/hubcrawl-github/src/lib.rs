//! Hubcrawl GitHub - time-windowed crawler for GitHub user profiles
//!
//! Splits each calendar period into narrow creation-time windows, pages
//! through the GraphQL user search for every window, and appends complete
//! profiles to one CSV per period, checkpointing at day boundaries.

pub mod config;
pub mod crawler;
pub mod error;
pub mod executor;
pub mod period;
pub mod query;
pub mod quota;
pub mod record;
pub mod runner;
pub mod stats;
pub mod writer;

// Re-exports
pub use config::{Config, CrawlArgs, CrawlSettings};
pub use crawler::{WindowCrawl, WindowCrawler};
pub use error::CrawlError;
pub use executor::{QueryExecutor, RetryPolicy};
pub use period::{Period, SubInterval, SubIntervals, is_day_boundary};
pub use quota::QuotaState;
pub use record::{CSV_HEADER, Record, is_complete};
pub use runner::{crawl_period, run};
pub use stats::PeriodSummary;
pub use writer::{Checkpoint, CheckpointWriter};
