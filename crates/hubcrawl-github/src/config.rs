//! Crawler configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::TimeDelta;

use crate::executor::RetryPolicy;
use crate::period::Period;
use crate::quota::DEFAULT_RESET_MARGIN;

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

/// Default window width; narrow enough for the busiest months seen so far
pub const DEFAULT_WINDOW_MINUTES: u32 = 10;

/// GraphQL `first:` argument upper bound for search
pub const MAX_PAGE_SIZE: usize = 100;

/// GitHub search enumerates at most this many results per query.
/// A window yielding this many records has probably been truncated.
pub const SATURATION_THRESHOLD: usize = 1000;

/// Knobs for crawling the windows of one period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub window: TimeDelta,
    pub page_size: usize,
    pub saturation_threshold: usize,
    pub reset_margin: Duration,
    /// Reopen an existing output file and skip already-flushed days
    pub resume: bool,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            window: TimeDelta::minutes(DEFAULT_WINDOW_MINUTES.into()),
            page_size: MAX_PAGE_SIZE,
            saturation_threshold: SATURATION_THRESHOLD,
            reset_margin: DEFAULT_RESET_MARGIN,
            resume: true,
        }
    }
}

/// Caller-facing arguments (plain struct, no clap/serde derive).
#[derive(Debug, Clone)]
pub struct CrawlArgs {
    pub api_url: String,
    pub token: Option<String>,
    pub periods: Vec<String>,
    pub window_minutes: u32,
    pub page_size: usize,
    pub saturation_threshold: usize,
    pub resume: bool,
    pub max_attempts: u32,
    pub backoff_secs: u64,
    pub reset_margin_secs: u64,
    pub output_dir: PathBuf,
}

/// Validated runtime configuration for a crawl
#[derive(Clone)]
pub struct Config {
    pub api_url: String,
    pub token: String,
    pub periods: Vec<Period>,
    pub settings: CrawlSettings,
    pub retry: RetryPolicy,
    pub output_dir: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("periods", &self.periods)
            .field("settings", &self.settings)
            .field("retry", &self.retry)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// `<output_dir>/githubprofile_<period>.csv`
    pub fn output_path(&self, period: &Period) -> PathBuf {
        output_path(&self.output_dir, period)
    }
}

pub fn output_path(output_dir: &Path, period: &Period) -> PathBuf {
    output_dir.join(format!("githubprofile_{}.csv", period.label()))
}

impl TryFrom<CrawlArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CrawlArgs) -> Result<Self, Self::Error> {
        let token = args
            .token
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
            .context("No GitHub token: set github.token in the config file or GITHUB_TOKEN")?;

        anyhow::ensure!(!args.periods.is_empty(), "No periods to crawl");
        let periods: Vec<Period> = args
            .periods
            .iter()
            .map(|p| Period::parse(p))
            .collect::<Result<_, _>>()?;

        anyhow::ensure!(args.window_minutes >= 1, "window_minutes must be at least 1");
        anyhow::ensure!(
            (1..=MAX_PAGE_SIZE).contains(&args.page_size),
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        );
        anyhow::ensure!(
            args.saturation_threshold >= 1,
            "saturation_threshold must be at least 1"
        );
        anyhow::ensure!(args.max_attempts >= 1, "max_attempts must be at least 1");

        Ok(Self {
            api_url: args.api_url,
            token,
            periods,
            settings: CrawlSettings {
                window: TimeDelta::minutes(args.window_minutes.into()),
                page_size: args.page_size,
                saturation_threshold: args.saturation_threshold,
                reset_margin: Duration::from_secs(args.reset_margin_secs),
                resume: args.resume,
            },
            retry: RetryPolicy {
                max_attempts: args.max_attempts,
                backoff: Duration::from_secs(args.backoff_secs),
            },
            output_dir: args.output_dir,
        })
    }
}
