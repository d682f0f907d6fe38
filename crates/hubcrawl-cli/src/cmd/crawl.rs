//! Crawl subcommand - fetch profiles for one or more periods

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use hubcrawl_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct CrawlCmdArgs {
    /// Periods to crawl, YYYY-MM or YYYY-MM-DD (comma-separated, overrides config)
    #[arg(short, long, value_delimiter = ',')]
    pub period: Vec<String>,

    /// Window width in minutes
    #[arg(short, long)]
    pub window_minutes: Option<u32>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Ignore existing checkpoints and start every period from scratch
    #[arg(long)]
    pub fresh: bool,
}

pub fn run(args: CrawlCmdArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let mut crawl_args = config.to_crawl_args();
    if !args.period.is_empty() {
        crawl_args.periods = args.period;
    }
    if let Some(minutes) = args.window_minutes {
        crawl_args.window_minutes = minutes;
    }
    if let Some(output) = args.output {
        crawl_args.output_dir = output;
    }
    if args.fresh {
        crawl_args.resume = false;
    }

    let crawl_config = hubcrawl_github::Config::try_from(crawl_args)?;
    log::debug!("{crawl_config:?}");

    hubcrawl_github::run(&crawl_config, progress.clone())
}
