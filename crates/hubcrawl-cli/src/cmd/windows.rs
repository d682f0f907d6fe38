//! Windows subcommand - preview the partition of a period

use anyhow::Result;
use chrono::TimeDelta;
use clap::Args;
use hubcrawl_github::{Period, is_day_boundary};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// Period to partition, YYYY-MM or YYYY-MM-DD
    pub period: Period,

    /// Window width in minutes (default from config)
    #[arg(short, long)]
    pub window_minutes: Option<u32>,

    /// List every window instead of a summary
    #[arg(long)]
    pub list: bool,
}

pub fn run(args: WindowsArgs, config: &Config) -> Result<()> {
    let minutes = args.window_minutes.unwrap_or(config.crawl.window_minutes);
    anyhow::ensure!(minutes >= 1, "window_minutes must be at least 1");
    let width = TimeDelta::minutes(minutes.into());

    let windows: Vec<_> = args.period.sub_intervals(width).collect();
    let flushes = windows
        .iter()
        .enumerate()
        .filter(|(i, w)| is_day_boundary(w, windows.get(i + 1)))
        .count();

    if args.list {
        for window in &windows {
            println!("{}", window.created_qualifier());
        }
        return Ok(());
    }

    let first = windows.first().map(|w| w.to_string()).unwrap_or_default();
    let last = windows.last().map(|w| w.to_string()).unwrap_or_default();
    super::print_summary(
        &format!("Period {}", args.period),
        &[
            ("Range", format!("{} .. {}", args.period.start(), args.period.end())),
            ("Window", format!("{minutes} min")),
            ("Windows", windows.len().to_string()),
            ("Day flushes", flushes.to_string()),
            ("First", first),
            ("Last", last),
        ],
    );
    Ok(())
}
