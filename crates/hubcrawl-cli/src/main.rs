//! hubcrawl - GitHub user profile crawler
//!
//! Enumerates GitHub users by creation time through the GraphQL search API
//! and writes complete profiles to one CSV per period.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hubcrawl_core::Verbosity;

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "hubcrawl")]
#[command(about = "Crawl GitHub user profiles by creation time")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./hubcrawl.toml or ~/.config/hubcrawl/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl the configured periods into CSV files
    Crawl(cmd::crawl::CrawlCmdArgs),
    /// Show the current API rate-limit quota
    Quota,
    /// Show how a period is split into search windows
    Windows(cmd::windows::WindowsArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let progress = Arc::new(hubcrawl_core::ProgressContext::new());

    // Logging:
    //   TTY:     info lines above the spinners; --quiet keeps only warnings
    //   non-TTY: timestamped lines, the only progress indicator
    let multi = progress.is_tty().then(|| progress.multi());
    hubcrawl_core::init_logging(Verbosity::from_flags(cli.quiet, cli.debug), multi);

    if let Err(e) = hubcrawl_core::install_signal_handlers() {
        log::warn!("Signal handlers not installed, Ctrl-C will not stop cleanly: {e}");
    }

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Crawl(args) => cmd::crawl::run(args, &config, &progress),
        Command::Quota => cmd::quota::run(&config).map(|()| ExitCode::SUCCESS),
        Command::Windows(args) => cmd::windows::run(args, &config).map(|()| ExitCode::SUCCESS),
        Command::Config => {
            cmd::print_summary("Setting", &config_rows(&config));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn config_rows(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("API URL", config.github.api_url.clone()),
        (
            "GitHub token",
            if config.github.token.is_some() {
                "configured".to_string()
            } else {
                "not set".to_string()
            },
        ),
        (
            "Periods",
            if config.crawl.periods.is_empty() {
                "(none)".to_string()
            } else {
                config.crawl.periods.join(", ")
            },
        ),
        ("Window", format!("{} min", config.crawl.window_minutes)),
        ("Page size", config.crawl.page_size.to_string()),
        (
            "Saturation threshold",
            config.crawl.saturation_threshold.to_string(),
        ),
        ("Resume", config.crawl.resume.to_string()),
        (
            "Retries",
            format!(
                "{} attempts, {}s backoff",
                config.retry.max_attempts, config.retry.backoff_secs
            ),
        ),
        (
            "Reset margin",
            format!("{}s", config.retry.reset_margin_secs),
        ),
        ("Output directory", config.output.dir.display().to_string()),
    ]
}
