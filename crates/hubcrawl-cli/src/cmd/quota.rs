//! Quota subcommand - print the current rate-limit snapshot

use anyhow::{Context, Result};
use chrono::Utc;
use hubcrawl_core::{GraphqlHttp, SystemClock};
use hubcrawl_github::{QueryExecutor, RetryPolicy};

use crate::config::Config;

pub fn run(config: &Config) -> Result<()> {
    let token = config
        .github
        .token
        .clone()
        .filter(|t| !t.is_empty())
        .context("No GitHub token: set github.token in the config file or GITHUB_TOKEN")?;

    let transport = GraphqlHttp::new(&config.github.api_url, token)?;
    let policy = RetryPolicy {
        max_attempts: config.retry.max_attempts,
        backoff: std::time::Duration::from_secs(config.retry.backoff_secs),
    };
    let executor = QueryExecutor::new(transport, SystemClock, policy);
    let quota = executor
        .fetch_quota()
        .context("Failed to query rate limit")?;

    let until_reset = (quota.reset_at - Utc::now()).num_seconds().max(0);
    super::print_summary(
        "Rate limit",
        &[
            ("Limit", quota.limit.to_string()),
            ("Remaining", quota.remaining.to_string()),
            ("Query cost", quota.cost.to_string()),
            (
                "Resets at",
                format!(
                    "{} UTC (in {}m {}s)",
                    quota.reset_at.format("%Y-%m-%d %H:%M:%S"),
                    until_reset / 60,
                    until_reset % 60
                ),
            ),
        ],
    );
    Ok(())
}
