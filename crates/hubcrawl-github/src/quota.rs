//! Quota introspection and waiting out a rate-limit window

use std::time::Duration;

use chrono::{DateTime, Utc};
use hubcrawl_core::{Clock, Transport};

use crate::error::CrawlError;
use crate::executor::QueryExecutor;
use crate::query::{RATE_LIMIT_QUERY, RateLimitData};

/// Added to every reset wait; GitHub's `resetAt` is not exact
pub const DEFAULT_RESET_MARGIN: Duration = Duration::from_secs(60);

/// Point-in-time rate-limit snapshot. Never cached: `remaining` moves on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaState {
    pub limit: u64,
    pub cost: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

/// Time to sleep so that `reset_at` has passed by at least `margin`.
///
/// A reset time already in the past still waits the full margin.
pub fn reset_delay(reset_at: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let until_reset = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
    until_reset + margin
}

impl<T: Transport, C: Clock> QueryExecutor<T, C> {
    /// Fetch the current rate-limit snapshot
    pub fn fetch_quota(&self) -> Result<QuotaState, CrawlError> {
        let envelope = self.execute::<RateLimitData>(RATE_LIMIT_QUERY)?;
        let rate_limit = match envelope.data {
            Some(data) => data.rate_limit,
            None => return Err(CrawlError::QuotaUnavailable(envelope.rejection_reason())),
        };
        Ok(QuotaState {
            limit: rate_limit.limit,
            cost: rate_limit.cost,
            remaining: rate_limit.remaining,
            reset_at: rate_limit.reset_at,
        })
    }

    /// Block until the quota window has reset, plus `margin`.
    pub fn wait_for_reset(&self, margin: Duration) -> Result<QuotaState, CrawlError> {
        let quota = self.fetch_quota()?;
        let delay = reset_delay(quota.reset_at, self.clock().now(), margin);

        let secs = delay.as_secs();
        log::warn!(
            "API rate limit exceeded ({} of {} remaining). Retrying at {} UTC",
            quota.remaining,
            quota.limit,
            quota.reset_at.format("%Y-%m-%d %H:%M:%S")
        );
        log::info!("Sleeping for {} minutes {} seconds", secs / 60, secs % 60);

        self.clock().sleep(delay);
        Ok(quota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RetryPolicy;
    use chrono::{TimeDelta, TimeZone};
    use hubcrawl_core::testing::{ManualClock, ReplayTransport};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 2, 1, 12, 0, 0).unwrap()
    }

    fn rate_limit_body(remaining: u64, reset_at: DateTime<Utc>) -> String {
        format!(
            r#"{{"data":{{"rateLimit":{{"limit":5000,"cost":1,"remaining":{remaining},"resetAt":"{}"}}}}}}"#,
            reset_at.format("%Y-%m-%dT%H:%M:%SZ")
        )
    }

    #[test]
    fn delay_adds_margin() {
        let reset = now() + TimeDelta::minutes(5);
        assert_eq!(
            reset_delay(reset, now(), DEFAULT_RESET_MARGIN),
            Duration::from_secs(360)
        );
    }

    #[test]
    fn delay_never_negative() {
        let reset = now() - TimeDelta::minutes(5);
        assert_eq!(
            reset_delay(reset, now(), DEFAULT_RESET_MARGIN),
            DEFAULT_RESET_MARGIN
        );
    }

    #[test]
    fn wait_sleeps_until_reset_plus_margin() {
        let transport =
            ReplayTransport::new().respond(200, rate_limit_body(0, now() + TimeDelta::minutes(5)));
        let clock = ManualClock::new(now());
        let executor = QueryExecutor::new(&transport, &clock, RetryPolicy::default());

        let quota = executor.wait_for_reset(DEFAULT_RESET_MARGIN).unwrap();
        assert_eq!(quota.remaining, 0);
        assert!(clock.total_slept() >= Duration::from_secs(360));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(360)]);
        assert_eq!(transport.sent(), vec![RATE_LIMIT_QUERY.to_string()]);
    }

    #[test]
    fn fetch_quota_reports_snapshot() {
        let reset = now() + TimeDelta::hours(1);
        let transport = ReplayTransport::new().respond(200, rate_limit_body(4321, reset));
        let executor = QueryExecutor::new(&transport, ManualClock::new(now()), RetryPolicy::default());

        let quota = executor.fetch_quota().unwrap();
        assert_eq!(
            quota,
            QuotaState {
                limit: 5000,
                cost: 1,
                remaining: 4321,
                reset_at: reset,
            }
        );
    }

    #[test]
    fn introspection_without_data_fails() {
        let transport =
            ReplayTransport::new().respond(200, r#"{"message":"Bad credentials"}"#);
        let executor = QueryExecutor::new(&transport, ManualClock::new(now()), RetryPolicy::default());

        match executor.wait_for_reset(DEFAULT_RESET_MARGIN) {
            Err(CrawlError::QuotaUnavailable(msg)) => assert_eq!(msg, "Bad credentials"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
