//! Single-query executor with fixed-interval retry on gateway overload

use std::cell::Cell;
use std::time::Duration;

use hubcrawl_core::{Clock, Transport};
use serde::de::DeserializeOwned;

use crate::error::CrawlError;
use crate::query::Envelope;

/// GitHub answers 502 when a search times out on its side
const OVERLOAD_STATUS: u16 = 502;

/// Attempt budget and wait between overload retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(30),
        }
    }
}

/// Sends one query at a time through a [`Transport`], absorbing transient failures.
///
/// - 200: body parsed and returned
/// - 502 or a connection failure: sleep `backoff`, retry
/// - any other status: retry immediately
///
/// Each try consumes one of `max_attempts`; when they run out the last
/// status and body are surfaced as [`CrawlError::TransportExhausted`].
pub struct QueryExecutor<T, C> {
    transport: T,
    clock: C,
    policy: RetryPolicy,
    retries: Cell<usize>,
}

impl<T, C> std::fmt::Debug for QueryExecutor<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("policy", &self.policy)
            .field("retries", &self.retries.get())
            .finish_non_exhaustive()
    }
}

impl<T: Transport, C: Clock> QueryExecutor<T, C> {
    pub fn new(transport: T, clock: C, policy: RetryPolicy) -> Self {
        Self {
            transport,
            clock,
            policy,
            retries: Cell::new(0),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Retries performed since construction
    pub fn retries(&self) -> usize {
        self.retries.get()
    }

    /// Run `query` and decode the JSON envelope.
    ///
    /// An envelope without `data` is still returned as `Ok`; deciding what a
    /// rejection means is the caller's job.
    pub fn execute<R: DeserializeOwned>(&self, query: &str) -> Result<Envelope<R>, CrawlError> {
        let body = self.send_with_retry(query)?;
        serde_json::from_str(&body).map_err(|e| CrawlError::Decode(e.to_string()))
    }

    fn send_with_retry(&self, query: &str) -> Result<String, CrawlError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;
        let mut last_body = String::new();

        for attempt in 1..=max_attempts {
            let backoff = match self.transport.send(query) {
                Ok(resp) if resp.is_success() => return Ok(resp.body),
                Ok(resp) => {
                    let overloaded = resp.status == OVERLOAD_STATUS;
                    log::warn!(
                        "HTTP {} on attempt {attempt}/{max_attempts}{}",
                        resp.status,
                        if overloaded { "" } else { " (not retryable by backoff)" }
                    );
                    last_status = Some(resp.status);
                    last_body = resp.body;
                    overloaded
                }
                Err(e) if e.is_retryable() => {
                    log::warn!("{e} on attempt {attempt}/{max_attempts}");
                    last_status = None;
                    last_body = e.to_string();
                    true
                }
                Err(e) => return Err(CrawlError::Transport(e)),
            };

            if attempt == max_attempts {
                break;
            }
            self.retries.set(self.retries.get() + 1);
            if backoff {
                log::warn!("Retrying in {} seconds...", self.policy.backoff.as_secs());
                self.clock.sleep(self.policy.backoff);
            }
        }

        log::error!("Query failed permanently after {max_attempts} attempts");
        Err(CrawlError::TransportExhausted {
            attempts: max_attempts,
            status: last_status,
            body: last_body,
        })
    }
}
