//! Deterministic stand-ins for the clock and transport seams.
//!
//! Built for this crate's own tests and, with the `testing` feature, for
//! downstream test code. Nothing here is reachable from a release build.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;
use crate::transport::{Response, Transport, TransportError};

/// Simulated clock: sleeping advances `now` instantly and is recorded.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::zero());
        self.now.set(self.now.get() + delta);
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

/// Replays canned outcomes in order and records every query it was sent.
///
/// Once the script is exhausted every further call fails with a network error.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    script: RefCell<VecDeque<Result<Response, TransportError>>>,
    sent: RefCell<Vec<String>>,
}

impl ReplayTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn respond(self, status: u16, body: impl Into<String>) -> Self {
        self.script
            .borrow_mut()
            .push_back(Ok(Response::new(status, body)));
        self
    }

    /// Queue a connection-level failure
    pub fn fail(self, message: &str) -> Self {
        self.script
            .borrow_mut()
            .push_back(Err(TransportError::Network(message.to_string())));
        self
    }

    /// Queries received so far
    pub fn sent(&self) -> Vec<String> {
        self.sent.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }
}

impl Transport for ReplayTransport {
    fn send(&self, query: &str) -> Result<Response, TransportError> {
        self.sent.borrow_mut().push(query.to_string());
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("replay script exhausted".into())))
    }
}
