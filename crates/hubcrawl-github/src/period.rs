//! Calendar periods and the creation-time windows that tile them.
//!
//! GitHub search enumerates at most 1000 results per query, so a period is
//! cut into narrow windows (10 minutes by default) whose result sets stay
//! below that ceiling. Windows are inclusive at one-second granularity:
//! `next.start == prev.end + 1s`.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};

use crate::error::CrawlError;

/// Timestamp format used in search qualifiers and log lines
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn one_second() -> TimeDelta {
    TimeDelta::seconds(1)
}

/// Top-level crawl scope: a calendar month (`2021-01`) or a single day (`2021-01-15`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    label: String,
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl Period {
    pub fn parse(label: &str) -> Result<Self, CrawlError> {
        let invalid =
            || CrawlError::InvalidPeriod(format!("{label:?} (expected YYYY-MM or YYYY-MM-DD)"));

        let (first, last) = match label.split('-').count() {
            2 => {
                let first = NaiveDate::parse_from_str(&format!("{label}-01"), "%Y-%m-%d")
                    .map_err(|_| invalid())?;
                (first, last_day_of_month(first).ok_or_else(invalid)?)
            }
            3 => {
                let day = NaiveDate::parse_from_str(label, "%Y-%m-%d").map_err(|_| invalid())?;
                (day, day)
            }
            _ => return Err(invalid()),
        };

        Ok(Self {
            label: label.to_string(),
            start: first.and_hms_opt(0, 0, 0).ok_or_else(invalid)?,
            end: last.and_hms_opt(23, 59, 59).ok_or_else(invalid)?,
        })
    }

    /// Label as given; also names the output file
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Last second of the period (23:59:59 of its final day)
    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Windows of at most `width`, in increasing time order.
    ///
    /// The iterator is lazy and cheap to clone; calling this again restarts
    /// from the beginning. Widths under one second are treated as one second.
    pub fn sub_intervals(&self, width: TimeDelta) -> SubIntervals {
        self.sub_intervals_from(self.start, width)
    }

    /// Windows of at most `width` laid out from `from` instead of the period start.
    ///
    /// Used to continue after a checkpoint: the first window starts exactly at
    /// `from`, whatever width the earlier run used. `from` is clamped to the
    /// period start; past the period end the sequence is empty.
    pub fn sub_intervals_from(&self, from: NaiveDateTime, width: TimeDelta) -> SubIntervals {
        SubIntervals {
            next_start: (from <= self.end).then(|| from.max(self.start)),
            period_end: self.end,
            width: width.max(one_second()),
        }
    }
}

impl FromStr for Period {
    type Err = CrawlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

fn last_day_of_month(first: NaiveDate) -> Option<NaiveDate> {
    let next_month = if first.month0() == 11 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)?
    };
    next_month.pred_opt()
}

/// Inclusive `[start, end]` creation-time range for one search query
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SubInterval {
    /// GitHub search qualifier, e.g. `created:2030-02-01T00:00:00..2030-02-01T00:09:59`
    pub fn created_qualifier(&self) -> String {
        format!(
            "created:{}..{}",
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT)
        )
    }
}

impl std::fmt::Display for SubInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(TIMESTAMP_FORMAT),
            self.end.format(TIMESTAMP_FORMAT)
        )
    }
}

/// Lazy window sequence for one period; see [`Period::sub_intervals`]
#[derive(Debug, Clone)]
pub struct SubIntervals {
    next_start: Option<NaiveDateTime>,
    period_end: NaiveDateTime,
    width: TimeDelta,
}

impl Iterator for SubIntervals {
    type Item = SubInterval;

    fn next(&mut self) -> Option<SubInterval> {
        let start = self.next_start?;
        let end = (start + self.width - one_second()).min(self.period_end);
        self.next_start = (end < self.period_end).then(|| end + one_second());
        Some(SubInterval { start, end })
    }
}

impl std::iter::FusedIterator for SubIntervals {}

/// Whether `current` is the last window of its calendar day.
///
/// True when there is no next window or the next one ends on a later date.
/// Comparing end dates keeps the once-per-day cadence even when the width
/// does not divide a day evenly.
pub fn is_day_boundary(current: &SubInterval, next: Option<&SubInterval>) -> bool {
    next.is_none_or(|next| next.end.date() != current.end.date())
}
