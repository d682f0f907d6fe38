//! Per-period crawl statistics and their reporting.

use std::path::PathBuf;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use hubcrawl_core::fmt_num;

use crate::crawler::WindowCrawl;

/// Aggregated counters for one period
#[derive(Debug, Clone, Default)]
pub struct PeriodSummary {
    pub period: String,
    pub output: PathBuf,
    /// Windows in the period
    pub windows: usize,
    /// Windows skipped because a previous run already flushed them
    pub skipped_windows: usize,
    pub pages: usize,
    /// Rows appended by this run
    pub rows_written: usize,
    /// Rows in the file, including earlier runs
    pub rows_total: usize,
    pub dropped: usize,
    pub flushes: usize,
    pub retries: usize,
    pub quota_waits: usize,
    /// Stopped at a day boundary on request; the rest can be resumed
    pub interrupted: bool,
    pub elapsed: Duration,
}

fn pct(part: usize, total: usize) -> f64 {
    if total > 0 {
        part as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

impl PeriodSummary {
    pub fn new(period: &str, output: PathBuf, windows: usize) -> Self {
        Self {
            period: period.to_string(),
            output,
            windows,
            ..Default::default()
        }
    }

    /// Fold one window's counters in
    pub fn add_window(&mut self, crawl: &WindowCrawl) {
        self.pages += crawl.pages;
        self.dropped += crawl.dropped;
        self.quota_waits += crawl.quota_waits;
    }

    /// Share of fetched profiles that were complete
    pub fn kept_pct(&self) -> f64 {
        pct(self.rows_written, self.rows_written + self.dropped)
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new(format!("Period {}", self.period))
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
            ]);

        let windows = if self.skipped_windows > 0 {
            format!(
                "{} ({} resumed)",
                fmt_num(self.windows),
                fmt_num(self.skipped_windows)
            )
        } else {
            fmt_num(self.windows)
        };
        table.add_row(vec![Cell::new("Windows"), Cell::new(windows)]);
        table.add_row(vec![Cell::new("Pages"), Cell::new(fmt_num(self.pages))]);
        table.add_row(vec![
            Cell::new("Rows written").fg(Color::Green),
            Cell::new(format!(
                "{} ({:.1}% complete profiles)",
                fmt_num(self.rows_written),
                self.kept_pct()
            ))
            .fg(Color::Green),
        ]);
        table.add_row(vec![
            Cell::new("Rows in file"),
            Cell::new(fmt_num(self.rows_total)),
        ]);
        table.add_row(vec![Cell::new("Dropped"), Cell::new(fmt_num(self.dropped))]);
        table.add_row(vec![Cell::new("Flushes"), Cell::new(self.flushes)]);
        table.add_row(vec![Cell::new("Retries"), Cell::new(self.retries)]);
        table.add_row(vec![Cell::new("Quota waits"), Cell::new(self.quota_waits)]);
        table.add_row(vec![
            Cell::new("Time"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);
        table.add_row(vec![
            Cell::new("Output"),
            Cell::new(self.output.display().to_string()),
        ]);
        if self.interrupted {
            table.add_row(vec![
                Cell::new("Status").fg(Color::Yellow),
                Cell::new("interrupted (resumable)").fg(Color::Yellow),
            ]);
        }

        format!("\n{table}")
    }

    pub fn print(&self) {
        eprintln!("{}", self.format_table());
    }

    /// Log minimal summary (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "{} {}: {} rows written ({} dropped, {} pages, {} retries, {} quota waits) [{:.1}s]",
            self.period,
            if self.interrupted { "interrupted" } else { "complete" },
            fmt_num(self.rows_written),
            fmt_num(self.dropped),
            fmt_num(self.pages),
            self.retries,
            self.quota_waits,
            self.elapsed.as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_window_accumulates() {
        let mut summary = PeriodSummary::new("2030-02", PathBuf::from("out.csv"), 4032);
        summary.add_window(&WindowCrawl {
            records: Vec::new(),
            pages: 2,
            dropped: 5,
            quota_waits: 1,
        });
        summary.add_window(&WindowCrawl {
            pages: 1,
            dropped: 1,
            ..Default::default()
        });
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.dropped, 6);
        assert_eq!(summary.quota_waits, 1);
    }

    #[test]
    fn kept_pct_handles_zero() {
        let summary = PeriodSummary::default();
        assert_eq!(summary.kept_pct(), 0.0);
    }

    #[test]
    fn table_mentions_period_and_resume() {
        let summary = PeriodSummary {
            period: "2021-01".into(),
            windows: 4464,
            skipped_windows: 144,
            rows_written: 1234,
            interrupted: true,
            ..Default::default()
        };
        let table = summary.format_table();
        assert!(table.contains("Period 2021-01"));
        assert!(table.contains("4,464 (144 resumed)"));
        assert!(table.contains("1,234"));
        assert!(table.contains("interrupted"));
    }
}
