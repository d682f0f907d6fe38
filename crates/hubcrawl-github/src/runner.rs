//! Main execution logic for the profile crawl

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use chrono::TimeDelta;
use hubcrawl_core::{
    Clock, GraphqlHttp, ProgressContext, SharedProgress, SystemClock, Transport, fmt_num,
    is_shutdown_requested,
};

use crate::config::{Config, CrawlSettings};
use crate::crawler::WindowCrawler;
use crate::error::CrawlError;
use crate::executor::QueryExecutor;
use crate::period::Period;
use crate::stats::PeriodSummary;
use crate::writer::CheckpointWriter;

/// Crawl every window of `period` into `output`.
///
/// Windows already covered by a resumed checkpoint are skipped. Returns
/// early with `interrupted` set when shutdown was requested; whatever was
/// flushed up to that point stays on disk and can be resumed.
pub fn crawl_period<T: Transport, C: Clock>(
    executor: &QueryExecutor<T, C>,
    period: &Period,
    output: &Path,
    settings: &CrawlSettings,
    progress: &ProgressContext,
) -> Result<PeriodSummary, CrawlError> {
    let started = Instant::now();
    let retries_before = executor.retries();

    let mut writer = if settings.resume {
        CheckpointWriter::resume_or_create(output, period.label())?
    } else {
        CheckpointWriter::create(output, period.label())?
    };
    let rows_before = writer.rows_written();
    let resumed_through = writer.flushed_through();

    let mut summary = PeriodSummary::new(
        period.label(),
        output.to_path_buf(),
        period.sub_intervals(settings.window).count(),
    );
    let crawler = WindowCrawler::new(executor, *settings);
    let pb = progress.stage_line(period.label());

    // Continue right after the checkpoint rather than re-deriving the layout:
    // the width may differ from the run that wrote it.
    let mut windows = match resumed_through {
        Some(through) => {
            summary.skipped_windows = period
                .sub_intervals(settings.window)
                .take_while(|w| w.end <= through)
                .count();
            period.sub_intervals_from(through + TimeDelta::seconds(1), settings.window)
        }
        None => period.sub_intervals(settings.window),
    }
    .peekable();
    while let Some(window) = windows.next() {
        pb.set_message(format!(
            "{window} | {} rows",
            fmt_num(writer.rows_written() + writer.buffered())
        ));
        let crawl = crawler.crawl(&window)?;
        summary.add_window(&crawl);
        writer.accumulate(crawl.records);

        if writer.maybe_flush(&window, windows.peek())?.is_some() && is_shutdown_requested() {
            log::warn!(
                "{}: shutdown requested, stopping after {}",
                period.label(),
                window.end.date()
            );
            summary.interrupted = true;
            break;
        }
    }
    pb.finish_and_clear();

    summary.rows_written = writer.rows_written() - rows_before;
    summary.rows_total = writer.rows_written();
    summary.flushes = writer.flushes();
    summary.retries = executor.retries() - retries_before;
    summary.elapsed = started.elapsed();
    Ok(summary)
}

/// Main entry point for the crawl command
pub fn run(config: &Config, progress: SharedProgress) -> anyhow::Result<ExitCode> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Cannot create output directory {}",
            config.output_dir.display()
        )
    })?;

    log::info!(
        "hubcrawl starting: periods={:?}, window={}m, output={}",
        config.periods.iter().map(Period::label).collect::<Vec<_>>(),
        config.settings.window.num_minutes(),
        config.output_dir.display()
    );

    let transport = GraphqlHttp::new(&config.api_url, &config.token)
        .context("Failed to build HTTP client")?;
    let executor = QueryExecutor::new(transport, SystemClock, config.retry);
    let is_tty = progress.is_tty();

    for period in &config.periods {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested, skipping remaining periods");
            return Ok(ExitCode::from(130));
        }

        let output = config.output_path(period);
        log::info!("Crawling {period} into {}", output.display());
        let summary = crawl_period(&executor, period, &output, &config.settings, &progress)
            .map_err(|e| {
                if e.is_configuration_defect() {
                    log::error!("{e}: narrow window_minutes and re-run");
                }
                e
            })
            .with_context(|| format!("Crawl of {period} failed"))?;

        if is_tty {
            summary.print();
        } else {
            summary.log();
        }
        if summary.interrupted {
            return Ok(ExitCode::from(130));
        }
    }

    log::info!("hubcrawl completed successfully");
    Ok(ExitCode::SUCCESS)
}
