//! Cursor pagination over one creation-time window

use hubcrawl_core::{Clock, Transport};

use crate::config::CrawlSettings;
use crate::error::CrawlError;
use crate::executor::QueryExecutor;
use crate::period::SubInterval;
use crate::query::{SearchConnection, SearchData, search_query};
use crate::record::Record;

/// Everything one window produced
#[derive(Debug, Default)]
pub struct WindowCrawl {
    /// Complete profiles, in API order
    pub records: Vec<Record>,
    pub pages: usize,
    /// Incomplete nodes discarded by the filter
    pub dropped: usize,
    pub quota_waits: usize,
}

/// Follows `endCursor` until `hasNextPage` is false for a single window
pub struct WindowCrawler<'a, T, C> {
    executor: &'a QueryExecutor<T, C>,
    settings: CrawlSettings,
}

impl<'a, T: Transport, C: Clock> WindowCrawler<'a, T, C> {
    pub fn new(executor: &'a QueryExecutor<T, C>, settings: CrawlSettings) -> Self {
        Self { executor, settings }
    }

    /// Crawl every page of `window`.
    ///
    /// Fails with [`CrawlError::WindowSaturated`] once the window holds
    /// `saturation_threshold` records: the API would have silently truncated it.
    pub fn crawl(&self, window: &SubInterval) -> Result<WindowCrawl, CrawlError> {
        let mut out = WindowCrawl::default();
        let mut cursor: Option<String> = None;

        loop {
            let query = search_query(window, self.settings.page_size, cursor.as_deref());
            let page = self.fetch_page(&query, window, &mut out)?;
            out.pages += 1;

            for edge in page.edges {
                match edge.node.and_then(Record::from_node) {
                    Some(record) => out.records.push(record),
                    None => out.dropped += 1,
                }
            }

            if out.records.len() >= self.settings.saturation_threshold {
                return Err(CrawlError::WindowSaturated {
                    window: *window,
                    count: out.records.len(),
                    threshold: self.settings.saturation_threshold,
                });
            }

            if !page.page_info.has_next_page {
                break;
            }
            match page.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    return Err(CrawlError::Decode(format!(
                        "{window}: hasNextPage without endCursor"
                    )));
                }
            }
        }

        log::debug!(
            "{window}: {} records, {} dropped, {} pages",
            out.records.len(),
            out.dropped,
            out.pages
        );
        Ok(out)
    }

    /// One page. A rejection (no `data`) waits for the quota reset and
    /// re-issues the same query once.
    fn fetch_page(
        &self,
        query: &str,
        window: &SubInterval,
        out: &mut WindowCrawl,
    ) -> Result<SearchConnection, CrawlError> {
        let envelope = self.executor.execute::<SearchData>(query)?;
        if let Some(data) = envelope.data {
            return Ok(data.search);
        }

        log::debug!("{window}: rejected ({})", envelope.rejection_reason());
        self.executor.wait_for_reset(self.settings.reset_margin)?;
        out.quota_waits += 1;

        match self.executor.execute::<SearchData>(query)?.data {
            Some(data) => Ok(data.search),
            None => Err(CrawlError::QuotaExhausted { window: *window }),
        }
    }
}
