//! Pagination driver.
//!
//! ### Termination
//! - No page parameter: the base URL is fetched once
//! - Otherwise pages are requested with increasing numbers until one has no items
//! - `max_pages` and the [`StopSignal`] end a run early
//!
//! ### Prefetch
//! With prefetch on, page N+1 is requested in a spawned task as soon as page N
//! is known to have items, so its download overlaps row extraction for page
//! N. At most one prefetch is in flight and batches are still yielded in page
//! order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use url::Url;

use crate::dom::{ItemRoot, Page, XPath, compile};
use crate::fetch::{PageSource, RawPage, page_url};
use tabula_core::{AppConfig, Error};

/// Pagination settings for one run.
#[derive(Debug, Clone)]
pub struct PaginationOptions {
    /// Number of the first page requested (default: 1)
    pub first_page: u32,

    /// Upper bound on fetched pages (default: unbounded)
    pub max_pages: Option<u32>,

    /// Pause before each page after the first (default: none)
    pub page_delay: Duration,

    /// Overlap the next fetch with extraction (default: false)
    pub prefetch: bool,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self { first_page: 1, max_pages: None, page_delay: Duration::ZERO, prefetch: false }
    }
}

impl From<&AppConfig> for PaginationOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            first_page: config.first_page,
            max_pages: config.max_pages,
            page_delay: config.page_delay(),
            prefetch: config.prefetch,
        }
    }
}

/// Cooperative "stop after the current page" flag, shared between a run and
/// whoever may interrupt it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One fetched page and the items found on it.
#[derive(Debug)]
pub struct PageBatch {
    pub page_number: u32,
    pub page: Page,
    /// Item roots in document order; empty on the terminating page.
    pub items: Vec<ItemRoot>,
}

type PendingFetch = (u32, JoinHandle<Result<RawPage, Error>>);

/// Walks a paginated listing one page at a time.
pub struct Paginator {
    source: Arc<dyn PageSource>,
    base_url: Url,
    page_param: Option<String>,
    item_xpath: XPath,
    options: PaginationOptions,
    stop: StopSignal,
    /// `None` once the page counter is exhausted.
    next_page: Option<u32>,
    pages_fetched: u32,
    finished: bool,
    stopped: bool,
    pending: Option<PendingFetch>,
}

impl Paginator {
    /// A blank `page_param` disables pagination.
    pub fn new(
        source: Arc<dyn PageSource>, base_url: Url, page_param: Option<&str>, item_xpath: &str,
        options: PaginationOptions,
    ) -> Result<Self, Error> {
        let item_xpath = compile(item_xpath)?;
        let page_param = page_param.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);

        Ok(Self {
            source,
            base_url,
            page_param,
            item_xpath,
            next_page: Some(options.first_page),
            options,
            stop: StopSignal::new(),
            pages_fetched: 0,
            finished: false,
            stopped: false,
            pending: None,
        })
    }

    /// Observe `stop` before each new page.
    pub fn with_stop(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.page_param.is_some()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Whether the run ended because the stop signal fired.
    pub fn was_stopped(&self) -> bool {
        self.stopped
    }

    /// URL requested for `page_number`.
    pub fn url_for(&self, page_number: u32) -> Url {
        match &self.page_param {
            Some(param) => page_url(&self.base_url, param, page_number),
            None => self.base_url.clone(),
        }
    }

    /// Fetch the next page. `Ok(None)` once the run is over.
    pub async fn next_batch(&mut self) -> Result<Option<PageBatch>, Error> {
        if self.finished {
            return Ok(None);
        }

        if self.stop.is_stopped() {
            tracing::info!("stop requested after {} page(s)", self.pages_fetched);
            self.stopped = true;
            self.finish();
            return Ok(None);
        }

        let (page_number, raw) = match self.pending.take() {
            Some((page_number, handle)) => {
                let raw = match handle.await {
                    Ok(raw) => raw,
                    Err(e) => Err(Error::TaskFailed(format!("page {}: {}", page_number, e))),
                };
                (page_number, raw)
            }
            None => {
                let Some(page_number) = self.claim_page() else {
                    tracing::warn!("page numbers exhausted after {} page(s)", self.pages_fetched);
                    self.finish();
                    return Ok(None);
                };
                if self.pages_fetched > 0 && !self.options.page_delay.is_zero() {
                    tokio::time::sleep(self.options.page_delay).await;
                }
                let url = self.url_for(page_number);
                (page_number, self.source.fetch_html(&url).await)
            }
        };

        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };
        self.pages_fetched += 1;

        let page = Page::from_raw(raw);
        let items = page.items(&self.item_xpath);
        tracing::info!("page {}: {} item(s) at {}", page_number, items.len(), page.url());

        let capped = self.options.max_pages.is_some_and(|max| self.pages_fetched >= max);
        if !self.is_paginated() || items.is_empty() || capped {
            if capped && !items.is_empty() {
                tracing::info!("page limit of {} reached", self.pages_fetched);
            }
            self.finish();
        } else if self.options.prefetch && !self.stop.is_stopped() {
            self.spawn_prefetch();
        }

        Ok(Some(PageBatch { page_number, page, items }))
    }

    /// Hand out the next page number. The counter is advanced nowhere else.
    fn claim_page(&mut self) -> Option<u32> {
        let page_number = self.next_page?;
        self.next_page = page_number.checked_add(1);
        Some(page_number)
    }

    fn spawn_prefetch(&mut self) {
        let Some(page_number) = self.claim_page() else {
            return;
        };
        let url = self.url_for(page_number);
        let source = Arc::clone(&self.source);
        let delay = self.options.page_delay;

        tracing::debug!("prefetching page {}", page_number);
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            source.fetch_html(&url).await
        });
        self.pending = Some((page_number, handle));
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some((page_number, handle)) = self.pending.take() {
            tracing::debug!("dropping prefetch of page {}", page_number);
            handle.abort();
        }
    }
}

impl Drop for Paginator {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.pending.take() {
            handle.abort();
        }
    }
}
