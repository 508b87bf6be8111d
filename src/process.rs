use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Local;
use tokio::task::JoinSet;

use crate::checkpoint::fetch_page;
use crate::parse::parse_listing;
use crate::record::{Record, ResultSet};
use crate::request::SharedSession;
use crate::{info_time, Error, Result, DEFAULT_BASE_URL, PAGE_SIZE, WORKERS};

/// Pages scraped so far. `pages_done` only ever grows during a run.
#[derive(Debug, Default)]
pub struct Progress {
    pages_done: AtomicUsize,
    pages_total: AtomicUsize,
}

impl Progress {
    pub fn pages_done(&self) -> usize {
        self.pages_done.load(Ordering::Relaxed)
    }

    pub fn pages_total(&self) -> usize {
        self.pages_total.load(Ordering::Relaxed)
    }

    fn page_done(&self) -> usize {
        self.pages_done.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Scrapes a user's "collect" listing, page by page.
pub struct Scraper {
    session: SharedSession,
    base_url: String,
    progress: Arc<Progress>,
}

impl Scraper {
    pub fn new(session: SharedSession) -> Self {
        Self {
            session,
            base_url: DEFAULT_BASE_URL.to_string(),
            progress: Arc::default(),
        }
    }

    /// Points the scraper at another origin than `movie.douban.com`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn progress(&self) -> Arc<Progress> {
        self.progress.clone()
    }

    /// First listing page of `username`, newest ratings first.
    pub fn listing_url(&self, username: &str) -> String {
        format!(
            "{}/people/{username}/collect?sort=time&mode=grid",
            self.base_url
        )
    }

    /// Scrapes every rated movie of `username`.
    ///
    /// Page 1 is fetched first and its paginator decides how many pages there are; a
    /// `max_pages` between 1 and that count lowers it. The remaining pages are fetched
    /// with at most `WORKERS` requests in flight. Any failing page fails the whole run.
    pub async fn scrape(&self, username: &str, max_pages: Option<usize>) -> Result<ResultSet> {
        let start_time = Local::now();
        let url = self.listing_url(username);

        info_time!("Scanning page 1 ...");
        let first = parse_listing(fetch_page(self.session.as_ref(), &url).await?).await?;

        let mut last_page = first.total_pages.unwrap_or(1).max(1);
        if let Some(max) = max_pages.filter(|&max| max > 0 && max < last_page) {
            last_page = max;
        }
        self.progress.pages_total.store(last_page, Ordering::Relaxed);

        let mut results = ResultSet::new();
        results.extend(first.into_records(detail_fetcher(&self.session)).await?);
        self.progress.page_done();

        // Pages finish in any order; they are merged back in listing order.
        let mut pages: Vec<Vec<(u64, Record)>> = vec![Vec::new(); last_page - 1];
        let mut pending =
            (1..last_page).map(|page| (page, format!("{url}&start={}", page * PAGE_SIZE)));
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < WORKERS {
                let Some((page, page_url)) = pending.next() else {
                    break;
                };
                in_flight.spawn({
                    let session = self.session.clone();
                    async move { Ok::<_, Error>((page, scrape_page(session, page_url).await?)) }
                });
            }

            // Dropping `in_flight` on error aborts whatever is still running.
            let Some(task) = in_flight.join_next().await else {
                break;
            };
            let (page, records) = task??;
            pages[page - 1] = records;

            let done = self.progress.page_done();
            info_time!("Scanning page {done}/{last_page} ...");
        }

        results.extend(pages.into_iter().flatten());

        info_time!(
            start_time,
            "Scanned {last_page} pages, {} movies",
            results.len()
        );
        Ok(results)
    }
}

/// Fetches and parses one listing page, including any detail page fallbacks.
async fn scrape_page(session: SharedSession, url: String) -> Result<Vec<(u64, Record)>> {
    let html = fetch_page(session.as_ref(), &url).await?;
    parse_listing(html)
        .await?
        .into_records(detail_fetcher(&session))
        .await
}

type DetailFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Detail pages go through the same session, checkpoint handling included.
fn detail_fetcher(session: &SharedSession) -> impl Fn(String) -> DetailFuture {
    let session = session.clone();
    move |url| {
        let session = session.clone();
        Box::pin(async move { fetch_page(session.as_ref(), &url).await })
    }
}
