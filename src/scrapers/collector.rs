use crate::models::{ListingIdentity, ListingRecord};
use crate::scrapers::funda::FundaExtractor;
use crate::scrapers::traits::PageFetcher;
use crate::scrapers::types::SearchParams;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Counters for one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    pub pages_processed: u32,
    /// Pages dropped because the fetch failed or timed out
    pub pages_skipped: u32,
    pub items_accepted: usize,
    /// Cards that failed extraction
    pub items_skipped: usize,
    /// Cards whose identity was already collected
    pub duplicates: usize,
}

/// Deduplicated listings accumulated over a run.
/// The first observation of an identity is kept; later ones are dropped, not merged.
#[derive(Debug, Default)]
pub struct ResultSet {
    listings: HashMap<ListingIdentity, ListingRecord>,
    stats: CollectStats,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a listing with the same identity is already present
    pub fn insert(&mut self, record: ListingRecord) -> bool {
        let identity = record.identity();
        if self.listings.contains_key(&identity) {
            self.stats.duplicates += 1;
            return false;
        }
        self.listings.insert(identity, record);
        self.stats.items_accepted += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn contains(&self, identity: &ListingIdentity) -> bool {
        self.listings.contains_key(identity)
    }

    pub fn stats(&self) -> &CollectStats {
        &self.stats
    }

    /// Records ordered by identity
    pub fn into_records(self) -> Vec<ListingRecord> {
        let mut entries: Vec<_> = self.listings.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.into_iter().map(|(_, record)| record).collect()
    }
}

/// Walks search result pages sequentially and collects unique listings
pub struct ResultSetCollector<F> {
    fetcher: F,
    extractor: FundaExtractor,
    params: SearchParams,
}

impl<F: PageFetcher> ResultSetCollector<F> {
    pub fn new(fetcher: F, extractor: FundaExtractor, params: SearchParams) -> Self {
        Self {
            fetcher,
            extractor,
            params,
        }
    }

    /// Collect over every configured search URL into one result set
    pub async fn collect(&self) -> ResultSet {
        let mut results = ResultSet::new();
        for base_url in &self.params.search_urls {
            info!(url = %base_url, "Scraping started");
            results = self.collect_url(base_url, results).await;
        }
        results
    }

    /// Page through one search URL, adding to `results`.
    ///
    /// Stops at the first page without listing cards or at the page cap. A page
    /// whose fetch fails is skipped and not retried. The page delay follows every
    /// request, failed or not.
    pub async fn collect_url(&self, base_url: &str, mut results: ResultSet) -> ResultSet {
        let mut pages = 0u32;

        for page in 1..=self.params.max_pages {
            let url = SearchParams::page_url(base_url, page);

            let html = match self.fetcher.fetch_search_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, error = %e, "Failed to fetch result page, skipping");
                    results.stats.pages_skipped += 1;
                    // throttle applies to failed requests too
                    sleep(self.params.page_delay).await;
                    continue;
                }
            };

            let cards = self.extractor.extract_page(&html);
            if cards.is_empty() {
                info!(page, "No listings on page, end of results");
                break;
            }

            pages += 1;
            results.stats.pages_processed += 1;

            for (index, card) in cards.into_iter().enumerate() {
                match card {
                    Ok(extraction) => {
                        for (field, raw) in &extraction.unparseable {
                            debug!(page, index, field, raw = %raw, "Field left empty");
                        }
                        results.insert(extraction.record);
                    }
                    Err(e) => {
                        warn!(page, index, error = %e, "Error processing item, skipping");
                        results.stats.items_skipped += 1;
                    }
                }
            }

            info!(page, collected = results.len(), "Processed result page");
            sleep(self.params.page_delay).await;
        }

        info!(url = %base_url, pages, "Scraping completed");
        results
    }
}

/// Save collected records as pretty JSON before they are reconciled
pub async fn write_backup(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write backup {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "Saved scraped listings");
    Ok(())
}
