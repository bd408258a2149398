//! Follow-up pass over unsold listings.
//!
//! Each candidate's detail page is fetched and classified on its own; a failed
//! fetch or write is recorded and the sweep moves on to the next listing.

use crate::error::{FetchError, StoreError};
use crate::models::{StatusUpdate, TAG_REMOVED, TAG_RENTED, TAG_SOLD};
use crate::scrapers::detail::{DetailParser, DetailStatus};
use crate::scrapers::traits::{DetailFetcher, DetailPage};
use crate::scrapers::types::{SweepFilter, SweepSettings};
use crate::storage::{ListingStore, SweepCandidate};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SweepItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A listing the sweep could not process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepError {
    pub id: i64,
    pub url: String,
    pub message: String,
}

impl SweepError {
    pub fn report_line(&self) -> String {
        format!("{} | {} | {}", self.id, self.url, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub candidates: usize,
    pub processed: usize,
    /// Processed listings now marked sold, rented or removed
    pub marked_sold: usize,
    pub errors: Vec<SweepError>,
}

/// Decide a listing's state from its detail page.
///
/// Missing status, or a status mentioning sold or rented, marks the listing sold.
/// The highlight badge leads the tags unless the status already says sold.
pub fn classify(detail: &DetailStatus, today: NaiveDate) -> StatusUpdate {
    let status = detail.status.as_deref();
    let sold = match status {
        None => true,
        Some(s) => s.contains(TAG_SOLD) || s.contains(TAG_RENTED),
    };

    let mut tags = Vec::with_capacity(detail.labels.len() + 1);
    let status_says_sold = status.map_or(false, |s| s.contains(TAG_SOLD));
    if let Some(badge) = &detail.eye_catcher {
        if !status_says_sold {
            tags.push(badge.clone());
        }
    }
    tags.extend(detail.labels.iter().cloned());

    StatusUpdate {
        sold,
        tags,
        updated_at: today,
    }
}

/// Update written for a listing whose detail page no longer resolves
pub fn removed(today: NaiveDate) -> StatusUpdate {
    StatusUpdate {
        sold: true,
        tags: vec![TAG_REMOVED.to_string()],
        updated_at: today,
    }
}

pub struct StatusSweeper<D, S> {
    fetcher: D,
    store: S,
    parser: DetailParser,
    settings: SweepSettings,
}

impl<D: DetailFetcher, S: ListingStore> StatusSweeper<D, S> {
    pub fn new(fetcher: D, store: S, parser: DetailParser, settings: SweepSettings) -> Self {
        Self {
            fetcher,
            store,
            parser,
            settings,
        }
    }

    /// Check every unsold listing matching `filter`. Only the candidate query can
    /// fail the sweep as a whole.
    pub async fn run(&self, filter: &SweepFilter, today: NaiveDate) -> Result<SweepOutcome, StoreError> {
        let candidates = self.store.query_unsold(filter).await?;
        info!(count = candidates.len(), "Sold properties update started");

        let mut outcome = SweepOutcome {
            candidates: candidates.len(),
            ..SweepOutcome::default()
        };

        for (index, candidate) in candidates.iter().enumerate() {
            match self.check(candidate, today).await {
                Ok(update) => {
                    outcome.processed += 1;
                    if update.sold {
                        outcome.marked_sold += 1;
                    }
                    debug!(id = candidate.id, sold = update.sold, "Listing status updated");
                }
                Err(e) => {
                    warn!(id = candidate.id, url = %candidate.url, error = %e, "Failed to update listing status");
                    outcome.errors.push(SweepError {
                        id: candidate.id,
                        url: candidate.url.clone(),
                        message: e.to_string(),
                    });
                }
            }

            if (index + 1) % 100 == 0 {
                info!(
                    done = index + 1,
                    total = candidates.len(),
                    errors = outcome.errors.len(),
                    "Sweep progress"
                );
            }

            // polite delay between requests
            if index + 1 < candidates.len() {
                sleep(self.settings.item_delay).await;
            }
        }

        info!(
            processed = outcome.processed,
            marked_sold = outcome.marked_sold,
            errors = outcome.errors.len(),
            "Sweep finished"
        );
        Ok(outcome)
    }

    async fn check(&self, candidate: &SweepCandidate, today: NaiveDate) -> Result<StatusUpdate, SweepItemError> {
        let update = match self.fetcher.fetch_detail(&candidate.url).await? {
            DetailPage::Removed => removed(today),
            DetailPage::Found(html) => classify(&self.parser.parse(&html), today),
        };

        self.store.update_status(candidate.id, &update).await?;
        Ok(update)
    }

    /// Rewrite the error report with this sweep's failures
    pub async fn write_report(&self, outcome: &SweepOutcome) -> Result<()> {
        write_report(&self.settings.error_report, &outcome.errors).await
    }
}

/// One line per failed listing: `id | url | error`. The file is replaced, not appended to.
pub async fn write_report(path: &Path, errors: &[SweepError]) -> Result<()> {
    let mut content = String::new();
    for error in errors {
        content.push_str(&error.report_line());
        content.push('\n');
    }

    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write error report {}", path.display()))?;
    Ok(())
}
