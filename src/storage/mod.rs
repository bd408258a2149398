//! Persistence of reconciled listings.
//!
//! The store owns the listings table: collected batches are upserted by
//! identity, the sweeper reads unsold rows and writes status transitions back.

use crate::error::StoreError;
use crate::models::{ListingRecord, StatusUpdate};
use crate::scrapers::types::SweepFilter;
use async_trait::async_trait;
use chrono::NaiveDate;
use url::Url;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgListingStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

/// An unsold listing due for a status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepCandidate {
    pub id: i64,
    pub url: String,
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Round-trip to the backing store
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert new listings and refresh mutable fields of known ones, all or nothing.
    /// `created_at` is only ever set on insert.
    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
        today: NaiveDate,
    ) -> Result<UpsertSummary, StoreError>;

    /// Unsold listings, ordered by id
    async fn query_unsold(&self, filter: &SweepFilter) -> Result<Vec<SweepCandidate>, StoreError>;

    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<(), StoreError>;
}

#[async_trait]
impl<'a, T: ListingStore + ?Sized> ListingStore for &'a T {
    async fn ping(&self) -> Result<(), StoreError> {
        (**self).ping().await
    }

    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
        today: NaiveDate,
    ) -> Result<UpsertSummary, StoreError> {
        (**self).upsert_batch(records, today).await
    }

    async fn query_unsold(&self, filter: &SweepFilter) -> Result<Vec<SweepCandidate>, StoreError> {
        (**self).query_unsold(filter).await
    }

    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<(), StoreError> {
        (**self).update_status(id, update).await
    }
}

/// Rejects records that may not be admitted to the store
pub(crate) fn validate(record: &ListingRecord) -> Result<(), StoreError> {
    let reason = if record.name.trim().is_empty() {
        "empty name"
    } else if record.city.trim().is_empty() {
        "empty city"
    } else if !is_absolute_web_url(&record.detail_url) {
        "detail url is not absolute"
    } else {
        return Ok(());
    };

    Err(StoreError::InvalidRecord {
        name: record.name.clone(),
        city: record.city.clone(),
        reason,
    })
}

fn is_absolute_web_url(text: &str) -> bool {
    match Url::parse(text) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().map_or(false, |host| !host.is_empty())
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::record;

    fn with_url(url: &str) -> ListingRecord {
        let mut listing = record("Kerkstraat 1", "Amsterdam");
        listing.detail_url = url.to_string();
        listing
    }

    #[test]
    fn accepts_canonical_detail_urls() {
        assert!(validate(&record("Kerkstraat 1", "Amsterdam")).is_ok());
        assert!(validate(&with_url("http://www.funda.nl/detail/1/")).is_ok());
    }

    #[test]
    fn rejects_urls_without_host_or_web_scheme() {
        for url in [
            "https://",
            "http",
            "https//www.funda.nl/detail/1/",
            "/detail/koop/amsterdam/huis-kerkstraat-1/43000001/",
            "ftp://www.funda.nl/detail/1/",
            "",
        ] {
            let err = validate(&with_url(url)).unwrap_err();
            assert!(
                matches!(err, StoreError::InvalidRecord { reason: "detail url is not absolute", .. }),
                "accepted {:?}",
                url
            );
        }
    }

    #[test]
    fn rejects_blank_name_or_city() {
        assert!(validate(&record(" ", "Amsterdam")).is_err());
        assert!(validate(&record("Kerkstraat 1", "")).is_err());
    }
}
