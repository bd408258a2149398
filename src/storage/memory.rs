use super::{validate, ListingStore, SweepCandidate, UpsertSummary};
use crate::error::StoreError;
use crate::models::{tags_mark_sold, ListingIdentity, ListingRecord, PersistedListing, StatusUpdate};
use crate::scrapers::types::SweepFilter;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, Default)]
struct Table {
    rows: BTreeMap<i64, PersistedListing>,
    by_identity: HashMap<ListingIdentity, i64>,
    next_id: i64,
}

/// In-process store with the same upsert contract as the Postgres one.
/// A batch is applied to a copy of the table and swapped in only if every record succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: i64) -> Option<PersistedListing> {
        self.lock().rows.get(&id).cloned()
    }

    pub fn find(&self, identity: &ListingIdentity) -> Option<PersistedListing> {
        let table = self.lock();
        table
            .by_identity
            .get(identity)
            .and_then(|id| table.rows.get(id))
            .cloned()
    }

    pub fn all(&self) -> Vec<PersistedListing> {
        self.lock().rows.values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Table> {
        // a panic while holding the lock cannot leave a half-applied batch behind
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
        today: NaiveDate,
    ) -> Result<UpsertSummary, StoreError> {
        let mut table = self.lock();
        let mut staged = table.clone();
        let mut summary = UpsertSummary::default();

        for record in records {
            validate(record)?;
            let sold = tags_mark_sold(&record.tags);

            match staged.by_identity.get(&record.identity()).copied() {
                Some(id) => {
                    let row = staged
                        .rows
                        .get_mut(&id)
                        .ok_or(StoreError::NotFound { id })?;
                    let current = &mut row.record;
                    current.price = record.price;
                    current.area = record.area;
                    current.room_count = record.room_count;
                    current.energy_rating = record.energy_rating.clone();
                    current.detail_url = record.detail_url.clone();
                    current.estate_agent = record.estate_agent.clone();
                    current.tags = record.tags.clone();
                    row.sold = sold;
                    row.updated_at = today;
                    summary.updated += 1;
                }
                None => {
                    staged.next_id += 1;
                    let id = staged.next_id;
                    staged.by_identity.insert(record.identity(), id);
                    staged.rows.insert(
                        id,
                        PersistedListing {
                            id,
                            record: record.clone(),
                            sold,
                            created_at: today,
                            updated_at: today,
                        },
                    );
                    summary.inserted += 1;
                }
            }
        }

        *table = staged;
        Ok(summary)
    }

    async fn query_unsold(&self, filter: &SweepFilter) -> Result<Vec<SweepCandidate>, StoreError> {
        let table = self.lock();
        Ok(table
            .rows
            .values()
            .filter(|row| !row.sold)
            .filter(|row| {
                filter.matches(&row.record.city, &row.record.province, &row.record.region)
            })
            .map(|row| SweepCandidate {
                id: row.id,
                url: row.record.detail_url.clone(),
            })
            .collect())
    }

    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<(), StoreError> {
        let mut table = self.lock();
        let row = table.rows.get_mut(&id).ok_or(StoreError::NotFound { id })?;
        row.sold = update.sold;
        row.record.tags = update.tags.clone();
        row.updated_at = update.updated_at;
        Ok(())
    }
}
