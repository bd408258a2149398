use super::{validate, ListingStore, SweepCandidate, UpsertSummary};
use crate::error::StoreError;
use crate::models::{join_tags, ListingRecord, StatusUpdate};
use crate::scrapers::types::SweepFilter;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Row, Transaction};
use tracing::debug;

pub struct PgListingStore {
    pool: PgPool,
}

impl PgListingStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(StoreError::Connect)?;

        Ok(Self { pool })
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Returns true when the row was inserted, false when an existing one was updated
    async fn upsert_tx(
        tx: &mut Transaction<'_, Postgres>,
        record: &ListingRecord,
        today: NaiveDate,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO listings (
                identity_key,
                name,
                property_type,
                postal_code_number,
                postal_code_letters,
                city,
                province,
                region,
                price,
                area,
                room_count,
                energy_rating,
                detail_url,
                estate_agent,
                tags,
                sold,
                created_at,
                updated_at
            )
            VALUES (
                $1,$2,$3,$4,$5,$6,$7,$8,
                $9,$10,$11,$12,$13,$14,$15,$16,
                $17,$17
            )
            ON CONFLICT (identity_key) DO UPDATE SET
                price = EXCLUDED.price,
                area = EXCLUDED.area,
                room_count = EXCLUDED.room_count,
                energy_rating = EXCLUDED.energy_rating,
                detail_url = EXCLUDED.detail_url,
                estate_agent = EXCLUDED.estate_agent,
                tags = EXCLUDED.tags,
                sold = EXCLUDED.sold,
                updated_at = EXCLUDED.updated_at
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(record.identity().as_key())
        .bind(&record.name)
        .bind(record.property_type.as_str())
        .bind(&record.postal_code_number)
        .bind(&record.postal_code_letters)
        .bind(&record.city)
        .bind(&record.province)
        .bind(&record.region)
        .bind(record.price)
        .bind(record.area)
        .bind(record.room_count.and_then(|n| i32::try_from(n).ok()))
        .bind(&record.energy_rating)
        .bind(&record.detail_url)
        .bind(&record.estate_agent)
        .bind(record.joined_tags())
        .bind(record.is_sold())
        .bind(today)
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.try_get::<bool, _>("inserted")?)
    }
}

#[async_trait]
impl ListingStore for PgListingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::Connect)?;
        Ok(())
    }

    async fn upsert_batch(
        &self,
        records: &[ListingRecord],
        today: NaiveDate,
    ) -> Result<UpsertSummary, StoreError> {
        // dropping the transaction on an early return rolls the batch back
        let mut tx = self.pool.begin().await?;
        let mut summary = UpsertSummary::default();

        for record in records {
            validate(record)?;
            if Self::upsert_tx(&mut tx, record, today).await? {
                summary.inserted += 1;
            } else {
                summary.updated += 1;
            }
        }

        tx.commit().await?;
        debug!(inserted = summary.inserted, updated = summary.updated, "Batch committed");
        Ok(summary)
    }

    async fn query_unsold(&self, filter: &SweepFilter) -> Result<Vec<SweepCandidate>, StoreError> {
        let pattern = filter
            .location_contains
            .as_deref()
            .map(|text| format!("%{}%", escape_like(text)));

        let rows = sqlx::query(
            r#"
            SELECT id, detail_url
            FROM listings
            WHERE sold = FALSE
              AND ($1::TEXT IS NULL
                   OR city ILIKE $1
                   OR province ILIKE $1
                   OR region ILIKE $1)
            ORDER BY id
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(SweepCandidate {
                    id: row.try_get("id")?,
                    url: row.try_get("detail_url")?,
                })
            })
            .collect()
    }

    async fn update_status(&self, id: i64, update: &StatusUpdate) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE listings
            SET sold = $1, tags = $2, updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(update.sold)
        .bind(join_tags(&update.tags))
        .bind(update.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
