//! Postgres test harness backed by testcontainers.
//!
//! One container is started per test binary and shared. Every test gets its own
//! freshly migrated database, so tests can run in parallel without seeing each
//! other's rows.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use funda_scout::models::{ListingRecord, PropertyType};
use funda_scout::storage::PgListingStore;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::sync::atomic::{AtomicUsize, Ordering};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct SharedPostgres {
    host: String,
    port: u16,
    // keeps the container alive for the whole test run
    _container: ContainerAsync<Postgres>,
}

static SHARED_POSTGRES: OnceCell<SharedPostgres> = OnceCell::const_new();
static NEXT_DATABASE: AtomicUsize = AtomicUsize::new(0);

impl SharedPostgres {
    async fn init() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let container = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let host = container.get_host().await?.to_string();
        let port = container.get_host_port_ipv4(5432).await?;

        Ok(Self {
            host,
            port,
            _container: container,
        })
    }

    async fn get() -> &'static Self {
        SHARED_POSTGRES
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared Postgres container")
            })
            .await
    }

    fn url(&self, database: &str) -> String {
        format!(
            "postgresql://postgres:postgres@{}:{}/{}",
            self.host, self.port, database
        )
    }
}

/// A migrated, empty database with the store under test and a raw pool for assertions
pub struct TestDb {
    pub store: PgListingStore,
    pub pool: PgPool,
}

impl TestDb {
    pub async fn new() -> Result<Self> {
        let shared = SharedPostgres::get().await;
        let database = format!(
            "funda_test_{}",
            NEXT_DATABASE.fetch_add(1, Ordering::SeqCst)
        );

        let mut admin = PgConnection::connect(&shared.url("postgres"))
            .await
            .context("Failed to connect to the admin database")?;
        admin
            .execute(format!("CREATE DATABASE {}", database).as_str())
            .await
            .with_context(|| format!("Failed to create database {}", database))?;
        admin.close().await?;

        let url = shared.url(&database);
        let store = PgListingStore::connect(&url, 5).await?;
        store.migrate().await?;
        let pool = PgPool::connect(&url)
            .await
            .context("Failed to open assertion pool")?;

        Ok(Self { store, pool })
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

pub fn record(name: &str, city: &str) -> ListingRecord {
    ListingRecord {
        name: name.to_string(),
        property_type: PropertyType::House,
        postal_code_number: "1011".to_string(),
        postal_code_letters: "AB".to_string(),
        city: city.to_string(),
        province: "Noord-Holland".to_string(),
        region: "Amsterdam".to_string(),
        price: Some(450_000.0),
        area: Some(85.0),
        room_count: Some(4),
        energy_rating: Some("A".to_string()),
        detail_url: format!(
            "https://www.funda.nl/detail/koop/{}/huis-{}/43000001/",
            city.to_lowercase(),
            name.to_lowercase().replace(' ', "-")
        ),
        estate_agent: Some("Makelaardij Centrum".to_string()),
        tags: vec![],
    }
}
