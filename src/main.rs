use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use funda_scout::config::Config;
use funda_scout::logging;
use funda_scout::region::RegionLookup;
use funda_scout::scrapers::collector::write_backup;
use funda_scout::scrapers::types::SweepFilter;
use funda_scout::scrapers::{DetailParser, FundaExtractor, HttpFetcher, ResultSetCollector};
use funda_scout::storage::{ListingStore, PgListingStore};
use funda_scout::sweeper::StatusSweeper;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "funda-scout")]
#[command(about = "Scrapes funda search results and tracks listing status")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect listings from the search result pages and upsert them
    Scrape,

    /// Re-check unsold listings for sold, rented or removed status
    Sweep {
        /// Only listings whose city, province or region contains this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Create or update the database schema
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::from_env()?;
    let _log_guard = logging::init(&cfg.log_file)?;

    // nothing is scraped unless the database answers first
    let store = match connect(&cfg).await {
        Ok(store) => store,
        Err(e) => {
            error!(error = %e, "Database is not reachable");
            return Err(e);
        }
    };

    match cli.command {
        Commands::Scrape => scrape(&cfg, &store).await,
        Commands::Sweep { filter } => sweep(&cfg, &store, filter).await,
        Commands::Migrate => {
            store.migrate().await?;
            info!("Database schema is up to date");
            Ok(())
        }
    }
}

async fn connect(cfg: &Config) -> Result<PgListingStore> {
    let store = PgListingStore::connect(&cfg.database_url, cfg.db_max_connections).await?;
    store.ping().await?;
    Ok(store)
}

async fn scrape(cfg: &Config, store: &PgListingStore) -> Result<()> {
    info!("🏠 Funda Scout - listing scraper");

    let regions = Arc::new(RegionLookup::from_path(&cfg.postcode_table)?);
    let extractor = FundaExtractor::new(regions)?;
    let fetcher = HttpFetcher::new(cfg.request_timeout)?;
    let collector = ResultSetCollector::new(fetcher, extractor, cfg.search.clone());

    let results = collector.collect().await;
    let stats = results.stats().clone();
    info!(
        listings = results.len(),
        pages = stats.pages_processed,
        pages_skipped = stats.pages_skipped,
        items_skipped = stats.items_skipped,
        duplicates = stats.duplicates,
        "Scraping finished"
    );

    let records = results.into_records();

    // the backup keeps the scrape even if the database write fails
    if let Err(e) = write_backup(&cfg.backup_file, &records).await {
        warn!(error = %e, "Failed to save scrape backup");
    }

    let today = Local::now().date_naive();
    match store.upsert_batch(&records, today).await {
        Ok(summary) => {
            info!(
                inserted = summary.inserted,
                updated = summary.updated,
                "Bulk database update completed"
            );
            println!(
                "✅ {} listings saved ({} new, {} updated)",
                summary.total(),
                summary.inserted,
                summary.updated
            );
        }
        Err(e) => {
            error!(error = %e, "Error during bulk database update, batch rolled back");
        }
    }

    Ok(())
}

async fn sweep(cfg: &Config, store: &PgListingStore, filter: Option<String>) -> Result<()> {
    info!("🏠 Funda Scout - sold properties update");

    let fetcher = HttpFetcher::new(cfg.request_timeout)?;
    let sweeper = StatusSweeper::new(fetcher, store, DetailParser::new()?, cfg.sweep.clone());
    let filter = filter.map(SweepFilter::location).unwrap_or_default();

    let today = Local::now().date_naive();
    let outcome = match sweeper.run(&filter, today).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Error during database querying");
            return Err(e.into());
        }
    };

    if let Err(e) = sweeper.write_report(&outcome).await {
        error!(error = %e, "Failed to write error report");
    }

    println!(
        "✅ Database updated. {} records processed. {} errors.",
        outcome.processed,
        outcome.errors.len()
    );
    Ok(())
}
