use crate::scrapers::types::{SearchParams, SweepSettings, DEFAULT_MAX_PAGES, DEFAULT_SEARCH_URL};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub search: SearchParams,
    pub sweep: SweepSettings,
    pub request_timeout: Duration,
    pub postcode_table: PathBuf,
    pub backup_file: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    /// Read configuration from the environment (and `.env` when present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let search_urls: Vec<String> = var("FUNDA_SEARCH_URLS")
            .map(|v| {
                v.split(',')
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_SEARCH_URL.to_string()]);

        let parsed = |key: &str, default: u64| -> Result<u64> { parse_or(var(key), key, default) };

        Ok(Self {
            database_url,
            db_max_connections: parse_or(var("FUNDA_DB_MAX_CONNECTIONS"), "FUNDA_DB_MAX_CONNECTIONS", 5)?,
            search: SearchParams {
                search_urls,
                max_pages: parse_or(var("FUNDA_MAX_PAGES"), "FUNDA_MAX_PAGES", DEFAULT_MAX_PAGES)?,
                page_delay: Duration::from_millis(parsed("FUNDA_PAGE_DELAY_MS", 10_000)?),
            },
            sweep: SweepSettings {
                item_delay: Duration::from_millis(parsed("FUNDA_SWEEP_DELAY_MS", 1_000)?),
                error_report: var("FUNDA_ERROR_REPORT")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("errors.txt")),
            },
            request_timeout: Duration::from_secs(parsed("FUNDA_REQUEST_TIMEOUT_SECS", 30)?),
            postcode_table: var("FUNDA_POSTCODE_TABLE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("georef-netherlands-postcode-pc4.csv")),
            backup_file: var("FUNDA_BACKUP_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("scraped_properties.json")),
            log_file: var("FUNDA_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("funda_scout.log")),
        })
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, v)),
        None => Ok(default),
    }
}
