//! Typed failures for the fetch, extraction and storage layers.
//!
//! Fetch and extraction errors are recovered per page or per item by the
//! callers; storage errors surface to the command that triggered them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} returned status {status}")]
    Status { url: String, status: u16 },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();

        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url,
                status: status.as_u16(),
            }
        } else {
            FetchError::Transport {
                url,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("required field '{field}' not found in listing card")]
    MissingField { field: &'static str },

    #[error("required field '{field}' is empty")]
    EmptyField { field: &'static str },

    #[error("cannot split postal code and city from '{raw}'")]
    InvalidPostalCity { raw: String },

    #[error("invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("cannot resolve listing link '{href}': {reason}")]
    InvalidUrl { href: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("listing {id} not found")]
    NotFound { id: i64 },

    #[error("listing '{name}' in '{city}' rejected: {reason}")]
    InvalidRecord {
        name: String,
        city: String,
        reason: &'static str,
    },
}
