use crate::error::FetchError;
use crate::scrapers::traits::{DetailFetcher, DetailPage, PageFetcher};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";

/// Path segment the site redirects to when a listing no longer exists
const SEARCH_PATH: &str = "/zoeken/";

/// reqwest-backed fetcher for search result and detail pages
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_search_page(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching URL: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }
}

#[async_trait]
impl DetailFetcher for HttpFetcher {
    async fn fetch_detail(&self, url: &str) -> Result<DetailPage, FetchError> {
        debug!("Fetching detail page: {}", url);

        let response = self.client.get(url).send().await?;
        if is_removed_redirect(response.url().path()) {
            return Ok(DetailPage::Removed);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(DetailPage::Found(response.text().await?))
    }
}

fn is_removed_redirect(final_path: &str) -> bool {
    final_path.contains(SEARCH_PATH)
}
