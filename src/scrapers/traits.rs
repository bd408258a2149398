use crate::error::FetchError;
use async_trait::async_trait;

/// Outcome of fetching a listing's detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPage {
    Found(String),
    /// The site redirected to a search page; the listing is gone
    Removed,
}

/// Fetches search result pages.
/// Implementations return raw HTML; parsing happens after the await completes.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_search_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches listing detail pages
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_detail(&self, url: &str) -> Result<DetailPage, FetchError>;
}

#[async_trait]
impl<'a, T: PageFetcher + ?Sized> PageFetcher for &'a T {
    async fn fetch_search_page(&self, url: &str) -> Result<String, FetchError> {
        (**self).fetch_search_page(url).await
    }
}

#[async_trait]
impl<'a, T: DetailFetcher + ?Sized> DetailFetcher for &'a T {
    async fn fetch_detail(&self, url: &str) -> Result<DetailPage, FetchError> {
        (**self).fetch_detail(url).await
    }
}
