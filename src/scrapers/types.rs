use std::path::PathBuf;
use std::time::Duration;

/// Nationwide search for houses and apartments published in the last 5 days.
/// The result page number is appended.
pub const DEFAULT_SEARCH_URL: &str = "https://www.funda.nl/zoeken/koop?selected_area=[%22nl%22]&object_type=[%22house%22,%22apartment%22]&publication_date=%225%22&search_result=";

pub const DEFAULT_MAX_PAGES: u32 = 666;

/// Search parameters for one scrape run
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Search URL prefixes; each gets `1..=max_pages` appended
    pub search_urls: Vec<String>,
    /// Hard cap on result pages per search URL
    pub max_pages: u32,
    /// Politeness delay after each processed result page
    pub page_delay: Duration,
}

impl SearchParams {
    pub fn page_url(base_url: &str, page: u32) -> String {
        format!("{}{}", base_url, page)
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search_urls: vec![DEFAULT_SEARCH_URL.to_string()],
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::from_secs(10),
        }
    }
}

/// Restricts a sweep to listings whose city, province or region contains the text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepFilter {
    pub location_contains: Option<String>,
}

impl SweepFilter {
    pub fn location(text: impl Into<String>) -> Self {
        Self {
            location_contains: Some(text.into()),
        }
    }

    pub fn matches(&self, city: &str, province: &str, region: &str) -> bool {
        match &self.location_contains {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [city, province, region]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Settings for the status sweep
#[derive(Debug, Clone)]
pub struct SweepSettings {
    /// Politeness delay after each listing
    pub item_delay: Duration,
    /// Report of failed items, rewritten every sweep
    pub error_report: PathBuf,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(1),
            error_report: PathBuf::from("errors.txt"),
        }
    }
}
