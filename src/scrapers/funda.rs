use crate::error::ExtractError;
use crate::models::{ListingRecord, PropertyType};
use crate::region::RegionLookup;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub const SITE_ROOT: &str = "https://www.funda.nl";

const AREA_UNIT: &str = "m²";

/// Result of parsing one optional field of a listing card
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<T> {
    Parsed(T),
    /// Text was present but did not parse
    Unparseable { raw: String },
    Absent,
}

impl<T> FieldValue<T> {
    pub fn value(self) -> Option<T> {
        match self {
            FieldValue::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn unparseable_raw(&self) -> Option<&str> {
        match self {
            FieldValue::Unparseable { raw } => Some(raw),
            _ => None,
        }
    }
}

/// A listing pulled from a result card, with the optional fields that failed to parse
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub record: ListingRecord,
    pub unparseable: Vec<(&'static str, String)>,
}

/// CSS selectors for the search result page layout
pub struct ListingSelectors {
    card: Selector,
    address_link: Selector,
    name: Selector,
    postal_city: Selector,
    price: Selector,
    features: Selector,
    estate_agent: Selector,
    tags: Selector,
    energy_rating: Regex,
}

impl ListingSelectors {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            card: compile("div.gap-3:nth-child(3) > div")?,
            address_link: compile(r#"h2 a[data-testid="listingDetailsAddress"]"#)?,
            name: compile("h2 a div.flex.font-semibold span.truncate")?,
            postal_city: compile("div.truncate.text-neutral-80")?,
            price: compile("div.mt-2 .truncate")?,
            features: compile("ul li")?,
            estate_agent: compile(r#"a[href*="/makelaar/"] span"#)?,
            tags: compile(r#"div.absolute[class*="left-2"] span"#)?,
            energy_rating: Regex::new(r"^[A-Z]\+*$").map_err(|e| ExtractError::InvalidSelector {
                selector: "energy rating pattern".to_string(),
                reason: e.to_string(),
            })?,
        })
    }
}

pub(crate) fn compile(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Turns search result pages into listing records
pub struct FundaExtractor {
    selectors: ListingSelectors,
    regions: Arc<RegionLookup>,
    site_root: Url,
}

impl FundaExtractor {
    pub fn new(regions: Arc<RegionLookup>) -> Result<Self, ExtractError> {
        Ok(Self {
            selectors: ListingSelectors::new()?,
            regions,
            site_root: site_root()?,
        })
    }

    /// Extract every result card on a page. One entry per card, in page order;
    /// an empty vector means the page had no results.
    pub fn extract_page(&self, html: &str) -> Vec<Result<Extraction, ExtractError>> {
        let document = Html::parse_document(html);
        let cards: Vec<ElementRef> = document.select(&self.selectors.card).collect();
        debug!("Found {} listing cards", cards.len());

        cards.into_iter().map(|card| self.extract_card(card)).collect()
    }

    /// Extract a single result card. Required fields missing fail the card;
    /// optional fields fall back to `None`.
    pub fn extract_card(&self, card: ElementRef) -> Result<Extraction, ExtractError> {
        let sel = &self.selectors;

        let link = card
            .select(&sel.address_link)
            .next()
            .ok_or(ExtractError::MissingField { field: "address link" })?;
        let href = link
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(ExtractError::MissingField { field: "detail url" })?;
        let detail_url = absolute_url(&self.site_root, href)?;

        let name = card
            .select(&sel.name)
            .next()
            .map(text_of)
            .ok_or(ExtractError::MissingField { field: "name" })?;
        if name.is_empty() {
            return Err(ExtractError::EmptyField { field: "name" });
        }

        let postal_city = link
            .select(&sel.postal_city)
            .next()
            .map(text_of)
            .ok_or(ExtractError::MissingField { field: "postal code" })?;
        let (postal_code_number, postal_code_letters, city) = split_postal_city(&postal_city)?;

        let price = card
            .select(&sel.price)
            .next()
            .map(|el| parse_price(&text_of(el)))
            .unwrap_or(FieldValue::Absent);

        let features: Vec<String> = card
            .select(&sel.features)
            .map(text_of)
            .filter(|f| !f.is_empty())
            .collect();
        let scan = scan_features(&features, &sel.energy_rating);

        let estate_agent = card
            .select(&sel.estate_agent)
            .next()
            .map(text_of)
            .filter(|a| !a.is_empty());

        let tags: Vec<String> = card
            .select(&sel.tags)
            .map(text_of)
            .filter(|t| !t.is_empty())
            .collect();

        let mut unparseable = Vec::new();
        for (field, raw) in [
            ("price", price.unparseable_raw()),
            ("area", scan.area.unparseable_raw()),
            ("room count", scan.room_count.unparseable_raw()),
        ] {
            if let Some(raw) = raw {
                unparseable.push((field, raw.to_string()));
            }
        }

        let region = self.regions.lookup(&postal_code_number);

        Ok(Extraction {
            record: ListingRecord {
                name,
                property_type: PropertyType::from_url(&detail_url),
                postal_code_number,
                postal_code_letters,
                city,
                province: region.province,
                region: region.municipality,
                price: price.value(),
                area: scan.area.value(),
                room_count: scan.room_count.value(),
                energy_rating: scan.energy_rating,
                detail_url,
                estate_agent,
                tags,
            },
            unparseable,
        })
    }
}

/// Visible text of an element with surrounding whitespace removed
pub(crate) fn text_of(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn site_root() -> Result<Url, ExtractError> {
    Url::parse(SITE_ROOT).map_err(|e| ExtractError::InvalidUrl {
        href: SITE_ROOT.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a card link against the site root. Only http(s) links with a host are accepted.
pub fn absolute_url(base: &Url, href: &str) -> Result<String, ExtractError> {
    let invalid = |reason: String| ExtractError::InvalidUrl {
        href: href.to_string(),
        reason,
    };

    let url = base.join(href).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid(format!("unsupported link {}", url)));
    }
    Ok(url.into())
}

/// Split "1011 AB Amsterdam" into number, letters and city
pub fn split_postal_city(raw: &str) -> Result<(String, String, String), ExtractError> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(ExtractError::InvalidPostalCity {
            raw: raw.to_string(),
        });
    }
    let city = parts[2..].join(" ");
    if city.is_empty() {
        return Err(ExtractError::EmptyField { field: "city" });
    }
    Ok((parts[0].to_string(), parts[1].to_string(), city))
}

/// Parse "€ 450.000 k.k." style prices. `.` is a thousands separator.
pub fn parse_price(text: &str) -> FieldValue<f64> {
    let text = text.trim();
    if text.is_empty() {
        return FieldValue::Absent;
    }

    let without_currency = text.replace('€', " ");
    let token = without_currency
        .split_whitespace()
        .find(|t| t.starts_with(|c: char| c.is_ascii_digit()));

    let Some(token) = token else {
        return FieldValue::Unparseable {
            raw: text.to_string(),
        };
    };

    let numeric: String = token
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalized = numeric
        .trim_end_matches(|c: char| c == '.' || c == ',')
        .replace('.', "")
        .replace(',', ".");

    match normalized.parse::<f64>() {
        Ok(price) => FieldValue::Parsed(price),
        Err(_) => FieldValue::Unparseable {
            raw: text.to_string(),
        },
    }
}

/// Values derived from a card's feature list
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureScan {
    pub area: FieldValue<f64>,
    pub room_count: FieldValue<u32>,
    pub energy_rating: Option<String>,
}

/// Each value comes from the first feature that looks like it, so feature
/// order on the card decides between competing candidates.
pub fn scan_features(features: &[String], energy_rating: &Regex) -> FeatureScan {
    let area = features
        .iter()
        .find(|f| f.contains(AREA_UNIT))
        .map(|f| parse_area(f))
        .unwrap_or(FieldValue::Absent);

    let room_count = features
        .iter()
        .find(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()))
        .map(|f| match f.parse::<u32>() {
            Ok(n) => FieldValue::Parsed(n),
            Err(_) => FieldValue::Unparseable { raw: f.clone() },
        })
        .unwrap_or(FieldValue::Absent);

    let energy_rating = features
        .iter()
        .find(|f| energy_rating.is_match(f))
        .cloned();

    FeatureScan {
        area,
        room_count,
        energy_rating,
    }
}

fn parse_area(feature: &str) -> FieldValue<f64> {
    let cleaned = feature.replace(AREA_UNIT, "").trim().replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(area) => FieldValue::Parsed(area),
        Err(_) => FieldValue::Unparseable {
            raw: feature.to_string(),
        },
    }
}
