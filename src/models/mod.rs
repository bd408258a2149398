use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag shown on a listing once the property is sold
pub const TAG_SOLD: &str = "Verkocht";
/// Tag shown on a listing once the property is rented out
pub const TAG_RENTED: &str = "Verhuurd";
/// Tag written by the sweeper when the detail page no longer resolves
pub const TAG_REMOVED: &str = "Property Removed";

/// Kind of property, inferred from the detail URL
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    House,
    Apartment,
    #[default]
    Unknown,
}

impl PropertyType {
    /// Infer the type from the detail URL path ("/appartement-" or "/huis-")
    pub fn from_url(url: &str) -> Self {
        if url.contains("/appartement-") {
            PropertyType::Apartment
        } else if url.contains("/huis-") {
            PropertyType::House
        } else {
            PropertyType::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::House => "house",
            PropertyType::Apartment => "apartment",
            PropertyType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed snapshot of a listing on a search result page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub name: String,
    pub property_type: PropertyType,
    pub postal_code_number: String,
    pub postal_code_letters: String,
    pub city: String,
    pub province: String,
    /// Municipality the postal code belongs to
    pub region: String,
    pub price: Option<f64>,
    /// Living area in m²
    pub area: Option<f64>,
    pub room_count: Option<u32>,
    pub energy_rating: Option<String>,
    pub detail_url: String,
    pub estate_agent: Option<String>,
    pub tags: Vec<String>,
}

impl ListingRecord {
    pub fn identity(&self) -> ListingIdentity {
        ListingIdentity::of(&self.name, &self.city)
    }

    /// Whether the listing's badges mark it as sold or rented
    pub fn is_sold(&self) -> bool {
        tags_mark_sold(&self.tags)
    }

    /// Tags in their stored, comma-joined form
    pub fn joined_tags(&self) -> String {
        join_tags(&self.tags)
    }
}

/// Normalized (name, city) pair used to recognize the same listing across pages and runs.
///
/// Two listings with equal identity are treated as the same property even when other
/// fields differ. Distinct properties sharing name and city collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingIdentity {
    name: String,
    city: String,
}

impl ListingIdentity {
    pub fn of(name: &str, city: &str) -> Self {
        Self {
            name: normalize(name),
            city: normalize(city),
        }
    }

    /// Single-string form used as the unique key in storage. Parts are joined with
    /// the unit separator, which normalization strips from the parts themselves.
    pub fn as_key(&self) -> String {
        format!("{}{}{}", self.name, KEY_SEPARATOR, self.city)
    }
}

impl fmt::Display for ListingIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.city)
    }
}

const KEY_SEPARATOR: char = '\u{1f}';

fn normalize(value: &str) -> String {
    value
        .replace(|c: char| c.is_control() && !c.is_whitespace(), "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A listing as held by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedListing {
    pub id: i64,
    pub record: ListingRecord,
    pub sold: bool,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

/// Status transition written back by the sweeper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub sold: bool,
    pub tags: Vec<String>,
    pub updated_at: NaiveDate,
}

pub fn tags_mark_sold(tags: &[String]) -> bool {
    tags.iter()
        .any(|tag| tag.contains(TAG_SOLD) || tag.contains(TAG_RENTED))
}

pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

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
            detail_url: "https://www.funda.nl/detail/koop/amsterdam/huis-kerkstraat-1/43000001/"
                .to_string(),
            estate_agent: Some("Makelaardij Centrum".to_string()),
            tags: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn property_type_from_url() {
        assert_eq!(
            PropertyType::from_url("https://www.funda.nl/detail/koop/utrecht/appartement-oudegracht-12/1/"),
            PropertyType::Apartment
        );
        assert_eq!(
            PropertyType::from_url("https://www.funda.nl/detail/koop/utrecht/huis-dorpsstraat-3/2/"),
            PropertyType::House
        );
        assert_eq!(
            PropertyType::from_url("https://www.funda.nl/detail/koop/utrecht/parkeergelegenheid-3/2/"),
            PropertyType::Unknown
        );
    }

    #[test]
    fn identity_ignores_case_and_whitespace() {
        let a = ListingIdentity::of("Kerkstraat 1", "Amsterdam");
        let b = ListingIdentity::of("  kerkstraat   1 ", "AMSTERDAM");
        assert_eq!(a, b);
        assert_eq!(a.as_key(), "kerkstraat 1\u{1f}amsterdam");
    }

    #[test]
    fn storage_key_keeps_parts_apart() {
        let a = ListingIdentity::of("a|b", "c");
        let b = ListingIdentity::of("a", "b|c");
        assert_ne!(a, b);
        assert_ne!(a.as_key(), b.as_key());

        let c = ListingIdentity::of("a\u{1f}b", "c");
        let d = ListingIdentity::of("a", "b\u{1f}c");
        assert_ne!(c.as_key(), d.as_key());
        assert_eq!(c.as_key(), "ab\u{1f}c");
    }

    #[test]
    fn identity_differs_by_city() {
        let a = ListingIdentity::of("Kerkstraat 1", "Amsterdam");
        let b = ListingIdentity::of("Kerkstraat 1", "Haarlem");
        assert_ne!(a, b);
    }

    #[test]
    fn sold_derived_from_tags() {
        let mut listing = record("Kerkstraat 1", "Amsterdam");
        listing.tags = vec!["Verkocht".to_string()];
        assert!(listing.is_sold());

        listing.tags = vec!["Verhuurd".to_string()];
        assert!(listing.is_sold());

        listing.tags = vec!["Verkocht onder voorbehoud".to_string()];
        assert!(listing.is_sold());

        listing.tags = vec!["Nieuw".to_string()];
        assert!(!listing.is_sold());

        listing.tags.clear();
        assert!(!listing.is_sold());
    }

    #[test]
    fn tags_are_comma_joined() {
        let tags = vec!["Nieuw".to_string(), "Open huis".to_string()];
        assert_eq!(join_tags(&tags), "Nieuw, Open huis");
        assert_eq!(join_tags(&[]), "");
    }
}
