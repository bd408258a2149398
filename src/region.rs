use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

const COL_POSTCODE: &str = "PC4";
const COL_PROVINCE: &str = "Provincie name";
const COL_MUNICIPALITY: &str = "Gemeente name";

/// Administrative region a postal code belongs to. Empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    pub province: String,
    pub municipality: String,
}

/// One row of the PC4 reference file; other columns are ignored
#[derive(Debug, Deserialize)]
struct PostcodeRow {
    #[serde(rename = "PC4")]
    postcode: String,
    #[serde(rename = "Provincie name")]
    province: String,
    #[serde(rename = "Gemeente name")]
    municipality: String,
}

/// Postal-code prefix (PC4) to region table
#[derive(Debug, Default)]
pub struct RegionLookup {
    table: HashMap<u32, Region>,
}

impl RegionLookup {
    /// Load the tab-separated PC4 reference file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open postcode table {}", path.display()))?;
        let lookup = Self::from_reader(file)
            .with_context(|| format!("Failed to parse postcode table {}", path.display()))?;
        info!(entries = lookup.len(), path = %path.display(), "Loaded postcode table");
        Ok(lookup)
    }

    pub fn from_tsv(content: &str) -> Result<Self> {
        Self::from_reader(content.as_bytes())
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .trim(csv::Trim::All)
            .from_reader(input);

        let headers = reader.headers().context("Failed to read header row")?.clone();
        if headers.is_empty() {
            bail!("postcode table is empty");
        }
        for column in [COL_POSTCODE, COL_PROVINCE, COL_MUNICIPALITY] {
            if !headers.iter().any(|h| h == column) {
                bail!("missing column '{}'", column);
            }
        }

        let mut table = HashMap::new();
        for row in reader.deserialize::<PostcodeRow>() {
            let row = row.context("Malformed postcode row")?;
            let Ok(code) = row.postcode.parse::<u32>() else {
                debug!(postcode = %row.postcode, "Skipping postcode row without PC4");
                continue;
            };

            // first row for a code wins
            table.entry(code).or_insert(Region {
                province: row.province,
                municipality: row.municipality,
            });
        }

        Ok(Self { table })
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, Region)>,
    {
        Self {
            table: entries.into_iter().collect(),
        }
    }

    /// Region for a 4-digit postal number; empty region for unknown or malformed codes
    pub fn lookup(&self, postal_code_number: &str) -> Region {
        postal_code_number
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(|code| self.table.get(&code))
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "PC4\tGemeente code\tGemeente name\tProvincie code\tProvincie name\n\
                         1011\t0363\tAmsterdam\t27\tNoord-Holland\n\
                         3511\t0344\tUtrecht\t26\tUtrecht\n\
                         \"9711\"\t\"0014\"\t\"Groningen\"\t\"20\"\t\"Groningen\"\n";

    #[test]
    fn looks_up_known_codes() {
        let lookup = RegionLookup::from_tsv(TABLE).unwrap();
        assert_eq!(lookup.len(), 3);
        assert_eq!(
            lookup.lookup("1011"),
            Region {
                province: "Noord-Holland".to_string(),
                municipality: "Amsterdam".to_string(),
            }
        );
        assert_eq!(lookup.lookup("9711").municipality, "Groningen");
    }

    #[test]
    fn unknown_or_malformed_codes_yield_empty_region() {
        let lookup = RegionLookup::from_tsv(TABLE).unwrap();
        assert_eq!(lookup.lookup("9999"), Region::default());
        assert_eq!(lookup.lookup("abcd"), Region::default());
        assert_eq!(lookup.lookup(""), Region::default());
    }

    #[test]
    fn quoted_cells_keep_tabs_and_quotes() {
        let table = "PC4\tGemeente name\tProvincie name\n\
                     5211\t\"'s-Hertogenbosch \"\"Den Bosch\"\"\"\t\"Noord-\tBrabant\"\n\
                     5211\tDuplicate\tDuplicate\n";
        let lookup = RegionLookup::from_tsv(table).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(
            lookup.lookup("5211"),
            Region {
                province: "Noord-\tBrabant".to_string(),
                municipality: "'s-Hertogenbosch \"Den Bosch\"".to_string(),
            }
        );
    }

    #[test]
    fn rows_without_numeric_code_are_skipped() {
        let table = "PC4\tGemeente name\tProvincie name\n\
                     n/a\tNergens\tNergens\n\
                     1011\tAmsterdam\tNoord-Holland\n";
        let lookup = RegionLookup::from_tsv(table).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.lookup("1011").municipality, "Amsterdam");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pc4.csv");
        std::fs::write(&path, TABLE).unwrap();
        assert_eq!(RegionLookup::from_path(&path).unwrap().len(), 3);
        assert!(RegionLookup::from_path(dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn missing_column_is_an_error() {
        assert!(RegionLookup::from_tsv("PC4\tGemeente name\n1011\tAmsterdam\n").is_err());
        assert!(RegionLookup::from_tsv("").is_err());
    }
}
