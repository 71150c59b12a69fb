use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Curated lookup tables mapping non-canonical values to canonical forms.
/// Built offline (audit + reconcile), loaded once per run, read-only while
/// shaping.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetXrefRow {
    #[serde(rename = "FullName")]
    pub full_name: String,
    #[serde(rename = "CommonName")]
    pub common_name: String,
    #[serde(rename = "USPSName")]
    pub usps_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityXrefRow {
    #[serde(rename = "OriginalName")]
    pub original_name: String,
    #[serde(rename = "NewName")]
    pub new_name: String,
}

/// A reviewed decision produced by the offline reconciliation workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewedMapping {
    #[serde(rename = "OriginalValue")]
    pub original_value: String,
    #[serde(rename = "MappedValue")]
    pub mapped_value: String,
}

#[derive(Debug, Default, Clone)]
pub struct StreetXref {
    by_common: HashMap<String, String>,
    by_usps: HashMap<String, String>,
}

impl StreetXref {
    pub fn insert(&mut self, common_name: &str, usps_name: &str, full_name: &str) {
        if !common_name.is_empty() {
            self.by_common.insert(common_name.to_uppercase(), full_name.to_string());
        }
        if !usps_name.is_empty() {
            self.by_usps.insert(usps_name.to_uppercase(), full_name.to_string());
        }
    }

    /// Expects an already-uppercased street-type token. The common-name
    /// column wins over the USPS column when both carry the token.
    pub fn lookup(&self, street_type: &str) -> Option<&str> {
        self.by_common
            .get(street_type)
            .or_else(|| self.by_usps.get(street_type))
            .map(String::as_str)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CityXref {
    by_original: HashMap<String, String>,
}

impl CityXref {
    pub fn insert(&mut self, original_name: &str, new_name: &str) {
        self.by_original.insert(original_name.to_uppercase(), new_name.to_string());
    }

    /// Expects an already-uppercased original city name.
    pub fn lookup(&self, original_name: &str) -> Option<&str> {
        self.by_original.get(original_name).map(String::as_str)
    }
}

#[derive(Debug, Default, Clone)]
pub struct CrossReference {
    pub streets: StreetXref,
    pub cities: CityXref,
}

impl CrossReference {
    pub fn load(street_path: &Path, city_path: &Path) -> Result<CrossReference> {
        let mut streets = StreetXref::default();
        let mut street_reader = csv::Reader::from_path(street_path)?;
        for row_res in street_reader.deserialize() {
            let row: StreetXrefRow = row_res?;
            streets.insert(&row.common_name, &row.usps_name, &row.full_name);
        }

        let mut cities = CityXref::default();
        let mut city_reader = csv::Reader::from_path(city_path)?;
        for row_res in city_reader.deserialize() {
            let row: CityXrefRow = row_res?;
            cities.insert(&row.original_name, &row.new_name);
        }

        info!(
            streets = streets.by_common.len() as u64,
            cities = cities.by_original.len() as u64;
            "Loaded cross-reference tables"
        );
        Ok(CrossReference { streets, cities })
    }
}

fn read_decisions(decisions_path: &Path) -> Result<Vec<ReviewedMapping>> {
    let mut reader = csv::Reader::from_path(decisions_path)?;
    let mut decisions = Vec::new();
    for row_res in reader.deserialize() {
        decisions.push(row_res?);
    }
    Ok(decisions)
}

/// Append reviewed street-type decisions to the street table. Decisions whose
/// original token is already present (in either key column) are skipped, so
/// re-running with the same decisions file is a no-op. Returns the number of
/// rows appended.
pub fn apply_street_decisions(xref_path: &Path, decisions_path: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(xref_path)?;
    let mut rows: Vec<StreetXrefRow> = Vec::new();
    for row_res in reader.deserialize() {
        rows.push(row_res?);
    }

    let mut added = 0;
    for decision in read_decisions(decisions_path)? {
        let original = decision.original_value.to_uppercase();
        let known = rows.iter().any(|row| {
            row.common_name.to_uppercase() == original || row.usps_name.to_uppercase() == original
        });
        if known {
            continue;
        }
        rows.push(StreetXrefRow {
            full_name: decision.mapped_value.to_uppercase(),
            common_name: original.clone(),
            usps_name: original,
        });
        added += 1;
    }

    let mut writer = csv::Writer::from_path(xref_path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(added)
}

/// Same contract as apply_street_decisions, for the city table.
pub fn apply_city_decisions(xref_path: &Path, decisions_path: &Path) -> Result<usize> {
    let mut reader = csv::Reader::from_path(xref_path)?;
    let mut rows: Vec<CityXrefRow> = Vec::new();
    for row_res in reader.deserialize() {
        rows.push(row_res?);
    }

    let mut added = 0;
    for decision in read_decisions(decisions_path)? {
        let original = decision.original_value.to_uppercase();
        let known = rows.iter().any(|row| row.original_name.to_uppercase() == original);
        if known {
            continue;
        }
        rows.push(CityXrefRow {
            original_name: original,
            new_name: decision.mapped_value.to_uppercase(),
        });
        added += 1;
    }

    let mut writer = csv::Writer::from_path(xref_path)?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(added)
}
