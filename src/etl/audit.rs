use std::collections::{BTreeMap, BTreeSet};
use std::io::BufRead;
use std::path::Path;

use log::info;
use regex::Regex;

use crate::UserConfig;
use crate::data::osm::ElementChild;
use crate::data::xref::CrossReference;
use crate::errors::Result;
use crate::etl::parse_osm::{self, OsmElementReader};
use crate::etl::Etl;

pub const ETL_NAME: &str = "audit";

pub const STREET_CANDIDATES_FILE_NAME: &str = "street_type_candidates.csv";
pub const CITY_CANDIDATES_FILE_NAME: &str = "city_candidates.csv";

const STREET_NAME_KEY: &str = "addr:street";
const CITY_NAME_KEY: &str = "addr:city";

/// Pre-shaping audit pass: collect every street-type token and city name the
/// cross-reference tables do not know yet, for offline review. The reviewed
/// decisions come back through the reconcile mode, which must be persisted
/// before the next shaping run.
pub struct AuditEtl<'a> {
    config: &'a UserConfig,
    street_type: Regex,
}

pub struct AuditInput {
    reader: OsmElementReader<Box<dyn BufRead>>,
    xref: CrossReference,
}

/// BTree-backed so candidate files come out sorted and deterministic.
#[derive(Debug, Default)]
pub struct AuditFindings {
    pub street_types: BTreeMap<String, BTreeSet<String>>,
    pub cities: BTreeSet<String>,
}

impl AuditEtl<'_> {
    pub fn new(config: &UserConfig) -> AuditEtl {
        AuditEtl {
            config,
            street_type: Regex::new(r"\b\S+\.?$").unwrap(),
        }
    }

    fn audit_street_name(&self, findings: &mut AuditFindings, xref: &CrossReference, name: &str) {
        if let Some(found) = self.street_type.find(name) {
            let token = found.as_str().to_uppercase();
            if xref.streets.lookup(&token).is_none() {
                findings
                    .street_types
                    .entry(token)
                    .or_default()
                    .insert(name.to_string());
            }
        }
    }

    fn audit_city_name(&self, findings: &mut AuditFindings, xref: &CrossReference, name: &str) {
        if xref.cities.lookup(&name.to_uppercase()).is_none() {
            findings.cities.insert(name.to_string());
        }
    }
}

impl Etl for AuditEtl<'_> {
    type Input = AuditInput;
    type Output = AuditFindings;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn output_file_names(&self) -> Vec<&'static str> {
        vec![STREET_CANDIDATES_FILE_NAME, CITY_CANDIDATES_FILE_NAME]
    }

    fn extract(&mut self, _dir: &Path) -> Result<AuditInput> {
        let reader = parse_osm::open_element_reader(&self.config.data_path)?;
        let xref = CrossReference::load(
            Path::new(&self.config.street_xref_path),
            Path::new(&self.config.city_xref_path),
        )?;
        Ok(AuditInput { reader, xref })
    }

    fn transform(&mut self, input: AuditInput) -> Result<AuditFindings> {
        let mut findings = AuditFindings::default();

        for element_res in tqdm::tqdm(input.reader) {
            let element = element_res?;
            for child in &element.children {
                if let ElementChild::Tag { key, value } = child {
                    if key == STREET_NAME_KEY {
                        self.audit_street_name(&mut findings, &input.xref, value);
                    } else if key == CITY_NAME_KEY {
                        self.audit_city_name(&mut findings, &input.xref, value);
                    }
                }
            }
        }

        info!(
            etl_name = ETL_NAME,
            street_types = findings.street_types.len() as u64,
            cities = findings.cities.len() as u64;
            "Collected unknown-value candidates"
        );
        Ok(findings)
    }

    fn load(&mut self, dir: &Path, findings: AuditFindings) -> Result<()> {
        let mut writer = csv::Writer::from_path(dir.join(STREET_CANDIDATES_FILE_NAME))?;
        writer.write_record(["StreetType", "StreetName"])?;
        for (street_type, names) in &findings.street_types {
            for name in names {
                writer.write_record([street_type.as_str(), name.as_str()])?;
            }
        }
        writer.flush()?;

        let mut writer = csv::Writer::from_path(dir.join(CITY_CANDIDATES_FILE_NAME))?;
        writer.write_record(["CityName"])?;
        for city in &findings.cities {
            writer.write_record([city.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const OSM_SAMPLE: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="36.0" lon="-115.0" user="u" uid="1" version="1" changeset="1" timestamp="t">
    <tag k="addr:street" v="Lincoln St"/>
    <tag k="addr:city" v="Las Vegas"/>
  </node>
  <way id="2" user="u" uid="1" version="1" changeset="1" timestamp="t">
    <nd ref="1"/>
    <tag k="addr:street" v="Sunset Blfd"/>
    <tag k="addr:street" v="Charleston Blfd"/>
    <tag k="addr:city" v="Vegas"/>
  </way>
</osm>
"#;

    #[test]
    fn collects_only_unknown_values() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("sample.osm");
        let street_xref_path = dir.path().join("streets.csv");
        let city_xref_path = dir.path().join("cities.csv");
        fs::write(&data_path, OSM_SAMPLE).unwrap();
        fs::write(&street_xref_path, "FullName,CommonName,USPSName\nSTREET,ST,ST\n").unwrap();
        fs::write(&city_xref_path, "OriginalName,NewName\nLAS VEGAS,LAS VEGAS\n").unwrap();

        let config = UserConfig {
            data_path: data_path.to_str().unwrap().to_string(),
            dest_path: dir.path().to_str().unwrap().to_string(),
            street_xref_path: street_xref_path.to_str().unwrap().to_string(),
            city_xref_path: city_xref_path.to_str().unwrap().to_string(),
            validate: false,
            street_decisions_path: None,
            city_decisions_path: None,
        };

        let mut etl = AuditEtl::new(&config);
        let input = etl.extract(dir.path()).unwrap();
        let findings = etl.transform(input).unwrap();

        // "St" is known, so "Lincoln St" produces no candidate; the two
        // misspelled boulevards share one unknown token.
        let tokens: Vec<&str> =
            findings.street_types.keys().map(String::as_str).collect();
        assert_eq!(tokens, vec!["BLFD"]);
        let names: Vec<&String> = findings.street_types["BLFD"].iter().collect();
        assert_eq!(names, vec!["Charleston Blfd", "Sunset Blfd"]);

        let cities: Vec<&str> = findings.cities.iter().map(String::as_str).collect();
        assert_eq!(cities, vec!["Vegas"]);
    }
}
