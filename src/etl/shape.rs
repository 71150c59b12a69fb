use regex::Regex;

use crate::data::osm::{ElementChild, ElementKind, RawElement};
use crate::data::records::{
    NodeRecord, ShapedElement, TagRecord, WayNodeRecord, WayRecord,
};
use crate::data::xref::CrossReference;
use crate::errors::{Error, Result};

pub const DEFAULT_TAG_TYPE: &str = "regular";

const STREET_TAG_TYPE: &str = "street";
const CITY_TAG_TYPE: &str = "city";

/// Turns one RawElement into its grouped tabular records: the primary record
/// for the element kind, one TagRecord per usable secondary tag, and (for
/// ways) one WayNodeRecord per node reference.
pub struct ElementShaper {
    problem_chars: Regex,
    street_type: Regex,
    xref: CrossReference,
}

impl ElementShaper {
    pub fn new(xref: CrossReference) -> ElementShaper {
        ElementShaper {
            problem_chars: Regex::new(r#"[=\+/&<>;'"\?%#$@,\. \t\r\n]"#).unwrap(),
            street_type: Regex::new(r"\b\S+\.?$").unwrap(),
            xref,
        }
    }

    /// Decide whether a raw tag key is usable and split it into its type and
    /// local key. A key carrying a disallowed character anywhere in the
    /// string drops the whole tag. The first ':' splits type from key; any
    /// further ':' stay embedded in the key.
    pub fn filter_and_split_key(&self, raw_key: &str) -> Option<(String, String)> {
        if self.problem_chars.is_match(raw_key) {
            return None;
        }
        match raw_key.split_once(':') {
            Some((tag_type, key)) => Some((tag_type.to_string(), key.to_string())),
            None => Some((DEFAULT_TAG_TYPE.to_string(), raw_key.to_string())),
        }
    }

    /// Uppercase the value, rewriting street and city values against the
    /// cross-reference tables. A lookup miss leaves the uppercased value
    /// unchanged.
    pub fn normalize_value(&self, tag_type: &str, raw_value: &str) -> String {
        let value = raw_value.to_uppercase();
        match tag_type {
            STREET_TAG_TYPE => self.normalize_street(&value),
            CITY_TAG_TYPE => self.normalize_city(&value),
            _ => value,
        }
    }

    fn normalize_street(&self, value: &str) -> String {
        // The trailing whitespace-delimited token is the probable street
        // type. Splice the full form over the matched span only.
        if let Some(found) = self.street_type.find(value) {
            if let Some(full_form) = self.xref.streets.lookup(found.as_str()) {
                let mut replaced = String::with_capacity(value.len() + full_form.len());
                replaced.push_str(&value[..found.start()]);
                replaced.push_str(full_form);
                replaced.push_str(&value[found.end()..]);
                return replaced.to_uppercase();
            }
        }
        value.to_string()
    }

    fn normalize_city(&self, value: &str) -> String {
        match self.xref.cities.lookup(value) {
            Some(canonical) => canonical.to_string(),
            None => value.to_string(),
        }
    }

    pub fn shape(&self, element: &RawElement) -> Result<ShapedElement> {
        match element.kind {
            ElementKind::Node => self.shape_node(element),
            ElementKind::Way => self.shape_way(element),
        }
    }

    fn shape_node(&self, element: &RawElement) -> Result<ShapedElement> {
        let node = NodeRecord {
            id: require_attribute(element, "id")?,
            lat: require_attribute(element, "lat")?,
            lon: require_attribute(element, "lon")?,
            user: require_attribute(element, "user")?,
            uid: require_attribute(element, "uid")?,
            version: require_attribute(element, "version")?,
            changeset: require_attribute(element, "changeset")?,
            timestamp: require_attribute(element, "timestamp")?,
        };
        let tags = self.shape_tags(&node.id, element);
        Ok(ShapedElement::Node { node, tags })
    }

    fn shape_way(&self, element: &RawElement) -> Result<ShapedElement> {
        let way = WayRecord {
            id: require_attribute(element, "id")?,
            user: require_attribute(element, "user")?,
            uid: require_attribute(element, "uid")?,
            version: require_attribute(element, "version")?,
            changeset: require_attribute(element, "changeset")?,
            timestamp: require_attribute(element, "timestamp")?,
        };
        let tags = self.shape_tags(&way.id, element);
        let way_nodes = shape_way_nodes(&way.id, element);
        Ok(ShapedElement::Way { way, tags, way_nodes })
    }

    fn shape_tags(&self, owner_id: &str, element: &RawElement) -> Vec<TagRecord> {
        let mut tags = Vec::new();
        for child in &element.children {
            if let ElementChild::Tag { key, value } = child {
                if let Some((tag_type, key)) = self.filter_and_split_key(key) {
                    let value = self.normalize_value(&tag_type, value);
                    tags.push(TagRecord {
                        id: owner_id.to_string(),
                        key,
                        value,
                        tag_type,
                    });
                }
            }
        }
        tags
    }
}

fn shape_way_nodes(owner_id: &str, element: &RawElement) -> Vec<WayNodeRecord> {
    let mut way_nodes = Vec::new();
    let mut position = 0;
    for child in &element.children {
        if let ElementChild::NodeRef(node_ref) = child {
            way_nodes.push(WayNodeRecord {
                id: owner_id.to_string(),
                node_id: node_ref.clone(),
                position,
            });
            position += 1;
        }
    }
    way_nodes
}

fn require_attribute(element: &RawElement, name: &'static str) -> Result<String> {
    match element.attributes.get(name) {
        Some(value) => Ok(value.clone()),
        None => Err(Error::MissingAttribute {
            element: element.kind.name(),
            attribute: name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::data::xref::{CityXref, StreetXref};

    fn plain_shaper() -> ElementShaper {
        ElementShaper::new(CrossReference::default())
    }

    fn vegas_shaper() -> ElementShaper {
        let mut streets = StreetXref::default();
        streets.insert("ST", "ST", "STREET");
        streets.insert("", "BLVD", "BOULEVARD");
        let mut cities = CityXref::default();
        cities.insert("LAS VEGAS", "LAS VEGAS");
        cities.insert("N LAS VEGAS", "NORTH LAS VEGAS");
        ElementShaper::new(CrossReference { streets, cities })
    }

    fn node_attributes() -> HashMap<String, String> {
        [
            ("id", "757860928"),
            ("lat", "36.1147374"),
            ("lon", "-115.1720102"),
            ("user", "uboot"),
            ("uid", "26299"),
            ("version", "2"),
            ("changeset", "5288876"),
            ("timestamp", "2010-07-22T16:16:51Z"),
        ]
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    fn way_attributes() -> HashMap<String, String> {
        [
            ("id", "209809850"),
            ("user", "vegas-buildings"),
            ("uid", "674454"),
            ("version", "1"),
            ("changeset", "15353317"),
            ("timestamp", "2013-03-13T15:58:04Z"),
        ]
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }

    #[test]
    fn keys_with_disallowed_characters_are_rejected() {
        let shaper = plain_shaper();
        for raw_key in [
            "addr street",
            "addr=street",
            "a+b",
            "a/b",
            "a&b",
            "a<b",
            "a>b",
            "a;b",
            "it's",
            "a\"b",
            "what?",
            "100%",
            "a#b",
            "a$b",
            "a@b",
            "a,b",
            "addr.street",
            "a\tb",
            "a\rb",
            "a\nb",
        ] {
            assert_eq!(shaper.filter_and_split_key(raw_key), None, "key: {:?}", raw_key);
        }
    }

    #[test]
    fn first_separator_splits_type_from_key() {
        let shaper = plain_shaper();
        assert_eq!(
            shaper.filter_and_split_key("addr:street:name"),
            Some((String::from("addr"), String::from("street:name")))
        );
    }

    #[test]
    fn key_without_separator_gets_default_type() {
        let shaper = plain_shaper();
        assert_eq!(
            shaper.filter_and_split_key("amenity"),
            Some((String::from("regular"), String::from("amenity")))
        );
    }

    #[test]
    fn regular_normalization_is_idempotent() {
        let shaper = plain_shaper();
        let once = shaper.normalize_value("regular", "fast_food");
        assert_eq!(once, "FAST_FOOD");
        assert_eq!(shaper.normalize_value("regular", &once), once);
    }

    #[test]
    fn street_type_is_rewritten_to_full_form() {
        let shaper = vegas_shaper();
        assert_eq!(shaper.normalize_value("street", "Lincoln St"), "LINCOLN STREET");
    }

    #[test]
    fn street_rewrite_touches_only_the_trailing_token() {
        let shaper = vegas_shaper();
        assert_eq!(
            shaper.normalize_value("street", "St Rose Pkwy St"),
            "ST ROSE PKWY STREET"
        );
    }

    #[test]
    fn usps_column_is_a_fallback() {
        let shaper = vegas_shaper();
        assert_eq!(
            shaper.normalize_value("street", "Sunset Blvd"),
            "SUNSET BOULEVARD"
        );
    }

    #[test]
    fn unknown_street_type_passes_through_uppercased() {
        let shaper = vegas_shaper();
        assert_eq!(shaper.normalize_value("street", "Main Zzz"), "MAIN ZZZ");
    }

    #[test]
    fn known_city_is_replaced_with_canonical_name() {
        let shaper = vegas_shaper();
        assert_eq!(shaper.normalize_value("city", "n las vegas"), "NORTH LAS VEGAS");
    }

    #[test]
    fn unknown_city_passes_through_uppercased() {
        let shaper = vegas_shaper();
        assert_eq!(shaper.normalize_value("city", "Vegas"), "VEGAS");
    }

    #[test]
    fn shapes_node_with_secondary_tag() {
        let shaper = plain_shaper();
        let element = RawElement {
            kind: ElementKind::Node,
            attributes: node_attributes(),
            children: vec![ElementChild::Tag {
                key: String::from("amenity"),
                value: String::from("fast_food"),
            }],
        };

        let shaped = shaper.shape(&element).unwrap();
        match shaped {
            ShapedElement::Node { node, tags } => {
                assert_eq!(node.id, "757860928");
                assert_eq!(node.lat, "36.1147374");
                assert_eq!(node.user, "uboot");
                assert_eq!(
                    tags,
                    vec![TagRecord {
                        id: String::from("757860928"),
                        key: String::from("amenity"),
                        value: String::from("FAST_FOOD"),
                        tag_type: String::from("regular"),
                    }]
                );
            },
            other => panic!("expected a node, got {:?}", other),
        }
    }

    #[test]
    fn rejected_tag_emits_no_record() {
        let shaper = plain_shaper();
        let element = RawElement {
            kind: ElementKind::Node,
            attributes: node_attributes(),
            children: vec![ElementChild::Tag {
                key: String::from("addr.street"),
                value: String::from("Lincoln St"),
            }],
        };

        match shaper.shape(&element).unwrap() {
            ShapedElement::Node { tags, .. } => assert!(tags.is_empty()),
            other => panic!("expected a node, got {:?}", other),
        }
    }

    #[test]
    fn way_node_positions_are_sequential_with_duplicates_kept() {
        let shaper = plain_shaper();
        let element = RawElement {
            kind: ElementKind::Way,
            attributes: way_attributes(),
            children: vec![
                ElementChild::NodeRef(String::from("10")),
                ElementChild::Tag {
                    key: String::from("building"),
                    value: String::from("yes"),
                },
                ElementChild::NodeRef(String::from("20")),
                ElementChild::NodeRef(String::from("10")),
            ],
        };

        match shaper.shape(&element).unwrap() {
            ShapedElement::Way { way, tags, way_nodes } => {
                assert_eq!(way.id, "209809850");
                assert_eq!(tags.len(), 1);
                let node_ids: Vec<&str> =
                    way_nodes.iter().map(|way_node| way_node.node_id.as_str()).collect();
                let positions: Vec<usize> =
                    way_nodes.iter().map(|way_node| way_node.position).collect();
                assert_eq!(node_ids, vec!["10", "20", "10"]);
                assert_eq!(positions, vec![0, 1, 2]);
            },
            other => panic!("expected a way, got {:?}", other),
        }
    }

    #[test]
    fn missing_primary_attribute_is_fatal() {
        let shaper = plain_shaper();
        let mut attributes = node_attributes();
        attributes.remove("uid");
        let element = RawElement {
            kind: ElementKind::Node,
            attributes,
            children: Vec::new(),
        };

        match shaper.shape(&element) {
            Err(Error::MissingAttribute { element, attribute }) => {
                assert_eq!(element, "node");
                assert_eq!(attribute, "uid");
            },
            other => panic!("expected a missing attribute error, got {:?}", other),
        }
    }
}
