use std::collections::HashMap;

/// Elements as they appear in the .osm file, before any shaping. Attributes
/// are kept as raw strings; children keep document order.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
}

impl ElementKind {
    pub fn name(self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementChild {
    Tag { key: String, value: String },
    NodeRef(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawElement {
    pub kind: ElementKind,
    pub attributes: HashMap<String, String>,
    pub children: Vec<ElementChild>,
}
