/// Tabular output values, one struct per target table. Field values carry the
/// exact source attribute text so numbers survive to CSV unchanged; row order
/// matches the column order declared in the schema module.

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub id: String,
    pub lat: String,
    pub lon: String,
    pub user: String,
    pub uid: String,
    pub version: String,
    pub changeset: String,
    pub timestamp: String,
}

impl NodeRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.lat.clone(),
            self.lon.clone(),
            self.user.clone(),
            self.uid.clone(),
            self.version.clone(),
            self.changeset.clone(),
            self.timestamp.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WayRecord {
    pub id: String,
    pub user: String,
    pub uid: String,
    pub version: String,
    pub changeset: String,
    pub timestamp: String,
}

impl WayRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.user.clone(),
            self.uid.clone(),
            self.version.clone(),
            self.changeset.clone(),
            self.timestamp.clone(),
        ]
    }
}

/// Shared shape for node and way secondary tags.
#[derive(Debug, Clone, PartialEq)]
pub struct TagRecord {
    pub id: String,
    pub key: String,
    pub value: String,
    pub tag_type: String,
}

impl TagRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.key.clone(),
            self.value.clone(),
            self.tag_type.clone(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WayNodeRecord {
    pub id: String,
    pub node_id: String,
    pub position: usize,
}

impl WayNodeRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.node_id.clone(),
            self.position.to_string(),
        ]
    }
}

/// The grouped output for one source element: the primary record plus every
/// row that references its id.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapedElement {
    Node {
        node: NodeRecord,
        tags: Vec<TagRecord>,
    },
    Way {
        way: WayRecord,
        tags: Vec<TagRecord>,
        way_nodes: Vec<WayNodeRecord>,
    },
}
