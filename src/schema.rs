use crate::errors::{Error, Result};

/// Declared field shapes for the output tables. The column order here is the
/// column order of the CSV files and of the SQL tables they are loaded into.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, kind }
}

pub const NODE_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("lat", FieldKind::Float),
    field("lon", FieldKind::Float),
    field("user", FieldKind::Text),
    field("uid", FieldKind::Integer),
    field("version", FieldKind::Text),
    field("changeset", FieldKind::Integer),
    field("timestamp", FieldKind::Text),
];

pub const NODE_TAG_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("key", FieldKind::Text),
    field("value", FieldKind::Text),
    field("type", FieldKind::Text),
];

pub const WAY_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("user", FieldKind::Text),
    field("uid", FieldKind::Integer),
    field("version", FieldKind::Text),
    field("changeset", FieldKind::Integer),
    field("timestamp", FieldKind::Text),
];

pub const WAY_TAG_FIELDS: &[FieldSpec] = NODE_TAG_FIELDS;

pub const WAY_NODE_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Integer),
    field("node_id", FieldKind::Integer),
    field("position", FieldKind::Integer),
];

pub fn header(fields: &[FieldSpec]) -> Vec<String> {
    fields.iter().map(|field| field.name.to_string()).collect()
}

/// Check one rendered row against a table's field shapes. Arity must match
/// and Integer/Float fields must parse; Text fields accept anything.
pub fn validate_row(table: &'static str, fields: &[FieldSpec], row: &[String]) -> Result<()> {
    if row.len() != fields.len() {
        return Err(Error::SchemaViolation {
            table,
            message: format!("expected {} fields, got {}", fields.len(), row.len()),
        });
    }
    for (field, value) in fields.iter().zip(row) {
        let well_formed = match field.kind {
            FieldKind::Integer => value.parse::<i64>().is_ok(),
            FieldKind::Float => value.parse::<f64>().is_ok(),
            FieldKind::Text => true,
        };
        if !well_formed {
            return Err(Error::SchemaViolation {
                table,
                message: format!(
                    "field '{}' does not parse as {:?}: '{}'",
                    field.name, field.kind, value
                ),
            });
        }
    }
    Ok(())
}
