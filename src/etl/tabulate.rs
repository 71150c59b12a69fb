use std::io::BufRead;
use std::path::Path;

use log::info;

use crate::UserConfig;
use crate::data::records::ShapedElement;
use crate::data::xref::CrossReference;
use crate::errors::Result;
use crate::etl::parse_osm::{self, OsmElementReader};
use crate::etl::shape::ElementShaper;
use crate::etl::Etl;
use crate::schema::{self, FieldSpec};

pub const ETL_NAME: &str = "tabulate";

pub const NODES_FILE_NAME: &str = "nodes.csv";
pub const NODE_TAGS_FILE_NAME: &str = "nodes_tags.csv";
pub const WAYS_FILE_NAME: &str = "ways.csv";
pub const WAY_NODES_FILE_NAME: &str = "ways_nodes.csv";
pub const WAY_TAGS_FILE_NAME: &str = "ways_tags.csv";

/// The shaping pipeline: stream elements out of the source file, shape each
/// one as it is read, and write the five output tables.
pub struct TabulateEtl<'a> {
    config: &'a UserConfig,
}

pub struct TabulateInput {
    reader: OsmElementReader<Box<dyn BufRead>>,
    xref: CrossReference,
}

#[derive(Debug, Default)]
pub struct Tables {
    nodes: Vec<Vec<String>>,
    node_tags: Vec<Vec<String>>,
    ways: Vec<Vec<String>>,
    way_nodes: Vec<Vec<String>>,
    way_tags: Vec<Vec<String>>,
}

impl TabulateEtl<'_> {
    pub fn new(config: &UserConfig) -> TabulateEtl {
        TabulateEtl { config }
    }

    fn append_shaped(&self, tables: &mut Tables, shaped: ShapedElement) -> Result<()> {
        match shaped {
            ShapedElement::Node { node, tags } => {
                let row = node.to_row();
                if self.config.validate {
                    schema::validate_row("nodes", schema::NODE_FIELDS, &row)?;
                }
                tables.nodes.push(row);
                for tag in tags {
                    let row = tag.to_row();
                    if self.config.validate {
                        schema::validate_row("nodes_tags", schema::NODE_TAG_FIELDS, &row)?;
                    }
                    tables.node_tags.push(row);
                }
            },
            ShapedElement::Way { way, tags, way_nodes } => {
                let row = way.to_row();
                if self.config.validate {
                    schema::validate_row("ways", schema::WAY_FIELDS, &row)?;
                }
                tables.ways.push(row);
                for tag in tags {
                    let row = tag.to_row();
                    if self.config.validate {
                        schema::validate_row("ways_tags", schema::WAY_TAG_FIELDS, &row)?;
                    }
                    tables.way_tags.push(row);
                }
                for way_node in way_nodes {
                    let row = way_node.to_row();
                    if self.config.validate {
                        schema::validate_row("ways_nodes", schema::WAY_NODE_FIELDS, &row)?;
                    }
                    tables.way_nodes.push(row);
                }
            },
        }
        Ok(())
    }
}

fn write_table(path: &Path, fields: &[FieldSpec], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(schema::header(fields))?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl Etl for TabulateEtl<'_> {
    type Input = TabulateInput;
    type Output = Tables;

    fn etl_name(&self) -> &str {
        ETL_NAME
    }

    fn output_file_names(&self) -> Vec<&'static str> {
        vec![
            NODES_FILE_NAME,
            NODE_TAGS_FILE_NAME,
            WAYS_FILE_NAME,
            WAY_NODES_FILE_NAME,
            WAY_TAGS_FILE_NAME,
        ]
    }

    fn extract(&mut self, _dir: &Path) -> Result<TabulateInput> {
        let reader = parse_osm::open_element_reader(&self.config.data_path)?;
        let xref = CrossReference::load(
            Path::new(&self.config.street_xref_path),
            Path::new(&self.config.city_xref_path),
        )?;
        Ok(TabulateInput { reader, xref })
    }

    fn transform(&mut self, input: TabulateInput) -> Result<Tables> {
        let shaper = ElementShaper::new(input.xref);
        let mut tables = Tables::default();

        for element_res in tqdm::tqdm(input.reader) {
            let element = element_res?;
            let shaped = shaper.shape(&element)?;
            self.append_shaped(&mut tables, shaped)?;
        }

        info!(
            etl_name = ETL_NAME,
            nodes = tables.nodes.len() as u64,
            node_tags = tables.node_tags.len() as u64,
            ways = tables.ways.len() as u64,
            way_nodes = tables.way_nodes.len() as u64,
            way_tags = tables.way_tags.len() as u64;
            "Shaped all elements"
        );
        Ok(tables)
    }

    fn load(&mut self, dir: &Path, tables: Tables) -> Result<()> {
        write_table(&dir.join(NODES_FILE_NAME), schema::NODE_FIELDS, &tables.nodes)?;
        write_table(&dir.join(NODE_TAGS_FILE_NAME), schema::NODE_TAG_FIELDS, &tables.node_tags)?;
        write_table(&dir.join(WAYS_FILE_NAME), schema::WAY_FIELDS, &tables.ways)?;
        write_table(&dir.join(WAY_NODES_FILE_NAME), schema::WAY_NODE_FIELDS, &tables.way_nodes)?;
        write_table(&dir.join(WAY_TAGS_FILE_NAME), schema::WAY_TAG_FIELDS, &tables.way_tags)?;
        Ok(())
    }
}
