use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::str;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use xz::bufread::XzDecoder;

use crate::data::osm::{ElementChild, ElementKind, RawElement};
use crate::errors::{Error, Result};

/// Streaming reader over the top-level elements of an .osm file. Yields one
/// RawElement per node/way in document order; relations and any other element
/// kinds are skipped here so the shaping stages never see them.
pub struct OsmElementReader<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    child_buf: Vec<u8>,
}

/// Open the input as plain XML, or through an xz decoder when the path ends
/// in .xz.
pub fn open_element_reader(data_path: &str) -> Result<OsmElementReader<Box<dyn BufRead>>> {
    let file = fs::File::open(data_path)?;
    let file_reader = BufReader::new(file);
    let source: Box<dyn BufRead> = if data_path.ends_with(".xz") {
        Box::new(BufReader::new(XzDecoder::new(file_reader)))
    } else {
        Box::new(file_reader)
    };
    Ok(OsmElementReader::new(source))
}

impl<R: BufRead> OsmElementReader<R> {
    pub fn new(source: R) -> OsmElementReader<R> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        OsmElementReader {
            reader,
            buf: Vec::new(),
            child_buf: Vec::new(),
        }
    }

    fn read_raw_element(&mut self) -> Result<Option<RawElement>> {
        loop {
            self.buf.clear();
            let pending = match self.reader.read_event_into(&mut self.buf) {
                Err(e) => return Err(e.into()),
                Ok(Event::Eof) => return Ok(None),
                Ok(Event::Start(e)) => match element_kind(&e) {
                    Some(kind) => Some((kind, collect_attributes(&e)?, true)),
                    None => None,
                },
                Ok(Event::Empty(e)) => match element_kind(&e) {
                    Some(kind) => Some((kind, collect_attributes(&e)?, false)),
                    None => None,
                },
                Ok(Event::Text(_e)) => return Err("Didn't expect to see Text in OSM file.".into()),
                Ok(_) => None,
            };

            if let Some((kind, attributes, has_children)) = pending {
                let children = if has_children {
                    self.read_children(kind)?
                } else {
                    Vec::new()
                };
                return Ok(Some(RawElement { kind, attributes, children }));
            }
        }
    }

    fn read_children(&mut self, kind: ElementKind) -> Result<Vec<ElementChild>> {
        let mut children = Vec::new();
        loop {
            self.child_buf.clear();
            match self.reader.read_event_into(&mut self.child_buf) {
                Err(e) => return Err(e.into()),
                Ok(Event::Eof) => {
                    return Err(format!(
                        "Unexpected end of file inside '{}' element.",
                        kind.name()
                    ).into())
                },
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if let Some(child) = parse_child(&e)? {
                        children.push(child);
                    }
                },
                Ok(Event::End(e)) => {
                    if e.name().as_ref() == kind.name().as_bytes() {
                        return Ok(children);
                    }
                },
                Ok(Event::Text(_e)) => return Err("Didn't expect to see Text in OSM file.".into()),
                Ok(_) => (),
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmElementReader<R> {
    type Item = Result<RawElement>;

    fn next(&mut self) -> Option<Result<RawElement>> {
        match self.read_raw_element() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

fn element_kind(el: &BytesStart) -> Option<ElementKind> {
    match el.name().as_ref() {
        b"node" => Some(ElementKind::Node),
        b"way" => Some(ElementKind::Way),
        _ => None,
    }
}

fn collect_attributes(el: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attributes = HashMap::new();
    for attribute_res in el.attributes() {
        let attribute = attribute_res?;
        let key = str::from_utf8(attribute.key.as_ref())?.to_string();
        let value = attribute.unescape_value()?.into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn parse_child(el: &BytesStart) -> Result<Option<ElementChild>> {
    match el.name().as_ref() {
        b"tag" => {
            let mut key: Option<String> = None;
            let mut value: Option<String> = None;
            for attribute_res in el.attributes() {
                let attribute = attribute_res?;
                match attribute.key.as_ref() {
                    b"k" => key = Some(attribute.unescape_value()?.into_owned()),
                    b"v" => value = Some(attribute.unescape_value()?.into_owned()),
                    _ => (),
                }
            }
            let key = key.ok_or(Error::MissingAttribute { element: "tag", attribute: "k" })?;
            let value = value.ok_or(Error::MissingAttribute { element: "tag", attribute: "v" })?;
            Ok(Some(ElementChild::Tag { key, value }))
        },
        b"nd" => {
            let mut node_ref: Option<String> = None;
            for attribute_res in el.attributes() {
                let attribute = attribute_res?;
                if attribute.key.as_ref() == b"ref" {
                    node_ref = Some(attribute.unescape_value()?.into_owned());
                }
            }
            let node_ref = node_ref.ok_or(Error::MissingAttribute { element: "nd", attribute: "ref" })?;
            Ok(Some(ElementChild::NodeRef(node_ref)))
        },
        _ => Ok(None),
    }
}
