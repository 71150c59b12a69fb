use std::{fmt, io, str::Utf8Error};
use quick_xml::events::attributes::AttrError;

#[derive(Debug)]
pub enum Error {
    /// A required primary attribute is absent on a source element. Fatal for
    /// the whole run: dropping the primary record would leave tag and
    /// node-ref rows referencing an id that never gets written.
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    /// A rendered row does not match the declared field shapes of its table.
    SchemaViolation {
        table: &'static str,
        message: String,
    },
    Message(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MissingAttribute { element, attribute } => {
                write!(f, "required attribute '{}' missing on '{}' element", attribute, element)
            },
            Error::SchemaViolation { table, message } => {
                write!(f, "schema violation in table '{}': {}", table, message)
            },
            Error::Message(message) => f.write_str(message),
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(value: quick_xml::Error) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<AttrError> for Error {
    fn from(value: AttrError) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Message(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Message(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
