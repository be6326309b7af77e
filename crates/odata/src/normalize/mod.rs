//! Response normalization: envelope parsing plus per-record cleanup.

mod clean;
mod json;
mod xml;

pub use clean::{
    clean, coerce_flag, format_erp_date, FLAG_FIELDS, LINE_NUMBER_FIELD, METADATA_PREFIX,
    NAME_ALIASES, NAME_FIELD, NUMERIC_FIELDS,
};
pub use json::parse_json;
pub use xml::parse_xml;

use crate::config::ResponseFormat;
use crate::entry::Entry;
use crate::error::ParseFailure;

/// Shape of a parsed envelope, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    List(Vec<Entry>),
    Singleton(Entry),
    Empty,
}

impl ResultSet {
    pub fn into_entries(self) -> Vec<Entry> {
        match self {
            ResultSet::List(entries) => entries,
            ResultSet::Singleton(entry) => vec![entry],
            ResultSet::Empty => Vec::new(),
        }
    }
}

/// Cleaned entries from one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub entries: Vec<Entry>,
    pub total_count: usize,
}

/// Parse a response body in the given format without cleaning.
pub fn parse(body: &str, format: ResponseFormat) -> Result<ResultSet, ParseFailure> {
    match format {
        ResponseFormat::Json => parse_json(body),
        ResponseFormat::Xml => parse_xml(body),
    }
}

/// Parse and clean every entry.
pub fn normalize(body: &str, format: ResponseFormat) -> Result<Parsed, ParseFailure> {
    let entries: Vec<Entry> = parse(body, format)?
        .into_entries()
        .into_iter()
        .map(clean)
        .collect();
    Ok(Parsed {
        total_count: entries.len(),
        entries,
    })
}
