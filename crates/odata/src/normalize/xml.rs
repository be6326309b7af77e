//! Atom feed parsing. One entry per `<entry>`, fields taken from the direct
//! children of its `<properties>` element. Namespace prefixes are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ResultSet;
use crate::entry::{Entry, Scalar};
use crate::error::ParseFailure;

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn is_null(start: &BytesStart<'_>) -> bool {
    start
        .attributes()
        .flatten()
        .any(|a| a.key.local_name().as_ref() == b"null" && a.value.as_ref() == b"true")
}

#[derive(Default)]
struct EntryState {
    depth: usize,
    entry: Entry,
    has_properties: bool,
}

pub fn parse_xml(body: &str) -> Result<ResultSet, ParseFailure> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut root_is_entry = false;
    let mut depth = 0usize;
    let mut current: Option<EntryState> = None;
    let mut properties_depth: Option<usize> = None;
    let mut field: Option<(String, String, bool)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ParseFailure::new(
                format!("xml error at position {}: {}", reader.buffer_position(), e),
                body,
            )
        })?;

        match event {
            Event::Start(start) => {
                depth += 1;
                let name = local_name(&start);
                if current.is_none() && name == "entry" {
                    root_is_entry = depth == 1;
                    current = Some(EntryState {
                        depth,
                        ..EntryState::default()
                    });
                } else if current.is_some() && properties_depth.is_none() && name == "properties" {
                    properties_depth = Some(depth);
                    if let Some(state) = current.as_mut() {
                        state.has_properties = true;
                    }
                } else if properties_depth == Some(depth - 1) {
                    field = Some((name, String::new(), is_null(&start)));
                }
            }
            Event::Empty(start) => {
                if properties_depth == Some(depth) {
                    let value = if is_null(&start) {
                        Scalar::Null
                    } else {
                        Scalar::Text(String::new())
                    };
                    if let Some(state) = current.as_mut() {
                        state.entry.insert(local_name(&start), value);
                    }
                } else if current.is_some() && properties_depth.is_none() && local_name(&start) == "properties" {
                    if let Some(state) = current.as_mut() {
                        state.has_properties = true;
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, value, _)) = field.as_mut() {
                    if properties_depth.map(|p| p + 1) == Some(depth) {
                        let unescaped = text
                            .unescape()
                            .map_err(|e| ParseFailure::new(e.to_string(), body))?;
                        value.push_str(&unescaped);
                    }
                }
            }
            Event::CData(data) => {
                if let Some((_, value, _)) = field.as_mut() {
                    if properties_depth.map(|p| p + 1) == Some(depth) {
                        value.push_str(&String::from_utf8_lossy(&data));
                    }
                }
            }
            Event::End(_) => {
                if properties_depth.map(|p| p + 1) == Some(depth) {
                    if let (Some((name, value, null)), Some(state)) = (field.take(), current.as_mut()) {
                        let scalar = if null && value.is_empty() {
                            Scalar::Null
                        } else {
                            Scalar::Text(value)
                        };
                        state.entry.insert(name, scalar);
                    }
                }
                if properties_depth == Some(depth) {
                    properties_depth = None;
                }
                if current.as_ref().map(|s| s.depth) == Some(depth) {
                    if let Some(state) = current.take() {
                        if state.has_properties {
                            entries.push(state.entry);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(match entries.len() {
        0 => ResultSet::Empty,
        1 if root_is_entry => ResultSet::Singleton(entries.remove(0)),
        _ => ResultSet::List(entries),
    })
}
