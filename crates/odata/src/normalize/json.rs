//! OData v2 JSON envelopes: `{"d": {"results": [...]}}`, `{"d": {"results": {...}}}`
//! or a single object directly under `d`.

use serde_json::Value;

use super::ResultSet;
use crate::entry::Entry;
use crate::error::ParseFailure;

pub fn parse_json(body: &str) -> Result<ResultSet, ParseFailure> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| ParseFailure::new(e.to_string(), body))?;
    let root = root
        .as_object()
        .ok_or_else(|| ParseFailure::new("top-level JSON value is not an object", body))?;

    let d = match root.get("d").and_then(Value::as_object) {
        Some(d) => d,
        None => return Ok(ResultSet::Empty),
    };

    match d.get("results") {
        Some(Value::Array(items)) => Ok(ResultSet::List(
            items
                .iter()
                .filter_map(Value::as_object)
                .map(Entry::from_json_object)
                .collect(),
        )),
        Some(Value::Object(single)) => Ok(ResultSet::Singleton(Entry::from_json_object(single))),
        Some(_) => Ok(ResultSet::Empty),
        None if d.is_empty() => Ok(ResultSet::Empty),
        None => Ok(ResultSet::Singleton(Entry::from_json_object(d))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_array() {
        let body = r#"{"d":{"results":[{"PurchaseOrder":"1"},{"PurchaseOrder":"2"},"junk"]}}"#;
        match parse_json(body).unwrap() {
            ResultSet::List(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[1].text("PurchaseOrder").as_deref(), Some("2"));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn results_object_is_singleton() {
        let body = r#"{"d":{"results":{"PurchaseOrder":"1"}}}"#;
        assert!(matches!(parse_json(body).unwrap(), ResultSet::Singleton(_)));
    }

    #[test]
    fn bare_object_under_d_is_singleton() {
        let body = r#"{"d":{"PurchaseOrder":"4500000520","Supplier":"17300001"}}"#;
        match parse_json(body).unwrap() {
            ResultSet::Singleton(entry) => {
                assert_eq!(entry.text("Supplier").as_deref(), Some("17300001"))
            }
            other => panic!("expected singleton, got {:?}", other),
        }
    }

    #[test]
    fn missing_or_empty_envelope_is_empty() {
        for body in [r#"{}"#, r#"{"d":{}}"#, r#"{"d":[]}"#, r#"{"d":{"results":null}}"#] {
            assert_eq!(parse_json(body).unwrap(), ResultSet::Empty, "{}", body);
        }
    }

    #[test]
    fn malformed_json_reports_preview() {
        let err = parse_json("<html>gateway timeout</html>").unwrap_err();
        assert_eq!(err.preview, "<html>gateway timeout</html>");
    }

    #[test]
    fn non_object_root_is_parse_failure() {
        assert!(parse_json("[1,2]").is_err());
    }
}
