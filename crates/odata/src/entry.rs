//! One ERP record as a flat map of scalar fields.

use std::collections::BTreeMap;

use serde::Serialize;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view of the value. Text is parsed; booleans are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Number(n) => Some(*n),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Scalar::Null | Scalar::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Display form used for keys and text matching.
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// Convert a JSON value. Objects and arrays are not scalars.
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Integer(i),
                None => Scalar::Number(n.as_f64().unwrap_or(f64::NAN)),
            }),
            serde_json::Value::String(s) => Some(Scalar::Text(s.clone())),
            serde_json::Value::Object(_) | serde_json::Value::Array(_) => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A record keyed by ERP field name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Entry(BTreeMap<String, Scalar>);

impl Entry {
    pub fn new() -> Self {
        Entry(BTreeMap::new())
    }

    /// Build from a JSON object, skipping non-scalar members.
    pub fn from_json_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        Entry(
            object
                .iter()
                .filter_map(|(k, v)| Scalar::from_json(v).map(|s| (k.clone(), s)))
                .collect(),
        )
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.0.iter()
    }

    /// Text of a field; `None` for missing, null or empty values.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field)
            .map(Scalar::to_text)
            .filter(|s| !s.is_empty())
    }

    /// Numeric value of a field, `0.0` when missing or unparseable.
    pub fn number(&self, field: &str) -> f64 {
        self.get(field).and_then(Scalar::as_f64).unwrap_or(0.0)
    }

    /// Integer value of a field, when it holds one (or an integral number).
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.get(field)? {
            Scalar::Integer(i) => Some(*i),
            Scalar::Number(n) if n.fract() == 0.0 => Some(*n as i64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean flag, `None` when the field is missing or not a boolean.
    ///
    /// Cleaning coerces known flag fields to `Bool`, so this only has to
    /// read the coerced form.
    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.get(field)? {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&String, &mut Scalar) -> bool) {
        self.0.retain(keep);
    }

    pub(crate) fn get_mut(&mut self, field: &str) -> Option<&mut Scalar> {
        self.0.get_mut(field)
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

impl FromIterator<(String, Scalar)> for Entry {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Entry(iter.into_iter().collect())
    }
}
