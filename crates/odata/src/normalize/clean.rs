//! Per-record cleanup applied to every parsed entry.
//!
//! All conversions are best-effort: a value that does not match the
//! expected shape is left as it was. `clean` is idempotent.

use time::macros::format_description;
use time::OffsetDateTime;

use crate::entry::{Entry, Scalar};

/// Fields starting with this prefix are service metadata (`__metadata`, ...).
pub const METADATA_PREFIX: &str = "__";

/// Monetary and quantity fields converted from text to numbers.
pub const NUMERIC_FIELDS: &[&str] = &[
    "NetAmount",
    "OrderQuantity",
    "NetPriceAmount",
    "GrossAmount",
    "EffectiveAmount",
    "AvailableQuantity",
    "QuantityOnHand",
    "QuantityInEntryUnit",
    "QuantityInBaseUnit",
];

/// Completion flags that arrive as booleans, `"X"`/`""` or `"true"`/`"false"`.
pub const FLAG_FIELDS: &[&str] = &["IsCompletelyDelivered", "IsFinallyInvoiced"];

/// Order line number, converted to an integer so lines sort numerically.
pub const LINE_NUMBER_FIELD: &str = "PurchaseOrderItem";

/// Synthesized display field.
pub const NAME_FIELD: &str = "Name";

/// Description fields in priority order; the first non-empty one becomes
/// [`NAME_FIELD`]. `Name` itself is last so cleaning a cleaned entry keeps it.
pub const NAME_ALIASES: &[&str] = &[
    "PurchaseOrderItemText",
    "MaterialDescription",
    "ProductDescription",
    "MaterialName",
    "SupplierName",
    NAME_FIELD,
];

/// Normalize one record.
pub fn clean(mut entry: Entry) -> Entry {
    entry.retain(|key, _| !key.starts_with(METADATA_PREFIX));

    for key in entry.keys() {
        let lower = key.to_ascii_lowercase();
        if !(lower.ends_with("date") || lower.ends_with("datetime")) {
            continue;
        }
        if let Some(value) = entry.get_mut(&key) {
            if let Some(formatted) = value.as_str().and_then(format_erp_date) {
                *value = Scalar::Text(formatted);
            }
        }
    }

    for field in NUMERIC_FIELDS {
        if let Some(value) = entry.get_mut(field) {
            if let Some(n) = value.as_str().and_then(parse_number) {
                *value = Scalar::Number(n);
            }
        }
    }

    for field in FLAG_FIELDS {
        if let Some(value) = entry.get_mut(field) {
            if let Some(b) = coerce_flag(value) {
                *value = Scalar::Bool(b);
            }
        }
    }

    if let Some(value) = entry.get_mut(LINE_NUMBER_FIELD) {
        if let Some(n) = value.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
            *value = Scalar::Integer(n);
        }
    }

    let name = NAME_ALIASES
        .iter()
        .find_map(|alias| entry.text(alias))
        .unwrap_or_default();
    entry.insert(NAME_FIELD, name);

    entry
}

/// Convert `/Date(1609459200000)/` or `/Date(1588894563127+0000)/` to
/// `YYYY-MM-DD` (UTC). Returns `None` for anything else.
pub fn format_erp_date(value: &str) -> Option<String> {
    let inner = value.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let digits_end = inner
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(inner.len());
    let (digits, offset) = inner.split_at(digits_end);
    if digits.is_empty() {
        return None;
    }
    if !offset.is_empty() {
        let (sign, rest) = offset.split_at(1);
        if !(sign == "+" || sign == "-") || rest.len() != 4 || !rest.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let millis: i128 = digits.parse().ok()?;
    let datetime = OffsetDateTime::from_unix_timestamp_nanos(millis * 1_000_000).ok()?;
    datetime
        .format(format_description!("[year]-[month]-[day]"))
        .ok()
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// The single boolean rule applied to every completion flag.
pub fn coerce_flag(value: &Scalar) -> Option<bool> {
    match value {
        Scalar::Bool(b) => Some(*b),
        Scalar::Integer(1) => Some(true),
        Scalar::Integer(0) => Some(false),
        Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "x" | "true" | "1" => Some(true),
            "" | "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
