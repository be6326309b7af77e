//! Shared aggregation pipeline: fetch a page, keep the lines a report
//! cares about, group them by a key and fold each group.
//!
//! Reports differ only in the query, the predicate, the key and the fold.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use stockwise_odata::{Entry, ErpClient, FetchError, QuerySpec};

pub const DELIVERED_FLAG: &str = "IsCompletelyDelivered";
pub const INVOICED_FLAG: &str = "IsFinallyInvoiced";

// ── Completion predicates ────────────────────────────────────────────────────

/// Line is known not to be completely delivered. A missing flag is not
/// evidence either way and does not match.
pub fn not_delivered(line: &Entry) -> bool {
    line.flag(DELIVERED_FLAG) == Some(false)
}

pub fn not_invoiced(line: &Entry) -> bool {
    line.flag(INVOICED_FLAG) == Some(false)
}

/// Which incomplete lines a pending report selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingFilter {
    /// Neither delivered nor invoiced.
    #[default]
    Both,
    NotDelivered,
    NotInvoiced,
}

impl PendingFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "both" | "" => Some(PendingFilter::Both),
            "not_delivered" => Some(PendingFilter::NotDelivered),
            "not_invoiced" => Some(PendingFilter::NotInvoiced),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PendingFilter::Both => "both",
            PendingFilter::NotDelivered => "not_delivered",
            PendingFilter::NotInvoiced => "not_invoiced",
        }
    }

    pub fn matches(self, line: &Entry) -> bool {
        match self {
            PendingFilter::Both => not_delivered(line) && not_invoiced(line),
            PendingFilter::NotDelivered => not_delivered(line),
            PendingFilter::NotInvoiced => not_invoiced(line),
        }
    }

    /// The same condition as a server-side filter expression.
    pub fn server_filter(self) -> String {
        match self {
            PendingFilter::Both => format!("{} eq false and {} eq false", DELIVERED_FLAG, INVOICED_FLAG),
            PendingFilter::NotDelivered => format!("{} eq false", DELIVERED_FLAG),
            PendingFilter::NotInvoiced => format!("{} eq false", INVOICED_FLAG),
        }
    }
}

// ── Fetch ────────────────────────────────────────────────────────────────────

/// One page of lines and the page size it was requested with.
#[derive(Debug, Clone, Default)]
pub struct Sample {
    pub lines: Vec<Entry>,
    pub requested: u32,
}

impl Sample {
    /// The page came back full, so the collection may hold more lines.
    pub fn truncated(&self) -> bool {
        self.requested > 0 && self.lines.len() >= self.requested as usize
    }
}

/// Fetch one page. `spec.top` is the sample size.
pub fn fetch_sample(client: &ErpClient, spec: &QuerySpec) -> Result<Sample, FetchError> {
    let parsed = client.fetch(spec)?;
    Ok(Sample {
        lines: parsed.entries,
        requested: spec.top.unwrap_or(0),
    })
}

// ── Group ────────────────────────────────────────────────────────────────────

/// Group the lines accepted by `keep` under `key`, in first-seen order.
///
/// `open` builds a group from its first line and `add` folds every line
/// (including the first) into it. Lines without a key are skipped.
pub fn group_lines<'a, A>(
    lines: impl IntoIterator<Item = &'a Entry>,
    keep: impl Fn(&Entry) -> bool,
    key: impl Fn(&Entry) -> Option<String>,
    mut open: impl FnMut(&str, &Entry) -> A,
    mut add: impl FnMut(&mut A, &Entry),
) -> Vec<A> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<A> = Vec::new();

    for line in lines.into_iter().filter(|l| keep(*l)) {
        let Some(k) = key(line) else { continue };
        let slot = match index.get(&k) {
            Some(&i) => i,
            None => {
                groups.push(open(&k, line));
                index.insert(k, groups.len() - 1);
                groups.len() - 1
            }
        };
        add(&mut groups[slot], line);
    }
    groups
}
