//! Order lines awaiting delivery and/or invoice.
//!
//! Two passes over the same predicate: an analysis pass over the largest
//! page the ERP serves, for system-wide statistics, then a detail pass of
//! at most `limit` lines for display. Rows shown are re-checked against
//! the predicate so they always agree with the statistics.

use serde::{Serialize, Serializer};
use stockwise_odata::{Entry, ErpClient, QuerySpec};

use crate::entities::{PURCHASE_ORDER_ITEM_PROCESS, SAMPLE_CAP};
use crate::outcome::Outcome;
use crate::pipeline::{
    fetch_sample, group_lines, not_delivered, not_invoiced, PendingFilter, Sample, DELIVERED_FLAG,
    INVOICED_FLAG,
};

const TOP_ORDERS: usize = 10;

/// Size of the analysis sample: exact, or `"300+"` when the page was full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    Exact(usize),
    AtLeast(usize),
}

impl Serialize for SampleCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SampleCount::Exact(n) => serializer.serialize_u64(*n as u64),
            SampleCount::AtLeast(n) => serializer.serialize_str(&format!("{}+", n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderPattern {
    pub purchase_order: String,
    pub pending_items: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Patterns {
    pub total_unique_pos: usize,
    pub pos_with_issues: usize,
    /// Share of sampled lines pending both delivery and invoice, in
    /// percent, rounded to one decimal.
    pub percentage_with_issues: f64,
    pub top_orders: Vec<OrderPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PendingSummary {
    pub sample_size: usize,
    pub sample_truncated: bool,
    pub total_not_delivered: usize,
    pub total_not_invoiced: usize,
    pub total_both_pending: usize,
    /// Lines in the sample matching the requested filter.
    pub total_matching: usize,
    pub patterns: Patterns,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingLine {
    pub purchase_order: String,
    pub item: Option<i64>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub net_price: f64,
    pub delivered: Option<bool>,
    pub invoiced: Option<bool>,
}

impl PendingLine {
    fn from_entry(entry: &Entry) -> Self {
        PendingLine {
            purchase_order: entry.text("PurchaseOrder").unwrap_or_default(),
            item: entry.integer("PurchaseOrderItem"),
            material: entry.text("Material"),
            description: entry.text("PurchaseOrderItemText"),
            quantity: entry.number("OrderQuantity"),
            unit: entry.text("PurchaseOrderQuantityUnit"),
            net_price: entry.number("NetPriceAmount"),
            delivered: entry.flag(DELIVERED_FLAG),
            invoiced: entry.flag(INVOICED_FLAG),
        }
    }
}

/// Displayed lines, keyed by what they are waiting for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PendingItems {
    #[serde(rename = "items_pending_both")]
    Both(Vec<PendingLine>),
    #[serde(rename = "items_awaiting_delivery")]
    NotDelivered(Vec<PendingLine>),
    #[serde(rename = "items_awaiting_invoice")]
    NotInvoiced(Vec<PendingLine>),
}

impl Default for PendingItems {
    fn default() -> Self {
        PendingItems::Both(Vec::new())
    }
}

impl PendingItems {
    fn new(filter: PendingFilter, lines: Vec<PendingLine>) -> Self {
        match filter {
            PendingFilter::Both => PendingItems::Both(lines),
            PendingFilter::NotDelivered => PendingItems::NotDelivered(lines),
            PendingFilter::NotInvoiced => PendingItems::NotInvoiced(lines),
        }
    }

    pub fn lines(&self) -> &[PendingLine] {
        match self {
            PendingItems::Both(l) | PendingItems::NotDelivered(l) | PendingItems::NotInvoiced(l) => l,
        }
    }
}

/// Where the displayed lines came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailSource {
    #[default]
    DetailQuery,
    /// The filtered detail query was rejected; lines come from the
    /// analysis sample instead.
    AnalysisSample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingReport {
    pub filter_type: PendingFilter,
    pub total_items_in_system: SampleCount,
    pub summary: PendingSummary,
    #[serde(flatten)]
    pub items: PendingItems,
    pub items_shown: usize,
    pub detail_source: DetailSource,
}

impl Default for PendingReport {
    fn default() -> Self {
        PendingReport {
            filter_type: PendingFilter::Both,
            total_items_in_system: SampleCount::Exact(0),
            summary: PendingSummary::default(),
            items: PendingItems::default(),
            items_shown: 0,
            detail_source: DetailSource::default(),
        }
    }
}

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Statistics over the analysis sample.
pub fn summarize(sample: &Sample, filter: PendingFilter) -> PendingSummary {
    let lines = &sample.lines;
    let count = |pred: &dyn Fn(&Entry) -> bool| lines.iter().filter(|l| pred(*l)).count();

    let total_both_pending = count(&|l| PendingFilter::Both.matches(l));
    let percentage_with_issues = if lines.is_empty() {
        0.0
    } else {
        round1(total_both_pending as f64 / lines.len() as f64 * 100.0)
    };

    let mut per_order = group_lines(
        lines,
        |_| true,
        |l| l.text("PurchaseOrder"),
        |po, _| OrderPattern {
            purchase_order: po.to_string(),
            pending_items: 0,
        },
        |acc, l| {
            if filter.matches(l) {
                acc.pending_items += 1;
            }
        },
    );
    let total_unique_pos = per_order.len();
    per_order.retain(|o| o.pending_items > 0);
    let pos_with_issues = per_order.len();
    per_order.sort_by(|a, b| b.pending_items.cmp(&a.pending_items));
    per_order.truncate(TOP_ORDERS);

    PendingSummary {
        sample_size: lines.len(),
        sample_truncated: sample.truncated(),
        total_not_delivered: count(&not_delivered),
        total_not_invoiced: count(&not_invoiced),
        total_both_pending,
        total_matching: count(&|l| filter.matches(l)),
        patterns: Patterns {
            total_unique_pos,
            pos_with_issues,
            percentage_with_issues,
            top_orders: per_order,
        },
    }
}

pub fn orders_awaiting(client: &ErpClient, limit: u32, filter: PendingFilter) -> Outcome<PendingReport> {
    let analysis_spec = QuerySpec::new(PURCHASE_ORDER_ITEM_PROCESS)
        .order_by("PurchaseOrder desc")
        .top(SAMPLE_CAP);
    let sample = match fetch_sample(client, &analysis_spec) {
        Ok(sample) => sample,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                PendingReport {
                    filter_type: filter,
                    items: PendingItems::new(filter, Vec::new()),
                    ..PendingReport::default()
                },
                "purchase order item API is not available in this ERP system",
            )
        }
    };
    let summary = summarize(&sample, filter);

    let detail_spec = QuerySpec::new(PURCHASE_ORDER_ITEM_PROCESS)
        .filter(filter.server_filter())
        .order_by("PurchaseOrder desc")
        .top(limit.max(1));
    let (detail, detail_source) = match client.fetch(&detail_spec) {
        Ok(parsed) => (parsed.entries, DetailSource::DetailQuery),
        Err(err) => {
            tracing::warn!(error = %err, "detail query rejected; using analysis sample");
            (sample.lines.clone(), DetailSource::AnalysisSample)
        }
    };
    let shown: Vec<PendingLine> = detail
        .iter()
        .filter(|l| filter.matches(l))
        .take(limit as usize)
        .map(PendingLine::from_entry)
        .collect();

    let total_items_in_system = if sample.truncated() {
        SampleCount::AtLeast(sample.lines.len())
    } else {
        SampleCount::Exact(sample.lines.len())
    };

    tracing::debug!(
        sample = sample.lines.len(),
        both = summary.total_both_pending,
        shown = shown.len(),
        "pending analysis"
    );

    Outcome::success(PendingReport {
        filter_type: filter,
        total_items_in_system,
        summary,
        items_shown: shown.len(),
        items: PendingItems::new(filter, shown),
        detail_source,
    })
}
