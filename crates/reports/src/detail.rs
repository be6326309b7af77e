//! Complete purchase order: header, ordered lines and totals.

use serde::Serialize;
use stockwise_odata::{odata_literal, Entry, ErpClient, FetchError, QuerySpec, NAME_FIELD};

use crate::entities::{HEADER_FIELDS, ITEM_FIELD_VARIANTS, PURCHASE_ORDER, PURCHASE_ORDER_ITEM};
use crate::outcome::{ErrorInfo, Outcome, Status};

/// One order line, reduced to what a reader needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub item: Option<i64>,
    pub material: Option<String>,
    pub name: String,
    pub qty: f64,
    pub uom: Option<String>,
    pub price: f64,
    pub net: f64,
    pub currency: Option<String>,
    pub tax: Option<String>,
}

impl OrderLine {
    fn from_entry(entry: &Entry) -> Self {
        OrderLine {
            item: entry.integer("PurchaseOrderItem"),
            material: entry.text("Material"),
            name: entry.text(NAME_FIELD).unwrap_or_default(),
            qty: entry.number("OrderQuantity"),
            uom: entry.text("PurchaseOrderQuantityUnit"),
            price: entry.number("NetPriceAmount"),
            net: entry.number("NetAmount"),
            currency: entry.text("DocumentCurrency"),
            tax: entry.text("TaxCode"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailSummary {
    pub po_number: String,
    pub header_found: bool,
    pub items_count: usize,
    pub total_value: f64,
    pub total_quantity: f64,
    /// Both totals are strictly positive.
    pub can_close_po: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLinks {
    pub header_url: String,
    pub items_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseOrderDetail {
    pub purchase_order: String,
    pub header: Entry,
    pub items: Vec<OrderLine>,
    pub summary: DetailSummary,
    pub links: DetailLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_error: Option<ErrorInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_error: Option<ErrorInfo>,
}

/// Sort by line number with unnumbered lines last; ties keep their order.
pub fn sort_lines(lines: &mut [OrderLine]) {
    lines.sort_by_key(|l| (l.item.is_none(), l.item.unwrap_or(0)));
}

/// Fetch the lines, trying each field variant until one is accepted.
/// Returns the last URL tried alongside the result.
fn fetch_items(client: &ErpClient, filter: &str) -> (String, Result<Vec<Entry>, FetchError>) {
    let mut last = None;
    for (i, fields) in ITEM_FIELD_VARIANTS.iter().enumerate() {
        let spec = QuerySpec::new(PURCHASE_ORDER_ITEM)
            .filter(filter)
            .select(fields)
            .order_by("PurchaseOrderItem asc");
        let url = client.url(&spec);
        match client.fetch(&spec) {
            Ok(parsed) => return (url, Ok(parsed.entries)),
            Err(err) => {
                tracing::warn!(variant = i, error = %err, "item field set rejected");
                last = Some((url, err));
            }
        }
    }
    match last {
        Some((url, err)) => (url, Err(err)),
        None => (String::new(), Ok(Vec::new())),
    }
}

/// Header and lines for `po_number`. Never fails outright: a missing
/// header or failed line fetch is reported inside the detail.
pub fn order_detail(client: &ErpClient, po_number: &str) -> Outcome<PurchaseOrderDetail> {
    let po_number = po_number.trim();
    let filter = format!("PurchaseOrder eq '{}'", odata_literal(po_number));

    let header_spec = QuerySpec::new(PURCHASE_ORDER)
        .filter(filter.as_str())
        .select(HEADER_FIELDS)
        .top(1);
    let header_url = client.url(&header_spec);
    let (header, header_error) = match client.fetch(&header_spec) {
        Ok(parsed) => (parsed.entries.into_iter().next().unwrap_or_default(), None),
        Err(err) => (Entry::new(), Some(ErrorInfo::from(&err))),
    };

    let (items_url, items) = fetch_items(client, &filter);
    let (mut lines, items_error) = match items {
        Ok(entries) => (entries.iter().map(OrderLine::from_entry).collect::<Vec<_>>(), None),
        Err(err) => (Vec::new(), Some(ErrorInfo::from(&err))),
    };
    sort_lines(&mut lines);

    let total_value: f64 = lines.iter().map(|l| l.net).sum();
    let total_quantity: f64 = lines.iter().map(|l| l.qty).sum();
    let summary = DetailSummary {
        po_number: po_number.to_string(),
        header_found: !header.is_empty(),
        items_count: lines.len(),
        total_value,
        total_quantity,
        can_close_po: total_value > 0.0 && total_quantity > 0.0,
    };

    let degraded = header_error.is_some() || items_error.is_some();
    let detail = PurchaseOrderDetail {
        purchase_order: po_number.to_string(),
        header,
        items: lines,
        summary,
        links: DetailLinks {
            header_url,
            items_url,
        },
        header_error,
        items_error,
    };

    if degraded {
        Outcome {
            status: Status::Partial,
            message: Some(format!("purchase order {} is incomplete", po_number)),
            note: Some("see header_error / items_error for the failed request".to_string()),
            details: None,
            data: Some(detail),
        }
    } else {
        Outcome::success(detail)
    }
}
