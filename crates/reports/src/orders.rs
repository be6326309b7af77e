//! Purchase order listing and search.

use serde::Serialize;
use stockwise_odata::{odata_literal, Entry, ErpClient, QuerySpec};
use time::macros::format_description;
use time::Date;

use crate::entities::{LIST_FIELDS, PURCHASE_ORDER, PURCHASE_ORDER_ITEM, SAMPLE_CAP, SEARCH_FIELDS};
use crate::outcome::{ErrorInfo, Outcome};

// ── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListParams {
    pub limit: u32,
    /// `YYYY-MM-DD`, inclusive.
    pub date_from: Option<String>,
    pub supplier: Option<String>,
    /// Echoed back only; the header entity has no status field to filter on.
    pub status: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        ListParams {
            limit: 20,
            date_from: None,
            supplier: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderList {
    pub purchase_orders: Vec<Entry>,
    pub total_count: usize,
    pub filters_applied: Option<ListParams>,
}

fn validate_date(raw: &str) -> Result<Date, ErrorInfo> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| ErrorInfo {
        message: format!("date_from must be YYYY-MM-DD, got '{}': {}", raw, e),
        details: None,
    })
}

pub fn list_orders(client: &ErpClient, params: &ListParams) -> Outcome<OrderList> {
    let mut clauses = Vec::new();
    if let Some(raw) = params.date_from.as_deref() {
        let date = match validate_date(raw) {
            Ok(date) => date,
            Err(info) => return Outcome::error(info),
        };
        clauses.push(format!("PurchaseOrderDate ge datetime'{}T00:00:00'", date));
    }
    if let Some(supplier) = params.supplier.as_deref() {
        clauses.push(format!("Supplier eq '{}'", odata_literal(supplier)));
    }

    let spec = QuerySpec::new(PURCHASE_ORDER)
        .filter_all(&clauses)
        .select(LIST_FIELDS)
        .order_by("PurchaseOrderDate desc")
        .top(params.limit);

    match client.fetch(&spec) {
        Ok(parsed) => Outcome::success(OrderList {
            total_count: parsed.entries.len(),
            purchase_orders: parsed.entries,
            filters_applied: Some(params.clone()),
        }),
        Err(err) => Outcome::from_fetch_error(
            &err,
            OrderList::default(),
            "purchase order list is not available",
        ),
    }
}

// ── Search ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    PoNumber,
    Supplier,
    Material,
    #[default]
    All,
}

impl SearchField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "po_number" | "purchase_order" => Some(SearchField::PoNumber),
            "supplier" => Some(SearchField::Supplier),
            "material" => Some(SearchField::Material),
            "all" | "" => Some(SearchField::All),
            _ => None,
        }
    }

    /// Fields whose text is matched against the search term.
    fn fields(self) -> &'static [&'static str] {
        match self {
            SearchField::PoNumber => &["PurchaseOrder"],
            SearchField::Supplier => &["Supplier"],
            SearchField::Material => &["Material", "PurchaseOrderItemText"],
            SearchField::All => &["PurchaseOrder", "Supplier", "Material", "PurchaseOrderItemText"],
        }
    }

    fn matches(self, line: &Entry, needle: &str) -> bool {
        self.fields().iter().any(|f| {
            line.text(f)
                .map(|v| v.to_lowercase().contains(needle))
                .unwrap_or(false)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchParams {
    pub search_term: String,
    pub search_field: SearchField,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedLine {
    pub item: Option<i64>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    pub net_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedOrder {
    pub purchase_order: String,
    pub supplier: Option<String>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub items: Vec<MatchedLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    pub search_results: Vec<MatchedOrder>,
    pub total_orders: usize,
    /// Order lines scanned client-side.
    pub lines_scanned: usize,
    pub search_criteria: Option<SearchParams>,
}

/// Candidate lines fetched for a search returning `limit` orders.
pub fn overfetch(limit: u32) -> u32 {
    limit.saturating_mul(10).clamp(1, SAMPLE_CAP)
}

/// Case-insensitive substring search over order lines, grouped per order.
///
/// Server-side filters on the item entity behave differently across ERP
/// releases, so an over-fetched page is filtered here instead.
pub fn search_orders(client: &ErpClient, params: &SearchParams) -> Outcome<SearchResults> {
    let needle = params.search_term.trim().to_lowercase();
    if needle.is_empty() {
        return Outcome::error(ErrorInfo {
            message: "search_term must not be empty".to_string(),
            details: None,
        });
    }

    let spec = QuerySpec::new(PURCHASE_ORDER_ITEM)
        .select(SEARCH_FIELDS)
        .order_by("PurchaseOrder desc")
        .top(overfetch(params.limit));
    let lines = match client.fetch(&spec) {
        Ok(parsed) => parsed.entries,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                SearchResults::default(),
                "purchase order items are not available",
            )
        }
    };

    let limit = params.limit.max(1) as usize;
    let mut orders: Vec<MatchedOrder> = Vec::new();
    for line in lines.iter().filter(|l| params.search_field.matches(l, &needle)) {
        let Some(po) = line.text("PurchaseOrder") else { continue };
        let slot = match orders.iter().position(|o| o.purchase_order == po) {
            Some(i) => i,
            None if orders.len() < limit => {
                orders.push(MatchedOrder {
                    purchase_order: po,
                    supplier: line.text("Supplier"),
                    currency: line.text("DocumentCurrency"),
                    date: line.text("PurchaseOrderDate"),
                    items: Vec::new(),
                });
                orders.len() - 1
            }
            None => break,
        };
        orders[slot].items.push(MatchedLine {
            item: line.integer("PurchaseOrderItem"),
            material: line.text("Material"),
            description: line.text("PurchaseOrderItemText"),
            quantity: line.number("OrderQuantity"),
            net_amount: line.number("NetAmount"),
        });
    }

    Outcome::success(SearchResults {
        total_orders: orders.len(),
        search_results: orders,
        lines_scanned: lines.len(),
        search_criteria: Some(params.clone()),
    })
}
