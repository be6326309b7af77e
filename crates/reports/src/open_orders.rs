//! Open purchase orders (ordered but not yet received) and their join with
//! current stock.

use std::collections::HashMap;

use serde::Serialize;
use stockwise_odata::{Entry, ErpClient, FetchError, QuerySpec};

use crate::entities::{HEADER_LABEL_FIELDS, PURCHASE_ORDER, SAMPLE_CAP};
use crate::outcome::Outcome;
use crate::pipeline::{fetch_sample, group_lines, not_delivered};
use crate::receipts::{received_by_line, LineKey};
use crate::stock::stock_by_material;
use crate::transit::open_lines_query;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenLine {
    pub item: Option<i64>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub ordered_quantity: f64,
    pub received_quantity: f64,
    pub open_quantity: f64,
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenOrder {
    pub purchase_order: String,
    pub supplier: Option<String>,
    pub order_date: Option<String>,
    pub total_open_items: usize,
    pub items: Vec<OpenLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpenOrdersReport {
    pub open_purchase_orders: Vec<OpenOrder>,
    pub total_open_orders: usize,
    pub total_open_items: usize,
    /// Received quantities come from goods receipts; false when those could
    /// not be read and every line counts as fully open.
    pub receipts_available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingOrder {
    pub purchase_order: String,
    pub supplier: Option<String>,
    pub open_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialPosition {
    pub material: String,
    pub description: Option<String>,
    pub available_quantity: f64,
    pub total_open_quantity: f64,
    pub open_orders_count: usize,
    pub open_orders: Vec<IncomingOrder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryReport {
    pub inventory_with_open_orders: Vec<MaterialPosition>,
    pub total_materials: usize,
}

/// Supplier and order date per order, from a recent header page.
#[derive(Debug, Clone, Default)]
struct HeaderLabels(HashMap<String, (Option<String>, Option<String>)>);

impl HeaderLabels {
    fn fetch(client: &ErpClient) -> Result<Self, FetchError> {
        let spec = QuerySpec::new(PURCHASE_ORDER)
            .select(HEADER_LABEL_FIELDS)
            .order_by("PurchaseOrderDate desc")
            .top(SAMPLE_CAP);
        let headers = client.fetch(&spec)?.entries;
        Ok(HeaderLabels(
            headers
                .iter()
                .filter_map(|h| {
                    let po = h.text("PurchaseOrder")?;
                    Some((po, (h.text("Supplier"), h.text("PurchaseOrderDate"))))
                })
                .collect(),
        ))
    }

    fn get(&self, po: &str) -> (Option<String>, Option<String>) {
        self.0.get(po).cloned().unwrap_or((None, None))
    }
}

/// Group not-delivered lines per order, netting received quantities.
/// Lines whose receipts already cover the ordered quantity are dropped,
/// and so are orders left with no open lines.
pub fn collect_open_orders(lines: &[Entry], received: &HashMap<LineKey, f64>) -> Vec<OpenOrder> {
    let mut orders = group_lines(
        lines,
        not_delivered,
        |l| l.text("PurchaseOrder"),
        |po, l| OpenOrder {
            purchase_order: po.to_string(),
            supplier: l.text("Supplier"),
            order_date: l.text("PurchaseOrderDate"),
            total_open_items: 0,
            items: Vec::new(),
        },
        |order, l| {
            let item = l.integer("PurchaseOrderItem");
            let ordered = l.number("OrderQuantity");
            let received_quantity = item
                .and_then(|i| received.get(&(order.purchase_order.clone(), i)))
                .copied()
                .unwrap_or(0.0);
            let open_quantity = (ordered - received_quantity).max(0.0);
            if open_quantity <= 0.0 {
                return;
            }
            order.items.push(OpenLine {
                item,
                material: l.text("Material"),
                description: l.text("PurchaseOrderItemText"),
                ordered_quantity: ordered,
                received_quantity,
                open_quantity,
                unit: l.text("PurchaseOrderQuantityUnit"),
            });
            order.total_open_items = order.items.len();
        },
    );
    orders.retain(|o| !o.items.is_empty());
    orders
}

/// Open orders with receipts and header labels joined in. Only the line
/// fetch is required; receipts and headers are best effort.
fn open_orders(client: &ErpClient) -> Result<(Vec<OpenOrder>, bool), FetchError> {
    let sample = fetch_sample(client, &open_lines_query())?;

    let (received, receipts_available) = match received_by_line(client) {
        Ok(received) => (received, true),
        Err(err) => {
            tracing::warn!(error = %err, "goods receipts unavailable; treating lines as unreceived");
            (HashMap::new(), false)
        }
    };
    let labels = HeaderLabels::fetch(client).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "order headers unavailable; supplier and date omitted");
        HeaderLabels::default()
    });

    let mut orders = collect_open_orders(&sample.lines, &received);
    for order in &mut orders {
        let (supplier, date) = labels.get(&order.purchase_order);
        order.supplier = order.supplier.take().or(supplier);
        order.order_date = order.order_date.take().or(date);
    }
    Ok((orders, receipts_available))
}

pub fn open_purchase_orders(client: &ErpClient, limit: u32) -> Outcome<OpenOrdersReport> {
    let (mut orders, receipts_available) = match open_orders(client) {
        Ok(result) => result,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                OpenOrdersReport::default(),
                "purchase order item API is not available in this ERP system",
            )
        }
    };
    orders.truncate(limit as usize);
    let total_open_items: usize = orders.iter().map(|o| o.total_open_items).sum();
    let report = OpenOrdersReport {
        total_open_orders: orders.len(),
        open_purchase_orders: orders,
        total_open_items,
        receipts_available,
    };
    if receipts_available {
        Outcome::success(report)
    } else {
        Outcome::success(report).with_note(
            "goods receipts could not be read; open quantities equal ordered quantities",
        )
    }
}

/// Materials with both stock and open orders, in stock order.
pub fn join_stock_with_orders(
    stock: &[crate::stock::MaterialStock],
    orders: &[OpenOrder],
) -> Vec<MaterialPosition> {
    let mut incoming: HashMap<&str, Vec<IncomingOrder>> = HashMap::new();
    for order in orders {
        for line in &order.items {
            let Some(material) = line.material.as_deref() else { continue };
            let bucket = incoming.entry(material).or_default();
            match bucket.iter_mut().find(|o| o.purchase_order == order.purchase_order) {
                Some(existing) => existing.open_quantity += line.open_quantity,
                None => bucket.push(IncomingOrder {
                    purchase_order: order.purchase_order.clone(),
                    supplier: order.supplier.clone(),
                    open_quantity: line.open_quantity,
                }),
            }
        }
    }

    stock
        .iter()
        .filter_map(|s| {
            let open_orders = incoming.remove(s.material.as_str())?;
            Some(MaterialPosition {
                material: s.material.clone(),
                description: s.description.clone(),
                available_quantity: s.available_quantity,
                total_open_quantity: open_orders.iter().map(|o| o.open_quantity).sum(),
                open_orders_count: open_orders.len(),
                open_orders,
            })
        })
        .collect()
}

pub fn inventory_with_open_orders(client: &ErpClient, limit: u32) -> Outcome<InventoryReport> {
    let stock = match stock_by_material(client) {
        Ok(stock) => stock,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                InventoryReport::default(),
                "stock API may not be available in this ERP system",
            )
        }
    };
    let (orders, _) = match open_orders(client) {
        Ok(result) => result,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                InventoryReport::default(),
                "purchase order item API is not available in this ERP system",
            )
        }
    };

    let mut positions = join_stock_with_orders(&stock, &orders);
    let total_materials = positions.len();
    positions.truncate(limit as usize);
    Outcome::success(InventoryReport {
        inventory_with_open_orders: positions,
        total_materials,
    })
}
