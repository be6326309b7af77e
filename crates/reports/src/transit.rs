//! Quantities ordered but not yet completely delivered, by material or by order.

use serde::Serialize;
use stockwise_odata::{Entry, ErpClient, QuerySpec};

use crate::entities::{PURCHASE_ORDER_ITEM_PROCESS, SAMPLE_CAP};
use crate::outcome::Outcome;
use crate::pipeline::{fetch_sample, group_lines, not_delivered, Sample};

/// Order lines with their completion flags.
///
/// No `$select`: the delivery flag only comes back reliably when every
/// field is requested.
pub fn open_lines_query() -> QuerySpec {
    QuerySpec::new(PURCHASE_ORDER_ITEM_PROCESS)
        .order_by("PurchaseOrder desc")
        .top(SAMPLE_CAP)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLineRef {
    pub purchase_order: String,
    pub item: Option<i64>,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialInTransit {
    pub material: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub total_in_transit_qty: f64,
    pub related_orders: Vec<OrderLineRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialsInTransit {
    pub materials_in_transit: Vec<MaterialInTransit>,
    pub total_materials: usize,
    pub lines_analyzed: usize,
    pub sample_truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineInTransit {
    pub item: Option<i64>,
    pub material: Option<String>,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub plant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderInTransit {
    pub purchase_order: String,
    pub total_quantity: f64,
    pub items_in_transit: Vec<LineInTransit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrdersInTransit {
    pub orders_in_transit: Vec<OrderInTransit>,
    pub total_orders: usize,
    pub lines_analyzed: usize,
    pub sample_truncated: bool,
}

const UNAVAILABLE: &str = "purchase order item API is not available in this ERP system";

pub fn group_by_material(lines: &[Entry]) -> Vec<MaterialInTransit> {
    group_lines(
        lines,
        not_delivered,
        |l| l.text("Material"),
        |material, l| MaterialInTransit {
            material: material.to_string(),
            description: l.text("PurchaseOrderItemText"),
            unit: l.text("PurchaseOrderQuantityUnit"),
            total_in_transit_qty: 0.0,
            related_orders: Vec::new(),
        },
        |acc, l| {
            let quantity = l.number("OrderQuantity");
            acc.total_in_transit_qty += quantity;
            acc.related_orders.push(OrderLineRef {
                purchase_order: l.text("PurchaseOrder").unwrap_or_default(),
                item: l.integer("PurchaseOrderItem"),
                quantity,
            });
        },
    )
}

pub fn group_by_order(lines: &[Entry]) -> Vec<OrderInTransit> {
    group_lines(
        lines,
        not_delivered,
        |l| l.text("PurchaseOrder"),
        |po, _| OrderInTransit {
            purchase_order: po.to_string(),
            total_quantity: 0.0,
            items_in_transit: Vec::new(),
        },
        |acc, l| {
            let quantity = l.number("OrderQuantity");
            acc.total_quantity += quantity;
            acc.items_in_transit.push(LineInTransit {
                item: l.integer("PurchaseOrderItem"),
                material: l.text("Material"),
                description: l.text("PurchaseOrderItemText"),
                quantity,
                unit: l.text("PurchaseOrderQuantityUnit"),
                plant: l.text("Plant"),
            });
        },
    )
}

pub fn materials_in_transit(client: &ErpClient, limit: u32) -> Outcome<MaterialsInTransit> {
    let sample: Sample = match fetch_sample(client, &open_lines_query()) {
        Ok(sample) => sample,
        Err(err) => return Outcome::from_fetch_error(&err, MaterialsInTransit::default(), UNAVAILABLE),
    };
    let mut materials = group_by_material(&sample.lines);
    let total_materials = materials.len();
    materials.truncate(limit as usize);
    Outcome::success(MaterialsInTransit {
        materials_in_transit: materials,
        total_materials,
        lines_analyzed: sample.lines.len(),
        sample_truncated: sample.truncated(),
    })
}

pub fn orders_in_transit(client: &ErpClient, limit: u32) -> Outcome<OrdersInTransit> {
    let sample = match fetch_sample(client, &open_lines_query()) {
        Ok(sample) => sample,
        Err(err) => return Outcome::from_fetch_error(&err, OrdersInTransit::default(), UNAVAILABLE),
    };
    let mut orders = group_by_order(&sample.lines);
    let total_orders = orders.len();
    orders.truncate(limit as usize);
    Outcome::success(OrdersInTransit {
        orders_in_transit: orders,
        total_orders,
        lines_analyzed: sample.lines.len(),
        sample_truncated: sample.truncated(),
    })
}
