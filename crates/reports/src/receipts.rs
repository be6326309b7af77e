//! Goods receipts posted against purchase orders.

use std::collections::HashMap;

use serde::Serialize;
use stockwise_odata::{odata_literal, Entry, ErpClient, FetchError, QuerySpec};

use crate::entities::{GOODS_RECEIPT_MOVEMENT, MATERIAL_DOCUMENT_ITEM, RECEIPT_FIELDS, SAMPLE_CAP};
use crate::outcome::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptParams {
    pub po_number: Option<String>,
    pub limit: u32,
}

impl Default for ReceiptParams {
    fn default() -> Self {
        ReceiptParams {
            po_number: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReceiptsReport {
    pub goods_receipts: Vec<Entry>,
    pub total_records: usize,
    pub total_quantity_received: f64,
    pub filters_applied: Option<ReceiptParams>,
}

/// (purchase order, line number) a receipt was posted against.
pub type LineKey = (String, i64);

fn receipt_query(po_number: Option<&str>, top: u32) -> QuerySpec {
    let mut clauses = vec![format!("GoodsMovementType eq '{}'", GOODS_RECEIPT_MOVEMENT)];
    if let Some(po) = po_number {
        clauses.push(format!("PurchaseOrder eq '{}'", odata_literal(po)));
    }
    QuerySpec::new(MATERIAL_DOCUMENT_ITEM)
        .filter_all(&clauses)
        .select(RECEIPT_FIELDS)
        .order_by("PostingDate desc")
        .top(top)
}

pub fn goods_receipts(client: &ErpClient, params: &ReceiptParams) -> Outcome<ReceiptsReport> {
    let spec = receipt_query(params.po_number.as_deref(), params.limit);
    let receipts = match client.fetch(&spec) {
        Ok(parsed) => parsed.entries,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                ReceiptsReport::default(),
                "material document API is not available in this ERP system",
            )
        }
    };

    let total_quantity_received: f64 = receipts.iter().map(|r| r.number("QuantityInEntryUnit")).sum();
    Outcome::success(ReceiptsReport {
        total_records: receipts.len(),
        goods_receipts: receipts,
        total_quantity_received,
        filters_applied: Some(params.clone()),
    })
}

/// Received quantity per order line over the most recent receipts.
pub fn received_by_line(client: &ErpClient) -> Result<HashMap<LineKey, f64>, FetchError> {
    let receipts = client.fetch(&receipt_query(None, SAMPLE_CAP))?.entries;
    Ok(sum_by_line(&receipts))
}

fn sum_by_line(receipts: &[Entry]) -> HashMap<LineKey, f64> {
    let mut received = HashMap::new();
    for r in receipts {
        if let (Some(po), Some(item)) = (r.text("PurchaseOrder"), r.integer("PurchaseOrderItem")) {
            *received.entry((po, item)).or_insert(0.0) += r.number("QuantityInEntryUnit");
        }
    }
    received
}
