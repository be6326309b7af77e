//! Report integration tests against canned OData responses.
//!
//! A routing executor answers each request from the first route whose
//! pattern occurs in the URL; unrouted URLs get HTTP 404, like an entity
//! the tenant does not expose.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};
use stockwise_odata::{
    Credentials, ErpClient, ErpConfig, HttpExecutor, HttpReply, NetworkFailure, RetryPolicy,
};
use stockwise_reports::{dispatch, order_detail, Status};

// ──────────────────────────────────────────────
// Fixture executor
// ──────────────────────────────────────────────

#[derive(Clone, Default)]
struct Router {
    routes: Arc<Vec<(String, u16, String)>>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl Router {
    fn new(routes: &[(&str, u16, String)]) -> Self {
        Router {
            routes: Arc::new(
                routes
                    .iter()
                    .map(|(p, s, b)| (p.to_string(), *s, b.clone()))
                    .collect(),
            ),
            seen: Arc::default(),
        }
    }

    fn urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn client(&self) -> ErpClient {
        let mut config = ErpConfig::new(
            "erp.example.com",
            Credentials::Basic {
                user: "PURCHASER".into(),
                password: "secret".into(),
            },
        );
        config.retry = RetryPolicy {
            timeout: Duration::from_secs(1),
            max_attempts: 2,
            initial_backoff: Duration::ZERO,
        };
        ErpClient::with_executor(Arc::new(config), Box::new(self.clone()))
    }
}

impl HttpExecutor for Router {
    fn get(
        &self,
        url: &str,
        _headers: &[(&'static str, String)],
        _timeout: Duration,
    ) -> Result<HttpReply, NetworkFailure> {
        self.seen.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .routes
            .iter()
            .find(|(pattern, _, _)| url.contains(pattern.as_str()))
            .map(|(_, s, b)| (*s, b.clone()))
            .unwrap_or((404, r#"{"error":{"message":"Resource not found"}}"#.to_string()));
        Ok(HttpReply { status, body })
    }
}

fn results(rows: Value) -> String {
    json!({ "d": { "results": rows } }).to_string()
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

const HEADER: &str = "I_PurchaseOrder?";
const ITEMS: &str = "I_PurchaseOrderItem?";
const PROCESS_ITEMS: &str = "A_PurchaseOrderItem?";
const STOCK: &str = "A_MaterialStock?";
const RECEIPTS: &str = "A_MaterialDocumentItem?";

fn process_line(po: &str, item: &str, material: &str, qty: &str, delivered: Value, invoiced: Value) -> Value {
    json!({
        "__metadata": {"type": "API_PURCHASEORDER_PROCESS_SRV.A_PurchaseOrderItemType"},
        "PurchaseOrder": po,
        "PurchaseOrderItem": item,
        "Material": material,
        "PurchaseOrderItemText": format!("{} description", material),
        "OrderQuantity": qty,
        "PurchaseOrderQuantityUnit": "PC",
        "NetPriceAmount": "10.00",
        "IsCompletelyDelivered": delivered,
        "IsFinallyInvoiced": invoiced,
    })
}

// ──────────────────────────────────────────────
// 1. Order detail
// ──────────────────────────────────────────────

#[test]
fn order_detail_end_to_end() {
    let body = results(json!([{
        "PurchaseOrder": "4500000520",
        "Material": "BKC-990",
        "OrderQuantity": "12",
        "NetAmount": "450.00"
    }]));
    let router = Router::new(&[(ITEMS, 200, body.clone()), (HEADER, 200, body)]);

    let outcome = order_detail(&router.client(), "4500000520");
    assert_eq!(outcome.status, Status::Success);
    let detail = outcome.data.unwrap();
    assert_eq!(detail.purchase_order, "4500000520");
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].qty, 12.0);
    assert_eq!(detail.items[0].net, 450.0);
    assert_eq!(detail.items[0].material.as_deref(), Some("BKC-990"));
    assert_eq!(detail.summary.items_count, 1);
    assert!(detail.summary.header_found);
    assert!(detail.summary.can_close_po);
    assert_eq!(detail.summary.total_value, 450.0);

    let urls = router.urls();
    assert!(urls[0].contains("$filter=PurchaseOrder+eq+'4500000520'"));
    assert!(urls[1].contains("$orderby=PurchaseOrderItem+asc"));
}

#[test]
fn order_without_items_is_header_only() {
    let header = results(json!([{"PurchaseOrder": "4500000521", "Supplier": "17300001"}]));
    let router = Router::new(&[(ITEMS, 200, results(json!([]))), (HEADER, 200, header)]);

    let detail = order_detail(&router.client(), "4500000521").data.unwrap();
    assert_eq!(detail.summary.items_count, 0);
    assert!(!detail.summary.can_close_po);
    assert!(detail.summary.header_found);
    assert_eq!(detail.header.text("Supplier").as_deref(), Some("17300001"));
    assert!(detail.items_error.is_none());
}

#[test]
fn rejected_description_field_falls_back_to_next_field_set() {
    let items = results(json!([
        {"PurchaseOrder": "4500000522", "PurchaseOrderItem": "00020", "MaterialDescription": "Brake", "OrderQuantity": "1", "NetAmount": "5"},
        {"PurchaseOrder": "4500000522", "PurchaseOrderItem": "00010", "MaterialDescription": "Chain", "OrderQuantity": "2", "NetAmount": "7"}
    ]));
    let router = Router::new(&[
        ("PurchaseOrderItemText", 400, "Property PurchaseOrderItemText not found".to_string()),
        (ITEMS, 200, items),
        (HEADER, 200, results(json!([]))),
    ]);

    let outcome = order_detail(&router.client(), "4500000522");
    assert_eq!(outcome.status, Status::Success);
    let detail = outcome.data.unwrap();
    assert_eq!(detail.items[0].item, Some(10));
    assert_eq!(detail.items[0].name, "Chain");
    assert_eq!(detail.items[1].name, "Brake");
    assert!(!detail.summary.header_found);
    assert!(detail.links.items_url.contains("MaterialDescription"));
    assert_eq!(router.urls().len(), 3, "header + rejected variant + accepted variant");
}

#[test]
fn failed_items_keep_header_and_report_error() {
    let header = results(json!([{"PurchaseOrder": "4500000523"}]));
    let router = Router::new(&[(ITEMS, 500, "boom".to_string()), (HEADER, 200, header)]);

    let outcome = order_detail(&router.client(), "4500000523");
    assert_eq!(outcome.status, Status::Partial);
    let detail = outcome.data.unwrap();
    assert!(detail.summary.header_found);
    assert_eq!(detail.summary.items_count, 0);
    let error = detail.items_error.unwrap();
    assert_eq!(error.message, "HTTP 500");
}

// ──────────────────────────────────────────────
// 2. List and search
// ──────────────────────────────────────────────

#[test]
fn search_by_po_number_finds_single_order() {
    let lines: Vec<Value> = (0..20)
        .map(|i| {
            json!({
                "PurchaseOrder": format!("45000018{:02}", i + 10),
                "PurchaseOrderItem": "10",
                "Material": format!("MAT-{}", i),
                "Supplier": "17300001",
                "OrderQuantity": "1",
                "NetAmount": "100"
            })
        })
        .collect();
    let router = Router::new(&[(ITEMS, 200, results(Value::Array(lines)))]);

    let value = dispatch(
        &router.client(),
        "search_purchase_orders",
        &params(json!({"search_term": "4500001818", "search_field": "po_number", "limit": 5})),
    );
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_orders"], 1);
    let found = value["search_results"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["purchase_order"], "4500001818");
    assert_eq!(found[0]["items"][0]["material"], "MAT-8");
    assert!(router.urls()[0].contains("$top=50"));
}

#[test]
fn search_stops_at_limit_orders() {
    let lines: Vec<Value> = (0..12)
        .map(|i| json!({"PurchaseOrder": format!("450000{:04}", i / 2), "Supplier": "ACME Cycles"}))
        .collect();
    let router = Router::new(&[(ITEMS, 200, results(Value::Array(lines)))]);

    let value = dispatch(
        &router.client(),
        "search_purchase_orders",
        &params(json!({"search_term": "acme", "search_field": "supplier", "limit": "2"})),
    );
    assert_eq!(value["total_orders"], 2);
    assert_eq!(value["search_results"][0]["items"].as_array().unwrap().len(), 2);
}

#[test]
fn list_combines_filters_with_and() {
    let router = Router::new(&[(HEADER, 200, results(json!([{"PurchaseOrder": "4500000001"}])))]);
    let value = dispatch(
        &router.client(),
        "list_purchase_orders",
        &params(json!({"limit": 5, "date_from": "2024-08-01", "supplier": "17300001", "status": "open"})),
    );
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_count"], 1);
    assert_eq!(value["filters_applied"]["status"], "open");
    let url = &router.urls()[0];
    assert!(url.contains(
        "$filter=PurchaseOrderDate+ge+datetime'2024-08-01T00%3A00%3A00'+and+Supplier+eq+'17300001'"
    ), "{}", url);
}

#[test]
fn list_rejects_bad_date_without_request() {
    let router = Router::new(&[]);
    let value = dispatch(&router.client(), "list_purchase_orders", &params(json!({"date_from": "yesterday"})));
    assert_eq!(value["status"], "error");
    assert!(router.urls().is_empty());
}

// ──────────────────────────────────────────────
// 3. Stock, receipts and partial capability
// ──────────────────────────────────────────────

#[test]
fn missing_stock_service_is_partial() {
    let router = Router::new(&[]);
    let value = dispatch(&router.client(), "get_material_stock", &params(json!({})));
    assert_eq!(value["status"], "partial");
    assert_eq!(value["stock_info"], json!([]));
    assert!(value["note"].is_string());
    assert_eq!(router.urls().len(), 1, "404 is not retried");
}

#[test]
fn stock_totals_available_quantity() {
    let rows = results(json!([
        {"Material": "M1", "Plant": "1010", "AvailableQuantity": "4"},
        {"Material": "M2", "Plant": "1010", "AvailableQuantity": "6.5"}
    ]));
    let router = Router::new(&[(STOCK, 200, rows)]);
    let value = dispatch(
        &router.client(),
        "get_material_stock",
        &params(json!({"low_stock_only": "true", "threshold": "7"})),
    );
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_items"], 2);
    assert_eq!(value["total_available_quantity"], 10.5);
    assert_eq!(value["filters_applied"]["threshold"], 7.0);
    assert!(router.urls()[0].contains("AvailableQuantity+lt+7"));
}

#[test]
fn goods_receipts_sum_quantity() {
    let rows = results(json!([
        {"MaterialDocument": "5000000001", "PurchaseOrder": "4500000520", "PurchaseOrderItem": "00010", "QuantityInEntryUnit": "5", "PostingDate": "/Date(1609459200000)/"},
        {"MaterialDocument": "5000000002", "PurchaseOrder": "4500000520", "PurchaseOrderItem": "00010", "QuantityInEntryUnit": "2.5"}
    ]));
    let router = Router::new(&[(RECEIPTS, 200, rows)]);
    let value = dispatch(&router.client(), "get_goods_receipts", &params(json!({"po_number": "4500000520"})));
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_records"], 2);
    assert_eq!(value["total_quantity_received"], 7.5);
    assert_eq!(value["goods_receipts"][0]["PostingDate"], "2021-01-01");
}

#[test]
fn server_errors_are_errors_not_partial() {
    let router = Router::new(&[(STOCK, 503, "maintenance".to_string())]);
    let value = dispatch(&router.client(), "get_material_stock", &params(json!({})));
    assert_eq!(value["status"], "error");
    assert_eq!(value["details"]["http_status"], 503);
    assert_eq!(router.urls().len(), 2, "503 retried up to the attempt budget");
}

#[test]
fn malformed_body_is_error_with_preview() {
    let router = Router::new(&[(RECEIPTS, 200, "<html>proxy error</html>".to_string())]);
    let value = dispatch(&router.client(), "get_goods_receipts", &params(json!({})));
    assert_eq!(value["status"], "error");
    assert_eq!(value["details"]["preview"], "<html>proxy error</html>");
}

// ──────────────────────────────────────────────
// 4. Cross-entity reports
// ──────────────────────────────────────────────

fn process_lines() -> String {
    results(json!([
        process_line("4500000001", "00010", "M1", "5", json!(false), json!(false)),
        process_line("4500000001", "00020", "M2", "2", json!(true), json!(false)),
        process_line("4500000002", "00010", "M1", "3", json!(""), json!("X")),
        process_line("4500000003", "00010", "M3", "1", json!("false"), json!("")),
        process_line("4500000004", "00010", "M2", "4", json!("X"), json!(true))
    ]))
}

#[test]
fn materials_in_transit_group_by_material() {
    let router = Router::new(&[(PROCESS_ITEMS, 200, process_lines())]);
    let value = dispatch(&router.client(), "target___get_material_in_transit", &params(json!({})));
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_materials"], 2);
    let m1 = &value["materials_in_transit"][0];
    assert_eq!(m1["material"], "M1");
    assert_eq!(m1["total_in_transit_qty"], 8.0);
    assert_eq!(m1["related_orders"].as_array().unwrap().len(), 2);
    assert!(!router.urls()[0].contains("$select"));
}

#[test]
fn orders_in_transit_group_by_order() {
    let router = Router::new(&[(PROCESS_ITEMS, 200, process_lines())]);
    let value = dispatch(&router.client(), "get_orders_in_transit", &params(json!({"limit": 2})));
    assert_eq!(value["total_orders"], 3);
    let orders = value["orders_in_transit"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["purchase_order"], "4500000001");
    assert_eq!(orders[0]["items_in_transit"].as_array().unwrap().len(), 1);
}

#[test]
fn open_orders_net_goods_receipts() {
    let receipts = results(json!([
        {"PurchaseOrder": "4500000001", "PurchaseOrderItem": "00010", "QuantityInEntryUnit": "2"},
        {"PurchaseOrder": "4500000003", "PurchaseOrderItem": "00010", "QuantityInEntryUnit": "1"}
    ]));
    let headers = results(json!([
        {"PurchaseOrder": "4500000001", "Supplier": "17300001", "PurchaseOrderDate": "/Date(1609459200000)/"}
    ]));
    let router = Router::new(&[
        (PROCESS_ITEMS, 200, process_lines()),
        (RECEIPTS, 200, receipts),
        (HEADER, 200, headers),
    ]);
    let value = dispatch(&router.client(), "get_open_purchase_orders", &params(json!({})));
    assert_eq!(value["status"], "success");
    assert_eq!(value["receipts_available"], true);
    assert_eq!(value["total_open_orders"], 2, "4500000003 fully received");
    let first = &value["open_purchase_orders"][0];
    assert_eq!(first["purchase_order"], "4500000001");
    assert_eq!(first["supplier"], "17300001");
    assert_eq!(first["order_date"], "2021-01-01");
    assert_eq!(first["items"][0]["ordered_quantity"], 5.0);
    assert_eq!(first["items"][0]["received_quantity"], 2.0);
    assert_eq!(first["items"][0]["open_quantity"], 3.0);
}

#[test]
fn open_orders_without_receipts_service_still_succeed() {
    let router = Router::new(&[(PROCESS_ITEMS, 200, process_lines())]);
    let value = dispatch(&router.client(), "get_open_purchase_orders", &params(json!({})));
    assert_eq!(value["status"], "success");
    assert_eq!(value["receipts_available"], false);
    assert_eq!(value["total_open_orders"], 3);
    assert!(value["note"].is_string());
}

#[test]
fn inventory_joins_stock_with_open_orders() {
    let stock = results(json!([
        {"Material": "M1", "Plant": "1010", "AvailableQuantity": "40", "MaterialDescription": "Chain"},
        {"Material": "M1", "Plant": "1020", "AvailableQuantity": "2"},
        {"Material": "M9", "Plant": "1010", "AvailableQuantity": "7"}
    ]));
    let router = Router::new(&[(STOCK, 200, stock), (PROCESS_ITEMS, 200, process_lines())]);
    let value = dispatch(&router.client(), "get_inventory_with_open_orders", &params(json!({})));
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_materials"], 1);
    let m1 = &value["inventory_with_open_orders"][0];
    assert_eq!(m1["material"], "M1");
    assert_eq!(m1["description"], "Chain");
    assert_eq!(m1["available_quantity"], 42.0);
    assert_eq!(m1["total_open_quantity"], 8.0);
    assert_eq!(m1["open_orders_count"], 2);
}

#[test]
fn inventory_without_stock_service_is_partial() {
    let router = Router::new(&[(PROCESS_ITEMS, 200, process_lines())]);
    let value = dispatch(&router.client(), "get_inventory_with_open_orders", &params(json!({})));
    assert_eq!(value["status"], "partial");
    assert_eq!(value["inventory_with_open_orders"], json!([]));
}

// ──────────────────────────────────────────────
// 5. Awaiting invoice or delivery
// ──────────────────────────────────────────────

#[test]
fn awaiting_statistics_are_consistent() {
    let detail = results(json!([
        process_line("4500000001", "00010", "M1", "5", json!(false), json!(false)),
        process_line("4500000009", "00010", "M9", "1", json!(true), json!(true))
    ]));
    let router = Router::new(&[
        ("A_PurchaseOrderItem?$format=json&$filter=", 200, detail),
        (PROCESS_ITEMS, 200, process_lines()),
    ]);
    let value = dispatch(
        &router.client(),
        "get_orders_awaiting_invoice_or_delivery",
        &params(json!({"limit": 10})),
    );
    assert_eq!(value["status"], "success");
    assert_eq!(value["total_items_in_system"], 5);

    let summary = &value["summary"];
    let sample = summary["sample_size"].as_u64().unwrap() as f64;
    let both = summary["total_both_pending"].as_u64().unwrap() as f64;
    assert_eq!(both, 2.0);
    assert!(both <= sample);
    let expected = ((both / sample * 100.0) * 10.0).round() / 10.0;
    assert_eq!(summary["patterns"]["percentage_with_issues"], expected);
    assert_eq!(summary["patterns"]["total_unique_pos"], 4);

    let shown = value["items_pending_both"].as_array().unwrap();
    assert_eq!(shown.len(), 1, "lines failing the predicate are not shown");
    assert_eq!(shown[0]["purchase_order"], "4500000001");
    assert_eq!(value["detail_source"], "detail_query");

    let urls = router.urls();
    assert!(urls[1].contains("IsCompletelyDelivered+eq+false+and+IsFinallyInvoiced+eq+false"));
}

#[test]
fn awaiting_delivery_falls_back_to_sample_when_filter_rejected() {
    let router = Router::new(&[
        ("A_PurchaseOrderItem?$format=json&$filter=", 400, "filter not supported".to_string()),
        (PROCESS_ITEMS, 200, process_lines()),
    ]);
    let value = dispatch(
        &router.client(),
        "get_orders_awaiting_invoice_or_delivery",
        &params(json!({"filter_type": "not_delivered", "limit": "2"})),
    );
    assert_eq!(value["status"], "success");
    assert_eq!(value["filter_type"], "not_delivered");
    assert_eq!(value["detail_source"], "analysis_sample");
    assert_eq!(value["summary"]["total_not_delivered"], 3);
    let shown = value["items_awaiting_delivery"].as_array().unwrap();
    assert_eq!(shown.len(), 2);
    assert!(shown.iter().all(|l| l["delivered"] == json!(false)));
}

#[test]
fn awaiting_rejects_unknown_filter() {
    let router = Router::new(&[]);
    let value = dispatch(
        &router.client(),
        "get_orders_awaiting_invoice_or_delivery",
        &params(json!({"filter_type": "late"})),
    );
    assert_eq!(value["status"], "error");
    assert!(router.urls().is_empty());
}

// ──────────────────────────────────────────────
// 6. Dispatch
// ──────────────────────────────────────────────

#[test]
fn unknown_tool_lists_available_tools() {
    let router = Router::new(&[]);
    let value = dispatch(&router.client(), "target___get_weather", &params(json!({})));
    assert_eq!(value["status"], "error");
    assert_eq!(value["message"], "Unknown tool: get_weather");
    assert!(value["available_tools"]
        .as_array()
        .unwrap()
        .contains(&json!("get_complete_po_data")));
}

#[test]
fn complete_po_requires_po_number() {
    let router = Router::new(&[]);
    let value = dispatch(&router.client(), "get_complete_po_data", &params(json!({})));
    assert_eq!(value["status"], "error");
    assert!(value["message"].as_str().unwrap().contains("po_number"));
}
