//! Tool catalog and dispatch: a tool name plus a flat parameter map in,
//! a JSON report with a `status` field out.

use serde::Serialize;
use serde_json::{json, Map, Value};
use stockwise_odata::{ConfigError, ErpClient};

use crate::detail::order_detail;
use crate::open_orders::{inventory_with_open_orders, open_purchase_orders};
use crate::orders::{list_orders, search_orders, ListParams, SearchField, SearchParams};
use crate::outcome::Outcome;
use crate::pending::orders_awaiting;
use crate::pipeline::PendingFilter;
use crate::receipts::{goods_receipts, ReceiptParams};
use crate::stock::{material_stock, StockParams};
use crate::transit::{materials_in_transit, orders_in_transit};

/// Separator between a gateway target name and the tool name.
pub const TARGET_SEPARATOR: &str = "___";

/// Event key some gateways use to pass the tool name alongside parameters.
pub const TOOL_NAME_KEY: &str = "bedrockAgentCoreToolName";

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

const fn param(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: false,
        description,
    }
}

const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        kind,
        required: true,
        description,
    }
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "list_purchase_orders",
        description: "List recent purchase orders, newest first.",
        params: &[
            param("limit", ParamKind::Integer, "Maximum orders to return (default 20)"),
            param("date_from", ParamKind::String, "Only orders on or after this date (YYYY-MM-DD)"),
            param("supplier", ParamKind::String, "Supplier number"),
            param("status", ParamKind::String, "Order status, echoed in filters_applied"),
        ],
    },
    ToolSpec {
        name: "search_purchase_orders",
        description: "Search order lines by order number, supplier or material; results grouped per order.",
        params: &[
            required("search_term", ParamKind::String, "Text to look for (case-insensitive)"),
            param("search_field", ParamKind::String, "po_number, supplier, material or all (default all)"),
            param("limit", ParamKind::Integer, "Maximum orders to return (default 10)"),
        ],
    },
    ToolSpec {
        name: "get_material_stock",
        description: "Stock levels per material and plant.",
        params: &[
            param("material_number", ParamKind::String, "Material number"),
            param("plant", ParamKind::String, "Plant"),
            param("low_stock_only", ParamKind::Boolean, "Only materials below the threshold"),
            param("threshold", ParamKind::Number, "Low-stock threshold (default 10)"),
        ],
    },
    ToolSpec {
        name: "get_material_in_transit",
        description: "Materials ordered but not yet completely delivered, with the order lines they come from.",
        params: &[param("limit", ParamKind::Integer, "Maximum materials to return (default 50)")],
    },
    ToolSpec {
        name: "get_orders_in_transit",
        description: "Purchase orders with lines not yet completely delivered.",
        params: &[param("limit", ParamKind::Integer, "Maximum orders to return (default 20)")],
    },
    ToolSpec {
        name: "get_goods_receipts",
        description: "Goods receipts posted against purchase orders.",
        params: &[
            param("po_number", ParamKind::String, "Purchase order number"),
            param("limit", ParamKind::Integer, "Maximum receipts to return (default 50)"),
        ],
    },
    ToolSpec {
        name: "get_open_purchase_orders",
        description: "Orders with ordered quantity not yet received, per line.",
        params: &[param("limit", ParamKind::Integer, "Maximum orders to return (default 30)")],
    },
    ToolSpec {
        name: "get_inventory_with_open_orders",
        description: "Materials that have stock and open incoming orders.",
        params: &[param("limit", ParamKind::Integer, "Maximum materials to return (default 50)")],
    },
    ToolSpec {
        name: "get_orders_awaiting_invoice_or_delivery",
        description: "Order lines waiting for delivery and/or invoice, with system-wide statistics.",
        params: &[
            param("limit", ParamKind::Integer, "Maximum lines to show (default 20)"),
            param("filter_type", ParamKind::String, "both, not_delivered or not_invoiced (default both)"),
        ],
    },
    ToolSpec {
        name: "get_complete_po_data",
        description: "Header, lines and totals of one purchase order.",
        params: &[required("po_number", ParamKind::String, "Purchase order number")],
    },
];

pub fn tool_names() -> Vec<&'static str> {
    TOOLS.iter().map(|t| t.name).collect()
}

pub fn find_tool(name: &str) -> Option<&'static ToolSpec> {
    let name = strip_target(name);
    TOOLS.iter().find(|t| t.name == name)
}

/// `sap-tools-target___get_orders_in_transit` -> `get_orders_in_transit`.
pub fn strip_target(name: &str) -> &str {
    name.rsplit(TARGET_SEPARATOR).next().unwrap_or(name).trim()
}

// ── Parameters ───────────────────────────────────────────────────────────────

/// Typed reads over a flat parameter map. Numbers may arrive as JSON
/// numbers or numeric strings.
pub struct Params<'a>(&'a Map<String, Value>);

impl<'a> Params<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Params(map)
    }

    fn present(&self, key: &str) -> Option<&'a Value> {
        match self.0.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    pub fn text(&self, key: &str) -> Option<String> {
        match self.present(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn required_text(&self, key: &str) -> Result<String, String> {
        self.text(key)
            .ok_or_else(|| format!("missing required parameter '{}'", key))
    }

    pub fn number(&self, key: &str, default: f64) -> Result<f64, String> {
        let Some(value) = self.present(key) else {
            return Ok(default);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("parameter '{}' must be a number, got {}", key, value))
    }

    pub fn count(&self, key: &str, default: u32) -> Result<u32, String> {
        let n = self.number(key, default as f64)?;
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(format!("parameter '{}' must be a non-negative integer, got {}", key, n));
        }
        Ok(n as u32)
    }

    pub fn flag(&self, key: &str, default: bool) -> Result<bool, String> {
        match self.present(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(format!("parameter '{}' must be true or false, got '{}'", key, s)),
            },
            Some(Value::Number(n)) => Ok(n.as_f64() != Some(0.0)),
            Some(other) => Err(format!("parameter '{}' must be true or false, got {}", key, other)),
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────────

fn render<T: Serialize>(outcome: Outcome<T>) -> Value {
    serde_json::to_value(&outcome).unwrap_or_else(|e| {
        json!({ "status": "error", "message": format!("failed to serialize result: {}", e) })
    })
}

fn invalid(message: String) -> Value {
    json!({ "status": "error", "message": message })
}

/// Result for a tool that cannot run because configuration is incomplete.
pub fn config_error(err: &ConfigError) -> Value {
    json!({ "status": "error", "message": format!("configuration error: {}", err) })
}

pub fn unknown_tool(name: &str) -> Value {
    json!({
        "status": "error",
        "message": format!("Unknown tool: {}", name),
        "available_tools": tool_names(),
    })
}

/// Run one tool. Never panics; every failure is a `status: error` value.
pub fn dispatch(client: &ErpClient, tool: &str, params: &Map<String, Value>) -> Value {
    let name = strip_target(tool);
    tracing::info!(tool = name, "dispatch");
    match run(client, name, &Params::new(params)) {
        Ok(value) => value,
        Err(message) => invalid(message),
    }
}

/// Dispatch a flat event that carries the tool name under
/// [`TOOL_NAME_KEY`] next to its parameters.
pub fn dispatch_event(client: &ErpClient, event: &Map<String, Value>) -> Value {
    match event.get(TOOL_NAME_KEY).and_then(Value::as_str) {
        Some(tool) => dispatch(client, tool, event),
        None => invalid(format!("event has no '{}'", TOOL_NAME_KEY)),
    }
}

fn run(client: &ErpClient, name: &str, p: &Params<'_>) -> Result<Value, String> {
    let value = match name {
        "list_purchase_orders" => render(list_orders(
            client,
            &ListParams {
                limit: p.count("limit", 20)?,
                date_from: p.text("date_from"),
                supplier: p.text("supplier"),
                status: p.text("status"),
            },
        )),
        "search_purchase_orders" => {
            let raw_field = p.text("search_field").unwrap_or_else(|| "all".to_string());
            let search_field = SearchField::parse(&raw_field).ok_or_else(|| {
                format!(
                    "search_field must be po_number, supplier, material or all, got '{}'",
                    raw_field
                )
            })?;
            render(search_orders(
                client,
                &SearchParams {
                    search_term: p.required_text("search_term")?,
                    search_field,
                    limit: p.count("limit", 10)?,
                },
            ))
        }
        "get_material_stock" => render(material_stock(
            client,
            &StockParams {
                material_number: p.text("material_number"),
                plant: p.text("plant"),
                low_stock_only: p.flag("low_stock_only", false)?,
                threshold: p.number("threshold", 10.0)?,
            },
        )),
        "get_material_in_transit" => render(materials_in_transit(client, p.count("limit", 50)?)),
        "get_orders_in_transit" => render(orders_in_transit(client, p.count("limit", 20)?)),
        "get_goods_receipts" => render(goods_receipts(
            client,
            &ReceiptParams {
                po_number: p.text("po_number"),
                limit: p.count("limit", 50)?,
            },
        )),
        "get_open_purchase_orders" => render(open_purchase_orders(client, p.count("limit", 30)?)),
        "get_inventory_with_open_orders" => {
            render(inventory_with_open_orders(client, p.count("limit", 50)?))
        }
        "get_orders_awaiting_invoice_or_delivery" => {
            let raw_filter = p.text("filter_type").unwrap_or_default();
            let filter = PendingFilter::parse(&raw_filter).ok_or_else(|| {
                format!(
                    "filter_type must be both, not_delivered or not_invoiced, got '{}'",
                    raw_filter
                )
            })?;
            render(orders_awaiting(client, p.count("limit", 20)?, filter))
        }
        "get_complete_po_data" => render(order_detail(client, &p.required_text("po_number")?)),
        other => unknown_tool(other),
    };
    Ok(value)
}
