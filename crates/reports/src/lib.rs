//! Procurement and inventory reports over the ERP OData services.
//!
//! Every report composes one or more [`ErpClient`](stockwise_odata::ErpClient)
//! fetches, joins the entity collections client-side, and returns an
//! [`Outcome`] that is always well formed: `success`, `partial` (an entity
//! is not exposed on this tenant) or `error`.

pub mod detail;
pub mod dispatch;
pub mod entities;
pub mod open_orders;
pub mod orders;
pub mod outcome;
pub mod pending;
pub mod pipeline;
pub mod receipts;
pub mod stock;
pub mod transit;

pub use detail::{order_detail, OrderLine, PurchaseOrderDetail};
pub use dispatch::{
    config_error, dispatch, dispatch_event, find_tool, strip_target, tool_names, unknown_tool, ToolSpec,
    TOOLS,
};
pub use open_orders::{inventory_with_open_orders, open_purchase_orders};
pub use orders::{list_orders, search_orders, ListParams, SearchField, SearchParams};
pub use outcome::{ErrorInfo, Outcome, Status};
pub use pending::orders_awaiting;
pub use pipeline::PendingFilter;
pub use receipts::{goods_receipts, ReceiptParams};
pub use stock::{material_stock, StockParams};
pub use transit::{materials_in_transit, orders_in_transit};
