//! Entity collections read by the reports and the field sets requested
//! from them. Field lists are ordered by importance; the query builder
//! drops from the end when a URL gets too long.

pub const PURCHASE_ORDER: &str = "/sap/opu/odata/sap/C_PURCHASEORDER_FS_SRV/I_PurchaseOrder";
pub const PURCHASE_ORDER_ITEM: &str =
    "/sap/opu/odata/sap/C_PURCHASEORDER_FS_SRV/I_PurchaseOrderItem";
/// Order lines carrying the delivery and invoice completion flags.
pub const PURCHASE_ORDER_ITEM_PROCESS: &str =
    "/sap/opu/odata/sap/API_PURCHASEORDER_PROCESS_SRV/A_PurchaseOrderItem";
pub const MATERIAL_STOCK: &str = "/sap/opu/odata/sap/API_MATERIAL_STOCK_SRV/A_MaterialStock";
pub const MATERIAL_DOCUMENT_ITEM: &str =
    "/sap/opu/odata/sap/API_MATERIAL_DOCUMENT_SRV/A_MaterialDocumentItem";

/// Largest page the ERP serves reliably. Samples are capped here.
pub const SAMPLE_CAP: u32 = 300;

/// Goods movement type of a goods receipt against a purchase order.
pub const GOODS_RECEIPT_MOVEMENT: &str = "101";

pub const HEADER_FIELDS: &[&str] = &[
    "PurchaseOrder",
    "Supplier",
    "PurchaseOrderDate",
    "DocumentCurrency",
    "CompanyCode",
    "PurchasingOrganization",
    "PurchasingGroup",
    "CreationDate",
];

pub const LIST_FIELDS: &[&str] = &[
    "PurchaseOrder",
    "Supplier",
    "PurchaseOrderDate",
    "DocumentCurrency",
    "PurchasingOrganization",
    "PurchasingGroup",
    "CreationDate",
];

/// Header fields needed to label order lines.
pub const HEADER_LABEL_FIELDS: &[&str] = &["PurchaseOrder", "Supplier", "PurchaseOrderDate"];

/// Item field sets for order detail, tried in order. Some tenants reject
/// one of the description fields, the last set has none.
pub const ITEM_FIELD_VARIANTS: &[&[&str]] = &[
    &[
        "PurchaseOrder",
        "PurchaseOrderItem",
        "Material",
        "PurchaseOrderItemText",
        "OrderQuantity",
        "NetAmount",
        "PurchaseOrderQuantityUnit",
        "NetPriceAmount",
        "DocumentCurrency",
        "TaxCode",
        "MaterialGroup",
    ],
    &[
        "PurchaseOrder",
        "PurchaseOrderItem",
        "Material",
        "MaterialDescription",
        "OrderQuantity",
        "NetAmount",
        "PurchaseOrderQuantityUnit",
        "NetPriceAmount",
        "DocumentCurrency",
        "TaxCode",
        "MaterialGroup",
    ],
    &[
        "PurchaseOrder",
        "PurchaseOrderItem",
        "Material",
        "OrderQuantity",
        "NetAmount",
        "PurchaseOrderQuantityUnit",
        "NetPriceAmount",
        "DocumentCurrency",
        "TaxCode",
        "MaterialGroup",
    ],
];

pub const SEARCH_FIELDS: &[&str] = &[
    "PurchaseOrder",
    "PurchaseOrderItem",
    "Material",
    "Supplier",
    "PurchaseOrderItemText",
    "OrderQuantity",
    "NetAmount",
    "DocumentCurrency",
    "PurchaseOrderDate",
];

pub const STOCK_FIELDS: &[&str] = &[
    "Material",
    "Plant",
    "AvailableQuantity",
    "StorageLocation",
    "MaterialDescription",
    "QuantityOnHand",
    "BaseUnit",
];

pub const RECEIPT_FIELDS: &[&str] = &[
    "MaterialDocument",
    "PurchaseOrder",
    "PurchaseOrderItem",
    "Material",
    "QuantityInEntryUnit",
    "EntryUnit",
    "PostingDate",
    "Plant",
    "MaterialDocumentYear",
    "MaterialDocumentItem",
];
