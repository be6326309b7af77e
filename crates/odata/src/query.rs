//! Request URL construction.
//!
//! Renders `https://{host}{entity}?$format=..&$filter=..&$select=..&$orderby=..&$top=..`
//! and keeps the result under the gateway's URL length ceiling by trimming
//! the field selection.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::config::{ErpConfig, ResponseFormat};

/// Characters left literal in parameter values.
///
/// The filter grammar needs quotes and parentheses verbatim; spaces are
/// form-encoded as `+` after percent-encoding. Everything else outside the
/// unreserved set is percent-encoded.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b' ');

/// Escape a value for use inside a quoted filter literal (`'...'`).
pub fn odata_literal(value: &str) -> String {
    value.replace('\'', "''")
}

fn encode_value(value: &str) -> String {
    utf8_percent_encode(value, QUERY_VALUE)
        .to_string()
        .replace(' ', "+")
}

// ── QuerySpec ────────────────────────────────────────────────────────────────

/// One query against one entity collection.
///
/// Field selection order matters: when the URL would exceed the ceiling,
/// fields are dropped from the end first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub entity_path: String,
    pub filter: Option<String>,
    pub select: Vec<String>,
    pub order_by: Option<String>,
    pub top: Option<u32>,
}

impl QuerySpec {
    pub fn new(entity_path: impl Into<String>) -> Self {
        QuerySpec {
            entity_path: entity_path.into(),
            filter: None,
            select: Vec::new(),
            order_by: None,
            top: None,
        }
    }

    /// Set the (pre-escaped) filter expression.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Combine clauses with `and`; no filter when `clauses` is empty.
    pub fn filter_all(mut self, clauses: &[String]) -> Self {
        self.filter = if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" and "))
        };
        self
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn top(mut self, top: u32) -> Self {
        self.top = Some(top);
        self
    }
}

// ── QueryBuilder ─────────────────────────────────────────────────────────────

/// Renders [`QuerySpec`]s into request URLs for one configured host.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
    client: Option<String>,
    format: ResponseFormat,
    ceiling: usize,
}

impl QueryBuilder {
    pub fn new(config: &ErpConfig) -> Self {
        QueryBuilder {
            base_url: config.base_url(),
            client: config.client.clone(),
            format: config.format,
            ceiling: config.url_ceiling,
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Render `spec`, dropping trailing select fields until the URL fits
    /// under the ceiling. If no selection fits, `$select` is omitted.
    pub fn build(&self, spec: &QuerySpec) -> String {
        if spec.select.is_empty() {
            return self.render(spec, 0);
        }
        for keep in (1..=spec.select.len()).rev() {
            let url = self.render(spec, keep);
            if url.len() <= self.ceiling {
                if keep < spec.select.len() {
                    tracing::debug!(
                        entity = %spec.entity_path,
                        dropped = ?&spec.select[keep..],
                        "trimmed field selection to fit URL ceiling"
                    );
                }
                return url;
            }
        }
        tracing::debug!(
            entity = %spec.entity_path,
            ceiling = self.ceiling,
            "no field selection fits URL ceiling; requesting all fields"
        );
        self.render(spec, 0)
    }

    /// Render `spec` keeping the first `keep` select fields.
    fn render(&self, spec: &QuerySpec, keep: usize) -> String {
        let mut params: Vec<(&str, String)> = vec![("$format", self.format.query_value().to_string())];
        if let Some(filter) = &spec.filter {
            params.push(("$filter", filter.clone()));
        }
        if keep > 0 {
            params.push(("$select", spec.select[..keep].join(",")));
        }
        if let Some(order_by) = &spec.order_by {
            params.push(("$orderby", order_by.clone()));
        }
        if let Some(top) = spec.top {
            params.push(("$top", top.to_string()));
        }
        if let Some(client) = &self.client {
            params.push(("sap-client", client.clone()));
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode_value(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}?{}", self.base_url, spec.entity_path, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    const ITEMS: &str = "/sap/opu/odata/sap/C_PURCHASEORDER_FS_SRV/I_PurchaseOrderItem";

    fn builder() -> QueryBuilder {
        QueryBuilder::new(&ErpConfig::new(
            "erp.example.com",
            Credentials::Bearer { token: "t".into() },
        ))
    }

    #[test]
    fn always_has_format() {
        let url = builder().build(&QuerySpec::new(ITEMS));
        assert_eq!(url, format!("https://erp.example.com{}?$format=json", ITEMS));
    }

    #[test]
    fn filter_keeps_grammar_characters_literal() {
        let spec = QuerySpec::new(ITEMS).filter("PurchaseOrder eq '4500000520'");
        let url = builder().build(&spec);
        assert!(url.contains("$filter=PurchaseOrder+eq+'4500000520'"), "{}", url);
    }

    #[test]
    fn filter_encodes_other_characters() {
        let spec = QuerySpec::new(ITEMS)
            .filter("substringof('A&B', Supplier) and PurchaseOrderDate ge datetime'2024-08-01T00:00:00'");
        let url = builder().build(&spec);
        assert!(url.contains("substringof('A%26B'%2C+Supplier)"), "{}", url);
        assert!(url.contains("datetime'2024-08-01T00%3A00%3A00'"), "{}", url);
    }

    #[test]
    fn select_order_top_and_client() {
        let mut config = ErpConfig::new("erp", Credentials::Bearer { token: "t".into() });
        config.client = Some("100".into());
        let spec = QuerySpec::new(ITEMS)
            .select(&["PurchaseOrder", "Material"])
            .order_by("PurchaseOrderItem asc")
            .top(5);
        let url = QueryBuilder::new(&config).build(&spec);
        assert!(url.ends_with(
            "?$format=json&$select=PurchaseOrder%2CMaterial&$orderby=PurchaseOrderItem+asc&$top=5&sap-client=100"
        ), "{}", url);
    }

    #[test]
    fn filter_all_joins_with_and() {
        let spec = QuerySpec::new(ITEMS).filter_all(&["A eq '1'".to_string(), "B eq '2'".to_string()]);
        assert_eq!(spec.filter.as_deref(), Some("A eq '1' and B eq '2'"));
        assert_eq!(QuerySpec::new(ITEMS).filter_all(&[]).filter, None);
    }

    #[test]
    fn literal_escape_doubles_quotes() {
        assert_eq!(odata_literal("O'Neil"), "O''Neil");
    }

    #[test]
    fn oversized_selection_is_trimmed_from_the_end() {
        let fields = [
            "PurchaseOrder", "PurchaseOrderItem", "Material", "PurchaseOrderItemText",
            "MaterialGroup", "DocumentCurrency", "OrderQuantity", "PurchaseOrderQuantityUnit",
            "NetAmount", "NetPriceAmount", "TaxCode",
        ];
        let spec = QuerySpec::new(ITEMS)
            .filter("PurchaseOrder eq '4500000520'")
            .select(&fields)
            .order_by("PurchaseOrderItem asc");
        let b = builder();
        let url = b.build(&spec);
        assert!(url.len() <= b.ceiling(), "{} > {}", url.len(), b.ceiling());
        assert!(url.contains("$select=PurchaseOrder%2CPurchaseOrderItem%2CMaterial"));
        assert!(!url.contains("TaxCode"));
    }

    #[test]
    fn url_never_exceeds_ceiling_for_any_selection() {
        let pool = [
            "PurchaseOrder", "Supplier", "PurchasingOrganization", "PurchasingGroup",
            "DocumentCurrency", "PurchaseOrderDate", "CreationDate", "CompanyCode",
            "Material", "MaterialDescription", "AvailableQuantity", "Plant",
        ];
        let b = builder();
        for len in 0..=pool.len() {
            for rotation in 0..pool.len() {
                let fields: Vec<&str> = pool.iter().cycle().skip(rotation).take(len).copied().collect();
                let spec = QuerySpec::new(ITEMS)
                    .filter("Supplier eq '17300001'")
                    .select(&fields)
                    .order_by("PurchaseOrderDate desc")
                    .top(20);
                let url = b.build(&spec);
                assert!(url.len() <= b.ceiling(), "len {} for {:?}", url.len(), fields);
            }
        }
    }

    #[test]
    fn selection_dropped_entirely_when_nothing_fits() {
        let mut config = ErpConfig::new("erp", Credentials::Bearer { token: "t".into() });
        config.url_ceiling = 90;
        let spec = QuerySpec::new(ITEMS).select(&["PurchaseOrderItemText"]);
        let url = QueryBuilder::new(&config).build(&spec);
        assert!(!url.contains("$select"));
    }
}
