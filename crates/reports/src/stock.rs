//! Material stock levels.

use serde::Serialize;
use stockwise_odata::{odata_literal, Entry, ErpClient, FetchError, QuerySpec};

use crate::entities::{MATERIAL_STOCK, SAMPLE_CAP, STOCK_FIELDS};
use crate::outcome::Outcome;

const STOCK_PAGE: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockParams {
    pub material_number: Option<String>,
    pub plant: Option<String>,
    pub low_stock_only: bool,
    pub threshold: f64,
}

impl Default for StockParams {
    fn default() -> Self {
        StockParams {
            material_number: None,
            plant: None,
            low_stock_only: false,
            threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockFilters {
    pub material_number: Option<String>,
    pub plant: Option<String>,
    pub low_stock_only: bool,
    /// Only reported when `low_stock_only` is set.
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StockReport {
    pub stock_info: Vec<Entry>,
    pub total_items: usize,
    pub total_available_quantity: f64,
    pub filters_applied: Option<StockFilters>,
}

/// Stock rows summed per material, in first-seen order.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialStock {
    pub material: String,
    pub description: Option<String>,
    pub available_quantity: f64,
}

pub fn stock_query(params: &StockParams, top: u32) -> QuerySpec {
    let mut clauses = Vec::new();
    if let Some(material) = params.material_number.as_deref() {
        clauses.push(format!("Material eq '{}'", odata_literal(material)));
    }
    if let Some(plant) = params.plant.as_deref() {
        clauses.push(format!("Plant eq '{}'", odata_literal(plant)));
    }
    if params.low_stock_only {
        clauses.push(format!("AvailableQuantity lt {}", params.threshold));
    }
    QuerySpec::new(MATERIAL_STOCK)
        .filter_all(&clauses)
        .select(STOCK_FIELDS)
        .order_by("AvailableQuantity asc")
        .top(top)
}

pub fn material_stock(client: &ErpClient, params: &StockParams) -> Outcome<StockReport> {
    let rows = match client.fetch(&stock_query(params, STOCK_PAGE)) {
        Ok(parsed) => parsed.entries,
        Err(err) => {
            return Outcome::from_fetch_error(
                &err,
                StockReport::default(),
                "stock API may not be available in this ERP system",
            )
            .with_note("ask the ERP administrator to enable the material stock service")
        }
    };

    let total_available_quantity: f64 = rows.iter().map(|r| r.number("AvailableQuantity")).sum();
    Outcome::success(StockReport {
        total_items: rows.len(),
        stock_info: rows,
        total_available_quantity,
        filters_applied: Some(StockFilters {
            material_number: params.material_number.clone(),
            plant: params.plant.clone(),
            low_stock_only: params.low_stock_only,
            threshold: params.low_stock_only.then_some(params.threshold),
        }),
    })
}

/// Available quantity per material over one stock sample.
pub fn stock_by_material(client: &ErpClient) -> Result<Vec<MaterialStock>, FetchError> {
    let rows = client.fetch(&stock_query(&StockParams::default(), SAMPLE_CAP))?.entries;
    Ok(sum_by_material(&rows))
}

fn sum_by_material(rows: &[Entry]) -> Vec<MaterialStock> {
    crate::pipeline::group_lines(
        rows,
        |_| true,
        |r| r.text("Material"),
        |material, r| MaterialStock {
            material: material.to_string(),
            description: r.text("MaterialDescription"),
            available_quantity: 0.0,
        },
        |acc, r| {
            acc.available_quantity += r.number("AvailableQuantity");
            if acc.description.is_none() {
                acc.description = r.text("MaterialDescription");
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(material: &str, qty: f64, description: &str) -> Entry {
        let mut e = Entry::new();
        e.insert("Material", material);
        e.insert("AvailableQuantity", qty);
        e.insert("MaterialDescription", description);
        e
    }

    #[test]
    fn sums_plants_per_material() {
        let rows = vec![row("M1", 5.0, ""), row("M2", 1.0, "Bolt"), row("M1", 7.5, "Chain")];
        let sums = sum_by_material(&rows);
        assert_eq!(sums.len(), 2);
        assert_eq!(sums[0].material, "M1");
        assert_eq!(sums[0].available_quantity, 12.5);
        assert_eq!(sums[0].description.as_deref(), Some("Chain"));
    }

    #[test]
    fn low_stock_filter_uses_threshold() {
        let params = StockParams {
            plant: Some("1010".into()),
            low_stock_only: true,
            threshold: 5.0,
            ..StockParams::default()
        };
        let spec = stock_query(&params, 50);
        assert_eq!(
            spec.filter.as_deref(),
            Some("Plant eq '1010' and AvailableQuantity lt 5")
        );
    }
}
