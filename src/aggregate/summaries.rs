//! Headline KPIs and the fixed one-dimension revenue summaries.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::ingest::columns::{
    CUSTOMER, PACKAGING, PRODUCT_CODE, PRODUCT_LABEL, QUANTITY, REGION, REVENUE, SALES_REP,
    UNIT_PRICE,
};
use crate::utils::{f64_column, i64_column, str_column};

/// Headline figures for a (filtered) transaction table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewKpis {
    pub total_revenue: f64,
    pub customer_count: usize,
    pub product_count: usize,
    pub avg_unit_price: f64,
}

/// Compute the four headline KPIs. An empty table yields all zeros.
pub fn overview_kpis(df: &DataFrame) -> Result<OverviewKpis> {
    let revenue = f64_column(df, REVENUE)?;
    let customers = str_column(df, CUSTOMER)?;
    let codes = str_column(df, PRODUCT_CODE)?;
    let prices = f64_column(df, UNIT_PRICE)?;

    let distinct = |col: &StringChunked| {
        col.into_iter()
            .flatten()
            .collect::<HashSet<&str>>()
            .len()
    };

    Ok(OverviewKpis {
        total_revenue: revenue.sum().unwrap_or(0.0),
        customer_count: distinct(customers),
        product_count: distinct(codes),
        avg_unit_price: prices.mean().unwrap_or(0.0),
    })
}

/// Revenue descending, key ascending on ties. Deterministic for equal input.
fn sort_by_revenue_desc<T>(rows: &mut [(String, T)], revenue: impl Fn(&T) -> f64) {
    rows.sort_by(|a, b| {
        revenue(&b.1)
            .partial_cmp(&revenue(&a.1))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

#[derive(Default)]
struct RegionAccumulator {
    revenue: f64,
    quantity: i64,
    customers: HashSet<String>,
    products: HashSet<String>,
}

/// Per-region summary: revenue, distinct customers and products, units sold.
/// Rows come out in ascending region order.
pub fn regional_summary(df: &DataFrame) -> Result<DataFrame> {
    let regions = str_column(df, REGION)?;
    let revenue = f64_column(df, REVENUE)?;
    let quantities = i64_column(df, QUANTITY)?;
    let customers = str_column(df, CUSTOMER)?;
    let codes = str_column(df, PRODUCT_CODE)?;

    let mut acc: BTreeMap<String, RegionAccumulator> = BTreeMap::new();
    for i in 0..df.height() {
        let Some(region) = regions.get(i) else { continue };
        let entry = acc.entry(region.to_string()).or_default();
        entry.revenue += revenue.get(i).unwrap_or(0.0);
        entry.quantity += quantities.get(i).unwrap_or(0);
        if let Some(customer) = customers.get(i) {
            entry.customers.insert(customer.to_string());
        }
        if let Some(code) = codes.get(i) {
            entry.products.insert(code.to_string());
        }
    }

    let mut region_col = Vec::with_capacity(acc.len());
    let mut revenue_col = Vec::with_capacity(acc.len());
    let mut customer_col = Vec::with_capacity(acc.len());
    let mut product_col = Vec::with_capacity(acc.len());
    let mut quantity_col = Vec::with_capacity(acc.len());
    for (region, entry) in acc {
        region_col.push(region);
        revenue_col.push(entry.revenue);
        customer_col.push(entry.customers.len() as u32);
        product_col.push(entry.products.len() as u32);
        quantity_col.push(entry.quantity);
    }

    Ok(DataFrame::new(vec![
        Column::new(REGION.into(), region_col),
        Column::new(REVENUE.into(), revenue_col),
        Column::new("customer_count".into(), customer_col),
        Column::new("product_count".into(), product_col),
        Column::new(QUANTITY.into(), quantity_col),
    ])?)
}

/// Revenue per packaging category, highest first.
pub fn packaging_summary(df: &DataFrame) -> Result<DataFrame> {
    grouped_revenue(df, PACKAGING)
}

/// Revenue per sales representative, highest first.
pub fn rep_performance(df: &DataFrame) -> Result<DataFrame> {
    grouped_revenue(df, SALES_REP)
}

fn grouped_revenue(df: &DataFrame, key: &str) -> Result<DataFrame> {
    let keys = str_column(df, key)?;
    let revenue = f64_column(df, REVENUE)?;

    let mut acc: BTreeMap<String, f64> = BTreeMap::new();
    for (k, r) in keys.into_iter().zip(revenue) {
        if let Some(k) = k {
            *acc.entry(k.to_string()).or_default() += r.unwrap_or(0.0);
        }
    }

    let mut rows: Vec<(String, f64)> = acc.into_iter().collect();
    sort_by_revenue_desc(&mut rows, |r| *r);

    let (key_col, revenue_col): (Vec<String>, Vec<f64>) = rows.into_iter().unzip();
    Ok(DataFrame::new(vec![
        Column::new(key.into(), key_col),
        Column::new(REVENUE.into(), revenue_col),
    ])?)
}

#[derive(Default)]
struct ProductAccumulator {
    label: String,
    revenue: f64,
    quantity: i64,
    buyers: HashSet<String>,
}

/// Per-product summary: label, revenue, distinct buyers and units sold.
/// Sorted by revenue descending, product code ascending on ties.
pub fn product_summary(df: &DataFrame) -> Result<DataFrame> {
    let codes = str_column(df, PRODUCT_CODE)?;
    let labels = str_column(df, PRODUCT_LABEL)?;
    let customers = str_column(df, CUSTOMER)?;
    let revenue = f64_column(df, REVENUE)?;
    let quantities = i64_column(df, QUANTITY)?;

    let mut acc: BTreeMap<String, ProductAccumulator> = BTreeMap::new();
    for i in 0..df.height() {
        let Some(code) = codes.get(i) else { continue };
        let entry = acc.entry(code.to_string()).or_default();
        if entry.label.is_empty() {
            entry.label = labels.get(i).unwrap_or(code).to_string();
        }
        entry.revenue += revenue.get(i).unwrap_or(0.0);
        entry.quantity += quantities.get(i).unwrap_or(0);
        if let Some(customer) = customers.get(i) {
            entry.buyers.insert(customer.to_string());
        }
    }

    let mut rows: Vec<(String, ProductAccumulator)> = acc.into_iter().collect();
    sort_by_revenue_desc(&mut rows, |p| p.revenue);

    let mut code_col = Vec::with_capacity(rows.len());
    let mut label_col = Vec::with_capacity(rows.len());
    let mut revenue_col = Vec::with_capacity(rows.len());
    let mut buyer_col = Vec::with_capacity(rows.len());
    let mut quantity_col = Vec::with_capacity(rows.len());
    for (code, entry) in rows {
        code_col.push(code);
        label_col.push(entry.label);
        revenue_col.push(entry.revenue);
        buyer_col.push(entry.buyers.len() as u32);
        quantity_col.push(entry.quantity);
    }

    Ok(DataFrame::new(vec![
        Column::new(PRODUCT_CODE.into(), code_col),
        Column::new(PRODUCT_LABEL.into(), label_col),
        Column::new(REVENUE.into(), revenue_col),
        Column::new("buyer_count".into(), buyer_col),
        Column::new(QUANTITY.into(), quantity_col),
    ])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::ingest::sample_dataset;

    const EPS: f64 = 1e-6;

    fn sample() -> DataFrame {
        sample_dataset(&AnalyticsConfig::default()).unwrap()
    }

    #[test]
    fn test_overview_kpis_on_sample() {
        let kpis = overview_kpis(&sample()).unwrap();
        assert!((kpis.total_revenue - 92_979.04).abs() < EPS);
        assert_eq!(kpis.customer_count, 2);
        assert_eq!(kpis.product_count, 16);
        assert!((kpis.avg_unit_price - 156.565).abs() < EPS);
    }

    #[test]
    fn test_overview_kpis_on_empty_table() {
        let df = sample();
        let empty = df.head(Some(0));
        let kpis = overview_kpis(&empty).unwrap();
        assert_eq!(kpis.total_revenue, 0.0);
        assert_eq!(kpis.customer_count, 0);
        assert_eq!(kpis.product_count, 0);
        assert_eq!(kpis.avg_unit_price, 0.0);
    }

    #[test]
    fn test_regional_summary_totals() {
        let summary = regional_summary(&sample()).unwrap();
        assert_eq!(summary.height(), 5);

        let regions = summary.column(REGION).unwrap().str().unwrap();
        let revenue = summary.column(REVENUE).unwrap().f64().unwrap();
        let expected = [
            ("东", 75_594.24),
            ("中", 7_584.8),
            ("北", 4_350.0),
            ("南", 4_500.0),
            ("西", 950.0),
        ];
        for (region, total) in expected {
            let idx = regions
                .into_iter()
                .position(|r| r == Some(region))
                .unwrap_or_else(|| panic!("region {region} missing"));
            assert!((revenue.get(idx).unwrap() - total).abs() < EPS, "region {region}");
        }

        let sum: f64 = revenue.into_iter().flatten().sum();
        assert!((sum - 92_979.04).abs() < EPS);
    }

    #[test]
    fn test_regional_summary_counts() {
        let summary = regional_summary(&sample()).unwrap();
        let regions = summary.column(REGION).unwrap().str().unwrap();
        let customers = summary.column("customer_count").unwrap().u32().unwrap();
        let products = summary.column("product_count").unwrap().u32().unwrap();

        let east = regions.into_iter().position(|r| r == Some("东")).unwrap();
        assert_eq!(customers.get(east).unwrap(), 1);
        assert_eq!(products.get(east).unwrap(), 6);

        let north = regions.into_iter().position(|r| r == Some("北")).unwrap();
        assert_eq!(customers.get(north).unwrap(), 2);
        assert_eq!(products.get(north).unwrap(), 2);
    }

    #[test]
    fn test_rep_performance_sorted_desc() {
        let perf = rep_performance(&sample()).unwrap();
        assert_eq!(perf.height(), 2);

        let reps = perf.column(SALES_REP).unwrap().str().unwrap();
        let revenue = perf.column(REVENUE).unwrap().f64().unwrap();
        assert_eq!(reps.get(0).unwrap(), "梁洪泽");
        assert!((revenue.get(0).unwrap() - 83_594.24).abs() < EPS);
        assert_eq!(reps.get(1).unwrap(), "胡斌");
        assert!((revenue.get(1).unwrap() - 9_384.8).abs() < EPS);
    }

    #[test]
    fn test_packaging_summary_top_category() {
        let summary = packaging_summary(&sample()).unwrap();
        let categories = summary.column(PACKAGING).unwrap().str().unwrap();
        let revenue = summary.column(REVENUE).unwrap().f64().unwrap();

        assert_eq!(categories.get(0).unwrap(), "袋装");
        assert!((revenue.get(0).unwrap() - 68_826.24).abs() < EPS);

        let sum: f64 = revenue.into_iter().flatten().sum();
        assert!((sum - 92_979.04).abs() < EPS);
    }

    #[test]
    fn test_product_summary_ordering() {
        let summary = product_summary(&sample()).unwrap();
        assert_eq!(summary.height(), 16);

        let revenue = summary.column(REVENUE).unwrap().f64().unwrap();
        let values: Vec<f64> = revenue.into_iter().flatten().collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));

        // Highest earner is the 252-unit bag row.
        let codes = summary.column(PRODUCT_CODE).unwrap().str().unwrap();
        assert_eq!(codes.get(0).unwrap(), "F3411A");
        assert!((values[0] - 34_534.08).abs() < EPS);
    }

    #[test]
    fn test_empty_table_yields_empty_summaries() {
        let empty = sample().head(Some(0));
        assert_eq!(regional_summary(&empty).unwrap().height(), 0);
        assert_eq!(packaging_summary(&empty).unwrap().height(), 0);
        assert_eq!(rep_performance(&empty).unwrap().height(), 0);
        assert_eq!(product_summary(&empty).unwrap().height(), 0);
    }
}
