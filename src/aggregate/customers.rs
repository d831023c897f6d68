//! Per-customer feature table: spend, breadth, new-product affinity, tier.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::ingest::columns::{CUSTOMER, PRODUCT_CODE, QUANTITY, REVENUE, UNIT_PRICE};
use crate::segment::classify_ratio;
use crate::utils::{f64_column, i64_column, str_column};

#[derive(Default)]
struct CustomerAccumulator {
    revenue: f64,
    new_revenue: f64,
    quantity: i64,
    price_sum: f64,
    price_count: usize,
    products: HashSet<String>,
}

/// Build the per-customer feature table.
///
/// Columns: `customer`, `revenue`, `product_count`, `quantity`,
/// `avg_unit_price`, `new_revenue`, `new_ratio_pct`, `tier`. A customer with
/// zero revenue gets a ratio of 0 rather than a division error. Sorted by
/// revenue descending, customer ascending on ties.
pub fn customer_features(df: &DataFrame, config: &AnalyticsConfig) -> Result<DataFrame> {
    let customers = str_column(df, CUSTOMER)?;
    let codes = str_column(df, PRODUCT_CODE)?;
    let revenue = f64_column(df, REVENUE)?;
    let prices = f64_column(df, UNIT_PRICE)?;
    let quantities = i64_column(df, QUANTITY)?;

    let mut acc: BTreeMap<String, CustomerAccumulator> = BTreeMap::new();
    for i in 0..df.height() {
        let Some(customer) = customers.get(i) else { continue };
        let entry = acc.entry(customer.to_string()).or_default();
        let row_revenue = revenue.get(i).unwrap_or(0.0);
        entry.revenue += row_revenue;
        entry.quantity += quantities.get(i).unwrap_or(0);
        if let Some(price) = prices.get(i) {
            entry.price_sum += price;
            entry.price_count += 1;
        }
        if let Some(code) = codes.get(i) {
            entry.products.insert(code.to_string());
            if config.is_new_product(code) {
                entry.new_revenue += row_revenue;
            }
        }
    }

    let mut rows: Vec<(String, CustomerAccumulator)> = acc.into_iter().collect();
    rows.sort_by(|a, b| {
        b.1.revenue
            .partial_cmp(&a.1.revenue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut customer_col = Vec::with_capacity(rows.len());
    let mut revenue_col = Vec::with_capacity(rows.len());
    let mut product_col = Vec::with_capacity(rows.len());
    let mut quantity_col = Vec::with_capacity(rows.len());
    let mut price_col = Vec::with_capacity(rows.len());
    let mut new_revenue_col = Vec::with_capacity(rows.len());
    let mut ratio_col = Vec::with_capacity(rows.len());
    let mut tier_col = Vec::with_capacity(rows.len());
    for (customer, entry) in rows {
        let ratio = if entry.revenue > 0.0 {
            entry.new_revenue / entry.revenue * 100.0
        } else {
            0.0
        };
        let avg_price = if entry.price_count > 0 {
            entry.price_sum / entry.price_count as f64
        } else {
            0.0
        };
        customer_col.push(customer);
        revenue_col.push(entry.revenue);
        product_col.push(entry.products.len() as u32);
        quantity_col.push(entry.quantity);
        price_col.push(avg_price);
        new_revenue_col.push(entry.new_revenue);
        ratio_col.push(ratio);
        tier_col.push(classify_ratio(ratio, config).as_str());
    }

    Ok(DataFrame::new(vec![
        Column::new(CUSTOMER.into(), customer_col),
        Column::new(REVENUE.into(), revenue_col),
        Column::new("product_count".into(), product_col),
        Column::new(QUANTITY.into(), quantity_col),
        Column::new("avg_unit_price".into(), price_col),
        Column::new("new_revenue".into(), new_revenue_col),
        Column::new("new_ratio_pct".into(), ratio_col),
        Column::new("tier".into(), tier_col),
    ])?)
}

/// The `n` customers most inclined toward new products, by revenue ratio.
pub fn top_customers_by_new_ratio(features: &DataFrame, n: usize) -> Result<DataFrame> {
    let sorted = features.sort(
        ["new_ratio_pct"],
        SortMultipleOptions::default().with_order_descending(true),
    )?;
    Ok(sorted.head(Some(n)))
}
