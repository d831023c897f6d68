//! New-product adoption: KPIs, regional penetration and the monthly trend.
//!
//! "Adopter" means a customer with at least one transaction on a configured
//! new-product code within the slice being measured. Penetration is the
//! adopter share of all customers in that slice, as a percentage; a slice
//! with no customers reports 0 rather than dividing by zero.

use std::collections::{BTreeMap, HashSet};

use polars::prelude::*;
use serde::Serialize;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::ingest::columns::{CUSTOMER, MONTH_KEY, PRODUCT_CODE, REGION, REVENUE};
use crate::utils::{f64_column, str_column};

/// Headline new-product figures for a (filtered) transaction table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProductKpis {
    /// Revenue on new-product codes.
    pub revenue: f64,
    /// New-product share of total revenue, in percent.
    pub ratio_pct: f64,
    /// Distinct customers who bought at least one new product.
    pub customer_count: usize,
}

/// Adopter share across the whole table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPenetration {
    pub customer_count: usize,
    pub adopter_count: usize,
    pub penetration_pct: f64,
}

/// Rows whose product code is a configured new-product code.
pub fn new_product_subset(df: &DataFrame, config: &AnalyticsConfig) -> Result<DataFrame> {
    let codes = str_column(df, PRODUCT_CODE)?;
    let mask: BooleanChunked = codes
        .into_iter()
        .map(|code| code.is_some_and(|c| config.is_new_product(c)))
        .collect();
    Ok(df.filter(&mask)?)
}

/// Compute the headline new-product KPIs. Ratio is 0 for a zero-revenue table.
pub fn new_product_kpis(df: &DataFrame, config: &AnalyticsConfig) -> Result<NewProductKpis> {
    let codes = str_column(df, PRODUCT_CODE)?;
    let customers = str_column(df, CUSTOMER)?;
    let revenue = f64_column(df, REVENUE)?;

    let mut new_revenue = 0.0;
    let mut total_revenue = 0.0;
    let mut adopters: HashSet<&str> = HashSet::new();
    for i in 0..df.height() {
        let row_revenue = revenue.get(i).unwrap_or(0.0);
        total_revenue += row_revenue;
        if codes.get(i).is_some_and(|c| config.is_new_product(c)) {
            new_revenue += row_revenue;
            if let Some(customer) = customers.get(i) {
                adopters.insert(customer);
            }
        }
    }

    let ratio_pct = if total_revenue > 0.0 {
        new_revenue / total_revenue * 100.0
    } else {
        0.0
    };
    Ok(NewProductKpis {
        revenue: new_revenue,
        ratio_pct,
        customer_count: adopters.len(),
    })
}

/// Adopter share of the customer base across the whole table.
pub fn market_penetration(df: &DataFrame, config: &AnalyticsConfig) -> Result<MarketPenetration> {
    let codes = str_column(df, PRODUCT_CODE)?;
    let customers = str_column(df, CUSTOMER)?;

    let mut all: HashSet<&str> = HashSet::new();
    let mut adopters: HashSet<&str> = HashSet::new();
    for i in 0..df.height() {
        let Some(customer) = customers.get(i) else { continue };
        all.insert(customer);
        if codes.get(i).is_some_and(|c| config.is_new_product(c)) {
            adopters.insert(customer);
        }
    }

    Ok(MarketPenetration {
        customer_count: all.len(),
        adopter_count: adopters.len(),
        penetration_pct: share_pct(adopters.len(), all.len()),
    })
}

/// Penetration per region, ascending region order.
pub fn regional_penetration(df: &DataFrame, config: &AnalyticsConfig) -> Result<DataFrame> {
    penetration_by_key(df, config, REGION)
}

/// Penetration per shipment month, chronological order. Rows without a
/// parseable month are left out.
pub fn monthly_penetration_trend(df: &DataFrame, config: &AnalyticsConfig) -> Result<DataFrame> {
    penetration_by_key(df, config, MONTH_KEY)
}

#[derive(Default)]
struct PenetrationAccumulator {
    customers: HashSet<String>,
    adopters: HashSet<String>,
}

fn penetration_by_key(df: &DataFrame, config: &AnalyticsConfig, key: &str) -> Result<DataFrame> {
    let keys = str_column(df, key)?;
    let codes = str_column(df, PRODUCT_CODE)?;
    let customers = str_column(df, CUSTOMER)?;

    let mut acc: BTreeMap<String, PenetrationAccumulator> = BTreeMap::new();
    for i in 0..df.height() {
        let Some(group) = keys.get(i) else { continue };
        let Some(customer) = customers.get(i) else { continue };
        let entry = acc.entry(group.to_string()).or_default();
        entry.customers.insert(customer.to_string());
        if codes.get(i).is_some_and(|c| config.is_new_product(c)) {
            entry.adopters.insert(customer.to_string());
        }
    }

    let mut key_col = Vec::with_capacity(acc.len());
    let mut customer_col = Vec::with_capacity(acc.len());
    let mut adopter_col = Vec::with_capacity(acc.len());
    let mut pct_col = Vec::with_capacity(acc.len());
    for (group, entry) in acc {
        key_col.push(group);
        customer_col.push(entry.customers.len() as u32);
        adopter_col.push(entry.adopters.len() as u32);
        pct_col.push(share_pct(entry.adopters.len(), entry.customers.len()));
    }

    Ok(DataFrame::new(vec![
        Column::new(key.into(), key_col),
        Column::new("customer_count".into(), customer_col),
        Column::new("adopter_count".into(), adopter_col),
        Column::new("penetration_pct".into(), pct_col),
    ])?)
}

fn share_pct(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
