//! Aggregation library: the fixed set of group-by/summary computations over
//! a (possibly filtered) transaction table.
//!
//! Every function here is pure: it reads the table, produces a fresh result
//! frame or struct, and never mutates its input. Accumulation goes through
//! `BTreeMap` so output ordering is deterministic for identical inputs. An
//! empty input table yields an empty result structure, never an error.

mod cooccurrence;
mod customers;
mod penetration;
mod summaries;

pub use cooccurrence::{
    mean_products_per_customer, products_per_customer, share_of_customers_with_new, CoOccurrence,
};
pub use customers::{customer_features, top_customers_by_new_ratio};
pub use penetration::{
    market_penetration, monthly_penetration_trend, new_product_kpis, new_product_subset,
    regional_penetration, MarketPenetration, NewProductKpis,
};
pub use summaries::{
    overview_kpis, packaging_summary, product_summary, regional_summary, rep_performance,
    OverviewKpis,
};
