//! Sales Analytics Derivation Library
//!
//! A candy-wholesale sales analytics pipeline built with Rust and Polars.
//!
//! # Overview
//!
//! This library turns a raw transaction spreadsheet into analysis-ready
//! tables and reports:
//!
//! - **Ingestion**: CSV loading with schema validation and a built-in sample
//!   dataset fallback, so the pipeline always has data to work with
//! - **Normalization**: type coercion, recomputed revenue, month keys and
//!   the derived product-label and packaging columns
//! - **Filtering**: multi-value selections over region, customer, product
//!   and sales rep, combined with AND semantics
//! - **Aggregation**: headline KPIs, regional/packaging/rep summaries,
//!   per-customer features with tier segmentation, new-product penetration
//!   and the product co-occurrence matrix
//! - **Reporting**: a four-sheet CSV export bundle with content-hash
//!   memoization
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sales_insight::{AnalyticsConfig, FilterSelection};
//! use sales_insight::ingest::load_transactions;
//! use sales_insight::aggregate::{overview_kpis, customer_features};
//!
//! let config = AnalyticsConfig::default();
//! let loaded = load_transactions(Some("sales.csv".as_ref()), &config)?;
//!
//! let selection = FilterSelection {
//!     regions: vec!["东".to_string()],
//!     ..Default::default()
//! };
//! let slice = selection.apply(&loaded.frame)?;
//!
//! let kpis = overview_kpis(&slice)?;
//! let customers = customer_features(&slice, &config)?;
//! println!("total revenue: {}", sales_insight::format_yuan(kpis.total_revenue));
//! ```
//!
//! # Configuration
//!
//! Use [`AnalyticsConfig`] to customize what counts as a new product and
//! where the customer tiers break:
//!
//! ```rust,ignore
//! let config = AnalyticsConfig::builder()
//!     .new_product_codes(["F0110C", "F0183F"])
//!     .tier_breakpoints(15.0, 40.0)
//!     .build()?;
//! ```

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod report;
pub mod segment;
pub mod utils;

// Re-exports for convenient access
pub use config::{AnalyticsConfig, AnalyticsConfigBuilder, ConfigValidationError};
pub use derive::{classify_packaging, simplify_product_name, PackagingCategory, PackagingClassifier};
pub use error::{AnalyticsError, Result as AnalyticsResult, ResultExt};
pub use filter::FilterSelection;
pub use ingest::{load_transactions, LoadedData, SourceOrigin};
pub use report::{dataset_fingerprint, ReportBundle, ReportCache};
pub use segment::{classify_ratio, CustomerTier};
pub use utils::format_yuan;
