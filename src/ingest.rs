//! Ingestion and normalization of sales transaction tables.
//!
//! The contract: given an optional source path, always come back with a
//! usable normalized table. A readable source with the nine required columns
//! is normalized in place; anything else degrades to the built-in sample
//! dataset (and, should even that fail to construct, to a minimal three-row
//! table). Degradation is never silent: the outcome carries its origin and
//! the warnings collected along the way.
//!
//! Normalization derives four columns: `revenue` (always recomputed as
//! `unit_price * quantity`), `month_key` (zero-padded `YYYY-MM`, null when
//! the month string does not parse), `product_label` and `packaging`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::config::AnalyticsConfig;
use crate::derive::{classify_packaging, simplify_product_name};
use crate::error::{AnalyticsError, Result};
use crate::utils::{f64_column, i64_column, str_column};

/// Canonical column names of the normalized transaction table.
pub mod columns {
    pub const CUSTOMER: &str = "customer";
    pub const REGION: &str = "region";
    pub const MONTH: &str = "month";
    pub const SALES_REP: &str = "sales_rep";
    pub const PRODUCT_CODE: &str = "product_code";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const ORDER_TYPE: &str = "order_type";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const QUANTITY: &str = "quantity";

    // Derived during normalization.
    pub const REVENUE: &str = "revenue";
    pub const MONTH_KEY: &str = "month_key";
    pub const PRODUCT_LABEL: &str = "product_label";
    pub const PACKAGING: &str = "packaging";
}

use columns::*;

/// The nine columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    CUSTOMER,
    REGION,
    MONTH,
    SALES_REP,
    PRODUCT_CODE,
    PRODUCT_NAME,
    ORDER_TYPE,
    UNIT_PRICE,
    QUANTITY,
];

/// Text columns coerced to string dtype so mixed-type keys (numeric-looking
/// customer names and the like) cannot break downstream grouping.
const TEXT_COLUMNS: [&str; 7] = [
    CUSTOMER,
    REGION,
    MONTH,
    SALES_REP,
    PRODUCT_CODE,
    PRODUCT_NAME,
    ORDER_TYPE,
];

/// Where the loaded table actually came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOrigin {
    /// Loaded and validated from the given file.
    File(PathBuf),
    /// Built-in sample dataset; `reason` explains the fallback when one
    /// was forced by a failed source.
    Sample { reason: Option<String> },
    /// Minimal three-row table (sample construction itself failed).
    Minimal,
}

impl SourceOrigin {
    /// True when the table is not the caller's own data.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::File(_))
    }
}

/// A normalized transaction table plus how it was obtained.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub frame: DataFrame,
    pub origin: SourceOrigin,
    /// Row-level degradations (unparseable months, non-numeric prices...).
    pub warnings: Vec<String>,
}

/// Load a transaction table from an optional CSV source.
///
/// Falls back to the sample dataset on a missing path, unreadable file or
/// schema mismatch; the returned [`SourceOrigin`] reports which path was
/// taken. Only a failure of the minimal fallback table itself - effectively
/// unreachable - produces an error.
pub fn load_transactions(path: Option<&Path>, config: &AnalyticsConfig) -> Result<LoadedData> {
    if let Some(path) = path {
        match load_from_file(path, config) {
            Ok(loaded) => return Ok(loaded),
            Err(e) if e.is_recoverable() => {
                warn!(code = e.error_code(), "Source rejected, using sample data: {}", e);
                let mut loaded = load_fallback(config)?;
                if let SourceOrigin::Sample { reason } = &mut loaded.origin {
                    *reason = Some(e.to_string());
                }
                return Ok(loaded);
            }
            Err(e) => return Err(e),
        }
    }

    debug!("No source supplied, using sample data");
    load_fallback(config)
}

fn load_from_file(path: &Path, config: &AnalyticsConfig) -> Result<LoadedData> {
    let raw = read_csv(path)?;
    validate_schema(&raw)?;
    let mut warnings = Vec::new();
    let frame = normalize(raw, config, &mut warnings)?;
    info!(
        rows = frame.height(),
        "Loaded transactions from {}",
        path.display()
    );
    Ok(LoadedData {
        frame,
        origin: SourceOrigin::File(path.to_path_buf()),
        warnings,
    })
}

/// Sample-then-minimal fallback chain. Each step is a total constructor in
/// spirit; the error path exists only because DataFrame assembly is fallible
/// in the type system.
fn load_fallback(config: &AnalyticsConfig) -> Result<LoadedData> {
    match sample_dataset(config) {
        Ok(frame) => Ok(LoadedData {
            frame,
            origin: SourceOrigin::Sample { reason: None },
            warnings: Vec::new(),
        }),
        Err(e) => {
            warn!("Sample dataset construction failed ({}), using minimal table", e);
            let frame = minimal_dataset(config)
                .map_err(|e| AnalyticsError::Internal(format!("minimal table failed: {e}")))?;
            Ok(LoadedData {
                frame,
                origin: SourceOrigin::Minimal,
                warnings: vec!["sample dataset construction failed".to_string()],
            })
        }
    }
}

/// Read a CSV file, retrying with relaxed parse options before giving up.
fn read_csv(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalyticsError::SourceUnreadable {
            path: path.display().to_string(),
            reason: "file does not exist".to_string(),
        });
    }

    // Strategy 1: standard loading with quote handling.
    let attempt = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish());
    match attempt {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard CSV loading failed: {}", e),
    }

    // Strategy 2: without quote handling.
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| AnalyticsError::SourceUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Require all nine named columns.
fn validate_schema(df: &DataFrame) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| !present.iter().any(|p| p == *name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AnalyticsError::MissingColumns(missing))
    }
}

/// Normalize a validated table: coerce types, recompute revenue, parse the
/// shipment month and append the derived label and packaging columns.
fn normalize(
    mut df: DataFrame,
    config: &AnalyticsConfig,
    warnings: &mut Vec<String>,
) -> Result<DataFrame> {
    for name in TEXT_COLUMNS {
        let cast = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        df.replace(name, cast)?;
    }

    for (name, dtype) in [(UNIT_PRICE, DataType::Float64), (QUANTITY, DataType::Int64)] {
        let before_nulls = df.column(name)?.null_count();
        let cast = df.column(name)?.as_materialized_series().cast(&dtype)?;
        let introduced = cast.null_count() - before_nulls;
        if introduced > 0 {
            warnings.push(format!(
                "{introduced} rows have a non-numeric '{name}' value and are excluded from revenue analysis"
            ));
        }
        df.replace(name, cast)?;
    }

    // Revenue is always recomputed, never trusted from the source.
    let prices = f64_column(&df, UNIT_PRICE)?;
    let quantities = i64_column(&df, QUANTITY)?;
    let revenue: Vec<Option<f64>> = prices
        .into_iter()
        .zip(quantities)
        .map(|(price, qty)| match (price, qty) {
            (Some(p), Some(q)) => Some(p * q as f64),
            _ => None,
        })
        .collect();
    df.with_column(Series::new(REVENUE.into(), revenue))?;

    let months = str_column(&df, MONTH)?;
    let month_keys: Vec<Option<String>> = months
        .into_iter()
        .map(|m| m.and_then(parse_month_key))
        .collect();
    let unparsed = month_keys.iter().filter(|k| k.is_none()).count();
    if unparsed > 0 {
        warnings.push(format!(
            "{unparsed} rows have an unparseable shipment month; monthly trends will skip them"
        ));
    }
    df.with_column(Series::new(MONTH_KEY.into(), month_keys))?;

    let codes = str_column(&df, PRODUCT_CODE)?;
    let names = str_column(&df, PRODUCT_NAME)?;
    let labels: Vec<String> = codes
        .into_iter()
        .zip(names)
        .map(|(code, name)| simplify_product_name(code.unwrap_or(""), name, config))
        .collect();
    let packaging: Vec<&'static str> = names
        .into_iter()
        .map(|name| classify_packaging(name).as_str())
        .collect();
    df.with_column(Series::new(PRODUCT_LABEL.into(), labels))?;
    df.with_column(Series::new(PACKAGING.into(), packaging))?;

    Ok(df)
}

/// Parse a shipment-month string into a zero-padded `YYYY-MM` key.
///
/// Accepts full dates, datetimes and bare year-month values with `-` or `/`
/// separators. Lexicographic order of the keys is chronological order.
pub fn parse_month_key(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Datetimes: keep the date part.
    let date_part = s.split(&[' ', 'T'][..]).next().unwrap_or(s);

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(date.format("%Y-%m").to_string());
        }
    }

    // Bare year-month: normalize by pinning the first day.
    let patched = format!("{}-01", date_part.replace('/', "-"));
    NaiveDate::parse_from_str(&patched, "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m").to_string())
}

/// Map product codes to their simplified labels, first occurrence wins.
pub fn product_label_map(df: &DataFrame) -> Result<BTreeMap<String, String>> {
    let codes = str_column(df, PRODUCT_CODE)?;
    let labels = str_column(df, PRODUCT_LABEL)?;
    let mut map = BTreeMap::new();
    for (code, label) in codes.into_iter().zip(labels) {
        if let (Some(code), Some(label)) = (code, label) {
            map.entry(code.to_string()).or_insert_with(|| label.to_string());
        }
    }
    Ok(map)
}

/// The built-in sample dataset: 16 representative rows spanning 5 regions,
/// 2 customers and 2 reps, including the 5 default new-product codes.
pub fn sample_dataset(config: &AnalyticsConfig) -> Result<DataFrame> {
    let product_codes = [
        "F3415D", "F3421D", "F0104J", "F0104L", "F3411A", "F01E4B", "F01L4C", "F01C2P", "F01E6D",
        "F3450B", "F3415B", "F0110C", "F0183F", "F01K8A", "F0183K", "F0101P",
    ];
    let product_names = [
        "口力酸小虫250G分享装袋装-中国",
        "口力可乐瓶250G分享装袋装-中国",
        "口力比萨XXL45G盒装-中国",
        "口力比萨68G袋装-中国",
        "口力午餐袋77G袋装-中国",
        "口力汉堡108G袋装-中国",
        "口力扭扭虫2KG迷你包-中国",
        "口力字节软糖2KG迷你包-中国",
        "口力西瓜1.5KG随手包-中国",
        "口力七彩熊1.5KG随手包-中国",
        "口力软糖新品A-中国",
        "口力软糖新品B-中国",
        "口力软糖新品C-中国",
        "口力软糖新品D-中国",
        "口力软糖新品E-中国",
        "口力软糖新品F-中国",
    ];
    let customers = [
        "广州佳成行", "广州佳成行", "广州佳成行", "广州佳成行", "广州佳成行", "广州佳成行",
        "河南甜丰號", "河南甜丰號", "河南甜丰號", "河南甜丰號", "河南甜丰號", "广州佳成行",
        "河南甜丰號", "广州佳成行", "河南甜丰號", "广州佳成行",
    ];
    let regions = [
        "东", "东", "东", "东", "东", "东", "中", "中", "中", "中", "中", "南", "中", "北", "北",
        "西",
    ];
    let reps = [
        "梁洪泽", "梁洪泽", "梁洪泽", "梁洪泽", "梁洪泽", "梁洪泽", "胡斌", "胡斌", "胡斌",
        "胡斌", "胡斌", "梁洪泽", "胡斌", "梁洪泽", "胡斌", "梁洪泽",
    ];
    let prices = [
        121.44, 121.44, 216.96, 126.72, 137.04, 137.04, 127.2, 127.2, 180.0, 180.0, 180.0, 150.0,
        160.0, 170.0, 180.0, 190.0,
    ];
    let quantities: [i64; 16] = [10, 10, 20, 50, 252, 204, 7, 2, 6, 6, 6, 30, 20, 15, 10, 5];

    let df = DataFrame::new(vec![
        Column::new(CUSTOMER.into(), customers.as_slice()),
        Column::new(REGION.into(), regions.as_slice()),
        Column::new(MONTH.into(), vec!["2025-03"; 16]),
        Column::new(SALES_REP.into(), reps.as_slice()),
        Column::new(PRODUCT_CODE.into(), product_codes.as_slice()),
        Column::new(PRODUCT_NAME.into(), product_names.as_slice()),
        Column::new(ORDER_TYPE.into(), vec!["订单-正常产品"; 16]),
        Column::new(UNIT_PRICE.into(), prices.as_slice()),
        Column::new(QUANTITY.into(), quantities.as_slice()),
    ])?;

    normalize(df, config, &mut Vec::new())
}

/// Last-resort three-row table; the terminal link of the fallback chain.
fn minimal_dataset(config: &AnalyticsConfig) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(CUSTOMER.into(), ["示例客户A", "示例客户B", "示例客户C"].as_slice()),
        Column::new(REGION.into(), ["东", "南", "中"].as_slice()),
        Column::new(MONTH.into(), vec!["2025-03"; 3]),
        Column::new(SALES_REP.into(), ["示例申请人A", "示例申请人B", "示例申请人C"].as_slice()),
        Column::new(PRODUCT_CODE.into(), ["X001", "X002", "X003"].as_slice()),
        Column::new(PRODUCT_NAME.into(), ["示例产品A", "示例产品B", "示例产品C"].as_slice()),
        Column::new(ORDER_TYPE.into(), vec!["订单-正常产品"; 3]),
        Column::new(UNIT_PRICE.into(), [100.0, 150.0, 200.0].as_slice()),
        Column::new(QUANTITY.into(), [10i64, 15, 20].as_slice()),
    ])?;

    normalize(df, config, &mut Vec::new())
}
