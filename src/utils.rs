//! Shared helpers for the analytics pipeline.
//!
//! Column accessors wrap the polars lookups with a domain error, and the
//! currency formatter reproduces the reporting convention of the upstream
//! sales data (yuan with 万/亿 scaling).

use polars::prelude::*;

use crate::error::{AnalyticsError, Result};

/// Borrow a string column by name.
pub(crate) fn str_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let col = df
        .column(name)
        .map_err(|_| AnalyticsError::ColumnNotFound(name.to_string()))?;
    Ok(col.as_materialized_series().str()?)
}

/// Borrow a float column by name.
pub(crate) fn f64_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Float64Chunked> {
    let col = df
        .column(name)
        .map_err(|_| AnalyticsError::ColumnNotFound(name.to_string()))?;
    Ok(col.as_materialized_series().f64()?)
}

/// Borrow an integer column by name.
pub(crate) fn i64_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Int64Chunked> {
    let col = df
        .column(name)
        .map_err(|_| AnalyticsError::ColumnNotFound(name.to_string()))?;
    Ok(col.as_materialized_series().i64()?)
}

/// Format a yuan amount with 万 (1e4) and 亿 (1e8) scaling, two decimals.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(format_yuan(1234.5), "1234.50元");
/// assert_eq!(format_yuan(92979.04), "9.30万元");
/// ```
pub fn format_yuan(value: f64) -> String {
    if value >= 1e8 {
        format!("{:.2}亿元", value / 1e8)
    } else if value >= 1e4 {
        format!("{:.2}万元", value / 1e4)
    } else {
        format!("{:.2}元", value)
    }
}
