//! Simplified product labels.
//!
//! Full product names in the source data look like
//! `口力酸小虫250G分享装袋装-中国`: a brand marker, a short name, a size and
//! packaging suffix, and a trailing origin. The label keeps only the short
//! name plus the stable product code, e.g. `酸小虫 (F3415D)`. Several full
//! names may collapse to the same short label; the code stays the unique key.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalyticsConfig;

/// Residual size/unit tokens left after suffix truncation, e.g. `250` in
/// `酸小虫250` or `45G` in `比萨XXL45G`.
static SIZE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+\w*\s*").expect("Invalid regex: size token"));

/// Derive the simplified product label from a code and optional full name.
///
/// Returns the raw `code` whenever extraction is not possible: the name is
/// null, the brand marker is absent, or nothing readable remains after
/// stripping. This function never fails.
pub fn simplify_product_name(code: &str, full_name: Option<&str>, config: &AnalyticsConfig) -> String {
    let Some(name) = full_name else {
        return code.to_string();
    };

    let Some(after_brand) = name.splitn(2, config.brand_marker.as_str()).nth(1) else {
        return code.to_string();
    };

    // Drop the trailing origin ("-中国" etc.), keep the part before the dash.
    let mut part = match after_brand.split_once('-') {
        Some((before, _)) => before.trim(),
        None => after_brand.trim(),
    };

    for suffix in &config.size_suffixes {
        if let Some(idx) = part.find(suffix.as_str()) {
            part = &part[..idx];
            break;
        }
    }

    let residual = SIZE_TOKEN_RE.replace_all(part, "");
    let residual = residual.trim();

    if residual.is_empty() {
        code.to_string()
    } else {
        format!("{} ({})", residual, code)
    }
}
