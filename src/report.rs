//! Report export: the four-sheet analysis bundle written as CSV files.
//!
//! A bundle is built from an already-filtered table and never mutates its
//! inputs. Writing produces one CSV per sheet under a target directory, named
//! `{stem}_{sheet}.csv`. [`ReportCache`] memoizes written bundles by a
//! content fingerprint of the source table so repeated exports of an
//! unchanged slice are free.

use std::collections::HashMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::aggregate::{new_product_subset, product_summary, regional_summary};
use crate::config::AnalyticsConfig;
use crate::error::{AnalyticsError, Result};

/// The four sheets of an analysis report.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    /// The filtered transaction rows themselves.
    pub transactions: DataFrame,
    /// Transactions restricted to new-product codes.
    pub new_products: DataFrame,
    /// Per-region revenue, customers, products, units.
    pub regional_summary: DataFrame,
    /// Per-product revenue, buyers, units, best first.
    pub product_summary: DataFrame,
}

impl ReportBundle {
    /// Assemble the bundle from a normalized (possibly filtered) table.
    pub fn build(df: &DataFrame, config: &AnalyticsConfig) -> Result<Self> {
        Ok(Self {
            transactions: df.clone(),
            new_products: new_product_subset(df, config)?,
            regional_summary: regional_summary(df)?,
            product_summary: product_summary(df)?,
        })
    }

    /// Sheet names with their tables, in writing order.
    pub fn sheets(&self) -> [(&'static str, &DataFrame); 4] {
        [
            ("transactions", &self.transactions),
            ("new_products", &self.new_products),
            ("regional_summary", &self.regional_summary),
            ("product_summary", &self.product_summary),
        ]
    }

    /// Write one CSV per sheet into `dir`, returning the written paths.
    pub fn write(&self, dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AnalyticsError::ExportFailed(format!("cannot create {}: {e}", dir.display()))
        })?;

        let mut written = Vec::with_capacity(4);
        for (name, sheet) in self.sheets() {
            let path = dir.join(format!("{stem}_{name}.csv"));
            let file = File::create(&path).map_err(|e| {
                AnalyticsError::ExportFailed(format!("cannot create {}: {e}", path.display()))
            })?;
            let mut out = sheet.clone();
            CsvWriter::new(file)
                .include_header(true)
                .finish(&mut out)
                .map_err(|e| {
                    AnalyticsError::ExportFailed(format!("cannot write {}: {e}", path.display()))
                })?;
            debug!(rows = sheet.height(), "Wrote sheet {}", path.display());
            written.push(path);
        }

        info!(sheets = written.len(), "Report exported to {}", dir.display());
        Ok(written)
    }
}

/// Content fingerprint of a table: dimensions, column names and every cell.
/// Identical data in identical order hashes identically.
pub fn dataset_fingerprint(df: &DataFrame) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    df.height().hash(&mut hasher);
    df.width().hash(&mut hasher);
    for column in df.get_columns() {
        column.name().as_str().hash(&mut hasher);
        let series = column.as_materialized_series();
        for value in series.iter() {
            format!("{value:?}").hash(&mut hasher);
        }
    }
    hasher.finish()
}

/// Caller-owned memo of exports already written this session, keyed by the
/// fingerprint of the source table.
#[derive(Debug, Default)]
pub struct ReportCache {
    written: HashMap<u64, Vec<PathBuf>>,
}

impl ReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export `df` unless an identical table was already exported; either way
    /// return the paths of the bundle on disk.
    pub fn export(
        &mut self,
        df: &DataFrame,
        config: &AnalyticsConfig,
        dir: &Path,
        stem: &str,
    ) -> Result<Vec<PathBuf>> {
        let key = dataset_fingerprint(df);
        if let Some(paths) = self.written.get(&key) {
            if paths.iter().all(|p| p.exists()) {
                debug!("Report for this slice already written, reusing");
                return Ok(paths.clone());
            }
        }

        let paths = ReportBundle::build(df, config)?.write(dir, stem)?;
        self.written.insert(key, paths.clone());
        Ok(paths)
    }
}
