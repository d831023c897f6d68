//! Integration tests for the sales analytics pipeline.
//!
//! These tests verify end-to-end behavior from ingestion through filtering,
//! aggregation and report export.

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use sales_insight::aggregate::{
    customer_features, market_penetration, new_product_kpis, overview_kpis, regional_summary,
    rep_performance, CoOccurrence,
};
use sales_insight::ingest::{load_transactions, sample_dataset};
use sales_insight::{AnalyticsConfig, FilterSelection, ReportBundle, ReportCache, SourceOrigin};
use std::path::{Path, PathBuf};

const EPS: f64 = 1e-6;

// ============================================================================
// Helper Functions
// ============================================================================

fn config() -> AnalyticsConfig {
    AnalyticsConfig::default()
}

fn sample() -> DataFrame {
    sample_dataset(&config()).expect("sample dataset should build")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sales_insight_it_{name}"));
    std::fs::remove_dir_all(&dir).ok();
    std::fs::create_dir_all(&dir).expect("scratch dir");
    dir
}

fn read_csv(path: &Path) -> DataFrame {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

// ============================================================================
// Ingestion
// ============================================================================

#[test]
fn test_load_from_csv_file() {
    let dir = scratch_dir("load");
    let path = dir.join("sales.csv");
    std::fs::write(
        &path,
        "customer,region,month,sales_rep,product_code,product_name,order_type,unit_price,quantity\n\
         广州佳成行,东,2025-03,梁洪泽,F3415D,口力酸小虫250G分享装袋装-中国,订单-正常产品,121.44,10\n\
         河南甜丰號,中,2025-04,胡斌,F0110C,口力软糖新品B-中国,订单-正常产品,150,30\n",
    )
    .expect("write fixture");

    let loaded = load_transactions(Some(&path), &config()).expect("load");
    assert_eq!(loaded.origin, SourceOrigin::File(path));
    assert_eq!(loaded.frame.height(), 2);
    assert!(loaded.warnings.is_empty());

    // Derived columns are present and correct.
    let revenue = loaded.frame.column("revenue").unwrap().f64().unwrap();
    assert!((revenue.get(0).unwrap() - 1214.4).abs() < EPS);
    let labels = loaded.frame.column("product_label").unwrap().str().unwrap();
    assert_eq!(labels.get(0).unwrap(), "酸小虫 (F3415D)");
    let months = loaded.frame.column("month_key").unwrap().str().unwrap();
    assert_eq!(months.get(1).unwrap(), "2025-04");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_schema_mismatch_degrades_to_sample() {
    let dir = scratch_dir("schema");
    let path = dir.join("wrong.csv");
    std::fs::write(&path, "a,b\n1,2\n").expect("write fixture");

    let loaded = load_transactions(Some(&path), &config()).expect("load");
    match loaded.origin {
        SourceOrigin::Sample { reason: Some(reason) } => {
            assert!(reason.contains("missing required columns"), "reason: {reason}");
        }
        other => panic!("expected sample fallback with reason, got {other:?}"),
    }
    assert_eq!(loaded.frame.height(), 16);

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Filter + Aggregate Flow
// ============================================================================

#[test]
fn test_sample_regression_totals() {
    let df = sample();
    let kpis = overview_kpis(&df).unwrap();
    assert!((kpis.total_revenue - 92_979.04).abs() < EPS);

    let regional = regional_summary(&df).unwrap();
    let revenue = regional.column("revenue").unwrap().f64().unwrap();
    let regional_total: f64 = revenue.into_iter().flatten().sum();
    assert!((regional_total - kpis.total_revenue).abs() < EPS);

    let reps = rep_performance(&df).unwrap();
    let revenue = reps.column("revenue").unwrap().f64().unwrap();
    let rep_total: f64 = revenue.into_iter().flatten().sum();
    assert!((rep_total - kpis.total_revenue).abs() < EPS);
}

#[test]
fn test_filtered_slice_flows_through_aggregations() {
    let df = sample();
    let east = FilterSelection {
        regions: vec!["东".to_string()],
        ..Default::default()
    }
    .apply(&df)
    .unwrap();

    let kpis = overview_kpis(&east).unwrap();
    assert!((kpis.total_revenue - 75_594.24).abs() < EPS);
    assert_eq!(kpis.customer_count, 1);

    // The eastern slice carries no new products.
    let new_kpis = new_product_kpis(&east, &config()).unwrap();
    assert_eq!(new_kpis.revenue, 0.0);
    assert_eq!(new_kpis.customer_count, 0);
    let pen = market_penetration(&east, &config()).unwrap();
    assert_eq!(pen.adopter_count, 0);
    assert!((pen.penetration_pct - 0.0).abs() < EPS);

    let features = customer_features(&east, &config()).unwrap();
    assert_eq!(features.height(), 1);
    let tiers = features.column("tier").unwrap().str().unwrap();
    assert_eq!(tiers.get(0).unwrap(), "保守型客户");
}

#[test]
fn test_cooccurrence_on_filtered_slice() {
    let df = sample();
    let slice = FilterSelection {
        customers: vec!["河南甜丰號".to_string()],
        ..Default::default()
    }
    .apply(&df)
    .unwrap();

    let matrix = CoOccurrence::build(&slice).unwrap();
    assert_eq!(matrix.codes().len(), 7);
    for a in matrix.codes() {
        assert_eq!(matrix.count(a, a), 0);
        for b in matrix.codes() {
            assert_eq!(matrix.count(a, b), matrix.count(b, a));
            if a != b {
                // A single customer's basket co-occurs everywhere.
                assert_eq!(matrix.count(a, b), 1);
            }
        }
    }
}

#[test]
fn test_empty_slice_is_tolerated_everywhere() {
    let df = sample();
    let empty = FilterSelection {
        customers: vec!["不存在的客户".to_string()],
        ..Default::default()
    }
    .apply(&df)
    .unwrap();
    assert_eq!(empty.height(), 0);

    assert_eq!(overview_kpis(&empty).unwrap().total_revenue, 0.0);
    assert_eq!(regional_summary(&empty).unwrap().height(), 0);
    assert_eq!(customer_features(&empty, &config()).unwrap().height(), 0);
    assert_eq!(new_product_kpis(&empty, &config()).unwrap().ratio_pct, 0.0);
    assert!(CoOccurrence::build(&empty).unwrap().is_empty());
}

// ============================================================================
// Report Export
// ============================================================================

#[test]
fn test_export_round_trip() {
    let dir = scratch_dir("export");
    let df = sample();

    let bundle = ReportBundle::build(&df, &config()).unwrap();
    let paths = bundle.write(&dir, "sample").unwrap();
    assert_eq!(paths.len(), 4);

    let regional_path = dir.join("sample_regional_summary.csv");
    assert!(paths.contains(&regional_path));
    let regional = read_csv(&regional_path);
    assert_eq!(regional.height(), 5);
    let revenue = regional.column("revenue").unwrap().f64().unwrap();
    let total: f64 = revenue.into_iter().flatten().sum();
    assert!((total - 92_979.04).abs() < 1e-2);

    let new_products = read_csv(&dir.join("sample_new_products.csv"));
    assert_eq!(new_products.height(), 5);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_report_cache_reuses_identical_slice() {
    let dir = scratch_dir("cache");
    let df = sample();
    let config = config();

    let mut cache = ReportCache::new();
    let first = cache.export(&df, &config, &dir, "run").unwrap();
    let modified = std::fs::metadata(&first[0]).unwrap().modified().unwrap();

    let second = cache.export(&df, &config, &dir, "run").unwrap();
    assert_eq!(first, second);
    // Unchanged data: nothing rewritten.
    assert_eq!(
        std::fs::metadata(&second[0]).unwrap().modified().unwrap(),
        modified
    );

    // A different slice writes fresh files.
    let east = FilterSelection {
        regions: vec!["东".to_string()],
        ..Default::default()
    }
    .apply(&df)
    .unwrap();
    let third = cache.export(&east, &config, &dir, "east").unwrap();
    assert!(third.iter().all(|p| p.exists()));
    assert_ne!(first, third);

    std::fs::remove_dir_all(&dir).ok();
}
