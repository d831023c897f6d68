//! CLI entry point for the sales analytics pipeline.

use anyhow::{anyhow, Result};
use clap::Parser;
use polars::prelude::*;
use sales_insight::aggregate::{
    customer_features, market_penetration, mean_products_per_customer, monthly_penetration_trend,
    new_product_kpis, overview_kpis, packaging_summary, regional_penetration, regional_summary,
    rep_performance, share_of_customers_with_new, top_customers_by_new_ratio, CoOccurrence,
};
use sales_insight::ingest::{columns, load_transactions};
use sales_insight::{format_yuan, AnalyticsConfig, FilterSelection, ReportCache, SourceOrigin};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Sales analytics for transaction spreadsheets",
    long_about = "Derives regional, customer and new-product analytics from a sales\n\
                  transaction CSV.\n\n\
                  EXAMPLES:\n  \
                  # Analyze a spreadsheet\n  \
                  sales-insight -i sales.csv\n\n  \
                  # Slice by region and rep, export the report bundle\n  \
                  sales-insight -i sales.csv --region 东 --rep 梁洪泽 --export\n\n  \
                  # Machine-readable KPIs\n  \
                  sales-insight -i sales.csv --json | jq .overview.total_revenue\n\n  \
                  # No input: runs on the built-in sample dataset"
)]
struct Args {
    /// Path to the sales transaction CSV
    ///
    /// When omitted (or unreadable), the built-in sample dataset is used
    #[arg(short, long)]
    input: Option<String>,

    /// Output directory for exported reports
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom report file stem (defaults to the input file name)
    #[arg(long)]
    output_name: Option<String>,

    /// Restrict to a region (repeatable)
    #[arg(long)]
    region: Vec<String>,

    /// Restrict to a customer (repeatable)
    #[arg(long)]
    customer: Vec<String>,

    /// Restrict to a product code (repeatable)
    #[arg(long)]
    product: Vec<String>,

    /// Restrict to a sales rep (repeatable)
    #[arg(long)]
    rep: Vec<String>,

    /// Product codes counted as new products (repeatable)
    ///
    /// Overrides the built-in default list
    #[arg(long)]
    new_product: Vec<String>,

    /// New-revenue ratio (percent) at which a customer counts as balanced
    #[arg(long, default_value = "10.0")]
    balanced_threshold: f64,

    /// New-revenue ratio (percent) at which a customer counts as innovative
    #[arg(long, default_value = "30.0")]
    innovative_threshold: f64,

    /// Number of entries in the top-customer listing
    #[arg(long, default_value = "5")]
    top: usize,

    /// Write the four-sheet CSV report bundle to the output directory
    #[arg(short, long)]
    export: bool,

    /// Output JSON to stdout instead of the human-readable summary
    ///
    /// Disables all logs; only the final JSON document is written.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final summary)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout
/// carries nothing but the JSON document.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn build_config(args: &Args) -> Result<AnalyticsConfig> {
    let mut builder = AnalyticsConfig::builder()
        .tier_breakpoints(args.balanced_threshold, args.innovative_threshold);
    if !args.new_product.is_empty() {
        builder = builder.new_product_codes(args.new_product.iter().cloned());
    }
    builder.build().map_err(|e| anyhow!("Invalid configuration: {e}"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let config = build_config(&args)?;

    let loaded = load_transactions(args.input.as_deref().map(Path::new), &config)?;
    match &loaded.origin {
        SourceOrigin::File(path) => info!("Analyzing {}", path.display()),
        SourceOrigin::Sample { reason: Some(reason) } => {
            warn!("Falling back to the sample dataset: {reason}");
        }
        SourceOrigin::Sample { reason: None } => info!("Analyzing the built-in sample dataset"),
        SourceOrigin::Minimal => warn!("Analyzing the minimal fallback table"),
    }
    for warning in &loaded.warnings {
        warn!("{warning}");
    }

    let selection = FilterSelection {
        regions: args.region.clone(),
        customers: args.customer.clone(),
        products: args.product.clone(),
        reps: args.rep.clone(),
    };
    let slice = selection.apply(&loaded.frame)?;
    if !selection.is_empty() {
        info!(
            rows = slice.height(),
            total = loaded.frame.height(),
            "Filters applied"
        );
    }

    if args.json {
        return print_json(&slice, &config, &loaded.origin);
    }

    print_summary(&slice, &config, &args)?;

    if args.export {
        let stem = args
            .output_name
            .clone()
            .or_else(|| {
                args.input
                    .as_deref()
                    .map(extract_file_stem)
            })
            .unwrap_or_else(|| "sample".to_string());
        let dir = PathBuf::from(&args.output);
        let paths = ReportCache::new().export(&slice, &config, &dir, &stem)?;
        println!();
        println!("Report written:");
        for path in paths {
            println!("  - {}", path.display());
        }
    }

    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("report")
        .to_string()
}

/// Print the machine-readable KPI document.
fn print_json(df: &DataFrame, config: &AnalyticsConfig, origin: &SourceOrigin) -> Result<()> {
    let document = serde_json::json!({
        "source": match origin {
            SourceOrigin::File(path) => format!("file:{}", path.display()),
            SourceOrigin::Sample { .. } => "sample".to_string(),
            SourceOrigin::Minimal => "minimal".to_string(),
        },
        "rows": df.height(),
        "overview": overview_kpis(df)?,
        "new_products": new_product_kpis(df, config)?,
        "market_penetration": market_penetration(df, config)?,
        "mean_products_per_customer": mean_products_per_customer(df)?,
        "share_of_customers_with_new_pct": share_of_customers_with_new(df, config)?,
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

/// Print the human-readable analysis summary.
///
/// Uses `println!` intentionally: this is the primary output of the tool and
/// should stay visible regardless of log level.
fn print_summary(df: &DataFrame, config: &AnalyticsConfig, args: &Args) -> Result<()> {
    println!();
    println!("{}", "=".repeat(80));
    println!("SALES ANALYSIS");
    println!("{}", "=".repeat(80));
    println!();

    if df.height() == 0 {
        println!("No rows match the current filters.");
        return Ok(());
    }

    let kpis = overview_kpis(df)?;
    println!("OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  Rows:           {}", df.height());
    println!("  Total revenue:  {}", format_yuan(kpis.total_revenue));
    println!("  Customers:      {}", kpis.customer_count);
    println!("  Products:       {}", kpis.product_count);
    println!("  Avg unit price: {:.2}元", kpis.avg_unit_price);
    println!();

    println!("REVENUE BY REGION");
    println!("{}", "-".repeat(40));
    let regional = regional_summary(df)?;
    let regions = regional.column(columns::REGION)?.str()?;
    let revenue = regional.column(columns::REVENUE)?.f64()?;
    for i in 0..regional.height() {
        println!(
            "  {:<6} {}",
            regions.get(i).unwrap_or("?"),
            format_yuan(revenue.get(i).unwrap_or(0.0))
        );
    }
    println!();

    println!("SALES REPS");
    println!("{}", "-".repeat(40));
    let reps = rep_performance(df)?;
    let names = reps.column(columns::SALES_REP)?.str()?;
    let revenue = reps.column(columns::REVENUE)?.f64()?;
    for i in 0..reps.height() {
        println!(
            "  {:<10} {}",
            names.get(i).unwrap_or("?"),
            format_yuan(revenue.get(i).unwrap_or(0.0))
        );
    }
    println!();

    println!("PACKAGING");
    println!("{}", "-".repeat(40));
    let packaging = packaging_summary(df)?;
    let categories = packaging.column(columns::PACKAGING)?.str()?;
    let revenue = packaging.column(columns::REVENUE)?.f64()?;
    for i in 0..packaging.height() {
        println!(
            "  {:<12} {}",
            categories.get(i).unwrap_or("?"),
            format_yuan(revenue.get(i).unwrap_or(0.0))
        );
    }
    println!();

    println!("NEW PRODUCTS");
    println!("{}", "-".repeat(40));
    let new_kpis = new_product_kpis(df, config)?;
    let penetration = market_penetration(df, config)?;
    println!("  Revenue:        {}", format_yuan(new_kpis.revenue));
    println!("  Revenue share:  {:.2}%", new_kpis.ratio_pct);
    println!(
        "  Adopters:       {} of {} customers ({:.1}%)",
        penetration.adopter_count, penetration.customer_count, penetration.penetration_pct
    );
    let regional_pen = regional_penetration(df, config)?;
    let regions = regional_pen.column(columns::REGION)?.str()?;
    let pct = regional_pen.column("penetration_pct")?.f64()?;
    for i in 0..regional_pen.height() {
        println!(
            "    {:<6} {:.1}%",
            regions.get(i).unwrap_or("?"),
            pct.get(i).unwrap_or(0.0)
        );
    }
    let trend = monthly_penetration_trend(df, config)?;
    if trend.height() > 1 {
        println!("  Monthly trend:");
        let months = trend.column(columns::MONTH_KEY)?.str()?;
        let pct = trend.column("penetration_pct")?.f64()?;
        for i in 0..trend.height() {
            println!(
                "    {:<8} {:.1}%",
                months.get(i).unwrap_or("?"),
                pct.get(i).unwrap_or(0.0)
            );
        }
    }
    println!();

    println!("TOP CUSTOMERS BY NEW-PRODUCT AFFINITY");
    println!("{}", "-".repeat(40));
    let features = customer_features(df, config)?;
    let top = top_customers_by_new_ratio(&features, args.top)?;
    let customers = top.column(columns::CUSTOMER)?.str()?;
    let ratios = top.column("new_ratio_pct")?.f64()?;
    let tiers = top.column("tier")?.str()?;
    for i in 0..top.height() {
        println!(
            "  {:<14} {:>6.2}%  {}",
            customers.get(i).unwrap_or("?"),
            ratios.get(i).unwrap_or(0.0),
            tiers.get(i).unwrap_or("?")
        );
    }
    println!();

    println!("BASKETS");
    println!("{}", "-".repeat(40));
    let matrix = CoOccurrence::build(df)?;
    println!(
        "  Avg products per customer: {:.1}",
        mean_products_per_customer(df)?
    );
    println!(
        "  Customers buying new:      {:.1}%",
        share_of_customers_with_new(df, config)?
    );
    println!("  Products in baskets:       {}", matrix.codes().len());
    println!();

    if !args.export {
        println!("Use --export to write the CSV report bundle");
    }
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));

    Ok(())
}
