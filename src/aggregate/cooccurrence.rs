//! Product basket analysis: which products the same customers buy together.
//!
//! The co-occurrence count of a product pair is the number of customers who
//! bought both. The matrix is symmetric with a zero diagonal; transaction
//! multiplicity does not matter, only distinct (customer, product) pairs.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;

use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::ingest::columns::{CUSTOMER, PRODUCT_CODE};
use crate::utils::str_column;

/// Distinct product codes per customer.
fn customer_baskets(df: &DataFrame) -> Result<BTreeMap<String, BTreeSet<String>>> {
    let customers = str_column(df, CUSTOMER)?;
    let codes = str_column(df, PRODUCT_CODE)?;

    let mut baskets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (customer, code) in customers.into_iter().zip(codes) {
        if let (Some(customer), Some(code)) = (customer, code) {
            baskets
                .entry(customer.to_string())
                .or_default()
                .insert(code.to_string());
        }
    }
    Ok(baskets)
}

/// Symmetric product co-occurrence matrix over customer baskets.
#[derive(Debug, Clone)]
pub struct CoOccurrence {
    /// Product codes in ascending order; row/column index order.
    codes: Vec<String>,
    counts: Vec<Vec<u32>>,
}

impl CoOccurrence {
    /// Build the matrix from a normalized transaction table.
    pub fn build(df: &DataFrame) -> Result<Self> {
        let baskets = customer_baskets(df)?;

        let codes: Vec<String> = baskets
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let index: BTreeMap<&str, usize> = codes
            .iter()
            .enumerate()
            .map(|(i, code)| (code.as_str(), i))
            .collect();

        let mut counts = vec![vec![0u32; codes.len()]; codes.len()];
        for basket in baskets.values() {
            let members: Vec<usize> = basket.iter().filter_map(|c| index.get(c.as_str())).copied().collect();
            for (a, &i) in members.iter().enumerate() {
                for &j in &members[a + 1..] {
                    counts[i][j] += 1;
                    counts[j][i] += 1;
                }
            }
        }

        Ok(Self { codes, counts })
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Product codes in matrix order.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Customers who bought both products; 0 for an unknown code or `a == b`.
    pub fn count(&self, a: &str, b: &str) -> u32 {
        match (self.index_of(a), self.index_of(b)) {
            (Some(i), Some(j)) => self.counts[i][j],
            _ => 0,
        }
    }

    /// The `n` products most often bought alongside `code`, count descending,
    /// code ascending on ties. Zero-count pairs are left out.
    pub fn top_partners(&self, code: &str, n: usize) -> Vec<(String, u32)> {
        let Some(i) = self.index_of(code) else {
            return Vec::new();
        };
        let mut partners: Vec<(String, u32)> = self.counts[i]
            .iter()
            .enumerate()
            .filter(|&(j, &count)| j != i && count > 0)
            .map(|(j, &count)| (self.codes[j].clone(), count))
            .collect();
        partners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        partners.truncate(n);
        partners
    }

    /// Render the matrix as a table: one `product_code` column followed by
    /// one count column per code.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.codes.len() + 1);
        columns.push(Column::new(PRODUCT_CODE.into(), self.codes.clone()));
        for (j, code) in self.codes.iter().enumerate() {
            let column: Vec<u32> = self.counts.iter().map(|row| row[j]).collect();
            columns.push(Column::new(code.as_str().into(), column));
        }
        Ok(DataFrame::new(columns)?)
    }

    fn index_of(&self, code: &str) -> Option<usize> {
        self.codes.binary_search_by(|c| c.as_str().cmp(code)).ok()
    }
}

/// Histogram of basket breadth: how many customers bought exactly N distinct
/// products. Ascending by product count.
pub fn products_per_customer(df: &DataFrame) -> Result<DataFrame> {
    let baskets = customer_baskets(df)?;

    let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
    for basket in baskets.values() {
        *histogram.entry(basket.len() as u32).or_default() += 1;
    }

    let (count_col, customer_col): (Vec<u32>, Vec<u32>) = histogram.into_iter().unzip();
    Ok(DataFrame::new(vec![
        Column::new("product_count".into(), count_col),
        Column::new("customer_count".into(), customer_col),
    ])?)
}

/// Mean distinct products per customer; 0 for an empty table.
pub fn mean_products_per_customer(df: &DataFrame) -> Result<f64> {
    let baskets = customer_baskets(df)?;
    if baskets.is_empty() {
        return Ok(0.0);
    }
    let total: usize = baskets.values().map(BTreeSet::len).sum();
    Ok(total as f64 / baskets.len() as f64)
}

/// Share of customers (percent) whose basket contains a new product.
pub fn share_of_customers_with_new(df: &DataFrame, config: &AnalyticsConfig) -> Result<f64> {
    let baskets = customer_baskets(df)?;
    if baskets.is_empty() {
        return Ok(0.0);
    }
    let with_new = baskets
        .values()
        .filter(|basket| basket.iter().any(|code| config.is_new_product(code)))
        .count();
    Ok(with_new as f64 / baskets.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::sample_dataset;

    fn sample() -> DataFrame {
        sample_dataset(&AnalyticsConfig::default()).unwrap()
    }

    #[test]
    fn test_matrix_is_symmetric_with_zero_diagonal() {
        let matrix = CoOccurrence::build(&sample()).unwrap();
        assert_eq!(matrix.codes().len(), 16);
        for a in matrix.codes() {
            assert_eq!(matrix.count(a, a), 0);
            for b in matrix.codes() {
                assert_eq!(matrix.count(a, b), matrix.count(b, a));
            }
        }
    }

    #[test]
    fn test_counts_follow_baskets() {
        let matrix = CoOccurrence::build(&sample()).unwrap();
        // Same customer's basket.
        assert_eq!(matrix.count("F3415D", "F3421D"), 1);
        // The two sample customers share no products.
        assert_eq!(matrix.count("F3415D", "F01L4C"), 0);
        // Unknown code.
        assert_eq!(matrix.count("F3415D", "ZZZZ"), 0);
    }

    #[test]
    fn test_top_partners() {
        let matrix = CoOccurrence::build(&sample()).unwrap();
        let partners = matrix.top_partners("F3415D", 3);
        assert_eq!(partners.len(), 3);
        // Count ties resolve by ascending code.
        assert_eq!(partners[0], ("F0101P".to_string(), 1));
        assert!(partners.iter().all(|(_, count)| *count == 1));

        assert!(matrix.top_partners("ZZZZ", 3).is_empty());
    }

    #[test]
    fn test_to_dataframe_shape() {
        let matrix = CoOccurrence::build(&sample()).unwrap();
        let df = matrix.to_dataframe().unwrap();
        assert_eq!(df.height(), 16);
        assert_eq!(df.width(), 17);
        let diagonal = df.column("F3415D").unwrap().u32().unwrap();
        let codes = df.column(PRODUCT_CODE).unwrap().str().unwrap();
        let row = codes.into_iter().position(|c| c == Some("F3415D")).unwrap();
        assert_eq!(diagonal.get(row).unwrap(), 0);
    }

    #[test]
    fn test_products_per_customer_histogram() {
        let histogram = products_per_customer(&sample()).unwrap();
        assert_eq!(histogram.height(), 2);
        let counts = histogram.column("product_count").unwrap().u32().unwrap();
        let customers = histogram.column("customer_count").unwrap().u32().unwrap();
        assert_eq!(counts.get(0).unwrap(), 7);
        assert_eq!(customers.get(0).unwrap(), 1);
        assert_eq!(counts.get(1).unwrap(), 9);
        assert_eq!(customers.get(1).unwrap(), 1);
    }

    #[test]
    fn test_mean_and_new_share() {
        let config = AnalyticsConfig::default();
        let df = sample();
        assert_eq!(mean_products_per_customer(&df).unwrap(), 8.0);
        assert_eq!(share_of_customers_with_new(&df, &config).unwrap(), 100.0);
    }

    #[test]
    fn test_empty_table() {
        let config = AnalyticsConfig::default();
        let empty = sample().head(Some(0));
        let matrix = CoOccurrence::build(&empty).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.to_dataframe().unwrap().width(), 1);
        assert_eq!(mean_products_per_customer(&empty).unwrap(), 0.0);
        assert_eq!(share_of_customers_with_new(&empty, &config).unwrap(), 0.0);
    }
}
