//! Filter engine over the four analysis dimensions.
//!
//! Each dimension carries an optional set of allowed values. An empty
//! selection means "no restriction on that dimension", never "exclude
//! everything" - an empty multi-select in the UI is a no-op filter. Active
//! dimensions combine by logical AND.

use std::collections::HashSet;

use polars::prelude::*;

use crate::error::Result;
use crate::ingest::columns::{CUSTOMER, PRODUCT_CODE, REGION, SALES_REP};
use crate::utils::str_column;

/// Selected values per dimension. `Default` is the all-pass selection.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub regions: Vec<String>,
    pub customers: Vec<String>,
    pub products: Vec<String>,
    pub reps: Vec<String>,
}

impl FilterSelection {
    /// True when no dimension restricts anything.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
            && self.customers.is_empty()
            && self.products.is_empty()
            && self.reps.is_empty()
    }

    /// Apply the selection to a normalized transaction table, producing a
    /// new subset table. Idempotent: re-filtering a result by the same (or a
    /// superset) selection returns the same rows.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        if self.is_empty() {
            return Ok(df.clone());
        }

        let mut subset = df.clone();
        for (column, allowed) in [
            (REGION, &self.regions),
            (CUSTOMER, &self.customers),
            (PRODUCT_CODE, &self.products),
            (SALES_REP, &self.reps),
        ] {
            if allowed.is_empty() {
                continue;
            }
            let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
            let mask: BooleanChunked = str_column(&subset, column)?
                .into_iter()
                .map(|value| value.is_some_and(|v| allowed.contains(v)))
                .collect();
            subset = subset.filter(&mask)?;
        }

        Ok(subset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::ingest::sample_dataset;

    fn sample() -> DataFrame {
        sample_dataset(&AnalyticsConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let df = sample();
        let filtered = FilterSelection::default().apply(&df).unwrap();
        assert_eq!(filtered.height(), df.height());
    }

    #[test]
    fn test_region_filter() {
        let df = sample();
        let selection = FilterSelection {
            regions: vec!["东".to_string()],
            ..Default::default()
        };
        let filtered = selection.apply(&df).unwrap();
        assert_eq!(filtered.height(), 6);
    }

    #[test]
    fn test_dimensions_combine_with_and() {
        let df = sample();
        let selection = FilterSelection {
            regions: vec!["中".to_string()],
            customers: vec!["河南甜丰號".to_string()],
            ..Default::default()
        };
        let filtered = selection.apply(&df).unwrap();
        // All six 中 rows belong to 河南甜丰號.
        assert_eq!(filtered.height(), 6);

        let selection = FilterSelection {
            regions: vec!["中".to_string()],
            customers: vec!["广州佳成行".to_string()],
            ..Default::default()
        };
        assert_eq!(selection.apply(&df).unwrap().height(), 0);
    }

    #[test]
    fn test_membership_across_multiple_values() {
        let df = sample();
        let selection = FilterSelection {
            regions: vec!["北".to_string(), "西".to_string()],
            ..Default::default()
        };
        assert_eq!(selection.apply(&df).unwrap().height(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let df = sample();
        let selection = FilterSelection {
            regions: vec!["东".to_string()],
            reps: vec!["梁洪泽".to_string()],
            ..Default::default()
        };
        let once = selection.apply(&df).unwrap();
        let twice = selection.apply(&once).unwrap();
        assert_eq!(once.height(), twice.height());
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_superset_selection_on_subset_is_noop() {
        let df = sample();
        let narrow = FilterSelection {
            regions: vec!["北".to_string()],
            ..Default::default()
        };
        let subset = narrow.apply(&df).unwrap();

        let superset = FilterSelection {
            regions: vec!["北".to_string(), "西".to_string(), "东".to_string()],
            ..Default::default()
        };
        let refiltered = superset.apply(&subset).unwrap();
        assert!(subset.equals(&refiltered));
    }

    #[test]
    fn test_empty_table_stays_empty() {
        let df = sample();
        let none = FilterSelection {
            customers: vec!["不存在".to_string()],
            ..Default::default()
        };
        let empty = none.apply(&df).unwrap();
        assert_eq!(empty.height(), 0);

        let selection = FilterSelection {
            regions: vec!["东".to_string()],
            ..Default::default()
        };
        assert_eq!(selection.apply(&empty).unwrap().height(), 0);
    }
}
