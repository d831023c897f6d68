//! Customer segmentation by new-product revenue ratio.
//!
//! Breakpoints are half-open upward: `[0, 10)` Conservative, `[10, 30)`
//! Balanced, `[30, 100]` Innovative (defaults; configurable via
//! [`AnalyticsConfig`]). A ratio sitting exactly on a breakpoint belongs to
//! the upper bucket.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;

/// Customer tier by willingness to buy new products.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerTier {
    /// Low new-product share; prefers established products.
    Conservative,
    /// Mixes new products with the established range.
    Balanced,
    /// High new-product share; the key audience for launches.
    Innovative,
}

impl CustomerTier {
    /// Display label, matching the labels used in the source data's locale.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conservative => "保守型客户",
            Self::Balanced => "平衡型客户",
            Self::Innovative => "创新型客户",
        }
    }
}

impl fmt::Display for CustomerTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a new-product revenue ratio (percent) into a tier.
pub fn classify_ratio(ratio_pct: f64, config: &AnalyticsConfig) -> CustomerTier {
    if ratio_pct < config.balanced_threshold {
        CustomerTier::Conservative
    } else if ratio_pct < config.innovative_threshold {
        CustomerTier::Balanced
    } else {
        CustomerTier::Innovative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    #[test]
    fn test_breakpoint_boundaries() {
        let c = config();
        assert_eq!(classify_ratio(0.0, &c), CustomerTier::Conservative);
        assert_eq!(classify_ratio(9.999, &c), CustomerTier::Conservative);
        assert_eq!(classify_ratio(10.0, &c), CustomerTier::Balanced);
        assert_eq!(classify_ratio(29.999, &c), CustomerTier::Balanced);
        assert_eq!(classify_ratio(30.0, &c), CustomerTier::Innovative);
        assert_eq!(classify_ratio(100.0, &c), CustomerTier::Innovative);
    }

    #[test]
    fn test_custom_breakpoints() {
        let c = AnalyticsConfig::builder().tier_breakpoints(20.0, 60.0).build().unwrap();
        assert_eq!(classify_ratio(15.0, &c), CustomerTier::Conservative);
        assert_eq!(classify_ratio(20.0, &c), CustomerTier::Balanced);
        assert_eq!(classify_ratio(60.0, &c), CustomerTier::Innovative);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CustomerTier::Conservative.as_str(), "保守型客户");
        assert_eq!(CustomerTier::Innovative.to_string(), "创新型客户");
    }
}
