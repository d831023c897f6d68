//! Configuration for the analytics pipeline.
//!
//! The rule tables that drive the derived columns (new-product codes, label
//! simplification suffixes, segmentation breakpoints) are configuration, not
//! hard-wired semantics: they were reverse-engineered from sample product
//! strings and deployments may need to adjust them.

use serde::{Deserialize, Serialize};

/// Default new-product code allowlist.
pub const DEFAULT_NEW_PRODUCT_CODES: [&str; 5] = ["F0110C", "F0183F", "F01K8A", "F0183K", "F0101P"];

/// Default brand marker stripped from full product names.
pub const DEFAULT_BRAND_MARKER: &str = "口力";

/// Default packaging-size suffixes, truncated at first occurrence during
/// label simplification. Order matters: longer/more specific tokens first.
pub const DEFAULT_SIZE_SUFFIXES: [&str; 5] =
    ["G分享装袋装", "G盒装", "G袋装", "KG迷你包", "KG随手包"];

/// Configuration for the analytics pipeline.
///
/// Use [`AnalyticsConfig::builder()`] for fluent construction.
///
/// # Example
///
/// ```rust,ignore
/// let config = AnalyticsConfig::builder()
///     .new_product_codes(["F0110C", "F0183F"])
///     .tier_breakpoints(10.0, 30.0)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Product codes flagged as "new" (deployment-supplied allowlist).
    pub new_product_codes: Vec<String>,

    /// Lower tier breakpoint: new-product revenue ratio (percent) at or above
    /// which a customer is Balanced rather than Conservative. Default: 10.0.
    pub balanced_threshold: f64,

    /// Upper tier breakpoint: ratio (percent) at or above which a customer is
    /// Innovative. Default: 30.0.
    pub innovative_threshold: f64,

    /// Brand marker split off the front of full product names.
    pub brand_marker: String,

    /// Packaging-size suffix tokens truncated during label simplification.
    pub size_suffixes: Vec<String>,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            new_product_codes: DEFAULT_NEW_PRODUCT_CODES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            balanced_threshold: 10.0,
            innovative_threshold: 30.0,
            brand_marker: DEFAULT_BRAND_MARKER.to_string(),
            size_suffixes: DEFAULT_SIZE_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalyticsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AnalyticsConfigBuilder {
        AnalyticsConfigBuilder::default()
    }

    /// Check whether a product code is in the new-product allowlist.
    pub fn is_new_product(&self, code: &str) -> bool {
        self.new_product_codes.iter().any(|c| c == code)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(0.0..=100.0).contains(&self.balanced_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "balanced_threshold".to_string(),
                value: self.balanced_threshold,
            });
        }

        if !(0.0..=100.0).contains(&self.innovative_threshold) {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "innovative_threshold".to_string(),
                value: self.innovative_threshold,
            });
        }

        if self.balanced_threshold >= self.innovative_threshold {
            return Err(ConfigValidationError::UnorderedBreakpoints {
                lower: self.balanced_threshold,
                upper: self.innovative_threshold,
            });
        }

        if self.brand_marker.is_empty() {
            return Err(ConfigValidationError::EmptyBrandMarker);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 100.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Tier breakpoints out of order: {lower} must be below {upper}")]
    UnorderedBreakpoints { lower: f64, upper: f64 },

    #[error("Brand marker must not be empty")]
    EmptyBrandMarker,
}

/// Builder for [`AnalyticsConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct AnalyticsConfigBuilder {
    new_product_codes: Option<Vec<String>>,
    balanced_threshold: Option<f64>,
    innovative_threshold: Option<f64>,
    brand_marker: Option<String>,
    size_suffixes: Option<Vec<String>>,
}

impl AnalyticsConfigBuilder {
    /// Set the new-product code allowlist.
    pub fn new_product_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.new_product_codes = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Set both tier breakpoints (percent values, lower < upper).
    pub fn tier_breakpoints(mut self, balanced: f64, innovative: f64) -> Self {
        self.balanced_threshold = Some(balanced);
        self.innovative_threshold = Some(innovative);
        self
    }

    /// Set the brand marker used by label simplification.
    pub fn brand_marker(mut self, marker: impl Into<String>) -> Self {
        self.brand_marker = Some(marker.into());
        self
    }

    /// Set the packaging-size suffix tokens for label simplification.
    pub fn size_suffixes<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.size_suffixes = Some(suffixes.into_iter().map(Into::into).collect());
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<AnalyticsConfig, ConfigValidationError> {
        let defaults = AnalyticsConfig::default();
        let config = AnalyticsConfig {
            new_product_codes: self.new_product_codes.unwrap_or(defaults.new_product_codes),
            balanced_threshold: self.balanced_threshold.unwrap_or(defaults.balanced_threshold),
            innovative_threshold: self
                .innovative_threshold
                .unwrap_or(defaults.innovative_threshold),
            brand_marker: self.brand_marker.unwrap_or(defaults.brand_marker),
            size_suffixes: self.size_suffixes.unwrap_or(defaults.size_suffixes),
        };
        config.validate()?;
        Ok(config)
    }
}
