//! Error types for the sales analytics pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. The guiding
//! rule (mirrored from the ingestion contract) is that no error here is fatal
//! to the overall process: schema failures degrade to the sample dataset,
//! row-level parse failures become nulls, and the derivation functions in
//! [`crate::derive`] are total and never surface errors at all.

use thiserror::Error;

/// The main error type for analytics operations.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Required columns missing from an ingested source.
    #[error("Source is missing required columns: {0:?}")]
    MissingColumns(Vec<String>),

    /// Column was not found in the table.
    #[error("Column '{0}' not found in table")]
    ColumnNotFound(String),

    /// Source file could not be read or parsed at all.
    #[error("Could not read source '{path}': {reason}")]
    SourceUnreadable { path: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report export failed.
    #[error("Failed to export report: {0}")]
    ExportFailed(String),

    /// Internal error (e.g. the built-in sample table failed to construct).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalyticsError>,
    },
}

impl AnalyticsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalyticsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable code for log output and machine-readable error reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingColumns(_) => "MISSING_COLUMNS",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::SourceUnreadable { .. } => "SOURCE_UNREADABLE",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ExportFailed(_) => "EXPORT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is recoverable by falling back to the sample
    /// dataset (schema and source-level ingestion failures are; everything
    /// else is a genuine fault).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MissingColumns(_) | Self::SourceUnreadable { .. }
        )
    }
}

/// Result type alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalyticsError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            AnalyticsError::MissingColumns(vec!["region".to_string()]).error_code(),
            "MISSING_COLUMNS"
        );
        assert_eq!(
            AnalyticsError::ColumnNotFound("revenue".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_recoverable() {
        assert!(AnalyticsError::MissingColumns(vec!["month".to_string()]).is_recoverable());
        assert!(
            AnalyticsError::SourceUnreadable {
                path: "q1.csv".to_string(),
                reason: "bad header".to_string(),
            }
            .is_recoverable()
        );
        assert!(!AnalyticsError::Internal("oops".to_string()).is_recoverable());
    }

    #[test]
    fn test_with_context() {
        let error = AnalyticsError::ColumnNotFound("quantity".to_string())
            .with_context("During regional summary");
        assert!(error.to_string().contains("During regional summary"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND"); // code survives wrapping
    }
}
