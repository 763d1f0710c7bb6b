//! Engine configuration (JSON)
//!
//! Every field has a default, so `{}` is a valid configuration:
//!
//! ```json
//! {
//!   "strong_correlation_threshold": 0.7,
//!   "dimensions": ["Type", "Post Weekday", "Post Hour"],
//!   "metrics": ["like", "share", "comment", "Total Interactions"],
//!   "csv": { "delimiter": ";", "has_header": true },
//!   "preview_rows": 5
//! }
//! ```
//!
//! `schema` defaults to [`DatasetSchema::facebook_metrics`]. The CSV delimiter
//! defaults to `,`; the UCI download of the Facebook export needs `";"` as
//! shown above.

use crate::dataset::{CsvOptions, Dataset};
use crate::schema::DatasetSchema;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default |r| above which a pair counts as strongly correlated
pub const DEFAULT_STRONG_CORRELATION_THRESHOLD: f64 = 0.7;

/// Default number of preview rows in a dataset overview
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// |r| above which a metric pair is reported as strong
    #[serde(default = "default_threshold")]
    pub strong_correlation_threshold: f64,

    /// Dimensions to report on (all declared dimensions when absent)
    #[serde(default)]
    pub dimensions: Option<Vec<String>>,

    /// Metrics to correlate (engagement + all declared metrics when absent)
    #[serde(default)]
    pub metrics: Option<Vec<String>>,

    /// CSV reader options
    #[serde(default)]
    pub csv: CsvOptions,

    /// Rows shown in the dataset preview
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,

    /// Dataset layout
    #[serde(default = "DatasetSchema::facebook_metrics")]
    pub schema: DatasetSchema,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strong_correlation_threshold: default_threshold(),
            dimensions: None,
            metrics: None,
            csv: CsvOptions::default(),
            preview_rows: default_preview_rows(),
            schema: DatasetSchema::facebook_metrics(),
        }
    }
}

const fn default_threshold() -> f64 {
    DEFAULT_STRONG_CORRELATION_THRESHOLD
}

const fn default_preview_rows() -> usize {
    DEFAULT_PREVIEW_ROWS
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or the values are invalid
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, or see [`Self::from_json_str`]
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check value ranges and the schema
    ///
    /// # Errors
    /// Returns [`Error::Config`] for out-of-range values, or the schema's
    /// validation error
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.strong_correlation_threshold)?;
        if self.csv.batch_size == 0 {
            return Err(Error::Config("csv.batch_size must be positive".to_string()));
        }
        self.csv.delimiter_byte()?;
        self.schema.validate()?;

        if let Some(dimensions) = &self.dimensions {
            for dimension in dimensions {
                if self.schema.dimension(dimension).is_none() {
                    return Err(Error::UnknownDimension(dimension.clone()));
                }
            }
        }
        if let Some(metrics) = &self.metrics {
            for metric in metrics {
                if !self.schema.is_metric(metric) {
                    return Err(Error::UnknownDimension(metric.clone()));
                }
            }
        }
        Ok(())
    }

    /// Load the dataset at `path` with this configuration's schema
    ///
    /// `.parquet` files go through the Parquet reader, everything else
    /// through the CSV reader.
    ///
    /// # Errors
    /// Returns error if loading or schema validation fails
    pub fn load_dataset<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let is_parquet = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

        if is_parquet {
            Dataset::load_parquet(path, self.schema.clone())
        } else {
            Dataset::load_csv(path, self.schema.clone(), &self.csv)
        }
    }
}

/// Threshold must be a finite value in [0, 1]
pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "strong_correlation_threshold must be within [0, 1], got {threshold}"
        )))
    }
}
