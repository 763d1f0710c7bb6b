//! Narrative insights: best value per dimension, strong correlations
//!
//! This is the layer a dashboard or report generator talks to. It composes
//! the aggregation, ranking and correlation primitives into one
//! [`EngagementReport`] and phrases each finding as a sentence.
//!
//! ## Usage
//!
//! ```rust
//! use engagement_insights::dataset::{Dataset, PostRecord};
//! use engagement_insights::insights::InsightsEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dataset = Dataset::from_records(&[
//!     PostRecord::new("Photo", 1, 9, 10.0),
//!     PostRecord::new("Video", 7, 21, 100.0),
//! ])?;
//!
//! let engine = InsightsEngine::builder()
//!     .dimensions(["post_type", "weekday"])
//!     .build()?;
//! let report = engine.report(&dataset)?;
//!
//! assert_eq!(
//!     report.dimensions[0].recommendation.message,
//!     "On average, Video posts perform the best with about 100.0 interactions."
//! );
//! # Ok(())
//! # }
//! ```

use crate::aggregate::{aggregate_by, GroupKey};
use crate::config::{
    validate_threshold, EngineConfig, DEFAULT_PREVIEW_ROWS, DEFAULT_STRONG_CORRELATION_THRESHOLD,
};
use crate::correlation::{
    correlation_matrix, correlation_matrix_all, strong_correlations, CorrelationMatrix,
    StrongCorrelation,
};
use crate::dataset::Dataset;
use crate::rank::{rank_groups, top_group, RankedGroup};
use crate::schema::{DimensionField, RecommendationStyle};
use crate::{Error, Result};
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Size and shape of a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetOverview {
    /// Number of posts
    pub rows: usize,
    /// Number of declared columns
    pub columns: usize,
    /// Declared column names
    pub column_names: Vec<String>,
    /// First rows, one formatted cell per column (nulls as `null`)
    #[serde(default)]
    pub preview: Vec<Vec<String>>,
}

impl DatasetOverview {
    /// Overview of `dataset`, without preview rows
    #[must_use]
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            rows: dataset.num_rows(),
            columns: dataset.num_columns(),
            column_names: dataset.column_names(),
            preview: Vec::new(),
        }
    }

    /// Overview of `dataset` with its first `rows` rows formatted as text
    ///
    /// # Errors
    /// Returns error if a column cannot be formatted
    pub fn with_preview(dataset: &Dataset, rows: usize) -> Result<Self> {
        let head = dataset.head(rows);
        let options = FormatOptions::default().with_null("null");
        let formatters = head
            .columns()
            .iter()
            .map(|column| ArrayFormatter::try_new(column.as_ref(), &options))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let preview = (0..head.num_rows())
            .map(|row| formatters.iter().map(|f| f.value(row).to_string()).collect())
            .collect();

        Ok(Self {
            preview,
            ..Self::of(dataset)
        })
    }

    /// One-sentence summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "The dataset contains {} posts and {} columns of information.",
            self.rows, self.columns
        )
    }
}

/// Best value of one dimension, phrased for a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Dimension column
    pub dimension: String,
    /// Human-readable dimension label
    pub label: String,
    /// Best-performing value
    pub key: GroupKey,
    /// Its mean engagement
    pub mean: f64,
    /// Records behind the mean
    pub count: usize,
    /// Narrative sentence
    pub message: String,
}

/// Recommend the best value of `dimension`
///
/// # Errors
/// Returns [`Error::UnknownDimension`] or [`Error::EmptyGroup`] from the
/// underlying aggregation
pub fn recommend(dataset: &Dataset, dimension: &str) -> Result<Recommendation> {
    let field = dataset
        .schema()
        .dimension(dimension)
        .ok_or_else(|| Error::UnknownDimension(dimension.to_string()))?;
    let best = top_group(&aggregate_by(dataset, dimension)?)?;
    Ok(recommendation_for(field, &best))
}

fn recommendation_for(field: &DimensionField, best: &RankedGroup) -> Recommendation {
    Recommendation {
        dimension: field.name().to_string(),
        label: field.label().to_string(),
        key: best.key.clone(),
        mean: best.mean,
        count: best.count,
        message: narrate(field, &best.key, best.mean),
    }
}

/// Sentence for the best value of a dimension (mean rounded to 0.1)
#[must_use]
pub fn narrate(field: &DimensionField, key: &GroupKey, mean: f64) -> String {
    match field.style() {
        RecommendationStyle::ContentType => {
            format!("On average, {key} posts perform the best with about {mean:.1} interactions.")
        }
        RecommendationStyle::DayOfWeek => format!(
            "The best day to post is Day {key} with about {mean:.1} interactions on average."
        ),
        RecommendationStyle::HourOfDay => {
            format!("The best time to post is around {key}:00 with about {mean:.1} interactions.")
        }
        RecommendationStyle::Generic => format!(
            "The best {} is {key} with about {mean:.1} interactions on average.",
            field.label()
        ),
    }
}

/// Sentence describing one strong correlation
#[must_use]
pub fn describe_correlation(pair: &StrongCorrelation) -> String {
    let direction = if pair.coefficient < 0.0 { "fewer" } else { "more" };
    format!(
        "Posts with more {} also tend to have {direction} {} (r = {:.2}).",
        pair.metric_a, pair.metric_b, pair.coefficient
    )
}

/// Ranking and recommendation for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionInsight {
    /// Dimension column
    pub dimension: String,
    /// All groups, best first
    pub ranking: Vec<RankedGroup>,
    /// Best group, phrased
    pub recommendation: Recommendation,
}

/// A dimension left out of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableInsight {
    /// Dimension column
    pub dimension: String,
    /// Why no insight could be computed
    pub reason: String,
}

/// Everything a dashboard renders for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementReport {
    /// Creation time
    pub generated_at: DateTime<Utc>,
    /// Dataset size and columns
    pub overview: DatasetOverview,
    /// One entry per reported dimension, in request order
    pub dimensions: Vec<DimensionInsight>,
    /// Dimensions with no valid records
    pub unavailable: Vec<UnavailableInsight>,
    /// Correlation matrix of the reported metrics
    pub correlation: CorrelationMatrix,
    /// Pairs above the strong-correlation threshold, strongest first
    pub strong_correlations: Vec<StrongCorrelation>,
    /// One sentence per strong correlation
    pub correlation_notes: Vec<String>,
}

impl EngagementReport {
    /// Insight for `dimension`, if it was reported
    #[must_use]
    pub fn dimension(&self, dimension: &str) -> Option<&DimensionInsight> {
        self.dimensions.iter().find(|d| d.dimension == dimension)
    }

    /// Serialize to pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for EngagementReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.overview.summary())?;
        if !self.overview.preview.is_empty() {
            writeln!(f, "Here are the first {} rows of data:", self.overview.preview.len())?;
            writeln!(f, "{}", self.overview.column_names.join(" | "))?;
            for row in &self.overview.preview {
                writeln!(f, "{}", row.join(" | "))?;
            }
        }
        for insight in &self.dimensions {
            writeln!(f, "{}", insight.recommendation.message)?;
        }
        for missing in &self.unavailable {
            writeln!(f, "No insight for {}: {}", missing.dimension, missing.reason)?;
        }
        for note in &self.correlation_notes {
            writeln!(f, "{note}")?;
        }
        Ok(())
    }
}

/// Report generator
#[derive(Debug, Clone)]
pub struct InsightsEngine {
    threshold: f64,
    dimensions: Option<Vec<String>>,
    metrics: Option<Vec<String>>,
    preview_rows: usize,
}

impl InsightsEngine {
    /// Create a new engine builder
    #[must_use]
    pub fn builder() -> InsightsEngineBuilder {
        InsightsEngineBuilder::default()
    }

    /// Engine configured from an [`EngineConfig`]
    ///
    /// # Errors
    /// Returns error if the threshold is out of range
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .strong_correlation_threshold(config.strong_correlation_threshold)
            .preview_rows(config.preview_rows);
        if let Some(dimensions) = &config.dimensions {
            builder = builder.dimensions(dimensions.iter().cloned());
        }
        if let Some(metrics) = &config.metrics {
            builder = builder.metrics(metrics.iter().cloned());
        }
        builder.build()
    }

    /// Strong-correlation threshold
    #[must_use]
    pub const fn strong_correlation_threshold(&self) -> f64 {
        self.threshold
    }

    /// Rows included in the overview preview
    #[must_use]
    pub const fn preview_rows(&self) -> usize {
        self.preview_rows
    }

    /// Build the full report for `dataset`
    ///
    /// A requested dimension with no valid records is listed under
    /// [`EngagementReport::unavailable`] instead of failing the report.
    ///
    /// # Errors
    /// Returns error if a requested dimension or metric is not in the
    /// dataset schema
    pub fn report(&self, dataset: &Dataset) -> Result<EngagementReport> {
        let schema = dataset.schema();
        let requested: Vec<&str> = match &self.dimensions {
            Some(names) => names.iter().map(String::as_str).collect(),
            None => schema.dimensions().iter().map(DimensionField::name).collect(),
        };

        let mut dimensions = Vec::with_capacity(requested.len());
        let mut unavailable = Vec::new();

        for name in requested {
            let field = schema
                .dimension(name)
                .ok_or_else(|| Error::UnknownDimension(name.to_string()))?;

            match aggregate_by(dataset, name) {
                Ok(aggregate) => {
                    let ranking = rank_groups(&aggregate);
                    let best = top_group(&aggregate)?;
                    dimensions.push(DimensionInsight {
                        dimension: name.to_string(),
                        recommendation: recommendation_for(field, &best),
                        ranking,
                    });
                }
                Err(err @ Error::EmptyGroup { .. }) => {
                    warn!(dimension = name, "dimension left out of report: {err}");
                    unavailable.push(UnavailableInsight {
                        dimension: name.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        let correlation = match &self.metrics {
            Some(metrics) => correlation_matrix(dataset, metrics.as_slice())?,
            None => correlation_matrix_all(dataset)?,
        };
        let strong = strong_correlations(&correlation, self.threshold);
        let correlation_notes = strong.iter().map(describe_correlation).collect();

        info!(
            rows = dataset.num_rows(),
            dimensions = dimensions.len(),
            unavailable = unavailable.len(),
            strong_correlations = strong.len(),
            "engagement report generated"
        );

        Ok(EngagementReport {
            generated_at: Utc::now(),
            overview: DatasetOverview::with_preview(dataset, self.preview_rows)?,
            dimensions,
            unavailable,
            correlation,
            strong_correlations: strong,
            correlation_notes,
        })
    }
}

/// Insights engine builder
#[derive(Debug, Clone)]
pub struct InsightsEngineBuilder {
    threshold: f64,
    dimensions: Option<Vec<String>>,
    metrics: Option<Vec<String>>,
    preview_rows: usize,
}

impl Default for InsightsEngineBuilder {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_STRONG_CORRELATION_THRESHOLD,
            dimensions: None,
            metrics: None,
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }
}

impl InsightsEngineBuilder {
    /// Set the |r| above which a pair is reported as strong
    #[must_use]
    pub const fn strong_correlation_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set how many leading rows the overview previews (0 disables it)
    #[must_use]
    pub const fn preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }

    /// Restrict the report to these dimensions, in this order
    #[must_use]
    pub fn dimensions<I, S>(mut self, dimensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dimensions = Some(dimensions.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict the correlation matrix to these metrics, in this order
    #[must_use]
    pub fn metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = Some(metrics.into_iter().map(Into::into).collect());
        self
    }

    /// Build the engine
    ///
    /// # Errors
    /// Returns [`Error::Config`] if the threshold is not within [0, 1]
    pub fn build(self) -> Result<InsightsEngine> {
        validate_threshold(self.threshold)?;
        Ok(InsightsEngine {
            threshold: self.threshold,
            dimensions: self.dimensions,
            metrics: self.metrics,
            preview_rows: self.preview_rows,
        })
    }
}
