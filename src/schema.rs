//! Dataset schema: which columns hold engagement, dimensions and metrics
//!
//! The schema is validated once, when a [`Dataset`](crate::dataset::Dataset)
//! is built. After that every column a query names is known to exist with a
//! canonical Arrow type:
//!
//! | Role                  | Source type          | Canonical type |
//! |-----------------------|----------------------|----------------|
//! | engagement / metric   | any numeric          | `Float64`      |
//! | ordinal dimension     | any integer          | `Int64`        |
//! | categorical dimension | string, int, boolean | `Utf8`         |

use crate::{Error, Result};
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Engagement column of [`DatasetSchema::posts`]
pub const TOTAL_INTERACTIONS: &str = "total_interactions";
/// Post type column of [`DatasetSchema::posts`]
pub const POST_TYPE: &str = "post_type";
/// Weekday column of [`DatasetSchema::posts`] (1 = Sunday, 7 = Saturday)
pub const WEEKDAY: &str = "weekday";
/// Hour column of [`DatasetSchema::posts`] (0-23)
pub const HOUR: &str = "hour";

/// How a dimension partitions records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DimensionKind {
    /// Free-form category, grouped by exact (trimmed) string value
    Categorical,
    /// Integer scale with optional inclusive bounds
    Ordinal {
        /// Smallest valid value
        #[serde(default)]
        min: Option<i64>,
        /// Largest valid value
        #[serde(default)]
        max: Option<i64>,
    },
}

impl DimensionKind {
    /// Canonical Arrow type of a column with this kind
    #[must_use]
    pub const fn canonical_type(&self) -> DataType {
        match self {
            Self::Categorical => DataType::Utf8,
            Self::Ordinal { .. } => DataType::Int64,
        }
    }

    /// Whether `value` lies inside the declared bounds
    #[must_use]
    pub fn accepts(&self, value: i64) -> bool {
        match *self {
            Self::Categorical => true,
            Self::Ordinal { min, max } => {
                min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi)
            }
        }
    }
}

/// Sentence template used when narrating a dimension's best value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStyle {
    /// "On average, Video posts perform the best ..."
    ContentType,
    /// "The best day to post is Day 7 ..."
    DayOfWeek,
    /// "The best time to post is around 10:00 ..."
    HourOfDay,
    /// "The best {label} is X ..."
    #[default]
    Generic,
}

/// A column used to partition records into groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionField {
    name: String,
    kind: DimensionKind,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    style: RecommendationStyle,
}

impl DimensionField {
    /// Categorical dimension
    #[must_use]
    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Categorical,
            label: None,
            style: RecommendationStyle::Generic,
        }
    }

    /// Unbounded ordinal dimension
    #[must_use]
    pub fn ordinal(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Ordinal {
                min: None,
                max: None,
            },
            label: None,
            style: RecommendationStyle::Generic,
        }
    }

    /// Ordinal dimension with inclusive bounds; values outside are malformed
    #[must_use]
    pub fn ordinal_range(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            kind: DimensionKind::Ordinal {
                min: Some(min),
                max: Some(max),
            },
            ..Self::ordinal(name)
        }
    }

    /// Set the human-readable label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the narrative style
    #[must_use]
    pub const fn with_style(mut self, style: RecommendationStyle) -> Self {
        self.style = style;
        self
    }

    /// Column name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Partitioning kind
    #[must_use]
    pub const fn kind(&self) -> DimensionKind {
        self.kind
    }

    /// Human-readable label, falling back to the column name
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Narrative style
    #[must_use]
    pub const fn style(&self) -> RecommendationStyle {
        self.style
    }
}

/// Role a column plays in the normalized dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    /// The engagement measure averaged per group
    Engagement,
    /// A grouping dimension
    Dimension(DimensionKind),
    /// A numeric metric used for correlation
    Metric,
}

impl ColumnRole {
    /// Canonical Arrow type for the role
    #[must_use]
    pub const fn canonical_type(&self) -> DataType {
        match self {
            Self::Engagement | Self::Metric => DataType::Float64,
            Self::Dimension(kind) => kind.canonical_type(),
        }
    }

    /// Whether a source column of `data_type` can be cast to this role
    #[must_use]
    pub fn accepts_source(&self, data_type: &DataType) -> bool {
        match self {
            Self::Engagement | Self::Metric => {
                data_type.is_numeric() || data_type == &DataType::Null
            }
            Self::Dimension(DimensionKind::Ordinal { .. }) => {
                data_type.is_integer() || data_type == &DataType::Null
            }
            Self::Dimension(DimensionKind::Categorical) => matches!(
                data_type,
                DataType::Utf8 | DataType::LargeUtf8 | DataType::Boolean | DataType::Null
            ) || data_type.is_integer(),
        }
    }
}

/// Declared layout of a posts dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    engagement: String,
    dimensions: Vec<DimensionField>,
    #[serde(default)]
    metrics: Vec<String>,
}

impl DatasetSchema {
    /// Create a validated schema
    ///
    /// `metrics` may include the engagement column (it is often correlated
    /// against the other metrics) but may not include a dimension.
    ///
    /// # Errors
    /// Returns [`Error::SchemaMismatch`] if:
    /// - two dimensions share a name
    /// - a dimension reuses the engagement or a metric column
    /// - a metric is listed twice
    /// - an ordinal range has `min > max`
    pub fn new(
        engagement: impl Into<String>,
        dimensions: Vec<DimensionField>,
        metrics: Vec<String>,
    ) -> Result<Self> {
        let schema = Self {
            engagement: engagement.into(),
            dimensions,
            metrics,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Schema of datasets built from [`PostRecord`](crate::dataset::PostRecord)s
    ///
    /// # Errors
    /// Returns error if a metric name collides with a post column
    pub fn posts<I, S>(metrics: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            TOTAL_INTERACTIONS,
            vec![
                DimensionField::categorical(POST_TYPE)
                    .with_label("post type")
                    .with_style(RecommendationStyle::ContentType),
                DimensionField::ordinal_range(WEEKDAY, 1, 7)
                    .with_label("weekday")
                    .with_style(RecommendationStyle::DayOfWeek),
                DimensionField::ordinal_range(HOUR, 0, 23)
                    .with_label("hour")
                    .with_style(RecommendationStyle::HourOfDay),
            ],
            metrics.into_iter().map(Into::into).collect(),
        )
    }

    /// Schema of the "Facebook Metrics of Cosmetic Brand" CSV export
    #[must_use]
    pub fn facebook_metrics() -> Self {
        Self {
            engagement: "Total Interactions".to_string(),
            dimensions: vec![
                DimensionField::categorical("Type")
                    .with_label("post type")
                    .with_style(RecommendationStyle::ContentType),
                DimensionField::ordinal_range("Post Weekday", 1, 7)
                    .with_label("weekday")
                    .with_style(RecommendationStyle::DayOfWeek),
                DimensionField::ordinal_range("Post Hour", 0, 23)
                    .with_label("hour")
                    .with_style(RecommendationStyle::HourOfDay),
                DimensionField::ordinal_range("Post Month", 1, 12).with_label("month"),
                DimensionField::categorical("Category").with_label("category"),
                DimensionField::categorical("Paid").with_label("paid flag"),
            ],
            metrics: [
                "Page total likes",
                "Lifetime Post Total Reach",
                "Lifetime Post Total Impressions",
                "Lifetime Engaged Users",
                "Lifetime Post Consumers",
                "Lifetime Post Consumptions",
                "Lifetime Post Impressions by people who have liked your Page",
                "Lifetime Post reach by people who like your Page",
                "Lifetime People who have liked your Page and engaged with your post",
                "comment",
                "like",
                "share",
                "Total Interactions",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    /// Check the structural invariants
    ///
    /// # Errors
    /// See [`DatasetSchema::new`]
    pub fn validate(&self) -> Result<()> {
        if self.engagement.trim().is_empty() {
            return Err(Error::SchemaMismatch(
                "engagement column name is empty".to_string(),
            ));
        }

        let mut metric_names = HashSet::new();
        for metric in &self.metrics {
            if !metric_names.insert(metric.as_str()) {
                return Err(Error::SchemaMismatch(format!(
                    "metric '{metric}' is declared twice"
                )));
            }
        }

        let mut dimension_names = HashSet::new();
        for dimension in &self.dimensions {
            let name = dimension.name();
            if !dimension_names.insert(name) {
                return Err(Error::SchemaMismatch(format!(
                    "dimension '{name}' is declared twice"
                )));
            }
            if name == self.engagement || metric_names.contains(name) {
                return Err(Error::SchemaMismatch(format!(
                    "dimension '{name}' is also declared as engagement or metric column"
                )));
            }
            if let DimensionKind::Ordinal {
                min: Some(min),
                max: Some(max),
            } = dimension.kind()
            {
                if min > max {
                    return Err(Error::SchemaMismatch(format!(
                        "dimension '{name}' has empty range {min}..={max}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Engagement column name
    #[must_use]
    pub fn engagement(&self) -> &str {
        &self.engagement
    }

    /// Declared dimensions, in declaration order
    #[must_use]
    pub fn dimensions(&self) -> &[DimensionField] {
        &self.dimensions
    }

    /// Declared metrics, in declaration order
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Look up a dimension by column name
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&DimensionField> {
        self.dimensions.iter().find(|d| d.name() == name)
    }

    /// Whether `name` can be used as a correlation metric
    #[must_use]
    pub fn is_metric(&self, name: &str) -> bool {
        name == self.engagement || self.metrics.iter().any(|m| m == name)
    }

    /// Columns of the normalized dataset, in storage order
    ///
    /// Engagement first, then dimensions, then metrics (the engagement column
    /// is not repeated when it is also listed as a metric).
    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnRole)> + '_ {
        std::iter::once((self.engagement.as_str(), ColumnRole::Engagement))
            .chain(
                self.dimensions
                    .iter()
                    .map(|d| (d.name(), ColumnRole::Dimension(d.kind()))),
            )
            .chain(
                self.metrics
                    .iter()
                    .filter(move |m| **m != self.engagement)
                    .map(|m| (m.as_str(), ColumnRole::Metric)),
            )
    }

    /// Arrow schema of the normalized dataset
    #[must_use]
    pub fn arrow_schema(&self) -> Schema {
        Schema::new(
            self.columns()
                .map(|(name, role)| Field::new(name, role.canonical_type(), true))
                .collect::<Vec<_>>(),
        )
    }
}
