//! Pairwise Pearson correlation between numeric metrics
//!
//! Observations are pairwise-complete: a row counts for the pair (A, B) when
//! both A and B are non-null and finite in that row. A pair with fewer than
//! two such rows, or with a constant column, has no coefficient; it is
//! reported as [`Coefficient::Undefined`] instead of `0.0` or `NaN`.
//!
//! Covariance and standard deviations use the sample (N-1) convention. The
//! coefficient itself does not depend on it since the factor cancels.

use crate::dataset::Dataset;
use crate::{Error, Result};
use arrow::array::{Array, Float64Array};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Minimum paired observations for a defined coefficient
pub const MIN_OBSERVATIONS: usize = 2;

/// Why a pair has no coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Fewer than [`MIN_OBSERVATIONS`] paired observations
    InsufficientData {
        /// Valid paired observations found
        observations: usize,
    },
    /// One of the metrics is constant over the paired observations
    ZeroVariance {
        /// Valid paired observations found
        observations: usize,
    },
}

impl UndefinedReason {
    /// Valid paired observations found
    #[must_use]
    pub const fn observations(&self) -> usize {
        match *self {
            Self::InsufficientData { observations } | Self::ZeroVariance { observations } => {
                observations
            }
        }
    }
}

/// Correlation coefficient of one metric pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Coefficient {
    /// Pearson r in [-1, 1]
    Defined {
        /// Coefficient value
        value: f64,
        /// Paired observations used
        observations: usize,
    },
    /// No meaningful coefficient
    Undefined(UndefinedReason),
}

impl Coefficient {
    /// Coefficient value, if defined
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match *self {
            Self::Defined { value, .. } => Some(value),
            Self::Undefined(_) => None,
        }
    }

    /// Whether the coefficient is defined
    #[must_use]
    pub const fn is_defined(&self) -> bool {
        matches!(self, Self::Defined { .. })
    }

    /// Paired observations behind the coefficient
    #[must_use]
    pub const fn observations(&self) -> usize {
        match *self {
            Self::Defined { observations, .. } => observations,
            Self::Undefined(reason) => reason.observations(),
        }
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined { value, .. } => write!(f, "{value:.2}"),
            Self::Undefined(_) => f.write_str("undefined"),
        }
    }
}

/// Symmetric matrix of pairwise coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    metrics: Vec<String>,
    /// Row-major, `metrics.len()` squared
    cells: Vec<Coefficient>,
}

impl CorrelationMatrix {
    /// Metric names, in row/column order
    #[must_use]
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Number of metrics (rows == columns)
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the matrix has no metrics
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Coefficient at row `i`, column `j`
    #[must_use]
    pub fn at(&self, i: usize, j: usize) -> Option<Coefficient> {
        let n = self.metrics.len();
        (i < n && j < n).then(|| self.cells[i * n + j])
    }

    /// Coefficient for a pair of metric names
    #[must_use]
    pub fn coefficient(&self, metric_a: &str, metric_b: &str) -> Option<Coefficient> {
        let i = self.index_of(metric_a)?;
        let j = self.index_of(metric_b)?;
        self.at(i, j)
    }

    /// Defined coefficient for a pair of metric names
    ///
    /// # Errors
    /// Returns error if:
    /// - either metric is not in the matrix ([`Error::UnknownDimension`])
    /// - the pair is undefined ([`Error::InsufficientData`])
    pub fn get(&self, metric_a: &str, metric_b: &str) -> Result<f64> {
        let i = self
            .index_of(metric_a)
            .ok_or_else(|| Error::UnknownDimension(metric_a.to_string()))?;
        let j = self
            .index_of(metric_b)
            .ok_or_else(|| Error::UnknownDimension(metric_b.to_string()))?;

        match self.cells[i * self.metrics.len() + j] {
            Coefficient::Defined { value, .. } => Ok(value),
            Coefficient::Undefined(reason) => Err(Error::InsufficientData {
                metric_a: metric_a.to_string(),
                metric_b: metric_b.to_string(),
                observations: reason.observations(),
            }),
        }
    }

    fn index_of(&self, metric: &str) -> Option<usize> {
        self.metrics.iter().position(|m| m == metric)
    }
}

/// A metric pair whose |r| exceeds a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongCorrelation {
    /// Earlier metric in matrix order
    pub metric_a: String,
    /// Later metric in matrix order
    pub metric_b: String,
    /// Pearson r
    pub coefficient: f64,
}

/// Pearson correlation of every pair of `metrics`
///
/// Each name must be the engagement column or a declared metric.
///
/// # Errors
/// Returns error if:
/// - a name is not a numeric column of the schema ([`Error::UnknownDimension`])
/// - a name is listed twice ([`Error::InvalidInput`])
///
/// # Example
///
/// ```rust
/// use engagement_insights::correlation::correlation_matrix;
/// use engagement_insights::dataset::{Dataset, PostRecord};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let records: Vec<_> = (0..5)
///     .map(|i| {
///         PostRecord::builder()
///             .metric("like", f64::from(i))
///             .metric("share", f64::from(i) * 2.0)
///             .build()
///     })
///     .collect();
/// let dataset = Dataset::from_records(&records)?;
///
/// let matrix = correlation_matrix(&dataset, &["like", "share"])?;
/// assert!((matrix.get("like", "share")? - 1.0).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
pub fn correlation_matrix<S: AsRef<str>>(
    dataset: &Dataset,
    metrics: &[S],
) -> Result<CorrelationMatrix> {
    let schema = dataset.schema();
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(metrics.len());

    for metric in metrics {
        let name = metric.as_ref();
        if !schema.is_metric(name) {
            return Err(Error::UnknownDimension(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(Error::InvalidInput(format!(
                "metric '{name}' requested twice"
            )));
        }
        columns.push(dataset.float_column(name)?);
    }

    let n = columns.len();
    let empty = Coefficient::Undefined(UndefinedReason::InsufficientData { observations: 0 });
    let mut cells = vec![empty; n * n];

    for i in 0..n {
        let observations = (0..columns[i].len())
            .filter(|&row| valid(columns[i], row).is_some())
            .count();
        cells[i * n + i] = if observations >= MIN_OBSERVATIONS {
            Coefficient::Defined {
                value: 1.0,
                observations,
            }
        } else {
            Coefficient::Undefined(UndefinedReason::InsufficientData { observations })
        };

        for j in (i + 1)..n {
            let coefficient = pearson(columns[i], columns[j]);
            if let Coefficient::Undefined(reason) = coefficient {
                debug!(
                    metric_a = metrics[i].as_ref(),
                    metric_b = metrics[j].as_ref(),
                    ?reason,
                    "correlation undefined"
                );
            }
            cells[i * n + j] = coefficient;
            cells[j * n + i] = coefficient;
        }
    }

    Ok(CorrelationMatrix {
        metrics: metrics.iter().map(|m| m.as_ref().to_string()).collect(),
        cells,
    })
}

/// Correlation matrix over every numeric column the schema declares
///
/// Engagement column first, then the declared metrics.
///
/// # Errors
/// See [`correlation_matrix`]
pub fn correlation_matrix_all(dataset: &Dataset) -> Result<CorrelationMatrix> {
    let schema = dataset.schema();
    let mut metrics = vec![schema.engagement()];
    metrics.extend(
        schema
            .metrics()
            .iter()
            .map(String::as_str)
            .filter(|m| *m != schema.engagement()),
    );
    correlation_matrix(dataset, metrics.as_slice())
}

/// Pairs (i < j) with |r| above `threshold`, strongest first
///
/// Undefined pairs and the diagonal are never returned. Equal magnitudes keep
/// matrix order.
#[must_use]
pub fn strong_correlations(matrix: &CorrelationMatrix, threshold: f64) -> Vec<StrongCorrelation> {
    let n = matrix.len();
    let mut strong = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(Coefficient::Defined { value, .. }) = matrix.at(i, j) {
                if value.abs() > threshold {
                    strong.push(StrongCorrelation {
                        metric_a: matrix.metrics[i].clone(),
                        metric_b: matrix.metrics[j].clone(),
                        coefficient: value,
                    });
                }
            }
        }
    }

    // Stable sort keeps (i, j) order among equal magnitudes
    strong.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
    strong
}

fn valid(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row);
    value.is_finite().then_some(value)
}

#[allow(clippy::float_cmp)]
fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    values
        .next()
        .map_or(true, |first| values.all(|value| value == first))
}

#[allow(clippy::cast_precision_loss)]
fn pearson(xs: &Float64Array, ys: &Float64Array) -> Coefficient {
    let pairs: Vec<(f64, f64)> = (0..xs.len().min(ys.len()))
        .filter_map(|row| Some((valid(xs, row)?, valid(ys, row)?)))
        .collect();
    let observations = pairs.len();

    if observations < MIN_OBSERVATIONS {
        return Coefficient::Undefined(UndefinedReason::InsufficientData { observations });
    }

    let n = observations as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let covariance = sxy / (n - 1.0);
    let std_x = (sxx / (n - 1.0)).sqrt();
    let std_y = (syy / (n - 1.0)).sqrt();

    // Rounding in the mean leaves a constant column (e.g. all 0.1) with a
    // tiny non-zero spread, so constancy is checked on the values themselves
    let constant_x = is_constant(pairs.iter().map(|p| p.0));
    let constant_y = is_constant(pairs.iter().map(|p| p.1));
    if constant_x || constant_y || std_x == 0.0 || std_y == 0.0 {
        return Coefficient::Undefined(UndefinedReason::ZeroVariance { observations });
    }

    Coefficient::Defined {
        value: (covariance / (std_x * std_y)).clamp(-1.0, 1.0),
        observations,
    }
}
