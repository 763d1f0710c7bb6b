//! Grouped engagement averages
//!
//! `GROUP BY dimension` + `AVG(engagement)` over a [`Dataset`], with the
//! record filtering rules made explicit:
//!
//! - null or malformed engagement (negative, NaN, infinite): record skipped
//! - null dimension value, blank category, ordinal outside its range:
//!   record skipped
//! - zero surviving records: [`Error::EmptyGroup`], never a zero or NaN mean
//!
//! Groups are kept in canonical key order (ascending numbers, alphabetical
//! categories) so every downstream ranking is deterministic.

use crate::dataset::Dataset;
use crate::schema::{DimensionField, DimensionKind};
use crate::{Error, Result};
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Value of a dimension that identifies one group
///
/// Within one aggregate every key has the same variant, so the derived
/// ordering is plain numeric or lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    /// Ordinal dimension value (weekday, hour, month)
    Ordinal(i64),
    /// Categorical dimension value (post type)
    Category(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordinal(value) => write!(f, "{value}"),
            Self::Category(value) => f.write_str(value),
        }
    }
}

impl From<i64> for GroupKey {
    fn from(value: i64) -> Self {
        Self::Ordinal(value)
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self::Category(value.to_string())
    }
}

impl From<String> for GroupKey {
    fn from(value: String) -> Self {
        Self::Category(value)
    }
}

/// Mean engagement of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Dimension value shared by the group
    pub key: GroupKey,
    /// Arithmetic mean of engagement over the group
    pub mean: f64,
    /// Number of contributing records
    pub count: usize,
}

/// Per-group mean engagement for one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GroupAggregateRepr")]
pub struct GroupAggregate {
    dimension: String,
    groups: Vec<GroupStats>,
}

/// Wire form; lookups need the groups re-sorted and unique
#[derive(Deserialize)]
struct GroupAggregateRepr {
    dimension: String,
    groups: Vec<GroupStats>,
}

impl TryFrom<GroupAggregateRepr> for GroupAggregate {
    type Error = Error;

    fn try_from(repr: GroupAggregateRepr) -> Result<Self> {
        let mut groups = repr.groups;
        groups.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(pair) = groups.windows(2).find(|pair| pair[0].key == pair[1].key) {
            return Err(Error::InvalidInput(format!(
                "group '{}' appears twice in aggregate of '{}'",
                pair[0].key, repr.dimension
            )));
        }
        Ok(Self {
            dimension: repr.dimension,
            groups,
        })
    }
}

impl GroupAggregate {
    /// Dimension the records were grouped by
    #[must_use]
    pub fn dimension(&self) -> &str {
        &self.dimension
    }

    /// Groups in canonical key order
    #[must_use]
    pub fn groups(&self) -> &[GroupStats] {
        &self.groups
    }

    /// Number of groups
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Stats of the group with `key`
    #[must_use]
    pub fn get(&self, key: &GroupKey) -> Option<&GroupStats> {
        self.groups
            .binary_search_by(|g| g.key.cmp(key))
            .ok()
            .map(|index| &self.groups[index])
    }

    /// Mean engagement of the group with `key`
    #[must_use]
    pub fn mean(&self, key: impl Into<GroupKey>) -> Option<f64> {
        self.get(&key.into()).map(|g| g.mean)
    }

    /// Records that contributed to any group
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Typed view of a dimension column
enum DimensionValues<'a> {
    Categorical(&'a StringArray),
    Ordinal {
        array: &'a Int64Array,
        kind: DimensionKind,
    },
}

impl<'a> DimensionValues<'a> {
    fn resolve(dataset: &'a Dataset, field: &DimensionField) -> Result<Self> {
        Ok(match field.kind() {
            DimensionKind::Categorical => {
                Self::Categorical(dataset.categorical_column(field.name())?)
            }
            kind @ DimensionKind::Ordinal { .. } => Self::Ordinal {
                array: dataset.ordinal_column(field.name())?,
                kind,
            },
        })
    }

    fn key(&self, row: usize) -> Option<GroupKey> {
        match self {
            Self::Categorical(array) => {
                if array.is_null(row) {
                    return None;
                }
                let value = array.value(row).trim();
                (!value.is_empty()).then(|| GroupKey::Category(value.to_string()))
            }
            Self::Ordinal { array, kind } => {
                if array.is_null(row) {
                    return None;
                }
                let value = array.value(row);
                kind.accepts(value).then_some(GroupKey::Ordinal(value))
            }
        }
    }
}

/// Engagement value of `row`, if it is usable
fn engagement_value(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row);
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Mean engagement per value of `dimension`
///
/// # Errors
/// Returns error if:
/// - `dimension` is not a declared dimension ([`Error::UnknownDimension`])
/// - no record has both a valid engagement and a valid dimension value
///   ([`Error::EmptyGroup`])
///
/// # Example
///
/// ```rust
/// use engagement_insights::aggregate::aggregate_by;
/// use engagement_insights::dataset::{Dataset, PostRecord};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dataset = Dataset::from_records(&[
///     PostRecord::new("Photo", 1, 9, 10.0),
///     PostRecord::new("Photo", 2, 9, 30.0),
///     PostRecord::new("Video", 1, 9, 100.0),
/// ])?;
///
/// let by_type = aggregate_by(&dataset, "post_type")?;
/// assert_eq!(by_type.mean("Photo"), Some(20.0));
/// assert_eq!(by_type.mean("Video"), Some(100.0));
/// # Ok(())
/// # }
/// ```
pub fn aggregate_by(dataset: &Dataset, dimension: &str) -> Result<GroupAggregate> {
    let field = dataset
        .schema()
        .dimension(dimension)
        .ok_or_else(|| Error::UnknownDimension(dimension.to_string()))?;

    let engagement = dataset.engagement()?;
    let values = DimensionValues::resolve(dataset, field)?;

    let mut accumulators: FxHashMap<GroupKey, Accumulator> = FxHashMap::default();
    let mut skipped = 0usize;

    for row in 0..dataset.num_rows() {
        match (engagement_value(engagement, row), values.key(row)) {
            (Some(value), Some(key)) => accumulators.entry(key).or_default().push(value),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            dimension,
            skipped,
            "excluded records with missing or malformed values"
        );
    }

    if accumulators.is_empty() {
        return Err(Error::EmptyGroup {
            dimension: dimension.to_string(),
        });
    }

    let mut groups: Vec<GroupStats> = accumulators
        .into_iter()
        .map(|(key, acc)| GroupStats {
            key,
            mean: acc.mean(),
            count: acc.count,
        })
        .collect();
    groups.sort_by(|a, b| a.key.cmp(&b.key));

    Ok(GroupAggregate {
        dimension: dimension.to_string(),
        groups,
    })
}
