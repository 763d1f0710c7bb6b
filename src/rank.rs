//! Group ranking and best-performer selection
//!
//! **Tie-break rule**: groups with exactly equal means are ordered by
//! ascending canonical key (numeric order for ordinal dimensions,
//! alphabetical for categories), for both sort orders. The best group is
//! therefore always the first element of the descending ranking.
//!
//! Aggregates hold a handful of groups (7 weekdays, 24 hours, a few post
//! types), so ranking is a full sort rather than heap-based selection.

use crate::aggregate::{GroupAggregate, GroupKey};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sort order for rankings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Lowest mean first (worst performers)
    Ascending,
    /// Highest mean first (best performers)
    #[default]
    Descending,
}

/// A group with its position in a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedGroup {
    /// 1-based position
    pub rank: usize,
    /// Dimension value
    pub key: GroupKey,
    /// Mean engagement
    pub mean: f64,
    /// Number of contributing records
    pub count: usize,
}

/// Compare two (key, mean) entries for the given order, ties by ascending key
fn compare(order: SortOrder, a: (&GroupKey, f64), b: (&GroupKey, f64)) -> Ordering {
    let by_mean = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
    let by_mean = match order {
        SortOrder::Ascending => by_mean,
        SortOrder::Descending => by_mean.reverse(),
    };
    by_mean.then_with(|| a.0.cmp(b.0))
}

/// Rank all groups by mean, best first
#[must_use]
pub fn rank_groups(aggregate: &GroupAggregate) -> Vec<RankedGroup> {
    rank_groups_by(aggregate, SortOrder::Descending)
}

/// Rank all groups by mean in the given order
#[must_use]
pub fn rank_groups_by(aggregate: &GroupAggregate, order: SortOrder) -> Vec<RankedGroup> {
    let mut groups: Vec<_> = aggregate.groups().iter().collect();
    groups.sort_by(|a, b| compare(order, (&a.key, a.mean), (&b.key, b.mean)));

    groups
        .into_iter()
        .enumerate()
        .map(|(index, g)| RankedGroup {
            rank: index + 1,
            key: g.key.clone(),
            mean: g.mean,
            count: g.count,
        })
        .collect()
}

/// Group with the highest mean
///
/// # Errors
/// Returns [`Error::EmptyGroup`] if the aggregate has no groups
///
/// # Example
///
/// ```rust
/// use engagement_insights::aggregate::{aggregate_by, GroupKey};
/// use engagement_insights::dataset::{Dataset, PostRecord};
/// use engagement_insights::rank::top_group;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dataset = Dataset::from_records(&[
///     PostRecord::new("Photo", 1, 9, 50.0),
///     PostRecord::new("Video", 1, 9, 50.0),
///     PostRecord::new("Link", 1, 9, 5.0),
/// ])?;
///
/// // Photo and Video tie; alphabetical order picks Photo
/// let best = top_group(&aggregate_by(&dataset, "post_type")?)?;
/// assert_eq!(best.key, GroupKey::from("Photo"));
/// # Ok(())
/// # }
/// ```
pub fn top_group(aggregate: &GroupAggregate) -> Result<RankedGroup> {
    // Groups are in ascending key order: keeping the first strict maximum
    // applies the tie-break without sorting.
    let best = aggregate
        .groups()
        .iter()
        .reduce(|best, candidate| {
            if compare(
                SortOrder::Descending,
                (&candidate.key, candidate.mean),
                (&best.key, best.mean),
            ) == Ordering::Less
            {
                candidate
            } else {
                best
            }
        })
        .ok_or_else(|| Error::EmptyGroup {
            dimension: aggregate.dimension().to_string(),
        })?;

    Ok(RankedGroup {
        rank: 1,
        key: best.key.clone(),
        mean: best.mean,
        count: best.count,
    })
}

/// First `k` groups of the ranking in the given order
///
/// # Errors
/// Returns [`Error::InvalidInput`] if `k` is zero
pub fn top_k_groups(
    aggregate: &GroupAggregate,
    k: usize,
    order: SortOrder,
) -> Result<Vec<RankedGroup>> {
    if k == 0 {
        return Err(Error::InvalidInput("k must be greater than 0".to_string()));
    }

    let mut ranked = rank_groups_by(aggregate, order);
    ranked.truncate(k);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_by;
    use crate::dataset::{Dataset, PostRecord};
    use crate::schema::{HOUR, POST_TYPE};

    fn hours_aggregate(pairs: &[(i64, f64)]) -> GroupAggregate {
        let records: Vec<_> = pairs
            .iter()
            .map(|&(hour, value)| PostRecord::new("Photo", 1, hour, value))
            .collect();
        aggregate_by(&Dataset::from_records(&records).unwrap(), HOUR).unwrap()
    }

    #[test]
    fn test_rank_descending() {
        let agg = hours_aggregate(&[(9, 10.0), (10, 30.0), (11, 20.0)]);
        let ranked = rank_groups(&agg);
        let keys: Vec<_> = ranked.iter().map(|r| r.key.clone()).collect();
        assert_eq!(
            keys,
            vec![GroupKey::Ordinal(10), GroupKey::Ordinal(11), GroupKey::Ordinal(9)]
        );
        let ranks: Vec<_> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn test_rank_ties_ascending_key_both_orders() {
        let agg = hours_aggregate(&[(20, 5.0), (3, 5.0), (12, 5.0), (7, 1.0)]);

        let desc: Vec<_> = rank_groups(&agg).into_iter().map(|r| r.key).collect();
        assert_eq!(
            desc,
            vec![
                GroupKey::Ordinal(3),
                GroupKey::Ordinal(12),
                GroupKey::Ordinal(20),
                GroupKey::Ordinal(7)
            ]
        );

        let asc: Vec<_> = rank_groups_by(&agg, SortOrder::Ascending)
            .into_iter()
            .map(|r| r.key)
            .collect();
        assert_eq!(
            asc,
            vec![
                GroupKey::Ordinal(7),
                GroupKey::Ordinal(3),
                GroupKey::Ordinal(12),
                GroupKey::Ordinal(20)
            ]
        );
    }

    #[test]
    fn test_top_group_tie_picks_smallest_key() {
        let agg = hours_aggregate(&[(22, 8.0), (4, 8.0), (13, 2.0)]);
        let best = top_group(&agg).unwrap();
        assert_eq!(best.key, GroupKey::Ordinal(4));
        assert_eq!(best.rank, 1);
        assert_eq!(best, rank_groups(&agg)[0]);
    }

    #[test]
    fn test_top_group_alphabetical_tie() {
        let ds = Dataset::from_records(&[
            PostRecord::new("Video", 1, 1, 7.0),
            PostRecord::new("Status", 1, 1, 7.0),
            PostRecord::new("Photo", 1, 1, 7.0),
        ])
        .unwrap();
        let best = top_group(&aggregate_by(&ds, POST_TYPE).unwrap()).unwrap();
        assert_eq!(best.key, GroupKey::from("Photo"));
    }

    #[test]
    fn test_top_k_groups() {
        let agg = hours_aggregate(&[(1, 1.0), (2, 2.0), (3, 3.0)]);

        let best_two = top_k_groups(&agg, 2, SortOrder::Descending).unwrap();
        assert_eq!(best_two.len(), 2);
        assert_eq!(best_two[0].key, GroupKey::Ordinal(3));

        let worst = top_k_groups(&agg, 1, SortOrder::Ascending).unwrap();
        assert_eq!(worst[0].key, GroupKey::Ordinal(1));

        assert_eq!(top_k_groups(&agg, 10, SortOrder::Descending).unwrap().len(), 3);
    }

    #[test]
    fn test_top_k_zero_rejected() {
        let agg = hours_aggregate(&[(1, 1.0)]);
        let err = top_k_groups(&agg, 0, SortOrder::Descending).unwrap_err();
        assert!(err.to_string().contains("k must be greater than 0"));
    }
}
