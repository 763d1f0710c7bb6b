//! Post Record - one row of a posts dataset

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single social-media post.
///
/// Every field is optional so that missing cells survive the trip into the
/// columnar [`Dataset`](super::Dataset); the aggregations decide per query
/// whether a record contributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    post_type: Option<String>,
    weekday: Option<i64>,
    hour: Option<i64>,
    total_interactions: Option<f64>,
    metrics: BTreeMap<String, f64>,
}

impl PostRecord {
    /// Create a fully populated record without extra metrics.
    ///
    /// # Arguments
    ///
    /// * `post_type` - Content type (e.g. "Photo", "Video")
    /// * `weekday` - Day of week, 1 = Sunday .. 7 = Saturday
    /// * `hour` - Hour of day, 0-23
    /// * `total_interactions` - Engagement measure
    #[must_use]
    pub fn new(
        post_type: impl Into<String>,
        weekday: i64,
        hour: i64,
        total_interactions: f64,
    ) -> Self {
        Self {
            post_type: Some(post_type.into()),
            weekday: Some(weekday),
            hour: Some(hour),
            total_interactions: Some(total_interactions),
            metrics: BTreeMap::new(),
        }
    }

    /// Create a builder for a record with optional fields.
    #[must_use]
    pub fn builder() -> PostRecordBuilder {
        PostRecordBuilder::default()
    }

    /// Get the post type.
    #[must_use]
    pub fn post_type(&self) -> Option<&str> {
        self.post_type.as_deref()
    }

    /// Get the weekday.
    #[must_use]
    pub const fn weekday(&self) -> Option<i64> {
        self.weekday
    }

    /// Get the hour of day.
    #[must_use]
    pub const fn hour(&self) -> Option<i64> {
        self.hour
    }

    /// Get the total interactions.
    #[must_use]
    pub const fn total_interactions(&self) -> Option<f64> {
        self.total_interactions
    }

    /// Get an extra metric by name.
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Get all extra metrics, ordered by name.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }
}

/// Builder for `PostRecord`.
#[derive(Debug, Default)]
pub struct PostRecordBuilder {
    record: PostRecord,
}

impl PostRecordBuilder {
    /// Set the post type.
    #[must_use]
    pub fn post_type(mut self, post_type: impl Into<String>) -> Self {
        self.record.post_type = Some(post_type.into());
        self
    }

    /// Set the weekday.
    #[must_use]
    pub const fn weekday(mut self, weekday: i64) -> Self {
        self.record.weekday = Some(weekday);
        self
    }

    /// Set the hour of day.
    #[must_use]
    pub const fn hour(mut self, hour: i64) -> Self {
        self.record.hour = Some(hour);
        self
    }

    /// Set the total interactions.
    #[must_use]
    pub const fn total_interactions(mut self, total_interactions: f64) -> Self {
        self.record.total_interactions = Some(total_interactions);
        self
    }

    /// Add a named metric (likes, shares, comments, ...).
    #[must_use]
    pub fn metric(mut self, name: impl Into<String>, value: f64) -> Self {
        self.record.metrics.insert(name.into(), value);
        self
    }

    /// Build the `PostRecord`.
    #[must_use]
    pub fn build(self) -> PostRecord {
        self.record
    }
}
