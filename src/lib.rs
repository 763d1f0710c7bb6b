//! # Engagement Insights: Which Posts Perform Best, and When
//!
//! Descriptive analytics over one brand's social-media posts. A dataset is
//! loaded once into Arrow columnar memory, validated against a
//! [`DatasetSchema`](schema::DatasetSchema), and then queried with pure
//! functions:
//!
//! - [`aggregate_by`]: mean engagement per post type, weekday, hour, ...
//! - [`top_group`] / [`rank_groups`]: best performer and full ranking, with
//!   deterministic tie-breaking (ascending key)
//! - [`correlation_matrix`] / [`strong_correlations`]: Pearson correlation
//!   between metrics, undefined pairs reported explicitly
//! - [`InsightsEngine`](insights::InsightsEngine): all of the above as one
//!   narrated [`EngagementReport`](insights::EngagementReport)
//!
//! ## Design Principles
//!
//! - **Validate once**: schema problems fail at load time, not mid-query
//! - **No silent defaults**: an empty group is an error, an undefined
//!   correlation is a marker, never `0.0` or `NaN`
//! - **No shared state**: every call takes the dataset by reference and
//!   returns freshly owned values
//!
//! ## Example Usage
//!
//! ```rust
//! use engagement_insights::{aggregate_by, top_group, GroupKey};
//! use engagement_insights::dataset::{Dataset, PostRecord};
//!
//! let dataset = Dataset::from_records(&[
//!     PostRecord::new("Photo", 1, 9, 10.0),
//!     PostRecord::new("Photo", 1, 13, 20.0),
//!     PostRecord::new("Photo", 7, 13, 30.0),
//!     PostRecord::new("Video", 7, 20, 100.0),
//! ])?;
//!
//! let by_type = aggregate_by(&dataset, "post_type")?;
//! assert_eq!(by_type.mean("Photo"), Some(20.0));
//!
//! let best = top_group(&by_type)?;
//! assert_eq!(best.key, GroupKey::from("Video"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod aggregate;
pub mod config;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod insights;
pub mod rank;
pub mod schema;

pub use aggregate::{aggregate_by, GroupAggregate, GroupKey, GroupStats};
pub use correlation::{correlation_matrix, strong_correlations, Coefficient, CorrelationMatrix};
pub use error::{Error, Result};
pub use rank::{rank_groups, top_group, RankedGroup, SortOrder};
