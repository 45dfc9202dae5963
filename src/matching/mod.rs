//! Object similarity scoring.
//!
//! The delta builder never decides on its own whether two objects are "the
//! same"; it asks an [`ObjectComparator`]. The default [`FieldComparator`]
//! derives a score from the kind descriptor table, and callers may inject
//! their own implementation through
//! [`DeltaEngine::with_comparator`](crate::diff::DeltaEngine::with_comparator).
//!
//! Scores drive classification: 1.0 means unchanged, anything above the alter
//! threshold is an alter (or rename), anything else is an independent
//! delete and create.

mod comparator;
mod context;
pub mod string_similarity;
mod traits;

pub use comparator::FieldComparator;
pub use context::ComparisonContext;
pub use traits::{ComparisonExplanation, ObjectComparator, ScoreComponent};
