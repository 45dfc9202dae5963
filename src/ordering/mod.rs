//! Dependency ordering.
//!
//! - [`topological`]: the generic sorter shared by everything that orders
//!   objects or commands
//! - [`linearize`]: turns a bag of per-kind commands into one valid sequence

pub mod linearize;
pub mod topological;

pub use linearize::linearize;
pub use topological::{normalize, sort, SortNode, SortOptions};
