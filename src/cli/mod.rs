//! CLI command handlers.
//!
//! Testable handlers invoked by main.rs, one per subcommand.

mod apply;
mod diff;

pub use apply::run_apply;
pub use diff::{run_diff, DiffPaths};
