//! **Schema delta engine: ordered migration plans between two schema snapshots.**
//!
//! Given an old and a new snapshot of a schema, `schema-delta` works out
//! which objects were created, altered, renamed or dropped, and emits a
//! command tree that applies cleanly to the old snapshot, front to back.
//! Renames are detected by structural similarity and carry a confidence so a
//! human can confirm or reject them; rejected proposals become
//! [`Guidance`](context::Guidance) for the next run of the same session.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: names, identities, object kinds and their field
//!   descriptors, and the immutable [`Schema`] snapshot.
//! - **[`compile`]**: the expression compiler capability used to resolve
//!   expression-valued fields and rewrite references on rename.
//! - **[`matching`]**: the [`ObjectComparator`] that scores how similar two
//!   objects are.
//! - **[`diff`]**: the [`DeltaEngine`], which pairs objects across snapshots
//!   and builds the command tree.
//! - **[`command`]**: the [`Command`] tree, its application to a snapshot and
//!   migration prompts.
//! - **[`ordering`]**: the topological sorter and the linearizer that orders
//!   the finished tree.
//! - **[`context`]**: per-session renames and guidance.
//!
//! ## Computing a Delta
//!
//! ```
//! use schema_delta::compile::TextCompiler;
//! use schema_delta::model::{ObjectDocument, ObjectKind, Schema, SchemaDocument};
//! use schema_delta::{DeltaEngine, DiffContext};
//!
//! let compiler = TextCompiler::default();
//! let base = SchemaDocument::new().with_std().module("default");
//! let old = Schema::from_document(
//!     &base.clone().object(ObjectDocument::new(ObjectKind::ScalarType, "default::Code").base("std::str")),
//!     &compiler,
//! )
//! .unwrap();
//! let new = Schema::from_document(
//!     &base.object(ObjectDocument::new(ObjectKind::ScalarType, "default::Sku").base("std::str")),
//!     &compiler,
//! )
//! .unwrap();
//!
//! let mut ctx = DiffContext::new();
//! let delta = DeltaEngine::new().delta_schemas(&old, &new, &mut ctx).unwrap();
//!
//! let applied = delta.apply(&old, &compiler).unwrap();
//! assert!(applied.get_by_name(&"default::Sku".into()).is_some());
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    // `old`/`new` pairs are everywhere in a diff engine
    clippy::similar_names
)]

pub mod cli;
pub mod command;
pub mod compile;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod matching;
pub mod model;
pub mod ordering;
pub mod pipeline;

// Re-export main types for convenience
pub use command::{Action, AlterProperty, Command, DeltaRoot, DeltaSummary, OperationKey, ProposedStep};
pub use compile::{ExpressionCompiler, TextCompiler};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, ConfigPreset, Validatable};
pub use context::{DiffContext, Guidance};
pub use diff::{DeltaConfig, DeltaEngine, MatchingStrategy, ObjectFilter};
pub use error::{DeltaError, ErrorContext, OptionContext, Result};
pub use matching::{FieldComparator, ObjectComparator};
pub use model::{Name, ObjectId, ObjectKind, Schema, SchemaDocument, SchemaObject};
