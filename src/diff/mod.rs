//! Delta builder: pairing objects across snapshots.
//!
//! For every object kind, in [`DELTA_ORDER`](crate::model::DELTA_ORDER):
//!
//! 1. Objects with identical fingerprints on both sides are dropped as
//!    unchanged.
//! 2. Every remaining (new, old) pair is scored by the configured
//!    [`ObjectComparator`](crate::matching::ObjectComparator), with pairs
//!    banned by guidance forced to 0.0.
//! 3. Pairs are assigned 1:1 (greedy best-first by default) and
//!    classified: above the alter threshold, or forced, they become alters or
//!    renames. Unpaired new objects become creates, unpaired old ones become
//!    drops.
//! 4. Owned children are diffed the same way under their owner's command.
//!
//! The finished tree is run through the
//! [linearizer](crate::ordering::linearize) unless disabled.
//!
//! # Example
//!
//! ```
//! use schema_delta::compile::TextCompiler;
//! use schema_delta::context::DiffContext;
//! use schema_delta::diff::DeltaEngine;
//! use schema_delta::model::{ObjectDocument, ObjectKind, Schema, SchemaDocument};
//!
//! let base = SchemaDocument::new().with_std().module("default");
//! let old = Schema::from_document(&base, &TextCompiler::default()).unwrap();
//! let new = Schema::from_document(
//!     &base.clone().object(ObjectDocument::new(ObjectKind::ScalarType, "default::Label").base("std::str")),
//!     &TextCompiler::default(),
//! )
//! .unwrap();
//!
//! let delta = DeltaEngine::new()
//!     .delta_schemas(&old, &new, &mut DiffContext::new())
//!     .unwrap();
//! assert_eq!(delta.summary().creates, 1);
//! ```

mod engine;
mod engine_config;
mod engine_matching;
mod filter;
mod fingerprint;

pub use engine::DeltaEngine;
pub use engine_config::{DeltaConfig, MatchingStrategy};
pub use filter::{ObjectFilter, STD_MODULES};
pub use fingerprint::{fingerprints, object_fingerprint};
