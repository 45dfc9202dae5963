//! Schema object model.
//!
//! Snapshots ([`Schema`]) hold typed objects ([`SchemaObject`]) whose kinds
//! form a closed set ([`ObjectKind`]). What each kind's fields mean is
//! described by a static table of [`KindDescriptor`]s; everything that
//! compares, diffs or applies objects is driven by that table, so adding a
//! field is a one-line change there.
//!
//! ```
//! use schema_delta::compile::TextCompiler;
//! use schema_delta::model::{Name, ObjectDocument, ObjectKind, Schema, SchemaDocument};
//!
//! let doc = SchemaDocument::new()
//!     .with_std()
//!     .module("default")
//!     .object(ObjectDocument::new(ObjectKind::ObjectType, "default::User").base("std::Object"))
//!     .object(
//!         ObjectDocument::new(ObjectKind::Property, "default::User.email")
//!             .base("std::property")
//!             .target("std::str"),
//!     );
//! let schema = Schema::from_document(&doc, &TextCompiler::default()).unwrap();
//! let user = schema.get_by_name(&Name::from("default::User")).unwrap();
//! assert_eq!(schema.children(user.id).len(), 1);
//! ```

mod descriptor;
mod document;
mod equivalence;
mod inheritance;
mod kind;
mod name;
mod object;
mod schema;
mod value;

pub use descriptor::{FieldSpec, FieldType, KindDescriptor, RefDict, NAME_COMPCOEF};
pub use document::{anchors_for, std_library, ObjectDocument, SchemaDocument};
pub use equivalence::snapshot_differences;
pub use inheritance::{compute_ancestors, resolve_inherited_fields};
pub use kind::{ObjectKind, DELTA_ORDER};
pub use name::{Name, ObjectId};
pub use object::SchemaObject;
pub use schema::{ObjectKey, Schema};
pub use value::{Expression, FieldValue, PropertyValue};
