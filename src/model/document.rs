//! Serializable, name-based snapshot documents.
//!
//! A [`SchemaDocument`] is how snapshots enter and leave the engine: the CLI
//! reads them from JSON or YAML, tests build them with the builder methods,
//! and [`Schema::from_document`] turns one into a validated snapshot.
//!
//! Owned children are recognised by their derived names: `default::Foo.bar`
//! is owned by `default::Foo` when both are declared.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::kind::ObjectKind;
use super::name::{Name, ObjectId};
use super::object::SchemaObject;
use super::schema::Schema;
use super::value::{Expression, FieldValue, PropertyValue};
use crate::compile::{Anchors, ExpressionCompiler};
use crate::error::{DeltaError, DocumentErrorKind, ErrorContext, Result, SchemaErrorKind};

/// A whole snapshot, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub objects: Vec<ObjectDocument>,
}

/// One object of a [`SchemaDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub kind: ObjectKind,
    pub name: Name,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<Name>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, PropertyValue>,
}

impl ObjectDocument {
    pub fn new(kind: ObjectKind, name: impl Into<Name>) -> Self {
        Self {
            id: None,
            kind,
            name: name.into(),
            bases: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: ObjectId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn base(mut self, name: impl Into<Name>) -> Self {
        self.bases.push(name.into());
        self
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn flag(self, name: impl Into<String>, value: bool) -> Self {
        self.field(name, PropertyValue::Bool(value))
    }

    #[must_use]
    pub fn target(self, name: impl Into<Name>) -> Self {
        self.field("target", PropertyValue::Ref(name.into()))
    }

    #[must_use]
    pub fn expr(self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.field(field, PropertyValue::Expr(text.into()))
    }
}

impl SchemaDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend the built-in `std` declarations.
    #[must_use]
    pub fn with_std(mut self) -> Self {
        let mut objects = std_library().objects;
        objects.append(&mut self.objects);
        self.objects = objects;
        self
    }

    #[must_use]
    pub fn module(self, name: impl Into<Name>) -> Self {
        self.object(ObjectDocument::new(ObjectKind::Module, name))
    }

    #[must_use]
    pub fn object(mut self, obj: ObjectDocument) -> Self {
        self.objects.push(obj);
        self
    }

    /// Load a document, choosing the decoder by file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| DeltaError::io(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        let parsed = match extension.as_deref() {
            Some("json") => Self::from_json_str(&content),
            Some("yaml" | "yml") => Self::from_yaml_str(&content),
            other => Err(DeltaError::document(
                path.display().to_string(),
                DocumentErrorKind::UnsupportedFormat(other.unwrap_or("none").to_string()),
            )),
        };
        parsed.with_context(|| format!("reading {}", path.display()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Describe an existing snapshot.
    pub fn from_schema(schema: &Schema) -> Result<Self> {
        let objects = schema
            .iter()
            .map(|obj| {
                let mut fields = schema.reduced_fields(obj)?;
                let bases = match fields.remove("bases") {
                    Some(PropertyValue::RefList(names)) => names,
                    _ => Vec::new(),
                };
                Ok(ObjectDocument {
                    id: Some(obj.id),
                    kind: obj.kind,
                    name: obj.name.clone(),
                    bases,
                    fields,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { objects })
    }
}

/// Minimal `std` module: base scalars, abstract pointers and base object types.
#[must_use]
pub fn std_library() -> SchemaDocument {
    let abstract_scalar = |name: &str| {
        ObjectDocument::new(ObjectKind::ScalarType, name).flag("is_abstract", true)
    };
    let scalar = |name: &str| ObjectDocument::new(ObjectKind::ScalarType, name).base("std::anyscalar");

    SchemaDocument::new()
        .module("std")
        .object(abstract_scalar("std::anyscalar"))
        .object(scalar("std::str"))
        .object(scalar("std::int64"))
        .object(scalar("std::float64"))
        .object(scalar("std::bool"))
        .object(scalar("std::uuid"))
        .object(ObjectDocument::new(ObjectKind::Property, "std::property").flag("is_abstract", true))
        .object(ObjectDocument::new(ObjectKind::Link, "std::link").flag("is_abstract", true))
        .object(
            ObjectDocument::new(ObjectKind::Constraint, "std::exclusive")
                .flag("is_abstract", true)
                .field(
                    "errmessage",
                    PropertyValue::Str("{__subject__} violates exclusivity constraint".to_string()),
                ),
        )
        .object(
            ObjectDocument::new(ObjectKind::Constraint, "std::max_len_value")
                .flag("is_abstract", true)
                .field("params", PropertyValue::StrList(vec!["max: std::int64".to_string()]))
                .expr("expr", "std::len(__subject__) <= max"),
        )
        .object(
            ObjectDocument::new(ObjectKind::Function, "std::len")
                .field("params", PropertyValue::StrList(vec!["str: std::str".to_string()]))
                .field("return_type", PropertyValue::Ref(Name::from("std::int64"))),
        )
        .object(ObjectDocument::new(ObjectKind::ObjectType, "std::BaseObject").flag("is_abstract", true))
        .object(
            ObjectDocument::new(ObjectKind::ObjectType, "std::Object")
                .base("std::BaseObject")
                .flag("is_abstract", true),
        )
}

/// Expression anchors for `obj`: indexes and owned constraints are evaluated
/// against their owner.
#[must_use]
pub fn anchors_for(obj: &SchemaObject) -> Anchors {
    let subject = match (obj.kind, obj.owner) {
        (ObjectKind::Index | ObjectKind::Constraint, Some(owner)) => owner,
        _ => obj.id,
    };
    Anchors::for_object(subject, &obj.name)
}

impl Schema {
    /// Build and validate a snapshot from a document.
    ///
    /// References may point forward; expressions are compiled once every
    /// object is known.
    pub fn from_document(doc: &SchemaDocument, compiler: &dyn ExpressionCompiler) -> Result<Self> {
        let mut ids: HashMap<&Name, ObjectId> = HashMap::with_capacity(doc.objects.len());
        for obj in &doc.objects {
            let id = obj.id.unwrap_or_else(|| ObjectId::derived_from(&obj.name));
            if ids.insert(&obj.name, id).is_some() {
                return Err(DeltaError::schema(
                    "loading document",
                    SchemaErrorKind::DuplicateObject {
                        kind: obj.kind.to_string(),
                        name: obj.name.to_string(),
                    },
                ));
            }
        }

        // Modules first, then owners before the objects they own.
        let mut order: Vec<&ObjectDocument> = doc.objects.iter().collect();
        order.sort_by_key(|obj| (obj.kind != ObjectKind::Module, obj.name.owners().count()));

        let resolve = |name: &Name| {
            ids.get(name).copied().ok_or_else(|| {
                DeltaError::schema(
                    "loading document",
                    SchemaErrorKind::UnresolvedName {
                        name: name.to_string(),
                    },
                )
            })
        };

        let mut schema = Schema::new();
        let mut with_expressions = Vec::new();
        for doc_obj in order {
            let id = resolve(&doc_obj.name)?;
            let mut obj = SchemaObject::new(id, doc_obj.name.clone(), doc_obj.kind);
            if let Some(owner) = doc_obj.name.owner() {
                obj.owner = Some(ids.get(&owner).copied().ok_or_else(|| {
                    DeltaError::schema(
                        "loading document",
                        SchemaErrorKind::InvalidOwner {
                            name: doc_obj.name.to_string(),
                            reason: format!("owner '{owner}' is not declared"),
                        },
                    )
                })?);
            }
            if !doc_obj.bases.is_empty() || doc_obj.kind.is_inheriting() {
                let bases = doc_obj.bases.iter().map(resolve).collect::<Result<Vec<_>>>()?;
                obj.fields.insert("bases".to_string(), FieldValue::RefList(bases));
            }
            for (field, value) in &doc_obj.fields {
                let converted = match value {
                    PropertyValue::Bool(b) => FieldValue::Bool(*b),
                    PropertyValue::Int(i) => FieldValue::Int(*i),
                    PropertyValue::Str(s) => FieldValue::Str(s.clone()),
                    PropertyValue::StrList(items) => FieldValue::StrList(items.clone()),
                    PropertyValue::Expr(text) => FieldValue::Expr(Expression::new(text.clone(), Vec::new())),
                    PropertyValue::Ref(name) => FieldValue::Ref(resolve(name)?),
                    PropertyValue::RefList(names) => {
                        FieldValue::RefList(names.iter().map(resolve).collect::<Result<_>>()?)
                    }
                    PropertyValue::RefSet(names) => {
                        FieldValue::RefSet(names.iter().map(resolve).collect::<Result<_>>()?)
                    }
                    PropertyValue::Id(_) => {
                        return Err(DeltaError::schema(
                            format!("loading {}", doc_obj.name),
                            SchemaErrorKind::InvalidValue {
                                field: field.clone(),
                                message: "ids belong in the `id` attribute".to_string(),
                            },
                        ))
                    }
                };
                if matches!(converted, FieldValue::Expr(_)) {
                    with_expressions.push(id);
                }
                obj.fields.insert(field.clone(), converted);
            }
            schema.insert_unchecked(obj);
        }

        with_expressions.dedup();
        for id in with_expressions {
            let Some(obj) = schema.get(id) else { continue };
            let anchors = anchors_for(obj);
            let mut updated = obj.clone();
            for value in updated.fields.values_mut() {
                if let FieldValue::Expr(expr) = value {
                    let compiled = compiler
                        .compile(&expr.text, &schema, &anchors)
                        .with_context(|| format!("compiling {}", obj.describe()))?;
                    expr.refs = compiled.references;
                }
            }
            schema.replace_unchecked(updated);
        }

        schema.check_integrity().context("loading document")?;
        Ok(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::TextCompiler;

    fn sample() -> SchemaDocument {
        SchemaDocument::new()
            .with_std()
            .module("default")
            .object(ObjectDocument::new(ObjectKind::ObjectType, "default::Foo").base("std::Object"))
            .object(
                ObjectDocument::new(ObjectKind::Property, "default::Foo.bar")
                    .base("std::property")
                    .target("std::str"),
            )
    }

    #[test]
    fn test_document_builds_schema() {
        let schema = Schema::from_document(&sample(), &TextCompiler::default()).unwrap();
        let foo = schema.get_by_name(&Name::from("default::Foo")).unwrap();
        let bar = schema.get_by_name(&Name::from("default::Foo.bar")).unwrap();
        assert_eq!(bar.owner, Some(foo.id));
        assert_eq!(bar.id, ObjectId::derived_from(&bar.name));
        let str_id = schema.get_by_name(&Name::from("std::str")).unwrap().id;
        assert_eq!(bar.field("target"), Some(&FieldValue::Ref(str_id)));
    }

    #[test]
    fn test_forward_references_resolve() {
        let doc = SchemaDocument::new()
            .object(
                ObjectDocument::new(ObjectKind::Function, "default::f")
                    .field("params", PropertyValue::StrList(vec![]))
                    .field("return_type", PropertyValue::Ref(Name::from("default::T"))),
            )
            .object(ObjectDocument::new(ObjectKind::ScalarType, "default::T"));
        assert!(Schema::from_document(&doc, &TextCompiler::default()).is_ok());
    }

    #[test]
    fn test_expression_references_are_compiled() {
        let doc = sample().object(
            ObjectDocument::new(ObjectKind::Property, "default::Foo.upper")
                .base("std::property")
                .expr("expr", "str_upper(default::Foo.bar)"),
        );
        let schema = Schema::from_document(&doc, &TextCompiler::default()).unwrap();
        let bar = schema.get_by_name(&Name::from("default::Foo.bar")).unwrap().id;
        let referrers: Vec<_> = schema
            .get_referrers(bar)
            .iter()
            .map(|o| o.name.to_string())
            .collect();
        assert_eq!(referrers, vec!["default::Foo.upper"]);
    }

    #[test]
    fn test_undeclared_owner_is_rejected() {
        let doc = SchemaDocument::new().object(ObjectDocument::new(ObjectKind::Property, "default::Nope.bar"));
        let err = Schema::from_document(&doc, &TextCompiler::default()).unwrap_err();
        assert!(matches!(
            err.schema_kind(),
            Some(SchemaErrorKind::InvalidOwner { .. })
        ));
    }

    #[test]
    fn test_round_trip_through_json() {
        let schema = Schema::from_document(&sample(), &TextCompiler::default()).unwrap();
        let doc = SchemaDocument::from_schema(&schema).unwrap();
        let json = doc.to_json_string().unwrap();
        let back = SchemaDocument::from_json_str(&json).unwrap();
        let rebuilt = Schema::from_document(&back, &TextCompiler::default()).unwrap();
        assert_eq!(rebuilt.len(), schema.len());
        assert_eq!(
            rebuilt.get_by_name(&Name::from("default::Foo.bar")).map(|o| o.id),
            schema.get_by_name(&Name::from("default::Foo.bar")).map(|o| o.id)
        );
    }
}
