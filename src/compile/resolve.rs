//! Turning name-based values back into snapshot values.

use std::collections::BTreeMap;

use super::{Anchors, ExpressionCompiler};
use crate::error::{DeltaError, Result, SchemaErrorKind};
use crate::model::{Expression, FieldSpec, FieldValue, Name, ObjectId, ObjectKind, PropertyValue, Schema};

fn lookup(schema: &Schema, name: &Name) -> Result<ObjectId> {
    schema.get_by_name(name).map(|o| o.id).ok_or_else(|| {
        DeltaError::schema(
            "resolving reference",
            SchemaErrorKind::UnresolvedName {
                name: name.to_string(),
            },
        )
    })
}

/// Resolve one value for `spec` against `schema`.
///
/// Names must exist; expressions go through `compiler`.
pub fn resolve_value(
    schema: &Schema,
    spec: &FieldSpec,
    value: &PropertyValue,
    compiler: &dyn ExpressionCompiler,
    anchors: &Anchors,
) -> Result<FieldValue> {
    if !value.matches_type(spec.ty) {
        return Err(DeltaError::schema(
            "resolving value",
            SchemaErrorKind::InvalidValue {
                field: spec.name.to_string(),
                message: format!("expected {:?}, got {value}", spec.ty),
            },
        ));
    }
    Ok(match value {
        PropertyValue::Bool(b) => FieldValue::Bool(*b),
        PropertyValue::Int(i) => FieldValue::Int(*i),
        PropertyValue::Str(s) => FieldValue::Str(s.clone()),
        PropertyValue::StrList(items) => FieldValue::StrList(items.clone()),
        PropertyValue::Expr(text) => {
            let compiled = compiler.compile(text, schema, anchors)?;
            FieldValue::Expr(Expression::new(text.clone(), compiled.references))
        }
        PropertyValue::Ref(name) => FieldValue::Ref(lookup(schema, name)?),
        PropertyValue::RefList(names) => FieldValue::RefList(
            names
                .iter()
                .map(|n| lookup(schema, n))
                .collect::<Result<_>>()?,
        ),
        PropertyValue::RefSet(names) => FieldValue::RefSet(
            names
                .iter()
                .map(|n| lookup(schema, n))
                .collect::<Result<_>>()?,
        ),
        PropertyValue::Id(_) => {
            return Err(DeltaError::schema(
                "resolving value",
                SchemaErrorKind::InvalidValue {
                    field: spec.name.to_string(),
                    message: "ids are only valid for the `id` property".to_string(),
                },
            ))
        }
    })
}

/// Resolve a set of named values for an object of `kind`.
pub fn resolve_fields<'a>(
    schema: &Schema,
    kind: ObjectKind,
    values: impl IntoIterator<Item = (&'a str, &'a PropertyValue)>,
    compiler: &dyn ExpressionCompiler,
    anchors: &Anchors,
) -> Result<BTreeMap<String, FieldValue>> {
    let desc = kind.descriptor();
    values
        .into_iter()
        .map(|(name, value)| {
            let spec = desc.field(name).ok_or_else(|| {
                DeltaError::schema(
                    "resolving fields",
                    SchemaErrorKind::UnknownField {
                        kind: kind.to_string(),
                        field: name.to_string(),
                    },
                )
            })?;
            Ok((name.to_string(), resolve_value(schema, spec, value, compiler, anchors)?))
        })
        .collect()
}
