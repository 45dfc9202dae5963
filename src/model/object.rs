//! Schema objects.

use std::collections::BTreeMap;

use super::descriptor::FieldSpec;
use super::kind::ObjectKind;
use super::name::{Name, ObjectId};
use super::value::FieldValue;

/// One schema entity inside a snapshot.
///
/// Only explicitly set fields are stored; `bases` lives in `fields` like any
/// other reference list so that comparison and diffing treat it uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaObject {
    pub id: ObjectId,
    pub name: Name,
    pub kind: ObjectKind,
    /// Owning object for refdict children.
    pub owner: Option<ObjectId>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl SchemaObject {
    pub fn new(id: ObjectId, name: impl Into<Name>, kind: ObjectKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            owner: None,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner: ObjectId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Ordered base ids; empty for non-inheriting kinds.
    #[must_use]
    pub fn bases(&self) -> &[ObjectId] {
        match self.fields.get("bases") {
            Some(FieldValue::RefList(ids)) => ids,
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(self.fields.get("is_abstract"), Some(FieldValue::Bool(true)))
    }

    /// Every id referenced through a field, in field order.
    pub fn field_references(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.fields.values().flat_map(FieldValue::references)
    }

    /// Names of the fields through which this object references `target`.
    #[must_use]
    pub fn fields_referencing(&self, target: ObjectId) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, value)| value.references_id(target))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Field specs for this object's kind.
    #[must_use]
    pub fn field_specs(&self) -> &'static [FieldSpec] {
        self.kind.descriptor().fields
    }

    /// "property 'default::Foo.bar'"
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{} '{}'", self.kind, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_referencing() {
        let target = ObjectId::new();
        let obj = SchemaObject::new(ObjectId::new(), "default::Foo.bar", ObjectKind::Property)
            .with_field("target", FieldValue::Ref(target))
            .with_field("required", FieldValue::Bool(true));
        assert_eq!(obj.fields_referencing(target), vec!["target"]);
        assert_eq!(obj.describe(), "property 'default::Foo.bar'");
        assert!(obj.bases().is_empty());
    }
}
