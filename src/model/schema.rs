//! Immutable schema snapshots.
//!
//! A [`Schema`] is a value: cloning it is cheap (objects sit behind `Arc`)
//! and nothing outside this crate can mutate one. Command application clones
//! the input snapshot and works on the copy, so the caller's snapshot is never
//! touched and a failed apply leaves no partial state behind.

use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use super::descriptor::FieldType;
use super::kind::ObjectKind;
use super::name::{Name, ObjectId};
use super::object::SchemaObject;
use super::value::{FieldValue, PropertyValue};
use crate::error::{DeltaError, Result, SchemaErrorKind};

/// Key for [`Schema::lookup`].
#[derive(Debug, Clone, Copy)]
pub enum ObjectKey<'a> {
    Id(ObjectId),
    Name(&'a Name),
}

impl From<ObjectId> for ObjectKey<'_> {
    fn from(id: ObjectId) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a Name> for ObjectKey<'a> {
    fn from(name: &'a Name) -> Self {
        Self::Name(name)
    }
}

/// A point-in-time graph of schema objects.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    objects: IndexMap<ObjectId, Arc<SchemaObject>>,
    by_name: HashMap<Name, ObjectId>,
    /// owner -> owned children, in insertion order
    children: HashMap<ObjectId, IndexSet<ObjectId>>,
    /// target -> objects referencing it
    referrers: HashMap<ObjectId, IndexSet<ObjectId>>,
}

impl Schema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// All objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SchemaObject> {
        self.objects.values().map(AsRef::as_ref)
    }

    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<&SchemaObject> {
        self.objects.get(&id).map(AsRef::as_ref)
    }

    #[must_use]
    pub fn get_by_name(&self, name: &Name) -> Option<&SchemaObject> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Look up by id or name, optionally requiring a kind.
    #[must_use]
    pub fn lookup<'a>(
        &self,
        key: impl Into<ObjectKey<'a>>,
        kind: Option<ObjectKind>,
    ) -> Option<&SchemaObject> {
        let obj = match key.into() {
            ObjectKey::Id(id) => self.get(id),
            ObjectKey::Name(name) => self.get_by_name(name),
        }?;
        match kind {
            Some(kind) if obj.kind != kind => None,
            _ => Some(obj),
        }
    }

    /// Fetch by name, failing with a schema error when absent or of another kind.
    pub fn require(&self, name: &Name, kind: ObjectKind) -> Result<&SchemaObject> {
        let obj = self.get_by_name(name).ok_or_else(|| {
            DeltaError::schema(
                "object lookup",
                SchemaErrorKind::ObjectNotFound {
                    kind: kind.to_string(),
                    name: name.to_string(),
                },
            )
        })?;
        if obj.kind != kind {
            return Err(DeltaError::schema(
                "object lookup",
                SchemaErrorKind::KindMismatch {
                    name: name.to_string(),
                    expected: kind.to_string(),
                    found: obj.kind.to_string(),
                },
            ));
        }
        Ok(obj)
    }

    /// Every object of `kind`, owned or not.
    pub fn get_objects(&self, kind: ObjectKind) -> impl Iterator<Item = &SchemaObject> {
        self.iter().filter(move |obj| obj.kind == kind)
    }

    /// Objects of `kind` that are not owned by another object.
    pub fn top_level(&self, kind: ObjectKind) -> impl Iterator<Item = &SchemaObject> {
        self.get_objects(kind).filter(|obj| obj.owner.is_none())
    }

    /// All objects holding a reference to `id`.
    #[must_use]
    pub fn get_referrers(&self, id: ObjectId) -> Vec<&SchemaObject> {
        self.referrers
            .get(&id)
            .map(|ids| ids.iter().filter_map(|r| self.get(*r)).collect())
            .unwrap_or_default()
    }

    /// Directly owned children of `id`.
    #[must_use]
    pub fn children(&self, id: ObjectId) -> Vec<&SchemaObject> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|c| self.get(*c)).collect())
            .unwrap_or_default()
    }

    /// Owned children of `id` held in the refdict `attr`.
    #[must_use]
    pub fn children_in(&self, id: ObjectId, attr: &str) -> Vec<&SchemaObject> {
        let Some(owner) = self.get(id) else {
            return Vec::new();
        };
        let desc = owner.kind.descriptor();
        self.children(id)
            .into_iter()
            .filter(|child| desc.refdict_for(child.kind).is_some_and(|r| r.attr == attr))
            .collect()
    }

    /// All transitively owned objects, parents before children.
    #[must_use]
    pub fn descendants(&self, id: ObjectId) -> Vec<&SchemaObject> {
        let mut out = Vec::new();
        let mut queue: VecDeque<ObjectId> = VecDeque::from([id]);
        while let Some(next) = queue.pop_front() {
            for child in self.children(next) {
                queue.push_back(child.id);
                out.push(child);
            }
        }
        out
    }

    /// The outermost owner of `id` (the object itself when it is top-level).
    #[must_use]
    pub fn top_level_owner(&self, id: ObjectId) -> Option<&SchemaObject> {
        let mut current = self.get(id)?;
        while let Some(owner) = current.owner.and_then(|o| self.get(o)) {
            current = owner;
        }
        Some(current)
    }

    /// Objects referenced by `obj`: field references plus its module object.
    #[must_use]
    pub fn references(&self, obj: &SchemaObject) -> IndexSet<ObjectId> {
        let mut refs: IndexSet<ObjectId> = obj.field_references().collect();
        if let Some(module) = self.module_of(obj) {
            refs.insert(module);
        }
        refs.shift_remove(&obj.id);
        refs
    }

    /// Field names through which `referrer` depends on `target`.
    ///
    /// The implicit module reference is reported as `module`.
    #[must_use]
    pub fn reference_fields(&self, referrer: &SchemaObject, target: ObjectId) -> Vec<String> {
        let mut fields: Vec<String> = referrer
            .fields_referencing(target)
            .into_iter()
            .map(str::to_string)
            .collect();
        if self.module_of(referrer) == Some(target) {
            fields.push("module".to_string());
        }
        fields
    }

    fn module_of(&self, obj: &SchemaObject) -> Option<ObjectId> {
        if obj.kind == ObjectKind::Module {
            return None;
        }
        let module = Name::new(obj.name.module()?);
        self.by_name
            .get(&module)
            .copied()
            .filter(|id| self.get(*id).is_some_and(|m| m.kind == ObjectKind::Module))
    }

    #[must_use]
    pub fn get_bases(&self, id: ObjectId) -> Vec<&SchemaObject> {
        self.get(id)
            .map(|obj| obj.bases().iter().filter_map(|b| self.get(*b)).collect())
            .unwrap_or_default()
    }

    /// Linearized ancestors of `id`, nearest first.
    pub fn get_ancestors(&self, id: ObjectId) -> Result<Vec<&SchemaObject>> {
        let ids = super::inheritance::compute_ancestors(self, id)?;
        Ok(ids.into_iter().filter_map(|a| self.get(a)).collect())
    }

    pub fn name_of(&self, id: ObjectId) -> Result<&Name> {
        self.get(id).map(|obj| &obj.name).ok_or_else(|| {
            DeltaError::schema(
                "reducing reference",
                SchemaErrorKind::UnresolvedName {
                    name: id.to_string(),
                },
            )
        })
    }

    /// Reduce an id-based value to its name-based form.
    pub fn reduce(&self, value: &FieldValue) -> Result<PropertyValue> {
        Ok(match value {
            FieldValue::Bool(b) => PropertyValue::Bool(*b),
            FieldValue::Int(i) => PropertyValue::Int(*i),
            FieldValue::Str(s) => PropertyValue::Str(s.clone()),
            FieldValue::StrList(items) => PropertyValue::StrList(items.clone()),
            FieldValue::Expr(expr) => PropertyValue::Expr(expr.text.clone()),
            FieldValue::Ref(id) => PropertyValue::Ref(self.name_of(*id)?.clone()),
            FieldValue::RefList(ids) => PropertyValue::RefList(
                ids.iter()
                    .map(|id| self.name_of(*id).cloned())
                    .collect::<Result<_>>()?,
            ),
            FieldValue::RefSet(ids) => PropertyValue::RefSet(
                ids.iter()
                    .map(|id| self.name_of(*id).cloned())
                    .collect::<Result<BTreeSet<_>>>()?,
            ),
        })
    }

    /// Reduced form of all explicit fields of `obj`.
    pub fn reduced_fields(&self, obj: &SchemaObject) -> Result<BTreeMap<String, PropertyValue>> {
        obj.fields
            .iter()
            .map(|(name, value)| Ok((name.clone(), self.reduce(value)?)))
            .collect()
    }

    /// Add an object, returning the extended snapshot.
    pub fn with_object(mut self, obj: SchemaObject) -> Result<Self> {
        self.insert(obj)?;
        Ok(self)
    }

    // ========================================================================
    // Mutation (working copies only)
    // ========================================================================

    pub(crate) fn insert(&mut self, obj: SchemaObject) -> Result<()> {
        if self.objects.contains_key(&obj.id) {
            return Err(DeltaError::schema(
                format!("inserting {}", obj.describe()),
                SchemaErrorKind::DuplicateId {
                    id: obj.id.to_string(),
                },
            ));
        }
        if self.by_name.contains_key(&obj.name) {
            return Err(DeltaError::schema(
                "inserting object",
                SchemaErrorKind::DuplicateObject {
                    kind: obj.kind.to_string(),
                    name: obj.name.to_string(),
                },
            ));
        }
        self.validate_object(&obj)?;
        self.index(Arc::new(obj));
        Ok(())
    }

    pub(crate) fn replace(&mut self, obj: SchemaObject) -> Result<()> {
        let old = self.objects.get(&obj.id).cloned().ok_or_else(|| {
            DeltaError::schema(
                "replacing object",
                SchemaErrorKind::ObjectNotFound {
                    kind: obj.kind.to_string(),
                    name: obj.name.to_string(),
                },
            )
        })?;
        if old.kind != obj.kind {
            return Err(DeltaError::schema(
                "replacing object",
                SchemaErrorKind::KindMismatch {
                    name: obj.name.to_string(),
                    expected: old.kind.to_string(),
                    found: obj.kind.to_string(),
                },
            ));
        }
        if old.owner != obj.owner {
            return Err(DeltaError::schema(
                "replacing object",
                SchemaErrorKind::InvalidOwner {
                    name: obj.name.to_string(),
                    reason: "objects cannot change owner".to_string(),
                },
            ));
        }
        if let Some(existing) = self.by_name.get(&obj.name) {
            if *existing != obj.id {
                return Err(DeltaError::schema(
                    "renaming object",
                    SchemaErrorKind::DuplicateObject {
                        kind: obj.kind.to_string(),
                        name: obj.name.to_string(),
                    },
                ));
            }
        }
        self.validate_object(&obj)?;
        let bases_changed = old.bases() != obj.bases();
        let id = obj.id;
        self.unindex(&old);
        self.index(Arc::new(obj));
        if bases_changed {
            super::inheritance::compute_ancestors(self, id)?;
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: ObjectId) -> Result<SchemaObject> {
        let obj = self.objects.get(&id).cloned().ok_or_else(|| {
            DeltaError::schema(
                "removing object",
                SchemaErrorKind::ObjectNotFound {
                    kind: "object".to_string(),
                    name: id.to_string(),
                },
            )
        })?;
        if self.children.get(&id).is_some_and(|c| !c.is_empty()) {
            return Err(DeltaError::schema(
                format!("removing {}", obj.describe()),
                SchemaErrorKind::InvalidCommand("owned children must be removed first".to_string()),
            ));
        }
        self.unindex(&obj);
        self.objects.shift_remove(&id);
        self.referrers.remove(&id);
        self.children.remove(&id);
        Ok(Arc::unwrap_or_clone(obj))
    }

    /// Insert without validation; used while loading documents, where
    /// references may point forward. Follow with [`Schema::check_integrity`].
    pub(crate) fn insert_unchecked(&mut self, obj: SchemaObject) {
        self.index(Arc::new(obj));
    }

    pub(crate) fn replace_unchecked(&mut self, obj: SchemaObject) {
        if let Some(old) = self.objects.get(&obj.id).cloned() {
            self.unindex(&old);
        }
        self.index(Arc::new(obj));
    }

    /// Verify every object: fields, references, ownership and inheritance.
    pub fn check_integrity(&self) -> Result<()> {
        for obj in self.iter() {
            self.validate_object(obj)?;
            if obj.kind.is_inheriting() {
                super::inheritance::compute_ancestors(self, obj.id)?;
            }
        }
        Ok(())
    }

    fn validate_object(&self, obj: &SchemaObject) -> Result<()> {
        let context = || format!("validating {}", obj.describe());
        let desc = obj.kind.descriptor();

        for (name, value) in &obj.fields {
            let spec = desc.field(name).ok_or_else(|| {
                DeltaError::schema(
                    context(),
                    SchemaErrorKind::UnknownField {
                        kind: obj.kind.to_string(),
                        field: name.clone(),
                    },
                )
            })?;
            if value.field_type() != spec.ty {
                return Err(DeltaError::schema(
                    context(),
                    SchemaErrorKind::InvalidValue {
                        field: name.clone(),
                        message: format!("expected {:?}, got {:?}", spec.ty, value.field_type()),
                    },
                ));
            }
            // Expression refs are produced by the compiler; plain refs must resolve.
            if spec.ty != FieldType::Expr {
                for target in value.references() {
                    if !self.objects.contains_key(&target) {
                        return Err(DeltaError::schema(
                            context(),
                            SchemaErrorKind::UnresolvedName {
                                name: target.to_string(),
                            },
                        ));
                    }
                }
            }
        }

        match obj.owner {
            Some(owner_id) => {
                let owner = self.get(owner_id).ok_or_else(|| {
                    DeltaError::schema(
                        context(),
                        SchemaErrorKind::ObjectNotFound {
                            kind: "owner".to_string(),
                            name: owner_id.to_string(),
                        },
                    )
                })?;
                if owner.kind.descriptor().refdict_for(obj.kind).is_none() {
                    return Err(DeltaError::schema(
                        context(),
                        SchemaErrorKind::InvalidOwner {
                            name: obj.name.to_string(),
                            reason: format!("a {} cannot own a {}", owner.kind, obj.kind),
                        },
                    ));
                }
                if !obj.name.is_derived_from(&owner.name) {
                    return Err(DeltaError::schema(
                        context(),
                        SchemaErrorKind::InvalidOwner {
                            name: obj.name.to_string(),
                            reason: format!("name must derive from '{}'", owner.name),
                        },
                    ));
                }
            }
            None if obj.kind == ObjectKind::Index => {
                return Err(DeltaError::schema(
                    context(),
                    SchemaErrorKind::InvalidOwner {
                        name: obj.name.to_string(),
                        reason: "indexes must be owned".to_string(),
                    },
                ));
            }
            None => {}
        }
        Ok(())
    }

    fn index(&mut self, obj: Arc<SchemaObject>) {
        let id = obj.id;
        self.by_name.insert(obj.name.clone(), id);
        if let Some(owner) = obj.owner {
            self.children.entry(owner).or_default().insert(id);
        }
        for target in self.references(&obj) {
            self.referrers.entry(target).or_default().insert(id);
        }
        if obj.kind == ObjectKind::Module {
            let members: Vec<ObjectId> = self
                .iter()
                .filter(|o| o.kind != ObjectKind::Module && o.name.module() == Some(obj.name.as_str()))
                .map(|o| o.id)
                .collect();
            self.referrers.entry(id).or_default().extend(members);
        }
        self.objects.insert(id, obj);
    }

    fn unindex(&mut self, obj: &SchemaObject) {
        for target in self.references(obj) {
            if let Some(set) = self.referrers.get_mut(&target) {
                set.shift_remove(&obj.id);
            }
        }
        if let Some(owner) = obj.owner {
            if let Some(set) = self.children.get_mut(&owner) {
                set.shift_remove(&obj.id);
            }
        }
        if self.by_name.get(&obj.name) == Some(&obj.id) {
            self.by_name.remove(&obj.name);
        }
    }
}
