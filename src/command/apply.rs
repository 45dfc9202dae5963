//! Applying command trees to snapshots.
//!
//! Application never touches the input snapshot. [`DeltaRoot::apply`] clones
//! it (cheap, objects are shared) and mutates the clone; on error the clone
//! is dropped and the caller sees only the error.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

use super::{Action, Command, DeltaRoot};
use crate::compile::{resolve_fields, rewrite_references, ExpressionCompiler, ReferenceSpan};
use crate::context::map_renamed;
use crate::error::{DeltaError, ErrorContext, Result, SchemaErrorKind};
use crate::model::{anchors_for, FieldValue, Name, ObjectId, ObjectKind, PropertyValue, Schema, SchemaObject};

/// State shared by every command of one `apply` call.
struct ApplyContext<'a> {
    compiler: &'a dyn ExpressionCompiler,
    /// Objects dropped somewhere in this tree; references from them never
    /// block another drop.
    deleting: HashSet<ObjectId>,
    /// Renames performed so far, so later commands may use either name.
    renames: IndexMap<Name, Name>,
}

impl DeltaRoot {
    /// Apply every command in order, returning the resulting snapshot.
    pub fn apply(&self, schema: &Schema, compiler: &dyn ExpressionCompiler) -> Result<Schema> {
        let mut working = schema.clone();
        let mut ctx = ApplyContext {
            compiler,
            deleting: HashSet::new(),
            renames: IndexMap::new(),
        };
        for cmd in self.walk().filter(|c| c.action == Action::Delete) {
            if let Some(obj) = working.lookup(&cmd.classname, Some(cmd.kind)) {
                ctx.deleting.insert(obj.id);
                ctx.deleting.extend(working.descendants(obj.id).iter().map(|d| d.id));
            }
        }
        for cmd in &self.commands {
            cmd.apply_in(&mut working, None, &mut ctx)?;
        }
        Ok(working)
    }
}

impl Command {
    /// Apply this command alone.
    pub fn apply(&self, schema: &Schema, compiler: &dyn ExpressionCompiler) -> Result<Schema> {
        DeltaRoot::from_commands(vec![self.clone()]).apply(schema, compiler)
    }

    fn apply_in(&self, schema: &mut Schema, parent: Option<ObjectId>, ctx: &mut ApplyContext<'_>) -> Result<()> {
        let result = match (self.action, self.kind) {
            (Action::Create, _) => self.apply_create(schema, parent, ctx),
            (Action::Rename, ObjectKind::Module) => Err(DeltaError::schema(
                format!("renaming module '{}'", self.classname),
                SchemaErrorKind::InvalidCommand("modules cannot be renamed".to_string()),
            )),
            (Action::Alter | Action::Rename, _) => self.apply_alter(schema, parent, ctx),
            (Action::Delete, _) => self.apply_delete(schema, parent, ctx),
        };
        result.with_context(|| format!("{} {} '{}'", self.action, self.kind, self.classname))
    }

    // ========================================================================
    // Create
    // ========================================================================

    fn apply_create(&self, schema: &mut Schema, parent: Option<ObjectId>, ctx: &mut ApplyContext<'_>) -> Result<()> {
        if let Some(existing) = schema.get_by_name(&self.classname) {
            return Err(DeltaError::schema(
                "creating object",
                SchemaErrorKind::DuplicateObject {
                    kind: existing.kind.to_string(),
                    name: self.classname.to_string(),
                },
            ));
        }
        let id = match self.property("id").and_then(|p| p.new_value.as_ref()) {
            Some(PropertyValue::Id(id)) => *id,
            _ => ObjectId::new(),
        };

        let owner = match parent {
            Some(owner) => Some(owner),
            None => match self.classname.owner() {
                Some(owner_name) => Some(
                    schema
                        .get_by_name(&owner_name)
                        .map(|o| o.id)
                        .ok_or_else(|| {
                            DeltaError::schema(
                                "creating object",
                                SchemaErrorKind::InvalidOwner {
                                    name: self.classname.to_string(),
                                    reason: format!("owner '{owner_name}' does not exist"),
                                },
                            )
                        })?,
                ),
                None => None,
            },
        };

        let mut obj = SchemaObject::new(id, self.classname.clone(), self.kind);
        obj.owner = owner;
        let anchors = anchors_for(&obj);

        // Plain values first so that expressions can see the new object.
        let (exprs, plain): (Vec<_>, Vec<_>) = self
            .applied_values()
            .partition(|(_, value)| matches!(value, PropertyValue::Expr(_)));
        obj.fields = resolve_fields(schema, self.kind, plain, ctx.compiler, &anchors)?;
        if self.kind.is_inheriting() && !obj.fields.contains_key("bases") {
            obj.fields.insert("bases".to_string(), FieldValue::RefList(Vec::new()));
        }
        schema.insert(obj)?;

        if !exprs.is_empty() {
            let compiled = resolve_fields(schema, self.kind, exprs, ctx.compiler, &anchors)?;
            let mut updated = require_id(schema, id)?.clone();
            updated.fields.extend(compiled);
            schema.replace(updated)?;
        }

        for sub in &self.subcommands {
            sub.apply_in(schema, Some(id), ctx)?;
        }
        Ok(())
    }

    /// `(field, value)` pairs `apply` should store.
    fn applied_values(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties
            .iter()
            .filter(|p| p.is_applied())
            .filter_map(|p| p.new_value.as_ref().map(|v| (p.name.as_str(), v)))
    }

    // ========================================================================
    // Alter / Rename
    // ========================================================================

    fn apply_alter(&self, schema: &mut Schema, parent: Option<ObjectId>, ctx: &mut ApplyContext<'_>) -> Result<()> {
        let id = resolve_target(schema, &self.classname, self.kind, parent, ctx)?.id;

        if self.action == Action::Rename {
            let new_name = self.new_name.clone().ok_or_else(|| {
                DeltaError::schema(
                    "renaming object",
                    SchemaErrorKind::InvalidCommand("rename without a new name".to_string()),
                )
            })?;
            rename_object(schema, id, &new_name, ctx)?;
        }

        let mut updated = require_id(schema, id)?.clone();
        let anchors = anchors_for(&updated);
        let mut changed = false;
        for prop in self.properties.iter().filter(|p| p.is_applied()) {
            changed = true;
            match &prop.new_value {
                None => {
                    updated.fields.remove(&prop.name);
                }
                Some(value) => {
                    let resolved = resolve_fields(
                        schema,
                        self.kind,
                        std::iter::once((prop.name.as_str(), value)),
                        ctx.compiler,
                        &anchors,
                    )?;
                    updated.fields.extend(resolved);
                }
            }
        }
        if changed {
            schema.replace(updated)?;
        }

        for sub in &self.subcommands {
            sub.apply_in(schema, Some(id), ctx)?;
        }
        Ok(())
    }

    // ========================================================================
    // Delete
    // ========================================================================

    fn apply_delete(&self, schema: &mut Schema, parent: Option<ObjectId>, ctx: &mut ApplyContext<'_>) -> Result<()> {
        let id = resolve_target(schema, &self.classname, self.kind, parent, ctx)?.id;
        ctx.deleting.insert(id);
        ctx.deleting.extend(schema.descendants(id).iter().map(|d| d.id));

        for sub in &self.subcommands {
            sub.apply_in(schema, Some(id), ctx)?;
        }

        // Whatever owned objects the tree did not drop explicitly go with
        // their owner, deepest first.
        let remaining: Vec<ObjectId> = schema.descendants(id).iter().rev().map(|d| d.id).collect();
        for child in remaining {
            drop_object(schema, child, ctx)?;
        }
        drop_object(schema, id, ctx)
    }
}

/// Find the object a command targets.
///
/// Nested commands may spell their target with the owner's name from either
/// side of an owner rename, so a child of `parent` with the same local name
/// is accepted too.
fn resolve_target<'s>(
    schema: &'s Schema,
    name: &Name,
    kind: ObjectKind,
    parent: Option<ObjectId>,
    ctx: &ApplyContext<'_>,
) -> Result<&'s SchemaObject> {
    let direct = schema
        .lookup(name, Some(kind))
        .filter(|obj| parent.is_none() || obj.owner == parent);
    if let Some(obj) = direct {
        return Ok(obj);
    }
    if let Some(parent) = parent {
        let sibling = schema
            .children(parent)
            .into_iter()
            .find(|child| child.kind == kind && child.name.local() == name.local());
        if let Some(obj) = sibling {
            return Ok(obj);
        }
    }
    schema.require(&map_renamed(&ctx.renames, name), kind)
}

fn require_id(schema: &Schema, id: ObjectId) -> Result<&SchemaObject> {
    schema.get(id).ok_or_else(|| {
        DeltaError::schema(
            "object lookup",
            SchemaErrorKind::ObjectNotFound {
                kind: "object".to_string(),
                name: id.to_string(),
            },
        )
    })
}

/// Rename `id` and everything whose name derives from it, then rewrite
/// expression text in other objects that spelled out the old names.
fn rename_object(schema: &mut Schema, id: ObjectId, new_name: &Name, ctx: &mut ApplyContext<'_>) -> Result<()> {
    let obj = require_id(schema, id)?;
    let old_name = obj.name.clone();
    if &old_name == new_name {
        return Ok(());
    }
    if old_name.owner() != new_name.owner() {
        return Err(DeltaError::schema(
            "renaming object",
            SchemaErrorKind::InvalidOwner {
                name: new_name.to_string(),
                reason: format!("'{old_name}' cannot move to another owner"),
            },
        ));
    }

    let subtree: IndexSet<ObjectId> = std::iter::once(id)
        .chain(schema.descendants(id).iter().map(|d| d.id))
        .collect();

    // Locate textual references while the old names still resolve.
    let mut rewrites: Vec<(ObjectId, String, Vec<ReferenceSpan>)> = Vec::new();
    let referrers: IndexSet<ObjectId> = subtree
        .iter()
        .flat_map(|target| schema.get_referrers(*target))
        .map(|r| r.id)
        .collect();
    for referrer_id in referrers {
        let Some(referrer) = schema.get(referrer_id) else { continue };
        let anchors = anchors_for(referrer);
        for (field, value) in &referrer.fields {
            if let FieldValue::Expr(expr) = value {
                if expr.refs.iter().any(|r| subtree.contains(r)) {
                    let spans = ctx.compiler.track_references(&expr.text, schema, &anchors)?;
                    rewrites.push((referrer_id, field.clone(), spans));
                }
            }
        }
    }

    for target in &subtree {
        let mut renamed = require_id(schema, *target)?.clone();
        renamed.name = if *target == id {
            new_name.clone()
        } else {
            match renamed.name.rebase(&old_name, new_name) {
                Some(name) => name,
                None => continue,
            }
        };
        schema.replace(renamed)?;
    }

    for (referrer_id, field, spans) in rewrites {
        let mut referrer = require_id(schema, referrer_id)?.clone();
        let Some(FieldValue::Expr(expr)) = referrer.fields.get_mut(&field) else {
            continue;
        };
        if let Some(text) = rewrite_references(&expr.text, &spans, &old_name, new_name) {
            expr.text = text;
            schema.replace(referrer)?;
        }
    }

    ctx.renames.insert(old_name, new_name.clone());
    Ok(())
}

/// Remove one object after checking nothing outside the drop still needs it.
fn drop_object(schema: &mut Schema, id: ObjectId, ctx: &ApplyContext<'_>) -> Result<()> {
    let Some(obj) = schema.get(id) else {
        return Ok(());
    };

    let mut blocking = Vec::new();
    let mut weak_only = Vec::new();
    for referrer in schema.get_referrers(id) {
        if ctx.deleting.contains(&referrer.id) {
            continue;
        }
        let fields = schema.reference_fields(referrer, id);
        let all_weak = !fields.is_empty()
            && fields.iter().all(|f| {
                referrer
                    .kind
                    .descriptor()
                    .field(f)
                    .is_some_and(|spec| spec.weak)
            });
        if all_weak {
            weak_only.push((referrer.id, fields));
        } else {
            blocking.push(referrer.describe());
        }
    }

    if !blocking.is_empty() {
        return Err(DeltaError::schema(
            format!("dropping {}", obj.describe()),
            SchemaErrorKind::DependencyViolation {
                object: obj.describe(),
                referrers: blocking,
            },
        ));
    }

    for (referrer_id, fields) in weak_only {
        let mut referrer = require_id(schema, referrer_id)?.clone();
        for field in fields {
            referrer.fields.remove(&field);
        }
        schema.replace(referrer)?;
    }

    schema.remove(id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AlterProperty;
    use crate::compile::TextCompiler;
    use crate::model::{ObjectDocument, SchemaDocument};

    fn schema() -> Schema {
        let doc = SchemaDocument::new()
            .with_std()
            .module("default")
            .object(ObjectDocument::new(ObjectKind::ScalarType, "default::Label").base("std::str"))
            .object(ObjectDocument::new(ObjectKind::ObjectType, "default::Foo").base("std::Object"))
            .object(
                ObjectDocument::new(ObjectKind::Property, "default::Foo.bar")
                    .base("std::property")
                    .target("default::Label"),
            )
            .object(
                ObjectDocument::new(ObjectKind::Property, "default::Foo.shout")
                    .base("std::property")
                    .expr("expr", "str_upper(default::Foo.bar)"),
            );
        Schema::from_document(&doc, &TextCompiler::default()).unwrap()
    }

    fn name(s: &str) -> Name {
        Name::from(s)
    }

    #[test]
    fn test_create_with_children() {
        let cmd = Command::create(ObjectKind::ObjectType, "default::User")
            .with_property(AlterProperty::set(
                "bases",
                PropertyValue::RefList(vec![name("std::Object")]),
            ))
            .with_subcommand(
                Command::create(ObjectKind::Property, "default::User.email")
                    .with_property(AlterProperty::set("target", PropertyValue::Ref(name("std::str")))),
            );
        let before = schema();
        let after = cmd.apply(&before, &TextCompiler::default()).unwrap();
        let user = after.get_by_name(&name("default::User")).unwrap();
        let email = after.get_by_name(&name("default::User.email")).unwrap();
        assert_eq!(email.owner, Some(user.id));
        assert!(before.get_by_name(&name("default::User")).is_none());
    }

    #[test]
    fn test_create_keeps_recorded_id() {
        let id = ObjectId::new();
        let cmd = Command::create(ObjectKind::ScalarType, "default::S")
            .with_property(AlterProperty::set("id", PropertyValue::Id(id)));
        let after = cmd.apply(&schema(), &TextCompiler::default()).unwrap();
        assert_eq!(after.get_by_name(&name("default::S")).map(|o| o.id), Some(id));
    }

    #[test]
    fn test_create_duplicate_is_rejected() {
        let cmd = Command::create(ObjectKind::ScalarType, "default::Label");
        let err = cmd.apply(&schema(), &TextCompiler::default()).unwrap_err();
        assert!(matches!(
            err.schema_kind(),
            Some(SchemaErrorKind::DuplicateObject { .. })
        ));
    }

    #[test]
    fn test_rename_cascades_and_rewrites_expressions() {
        let cmd = Command::rename(ObjectKind::ObjectType, "default::Foo", "default::Qux");
        let after = cmd.apply(&schema(), &TextCompiler::default()).unwrap();
        assert!(after.get_by_name(&name("default::Foo")).is_none());
        assert!(after.get_by_name(&name("default::Qux.bar")).is_some());
        let shout = after.get_by_name(&name("default::Qux.shout")).unwrap();
        match shout.field("expr") {
            Some(FieldValue::Expr(expr)) => assert_eq!(expr.text, "str_upper(default::Qux.bar)"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rename_keeps_identity() {
        let before = schema();
        let id = before.get_by_name(&name("default::Foo.bar")).unwrap().id;
        let cmd = Command::alter(ObjectKind::ObjectType, "default::Foo")
            .with_subcommand(Command::rename(ObjectKind::Property, "default::Foo.bar", "default::Foo.baz"));
        let after = cmd.apply(&before, &TextCompiler::default()).unwrap();
        assert_eq!(after.get_by_name(&name("default::Foo.baz")).map(|o| o.id), Some(id));
    }

    #[test]
    fn test_module_rename_is_rejected() {
        let cmd = Command::rename(ObjectKind::Module, "default", "other");
        assert!(cmd.apply(&schema(), &TextCompiler::default()).is_err());
    }

    #[test]
    fn test_bare_delete_of_referenced_object_fails() {
        let cmd = Command::delete(ObjectKind::ScalarType, "default::Label");
        let err = cmd.apply(&schema(), &TextCompiler::default()).unwrap_err();
        match err.schema_kind() {
            Some(SchemaErrorKind::DependencyViolation { object, referrers }) => {
                assert_eq!(object, "scalar type 'default::Label'");
                assert_eq!(referrers, &vec!["property 'default::Foo.bar'".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("dropping scalar type 'default::Label'"));
    }

    #[test]
    fn test_delete_cascades_into_children() {
        let cmd = Command::delete(ObjectKind::ObjectType, "default::Foo");
        let after = cmd.apply(&schema(), &TextCompiler::default()).unwrap();
        assert!(after.get_by_name(&name("default::Foo")).is_none());
        assert!(after.get_by_name(&name("default::Foo.bar")).is_none());
        // Label loses its only referrer but stays.
        assert!(after.get_by_name(&name("default::Label")).is_some());
    }

    #[test]
    fn test_delete_together_with_referrer() {
        let root = DeltaRoot::from_commands(vec![
            Command::delete(ObjectKind::ScalarType, "default::Label"),
            Command::delete(ObjectKind::ObjectType, "default::Foo"),
        ]);
        let after = root.apply(&schema(), &TextCompiler::default()).unwrap();
        assert!(after.get_by_name(&name("default::Label")).is_none());
        assert!(after.get_by_name(&name("default::Foo")).is_none());
    }

    #[test]
    fn test_alter_unsets_field() {
        let cmd = Command::alter(ObjectKind::Property, "default::Foo.bar").with_property(AlterProperty::change(
            "target",
            Some(PropertyValue::Ref(name("default::Label"))),
            Some(PropertyValue::Ref(name("std::int64"))),
        ));
        let after = cmd.apply(&schema(), &TextCompiler::default()).unwrap();
        let int = after.get_by_name(&name("std::int64")).unwrap().id;
        let bar = after.get_by_name(&name("default::Foo.bar")).unwrap();
        assert_eq!(bar.field("target"), Some(&FieldValue::Ref(int)));

        let unset = Command::alter(ObjectKind::Property, "default::Foo.bar")
            .with_property(AlterProperty::change("target", Some(PropertyValue::Ref(name("std::int64"))), None));
        let after = unset.apply(&after, &TextCompiler::default()).unwrap();
        assert!(after.get_by_name(&name("default::Foo.bar")).unwrap().field("target").is_none());
    }

    #[test]
    fn test_bases_cycle_surfaces_as_cycle_error() {
        let cmd = Command::alter(ObjectKind::ScalarType, "std::str").with_property(AlterProperty::change(
            "bases",
            None,
            Some(PropertyValue::RefList(vec![name("default::Label")])),
        ));
        let err = cmd.apply(&schema(), &TextCompiler::default()).unwrap_err();
        assert!(matches!(err, DeltaError::Cycle { .. }), "{err}");
    }
}
