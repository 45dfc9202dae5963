//! Ordering command trees so they apply front to back.
//!
//! Every sibling list in the tree is sorted on its own. A command waits for:
//!
//! 1. the commands that introduce (create or rename) anything its new state
//!    references
//! 2. the drop or rename that frees a name it claims
//! 3. for drops, the commands that touch the objects still referring to
//!    what it drops
//!
//! Nested drops are first split out of alters into a separate alter of the
//! same object, so that "add the new child" and "drop the old child" can land
//! on different sides of the commands that move references between them.

use indexmap::IndexMap;
use std::collections::HashSet;

use super::topological::{sort, SortNode, SortOptions};
use crate::command::{Action, Command, DeltaRoot};
use crate::error::Result;
use crate::model::{Name, ObjectId, ObjectKind, Schema, SchemaObject};

/// Order `commands` so that applying them in sequence to `old` is valid and
/// ends in `new`.
///
/// A dependency cycle is returned as [`DeltaError::Cycle`](crate::error::DeltaError::Cycle);
/// nothing is reordered to break it.
pub fn linearize(commands: Vec<Command>, old: &Schema, new: &Schema) -> Result<DeltaRoot> {
    let linearizer = Linearizer { old, new };
    Ok(DeltaRoot::from_commands(linearizer.level(commands, None, None)?))
}

/// What one command (with its whole subtree) needs and provides.
#[derive(Debug, Default)]
struct Facts {
    /// New-snapshot objects that exist, or carry their final name, only after
    /// this command.
    introduced: HashSet<ObjectId>,
    /// New-snapshot objects referenced by the values this command sets.
    requires: HashSet<ObjectId>,
    /// Old-snapshot objects this command drops.
    dropped: HashSet<ObjectId>,
    /// Old-snapshot objects this command alters or drops.
    touched: HashSet<ObjectId>,
    /// Old-snapshot objects outside `dropped` that reference `dropped`.
    referrers: HashSet<ObjectId>,
    claims: Vec<Name>,
    frees: Vec<Name>,
    /// Module drops go after every other sibling.
    drops_module: bool,
}

impl Facts {
    fn depends_on(&self, other: &Facts) -> bool {
        self.requires
            .iter()
            .any(|id| !self.introduced.contains(id) && other.introduced.contains(id))
            || self
                .claims
                .iter()
                .any(|n| other.frees.iter().any(|f| n == f || n.is_derived_from(f)))
            || self.referrers.iter().any(|r| other.touched.contains(r))
            || (self.drops_module && !other.drops_module)
    }
}

struct Linearizer<'a> {
    old: &'a Schema,
    new: &'a Schema,
}

impl<'a> Linearizer<'a> {
    fn level(
        &self,
        commands: Vec<Command>,
        old_parent: Option<ObjectId>,
        new_parent: Option<ObjectId>,
    ) -> Result<Vec<Command>> {
        let mut nodes = Vec::with_capacity(commands.len());
        for cmd in commands {
            let (main, drops) = split_drops(cmd);
            nodes.extend(main);
            nodes.extend(drops);
        }

        let mut prepared = Vec::with_capacity(nodes.len());
        for mut cmd in nodes {
            let old_id = self.old_object(&cmd, old_parent).map(|o| o.id);
            let new_id = self.new_object(&cmd, new_parent).map(|o| o.id);
            let subs = std::mem::take(&mut cmd.subcommands);
            cmd.subcommands = self.level(subs, old_id, new_id)?;

            let mut facts = Facts::default();
            self.collect(&cmd, old_parent, new_parent, &mut facts);
            facts.referrers = facts
                .dropped
                .iter()
                .flat_map(|id| self.old.get_referrers(*id))
                .map(|r| r.id)
                .filter(|r| !facts.dropped.contains(r))
                .collect();
            prepared.push((cmd, facts));
        }
        if prepared.len() < 2 {
            return Ok(prepared.into_iter().map(|(cmd, _)| cmd).collect());
        }

        let labels = unique_labels(prepared.iter().map(|(cmd, _)| cmd));
        let mut graph: IndexMap<String, SortNode<String, usize>> = IndexMap::with_capacity(prepared.len());
        for (i, (_, facts)) in prepared.iter().enumerate() {
            let deps = prepared
                .iter()
                .enumerate()
                .filter(|(j, (_, other))| *j != i && facts.depends_on(other))
                .map(|(j, _)| labels[j].clone());
            graph.insert(labels[i].clone(), SortNode::new(i).with_deps(deps));
        }

        let order = sort(graph, SortOptions::default())?;
        let mut slots: Vec<Option<Command>> = prepared.into_iter().map(|(cmd, _)| Some(cmd)).collect();
        Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
    }

    fn old_object(&self, cmd: &Command, parent: Option<ObjectId>) -> Option<&'a SchemaObject> {
        if cmd.action == Action::Create {
            return None;
        }
        child_by_local(self.old, parent, cmd.kind, cmd.classname.local())
            .or_else(|| self.old.lookup(&cmd.classname, Some(cmd.kind)))
    }

    fn new_object(&self, cmd: &Command, parent: Option<ObjectId>) -> Option<&'a SchemaObject> {
        if cmd.action == Action::Delete {
            return None;
        }
        let name = cmd.target_name();
        child_by_local(self.new, parent, cmd.kind, name.local()).or_else(|| self.new.lookup(name, Some(cmd.kind)))
    }

    fn collect(&self, cmd: &Command, old_parent: Option<ObjectId>, new_parent: Option<ObjectId>, facts: &mut Facts) {
        let old_obj = self.old_object(cmd, old_parent);
        let new_obj = self.new_object(cmd, new_parent);

        match cmd.action {
            Action::Create => {
                facts.claims.push(cmd.target_name().clone());
                if let Some(obj) = new_obj {
                    facts.introduced.insert(obj.id);
                    facts
                        .introduced
                        .extend(self.new.descendants(obj.id).iter().map(|d| d.id));
                    facts.requires.extend(self.new.references(obj));
                }
            }
            Action::Alter | Action::Rename => {
                if let Some(obj) = old_obj {
                    facts.touched.insert(obj.id);
                }
                if let Some(obj) = new_obj {
                    for prop in cmd.properties.iter().filter(|p| p.is_applied()) {
                        if let Some(value) = obj.field(&prop.name) {
                            facts.requires.extend(value.references());
                        }
                    }
                }
                if cmd.action == Action::Rename {
                    facts.claims.push(cmd.target_name().clone());
                    facts.frees.push(cmd.classname.clone());
                    if let Some(obj) = old_obj {
                        facts.frees.push(obj.name.clone());
                    }
                    if let Some(obj) = new_obj {
                        facts.introduced.insert(obj.id);
                        facts
                            .introduced
                            .extend(self.new.descendants(obj.id).iter().map(|d| d.id));
                    }
                }
            }
            Action::Delete => {
                facts.drops_module |= cmd.kind == ObjectKind::Module;
                facts.frees.push(cmd.classname.clone());
                if let Some(obj) = old_obj {
                    facts.frees.push(obj.name.clone());
                    let descendants = self.old.descendants(obj.id);
                    let subtree = std::iter::once(obj.id).chain(descendants.iter().map(|d| d.id));
                    for id in subtree {
                        facts.dropped.insert(id);
                        facts.touched.insert(id);
                    }
                }
            }
        }

        for sub in &cmd.subcommands {
            self.collect(sub, old_obj.map(|o| o.id), new_obj.map(|o| o.id), facts);
        }
    }
}

fn child_by_local<'s>(
    schema: &'s Schema,
    parent: Option<ObjectId>,
    kind: ObjectKind,
    local: &str,
) -> Option<&'s SchemaObject> {
    schema
        .children(parent?)
        .into_iter()
        .find(|child| child.kind == kind && child.name.local() == local)
}

/// Split nested drops out of an alter or rename.
///
/// Returns the command without its nested drops (`None` when nothing is
/// left) and an alter of the same object holding only those drops.
fn split_drops(mut cmd: Command) -> (Option<Command>, Option<Command>) {
    if matches!(cmd.action, Action::Create | Action::Delete) {
        return (Some(cmd), None);
    }

    let mut drops = Vec::new();
    for sub in std::mem::take(&mut cmd.subcommands) {
        if sub.action == Action::Delete {
            drops.push(sub);
            continue;
        }
        let (main, nested) = split_drops(sub);
        cmd.subcommands.extend(main);
        drops.extend(nested);
    }

    let drop_part = (!drops.is_empty()).then(|| {
        let mut part = Command::alter(cmd.kind, cmd.classname.clone()).with_confidence(cmd.confidence);
        part.subcommands = drops;
        part
    });
    let keep = cmd.action == Action::Rename
        || cmd.properties.iter().any(|p| p.is_applied())
        || !cmd.subcommands.is_empty();
    (keep.then_some(cmd), drop_part)
}

fn unique_labels<'c>(commands: impl Iterator<Item = &'c Command>) -> Vec<String> {
    let mut seen = HashSet::new();
    commands
        .map(|cmd| {
            let base = format!("{} {} '{}'", cmd.action, cmd.kind, cmd.target_name());
            let mut label = base.clone();
            let mut n = 1;
            while !seen.insert(label.clone()) {
                n += 1;
                label = format!("{base} #{n}");
            }
            label
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AlterProperty;
    use crate::compile::TextCompiler;
    use crate::error::DeltaError;
    use crate::model::{ObjectDocument, PropertyValue, SchemaDocument};

    fn build(doc: SchemaDocument) -> Schema {
        Schema::from_document(&doc, &TextCompiler::default()).unwrap()
    }

    fn base() -> SchemaDocument {
        SchemaDocument::new().with_std().module("default")
    }

    fn names(root: &DeltaRoot) -> Vec<String> {
        root.iter()
            .map(|c| format!("{} {}", c.action, c.target_name()))
            .collect()
    }

    #[test]
    fn test_create_waits_for_referenced_create() {
        let old = build(base());
        let new = build(
            base()
                .object(ObjectDocument::new(ObjectKind::ScalarType, "default::Label").base("std::str"))
                .object(ObjectDocument::new(ObjectKind::ScalarType, "default::Tag").base("default::Label")),
        );
        let commands = vec![
            Command::create(ObjectKind::ScalarType, "default::Tag")
                .with_property(AlterProperty::set("bases", PropertyValue::RefList(vec![Name::from("default::Label")]))),
            Command::create(ObjectKind::ScalarType, "default::Label")
                .with_property(AlterProperty::set("bases", PropertyValue::RefList(vec![Name::from("std::str")]))),
        ];
        let root = linearize(commands, &old, &new).unwrap();
        assert_eq!(names(&root), vec!["create default::Label", "create default::Tag"]);
    }

    #[test]
    fn test_delete_waits_for_referrer_delete() {
        let old = build(
            base()
                .object(ObjectDocument::new(ObjectKind::ScalarType, "default::Label").base("std::str"))
                .object(ObjectDocument::new(ObjectKind::ObjectType, "default::Foo").base("std::Object"))
                .object(
                    ObjectDocument::new(ObjectKind::Property, "default::Foo.bar")
                        .base("std::property")
                        .target("default::Label"),
                ),
        );
        let new = build(base());
        let commands = vec![
            Command::delete(ObjectKind::ScalarType, "default::Label"),
            Command::delete(ObjectKind::ObjectType, "default::Foo"),
        ];
        let root = linearize(commands, &old, &new).unwrap();
        assert_eq!(names(&root), vec!["delete default::Foo", "delete default::Label"]);
    }

    #[test]
    fn test_module_create_first_and_drop_last() {
        let old = build(base().module("legacy").object(ObjectDocument::new(ObjectKind::ScalarType, "legacy::S")));
        let new = build(base().module("shop").object(ObjectDocument::new(ObjectKind::ScalarType, "shop::S")));
        let commands = vec![
            Command::create(ObjectKind::ScalarType, "shop::S"),
            Command::delete(ObjectKind::Module, "legacy"),
            Command::create(ObjectKind::Module, "shop"),
            Command::delete(ObjectKind::ScalarType, "legacy::S"),
        ];
        let root = linearize(commands, &old, &new).unwrap();
        assert_eq!(
            names(&root),
            vec!["create shop", "create shop::S", "delete legacy::S", "delete legacy"]
        );
    }

    #[test]
    fn test_module_drop_follows_unrelated_siblings() {
        let old = build(base().module("legacy"));
        let new = build(base().object(ObjectDocument::new(ObjectKind::ScalarType, "default::Zed")));
        let commands = vec![
            Command::delete(ObjectKind::Module, "legacy"),
            Command::create(ObjectKind::ScalarType, "default::Zed"),
        ];
        let root = linearize(commands, &old, &new).unwrap();
        assert_eq!(names(&root), vec!["create default::Zed", "delete legacy"]);
    }

    #[test]
    fn test_nested_drops_are_split_out() {
        let foo = |props: &[(&str, &str)]| {
            let mut doc = base().object(ObjectDocument::new(ObjectKind::ObjectType, "default::Foo").base("std::Object"));
            for (name, expr) in props {
                doc = doc.object(
                    ObjectDocument::new(ObjectKind::Property, format!("default::Foo.{name}"))
                        .base("std::property")
                        .expr("expr", *expr),
                );
            }
            doc.object(ObjectDocument::new(ObjectKind::ObjectType, "default::Report").base("std::Object"))
        };
        let old = build(foo(&[("a", "1")]).object(
            ObjectDocument::new(ObjectKind::Property, "default::Report.total")
                .base("std::property")
                .expr("expr", "default::Foo.a"),
        ));
        let new = build(foo(&[("b", "2")]).object(
            ObjectDocument::new(ObjectKind::Property, "default::Report.total")
                .base("std::property")
                .expr("expr", "default::Foo.b"),
        ));
        let commands = vec![
            Command::alter(ObjectKind::ObjectType, "default::Foo")
                .with_subcommand(Command::delete(ObjectKind::Property, "default::Foo.a"))
                .with_subcommand(
                    Command::create(ObjectKind::Property, "default::Foo.b")
                        .with_property(AlterProperty::set("expr", PropertyValue::Expr("2".to_string()))),
                ),
            Command::alter(ObjectKind::ObjectType, "default::Report").with_subcommand(
                Command::alter(ObjectKind::Property, "default::Report.total").with_property(AlterProperty::change(
                    "expr",
                    Some(PropertyValue::Expr("default::Foo.a".to_string())),
                    Some(PropertyValue::Expr("default::Foo.b".to_string())),
                )),
            ),
        ];
        let root = linearize(commands, &old, &new).unwrap();
        let outline: Vec<String> = root
            .iter()
            .map(|c| {
                let subs: Vec<String> = c.subcommands.iter().map(|s| format!("{} {}", s.action, s.classname)).collect();
                format!("{} [{}]", c.classname, subs.join(", "))
            })
            .collect();
        assert_eq!(
            outline,
            vec![
                "default::Foo [create default::Foo.b]",
                "default::Report [alter default::Report.total]",
                "default::Foo [delete default::Foo.a]",
            ]
        );
        let applied = root.apply(&old, &TextCompiler::default()).unwrap();
        assert!(applied.get_by_name(&Name::from("default::Foo.a")).is_none());
    }

    #[test]
    fn test_name_swap_is_a_cycle() {
        let pair = || {
            base()
                .object(ObjectDocument::new(ObjectKind::ScalarType, "default::A").base("std::str"))
                .object(ObjectDocument::new(ObjectKind::ScalarType, "default::B").base("std::int64"))
        };
        let (old, new) = (build(pair()), build(pair()));
        let commands = vec![
            Command::rename(ObjectKind::ScalarType, "default::A", "default::B"),
            Command::rename(ObjectKind::ScalarType, "default::B", "default::A"),
        ];
        let err = linearize(commands, &old, &new).unwrap_err();
        assert!(matches!(err, DeltaError::Cycle { .. }), "{err}");
    }
}
