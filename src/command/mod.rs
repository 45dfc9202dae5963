//! The command tree.
//!
//! A delta is a [`DeltaRoot`] holding an ordered list of [`Command`]s. Each
//! command targets one object by name and carries the attribute changes to
//! make to it ([`AlterProperty`]) plus nested commands for the objects it
//! owns. The tree is what downstream code generators walk; it is already a
//! valid linearization, so consumers only have to visit it in order.
//!
//! Commands are plain data: they serialize to JSON, can be stored, and are
//! replayed with [`DeltaRoot::apply`].

mod apply;
mod display;
mod prompt;

pub use prompt::{OperationKey, ProposedStep};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;
use crate::model::{Name, ObjectKind, PropertyValue};

/// What a command does to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Alter,
    Rename,
    Delete,
}

impl Action {
    /// DDL keyword used by the textual dump.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Alter => "ALTER",
            Self::Rename => "RENAME",
            Self::Delete => "DROP",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::Alter => "alter",
            Self::Rename => "rename",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// One attribute change. `new_value: None` unsets the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<PropertyValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<PropertyValue>,
    /// The value comes from a base rather than being declared; informational.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub inherited: bool,
    /// The field is derived from other fields.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub computed: bool,
}

impl AlterProperty {
    /// Set `name` to `value` on an object that did not have it.
    pub fn set(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            old_value: None,
            new_value: Some(value),
            inherited: false,
            computed: false,
        }
    }

    pub fn change(name: impl Into<String>, old: Option<PropertyValue>, new: Option<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            old_value: old,
            new_value: new,
            inherited: false,
            computed: false,
        }
    }

    #[must_use]
    pub fn inherited(mut self, inherited: bool) -> Self {
        self.inherited = inherited;
        self
    }

    #[must_use]
    pub fn computed(mut self, computed: bool) -> Self {
        self.computed = computed;
        self
    }

    /// Whether `apply` acts on this property. Identity and inherited values
    /// are carried for consumers only.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !self.inherited && self.name != "id"
    }
}

const fn full_confidence() -> f64 {
    1.0
}

/// A node of the command tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Command {
    pub action: Action,
    pub kind: ObjectKind,
    /// Name of the target as the snapshot knows it when the command runs.
    pub classname: Name,
    /// Rename target; only set on [`Action::Rename`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<Name>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<AlterProperty>,
    /// Commands for owned children, applied after this one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<Command>,
    /// Match certainty in [0, 1]. Metadata only; `apply` ignores it.
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

impl Command {
    fn new(action: Action, kind: ObjectKind, classname: Name) -> Self {
        Self {
            action,
            kind,
            classname,
            new_name: None,
            properties: Vec::new(),
            subcommands: Vec::new(),
            confidence: 1.0,
        }
    }

    pub fn create(kind: ObjectKind, name: impl Into<Name>) -> Self {
        Self::new(Action::Create, kind, name.into())
    }

    pub fn alter(kind: ObjectKind, name: impl Into<Name>) -> Self {
        Self::new(Action::Alter, kind, name.into())
    }

    pub fn rename(kind: ObjectKind, old: impl Into<Name>, new: impl Into<Name>) -> Self {
        let mut cmd = Self::new(Action::Rename, kind, old.into());
        cmd.new_name = Some(new.into());
        cmd
    }

    pub fn delete(kind: ObjectKind, name: impl Into<Name>) -> Self {
        Self::new(Action::Delete, kind, name.into())
    }

    pub fn with_property(mut self, property: AlterProperty) -> Self {
        self.properties.push(property);
        self
    }

    pub fn with_subcommand(mut self, command: Command) -> Self {
        self.subcommands.push(command);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Name of the target once this command has run.
    #[must_use]
    pub fn target_name(&self) -> &Name {
        self.new_name.as_ref().unwrap_or(&self.classname)
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&AlterProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Lower the confidence of this command and all nested ones to `cap`.
    pub fn cap_confidence(&mut self, cap: f64) {
        self.confidence = self.confidence.min(cap);
        for sub in &mut self.subcommands {
            sub.cap_confidence(cap);
        }
    }

    /// Pre-order walk over this command and its subcommands.
    pub fn walk(&self) -> impl Iterator<Item = &Command> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.subcommands.iter().rev());
            Some(next)
        })
    }
}

/// Counts of commands by action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSummary {
    pub creates: usize,
    pub alters: usize,
    pub renames: usize,
    pub deletes: usize,
}

impl DeltaSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.creates + self.alters + self.renames + self.deletes
    }
}

impl fmt::Display for DeltaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} create, {} alter, {} rename, {} drop",
            self.creates, self.alters, self.renames, self.deletes
        )
    }
}

/// Root of a command tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct DeltaRoot {
    #[serde(default)]
    pub commands: Vec<Command>,
}

impl DeltaRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn extend(&mut self, other: DeltaRoot) {
        self.commands.extend(other.commands);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Every command in the tree, pre-order.
    pub fn walk(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().flat_map(Command::walk)
    }

    /// Command counts over the whole tree. Alters that only carry nested
    /// changes are not counted.
    pub fn summary(&self) -> DeltaSummary {
        let mut summary = DeltaSummary::default();
        for cmd in self.walk() {
            match cmd.action {
                Action::Create => summary.creates += 1,
                Action::Alter if !cmd.properties.is_empty() => summary.alters += 1,
                Action::Alter => {}
                Action::Rename => summary.renames += 1,
                Action::Delete => summary.deletes += 1,
            }
        }
        summary
    }

    /// Find the first command targeting `name` anywhere in the tree.
    #[must_use]
    pub fn find(&self, name: &Name) -> Option<&Command> {
        self.walk().find(|c| &c.classname == name || c.new_name.as_ref() == Some(name))
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }
}

impl<'a> IntoIterator for &'a DeltaRoot {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeltaRoot {
        DeltaRoot::from_commands(vec![
            Command::alter(ObjectKind::ObjectType, "default::Foo")
                .with_subcommand(Command::rename(ObjectKind::Property, "default::Foo.bar", "default::Foo.baz"))
                .with_subcommand(
                    Command::create(ObjectKind::Property, "default::Foo.qux")
                        .with_property(AlterProperty::set("target", PropertyValue::Ref(Name::from("std::str")))),
                ),
            Command::delete(ObjectKind::ScalarType, "default::S"),
        ])
    }

    #[test]
    fn test_walk_is_pre_order() {
        let names: Vec<String> = sample().walk().map(|c| c.classname.to_string()).collect();
        assert_eq!(
            names,
            vec!["default::Foo", "default::Foo.bar", "default::Foo.qux", "default::S"]
        );
    }

    #[test]
    fn test_summary_skips_container_alters() {
        let summary = sample().summary();
        assert_eq!(
            summary,
            DeltaSummary {
                creates: 1,
                alters: 0,
                renames: 1,
                deletes: 1
            }
        );
        assert_eq!(summary.total(), 3);
    }

    #[test]
    fn test_cap_confidence_is_recursive() {
        let mut cmd = Command::alter(ObjectKind::ObjectType, "default::Foo")
            .with_subcommand(Command::delete(ObjectKind::Property, "default::Foo.bar"));
        cmd.cap_confidence(0.7);
        assert!(cmd.walk().all(|c| (c.confidence - 0.7).abs() < f64::EPSILON));
    }

    #[test]
    fn test_json_round_trip_defaults_confidence() {
        let json = r#"{"commands":[{"action":"delete","kind":"scalar_type","classname":"default::S"}]}"#;
        let root = DeltaRoot::from_json_str(json).unwrap();
        assert_eq!(root.commands[0].confidence, 1.0);
        let back = DeltaRoot::from_json_str(&root.to_json_string().unwrap()).unwrap();
        assert_eq!(back, root);
    }

    #[test]
    fn test_find_by_either_name() {
        let root = sample();
        assert!(root.find(&Name::from("default::Foo.baz")).is_some());
        assert!(root.find(&Name::from("default::Nope")).is_none());
    }
}
