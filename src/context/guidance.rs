//! Bans that steer the next delta run after a human rejects a proposal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::command::{Action, OperationKey};
use crate::model::{Name, ObjectKind};

/// Session-scoped bans on specific delta decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guidance {
    #[serde(default)]
    pub banned_creations: BTreeSet<(ObjectKind, Name)>,
    #[serde(default)]
    pub banned_deletions: BTreeSet<(ObjectKind, Name)>,
    /// `(kind, (old_name, new_name))`
    #[serde(default)]
    pub banned_alters: BTreeSet<(ObjectKind, (Name, Name))>,
}

impl Guidance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.banned_creations.is_empty() && self.banned_deletions.is_empty() && self.banned_alters.is_empty()
    }

    pub fn ban_creation(&mut self, kind: ObjectKind, name: impl Into<Name>) -> &mut Self {
        self.banned_creations.insert((kind, name.into()));
        self
    }

    pub fn ban_deletion(&mut self, kind: ObjectKind, name: impl Into<Name>) -> &mut Self {
        self.banned_deletions.insert((kind, name.into()));
        self
    }

    pub fn ban_alter(&mut self, kind: ObjectKind, old: impl Into<Name>, new: impl Into<Name>) -> &mut Self {
        self.banned_alters.insert((kind, (old.into(), new.into())));
        self
    }

    #[must_use]
    pub fn creation_banned(&self, kind: ObjectKind, name: &Name) -> bool {
        self.banned_creations.contains(&(kind, name.clone()))
    }

    #[must_use]
    pub fn deletion_banned(&self, kind: ObjectKind, name: &Name) -> bool {
        self.banned_deletions.contains(&(kind, name.clone()))
    }

    #[must_use]
    pub fn alter_banned(&self, kind: ObjectKind, old: &Name, new: &Name) -> bool {
        self.banned_alters.contains(&(kind, (old.clone(), new.clone())))
    }

    /// Record that the proposed operation was rejected.
    ///
    /// A rejected create or delete is banned outright. A rejected alter or
    /// rename bans matching that particular pair, so the next run treats the
    /// two objects independently.
    pub fn reject(&mut self, key: &OperationKey) {
        match key.action {
            Action::Create => {
                self.ban_creation(key.kind, key.classname.clone());
            }
            Action::Delete => {
                self.ban_deletion(key.kind, key.classname.clone());
            }
            Action::Alter | Action::Rename => {
                let new = key.new_name.clone().unwrap_or_else(|| key.classname.clone());
                self.ban_alter(key.kind, key.classname.clone(), new);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reject_rename_bans_the_pair() {
        let mut guidance = Guidance::new();
        guidance.reject(&OperationKey {
            action: Action::Rename,
            kind: ObjectKind::Property,
            classname: Name::from("default::Foo.bar"),
            new_name: Some(Name::from("default::Foo.baz")),
        });
        assert!(guidance.alter_banned(
            ObjectKind::Property,
            &Name::from("default::Foo.bar"),
            &Name::from("default::Foo.baz")
        ));
        assert!(guidance.banned_creations.is_empty());
    }

    #[test]
    fn test_reject_create_and_delete() {
        let mut guidance = Guidance::new();
        let name = Name::from("default::Foo");
        guidance.reject(&OperationKey {
            action: Action::Create,
            kind: ObjectKind::ObjectType,
            classname: name.clone(),
            new_name: None,
        });
        guidance.reject(&OperationKey {
            action: Action::Delete,
            kind: ObjectKind::ObjectType,
            classname: name.clone(),
            new_name: None,
        });
        assert!(guidance.creation_banned(ObjectKind::ObjectType, &name));
        assert!(guidance.deletion_banned(ObjectKind::ObjectType, &name));
    }

    #[test]
    fn test_guidance_serde_round_trip() {
        let mut guidance = Guidance::new();
        guidance
            .ban_alter(ObjectKind::Property, "default::Foo.bar", "default::Foo.baz")
            .ban_creation(ObjectKind::ScalarType, "default::S");
        let json = serde_json::to_string(&guidance).unwrap();
        let back: Guidance = serde_json::from_str(&json).unwrap();
        assert_eq!(back, guidance);

        let yaml = serde_yaml::to_string(&guidance).unwrap();
        let back: Guidance = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, guidance);
    }
}
