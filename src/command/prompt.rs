//! Migration prompts: turning commands into yes/no questions.

use serde::{Deserialize, Serialize};

use super::{Action, Command, DeltaRoot};
use crate::model::{Name, ObjectKind};

/// Fields whose change can lose or reject existing data.
const UNSAFE_FIELDS: &[&str] = &["target", "cardinality", "required"];

/// Identifies a proposed operation, so that a rejection can be fed back as
/// guidance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey {
    pub action: Action,
    pub kind: ObjectKind,
    pub classname: Name,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_name: Option<Name>,
}

/// One question for a human reviewing a delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedStep {
    pub prompt: String,
    pub confidence: f64,
    pub operation_key: OperationKey,
    /// False when applying the step may drop or invalidate stored data.
    pub data_safe: bool,
}

impl Command {
    #[must_use]
    pub fn operation_key(&self) -> OperationKey {
        OperationKey {
            action: self.action,
            kind: self.kind,
            classname: self.classname.clone(),
            new_name: self.new_name.clone(),
        }
    }

    #[must_use]
    pub fn user_prompt(&self) -> String {
        match self.action {
            Action::Create => format!("did you create {} '{}'?", self.kind, self.classname),
            Action::Alter => {
                let changed: Vec<&str> = self
                    .properties
                    .iter()
                    .filter(|p| p.is_applied())
                    .map(|p| p.name.as_str())
                    .collect();
                if changed.is_empty() {
                    format!("did you alter {} '{}'?", self.kind, self.classname)
                } else {
                    format!(
                        "did you alter {} '{}' ({})?",
                        self.kind,
                        self.classname,
                        changed.join(", ")
                    )
                }
            }
            Action::Rename => format!(
                "did you rename {} '{}' to '{}'?",
                self.kind,
                self.classname,
                self.target_name()
            ),
            Action::Delete => format!("did you drop {} '{}'?", self.kind, self.classname),
        }
    }

    /// Whether the step can run without touching existing data.
    #[must_use]
    pub fn is_data_safe(&self) -> bool {
        match self.action {
            Action::Delete => !self.kind.is_data_bearing(),
            Action::Create => true,
            Action::Alter | Action::Rename => !self
                .properties
                .iter()
                .any(|p| p.is_applied() && UNSAFE_FIELDS.contains(&p.name.as_str())),
        }
    }

    /// A command worth asking about: anything but an alter that only
    /// carries nested changes.
    fn is_prompted(&self) -> bool {
        !(self.action == Action::Alter && self.properties.iter().all(|p| !p.is_applied()))
    }
}

impl DeltaRoot {
    /// Questions for every decision in the tree.
    ///
    /// Nested creates and drops belong to their owner's step; nested alters
    /// and renames get their own.
    #[must_use]
    pub fn proposed_steps(&self) -> Vec<ProposedStep> {
        let mut steps = Vec::new();
        let mut stack: Vec<&Command> = self.commands.iter().rev().collect();
        while let Some(cmd) = stack.pop() {
            if cmd.is_prompted() {
                steps.push(ProposedStep {
                    prompt: cmd.user_prompt(),
                    confidence: cmd.confidence,
                    operation_key: cmd.operation_key(),
                    data_safe: cmd.is_data_safe(),
                });
            }
            if matches!(cmd.action, Action::Alter | Action::Rename) {
                stack.extend(cmd.subcommands.iter().rev());
            }
        }
        steps
    }

    /// Lowest confidence among the proposed steps.
    #[must_use]
    pub fn min_confidence(&self) -> Option<f64> {
        self.proposed_steps()
            .iter()
            .map(|s| s.confidence)
            .min_by(f64::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::AlterProperty;
    use crate::model::PropertyValue;

    fn tree() -> DeltaRoot {
        DeltaRoot::from_commands(vec![
            Command::alter(ObjectKind::ObjectType, "default::Foo").with_subcommand(
                Command::rename(ObjectKind::Property, "default::Foo.bar", "default::Foo.baz").with_confidence(0.81),
            ),
            Command::create(ObjectKind::ObjectType, "default::User")
                .with_subcommand(Command::create(ObjectKind::Property, "default::User.email")),
            Command::alter(ObjectKind::Property, "default::Foo.qux").with_property(AlterProperty::change(
                "required",
                Some(PropertyValue::Bool(false)),
                Some(PropertyValue::Bool(true)),
            )),
            Command::delete(ObjectKind::ObjectType, "default::Old"),
        ])
    }

    #[test]
    fn test_proposed_steps() {
        let steps = tree().proposed_steps();
        let prompts: Vec<&str> = steps.iter().map(|s| s.prompt.as_str()).collect();
        insta::assert_debug_snapshot!(prompts, @r###"
        [
            "did you rename property 'default::Foo.bar' to 'default::Foo.baz'?",
            "did you create object type 'default::User'?",
            "did you alter property 'default::Foo.qux' (required)?",
            "did you drop object type 'default::Old'?",
        ]
        "###);
        let safety: Vec<bool> = steps.iter().map(|s| s.data_safe).collect();
        assert_eq!(safety, vec![true, true, false, false]);
    }

    #[test]
    fn test_min_confidence() {
        assert_eq!(tree().min_confidence(), Some(0.81));
        assert_eq!(DeltaRoot::new().min_confidence(), None);
    }

    #[test]
    fn test_operation_key_round_trips() {
        let key = Command::rename(ObjectKind::Property, "default::Foo.bar", "default::Foo.baz").operation_key();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(serde_json::from_str::<OperationKey>(&json).unwrap(), key);
    }
}
