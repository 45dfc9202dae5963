//! Which objects a delta run considers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Name, ObjectKind, SchemaObject};

/// Modules that belong to the system rather than the user schema.
pub const STD_MODULES: &[&str] = &["std", "schema", "sys", "cfg", "math"];

/// Module and item selection for a delta run.
///
/// Only top-level objects are filtered; owned children follow their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ObjectFilter {
    /// Only consider these modules (empty = all).
    pub include_modules: Vec<String>,
    pub exclude_modules: Vec<String>,
    /// Only consider these qualified names (empty = all).
    pub include_items: Vec<String>,
    pub exclude_items: Vec<String>,
    /// Diff the system modules too.
    pub include_std: bool,
    /// Emit module creates and drops.
    pub include_module_diff: bool,
}

impl Default for ObjectFilter {
    fn default() -> Self {
        Self {
            include_modules: Vec::new(),
            exclude_modules: Vec::new(),
            include_items: Vec::new(),
            exclude_items: Vec::new(),
            include_std: false,
            include_module_diff: true,
        }
    }
}

impl ObjectFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn include_module(mut self, module: impl Into<String>) -> Self {
        self.include_modules.push(module.into());
        self
    }

    #[must_use]
    pub fn exclude_module(mut self, module: impl Into<String>) -> Self {
        self.exclude_modules.push(module.into());
        self
    }

    #[must_use]
    pub fn exclude_item(mut self, name: impl Into<String>) -> Self {
        self.exclude_items.push(name.into());
        self
    }

    #[must_use]
    pub const fn with_std(mut self, include: bool) -> Self {
        self.include_std = include;
        self
    }

    #[must_use]
    pub const fn with_module_diff(mut self, include: bool) -> Self {
        self.include_module_diff = include;
        self
    }

    /// Whether objects of `kind` are diffed at all.
    #[must_use]
    pub fn accepts_kind(&self, kind: ObjectKind) -> bool {
        kind != ObjectKind::Module || self.include_module_diff
    }

    #[must_use]
    pub fn accepts(&self, obj: &SchemaObject) -> bool {
        self.accepts_name(obj.kind, &obj.name)
    }

    /// Like [`accepts`](Self::accepts), by name. Derived names are judged by
    /// their top-level owner.
    #[must_use]
    pub fn accepts_name(&self, kind: ObjectKind, name: &Name) -> bool {
        let top = name.owners().last().unwrap_or_else(|| name.clone());
        let module = if kind == ObjectKind::Module {
            Some(top.as_str())
        } else {
            top.module()
        };

        if let Some(module) = module {
            if !self.include_std && STD_MODULES.contains(&module) {
                return false;
            }
            if !self.include_modules.is_empty() && !self.include_modules.iter().any(|m| m == module) {
                return false;
            }
            if self.exclude_modules.iter().any(|m| m == module) {
                return false;
            }
        }

        if kind == ObjectKind::Module {
            return true;
        }
        let top = top.as_str();
        if !self.include_items.is_empty() && !self.include_items.iter().any(|i| i == top) {
            return false;
        }
        !self.exclude_items.iter().any(|i| i == top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectId;

    fn obj(kind: ObjectKind, name: &str) -> SchemaObject {
        SchemaObject::new(ObjectId::new(), name, kind)
    }

    #[test]
    fn test_std_is_skipped_by_default() {
        let filter = ObjectFilter::default();
        assert!(!filter.accepts(&obj(ObjectKind::ScalarType, "std::str")));
        assert!(!filter.accepts(&obj(ObjectKind::Module, "std")));
        assert!(filter.accepts(&obj(ObjectKind::ScalarType, "default::S")));
        assert!(ObjectFilter::new().with_std(true).accepts(&obj(ObjectKind::Module, "std")));
    }

    #[test]
    fn test_module_and_item_rules() {
        let filter = ObjectFilter::new().include_module("shop").exclude_item("shop::Legacy");
        assert!(filter.accepts(&obj(ObjectKind::ObjectType, "shop::Order")));
        assert!(!filter.accepts(&obj(ObjectKind::ObjectType, "shop::Legacy")));
        assert!(!filter.accepts(&obj(ObjectKind::ObjectType, "default::User")));
        assert!(filter.accepts(&obj(ObjectKind::Module, "shop")));
    }

    #[test]
    fn test_children_follow_top_level_owner() {
        let filter = ObjectFilter::new().exclude_item("shop::Legacy");
        assert!(!filter.accepts_name(ObjectKind::Property, &Name::from("shop::Legacy.code")));
        assert!(filter.accepts_name(ObjectKind::Property, &Name::from("shop::Order.total")));
        assert!(!filter.accepts_name(ObjectKind::Property, &Name::from("std::Object.id")));
    }

    #[test]
    fn test_module_diff_toggle() {
        assert!(ObjectFilter::default().accepts_kind(ObjectKind::Module));
        assert!(!ObjectFilter::new().with_module_diff(false).accepts_kind(ObjectKind::Module));
        assert!(ObjectFilter::new().with_module_diff(false).accepts_kind(ObjectKind::Link));
    }
}
