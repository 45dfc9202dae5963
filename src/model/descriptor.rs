//! Immutable per-kind metadata: which fields exist, how they compare and
//! which child collections ("refdicts") an object owns.
//!
//! The table is a `static` built at compile time and never mutated, so it is
//! safe to consult from any thread.

use super::kind::ObjectKind;

/// Similarity weight applied when two names differ.
pub const NAME_COMPCOEF: f64 = 0.670;

/// Storage type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int,
    Str,
    StrList,
    Expr,
    Ref,
    RefList,
    RefSet,
}

impl FieldType {
    /// Whether values of this type hold object references.
    #[must_use]
    pub const fn is_reference(self) -> bool {
        matches!(self, Self::Ref | Self::RefList | Self::RefSet | Self::Expr)
    }
}

/// Metadata for one kind-specific field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Similarity factor when values differ; 0.0 means changes never
    /// affect similarity.
    pub compcoef: f64,
    /// A differing value disqualifies the pair outright.
    pub identity: bool,
    /// References through this field never block a delete.
    pub weak: bool,
    /// The value propagates from bases when not set explicitly.
    pub inheritable: bool,
    /// The value is derived from other fields rather than declared.
    pub computed: bool,
}

impl FieldSpec {
    const fn new(name: &'static str, ty: FieldType, compcoef: f64) -> Self {
        Self {
            name,
            ty,
            compcoef,
            identity: false,
            weak: false,
            inheritable: false,
            computed: false,
        }
    }

    const fn identity(mut self) -> Self {
        self.identity = true;
        self
    }

    const fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    const fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }
}

/// A named ownership relation from a parent to a collection of children.
#[derive(Debug, Clone, Copy)]
pub struct RefDict {
    pub attr: &'static str,
    pub kinds: &'static [ObjectKind],
    pub compcoef: f64,
}

/// Everything the engine needs to know about one object kind.
#[derive(Debug)]
pub struct KindDescriptor {
    pub kind: ObjectKind,
    pub inheriting: bool,
    pub fields: &'static [FieldSpec],
    pub refdicts: &'static [RefDict],
}

impl KindDescriptor {
    /// Look up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The refdict that holds children of `child` kind, if any.
    #[must_use]
    pub fn refdict_for(&self, child: ObjectKind) -> Option<&'static RefDict> {
        self.refdicts.iter().find(|r| r.kinds.contains(&child))
    }
}

// ============================================================================
// Field tables
// ============================================================================

const BASES: FieldSpec = FieldSpec::new("bases", FieldType::RefList, 0.714);
const IS_ABSTRACT: FieldSpec = FieldSpec::new("is_abstract", FieldType::Bool, 0.909);
const IS_FINAL: FieldSpec = FieldSpec::new("is_final", FieldType::Bool, 0.909);

const CONSTRAINTS: RefDict = RefDict {
    attr: "constraints",
    kinds: &[ObjectKind::Constraint],
    compcoef: 0.887,
};

const ANNOTATION_FIELDS: &[FieldSpec] =
    &[FieldSpec::new("inheritable", FieldType::Bool, 0.2)];

const FUNCTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("params", FieldType::StrList, 0.4).identity(),
    FieldSpec::new("return_type", FieldType::Ref, 0.2),
    FieldSpec::new("body", FieldType::Expr, 0.4),
    FieldSpec::new("volatility", FieldType::Str, 0.4),
];

const CONSTRAINT_FIELDS: &[FieldSpec] = &[
    BASES,
    IS_ABSTRACT,
    FieldSpec::new("expr", FieldType::Expr, 0.909).inheritable(),
    FieldSpec::new("subjectexpr", FieldType::Expr, 0.833),
    FieldSpec::new("finalexpr", FieldType::Expr, 0.909)
        .computed()
        .weak(),
    FieldSpec::new("params", FieldType::StrList, 0.875),
    FieldSpec::new("delegated", FieldType::Bool, 0.9),
    FieldSpec::new("errmessage", FieldType::Str, 0.971).inheritable(),
];

const SCALAR_FIELDS: &[FieldSpec] = &[
    BASES,
    IS_ABSTRACT,
    IS_FINAL,
    FieldSpec::new("default", FieldType::Expr, 0.909).inheritable(),
    FieldSpec::new("enum_values", FieldType::StrList, 0.8),
];

const PROPERTY_FIELDS: &[FieldSpec] = &[
    BASES,
    IS_ABSTRACT,
    FieldSpec::new("target", FieldType::Ref, 0.833).inheritable(),
    FieldSpec::new("required", FieldType::Bool, 0.909).inheritable(),
    FieldSpec::new("readonly", FieldType::Bool, 0.909).inheritable(),
    FieldSpec::new("cardinality", FieldType::Str, 0.833).inheritable(),
    FieldSpec::new("default", FieldType::Expr, 0.909).inheritable(),
    FieldSpec::new("expr", FieldType::Expr, 0.909),
];

const LINK_FIELDS: &[FieldSpec] = &[
    BASES,
    IS_ABSTRACT,
    FieldSpec::new("target", FieldType::Ref, 0.833).inheritable(),
    FieldSpec::new("required", FieldType::Bool, 0.909).inheritable(),
    FieldSpec::new("readonly", FieldType::Bool, 0.909).inheritable(),
    FieldSpec::new("cardinality", FieldType::Str, 0.833).inheritable(),
    FieldSpec::new("default", FieldType::Expr, 0.909).inheritable(),
    FieldSpec::new("expr", FieldType::Expr, 0.909),
    FieldSpec::new("on_target_delete", FieldType::Str, 0.9).inheritable(),
];

const OBJECT_TYPE_FIELDS: &[FieldSpec] = &[BASES, IS_ABSTRACT, IS_FINAL];

const INDEX_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("expr", FieldType::Expr, 0.909),
    FieldSpec::new("except_expr", FieldType::Expr, 0.909),
];

// ============================================================================
// Registry
// ============================================================================

static DESCRIPTORS: [KindDescriptor; 9] = [
    KindDescriptor {
        kind: ObjectKind::Module,
        inheriting: false,
        fields: &[],
        refdicts: &[],
    },
    KindDescriptor {
        kind: ObjectKind::Annotation,
        inheriting: false,
        fields: ANNOTATION_FIELDS,
        refdicts: &[],
    },
    KindDescriptor {
        kind: ObjectKind::Function,
        inheriting: false,
        fields: FUNCTION_FIELDS,
        refdicts: &[],
    },
    KindDescriptor {
        kind: ObjectKind::Constraint,
        inheriting: true,
        fields: CONSTRAINT_FIELDS,
        refdicts: &[],
    },
    KindDescriptor {
        kind: ObjectKind::ScalarType,
        inheriting: true,
        fields: SCALAR_FIELDS,
        refdicts: &[CONSTRAINTS],
    },
    KindDescriptor {
        kind: ObjectKind::Property,
        inheriting: true,
        fields: PROPERTY_FIELDS,
        refdicts: &[CONSTRAINTS],
    },
    KindDescriptor {
        kind: ObjectKind::Link,
        inheriting: true,
        fields: LINK_FIELDS,
        refdicts: &[
            RefDict {
                attr: "properties",
                kinds: &[ObjectKind::Property],
                compcoef: 0.857,
            },
            CONSTRAINTS,
        ],
    },
    KindDescriptor {
        kind: ObjectKind::ObjectType,
        inheriting: true,
        fields: OBJECT_TYPE_FIELDS,
        refdicts: &[
            RefDict {
                attr: "pointers",
                kinds: &[ObjectKind::Property, ObjectKind::Link],
                compcoef: 0.857,
            },
            CONSTRAINTS,
            RefDict {
                attr: "indexes",
                kinds: &[ObjectKind::Index],
                compcoef: 0.909,
            },
        ],
    },
    KindDescriptor {
        kind: ObjectKind::Index,
        inheriting: false,
        fields: INDEX_FIELDS,
        refdicts: &[],
    },
];

pub(crate) fn descriptor(kind: ObjectKind) -> &'static KindDescriptor {
    match kind {
        ObjectKind::Module => &DESCRIPTORS[0],
        ObjectKind::Annotation => &DESCRIPTORS[1],
        ObjectKind::Function => &DESCRIPTORS[2],
        ObjectKind::Constraint => &DESCRIPTORS[3],
        ObjectKind::ScalarType => &DESCRIPTORS[4],
        ObjectKind::Property => &DESCRIPTORS[5],
        ObjectKind::Link => &DESCRIPTORS[6],
        ObjectKind::ObjectType => &DESCRIPTORS[7],
        ObjectKind::Index => &DESCRIPTORS[8],
    }
}
