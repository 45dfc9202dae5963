//! Unified error types for schema-delta.
//!
//! Sorting failures ([`DeltaError::UnresolvedReference`], [`DeltaError::Cycle`])
//! are top-level variants because callers match on them directly. Everything
//! raised while applying commands or validating snapshots is a
//! [`SchemaErrorKind`] wrapped with a context chain.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for schema-delta operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeltaError {
    /// A sort graph edge points at a key that is not part of the graph
    #[error("unresolved reference: {node} depends on {reference}, which is not in the graph")]
    UnresolvedReference { node: String, reference: String },

    /// A genuine cycle in dependency or inheritance edges
    #[error("dependency cycle detected involving {node}")]
    Cycle { node: String },

    /// Schema integrity errors, mostly raised by `apply`
    #[error("schema error: {context}")]
    Schema {
        context: String,
        #[source]
        source: SchemaErrorKind,
    },

    /// Expression compilation failures reported by the compiler capability
    #[error("cannot compile expression `{expression}`: {message}")]
    Compile { expression: String, message: String },

    /// Errors reading or decoding snapshot, delta and guidance documents
    #[error("failed to load document: {context}")]
    Document {
        context: String,
        #[source]
        source: DocumentErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific schema error kinds
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SchemaErrorKind {
    #[error("cannot drop {object} because other objects in the schema depend on it ({})", dependency_details(.object, .referrers))]
    DependencyViolation {
        object: String,
        referrers: Vec<String>,
    },

    #[error("{kind} '{name}' already exists")]
    DuplicateObject { kind: String, name: String },

    #[error("object id {id} is already in use")]
    DuplicateId { id: String },

    #[error("{kind} '{name}' does not exist")]
    ObjectNotFound { kind: String, name: String },

    #[error("'{name}' is a {found}, expected a {expected}")]
    KindMismatch {
        name: String,
        expected: String,
        found: String,
    },

    #[error("reference to unknown object '{name}'")]
    UnresolvedName { name: String },

    #[error("{kind} has no field '{field}'")]
    UnknownField { kind: String, field: String },

    #[error("invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("invalid owner for '{name}': {reason}")]
    InvalidOwner { name: String, reason: String },

    #[error("inconsistent base ordering for '{name}'")]
    InconsistentHierarchy { name: String },

    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

impl SchemaErrorKind {
    /// Per-referrer detail lines for a dependency violation.
    #[must_use]
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::DependencyViolation { object, referrers } => referrers
                .iter()
                .map(|r| format!("{r} depends on {object}"))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn dependency_details(object: &str, referrers: &[String]) -> String {
    referrers
        .iter()
        .map(|r| format!("{r} depends on {object}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Specific document error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DocumentErrorKind {
    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Invalid YAML structure: {0}")]
    InvalidYaml(String),

    #[error("Unsupported document extension: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for schema-delta operations
pub type Result<T> = std::result::Result<T, DeltaError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl DeltaError {
    /// Create a schema error with context
    pub fn schema(context: impl Into<String>, source: SchemaErrorKind) -> Self {
        Self::Schema {
            context: context.into(),
            source,
        }
    }

    /// Create a cycle error naming one node of the cycle
    pub fn cycle(node: impl Into<String>) -> Self {
        Self::Cycle { node: node.into() }
    }

    /// Create an unresolved-reference error for a sort graph edge
    pub fn unresolved(node: impl Into<String>, reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            node: node.into(),
            reference: reference.into(),
        }
    }

    /// Create a compile error
    pub fn compile(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compile {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create a document error with context
    pub fn document(context: impl Into<String>, source: DocumentErrorKind) -> Self {
        Self::Document {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The schema error kind, if this is a schema error.
    #[must_use]
    pub fn schema_kind(&self) -> Option<&SchemaErrorKind> {
        match self {
            Self::Schema { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for DeltaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DeltaError {
    fn from(err: serde_json::Error) -> Self {
        Self::document(
            "JSON deserialization",
            DocumentErrorKind::InvalidJson(err.to_string()),
        )
    }
}

impl From<serde_yaml::Error> for DeltaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::document(
            "YAML deserialization",
            DocumentErrorKind::InvalidYaml(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The context string is prepended to the error's existing context,
/// creating a chain that shows the path through the code.
///
/// # Example
///
/// ```ignore
/// use schema_delta::error::ErrorContext;
///
/// fn load(path: &Path) -> Result<Schema> {
///     let doc = SchemaDocument::load(path)
///         .with_context(|| format!("loading snapshot {}", path.display()))?;
///     Schema::from_document(&doc, &TextCompiler::default())
///         .context("building snapshot")
/// }
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<DeltaError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
///
/// Sort errors carry no context: the offending node is the whole message.
fn add_context_to_error(err: DeltaError, new_ctx: &str) -> DeltaError {
    match err {
        DeltaError::Schema {
            context: existing,
            source,
        } => DeltaError::Schema {
            context: chain_context(new_ctx, &existing),
            source,
        },
        DeltaError::Document {
            context: existing,
            source,
        } => DeltaError::Document {
            context: chain_context(new_ctx, &existing),
            source,
        },
        DeltaError::Io {
            path,
            message,
            source,
        } => DeltaError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        DeltaError::Config(msg) => DeltaError::Config(chain_context(new_ctx, &msg)),
        DeltaError::Validation(msg) => DeltaError::Validation(chain_context(new_ctx, &msg)),
        other => other,
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to an error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| DeltaError::Validation(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| DeltaError::Validation(f().into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_violation_names_referrers() {
        let err = DeltaError::schema(
            "applying delete",
            SchemaErrorKind::DependencyViolation {
                object: "scalar type 'default::X'".to_string(),
                referrers: vec!["property 'default::Y.x'".to_string()],
            },
        );
        let display = err.to_string();
        assert!(display.contains("applying delete"), "{display}");

        let kind = err.schema_kind().expect("schema error");
        let detail = kind.to_string();
        assert!(
            detail.contains("cannot drop scalar type 'default::X'"),
            "{detail}"
        );
        assert!(
            detail.contains("property 'default::Y.x' depends on scalar type 'default::X'"),
            "{detail}"
        );
        assert_eq!(kind.details().len(), 1);
    }

    #[test]
    fn test_cycle_display_names_node() {
        let err = DeltaError::cycle("A");
        assert!(err.to_string().contains('A'));
    }

    #[test]
    fn test_error_chain() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = DeltaError::io("/path/to/schema.json", io_err);

        assert!(err.to_string().contains("/path/to/schema.json"));
    }

    #[test]
    fn test_context_chaining_multiple_levels() {
        fn inner() -> Result<()> {
            Err(DeltaError::schema(
                "base",
                SchemaErrorKind::InvalidCommand("bad".to_string()),
            ))
        }

        fn middle() -> Result<()> {
            inner().context("middle layer")
        }

        fn outer() -> Result<()> {
            middle().context("outer layer")
        }

        match outer() {
            Err(DeltaError::Schema { context, .. }) => {
                assert_eq!(context, "outer layer: middle layer: base");
            }
            other => panic!("Expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_context_leaves_sort_errors_alone() {
        let result: Result<()> = Err(DeltaError::cycle("A"));
        match result.context("sorting") {
            Err(DeltaError::Cycle { node }) => assert_eq!(node, "A"),
            other => panic!("Expected Cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_with_context_lazy_evaluation() {
        let mut called = false;

        let ok_result: Result<i32> = Ok(42);
        let _ = ok_result.with_context(|| {
            called = true;
            "should not be called"
        });
        assert!(!called, "Closure should not be called for Ok result");

        let err_result: Result<i32> = Err(DeltaError::validation("error"));
        let _ = err_result.with_context(|| {
            called = true;
            "should be called"
        });
        assert!(called, "Closure should be called for Err result");
    }

    #[test]
    fn test_option_context() {
        let some_value: Option<i32> = Some(42);
        assert_eq!(some_value.context_none("missing value").unwrap(), 42);

        let none_value: Option<i32> = None;
        match none_value.context_none("missing value") {
            Err(DeltaError::Validation(msg)) => assert_eq!(msg, "missing value"),
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_chain_context_helper() {
        assert_eq!(chain_context("new", ""), "new");
        assert_eq!(chain_context("new", "existing"), "new: existing");
    }
}
