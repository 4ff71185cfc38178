//! Errors raised while loading a graph configuration.

use thiserror::Error;

/// Errors that can occur during graph construction.
///
/// All of these are load-time failures: the loader aborts on the first one
/// and no partial graph is ever exposed. Steady-state ticking never errors.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The root configuration file cannot be read.
    #[error("Root file not found: {0}")]
    RootFileNotFound(String),

    /// An included configuration file cannot be read.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// A path contains an unrecognized substitution directive.
    #[error("Unknown substitution: $({0})")]
    UnknownSubstitution(String),

    /// A node's `type` has no registered combinator.
    #[error("Unknown logic type: {0}")]
    UnknownLogic(String),

    /// A configuration field has the wrong shape.
    #[error("Invalid type for field '{field}': expected {expected}")]
    InvalidType {
        field: String,
        expected: &'static str,
    },

    /// A required configuration field is absent.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// Two nodes declare the same path (or two leaves the same name).
    #[error("Path conflict: {0}")]
    PathConflict(String),

    /// A reference names a path/name with no matching declaration.
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// The dependency relation contains a cycle.
    #[error("Unit loop found involving: {0}")]
    UnitLoopFound(String),
}

impl LoadError {
    /// Shorthand for [`LoadError::InvalidType`].
    pub(crate) fn invalid(field: impl Into<String>, expected: &'static str) -> Self {
        LoadError::InvalidType {
            field: field.into(),
            expected,
        }
    }
}
