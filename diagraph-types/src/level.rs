//! Diagnostic severity levels.

use core::fmt;

/// Ordinal severity of a diagnostic, from best to worst.
///
/// `Stale` means "no recent report" and compares *worse* than `Error` so that
/// silence is never mistaken for health. It is a leaf-only transient
/// classification: the `diag` combinator clamps it back to `Error` before it
/// can reach composite decision logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum DiagnosticLevel {
    /// Operating normally.
    Ok,
    /// Degraded but usable.
    Warn,
    /// Failed or unusable.
    Error,
    /// No report received within the timeout window.
    Stale,
}

impl DiagnosticLevel {
    /// The worse of the two levels.
    pub fn worst(self, other: Self) -> Self {
        self.max(other)
    }

    /// The better of the two levels.
    pub fn best(self, other: Self) -> Self {
        self.min(other)
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            DiagnosticLevel::Ok => "OK",
            DiagnosticLevel::Warn => "WARN",
            DiagnosticLevel::Error => "ERROR",
            DiagnosticLevel::Stale => "STALE",
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
