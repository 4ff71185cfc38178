//! Strict accessors over raw YAML configuration.
//!
//! Definition files are parsed into `serde_yaml::Value` and accessed through
//! [`ConfigYaml`], which turns every shape mismatch into a specific
//! [`LoadError`] instead of a panic or a silent default. Field access is
//! strict: `required` on an absent key is `FieldNotFound`, and asking for a
//! list where the config holds a scalar is `InvalidType`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_yaml::Value;

use super::error::LoadError;

/// A borrowed view of one YAML value, tagged with its field path for errors.
#[derive(Debug, Clone)]
pub struct ConfigYaml<'a> {
    value: &'a Value,
    field: String,
}

impl<'a> ConfigYaml<'a> {
    /// Wrap a parsed document root.
    pub fn new(value: &'a Value) -> Self {
        Self {
            value,
            field: String::new(),
        }
    }

    fn child(&self, key: &str, value: &'a Value) -> ConfigYaml<'a> {
        let field = if self.field.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.field, key)
        };
        ConfigYaml { value, field }
    }

    /// The field path of this value, for error reporting.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Access a required mapping key.
    pub fn required(&self, key: &str) -> Result<ConfigYaml<'a>, LoadError> {
        self.optional(key)?
            .ok_or_else(|| LoadError::FieldNotFound(self.join(key)))
    }

    /// Access an optional mapping key.
    pub fn optional(&self, key: &str) -> Result<Option<ConfigYaml<'a>>, LoadError> {
        match self.value {
            Value::Mapping(_) => Ok(self.value.get(key).map(|value| self.child(key, value))),
            Value::Null => Ok(None),
            _ => Err(LoadError::invalid(&self.field, "mapping")),
        }
    }

    /// Interpret this value as a string scalar.
    pub fn text(&self) -> Result<&'a str, LoadError> {
        match self.value {
            Value::String(text) => Ok(text),
            _ => Err(LoadError::invalid(&self.field, "string")),
        }
    }

    /// Interpret this value as a duration in fractional seconds.
    pub fn seconds(&self) -> Result<Duration, LoadError> {
        let secs = match self.value {
            Value::Number(number) => number.as_f64(),
            _ => None,
        };
        match secs {
            Some(secs) if secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
            _ => Err(LoadError::invalid(&self.field, "non-negative seconds")),
        }
    }

    /// Interpret this value as a list.
    pub fn list(&self) -> Result<Vec<ConfigYaml<'a>>, LoadError> {
        match self.value {
            Value::Sequence(items) => Ok(items
                .iter()
                .map(|item| ConfigYaml {
                    value: item,
                    field: self.field.clone(),
                })
                .collect()),
            _ => Err(LoadError::invalid(&self.field, "list")),
        }
    }

    fn join(&self, key: &str) -> String {
        if self.field.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.field, key)
        }
    }
}

/// Expand `$(...)` substitution directives in a file path.
///
/// Supported directives:
/// - `$(dirname)` - directory of the including file
/// - `$(env NAME)` / `$(env NAME default)` - environment lookup
///
/// Any other directive fails with `UnknownSubstitution`.
pub fn substitute(path: &str, dirname: &Path) -> Result<PathBuf, LoadError> {
    let mut result = String::new();
    let mut rest = path;

    while let Some(start) = rest.find("$(") {
        result.push_str(&rest[..start]);
        let inner = &rest[start + 2..];
        let end = inner
            .find(')')
            .ok_or_else(|| LoadError::UnknownSubstitution(inner.to_string()))?;
        let directive = &inner[..end];
        result.push_str(&expand(directive, dirname)?);
        rest = &inner[end + 1..];
    }
    result.push_str(rest);
    Ok(PathBuf::from(result))
}

fn expand(directive: &str, dirname: &Path) -> Result<String, LoadError> {
    let mut words = directive.split_whitespace();
    match words.next() {
        Some("dirname") => Ok(dirname.to_string_lossy().into_owned()),
        Some("env") => {
            let name = words
                .next()
                .ok_or_else(|| LoadError::UnknownSubstitution(directive.to_string()))?;
            let default = words.next();
            match std::env::var(name) {
                Ok(value) => Ok(value),
                Err(_) => default
                    .map(str::to_string)
                    .ok_or_else(|| LoadError::UnknownSubstitution(directive.to_string())),
            }
        }
        _ => Err(LoadError::UnknownSubstitution(directive.to_string())),
    }
}
