//! Raw diagnostic reports - the per-tick input batch.

use crate::DiagnosticLevel;

/// One key/value diagnostic field attached to a report.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// A single named raw status entry, as delivered by the transport layer.
///
/// Reports are matched to leaf units by `name`; reports for names the graph
/// does not know are ignored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagnosticReport {
    /// Name of the reporting diagnostic, e.g. `"sensor/lidar: driver"`.
    pub name: String,
    /// Reported severity.
    pub level: DiagnosticLevel,
    /// Free-form status message.
    #[cfg_attr(feature = "serde", serde(default))]
    pub message: String,
    /// Identifier of the reporting hardware, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub hardware_id: String,
    /// Ordered key/value diagnostic fields.
    #[cfg_attr(feature = "serde", serde(default))]
    pub values: Vec<KeyValue>,
}

impl DiagnosticReport {
    /// Create a report with the given name and level and no metadata.
    pub fn new(name: impl Into<String>, level: DiagnosticLevel) -> Self {
        Self {
            name: name.into(),
            level,
            message: String::new(),
            hardware_id: String::new(),
            values: Vec::new(),
        }
    }

    /// Set the status message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the hardware identifier.
    pub fn hardware_id(mut self, hardware_id: impl Into<String>) -> Self {
        self.hardware_id = hardware_id.into();
        self
    }

    /// Append a key/value field.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push(KeyValue {
            key: key.into(),
            value: value.into(),
        });
        self
    }
}
