//! Snapshot projections - point-in-time views of the diagnostic graph.
//!
//! Every tick the graph can be projected into two immutable snapshots: a
//! *struct* snapshot describing static topology (published once or on
//! change) and a *status* snapshot carrying the dynamic levels. Entries in
//! both are ordered by unit index, and the index of a unit never changes for
//! the lifetime of the graph, so consumers may join the two by position.

use crate::{DiagnosticLevel, KeyValue, Timestamp};

/// Static description of one composite node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStruct {
    /// Stable unit index, assigned at finalization.
    pub index: usize,
    /// Unique node path, e.g. `"/vehicle/sensing"`.
    pub path: String,
    /// Combinator type name, e.g. `"and"`.
    pub kind: String,
    /// Indices of the units this node depends on, in declaration order.
    pub children: Vec<usize>,
    /// Index of the `dependent` back-reference, if declared.
    pub dependent: Option<usize>,
}

/// Static description of one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagStruct {
    /// Stable unit index, assigned at finalization.
    pub index: usize,
    /// Name matched against incoming reports.
    pub name: String,
}

/// Dynamic status of one composite node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStatus {
    pub index: usize,
    /// Output level after latching.
    pub level: DiagnosticLevel,
    /// Combinator level before latching.
    pub input_level: DiagnosticLevel,
    /// Level currently held by the latch, `Ok` when not latched.
    pub latch_level: DiagnosticLevel,
    /// True while the `dependent` back-reference is at a non-OK level.
    pub dependent: bool,
}

/// Dynamic status of one leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiagStatus {
    pub index: usize,
    /// Output level after timeout and hysteresis.
    pub level: DiagnosticLevel,
    /// Level entering hysteresis (after timeout).
    pub input_level: DiagnosticLevel,
    /// Level leaving the timeout stage.
    pub timeout_level: DiagnosticLevel,
    /// Last reported message.
    pub message: String,
    /// Last reported hardware identifier.
    pub hardware_id: String,
    /// Last reported key/value fields.
    pub values: Vec<KeyValue>,
}

/// Structure snapshot: one entry per composite node and per leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructSnapshot {
    /// Milliseconds since the graph epoch when this snapshot was taken.
    pub timestamp_ms: u64,
    pub nodes: Vec<NodeStruct>,
    pub diags: Vec<DiagStruct>,
}

/// Status snapshot: one entry per composite node and per leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// Milliseconds since the graph epoch when this snapshot was taken.
    pub timestamp_ms: u64,
    pub nodes: Vec<NodeStatus>,
    pub diags: Vec<DiagStatus>,
}

impl StructSnapshot {
    /// Create an empty snapshot stamped at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            timestamp_ms: now.as_millis(),
            nodes: Vec::new(),
            diags: Vec::new(),
        }
    }

    /// Find a node entry by path.
    pub fn find_node(&self, path: &str) -> Option<&NodeStruct> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Find a leaf entry by name.
    pub fn find_diag(&self, name: &str) -> Option<&DiagStruct> {
        self.diags.iter().find(|d| d.name == name)
    }

    /// Total number of units described.
    pub fn len(&self) -> usize {
        self.nodes.len() + self.diags.len()
    }

    /// True when no units are described.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.diags.is_empty()
    }
}

impl StatusSnapshot {
    /// Create an empty snapshot stamped at `now`.
    pub fn new(now: Timestamp) -> Self {
        Self {
            timestamp_ms: now.as_millis(),
            nodes: Vec::new(),
            diags: Vec::new(),
        }
    }

    /// Status of the unit with the given index, if it is a node.
    pub fn node(&self, index: usize) -> Option<&NodeStatus> {
        self.nodes.iter().find(|n| n.index == index)
    }

    /// Status of the unit with the given index, if it is a leaf.
    pub fn diag(&self, index: usize) -> Option<&DiagStatus> {
        self.diags.iter().find(|d| d.index == index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_struct() -> StructSnapshot {
        StructSnapshot {
            timestamp_ms: 1500,
            nodes: vec![NodeStruct {
                index: 1,
                path: "/root".into(),
                kind: "and".into(),
                children: vec![0],
                dependent: None,
            }],
            diags: vec![DiagStruct {
                index: 0,
                name: "imu: driver".into(),
            }],
        }
    }

    #[test]
    fn test_struct_lookup() {
        let snapshot = sample_struct();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.find_node("/root").unwrap().children, vec![0]);
        assert_eq!(snapshot.find_diag("imu: driver").unwrap().index, 0);
        assert!(snapshot.find_node("/missing").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = sample_struct();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: StructSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, parsed);
    }
}
