//! Graph units - the two concrete node kinds and their arena references.
//!
//! Units live in a single arena owned by the graph; every dependency is a
//! [`UnitRef`] index into that arena rather than a pointer, resolved once by
//! the loader and immutable after finalization. Evaluation walks the arena
//! in ascending index order, so a unit's dependencies are always already
//! updated for the current tick.

use std::time::Duration;

use diagraph_types::{
    DiagStatus, DiagStruct, DiagnosticLevel, DiagnosticReport, NodeStatus, NodeStruct, Timestamp,
};

use crate::levels::{HysteresisLevel, LatchLevel, TimeoutLevel};
use crate::logic::Logic;

/// Index of a unit in the graph arena.
///
/// A relation only, never ownership: the referenced unit is owned by the
/// arena, and the reference stays valid for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitRef(usize);

impl UnitRef {
    pub(crate) fn new(index: usize) -> Self {
        UnitRef(index)
    }

    /// Arena index of the referenced unit.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A leaf unit backed by an externally reported named diagnostic.
///
/// Holds the last received metadata and runs the reported level through
/// Timeout then Hysteresis.
#[derive(Debug)]
pub struct LeafUnit {
    name: String,
    message: String,
    hardware_id: String,
    values: Vec<diagraph_types::KeyValue>,
    timeout: TimeoutLevel,
    hysteresis: HysteresisLevel,
}

impl LeafUnit {
    pub(crate) fn new(
        name: String,
        timeout: Option<Duration>,
        hysteresis: Option<Duration>,
    ) -> Self {
        Self {
            name,
            message: String::new(),
            hardware_id: String::new(),
            values: Vec::new(),
            timeout: TimeoutLevel::new(timeout),
            hysteresis: HysteresisLevel::new(hysteresis),
        }
    }

    /// Name matched against incoming reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current debounced output level.
    pub fn level(&self) -> DiagnosticLevel {
        self.hysteresis.level()
    }

    pub(crate) fn update_report(&mut self, now: Timestamp, report: &DiagnosticReport) {
        self.timeout.update_report(now, report.level);
        self.hysteresis.update(now, self.timeout.level());
        self.message = report.message.clone();
        self.hardware_id = report.hardware_id.clone();
        self.values = report.values.clone();
    }

    pub(crate) fn update(&mut self, now: Timestamp) {
        self.timeout.update(now);
        self.hysteresis.update(now, self.timeout.level());
    }

    pub(crate) fn create_struct(&self, index: usize) -> DiagStruct {
        DiagStruct {
            index,
            name: self.name.clone(),
        }
    }

    pub(crate) fn create_status(&self, index: usize) -> DiagStatus {
        DiagStatus {
            index,
            level: self.hysteresis.level(),
            input_level: self.hysteresis.input_level(),
            timeout_level: self.timeout.level(),
            message: self.message.clone(),
            hardware_id: self.hardware_id.clone(),
            values: self.values.clone(),
        }
    }
}

/// A composite unit whose level is derived from other units via a combinator.
///
/// Runs the combinator's level through Latch. The optional `dependent`
/// back-reference marks this node as blocked while the referenced unit is
/// non-OK; it never alters the node's own computed level and is not part of
/// the dependency relation.
#[derive(Debug)]
pub struct NodeUnit {
    path: String,
    logic: Logic,
    latch: LatchLevel,
    dependent: Option<UnitRef>,
}

impl NodeUnit {
    pub(crate) fn new(
        path: String,
        logic: Logic,
        latch: Option<Duration>,
        dependent: Option<UnitRef>,
    ) -> Self {
        Self {
            path,
            logic,
            latch: LatchLevel::new(latch),
            dependent,
        }
    }

    /// Unique node path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Combinator type name.
    pub fn kind(&self) -> &'static str {
        self.logic.kind()
    }

    /// Current latched output level.
    pub fn level(&self) -> DiagnosticLevel {
        self.latch.level()
    }

    /// Resolved dependency references, in declaration order.
    pub fn ports(&self) -> &[UnitRef] {
        self.logic.ports()
    }

    /// The `dependent` back-reference, if declared.
    pub fn dependent(&self) -> Option<UnitRef> {
        self.dependent
    }

    pub(crate) fn update(&mut self, now: Timestamp, levels: &[DiagnosticLevel]) {
        let input = self.logic.level(|link| levels[link.index()]);
        self.latch.update(now, input);
    }

    pub(crate) fn reset(&mut self) {
        self.latch.reset();
    }

    pub(crate) fn remap(&mut self, map: impl Fn(UnitRef) -> UnitRef) {
        self.logic.remap(&map);
        self.dependent = self.dependent.map(map);
    }

    pub(crate) fn create_struct(&self, index: usize) -> NodeStruct {
        NodeStruct {
            index,
            path: self.path.clone(),
            kind: self.kind().to_string(),
            children: self.ports().iter().map(|link| link.index()).collect(),
            dependent: self.dependent.map(UnitRef::index),
        }
    }

    pub(crate) fn create_status(&self, index: usize, levels: &[DiagnosticLevel]) -> NodeStatus {
        let dependent = self
            .dependent
            .map(|link| levels[link.index()] != DiagnosticLevel::Ok)
            .unwrap_or(false);
        NodeStatus {
            index,
            level: self.latch.level(),
            input_level: self.latch.input_level(),
            latch_level: self.latch.latch_level(),
            dependent,
        }
    }
}

/// One arena slot: a leaf or a composite node plus its finalized index.
#[derive(Debug)]
pub struct Unit {
    index: usize,
    kind: UnitKind,
}

/// The closed set of unit kinds.
#[derive(Debug)]
pub enum UnitKind {
    Leaf(LeafUnit),
    Node(NodeUnit),
}

impl Unit {
    pub(crate) fn new(index: usize, kind: UnitKind) -> Self {
        Self { index, kind }
    }

    /// Stable arena index, assigned at finalization.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current output level.
    pub fn level(&self) -> DiagnosticLevel {
        match &self.kind {
            UnitKind::Leaf(leaf) => leaf.level(),
            UnitKind::Node(node) => node.level(),
        }
    }

    /// Dependency references; empty for leaves.
    pub fn ports(&self) -> &[UnitRef] {
        match &self.kind {
            UnitKind::Leaf(_) => &[],
            UnitKind::Node(node) => node.ports(),
        }
    }

    /// The unit kind.
    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut UnitKind {
        &mut self.kind
    }

    /// This unit as a leaf, if it is one.
    pub fn as_leaf(&self) -> Option<&LeafUnit> {
        match &self.kind {
            UnitKind::Leaf(leaf) => Some(leaf),
            UnitKind::Node(_) => None,
        }
    }

    /// This unit as a composite node, if it is one.
    pub fn as_node(&self) -> Option<&NodeUnit> {
        match &self.kind {
            UnitKind::Node(node) => Some(node),
            UnitKind::Leaf(_) => None,
        }
    }
}
