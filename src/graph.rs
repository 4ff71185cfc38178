//! The diagnostic graph - ownership, per-tick update cycle, and snapshots.

use std::collections::HashMap;
use std::path::Path;

use diagraph_types::{
    DiagnosticLevel, DiagnosticReport, StatusSnapshot, StructSnapshot, Timestamp,
};
use tracing::debug;

use crate::config::{ConfigLoader, LoadError};
use crate::logic::LogicTable;
use crate::units::{LeafUnit, NodeUnit, Unit, UnitKind};

/// The aggregated diagnostic graph.
///
/// Owns every unit in finalized topological order: each unit's dependencies
/// have strictly smaller indices, so one ascending pass per tick sees every
/// dependency already updated. The graph is built once by the loader and
/// after that mutated only through the tick cycle; construction errors are
/// the only errors it can ever produce.
///
/// A tick is two calls: [`update_reports`](Graph::update_reports) for each
/// incoming batch, then one [`update`](Graph::update) to propagate. Both
/// take the caller's timestamp; the graph never reads the wall clock.
#[derive(Debug)]
pub struct Graph {
    units: Vec<Unit>,
    /// Per-unit level cache, aligned with `units`, refreshed each tick.
    levels: Vec<DiagnosticLevel>,
    names: HashMap<String, usize>,
    paths: HashMap<String, usize>,
}

impl Graph {
    /// Load a graph from the configuration rooted at `path`, with the
    /// built-in combinator table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        Self::load_with(path, &LogicTable::builtin())
    }

    /// Load a graph with a custom combinator table.
    pub fn load_with(path: impl AsRef<Path>, table: &LogicTable) -> Result<Self, LoadError> {
        ConfigLoader::load(path, table).map(ConfigLoader::into_graph)
    }

    pub(crate) fn new(units: Vec<Unit>) -> Self {
        let levels = units.iter().map(Unit::level).collect();
        let mut names = HashMap::new();
        let mut paths = HashMap::new();
        for unit in &units {
            match unit.kind() {
                UnitKind::Leaf(leaf) => {
                    names.insert(leaf.name().to_string(), unit.index());
                }
                UnitKind::Node(node) => {
                    paths.insert(node.path().to_string(), unit.index());
                }
            }
        }
        Self {
            units,
            levels,
            names,
            paths,
        }
    }

    /// Ingest a batch of raw reports stamped at `now`.
    ///
    /// Reports are routed to leaf units by name; reports for unknown names
    /// are dropped. Multiple batches may be ingested before a single
    /// [`update`](Graph::update) propagates them.
    pub fn update_reports(&mut self, now: Timestamp, reports: &[DiagnosticReport]) {
        for report in reports {
            let Some(&index) = self.names.get(&report.name) else {
                debug!(name = %report.name, "report for unknown diagnostic dropped");
                continue;
            };
            if let UnitKind::Leaf(leaf) = self.units[index].kind_mut() {
                leaf.update_report(now, report);
                self.levels[index] = leaf.level();
            }
        }
    }

    /// Propagate levels through the whole graph at `now`.
    ///
    /// Leaves advance their timeout on elapsed time alone (detecting
    /// silence); nodes recompute their combinator from already-updated
    /// dependencies and feed the result through their latch.
    pub fn update(&mut self, now: Timestamp) {
        for index in 0..self.units.len() {
            let level = match self.units[index].kind_mut() {
                UnitKind::Leaf(leaf) => {
                    leaf.update(now);
                    leaf.level()
                }
                UnitKind::Node(node) => {
                    node.update(now, &self.levels);
                    node.level()
                }
            };
            self.levels[index] = level;
        }
    }

    /// Clear every node latch, releasing held levels.
    pub fn reset(&mut self) {
        for index in 0..self.units.len() {
            if let UnitKind::Node(node) = self.units[index].kind_mut() {
                node.reset();
            }
            self.levels[index] = self.units[index].level();
        }
    }

    /// Project the static structure of every unit, ordered by index.
    pub fn create_struct_snapshot(&self, now: Timestamp) -> StructSnapshot {
        let mut snapshot = StructSnapshot::new(now);
        for unit in &self.units {
            match unit.kind() {
                UnitKind::Leaf(leaf) => snapshot.diags.push(leaf.create_struct(unit.index())),
                UnitKind::Node(node) => snapshot.nodes.push(node.create_struct(unit.index())),
            }
        }
        snapshot
    }

    /// Project the current status of every unit, ordered by index.
    pub fn create_status_snapshot(&self, now: Timestamp) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::new(now);
        for unit in &self.units {
            match unit.kind() {
                UnitKind::Leaf(leaf) => snapshot.diags.push(leaf.create_status(unit.index())),
                UnitKind::Node(node) => snapshot
                    .nodes
                    .push(node.create_status(unit.index(), &self.levels)),
            }
        }
        snapshot
    }

    /// All units in finalized index order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Find a composite node by path.
    pub fn find_node(&self, path: &str) -> Option<&NodeUnit> {
        self.paths.get(path).and_then(|&i| self.units[i].as_node())
    }

    /// Find a leaf by name.
    pub fn find_diag(&self, name: &str) -> Option<&LeafUnit> {
        self.names.get(name).and_then(|&i| self.units[i].as_leaf())
    }

    /// Current level of the node at `path`, if it exists.
    pub fn level_of(&self, path: &str) -> Option<DiagnosticLevel> {
        self.find_node(path).map(NodeUnit::level)
    }
}
