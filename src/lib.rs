//! # diagraph
//!
//! Aggregates many independent diagnostic reports into a hierarchical,
//! named graph and continuously evaluates each node's severity level from
//! its dependencies. Operators and downstream safety logic consume the
//! per-node level instead of reasoning about thousands of raw reports.
//!
//! ## Architecture
//!
//! ```text
//! config files ──▶ ConfigLoader ──▶ Graph (finalized, topological order)
//!                                      │
//!      report batches ──▶ update_reports / update  (one tick)
//!                                      │
//!                                      ▼
//!                     StructSnapshot + StatusSnapshot
//! ```
//!
//! - **[`levels`]**: the temporal state machines (Timeout, Hysteresis,
//!   Latch) that turn noisy level sequences into stable output levels
//! - **[`logic`]**: the named severity combinators (`and`, `or`, `diag`,
//!   constants, `warn-to-ok`, `warn-to-error`) and their constructor table
//! - **[`units`]**: the arena-backed unit model - leaf units fed by
//!   external reports, composite units fed by a combinator
//! - **[`config`]**: multi-file declarative loading with forward-reference
//!   resolution, path-uniqueness and cycle checks, and topological
//!   finalization
//! - **[`graph`]**: the finalized graph - per-tick update cycle, lookups,
//!   and the two snapshot projections
//!
//! ## Usage
//!
//! ```no_run
//! use diagraph::Graph;
//! use diagraph_types::{DiagnosticLevel, DiagnosticReport, Timestamp};
//!
//! # fn main() -> Result<(), diagraph::LoadError> {
//! let mut graph = Graph::load("config/vehicle.yaml")?;
//!
//! let now = Timestamp::from_secs_f64(0.5);
//! let reports = vec![DiagnosticReport::new("lidar: driver", DiagnosticLevel::Ok)];
//! graph.update_reports(now, &reports);
//! graph.update(now);
//!
//! let status = graph.create_status_snapshot(now);
//! # let _ = status;
//! # Ok(())
//! # }
//! ```
//!
//! Timing is driven entirely by caller-supplied timestamps, so a whole tick
//! is deterministic given its inputs. The graph has no internal parallelism;
//! callers deliver reports and propagation from one mutual-exclusion domain.

pub mod config;
pub mod graph;
pub mod levels;
pub mod logic;
pub mod units;

// Re-export main types for convenience
pub use config::{ConfigFile, ConfigLoader, LoadError};
pub use graph::Graph;
pub use logic::{Logic, LogicTable};
pub use units::{LeafUnit, NodeUnit, Unit, UnitKind, UnitRef};
