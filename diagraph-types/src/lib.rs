//! # diagraph-types
//!
//! Core types for hierarchical diagnostic aggregation. This crate defines the
//! schema shared between the `diagraph` runtime and external consumers: the
//! severity ordinal, deterministic timestamps, raw report entries, and the two
//! snapshot projections published every tick.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature as needed
//! - **Deterministic time**: Timestamps are caller-supplied, never read from the wall clock
//! - **Stable indexing**: Snapshot entries are ordered by unit index, and that
//!   index is stable for the lifetime of the graph that produced them
//!
//! ## Features
//!
//! - `serde`: JSON/YAML/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use diagraph_types::{DiagnosticLevel, DiagnosticReport, Timestamp};
//!
//! let report = DiagnosticReport::new("sensor/lidar", DiagnosticLevel::Warn)
//!     .message("intensity low")
//!     .value("points", "1023");
//!
//! let now = Timestamp::from_secs_f64(12.5);
//! assert_eq!(report.level.worst(DiagnosticLevel::Ok), DiagnosticLevel::Warn);
//! assert_eq!(now.as_millis(), 12_500);
//! ```

mod level;
mod report;
mod snapshot;
mod time;

pub use level::*;
pub use report::*;
pub use snapshot::*;
pub use time::*;
