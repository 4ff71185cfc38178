//! Declarative configuration loading.
//!
//! A graph is described by a root YAML file plus zero or more included
//! files. Each file may declare three collections:
//!
//! ```yaml
//! files:
//!   - { path: $(dirname)/sensing.yaml }
//! nodes:
//!   - { path: /vehicle, type: and, list: [{ path: /vehicle/sensing }] }
//!   - { path: /vehicle/sensing, type: diag, diag: "lidar: driver", latch: 1.0 }
//! diags:
//!   - { name: "lidar: driver", timeout: 1.0, hysteresis: 0.3 }
//! ```
//!
//! Nodes reference each other by `path` (forward references are fine, across
//! files too), leaves by `name`. A node of `type: link` is a transparent
//! alias for another path, used for cross-file references.

mod error;
mod loader;
mod yaml;

pub use error::LoadError;
pub use loader::{ConfigFile, ConfigLoader};
pub use yaml::{substitute, ConfigYaml};
