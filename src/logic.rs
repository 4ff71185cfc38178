//! Severity-combination rules for composite nodes.
//!
//! Every composite node names a combinator type in its configuration; the
//! [`LogicTable`] maps that name to a constructor, and the constructed
//! [`Logic`] maps the current levels of the node's dependencies to a single
//! output level each tick. The built-in set is closed and small, so the
//! combinator itself is a plain enum; the table exists so the set of *names*
//! stays extensible without any global registration side effects - callers
//! build a table once and hand it to the loader.

use std::collections::HashMap;

use diagraph_types::DiagnosticLevel;

use crate::config::{ConfigYaml, LoadError};
use crate::units::UnitRef;

/// A reference parsed out of a node's configuration, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Reference to a composite node (or link alias) by path.
    Path(String),
    /// Reference to a leaf by name.
    Diag(String),
}

/// Resolves parsed references against the declaration table.
///
/// Implemented by the loader; combinator constructors never see how
/// placeholders or link chains work.
pub trait ResolveLink {
    fn resolve(&mut self, target: LinkTarget) -> Result<UnitRef, LoadError>;
}

/// Everything a combinator constructor may use: the node's raw configuration
/// plus a resolver for its references.
pub struct LogicContext<'y, 'r> {
    yaml: &'r ConfigYaml<'y>,
    resolver: &'r mut dyn ResolveLink,
}

impl<'y, 'r> LogicContext<'y, 'r> {
    pub(crate) fn new(yaml: &'r ConfigYaml<'y>, resolver: &'r mut dyn ResolveLink) -> Self {
        Self { yaml, resolver }
    }

    /// Parse a required list field of unit references.
    pub fn parse_list(&mut self, key: &str) -> Result<Vec<UnitRef>, LoadError> {
        let items = self.yaml.required(key)?.list()?;
        items
            .iter()
            .map(|item| self.parse_reference(item))
            .collect()
    }

    /// Parse an optional list field of unit references; absent means empty.
    pub fn parse_list_optional(&mut self, key: &str) -> Result<Vec<UnitRef>, LoadError> {
        match self.yaml.optional(key)? {
            Some(yaml) => yaml
                .list()?
                .iter()
                .map(|item| self.parse_reference(item))
                .collect(),
            None => Ok(Vec::new()),
        }
    }

    /// Parse a required single-reference field.
    pub fn parse_item(&mut self, key: &str) -> Result<UnitRef, LoadError> {
        let item = self.yaml.required(key)?;
        self.parse_reference(&item)
    }

    /// Parse the required `diag` leaf-name field.
    pub fn parse_diag(&mut self) -> Result<UnitRef, LoadError> {
        let name = self.yaml.required("diag")?.text()?.to_string();
        self.resolver.resolve(LinkTarget::Diag(name))
    }

    fn parse_reference(&mut self, item: &ConfigYaml<'_>) -> Result<UnitRef, LoadError> {
        if let Some(path) = item.optional("path")? {
            let target = LinkTarget::Path(path.text()?.to_string());
            return self.resolver.resolve(target);
        }
        if let Some(name) = item.optional("diag")? {
            let target = LinkTarget::Diag(name.text()?.to_string());
            return self.resolver.resolve(target);
        }
        Err(LoadError::FieldNotFound(format!(
            "{}.path",
            item.field()
        )))
    }
}

/// A severity combinator over a node's resolved dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Logic {
    /// Worst level across dependencies; OK when empty.
    And { links: Vec<UnitRef> },
    /// Best level across dependencies.
    Or { links: Vec<UnitRef> },
    /// Single leaf, with STALE clamped to ERROR.
    Diag { link: UnitRef },
    /// Constant level, ignoring all input.
    Const { level: DiagnosticLevel },
    /// WARN remapped to OK, everything else passed through.
    WarnToOk { link: UnitRef },
    /// WARN remapped to ERROR, everything else passed through.
    WarnToError { link: UnitRef },
}

impl Logic {
    /// Evaluate against the current levels of the dependencies.
    ///
    /// `level_of` must return the already-updated level of the referenced
    /// unit for the current tick; topological ordering guarantees that.
    pub fn level(&self, level_of: impl Fn(UnitRef) -> DiagnosticLevel) -> DiagnosticLevel {
        match self {
            Logic::And { links } => links
                .iter()
                .map(|link| level_of(*link))
                .fold(DiagnosticLevel::Ok, DiagnosticLevel::worst),
            Logic::Or { links } => {
                if links.is_empty() {
                    return DiagnosticLevel::Ok;
                }
                links
                    .iter()
                    .map(|link| level_of(*link))
                    .fold(DiagnosticLevel::Stale, DiagnosticLevel::best)
            }
            // STALE is a leaf-only classification; clamp it here.
            Logic::Diag { link } => level_of(*link).best(DiagnosticLevel::Error),
            Logic::Const { level } => *level,
            Logic::WarnToOk { link } => match level_of(*link) {
                DiagnosticLevel::Warn => DiagnosticLevel::Ok,
                level => level,
            },
            Logic::WarnToError { link } => match level_of(*link) {
                DiagnosticLevel::Warn => DiagnosticLevel::Error,
                level => level,
            },
        }
    }

    /// The resolved dependency references, in declaration order.
    pub fn ports(&self) -> &[UnitRef] {
        match self {
            Logic::And { links } | Logic::Or { links } => links,
            Logic::Diag { link } | Logic::WarnToOk { link } | Logic::WarnToError { link } => {
                std::slice::from_ref(link)
            }
            Logic::Const { .. } => &[],
        }
    }

    /// The configuration type name of this combinator.
    pub fn kind(&self) -> &'static str {
        match self {
            Logic::And { .. } => "and",
            Logic::Or { .. } => "or",
            Logic::Diag { .. } => "diag",
            Logic::Const {
                level: DiagnosticLevel::Ok,
            } => "ok",
            Logic::Const {
                level: DiagnosticLevel::Warn,
            } => "warn",
            Logic::Const {
                level: DiagnosticLevel::Error,
            } => "error",
            Logic::Const {
                level: DiagnosticLevel::Stale,
            } => "stale",
            Logic::WarnToOk { .. } => "warn-to-ok",
            Logic::WarnToError { .. } => "warn-to-error",
        }
    }

    /// Remap all references through `map`; used once at finalization.
    pub(crate) fn remap(&mut self, map: impl Fn(UnitRef) -> UnitRef) {
        match self {
            Logic::And { links } | Logic::Or { links } => {
                for link in links {
                    *link = map(*link);
                }
            }
            Logic::Diag { link } | Logic::WarnToOk { link } | Logic::WarnToError { link } => {
                *link = map(*link);
            }
            Logic::Const { .. } => {}
        }
    }
}

/// Constructor signature held in the [`LogicTable`].
pub type LogicCtor = fn(&mut LogicContext<'_, '_>) -> Result<Logic, LoadError>;

/// Explicit mapping from configuration type names to combinator constructors.
///
/// Built once (usually via [`LogicTable::builtin`]) and passed into the
/// loader; a node whose `type` is not in the table fails construction with
/// [`LoadError::UnknownLogic`].
pub struct LogicTable {
    ctors: HashMap<&'static str, LogicCtor>,
}

impl LogicTable {
    /// An empty table with no registered types.
    pub fn empty() -> Self {
        Self {
            ctors: HashMap::new(),
        }
    }

    /// The table of all built-in combinator types.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.register("and", |ctx| {
            Ok(Logic::And {
                links: ctx.parse_list_optional("list")?,
            })
        });
        table.register("short-circuit-and", |ctx| {
            Ok(Logic::And {
                links: ctx.parse_list_optional("list")?,
            })
        });
        table.register("or", |ctx| {
            let links = ctx.parse_list("list")?;
            if links.is_empty() {
                return Err(LoadError::invalid("list", "non-empty list"));
            }
            Ok(Logic::Or { links })
        });
        table.register("diag", |ctx| {
            Ok(Logic::Diag {
                link: ctx.parse_diag()?,
            })
        });
        table.register("ok", |_| {
            Ok(Logic::Const {
                level: DiagnosticLevel::Ok,
            })
        });
        table.register("warn", |_| {
            Ok(Logic::Const {
                level: DiagnosticLevel::Warn,
            })
        });
        table.register("error", |_| {
            Ok(Logic::Const {
                level: DiagnosticLevel::Error,
            })
        });
        table.register("stale", |_| {
            Ok(Logic::Const {
                level: DiagnosticLevel::Stale,
            })
        });
        table.register("warn-to-ok", |ctx| {
            Ok(Logic::WarnToOk {
                link: ctx.parse_item("item")?,
            })
        });
        table.register("warn-to-error", |ctx| {
            Ok(Logic::WarnToError {
                link: ctx.parse_item("item")?,
            })
        });
        table
    }

    /// Register a constructor for a type name, replacing any existing one.
    pub fn register(&mut self, name: &'static str, ctor: LogicCtor) {
        self.ctors.insert(name, ctor);
    }

    /// Construct the combinator for a node of the given type.
    pub fn create(
        &self,
        kind: &str,
        ctx: &mut LogicContext<'_, '_>,
    ) -> Result<Logic, LoadError> {
        let ctor = self
            .ctors
            .get(kind)
            .ok_or_else(|| LoadError::UnknownLogic(kind.to_string()))?;
        ctor(ctx)
    }
}

impl Default for LogicTable {
    fn default() -> Self {
        Self::builtin()
    }
}
