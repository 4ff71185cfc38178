//! Graph construction from declarative definition files.
//!
//! Loading is a one-shot pipeline: read the root file and every include into
//! memory, register a placeholder for every declared path and name (so
//! forward references across files and declaration order are legal), resolve
//! all references against those placeholders, then topologically finalize
//! the arena. The first error aborts the whole construction; no partial
//! graph is ever returned.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_yaml::Value;
use tracing::{debug, info};

use crate::graph::Graph;
use crate::logic::{LinkTarget, LogicContext, LogicTable, ResolveLink};
use crate::units::{LeafUnit, NodeUnit, Unit, UnitKind, UnitRef};

use super::error::LoadError;
use super::yaml::{substitute, ConfigYaml};

/// One node of the file-inclusion tree, retained for offline tooling.
#[derive(Debug)]
pub struct ConfigFile {
    path: PathBuf,
    includes: Vec<ConfigFile>,
}

impl ConfigFile {
    /// Resolved path of this file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files included by this file, in declaration order.
    pub fn includes(&self) -> &[ConfigFile] {
        &self.includes
    }
}

/// Loads a configuration into a finalized [`Graph`], keeping the
/// file-inclusion tree around for inspection tools.
#[derive(Debug)]
pub struct ConfigLoader {
    file_tree: ConfigFile,
    graph: Graph,
}

impl ConfigLoader {
    /// Load the configuration rooted at `path` using the given combinator
    /// table.
    pub fn load(path: impl AsRef<Path>, table: &LogicTable) -> Result<Self, LoadError> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();
        let file_tree = load_tree(path.as_ref().to_path_buf(), true, &mut files, &mut seen)?;
        let graph = build_graph(&files, table)?;
        info!(
            files = files.len(),
            units = graph.units().len(),
            "diagnostic graph finalized"
        );
        Ok(Self { file_tree, graph })
    }

    /// Root of the file-inclusion tree.
    pub fn file_tree(&self) -> &ConfigFile {
        &self.file_tree
    }

    /// The loaded graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Consume the loader, keeping only the graph.
    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// Read `path` and every file it includes, depth first.
///
/// Each distinct resolved path is parsed once; re-including an already
/// loaded file records a tree node but contributes no declarations, which
/// both tolerates diamond inclusions and breaks inclusion cycles.
fn load_tree(
    path: PathBuf,
    root: bool,
    files: &mut Vec<(PathBuf, Value)>,
    seen: &mut HashSet<PathBuf>,
) -> Result<ConfigFile, LoadError> {
    if !seen.insert(path.clone()) {
        return Ok(ConfigFile {
            path,
            includes: Vec::new(),
        });
    }

    let text = fs::read_to_string(&path).map_err(|_| {
        let display = path.display().to_string();
        if root {
            LoadError::RootFileNotFound(display)
        } else {
            LoadError::FileNotFound(display)
        }
    })?;
    let value: Value = serde_yaml::from_str(&text)
        .map_err(|_| LoadError::invalid(path.display().to_string(), "yaml document"))?;
    debug!(path = %path.display(), "loaded config file");

    let dirname = path.parent().unwrap_or(Path::new(".")).to_path_buf();
    let mut include_paths = Vec::new();
    {
        let yaml = ConfigYaml::new(&value);
        if let Some(list) = yaml.optional("files")? {
            for item in list.list()? {
                let raw = item.required("path")?.text()?;
                include_paths.push(substitute(raw, &dirname)?);
            }
        }
    }
    files.push((path.clone(), value));

    let mut includes = Vec::new();
    for include in include_paths {
        includes.push(load_tree(include, false, files, seen)?);
    }
    Ok(ConfigFile { path, includes })
}

/// Raw declaration of a composite node, links not yet resolved.
struct NodeDecl<'a> {
    path: String,
    kind: String,
    yaml: ConfigYaml<'a>,
}

/// Raw declaration of a leaf.
struct LeafDecl {
    name: String,
    timeout: Option<Duration>,
    hysteresis: Option<Duration>,
}

/// What a declared path stands for.
enum PathDecl {
    /// Index into the node declaration list.
    Node(usize),
    /// Alias for another path, resolved transparently.
    Link(String),
}

/// Resolver backed by the placeholder tables; leaves occupy arena indices
/// `0..leaf_count`, node declaration `i` provisionally sits at
/// `leaf_count + i`.
struct DeclResolver<'a> {
    paths: &'a HashMap<String, PathDecl>,
    names: &'a HashMap<String, usize>,
    leaf_count: usize,
}

impl ResolveLink for DeclResolver<'_> {
    fn resolve(&mut self, target: LinkTarget) -> Result<UnitRef, LoadError> {
        match target {
            LinkTarget::Diag(name) => self
                .names
                .get(&name)
                .map(|index| UnitRef::new(*index))
                .ok_or(LoadError::LinkNotFound(name)),
            LinkTarget::Path(path) => {
                let mut visited = HashSet::new();
                let mut current = path;
                loop {
                    if !visited.insert(current.clone()) {
                        return Err(LoadError::UnitLoopFound(current));
                    }
                    match self.paths.get(&current) {
                        None => return Err(LoadError::LinkNotFound(current)),
                        Some(PathDecl::Node(index)) => {
                            return Ok(UnitRef::new(self.leaf_count + index));
                        }
                        Some(PathDecl::Link(link)) => current = link.clone(),
                    }
                }
            }
        }
    }
}

fn build_graph(files: &[(PathBuf, Value)], table: &LogicTable) -> Result<Graph, LoadError> {
    // First pass: placeholders for every declared path and name.
    let mut node_decls: Vec<NodeDecl<'_>> = Vec::new();
    let mut leaf_decls: Vec<LeafDecl> = Vec::new();
    let mut paths: HashMap<String, PathDecl> = HashMap::new();
    let mut names: HashMap<String, usize> = HashMap::new();

    for (_, value) in files {
        let yaml = ConfigYaml::new(value);
        if let Some(nodes) = yaml.optional("nodes")? {
            for node in nodes.list()? {
                let path = node.required("path")?.text()?.to_string();
                let kind = node.required("type")?.text()?.to_string();
                if paths.contains_key(&path) {
                    return Err(LoadError::PathConflict(path));
                }
                if kind == "link" {
                    let target = node.required("link")?.text()?.to_string();
                    paths.insert(path, PathDecl::Link(target));
                } else {
                    paths.insert(path.clone(), PathDecl::Node(node_decls.len()));
                    node_decls.push(NodeDecl { path, kind, yaml: node });
                }
            }
        }
        if let Some(diags) = yaml.optional("diags")? {
            for diag in diags.list()? {
                let name = diag.required("name")?.text()?.to_string();
                if names.contains_key(&name) {
                    return Err(LoadError::PathConflict(name));
                }
                let timeout = diag.optional("timeout")?.map(|y| y.seconds()).transpose()?;
                let hysteresis = diag
                    .optional("hysteresis")?
                    .map(|y| y.seconds())
                    .transpose()?;
                names.insert(name.clone(), leaf_decls.len());
                leaf_decls.push(LeafDecl {
                    name,
                    timeout,
                    hysteresis,
                });
            }
        }
    }

    let leaf_count = leaf_decls.len();

    // Second pass: concrete units with resolved references.
    let leaf_units: Vec<LeafUnit> = leaf_decls
        .into_iter()
        .map(|decl| LeafUnit::new(decl.name, decl.timeout, decl.hysteresis))
        .collect();

    let mut node_units: Vec<NodeUnit> = Vec::with_capacity(node_decls.len());
    for decl in &node_decls {
        let mut resolver = DeclResolver {
            paths: &paths,
            names: &names,
            leaf_count,
        };
        let logic = {
            let mut ctx = LogicContext::new(&decl.yaml, &mut resolver);
            table.create(&decl.kind, &mut ctx)?
        };
        let latch = decl.yaml.optional("latch")?.map(|y| y.seconds()).transpose()?;
        let dependent = match decl.yaml.optional("dependent")? {
            Some(yaml) => {
                let target = LinkTarget::Path(yaml.text()?.to_string());
                Some(resolver.resolve(target)?)
            }
            None => None,
        };
        node_units.push(NodeUnit::new(decl.path.clone(), logic, latch, dependent));
    }

    finalize(leaf_units, node_units)
}

/// Topologically order the nodes, assign final indices, and remap every
/// reference. Leaves carry no dependencies and keep the lowest indices.
fn finalize(leaf_units: Vec<LeafUnit>, node_units: Vec<NodeUnit>) -> Result<Graph, LoadError> {
    let leaf_count = leaf_units.len();
    let node_count = node_units.len();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    let mut marks = vec![Mark::New; node_count];
    let mut order = Vec::with_capacity(node_count);

    for start in 0..node_count {
        if marks[start] != Mark::New {
            continue;
        }
        marks[start] = Mark::Active;
        let mut stack = vec![(start, 0usize)];
        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let port = node_units[current].ports().get(frame.1).copied();
            frame.1 += 1;
            match port {
                None => {
                    marks[current] = Mark::Done;
                    order.push(current);
                    stack.pop();
                }
                Some(port) if port.index() < leaf_count => {}
                Some(port) => {
                    let child = port.index() - leaf_count;
                    match marks[child] {
                        Mark::New => {
                            marks[child] = Mark::Active;
                            stack.push((child, 0));
                        }
                        Mark::Active => {
                            return Err(LoadError::UnitLoopFound(
                                node_units[child].path().to_string(),
                            ));
                        }
                        Mark::Done => {}
                    }
                }
            }
        }
    }

    // Final index of node declaration `i`: leaves first, then post-order.
    let mut final_of_node = vec![0usize; node_count];
    for (position, &decl) in order.iter().enumerate() {
        final_of_node[decl] = leaf_count + position;
    }
    let remap = |reference: UnitRef| {
        if reference.index() < leaf_count {
            reference
        } else {
            UnitRef::new(final_of_node[reference.index() - leaf_count])
        }
    };

    let mut units: Vec<Unit> = Vec::with_capacity(leaf_count + node_count);
    for (index, leaf) in leaf_units.into_iter().enumerate() {
        units.push(Unit::new(index, UnitKind::Leaf(leaf)));
    }
    let mut slots: Vec<Option<NodeUnit>> = node_units.into_iter().map(Some).collect();
    for &decl in &order {
        if let Some(mut node) = slots[decl].take() {
            node.remap(remap);
            units.push(Unit::new(units.len(), UnitKind::Node(node)));
        }
    }

    Ok(Graph::new(units))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use diagraph_types::DiagnosticLevel;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    fn load(dir: &TempDir, name: &str) -> Result<Graph, LoadError> {
        ConfigLoader::load(dir.path().join(name), &LogicTable::builtin())
            .map(ConfigLoader::into_graph)
    }

    #[test]
    fn test_load_single_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: and, list: [{ path: /leafwrap }] }
  - { path: /leafwrap, type: diag, diag: "test: ok" }
diags:
  - { name: "test: ok", timeout: 1.0 }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        assert_eq!(graph.units().len(), 3);
        assert!(graph.find_node("/root").is_some());
        assert!(graph.find_diag("test: ok").is_some());
    }

    #[test]
    fn test_forward_reference_across_files() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
files:
  - { path: $(dirname)/sub.yaml }
nodes:
  - { path: /root, type: and, list: [{ path: /sub/target }] }
"#,
        );
        write_config(
            &dir,
            "sub.yaml",
            r#"
nodes:
  - { path: /sub/target, type: warn }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        let root = graph.find_node("/root").unwrap();
        assert_eq!(root.ports().len(), 1);
    }

    #[test]
    fn test_link_indirection_is_transparent() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: and, list: [{ path: /alias }] }
  - { path: /alias, type: link, link: /real }
  - { path: /real, type: ok }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        let root = graph.find_node("/root").unwrap();
        let target = root.ports()[0];
        assert_eq!(graph.units()[target.index()].as_node().unwrap().path(), "/real");
    }

    #[test]
    fn test_topological_index_order() {
        // Declared parent-first; indices must still put dependencies lower.
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /a, type: and, list: [{ path: /b }, { path: /c }] }
  - { path: /b, type: and, list: [{ path: /c }] }
  - { path: /c, type: ok }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        for unit in graph.units() {
            for port in unit.ports() {
                assert!(port.index() < unit.index());
            }
        }
    }

    #[test]
    fn test_short_circuit_and_type_name() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: short-circuit-and, list: [{ path: /x }] }
  - { path: /x, type: warn }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        let root = graph.find_node("/root").unwrap();
        assert_eq!(root.ports().len(), 1);
    }

    #[test]
    fn test_missing_root_file() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir, "missing.yaml").unwrap_err();
        assert!(matches!(err, LoadError::RootFileNotFound(_)));
    }

    #[test]
    fn test_missing_included_file() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
files:
  - { path: $(dirname)/nowhere.yaml }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::FileNotFound(_)));
    }

    #[test]
    fn test_unknown_logic_type() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: quorum, list: [] }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::UnknownLogic(kind) if kind == "quorum"));
    }

    #[test]
    fn test_path_conflict() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /dup, type: ok }
  - { path: /dup, type: warn }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::PathConflict(path) if path == "/dup"));
    }

    #[test]
    fn test_link_not_found() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: and, list: [{ path: /ghost }] }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::LinkNotFound(path) if path == "/ghost"));
    }

    #[test]
    fn test_dependency_cycle() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /a, type: and, list: [{ path: /b }] }
  - { path: /b, type: and, list: [{ path: /a }] }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::UnitLoopFound(_)));
    }

    #[test]
    fn test_self_cycle() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /a, type: and, list: [{ path: /a }] }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::UnitLoopFound(_)));
    }

    #[test]
    fn test_link_chain_cycle() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: and, list: [{ path: /x }] }
  - { path: /x, type: link, link: /y }
  - { path: /y, type: link, link: /x }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::UnitLoopFound(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: warn-to-ok }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::FieldNotFound(field) if field.ends_with("item")));
    }

    #[test]
    fn test_wrong_field_shape() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: and, list: not-a-list }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::InvalidType { .. }));
    }

    #[test]
    fn test_empty_or_rejected() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: or, list: [] }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::InvalidType { .. }));
    }

    #[test]
    fn test_unknown_substitution_directive() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
files:
  - { path: $(find-pkg-share pkg)/sub.yaml }
"#,
        );
        let err = load(&dir, "root.yaml").unwrap_err();
        assert!(matches!(err, LoadError::UnknownSubstitution(_)));
    }

    #[test]
    fn test_dependent_is_not_a_dependency() {
        // A dependent back-edge that would be a cycle as a dependency.
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /a, type: and, list: [{ path: /b }] }
  - { path: /b, type: ok, dependent: /a }
"#,
        );

        let graph = load(&dir, "root.yaml").unwrap();
        let b = graph.find_node("/b").unwrap();
        assert!(b.dependent().is_some());
        assert!(b.ports().is_empty());
    }

    #[test]
    fn test_diag_leaf_levels_flow() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
nodes:
  - { path: /root, type: diag, diag: "test: input" }
diags:
  - { name: "test: input" }
"#,
        );

        let mut graph = load(&dir, "root.yaml").unwrap();
        let now = diagraph_types::Timestamp::ZERO;
        graph.update_reports(
            now,
            &[diagraph_types::DiagnosticReport::new(
                "test: input",
                DiagnosticLevel::Warn,
            )],
        );
        graph.update(now);
        assert_eq!(graph.level_of("/root"), Some(DiagnosticLevel::Warn));
    }

    #[test]
    fn test_file_tree_shape() {
        let dir = TempDir::new().unwrap();
        write_config(
            &dir,
            "root.yaml",
            r#"
files:
  - { path: $(dirname)/a.yaml }
  - { path: $(dirname)/b.yaml }
"#,
        );
        write_config(&dir, "a.yaml", "nodes: []\n");
        write_config(&dir, "b.yaml", "nodes: []\n");

        let loader = ConfigLoader::load(dir.path().join("root.yaml"), &LogicTable::builtin());
        let loader = loader.unwrap();
        assert_eq!(loader.file_tree().includes().len(), 2);
    }
}
