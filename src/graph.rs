//! Import graph construction and traversal
//!
//! Files are stored as an arena of integer-indexed nodes in source model
//! order, with adjacency lists in first-import order. Every traversal keeps
//! its state in a context local to the call and uses an explicit stack, so
//! results are deterministic and deep graphs cannot overflow the call stack.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;

use crate::model::{ImportTarget, SourceFile, SourceModel};

/// Extensions tried when resolving a relative specifier without one
const RESOLVE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs"];

/// Directory index files tried when a relative specifier names a directory
const DIRECTORY_INDEXES: &[&str] = &[
    "index.ts",
    "index.tsx",
    "index.js",
    "index.jsx",
    "mod.rs",
    "__init__.py",
];

/// A directed edge between two project files
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportEdge {
    pub from: String,
    pub to: String,
}

/// Directed graph of intra-project file dependencies
#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    paths: Vec<String>,
    edges: Vec<Vec<usize>>,
}

impl ImportGraph {
    /// Build the graph from a source model.
    ///
    /// Imports that resolve to no known file, or to the importing file
    /// itself, are dropped. Repeated imports of one target form one edge.
    pub fn build(model: &SourceModel) -> Self {
        let paths: Vec<String> = model.files().iter().map(|f| f.path.clone()).collect();
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); paths.len()];

        for (from, file) in model.files().iter().enumerate() {
            for import in &file.imports {
                let Some(to) = resolve_import(model, file, import) else {
                    continue;
                };
                if to != from && !edges[from].contains(&to) {
                    edges[from].push(to);
                }
            }
        }

        Self { paths, edges }
    }

    /// Build a graph directly from adjacency lists (test and bench helper).
    ///
    /// Targets not present as keys are ignored, as are self edges.
    pub fn from_adjacency(adjacency: &[(&str, &[&str])]) -> Self {
        let paths: Vec<String> = adjacency.iter().map(|(p, _)| p.to_string()).collect();
        let position = |path: &str| paths.iter().position(|p| p == path);
        let mut edges = vec![Vec::new(); paths.len()];
        for (from, (_, targets)) in adjacency.iter().enumerate() {
            for target in *targets {
                if let Some(to) = position(target)
                    && to != from
                    && !edges[from].contains(&to)
                {
                    edges[from].push(to);
                }
            }
        }
        Self { paths, edges }
    }

    pub fn node_count(&self) -> usize {
        self.paths.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    pub fn path(&self, index: usize) -> &str {
        &self.paths[index]
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.paths.iter().position(|p| p == path)
    }

    /// Direct dependencies of a node, in first-import order
    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.edges[index]
    }

    /// Direct dependencies of a file by path
    pub fn dependencies(&self, path: &str) -> Vec<&str> {
        self.index_of(path)
            .map(|i| self.edges[i].iter().map(|&j| self.paths[j].as_str()).collect())
            .unwrap_or_default()
    }

    /// All edges in source order
    pub fn edges(&self) -> Vec<ImportEdge> {
        self.edges
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |&to| ImportEdge {
                    from: self.paths[from].clone(),
                    to: self.paths[to].clone(),
                })
            })
            .collect()
    }

    /// Path -> set of direct dependencies, one key per file
    pub fn to_map(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.paths
            .iter()
            .enumerate()
            .map(|(i, path)| {
                let deps = self.edges[i].iter().map(|&j| self.paths[j].clone()).collect();
                (path.clone(), deps)
            })
            .collect()
    }
}

/// Resolve one import of `file` to the index of a known file
fn resolve_import(model: &SourceModel, file: &SourceFile, import: &ImportTarget) -> Option<usize> {
    if let Some(resolved) = &import.resolved
        && let Some(index) = model.position(resolved)
    {
        return Some(index);
    }

    if !import.is_relative() {
        return None;
    }

    let base = normalize_path(&join_path(file.directory(), &import.specifier))?;
    if let Some(index) = model.position(&base) {
        return Some(index);
    }
    for ext in RESOLVE_EXTENSIONS {
        if let Some(index) = model.position(&format!("{}.{}", base, ext)) {
            return Some(index);
        }
    }
    for index_name in DIRECTORY_INDEXES {
        let candidate = if base.is_empty() {
            index_name.to_string()
        } else {
            format!("{}/{}", base, index_name)
        };
        if let Some(index) = model.position(&candidate) {
            return Some(index);
        }
    }
    None
}

fn join_path(dir: &str, specifier: &str) -> String {
    if dir.is_empty() {
        specifier.to_string()
    } else {
        format!("{}/{}", dir, specifier)
    }
}

/// Collapse `.` and `..` segments. Returns `None` when the path escapes the root.
fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.join("/"))
}

/// A closed loop of imports; the last file imports the first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub files: Vec<String>,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.files.join(" → "))?;
        if let Some(first) = self.files.first() {
            write!(f, " → {}", first)?;
        }
        Ok(())
    }
}

/// Result of cycle enumeration
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Cycles in discovery order
    pub cycles: Vec<Cycle>,
    /// Enumeration stopped at the cap
    pub truncated: bool,
}

impl CycleReport {
    /// Distinct files appearing in any reported cycle, sorted
    pub fn files_in_cycles(&self) -> BTreeSet<&str> {
        self.cycles
            .iter()
            .flat_map(|c| c.files.iter().map(String::as_str))
            .collect()
    }
}

/// Enumerate import cycles, stopping after `cap` cycles.
///
/// Depth-first from every unvisited node in model order, following edges in
/// import order. Reaching a node already on the current path emits the path
/// suffix starting at that node.
pub fn find_cycles(graph: &ImportGraph, cap: usize) -> CycleReport {
    let n = graph.node_count();
    let mut report = CycleReport::default();
    let mut visited = vec![false; n];
    // Position on the current path, if on it
    let mut on_path: Vec<Option<usize>> = vec![None; n];

    for start in 0..n {
        if visited[start] {
            continue;
        }

        let mut path: Vec<usize> = vec![start];
        // (node, next edge to follow)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        visited[start] = true;
        on_path[start] = Some(0);

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let neighbors = graph.neighbors(node);

            if next >= neighbors.len() {
                stack.pop();
                path.pop();
                on_path[node] = None;
                continue;
            }
            frame.1 += 1;

            let target = neighbors[next];
            if let Some(pos) = on_path[target] {
                if report.cycles.len() >= cap {
                    report.truncated = true;
                    return report;
                }
                report.cycles.push(Cycle {
                    files: path[pos..]
                        .iter()
                        .map(|&i| graph.path(i).to_string())
                        .collect(),
                });
            } else if !visited[target] {
                visited[target] = true;
                on_path[target] = Some(path.len());
                path.push(target);
                stack.push((target, 0));
            }
        }
    }

    report
}

/// Import depth of every file
#[derive(Debug, Clone, Default)]
pub struct DepthReport {
    /// (path, depth) in model order
    pub depths: Vec<(String, usize)>,
    pub max_depth: usize,
    /// First file (in model order) reaching the maximum depth
    pub deepest: Option<String>,
}

impl DepthReport {
    pub fn depth_of(&self, path: &str) -> Option<usize> {
        self.depths.iter().find(|(p, _)| p == path).map(|(_, d)| *d)
    }
}

/// Compute the longest import chain below every file.
///
/// Leaves have depth 0; any other file is one more than its deepest direct
/// dependency. A dependency already on the current traversal path counts
/// as 0, so cycle edges never extend depth. Finalized depths are memoized
/// across traversals.
pub fn compute_depths(graph: &ImportGraph) -> DepthReport {
    let n = graph.node_count();
    let mut memo: Vec<Option<usize>> = vec![None; n];
    let mut on_path = vec![false; n];

    for start in 0..n {
        if memo[start].is_some() {
            continue;
        }

        // (node, next edge, deepest child value so far)
        let mut stack: Vec<(usize, usize, Option<usize>)> = vec![(start, 0, None)];
        on_path[start] = true;

        while let Some(frame) = stack.last_mut() {
            let (node, next, best) = *frame;
            let neighbors = graph.neighbors(node);

            if next < neighbors.len() {
                frame.1 += 1;
                let child = neighbors[next];
                if let Some(depth) = memo[child] {
                    frame.2 = Some(best.map_or(depth, |b| b.max(depth)));
                } else if on_path[child] {
                    frame.2 = Some(best.unwrap_or(0));
                } else {
                    on_path[child] = true;
                    stack.push((child, 0, None));
                }
                continue;
            }

            let depth = best.map_or(0, |b| b + 1);
            memo[node] = Some(depth);
            on_path[node] = false;
            stack.pop();

            if let Some(parent) = stack.last_mut() {
                parent.2 = Some(parent.2.map_or(depth, |b| b.max(depth)));
            }
        }
    }

    let mut report = DepthReport::default();
    for (i, depth) in memo.into_iter().enumerate() {
        let depth = depth.unwrap_or(0);
        if report.deepest.is_none() || depth > report.max_depth {
            report.max_depth = depth;
            report.deepest = Some(graph.path(i).to_string());
        }
        report.depths.push((graph.path(i).to_string(), depth));
    }
    report
}

/// Number of distinct files reachable from `start`, excluding `start` itself
pub fn closure_size(graph: &ImportGraph, start: usize) -> usize {
    let mut seen = vec![false; graph.node_count()];
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    let mut count = 0;

    while let Some(node) = queue.pop_front() {
        for &next in graph.neighbors(node) {
            if !seen[next] {
                seen[next] = true;
                count += 1;
                queue.push_back(next);
            }
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceFile;

    fn names(cycle: &Cycle) -> Vec<&str> {
        cycle.files.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_build_resolves_and_dedups() {
        let model = SourceModel::new(vec![
            SourceFile::new("src/app.ts")
                .with_import(ImportTarget::unresolved("./user"))
                .with_import(ImportTarget::unresolved("./user.ts"))
                .with_import(ImportTarget::unresolved("react"))
                .with_import(ImportTarget::unresolved("./app")),
            SourceFile::new("src/user.ts").with_import(ImportTarget::unresolved("../lib")),
            SourceFile::new("lib/index.ts"),
        ]);

        let graph = ImportGraph::build(&model);
        let map = graph.to_map();

        assert_eq!(map.len(), 3);
        assert_eq!(graph.dependencies("src/app.ts"), vec!["src/user.ts"]);
        assert_eq!(graph.dependencies("src/user.ts"), vec!["lib/index.ts"]);
        assert!(map["lib/index.ts"].is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_build_uses_front_end_resolution() {
        let model = SourceModel::new(vec![
            SourceFile::new("src/lib.rs")
                .with_import(ImportTarget::resolved("crate::db", "src/db.rs"))
                .with_import(ImportTarget::resolved("crate::gone", "src/gone.rs")),
            SourceFile::new("src/db.rs"),
        ]);

        let graph = ImportGraph::build(&model);
        assert_eq!(graph.dependencies("src/lib.rs"), vec!["src/db.rs"]);
    }

    #[test]
    fn test_relative_import_escaping_root_is_dropped() {
        let model = SourceModel::new(vec![
            SourceFile::new("a.ts").with_import(ImportTarget::unresolved("../../b")),
            SourceFile::new("b.ts"),
        ]);
        let graph = ImportGraph::build(&model);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_self_import_dropped() {
        let model = SourceModel::new(vec![
            SourceFile::new("a.ts").with_import(ImportTarget::resolved("./a", "a.ts")),
        ]);
        let graph = ImportGraph::build(&model);
        assert!(graph.dependencies("a.ts").is_empty());
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = ImportGraph::from_adjacency(&[("a", &["b", "c"]), ("b", &["c"]), ("c", &[])]);
        let report = find_cycles(&graph, 50);
        assert!(report.cycles.is_empty());
        assert!(!report.truncated);
    }

    #[test]
    fn test_three_node_cycle() {
        let graph = ImportGraph::from_adjacency(&[("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let report = find_cycles(&graph, 50);
        assert_eq!(report.cycles.len(), 1);
        assert_eq!(names(&report.cycles[0]), vec!["A", "B", "C"]);
        assert_eq!(report.cycles[0].to_string(), "A → B → C → A");
        assert_eq!(report.files_in_cycles().len(), 3);
    }

    #[test]
    fn test_cycle_discovery_order() {
        let graph = ImportGraph::from_adjacency(&[
            ("x", &["y"]),
            ("y", &["x", "z"]),
            ("z", &["w"]),
            ("w", &["z"]),
        ]);
        let report = find_cycles(&graph, 50);
        assert_eq!(report.cycles.len(), 2);
        assert_eq!(names(&report.cycles[0]), vec!["x", "y"]);
        assert_eq!(names(&report.cycles[1]), vec!["z", "w"]);
    }

    #[test]
    fn test_cycle_cap_truncates() {
        let graph = ImportGraph::from_adjacency(&[
            ("a", &["b", "c", "d"]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["a"]),
        ]);
        let report = find_cycles(&graph, 2);
        assert_eq!(report.cycles.len(), 2);
        assert!(report.truncated);

        let full = find_cycles(&graph, 50);
        assert_eq!(full.cycles.len(), 3);
        assert!(!full.truncated);
    }

    #[test]
    fn test_isolated_file_depth_zero() {
        let graph = ImportGraph::from_adjacency(&[("solo", &[])]);
        let report = compute_depths(&graph);
        assert_eq!(report.depth_of("solo"), Some(0));
        assert_eq!(report.max_depth, 0);
    }

    #[test]
    fn test_diamond_depths() {
        let graph = ImportGraph::from_adjacency(&[
            ("A", &["B", "C"]),
            ("B", &["D"]),
            ("C", &["D"]),
            ("D", &[]),
        ]);
        let report = compute_depths(&graph);
        assert_eq!(report.depth_of("D"), Some(0));
        assert_eq!(report.depth_of("B"), Some(1));
        assert_eq!(report.depth_of("C"), Some(1));
        assert_eq!(report.depth_of("A"), Some(2));
        assert_eq!(report.max_depth, 2);
        assert_eq!(report.deepest.as_deref(), Some("A"));
    }

    #[test]
    fn test_cycle_edges_do_not_extend_depth() {
        // A -> B -> A: B sees A on the path (0), so B = 1 and A = 2
        let graph = ImportGraph::from_adjacency(&[("A", &["B"]), ("B", &["A"])]);
        let report = compute_depths(&graph);
        assert_eq!(report.depth_of("B"), Some(1));
        assert_eq!(report.depth_of("A"), Some(2));
    }

    #[test]
    fn test_long_chain_does_not_recurse() {
        let names: Vec<String> = (0..5000).map(|i| format!("f{}", i)).collect();
        let targets: Vec<[&str; 1]> = (0..5000)
            .map(|i| [names.get(i + 1).map(String::as_str).unwrap_or("none")])
            .collect();
        let adjacency: Vec<(&str, &[&str])> = names
            .iter()
            .zip(targets.iter())
            .map(|(n, t)| (n.as_str(), &t[..]))
            .collect();
        let graph = ImportGraph::from_adjacency(&adjacency);

        assert_eq!(compute_depths(&graph).max_depth, 4999);
        assert_eq!(closure_size(&graph, 0), 4999);
    }

    #[test]
    fn test_closure_size_excludes_start() {
        let graph = ImportGraph::from_adjacency(&[
            ("entry", &["svc"]),
            ("svc", &["db", "entry"]),
            ("db", &[]),
            ("other", &[]),
        ]);
        assert_eq!(closure_size(&graph, 0), 2);
        assert_eq!(closure_size(&graph, 3), 0);
    }
}
