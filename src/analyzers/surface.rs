//! File-layout sub-issues: test proximity and exported API surface

use std::collections::HashSet;

use crate::analyzers::{
    AnalysisContext, AnalysisError, Analyzer, percent, ratio_score, threshold_score,
};
use crate::ast::{Node, NodeVisitor, ReExportNode, TypeDeclNode, walk_nodes, walk_type_decl};
use crate::model::{Finding, Severity, SourceFile, SubIssueResult};

/// Directory names that hold tests
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__", "spec"];

/// Whether a path looks like a test file
pub fn is_test_file(file: &SourceFile) -> bool {
    let name = file.file_name();
    name.contains(".test.")
        || name.contains(".spec.")
        || file.stem().starts_with("test_")
        || file.stem().ends_with("_test")
        || file
            .directory()
            .split('/')
            .any(|segment| TEST_DIRS.contains(&segment))
}

/// Name of the file a test file covers (`user.test.ts` -> `user`)
fn test_subject(file: &SourceFile) -> &str {
    let stem = file.stem();
    stem.strip_prefix("test_")
        .or_else(|| stem.strip_suffix("_test"))
        .unwrap_or(stem)
}

/// Directory a test file sits next to, looking through a test directory
fn test_home(file: &SourceFile) -> &str {
    let dir = file.directory();
    match dir.rsplit_once('/') {
        Some((parent, last)) if TEST_DIRS.contains(&last) => parent,
        None if TEST_DIRS.contains(&dir) => "",
        _ => dir,
    }
}

#[derive(Default)]
struct InlineTestFinder {
    found: bool,
}

impl NodeVisitor for InlineTestFinder {
    fn visit_type_decl(&mut self, node: &TypeDeclNode) {
        if node.is_test {
            self.found = true;
        } else {
            walk_type_decl(self, node);
        }
    }
}

fn has_inline_tests(file: &SourceFile) -> bool {
    let mut finder = InlineTestFinder::default();
    walk_nodes(&mut finder, &file.nodes);
    finder.found
}

fn has_functions(file: &SourceFile) -> bool {
    file.nodes.iter().any(|n| match n {
        Node::Function(_) => true,
        Node::TypeDecl(t) => t.members.iter().any(|m| matches!(m, Node::Function(_))),
        _ => false,
    })
}

/// Scores how many source files have tests close by
pub struct TestProximityAnalyzer;

impl Analyzer for TestProximityAnalyzer {
    fn name(&self) -> &'static str {
        "test_proximity"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["test_proximity"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let (tests, sources): (Vec<&SourceFile>, Vec<&SourceFile>) =
            ctx.model.files().iter().partition(|f| is_test_file(f));

        // Tests next to their subject, and tests in a top-level test directory
        let local: HashSet<(&str, &str)> = tests
            .iter()
            .map(|t| (test_home(t), test_subject(t)))
            .collect();
        let top_level: HashSet<&str> = tests
            .iter()
            .filter(|t| test_home(t).is_empty())
            .map(|t| test_subject(t))
            .collect();

        let candidates: Vec<&SourceFile> =
            sources.into_iter().filter(|f| has_functions(f)).collect();
        if candidates.is_empty() {
            return Ok(vec![SubIssueResult::excluded(
                "test_proximity",
                "No source files with functions",
            )]);
        }

        let mut findings = Vec::new();
        let mut covered = 0;
        for file in &candidates {
            let stem = file.stem();
            if has_inline_tests(file)
                || local.contains(&(file.directory(), stem))
                || top_level.contains(stem)
            {
                covered += 1;
            } else {
                findings.push(
                    Finding::new(file.path.clone(), "No nearby tests", Severity::Info)
                        .with_value(file.line_count as f64),
                );
            }
        }

        let score = ratio_score(covered, candidates.len());
        Ok(vec![
            SubIssueResult::new(
                "test_proximity",
                score,
                format!(
                    "{} of {} source files have nearby tests ({})",
                    covered,
                    candidates.len(),
                    percent(score)
                ),
            )
            .with_findings(ctx.finalize(findings)),
        ])
    }
}

/// Top-level re-export statements of a file
fn reexports(nodes: &[Node]) -> impl Iterator<Item = &ReExportNode> {
    nodes.iter().filter_map(|n| match n {
        Node::ReExport(r) => Some(r),
        _ => None,
    })
}

/// Scores the size of each file's public surface and re-export hygiene
pub struct ExportSurfaceAnalyzer;

impl Analyzer for ExportSurfaceAnalyzer {
    fn name(&self) -> &'static str {
        "export_surface"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["export_surface", "wildcard_reexports"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let files: Vec<&SourceFile> = ctx
            .model
            .files()
            .iter()
            .filter(|f| !is_test_file(f))
            .collect();

        // Export surface
        let total_exports: usize = files.iter().map(|f| f.exports.len()).sum();
        let average = if files.is_empty() {
            0.0
        } else {
            total_exports as f64 / files.len() as f64
        };
        let surface_findings = files
            .iter()
            .filter(|f| f.exports.len() as f64 > policy.exports_per_file.good)
            .map(|f| {
                Finding::new(
                    f.path.clone(),
                    format!("Exports {} symbols", f.exports.len()),
                    Severity::Warning,
                )
                .with_value(f.exports.len() as f64)
            })
            .collect();
        let surface = SubIssueResult::new(
            "export_surface",
            threshold_score(average, &policy.exports_per_file),
            format!("{:.1} exported symbols per file on average", average),
        )
        .with_findings(ctx.finalize(surface_findings));

        // Wildcard re-exports
        let mut total = 0;
        let mut wildcard_findings = Vec::new();
        for file in &files {
            for reexport in reexports(&file.nodes) {
                total += 1;
                if reexport.wildcard {
                    wildcard_findings.push(
                        Finding::new(
                            file.path.clone(),
                            format!("Wildcard re-export of {}", reexport.source),
                            Severity::Warning,
                        )
                        .at_line(reexport.line),
                    );
                }
            }
        }
        let wildcards = wildcard_findings.len();
        let wildcard = SubIssueResult::new(
            "wildcard_reexports",
            ratio_score(total - wildcards, total),
            if total == 0 {
                "No re-exports".to_string()
            } else {
                format!("{} of {} re-exports are wildcards", wildcards, total)
            },
        )
        .with_findings(ctx.finalize(wildcard_findings));

        Ok(vec![surface, wildcard])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run};
    use crate::ast::{FunctionNode, TypeKind};

    fn with_function(path: &str) -> SourceFile {
        SourceFile::new(path).with_node(Node::Function(FunctionNode::new("run", 1, 3)))
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(&SourceFile::new("src/user.test.ts")));
        assert!(is_test_file(&SourceFile::new("src/__tests__/user.ts")));
        assert!(is_test_file(&SourceFile::new("tests/integration.rs")));
        assert!(is_test_file(&SourceFile::new("pkg/test_models.py")));
        assert!(!is_test_file(&SourceFile::new("src/user.ts")));
        assert!(!is_test_file(&SourceFile::new("src/testing.ts")));
    }

    #[test]
    fn test_proximity_ratio() {
        let mut inline = TypeDeclNode::new("tests", 10, TypeKind::Module);
        inline.is_test = true;

        let results = run(
            &TestProximityAnalyzer,
            vec![
                with_function("src/user.ts"),
                SourceFile::new("src/user.test.ts"),
                with_function("src/order.ts"),
                SourceFile::new("src/__tests__/order.ts"),
                with_function("src/pool.rs").with_node(Node::TypeDecl(inline)),
                with_function("src/config.rs"),
                SourceFile::new("src/types.ts"),
            ],
        );
        let r = result(&results, "test_proximity");
        assert_eq!(r.score, 0.75);
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].file, "src/config.rs");
    }

    #[test]
    fn test_top_level_tests_directory() {
        let results = run(
            &TestProximityAnalyzer,
            vec![with_function("src/parser.rs"), SourceFile::new("tests/parser.rs")],
        );
        assert_eq!(result(&results, "test_proximity").score, 1.0);
    }

    #[test]
    fn test_proximity_without_candidates_is_excluded() {
        let results = run(&TestProximityAnalyzer, vec![SourceFile::new("src/types.ts")]);
        assert!(result(&results, "test_proximity").excluded);
    }

    #[test]
    fn test_export_surface_average() {
        let wide = (0..30).fold(SourceFile::new("src/api.ts"), |f, i| {
            f.with_export(format!("item{}", i))
        });
        let results = run(
            &ExportSurfaceAnalyzer,
            vec![wide, SourceFile::new("src/a.ts").with_export("A")],
        );
        let r = result(&results, "export_surface");
        // Average 15.5 falls in the acceptable band
        assert_eq!(r.score, 0.7);
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].value, Some(30.0));
    }

    #[test]
    fn test_wildcard_reexports() {
        let reexport = |line, wildcard| {
            Node::ReExport(ReExportNode {
                line,
                source: "./models".to_string(),
                names: Vec::new(),
                wildcard,
            })
        };
        let results = run(
            &ExportSurfaceAnalyzer,
            vec![
                SourceFile::new("src/index.ts")
                    .with_node(reexport(1, true))
                    .with_node(reexport(2, false))
                    .with_node(reexport(3, false))
                    .with_node(reexport(4, false)),
            ],
        );
        let r = result(&results, "wildcard_reexports");
        assert_eq!(r.score, 0.75);
        assert_eq!(r.findings[0].line, Some(1));
    }

    #[test]
    fn test_no_reexports_scores_full() {
        let results = run(&ExportSurfaceAnalyzer, vec![SourceFile::new("a.ts")]);
        let r = result(&results, "wildcard_reexports");
        assert_eq!(r.score, 1.0);
        assert_eq!(r.summary, "No re-exports");
    }
}
