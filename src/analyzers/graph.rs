//! Graph-derived sub-issues: cycles, depth, locality and barrel files

use crate::analyzers::{
    AnalysisContext, AnalysisError, Analyzer, bucket_score, count_penalty, percent,
};
use crate::graph::{closure_size, compute_depths, find_cycles};
use crate::model::{Finding, Severity, SubIssueResult};

/// Scores the share of files caught in import cycles
pub struct CycleAnalyzer;

impl Analyzer for CycleAnalyzer {
    fn name(&self) -> &'static str {
        "cycles"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["circular_dependencies"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let report = find_cycles(ctx.graph, policy.cycle_cap);
        let total = ctx.graph.node_count();
        let involved = report.files_in_cycles().len();

        // Unclamped, a large cyclic share goes below zero
        let score = count_penalty(involved, total, policy.cycle_penalty);

        let findings = report
            .cycles
            .iter()
            .map(|cycle| {
                let severity = if cycle.files.len() > 2 {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                Finding::new(
                    cycle.files[0].clone(),
                    format!("Circular import: {}", cycle),
                    severity,
                )
                .with_value(cycle.files.len() as f64)
            })
            .collect();

        let mut summary = if report.cycles.is_empty() {
            "No circular imports".to_string()
        } else {
            format!(
                "{} cycle(s) involving {} of {} files",
                report.cycles.len(),
                involved,
                total
            )
        };
        if report.truncated {
            summary.push_str(&format!(
                " (enumeration capped at {})",
                policy.cycle_cap
            ));
        }

        Ok(vec![
            SubIssueResult::new("circular_dependencies", score, summary)
                .with_findings(ctx.finalize(findings)),
        ])
    }
}

/// Scores the longest import chain in the project
pub struct DepthAnalyzer;

impl Analyzer for DepthAnalyzer {
    fn name(&self) -> &'static str {
        "depth"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["import_depth"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let report = compute_depths(ctx.graph);
        let score = bucket_score(
            report.max_depth as f64,
            &policy.depth_buckets,
            policy.depth_floor,
        );

        // Anything past the first bucket is worth pointing at
        let good_depth = policy.depth_buckets.first().map_or(0.0, |b| b.max);
        let findings = report
            .depths
            .iter()
            .filter(|(_, depth)| *depth as f64 > good_depth)
            .map(|(path, depth)| {
                Finding::new(
                    path.clone(),
                    format!("Import chain {} files deep", depth),
                    Severity::Warning,
                )
                .with_value(*depth as f64)
            })
            .collect();

        let summary = match &report.deepest {
            Some(path) if report.max_depth > 0 => {
                format!("Maximum import depth {} (from {})", report.max_depth, path)
            }
            _ => "No import chains".to_string(),
        };

        Ok(vec![
            SubIssueResult::new("import_depth", score, summary)
                .with_findings(ctx.finalize(findings)),
        ])
    }
}

/// Scores how many files a feature entry point pulls in
pub struct LocalityAnalyzer;

impl Analyzer for LocalityAnalyzer {
    fn name(&self) -> &'static str {
        "locality"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["feature_locality"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();

        let closures: Vec<(&str, usize)> = (0..ctx.graph.node_count())
            .filter(|&i| ctx.config.is_entry_file(ctx.graph.path(i)))
            .map(|i| (ctx.graph.path(i), closure_size(ctx.graph, i)))
            .collect();

        if closures.is_empty() {
            return Ok(vec![SubIssueResult::excluded(
                "feature_locality",
                "No entry files found",
            )]);
        }

        let average =
            closures.iter().map(|(_, size)| *size as f64).sum::<f64>() / closures.len() as f64;
        let score = bucket_score(average, &policy.locality_buckets, policy.locality_floor);

        let good_size = policy.locality_buckets.first().map_or(0.0, |b| b.max);
        let findings = closures
            .iter()
            .filter(|(_, size)| *size as f64 > good_size)
            .map(|(path, size)| {
                Finding::new(
                    path.to_string(),
                    format!("Entry point reaches {} files through its imports", size),
                    Severity::Warning,
                )
                .with_value(*size as f64)
            })
            .collect();

        Ok(vec![
            SubIssueResult::new(
                "feature_locality",
                score,
                format!(
                    "{} entry file(s) reach {:.1} files on average",
                    closures.len(),
                    average
                ),
            )
            .with_findings(ctx.finalize(findings)),
        ])
    }
}

/// Scores the share of index files that only re-export
pub struct BarrelAnalyzer;

impl Analyzer for BarrelAnalyzer {
    fn name(&self) -> &'static str {
        "barrels"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["barrel_files"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let mut findings = Vec::new();

        for file in ctx.model.files() {
            if !ctx.config.is_barrel_name(file.stem()) {
                continue;
            }
            let statements = file.statements().count();
            if statements == 0 {
                continue;
            }
            let reexports = file.statements().filter(|n| n.is_reexport()).count();
            let ratio = reexports as f64 / statements as f64;
            if ratio >= policy.barrel_ratio {
                findings.push(
                    Finding::new(
                        file.path.clone(),
                        format!(
                            "Barrel file: {} of {} statements are re-exports",
                            reexports, statements
                        ),
                        Severity::Warning,
                    )
                    .with_value(ratio),
                );
            }
        }

        let total = ctx.model.len();
        let barrels = findings.len();
        let score = count_penalty(barrels, total, policy.barrel_penalty);
        let summary = if barrels == 0 {
            "No barrel files".to_string()
        } else {
            format!(
                "{} barrel file(s), {} of all files",
                barrels,
                percent(barrels as f64 / total as f64)
            )
        };

        Ok(vec![
            SubIssueResult::new("barrel_files", score, summary)
                .with_findings(ctx.finalize(findings)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run, run_with};
    use crate::ast::{FunctionNode, ImportNode, Node, ReExportNode};
    use crate::config::{CompiledConfig, ReadinessConfig};
    use crate::model::{ImportTarget, SourceFile};

    fn file(path: &str, imports: &[&str]) -> SourceFile {
        imports.iter().fold(SourceFile::new(path), |f, target| {
            f.with_import(ImportTarget::unresolved(*target))
        })
    }

    fn reexport(line: usize) -> Node {
        Node::ReExport(ReExportNode {
            line,
            source: "./x".to_string(),
            names: vec!["X".to_string()],
            wildcard: false,
        })
    }

    fn statement(line: usize) -> Node {
        Node::Function(FunctionNode::new("f", line, line))
    }

    #[test]
    fn test_acyclic_scores_full() {
        let results = run(
            &CycleAnalyzer,
            vec![file("a.ts", &["./b"]), file("b.ts", &[])],
        );
        let r = result(&results, "circular_dependencies");
        assert_eq!(r.score, 1.0);
        assert!(r.findings.is_empty());
    }

    #[test]
    fn test_full_cycle_scores_zero() {
        let results = run(
            &CycleAnalyzer,
            vec![
                file("a.ts", &["./b"]),
                file("b.ts", &["./c"]),
                file("c.ts", &["./a"]),
            ],
        );
        let r = result(&results, "circular_dependencies");
        assert_eq!(r.score, 0.0);
        assert_eq!(r.findings.len(), 1);
        assert!(r.findings[0].message.contains("a.ts → b.ts → c.ts → a.ts"));
    }

    #[test]
    fn test_small_cycle_share_penalized() {
        // 2 of 20 files in a cycle: 1 - 0.1 * 5 = 0.5
        let mut files = vec![file("a.ts", &["./b"]), file("b.ts", &["./a"])];
        files.extend((0..18).map(|i| file(&format!("f{}.ts", i), &[])));
        let results = run(&CycleAnalyzer, files);
        let r = result(&results, "circular_dependencies");
        assert!((r.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cycle_cap_noted_in_summary() {
        let config = CompiledConfig::from_config(ReadinessConfig {
            policy: crate::config::ScoringPolicy {
                cycle_cap: 1,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();
        let results = run_with(
            &CycleAnalyzer,
            vec![
                file("a.ts", &["./b", "./c"]),
                file("b.ts", &["./a"]),
                file("c.ts", &["./a"]),
            ],
            &config,
        );
        let r = result(&results, "circular_dependencies");
        assert!(r.summary.contains("capped at 1"), "{}", r.summary);
    }

    #[test]
    fn test_depth_buckets() {
        let chain: Vec<SourceFile> = (0..8)
            .map(|i| {
                let next = format!("./f{}", i + 1);
                if i < 7 {
                    file(&format!("f{}.ts", i), &[next.as_str()])
                } else {
                    file(&format!("f{}.ts", i), &[])
                }
            })
            .collect();
        let results = run(&DepthAnalyzer, chain);
        let r = result(&results, "import_depth");
        // Max depth 7 falls in the <= 10 bucket
        assert_eq!(r.score, 0.7);
        assert_eq!(r.findings[0].file, "f0.ts");
        assert_eq!(r.findings[0].value, Some(7.0));
    }

    #[test]
    fn test_shallow_project_full_depth_score() {
        let results = run(&DepthAnalyzer, vec![file("a.ts", &["./b"]), file("b.ts", &[])]);
        assert_eq!(result(&results, "import_depth").score, 1.0);
    }

    #[test]
    fn test_locality_without_entries_is_excluded() {
        let results = run(&LocalityAnalyzer, vec![file("src/util.ts", &[])]);
        let r = result(&results, "feature_locality");
        assert!(r.excluded);
        assert_eq!(r.summary, "No entry files found");
    }

    #[test]
    fn test_locality_average_closure() {
        let mut files = vec![
            file("src/user_handler.ts", &["./svc0"]),
            file("src/order_handler.ts", &[]),
        ];
        // user_handler reaches a 12-file chain, order_handler reaches nothing: average 6
        for i in 0..12 {
            let next = format!("./svc{}", i + 1);
            let imports: Vec<&str> = if i < 11 { vec![next.as_str()] } else { vec![] };
            files.push(file(&format!("src/svc{}.ts", i), &imports));
        }
        let results = run(&LocalityAnalyzer, files);
        let r = result(&results, "feature_locality");
        assert!(!r.excluded);
        assert_eq!(r.score, 0.8);
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].file, "src/user_handler.ts");
    }

    #[test]
    fn test_barrel_at_half_is_flagged() {
        let barrel = SourceFile::new("src/index.ts")
            .with_node(reexport(1))
            .with_node(reexport(2))
            .with_node(statement(3))
            .with_node(statement(4));
        let results = run(&BarrelAnalyzer, vec![barrel]);
        let r = result(&results, "barrel_files");
        assert_eq!(r.findings.len(), 1);
    }

    #[test]
    fn test_index_at_forty_percent_is_not_barrel() {
        let index = SourceFile::new("src/index.ts")
            .with_node(reexport(1))
            .with_node(reexport(2))
            .with_node(statement(3))
            .with_node(statement(4))
            .with_node(statement(5));
        let results = run(&BarrelAnalyzer, vec![index]);
        let r = result(&results, "barrel_files");
        assert!(r.findings.is_empty());
        assert_eq!(r.score, 1.0);
    }

    #[test]
    fn test_non_index_reexports_ignored_and_share_penalized() {
        let mut files = vec![
            SourceFile::new("src/api/index.ts").with_node(reexport(1)),
            SourceFile::new("src/models.ts").with_node(reexport(1)),
        ];
        files.extend((0..18).map(|i| {
            SourceFile::new(format!("src/f{}.ts", i)).with_node(Node::Import(ImportNode {
                line: 1,
                specifier: "./models".to_string(),
            }))
        }));
        let results = run(&BarrelAnalyzer, files);
        let r = result(&results, "barrel_files");
        // 1 barrel of 20 files: 1 - 0.05 * 10 = 0.5
        assert_eq!(r.findings.len(), 1);
        assert!((r.score - 0.5).abs() < 1e-9);
    }
}
