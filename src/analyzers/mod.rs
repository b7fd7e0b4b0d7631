//! Metric analyzer framework
//!
//! Every analyzer is a pure function of the source model, the import graph
//! and the scoring policy. Analyzers never share mutable state and never
//! depend on one another, so the registry runs them on the rayon pool and
//! joins their results in registry order.

use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{Bucket, CompiledConfig, ScoringPolicy, ThresholdBands};
use crate::graph::ImportGraph;
use crate::model::{Finding, Severity, SourceModel, SubIssueResult};

pub mod docs;
pub mod graph;
pub mod naming;
pub mod noise;
pub mod size;
pub mod surface;
pub mod types;

pub use docs::DocumentationAnalyzer;
pub use graph::{BarrelAnalyzer, CycleAnalyzer, DepthAnalyzer, LocalityAnalyzer};
pub use naming::NamingAnalyzer;
pub use noise::NoiseAnalyzer;
pub use size::{FileSizeAnalyzer, FunctionAnalyzer};
pub use surface::{ExportSurfaceAnalyzer, TestProximityAnalyzer};
pub use types::TypeAnalyzer;

/// Errors an analyzer can report instead of a score
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Missing data: {0}")]
    MissingData(String),
}

/// Read-only inputs shared by all analyzers
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub model: &'a SourceModel,
    pub graph: &'a ImportGraph,
    pub root: &'a Path,
    pub config: &'a CompiledConfig,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        model: &'a SourceModel,
        graph: &'a ImportGraph,
        root: &'a Path,
        config: &'a CompiledConfig,
    ) -> Self {
        Self {
            model,
            graph,
            root,
            config,
        }
    }

    pub fn policy(&self) -> &'a ScoringPolicy {
        &self.config.policy
    }

    /// Sort and cap findings with the configured limit
    pub fn finalize(&self, findings: Vec<Finding>) -> Vec<Finding> {
        finalize_findings(findings, self.config.policy.findings_cap)
    }
}

/// A pure producer of scored sub-issue results
pub trait Analyzer: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Sub-issue ids this analyzer produces, in output order
    fn sub_issue_ids(&self) -> &'static [&'static str];

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError>;
}

/// Run one analyzer, turning a failure into excluded results
pub fn run_analyzer(analyzer: &dyn Analyzer, ctx: &AnalysisContext<'_>) -> Vec<SubIssueResult> {
    let start = Instant::now();
    match analyzer.analyze(ctx) {
        Ok(results) => {
            debug!(
                "Analyzer {} produced {} result(s) in {:.2?}",
                analyzer.name(),
                results.len(),
                start.elapsed()
            );
            results
        }
        Err(e) => {
            warn!("Analyzer {} failed: {}", analyzer.name(), e);
            analyzer
                .sub_issue_ids()
                .iter()
                .map(|id| {
                    SubIssueResult::excluded(*id, format!("Analysis failed: {}", e)).with_findings(
                        vec![Finding::new(
                            ctx.root.display().to_string(),
                            format!("{} could not complete: {}", analyzer.name(), e),
                            Severity::Info,
                        )],
                    )
                })
                .collect()
        }
    }
}

/// The built-in analyzers in their canonical order
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(CycleAnalyzer),
        Box::new(DepthAnalyzer),
        Box::new(LocalityAnalyzer),
        Box::new(BarrelAnalyzer),
        Box::new(TestProximityAnalyzer),
        Box::new(FileSizeAnalyzer),
        Box::new(FunctionAnalyzer),
        Box::new(NamingAnalyzer),
        Box::new(TypeAnalyzer),
        Box::new(NoiseAnalyzer),
        Box::new(DocumentationAnalyzer),
        Box::new(ExportSurfaceAnalyzer),
    ]
}

/// Run analyzers in parallel; results keep the analyzers' order
pub fn run_all(analyzers: &[Box<dyn Analyzer>], ctx: &AnalysisContext<'_>) -> Vec<SubIssueResult> {
    analyzers
        .par_iter()
        .map(|analyzer| run_analyzer(analyzer.as_ref(), ctx))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

// ============================================================================
// Scoring helpers
// ============================================================================

/// Map a lower-is-better value through good/acceptable/bad bands
pub fn threshold_score(value: f64, bands: &ThresholdBands) -> f64 {
    if value <= bands.good {
        1.0
    } else if value <= bands.acceptable {
        0.7
    } else if value <= bands.bad {
        0.3
    } else {
        0.0
    }
}

/// Score of the first bucket whose `max` covers the value, else `floor`
pub fn bucket_score(value: f64, buckets: &[Bucket], floor: f64) -> f64 {
    buckets
        .iter()
        .find(|b| value <= b.max)
        .map_or(floor, |b| b.score)
}

/// Fraction of items meeting a criterion; an empty population scores 1.0
pub fn ratio_score(passing: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        passing as f64 / total as f64
    }
}

/// Penalty for a count scaled against project size, clamped to 0.0 - 1.0
pub fn count_penalty(count: usize, population: usize, multiplier: f64) -> f64 {
    if population == 0 {
        return 1.0;
    }
    (1.0 - (count as f64 / population as f64) * multiplier).clamp(0.0, 1.0)
}

/// Sort findings by severity then magnitude (both descending) and cap them
pub fn finalize_findings(mut findings: Vec<Finding>, cap: usize) -> Vec<Finding> {
    findings.sort_by(|a, b| {
        b.severity.cmp(&a.severity).then_with(|| {
            let a = a.value.unwrap_or(0.0);
            let b = b.value.unwrap_or(0.0);
            b.total_cmp(&a)
        })
    });
    findings.truncate(cap);
    findings
}

/// Format a fraction as a whole percentage
pub(crate) fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Shared fixtures for analyzer tests
#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use super::*;
    use crate::model::SourceFile;

    /// Run `analyzer` over the given files with default config
    pub fn run(analyzer: &dyn Analyzer, files: Vec<SourceFile>) -> Vec<SubIssueResult> {
        run_with(analyzer, files, &CompiledConfig::default())
    }

    pub fn run_with(
        analyzer: &dyn Analyzer,
        files: Vec<SourceFile>,
        config: &CompiledConfig,
    ) -> Vec<SubIssueResult> {
        let model = SourceModel::new(files);
        let graph = ImportGraph::build(&model);
        let ctx = AnalysisContext::new(&model, &graph, Path::new("/project"), config);
        run_analyzer(analyzer, &ctx)
    }

    pub fn result<'a>(results: &'a [SubIssueResult], id: &str) -> &'a SubIssueResult {
        results
            .iter()
            .find(|r| r.id == id)
            .unwrap_or_else(|| panic!("missing result {}", id))
    }
}
