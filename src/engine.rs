//! One-pass orchestration: source model -> graph -> analyzers -> report

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::analyzers::{AnalysisContext, Analyzer, default_analyzers, run_all};
use crate::config::CompiledConfig;
use crate::graph::ImportGraph;
use crate::model::{Report, ReportMetadata, SourceModel, SubIssueResult};
use crate::rubric::Rubric;
use crate::scoring::aggregate;

/// Version string recorded in every report
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Scores a source model against a rubric
///
/// The engine holds only configuration; every run is independent and reads
/// nothing but its arguments, so identical inputs give identical reports.
pub struct Engine {
    config: CompiledConfig,
    rubric: Rubric,
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Engine {
    pub fn new(config: CompiledConfig, rubric: Rubric) -> Self {
        Self {
            config,
            rubric,
            analyzers: default_analyzers(),
        }
    }

    /// Register an extra analyzer, run after the built-in ones
    pub fn with_analyzer(mut self, analyzer: Box<dyn Analyzer>) -> Self {
        self.analyzers.push(analyzer);
        self
    }

    pub fn config(&self) -> &CompiledConfig {
        &self.config
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Run the analyzers only, returning results in registry order
    pub fn analyze(&self, model: &SourceModel, graph: &ImportGraph, root: &Path) -> Vec<SubIssueResult> {
        let ctx = AnalysisContext::new(model, graph, root, &self.config);
        run_all(&self.analyzers, &ctx)
    }

    /// Score `model` with the static analyzers alone
    pub fn run(&self, model: &SourceModel, root: &Path) -> Report {
        self.run_with(model, root, Vec::new())
    }

    /// Score `model`, merging externally evaluated results (such as LLM
    /// judgements) after the static ones so they take precedence
    pub fn run_with(
        &self,
        model: &SourceModel,
        root: &Path,
        external: Vec<SubIssueResult>,
    ) -> Report {
        let start = Instant::now();

        let graph = ImportGraph::build(model);
        debug!(
            "Import graph: {} files, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        let mut results = self.analyze(model, &graph, root);
        for result in &external {
            if self.rubric.find_sub_issue(&result.id).is_none() {
                warn!("Ignoring result for unknown sub-issue {}", result.id);
            }
        }
        results.extend(external);

        let aggregation = aggregate(&results, &self.rubric, &self.config.scoring);

        info!(
            "Scored {} files ({} import edges): {:.2}/{:.0} in {:.2?}",
            model.len(),
            graph.edge_count(),
            aggregation.overall_score,
            self.rubric.max_score(),
            start.elapsed()
        );

        Report {
            overall_score: aggregation.overall_score,
            categories: aggregation.categories,
            recommendations: aggregation.recommendations,
            metadata: ReportMetadata {
                engine_version: ENGINE_VERSION.to_string(),
                rubric_version: self.rubric.version.clone(),
                root: root.display().to_string(),
                file_count: model.len(),
                edge_count: graph.edge_count(),
                generated_at: None,
            },
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(CompiledConfig::default(), Rubric::standard())
    }
}
