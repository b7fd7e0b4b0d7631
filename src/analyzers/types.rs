//! Type explicitness sub-issues

use crate::analyzers::{
    AnalysisContext, AnalysisError, Analyzer, count_penalty, percent, ratio_score,
};
use crate::ast::{FunctionNode, NodeVisitor, VariableNode, walk_function, walk_nodes};
use crate::config::CompiledConfig;
use crate::model::{Finding, Severity, SubIssueResult};

/// Per-file annotation statistics
struct AnnotationStats<'c> {
    config: &'c CompiledConfig,
    params: usize,
    annotated_params: usize,
    /// Exported functions, and those of them declaring a return type
    exported: usize,
    exported_with_return: usize,
    annotations: usize,
    /// (line, function or binding name, annotation)
    loose: Vec<(usize, String, String)>,
    missing_params: Vec<(usize, String, String)>,
    missing_returns: Vec<(usize, String)>,
}

impl<'c> AnnotationStats<'c> {
    fn new(config: &'c CompiledConfig) -> Self {
        Self {
            config,
            params: 0,
            annotated_params: 0,
            exported: 0,
            exported_with_return: 0,
            annotations: 0,
            loose: Vec::new(),
            missing_params: Vec::new(),
            missing_returns: Vec::new(),
        }
    }

    fn annotation(&mut self, line: usize, owner: &str, annotation: &str) {
        self.annotations += 1;
        if self.config.is_loose_type(annotation) {
            self.loose
                .push((line, owner.to_string(), annotation.trim().to_string()));
        }
    }
}

impl NodeVisitor for AnnotationStats<'_> {
    fn visit_function(&mut self, node: &FunctionNode) {
        for param in &node.params {
            self.params += 1;
            match &param.type_annotation {
                Some(annotation) => {
                    self.annotated_params += 1;
                    self.annotation(node.line, &node.name, annotation);
                }
                None => self
                    .missing_params
                    .push((node.line, node.name.clone(), param.name.clone())),
            }
        }

        if let Some(annotation) = &node.return_type {
            self.annotation(node.line, &node.name, annotation);
        }
        if node.exported {
            self.exported += 1;
            if node.return_type.is_some() {
                self.exported_with_return += 1;
            } else {
                self.missing_returns.push((node.line, node.name.clone()));
            }
        }

        walk_function(self, node);
    }

    fn visit_variable(&mut self, node: &VariableNode) {
        if let Some(annotation) = &node.type_annotation {
            self.annotation(node.line, &node.name, annotation);
        }
    }
}

/// Scores parameter annotations, return types and loose types
pub struct TypeAnalyzer;

impl Analyzer for TypeAnalyzer {
    fn name(&self) -> &'static str {
        "type_explicitness"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["type_annotations", "return_types", "loose_types"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let mut params = 0;
        let mut annotated_params = 0;
        let mut exported = 0;
        let mut exported_with_return = 0;
        let mut annotations = 0;
        let mut param_findings = Vec::new();
        let mut return_findings = Vec::new();
        let mut loose_findings = Vec::new();

        for file in ctx.model.files() {
            let mut stats = AnnotationStats::new(ctx.config);
            walk_nodes(&mut stats, &file.nodes);

            params += stats.params;
            annotated_params += stats.annotated_params;
            exported += stats.exported;
            exported_with_return += stats.exported_with_return;
            annotations += stats.annotations;

            param_findings.extend(stats.missing_params.into_iter().map(
                |(line, function, param)| {
                    Finding::new(
                        file.path.clone(),
                        format!("Parameter `{}` of `{}` has no type", param, function),
                        Severity::Info,
                    )
                    .at_line(line)
                },
            ));
            return_findings.extend(stats.missing_returns.into_iter().map(|(line, function)| {
                Finding::new(
                    file.path.clone(),
                    format!("Exported function `{}` has no return type", function),
                    Severity::Warning,
                )
                .at_line(line)
            }));
            loose_findings.extend(stats.loose.into_iter().map(|(line, owner, annotation)| {
                Finding::new(
                    file.path.clone(),
                    format!("`{}` uses loose type `{}`", owner, annotation),
                    Severity::Warning,
                )
                .at_line(line)
            }));
        }

        let annotated = ratio_score(annotated_params, params);
        let returns = ratio_score(exported_with_return, exported);
        let loose_count = loose_findings.len();
        let loose = count_penalty(loose_count, annotations, ctx.policy().loose_type_penalty);

        Ok(vec![
            SubIssueResult::new(
                "type_annotations",
                annotated,
                format!(
                    "{} of {} parameters are annotated ({})",
                    annotated_params,
                    params,
                    percent(annotated)
                ),
            )
            .with_findings(ctx.finalize(param_findings)),
            SubIssueResult::new(
                "return_types",
                returns,
                format!(
                    "{} of {} exported functions declare a return type ({})",
                    exported_with_return,
                    exported,
                    percent(returns)
                ),
            )
            .with_findings(ctx.finalize(return_findings)),
            SubIssueResult::new(
                "loose_types",
                loose,
                format!(
                    "{} of {} type annotations are loose",
                    loose_count, annotations
                ),
            )
            .with_findings(ctx.finalize(loose_findings)),
        ])
    }
}
