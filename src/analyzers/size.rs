//! File and function size sub-issues

use crate::analyzers::{
    AnalysisContext, AnalysisError, Analyzer, count_penalty, percent, ratio_score,
    threshold_score,
};
use crate::ast::functions;
use crate::model::{Finding, Severity, SubIssueResult};

/// Nearest-rank percentile of an unsorted sample; 0 for an empty sample
fn percentile(mut values: Vec<usize>, pct: f64) -> usize {
    if values.is_empty() {
        return 0;
    }
    values.sort_unstable();
    let rank = ((pct / 100.0) * values.len() as f64).ceil() as usize;
    values[rank.clamp(1, values.len()) - 1]
}

/// Scores typical and worst-case file length
pub struct FileSizeAnalyzer;

impl Analyzer for FileSizeAnalyzer {
    fn name(&self) -> &'static str {
        "file_size"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["file_length", "oversized_files"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let files = ctx.model.files();

        let p90 = percentile(files.iter().map(|f| f.line_count).collect(), 90.0);
        let long_files = files
            .iter()
            .filter(|f| f.line_count as f64 > policy.file_length.good)
            .map(|f| {
                Finding::new(
                    f.path.clone(),
                    format!("{} lines", f.line_count),
                    Severity::Info,
                )
                .with_value(f.line_count as f64)
            })
            .collect();
        let file_length = SubIssueResult::new(
            "file_length",
            threshold_score(p90 as f64, &policy.file_length),
            format!("90% of files have at most {} lines", p90),
        )
        .with_findings(ctx.finalize(long_files));

        let oversized: Vec<Finding> = files
            .iter()
            .filter(|f| f.line_count > policy.oversized_file_lines)
            .map(|f| {
                Finding::new(
                    f.path.clone(),
                    format!(
                        "{} lines exceeds the {}-line limit",
                        f.line_count, policy.oversized_file_lines
                    ),
                    Severity::Warning,
                )
                .with_value(f.line_count as f64)
            })
            .collect();
        let count = oversized.len();
        let oversized_files = SubIssueResult::new(
            "oversized_files",
            count_penalty(count, files.len(), policy.oversized_penalty),
            format!(
                "{} of {} files exceed {} lines",
                count,
                files.len(),
                policy.oversized_file_lines
            ),
        )
        .with_findings(ctx.finalize(oversized));

        Ok(vec![file_length, oversized_files])
    }
}

/// Scores function length and parameter count
pub struct FunctionAnalyzer;

impl Analyzer for FunctionAnalyzer {
    fn name(&self) -> &'static str {
        "function_design"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["function_length", "parameter_count"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();

        let mut total = 0;
        let mut long_functions = Vec::new();
        let mut wide_functions = Vec::new();

        for file in ctx.model.files() {
            for function in functions(&file.nodes) {
                if function.end_line < function.line {
                    return Err(AnalysisError::MalformedInput(format!(
                        "{}: function `{}` ends on line {} before it starts on line {}",
                        file.path, function.name, function.end_line, function.line
                    )));
                }
                total += 1;

                let length = function.length();
                if length > policy.max_function_lines {
                    long_functions.push(
                        Finding::new(
                            file.path.clone(),
                            format!("Function `{}` spans {} lines", function.name, length),
                            Severity::Warning,
                        )
                        .at_line(function.line)
                        .with_value(length as f64),
                    );
                }

                let params = function.params.len();
                if params > policy.max_params {
                    wide_functions.push(
                        Finding::new(
                            file.path.clone(),
                            format!("Function `{}` takes {} parameters", function.name, params),
                            Severity::Warning,
                        )
                        .at_line(function.line)
                        .with_value(params as f64),
                    );
                }
            }
        }

        let short = ratio_score(total - long_functions.len(), total);
        let narrow = ratio_score(total - wide_functions.len(), total);

        Ok(vec![
            SubIssueResult::new(
                "function_length",
                short,
                format!(
                    "{} of {} functions are longer than {} lines ({} within limit)",
                    long_functions.len(),
                    total,
                    policy.max_function_lines,
                    percent(short)
                ),
            )
            .with_findings(ctx.finalize(long_functions)),
            SubIssueResult::new(
                "parameter_count",
                narrow,
                format!(
                    "{} of {} functions take more than {} parameters ({} within limit)",
                    wide_functions.len(),
                    total,
                    policy.max_params,
                    percent(narrow)
                ),
            )
            .with_findings(ctx.finalize(wide_functions)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run};
    use crate::ast::{FunctionNode, Node, Param, TypeDeclNode, TypeKind};
    use crate::model::SourceFile;

    #[test]
    fn test_percentile_nearest_rank() {
        assert_eq!(percentile(vec![], 90.0), 0);
        assert_eq!(percentile(vec![7], 90.0), 7);
        assert_eq!(percentile((1..=10).collect(), 90.0), 9);
        assert_eq!(percentile((1..=20).rev().collect(), 90.0), 18);
    }

    #[test]
    fn test_file_length_uses_p90() {
        // Nine short files and one huge one: the p90 stays small
        let mut files: Vec<SourceFile> = (0..9)
            .map(|i| SourceFile::new(format!("src/f{}.ts", i)).with_line_count(100))
            .collect();
        files.push(SourceFile::new("src/huge.ts").with_line_count(2000));

        let results = run(&FileSizeAnalyzer, files);
        let length = result(&results, "file_length");
        assert_eq!(length.score, 1.0);
        assert_eq!(length.findings.len(), 1);

        // 1 of 10 files oversized, x5 penalty
        let oversized = result(&results, "oversized_files");
        assert_eq!(oversized.score, 0.5);
        assert_eq!(oversized.findings[0].file, "src/huge.ts");
    }

    #[test]
    fn test_file_length_bands() {
        let files = (0..4)
            .map(|i| SourceFile::new(format!("f{}.rs", i)).with_line_count(600))
            .collect();
        let results = run(&FileSizeAnalyzer, files);
        assert_eq!(result(&results, "file_length").score, 0.3);
        assert_eq!(result(&results, "oversized_files").score, 0.0);
    }

    #[test]
    fn test_function_length_and_params() {
        let mut wide = FunctionNode::new("configure", 1, 10);
        wide.params = (0..6)
            .map(|i| Param::new(format!("p{}", i), Some("u32")))
            .collect();

        let mut class = TypeDeclNode::new("Service", 20, TypeKind::Class);
        class
            .members
            .push(Node::Function(FunctionNode::new("handle", 21, 120)));

        let file = SourceFile::new("src/service.ts")
            .with_node(Node::Function(wide))
            .with_node(Node::TypeDecl(class))
            .with_node(Node::Function(FunctionNode::new("small", 130, 135)))
            .with_node(Node::Function(FunctionNode::new("tiny", 140, 141)));

        let results = run(&FunctionAnalyzer, vec![file]);

        let length = result(&results, "function_length");
        assert_eq!(length.score, 0.75);
        assert_eq!(length.findings[0].line, Some(21));
        assert_eq!(length.findings[0].value, Some(100.0));

        let params = result(&results, "parameter_count");
        assert_eq!(params.score, 0.75);
        assert!(params.findings[0].message.contains("configure"));
    }

    #[test]
    fn test_no_functions_scores_full() {
        let results = run(&FunctionAnalyzer, vec![SourceFile::new("a.ts")]);
        assert_eq!(result(&results, "function_length").score, 1.0);
        assert_eq!(result(&results, "parameter_count").score, 1.0);
    }

    #[test]
    fn test_inverted_span_is_excluded() {
        let file =
            SourceFile::new("a.ts").with_node(Node::Function(FunctionNode::new("broken", 9, 3)));
        let results = run(&FunctionAnalyzer, vec![file]);
        assert!(results.iter().all(|r| r.excluded));
        assert!(result(&results, "function_length").summary.contains("broken"));
    }
}
