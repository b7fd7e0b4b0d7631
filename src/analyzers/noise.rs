//! Code noise sub-issues: commented-out code, TODO markers, debug output

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::analyzers::{
    AnalysisContext, AnalysisError, Analyzer, count_penalty, threshold_score,
};
use crate::ast::{CallNode, CommentKind, CommentNode, NodeVisitor, walk_nodes};
use crate::model::{Finding, Severity, SubIssueResult};

/// Callees treated as debug printing
const DEBUG_CALLEES: &[&str] = &[
    "println!",
    "print!",
    "eprintln!",
    "eprint!",
    "dbg!",
    "console.log",
    "console.debug",
    "console.trace",
    "print",
    "pprint",
    "fmt.Println",
    "fmt.Printf",
    "System.out.println",
];

fn code_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            // Statement or block delimiters at the end of the line
            Regex::new(r"[;{}]\s*$").expect("valid regex"),
            // Declarations and control flow
            Regex::new(r"^(let|const|var|fn|def|function|return|import|use|if|for|while)\b[^.!?]*[=({]")
                .expect("valid regex"),
            // Bare call statements
            Regex::new(r"^[A-Za-z_][\w.]*\([^)]*\)\s*;?$").expect("valid regex"),
        ]
    })
}

fn todo_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(TODO|FIXME|HACK|XXX)\b").expect("valid regex"))
}

/// Whether a comment line reads like source code rather than prose
pub fn looks_like_code(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && code_patterns().iter().any(|p| p.is_match(text))
}

#[derive(Default)]
struct NoiseCollector {
    /// Lines of non-doc comments that look like code
    code_lines: Vec<usize>,
    /// (line, marker text)
    todos: Vec<(usize, String)>,
    /// (line, callee)
    debug_calls: Vec<(usize, String)>,
}

impl NodeVisitor for NoiseCollector {
    fn visit_comment(&mut self, node: &CommentNode) {
        if let Some(m) = todo_pattern().find(&node.text) {
            self.todos.push((node.line, m.as_str().to_string()));
        }
        if node.comment_kind == CommentKind::Doc {
            return;
        }
        for (offset, line) in node.text.lines().enumerate() {
            if looks_like_code(line) {
                self.code_lines.push(node.line + offset);
            }
        }
    }

    fn visit_call(&mut self, node: &CallNode) {
        if DEBUG_CALLEES.contains(&node.callee.as_str()) {
            self.debug_calls.push((node.line, node.callee.clone()));
        }
    }
}

/// Group sorted line numbers into runs of consecutive lines, returning
/// (first line, run length) for each run
fn blocks(mut lines: Vec<usize>) -> Vec<(usize, usize)> {
    lines.sort_unstable();
    lines.dedup();
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for line in lines {
        match runs.last_mut() {
            Some((start, len)) if *start + *len == line => *len += 1,
            _ => runs.push((line, 1)),
        }
    }
    runs
}

/// Scores leftover noise in source files
pub struct NoiseAnalyzer;

impl Analyzer for NoiseAnalyzer {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["commented_out_code", "todo_markers", "debug_output"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let policy = ctx.policy();
        let file_count = ctx.model.len();

        let mut code_findings = Vec::new();
        let mut todo_findings = Vec::new();
        let mut debug_findings = Vec::new();

        for file in ctx.model.files() {
            let mut collector = NoiseCollector::default();
            walk_nodes(&mut collector, &file.nodes);

            for (line, len) in blocks(collector.code_lines) {
                code_findings.push(
                    Finding::new(
                        file.path.clone(),
                        format!("{} commented-out line(s) of code", len),
                        Severity::Warning,
                    )
                    .at_line(line)
                    .with_value(len as f64),
                );
            }
            for (line, marker) in collector.todos {
                todo_findings.push(
                    Finding::new(file.path.clone(), format!("{} marker", marker), Severity::Info)
                        .at_line(line),
                );
            }
            for (line, callee) in collector.debug_calls {
                debug_findings.push(
                    Finding::new(
                        file.path.clone(),
                        format!("Debug output via `{}`", callee),
                        Severity::Warning,
                    )
                    .at_line(line),
                );
            }
        }

        let blocks_found = code_findings.len();
        let commented = SubIssueResult::new(
            "commented_out_code",
            count_penalty(blocks_found, file_count, policy.commented_code_penalty),
            format!(
                "{} block(s) of commented-out code in {} files",
                blocks_found, file_count
            ),
        )
        .with_findings(ctx.finalize(code_findings));

        let total_lines = ctx.model.total_lines();
        let markers = todo_findings.len();
        let density = if total_lines == 0 {
            0.0
        } else {
            markers as f64 * 1000.0 / total_lines as f64
        };
        let todos = SubIssueResult::new(
            "todo_markers",
            threshold_score(density, &policy.todo_density),
            format!("{} marker(s), {:.1} per 1000 lines", markers, density),
        )
        .with_findings(ctx.finalize(todo_findings));

        let calls = debug_findings.len();
        let debug = SubIssueResult::new(
            "debug_output",
            count_penalty(calls, file_count, policy.debug_output_penalty),
            format!("{} debug print call(s) in {} files", calls, file_count),
        )
        .with_findings(ctx.finalize(debug_findings));

        Ok(vec![commented, todos, debug])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run};
    use crate::ast::{FunctionNode, Node};
    use crate::model::SourceFile;

    fn comment(line: usize, text: &str, kind: CommentKind) -> Node {
        Node::Comment(CommentNode {
            line,
            text: text.to_string(),
            comment_kind: kind,
        })
    }

    fn call(line: usize, callee: &str) -> Node {
        Node::Call(CallNode {
            line,
            callee: callee.to_string(),
        })
    }

    #[test]
    fn test_looks_like_code() {
        assert!(looks_like_code("let total = items.len();"));
        assert!(looks_like_code("const x = require('x')"));
        assert!(looks_like_code("foo(bar, baz)"));
        assert!(looks_like_code("  }"));
        assert!(looks_like_code("if (ready) {"));
        assert!(!looks_like_code("Returns the number of items."));
        assert!(!looks_like_code("if the cache is cold, rebuild it"));
        assert!(!looks_like_code(""));
    }

    #[test]
    fn test_blocks_merge_consecutive_lines() {
        assert_eq!(blocks(vec![5, 3, 4, 10, 12, 11, 20]), vec![(3, 3), (10, 3), (20, 1)]);
        assert!(blocks(vec![]).is_empty());
    }

    #[test]
    fn test_commented_out_code() {
        let noisy = SourceFile::new("src/a.rs")
            .with_node(comment(1, "let old = compute();", CommentKind::Line))
            .with_node(comment(2, "old.save();", CommentKind::Line))
            .with_node(comment(8, "Explains the retry policy", CommentKind::Line))
            .with_node(comment(9, "Example: `run(x);`", CommentKind::Doc));
        let files = vec![
            noisy,
            SourceFile::new("src/b.rs"),
            SourceFile::new("src/c.rs"),
            SourceFile::new("src/d.rs"),
        ];

        let results = run(&NoiseAnalyzer, files);
        let r = result(&results, "commented_out_code");
        assert_eq!(r.score, 0.75);
        assert_eq!(r.findings.len(), 1);
        assert_eq!(r.findings[0].line, Some(1));
        assert_eq!(r.findings[0].value, Some(2.0));
    }

    #[test]
    fn test_todo_density() {
        let file = SourceFile::new("src/a.ts")
            .with_line_count(1000)
            .with_node(comment(3, "TODO: split this", CommentKind::Line))
            .with_node(comment(9, "FIXME handle errors", CommentKind::Line))
            .with_node(comment(14, "XXX", CommentKind::Block))
            .with_node(comment(20, "todos are tracked elsewhere", CommentKind::Line));

        let results = run(&NoiseAnalyzer, vec![file]);
        let r = result(&results, "todo_markers");
        // 3 per 1000 lines falls in the acceptable band
        assert_eq!(r.score, 0.7);
        assert_eq!(r.findings.len(), 3);
    }

    #[test]
    fn test_debug_output_includes_nested_calls() {
        let mut handler = FunctionNode::new("handle", 1, 10);
        handler.body.push(call(3, "println!"));
        handler.body.push(call(4, "tracing::info!"));

        let files = vec![
            SourceFile::new("src/a.rs").with_node(Node::Function(handler)),
            SourceFile::new("src/b.ts").with_node(call(1, "console.log")),
            SourceFile::new("src/c.ts"),
            SourceFile::new("src/d.ts"),
        ];
        let results = run(&NoiseAnalyzer, files);
        let r = result(&results, "debug_output");
        assert_eq!(r.score, 0.5);
        assert_eq!(r.findings.len(), 2);
    }

    #[test]
    fn test_clean_project() {
        let results = run(&NoiseAnalyzer, vec![SourceFile::new("a.rs").with_line_count(50)]);
        assert!(results.iter().all(|r| r.score == 1.0));
    }
}
