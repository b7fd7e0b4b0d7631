//! Identifier naming sub-issues

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::analyzers::{AnalysisContext, AnalysisError, Analyzer, percent, ratio_score};
use crate::ast::{
    FunctionNode, NodeVisitor, TypeDeclNode, VariableNode, functions, walk_function, walk_nodes,
    walk_type_decl,
};
use crate::model::{Finding, Severity, SubIssueResult};

/// Casing convention of a multi-word identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Casing {
    Snake,
    Camel,
    Pascal,
    ScreamingSnake,
}

impl fmt::Display for Casing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Casing::Snake => write!(f, "snake_case"),
            Casing::Camel => write!(f, "camelCase"),
            Casing::Pascal => write!(f, "PascalCase"),
            Casing::ScreamingSnake => write!(f, "SCREAMING_SNAKE_CASE"),
        }
    }
}

fn casing_patterns() -> &'static [(Casing, Regex)] {
    static PATTERNS: OnceLock<Vec<(Casing, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            (
                Casing::Snake,
                Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)+$").expect("valid regex"),
            ),
            (
                Casing::Camel,
                Regex::new(r"^[a-z][a-z0-9]*([A-Z][a-z0-9]*)+$").expect("valid regex"),
            ),
            (
                Casing::Pascal,
                Regex::new(r"^[A-Z][a-z0-9]+([A-Z][a-z0-9]*)*$").expect("valid regex"),
            ),
            (
                Casing::ScreamingSnake,
                Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)+$").expect("valid regex"),
            ),
        ]
    })
}

/// Classify a name; single lowercase words fit several conventions and
/// return `None`
pub fn classify_casing(name: &str) -> Option<Casing> {
    let core = name.trim_matches('_');
    casing_patterns()
        .iter()
        .find(|(_, pattern)| pattern.is_match(core))
        .map(|(casing, _)| *casing)
}

/// An identifier declared somewhere in the model
struct Identifier {
    name: String,
    line: usize,
}

#[derive(Default)]
struct IdentifierCollector {
    identifiers: Vec<Identifier>,
}

impl IdentifierCollector {
    fn push(&mut self, name: &str, line: usize) {
        self.identifiers.push(Identifier {
            name: name.to_string(),
            line,
        });
    }
}

impl NodeVisitor for IdentifierCollector {
    fn visit_function(&mut self, node: &FunctionNode) {
        self.push(&node.name, node.line);
        for param in &node.params {
            self.push(&param.name, node.line);
        }
        walk_function(self, node);
    }

    fn visit_type_decl(&mut self, node: &TypeDeclNode) {
        self.push(&node.name, node.line);
        walk_type_decl(self, node);
    }

    fn visit_variable(&mut self, node: &VariableNode) {
        self.push(&node.name, node.line);
    }
}

/// Scores identifier length and casing consistency
pub struct NamingAnalyzer;

impl NamingAnalyzer {
    fn is_descriptive(name: &str, ctx: &AnalysisContext<'_>) -> bool {
        ctx.config.allowed_short_names.iter().any(|n| n == name)
            || name.trim_matches('_').chars().count() >= ctx.policy().min_name_length
    }

    fn descriptive_names(&self, ctx: &AnalysisContext<'_>) -> SubIssueResult {
        let mut total = 0;
        let mut findings = Vec::new();

        for file in ctx.model.files() {
            let mut collector = IdentifierCollector::default();
            walk_nodes(&mut collector, &file.nodes);
            for ident in collector.identifiers {
                total += 1;
                if !Self::is_descriptive(&ident.name, ctx) {
                    findings.push(
                        Finding::new(
                            file.path.clone(),
                            format!("Identifier `{}` is too short to be descriptive", ident.name),
                            Severity::Info,
                        )
                        .at_line(ident.line),
                    );
                }
            }
        }

        let score = ratio_score(total - findings.len(), total);
        SubIssueResult::new(
            "descriptive_names",
            score,
            format!(
                "{} of {} identifiers are descriptive ({})",
                total - findings.len(),
                total,
                percent(score)
            ),
        )
        .with_findings(ctx.finalize(findings))
    }

    fn naming_consistency(&self, ctx: &AnalysisContext<'_>) -> SubIssueResult {
        let mut classified = Vec::new();
        for file in ctx.model.files() {
            for function in functions(&file.nodes) {
                if let Some(casing) = classify_casing(&function.name) {
                    classified.push((file.path.as_str(), function, casing));
                }
            }
        }

        // Count per convention; ties go to the convention listed first
        let mut counts = [0usize; 4];
        for (_, _, casing) in &classified {
            counts[*casing as usize] += 1;
        }
        let Some(dominant) = [
            Casing::Snake,
            Casing::Camel,
            Casing::Pascal,
            Casing::ScreamingSnake,
        ]
        .into_iter()
        .filter(|c| counts[*c as usize] > 0)
        .max_by(|a, b| counts[*a as usize].cmp(&counts[*b as usize]).then(b.cmp(a))) else {
            return SubIssueResult::new(
                "naming_consistency",
                1.0,
                "No multi-word function names",
            );
        };

        let findings: Vec<Finding> = classified
            .iter()
            .filter(|(_, _, casing)| *casing != dominant)
            .map(|(path, function, casing)| {
                Finding::new(
                    *path,
                    format!(
                        "`{}` is {}; most functions use {}",
                        function.name, casing, dominant
                    ),
                    Severity::Info,
                )
                .at_line(function.line)
            })
            .collect();

        let matching = counts[dominant as usize];
        let score = ratio_score(matching, classified.len());
        SubIssueResult::new(
            "naming_consistency",
            score,
            format!(
                "{} of {} function names use {} ({})",
                matching,
                classified.len(),
                dominant,
                percent(score)
            ),
        )
        .with_findings(ctx.finalize(findings))
    }
}

impl Analyzer for NamingAnalyzer {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["descriptive_names", "naming_consistency"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        Ok(vec![self.descriptive_names(ctx), self.naming_consistency(ctx)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run};
    use crate::ast::{Node, Param, TypeKind};
    use crate::model::SourceFile;

    fn function(name: &str, line: usize) -> Node {
        Node::Function(FunctionNode::new(name, line, line + 2))
    }

    #[test]
    fn test_classify_casing() {
        assert_eq!(classify_casing("load_user"), Some(Casing::Snake));
        assert_eq!(classify_casing("_load_user"), Some(Casing::Snake));
        assert_eq!(classify_casing("loadUser"), Some(Casing::Camel));
        assert_eq!(classify_casing("LoadUser"), Some(Casing::Pascal));
        assert_eq!(classify_casing("MAX_SIZE"), Some(Casing::ScreamingSnake));
        assert_eq!(classify_casing("load"), None);
        assert_eq!(classify_casing("$el"), None);
    }

    #[test]
    fn test_descriptive_names() {
        let mut f = FunctionNode::new("fetch_user", 1, 5);
        f.params = vec![
            Param::new("id", Some("u64")),
            Param::new("q", Some("&str")),
            Param::new("options", None),
        ];
        f.body.push(Node::Variable(VariableNode {
            name: "tmp".to_string(),
            line: 2,
            type_annotation: None,
            exported: false,
        }));

        let file = SourceFile::new("src/users.rs")
            .with_node(Node::Function(f))
            .with_node(Node::TypeDecl(TypeDeclNode::new("Ab", 10, TypeKind::Struct)));

        let results = run(&NamingAnalyzer, vec![file]);
        let r = result(&results, "descriptive_names");
        // fetch_user, id (allowed), q, options, tmp, Ab
        assert!((r.score - 4.0 / 6.0).abs() < 1e-9);
        let lines: Vec<Option<usize>> = r.findings.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![Some(1), Some(10)]);
    }

    #[test]
    fn test_naming_consistency_dominant_style() {
        let file = SourceFile::new("src/api.ts")
            .with_node(function("getUser", 1))
            .with_node(function("saveUser", 5))
            .with_node(function("deleteUser", 9))
            .with_node(function("list_users", 13))
            .with_node(function("render", 17));

        let results = run(&NamingAnalyzer, vec![file]);
        let r = result(&results, "naming_consistency");
        assert_eq!(r.score, 0.75);
        assert_eq!(r.findings.len(), 1);
        assert!(r.findings[0].message.contains("list_users"));
        assert!(r.findings[0].message.contains("camelCase"));
    }

    #[test]
    fn test_naming_consistency_tie_prefers_first_convention() {
        let file = SourceFile::new("a.ts")
            .with_node(function("loadUser", 1))
            .with_node(function("load_user", 5));
        let results = run(&NamingAnalyzer, vec![file]);
        let r = result(&results, "naming_consistency");
        assert_eq!(r.score, 0.5);
        assert!(r.summary.contains("snake_case"));
    }

    #[test]
    fn test_naming_consistency_without_multiword_names() {
        let file = SourceFile::new("a.ts").with_node(function("run", 1));
        let results = run(&NamingAnalyzer, vec![file]);
        assert_eq!(result(&results, "naming_consistency").score, 1.0);
    }
}
