//! Documentation coverage of the exported API

use crate::analyzers::{AnalysisContext, AnalysisError, Analyzer, percent, ratio_score};
use crate::ast::{functions, type_decls};
use crate::model::{Finding, Severity, SubIssueResult};

/// Scores doc comments on exported functions and types
pub struct DocumentationAnalyzer;

impl Analyzer for DocumentationAnalyzer {
    fn name(&self) -> &'static str {
        "documentation"
    }

    fn sub_issue_ids(&self) -> &'static [&'static str] {
        &["exported_docs"]
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> Result<Vec<SubIssueResult>, AnalysisError> {
        let mut total = 0;
        let mut findings = Vec::new();

        for file in ctx.model.files() {
            let items = functions(&file.nodes)
                .into_iter()
                .filter(|f| f.exported)
                .map(|f| (f.line, f.name.as_str(), "function".to_string(), f.documented))
                .chain(
                    type_decls(&file.nodes)
                        .into_iter()
                        .filter(|t| t.exported && !t.is_test)
                        .map(|t| (t.line, t.name.as_str(), t.kind.to_string(), t.documented)),
                );

            for (line, name, kind, documented) in items {
                total += 1;
                if !documented {
                    findings.push(
                        Finding::new(
                            file.path.clone(),
                            format!("Exported {} `{}` has no doc comment", kind, name),
                            Severity::Info,
                        )
                        .at_line(line),
                    );
                }
            }
        }

        let documented = total - findings.len();
        let score = ratio_score(documented, total);
        Ok(vec![
            SubIssueResult::new(
                "exported_docs",
                score,
                format!(
                    "{} of {} exported items are documented ({})",
                    documented,
                    total,
                    percent(score)
                ),
            )
            .with_findings(ctx.finalize(findings)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{result, run};
    use crate::ast::{FunctionNode, Node, TypeDeclNode, TypeKind};
    use crate::model::SourceFile;

    #[test]
    fn test_exported_docs_ratio() {
        let mut documented = FunctionNode::new("load", 3, 9);
        documented.exported = true;
        documented.documented = true;

        let mut bare = FunctionNode::new("save", 11, 15);
        bare.exported = true;

        let private = FunctionNode::new("helper", 17, 20);

        let mut config = TypeDeclNode::new("Config", 22, TypeKind::Struct);
        config.exported = true;
        config.documented = true;

        let mut mode = TypeDeclNode::new("Mode", 30, TypeKind::Enum);
        mode.exported = true;

        let file = SourceFile::new("src/config.rs")
            .with_node(Node::Function(documented))
            .with_node(Node::Function(bare))
            .with_node(Node::Function(private))
            .with_node(Node::TypeDecl(config))
            .with_node(Node::TypeDecl(mode));

        let results = run(&DocumentationAnalyzer, vec![file]);
        let r = result(&results, "exported_docs");
        assert_eq!(r.score, 0.5);
        let messages: Vec<&str> = r.findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Exported function `save` has no doc comment",
                "Exported enum `Mode` has no doc comment",
            ]
        );
    }

    #[test]
    fn test_test_modules_are_ignored() {
        let mut tests = TypeDeclNode::new("tests", 40, TypeKind::Module);
        tests.exported = true;
        tests.is_test = true;

        let results = run(
            &DocumentationAnalyzer,
            vec![SourceFile::new("src/lib.rs").with_node(Node::TypeDecl(tests))],
        );
        let r = result(&results, "exported_docs");
        assert_eq!(r.score, 1.0);
        assert!(r.findings.is_empty());
    }
}
