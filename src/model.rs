//! Source model and result data structures
//!
//! The source model is the engine's only input: an ordered list of parsed
//! files. Everything the analyzers and the aggregator produce is also defined
//! here, since reporters and the LLM result merger depend on these shapes.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ast::Node;

/// A raw import as written in the source, optionally resolved by the front end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportTarget {
    /// The import specifier as written (e.g. `./user`, `crate::db::pool`)
    pub specifier: String,
    /// Relative path of the in-project file this import refers to, if known
    pub resolved: Option<String>,
}

impl ImportTarget {
    /// An import the front end could not (or did not try to) resolve
    pub fn unresolved(specifier: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            resolved: None,
        }
    }

    /// An import already resolved to a project-relative path
    pub fn resolved(specifier: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            specifier: specifier.into(),
            resolved: Some(path.into()),
        }
    }

    /// Whether the specifier is relative to the importing file (`./x`, `../x`)
    pub fn is_relative(&self) -> bool {
        self.specifier.starts_with("./") || self.specifier.starts_with("../")
    }
}

/// A single parsed source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated (unique key)
    pub path: String,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Number of lines in the file
    pub line_count: usize,
    /// Names of exported symbols
    pub exports: BTreeSet<String>,
    /// Import targets in source order
    pub imports: Vec<ImportTarget>,
    /// Top-level syntax nodes in source order
    pub nodes: Vec<Node>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        Self {
            absolute_path: PathBuf::from(&path),
            path,
            line_count: 0,
            exports: BTreeSet::new(),
            imports: Vec::new(),
            nodes: Vec::new(),
        }
    }

    pub fn with_line_count(mut self, line_count: usize) -> Self {
        self.line_count = line_count;
        self
    }

    pub fn with_import(mut self, target: ImportTarget) -> Self {
        self.imports.push(target);
        self
    }

    pub fn with_export(mut self, name: impl Into<String>) -> Self {
        self.exports.insert(name.into());
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// File name without directory or extension (`src/api/index.ts` -> `index`)
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.find('.') {
            Some(0) | None => name,
            Some(pos) => &name[..pos],
        }
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Directory part of the relative path (empty for root-level files)
    pub fn directory(&self) -> &str {
        match self.path.rfind('/') {
            Some(pos) => &self.path[..pos],
            None => "",
        }
    }

    /// Top-level nodes that count as statements (comments excluded)
    pub fn statements(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| !n.is_comment())
    }
}

/// Ordered collection of source files with a path index
#[derive(Debug, Clone, Default)]
pub struct SourceModel {
    files: Vec<SourceFile>,
    index: HashMap<String, usize>,
}

impl SourceModel {
    /// Build a model from files in their stable order.
    ///
    /// A repeated relative path keeps its first occurrence.
    pub fn new(files: Vec<SourceFile>) -> Self {
        let mut model = Self::default();
        for file in files {
            if model.index.contains_key(&file.path) {
                warn!("Dropping duplicate source file {}", file.path);
                continue;
            }
            model.index.insert(file.path.clone(), model.files.len());
            model.files.push(file);
        }
        model
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&SourceFile> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    /// Position of a file in the model order
    pub fn position(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Total lines across all files
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.line_count).sum()
    }
}

/// Finding severity levels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action needed on its own
    #[default]
    Info,
    /// Worth addressing
    Warning,
    /// Actively hurts readability or modifiability
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One concrete observation supporting a sub-issue score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    pub severity: Severity,
    /// Magnitude used to rank findings of equal severity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl Finding {
    pub fn new(file: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            file: file.into(),
            line: None,
            message: message.into(),
            severity,
            value: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// Scored result for one sub-issue of the rubric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIssueResult {
    pub id: String,
    /// Score in 0.0 - 1.0 (higher = better)
    pub score: f64,
    /// Findings, most significant first
    pub findings: Vec<Finding>,
    pub summary: String,
    /// Not evaluated: contributes nothing and leaves its category's denominator
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub excluded: bool,
}

impl SubIssueResult {
    pub fn new(id: impl Into<String>, score: f64, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score,
            findings: Vec::new(),
            summary: summary.into(),
            excluded: false,
        }
    }

    /// A result that was not evaluated
    pub fn excluded(id: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            score: 0.0,
            findings: Vec::new(),
            summary: summary.into(),
            excluded: true,
        }
    }

    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Score clamped into 0.0 - 1.0, with non-finite values treated as 0
    pub fn normalized_score(&self) -> f64 {
        if self.score.is_finite() {
            self.score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Scored category of the rubric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    pub id: String,
    pub name: String,
    /// Score in 0.0 - 10.0
    pub score: f64,
    pub sub_issues: Vec<SubIssueResult>,
}

/// A ranked, actionable improvement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// 1 = highest impact
    pub priority: usize,
    /// Category id
    pub category: String,
    pub category_name: String,
    /// Sub-issue id
    pub sub_issue: String,
    pub sub_issue_name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Points gained on the overall score if fixed
    pub impact: f64,
}

/// Run metadata carried alongside the scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub engine_version: String,
    pub rubric_version: String,
    pub root: String,
    pub file_count: usize,
    pub edge_count: usize,
    /// Supplied by the caller; the engine never reads a clock
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// Terminal artifact of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Score in 0.0 - 100.0
    pub overall_score: f64,
    pub categories: Vec<CategoryResult>,
    pub recommendations: Vec<Recommendation>,
    pub metadata: ReportMetadata,
}

impl Report {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn category(&self, id: &str) -> Option<&CategoryResult> {
        self.categories.iter().find(|c| c.id == id)
    }
}
