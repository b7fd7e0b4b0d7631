//! Static scoring rubric
//!
//! The rubric is configuration, not computed data. It must be supplied
//! unchanged between runs for scores to stay comparable, so the standard
//! rubric carries a version string that ends up in the report metadata.

use serde::{Deserialize, Serialize};

/// How a sub-issue is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    /// Measured by this engine's analyzers
    Static,
    /// Evaluated externally by a language model on sampled files
    Llm,
}

/// Definition of one scored sub-issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubIssueDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub analysis_type: AnalysisType,
}

/// A group of sub-issues sharing 10 points
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefinition {
    pub id: String,
    pub name: String,
    pub sub_issues: Vec<SubIssueDefinition>,
}

/// Versioned list of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub version: String,
    pub categories: Vec<CategoryDefinition>,
}

impl Rubric {
    /// Look up a sub-issue definition and its category by id
    pub fn find_sub_issue(&self, id: &str) -> Option<(&CategoryDefinition, &SubIssueDefinition)> {
        self.categories.iter().find_map(|category| {
            category
                .sub_issues
                .iter()
                .find(|s| s.id == id)
                .map(|s| (category, s))
        })
    }

    /// Ids of all sub-issues with the given analysis type, in rubric order
    pub fn sub_issue_ids(&self, analysis_type: AnalysisType) -> Vec<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.sub_issues.iter())
            .filter(|s| s.analysis_type == analysis_type)
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Maximum overall score (10 points per category)
    pub fn max_score(&self) -> f64 {
        self.categories.len() as f64 * 10.0
    }

    /// The standard ten-category rubric
    pub fn standard() -> Self {
        use AnalysisType::{Llm, Static};

        let category = |id: &str, name: &str, subs: &[(&str, &str, &str, AnalysisType)]| {
            CategoryDefinition {
                id: id.to_string(),
                name: name.to_string(),
                sub_issues: subs
                    .iter()
                    .map(|(id, name, description, analysis_type)| SubIssueDefinition {
                        id: id.to_string(),
                        name: name.to_string(),
                        description: description.to_string(),
                        analysis_type: *analysis_type,
                    })
                    .collect(),
            }
        };

        Self {
            version: "1.0".to_string(),
            categories: vec![
                category(
                    "structure",
                    "Dependency Structure",
                    &[
                        (
                            "circular_dependencies",
                            "Circular Dependencies",
                            "Files whose imports form closed loops cannot be understood one at a time.",
                            Static,
                        ),
                        (
                            "import_depth",
                            "Import Depth",
                            "Long import chains force an agent to load many files before a change is safe.",
                            Static,
                        ),
                        (
                            "barrel_files",
                            "Barrel Files",
                            "Index files that only re-export hide where code actually lives.",
                            Static,
                        ),
                    ],
                ),
                category(
                    "locality",
                    "Feature Locality",
                    &[
                        (
                            "feature_locality",
                            "Feature Locality",
                            "Entry points should reach few files through their imports.",
                            Static,
                        ),
                        (
                            "test_proximity",
                            "Test Proximity",
                            "Tests placed next to the code they cover are found and updated together.",
                            Static,
                        ),
                        (
                            "module_boundaries",
                            "Module Boundaries",
                            "Modules have a clear, single purpose visible from their names and contents.",
                            Llm,
                        ),
                    ],
                ),
                category(
                    "file_size",
                    "File Size",
                    &[
                        (
                            "file_length",
                            "File Length",
                            "Typical files fit comfortably in a single read.",
                            Static,
                        ),
                        (
                            "oversized_files",
                            "Oversized Files",
                            "Very large files are expensive to read and risky to edit.",
                            Static,
                        ),
                    ],
                ),
                category(
                    "function_design",
                    "Function Design",
                    &[
                        (
                            "function_length",
                            "Function Length",
                            "Short functions can be understood and replaced in isolation.",
                            Static,
                        ),
                        (
                            "parameter_count",
                            "Parameter Count",
                            "Functions with few parameters are easy to call correctly.",
                            Static,
                        ),
                        (
                            "function_clarity",
                            "Function Clarity",
                            "Each function does one thing that its name describes.",
                            Llm,
                        ),
                    ],
                ),
                category(
                    "naming",
                    "Naming",
                    &[
                        (
                            "descriptive_names",
                            "Descriptive Names",
                            "Identifiers are long enough to carry meaning.",
                            Static,
                        ),
                        (
                            "naming_consistency",
                            "Naming Consistency",
                            "One casing convention is used throughout the codebase.",
                            Static,
                        ),
                        (
                            "name_accuracy",
                            "Name Accuracy",
                            "Names match what the code actually does.",
                            Llm,
                        ),
                    ],
                ),
                category(
                    "type_explicitness",
                    "Type Explicitness",
                    &[
                        (
                            "type_annotations",
                            "Type Annotations",
                            "Parameters declare their types.",
                            Static,
                        ),
                        (
                            "return_types",
                            "Return Types",
                            "Exported functions declare what they return.",
                            Static,
                        ),
                        (
                            "loose_types",
                            "Loose Types",
                            "Escape-hatch types such as `any` discard the information agents rely on.",
                            Static,
                        ),
                    ],
                ),
                category(
                    "noise",
                    "Code Noise",
                    &[
                        (
                            "commented_out_code",
                            "Commented-Out Code",
                            "Dead code left in comments misleads readers about what runs.",
                            Static,
                        ),
                        (
                            "todo_markers",
                            "TODO Markers",
                            "Dense TODO/FIXME markers signal unfinished or untrusted code.",
                            Static,
                        ),
                        (
                            "debug_output",
                            "Debug Output",
                            "Stray print statements add noise and obscure real logging.",
                            Static,
                        ),
                    ],
                ),
                category(
                    "documentation",
                    "Documentation",
                    &[
                        (
                            "exported_docs",
                            "Exported API Docs",
                            "Exported functions and types carry doc comments.",
                            Static,
                        ),
                        (
                            "intent_documentation",
                            "Intent Documentation",
                            "Non-obvious decisions are explained where they are made.",
                            Llm,
                        ),
                    ],
                ),
                category(
                    "api_surface",
                    "API Surface",
                    &[
                        (
                            "export_surface",
                            "Export Surface",
                            "Files export a small, focused set of symbols.",
                            Static,
                        ),
                        (
                            "wildcard_reexports",
                            "Wildcard Re-exports",
                            "Explicit re-exports make it clear where a symbol comes from.",
                            Static,
                        ),
                    ],
                ),
                category(
                    "modifiability",
                    "Modifiability",
                    &[
                        (
                            "change_impact",
                            "Change Impact",
                            "A typical change touches few files.",
                            Llm,
                        ),
                        (
                            "pattern_consistency",
                            "Pattern Consistency",
                            "Similar problems are solved the same way across the codebase.",
                            Llm,
                        ),
                    ],
                ),
            ],
        }
    }
}

impl Default for Rubric {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_rubric_shape() {
        let rubric = Rubric::standard();
        assert_eq!(rubric.categories.len(), 10);
        assert_eq!(rubric.max_score(), 100.0);
        assert!(rubric.categories.iter().all(|c| !c.sub_issues.is_empty()));
    }

    #[test]
    fn test_sub_issue_ids_are_unique() {
        let rubric = Rubric::standard();
        let mut seen = HashSet::new();
        for category in &rubric.categories {
            for sub in &category.sub_issues {
                assert!(seen.insert(sub.id.clone()), "duplicate id {}", sub.id);
            }
        }
    }

    #[test]
    fn test_find_sub_issue() {
        let rubric = Rubric::standard();
        let (category, sub) = rubric.find_sub_issue("import_depth").unwrap();
        assert_eq!(category.id, "structure");
        assert_eq!(sub.analysis_type, AnalysisType::Static);
        assert!(rubric.find_sub_issue("nope").is_none());
    }

    #[test]
    fn test_llm_sub_issues() {
        let rubric = Rubric::standard();
        let llm = rubric.sub_issue_ids(AnalysisType::Llm);
        assert!(llm.contains(&"change_impact"));
        assert!(!llm.contains(&"import_depth"));
    }
}
