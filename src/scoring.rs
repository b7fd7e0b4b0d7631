//! Score aggregation and recommendation ranking
//!
//! Each category of the rubric is worth 10 points, shared equally among its
//! evaluated (non-excluded) sub-issues. A sub-issue scoring below the
//! recommendation threshold yields a recommendation whose impact is the
//! number of overall points fixing it would recover.

use std::collections::HashMap;

use crate::config::AggregationConfig;
use crate::model::{CategoryResult, Recommendation, SubIssueResult};
use crate::rubric::{CategoryDefinition, Rubric, SubIssueDefinition};

/// Points each category contributes to the overall score
pub const CATEGORY_POINTS: f64 = 10.0;

/// Summary given to rubric sub-issues no analyzer reported
pub const NOT_EVALUATED: &str = "Not evaluated";

/// Scored categories plus ranked recommendations
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub categories: Vec<CategoryResult>,
    pub overall_score: f64,
    pub recommendations: Vec<Recommendation>,
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A recommendation before ranking
struct Candidate {
    category: String,
    category_name: String,
    sub_issue: String,
    sub_issue_name: String,
    message: String,
    file: Option<String>,
    line: Option<usize>,
    gain: f64,
}

impl Candidate {
    fn from_result(
        category: &CategoryDefinition,
        sub_issue: &SubIssueDefinition,
        result: &SubIssueResult,
        weight: f64,
    ) -> Self {
        let (message, file, line) = match result.findings.first() {
            Some(top) => (top.message.clone(), Some(top.file.clone()), top.line),
            None => (result.summary.clone(), None, None),
        };
        Self {
            category: category.id.clone(),
            category_name: category.name.clone(),
            sub_issue: result.id.clone(),
            sub_issue_name: sub_issue.name.clone(),
            message,
            file,
            line,
            gain: (1.0 - result.score) * weight,
        }
    }
}

/// Combine sub-issue results into category scores and recommendations
///
/// Results for ids the rubric does not define are ignored. When several
/// results share an id the last one wins, so externally evaluated results
/// appended after the static ones override them.
pub fn aggregate(
    results: &[SubIssueResult],
    rubric: &Rubric,
    config: &AggregationConfig,
) -> Aggregation {
    let by_id: HashMap<&str, &SubIssueResult> =
        results.iter().map(|r| (r.id.as_str(), r)).collect();

    let mut categories = Vec::with_capacity(rubric.categories.len());
    let mut candidates = Vec::new();

    for definition in &rubric.categories {
        let sub_issues: Vec<SubIssueResult> = definition
            .sub_issues
            .iter()
            .map(|sub| match by_id.get(sub.id.as_str()) {
                Some(result) => SubIssueResult {
                    score: result.normalized_score(),
                    ..(*result).clone()
                },
                None => SubIssueResult::excluded(sub.id.clone(), NOT_EVALUATED),
            })
            .collect();

        let evaluated: Vec<(&SubIssueDefinition, &SubIssueResult)> = definition
            .sub_issues
            .iter()
            .zip(&sub_issues)
            .filter(|(_, result)| !result.excluded)
            .collect();
        let score = if evaluated.is_empty() {
            0.0
        } else {
            let weight = CATEGORY_POINTS / evaluated.len() as f64;
            for (sub, result) in &evaluated {
                if result.score < config.recommendation_threshold {
                    candidates.push(Candidate::from_result(definition, sub, result, weight));
                }
            }
            round2(evaluated.iter().map(|(_, s)| s.score * weight).sum())
        };

        categories.push(CategoryResult {
            id: definition.id.clone(),
            name: definition.name.clone(),
            score,
            sub_issues,
        });
    }

    let overall_score = round2(categories.iter().map(|c| c.score).sum());

    // Stable: equal gains keep rubric order
    candidates.sort_by(|a, b| b.gain.total_cmp(&a.gain));
    let recommendations = candidates
        .into_iter()
        .take(config.max_recommendations)
        .enumerate()
        .map(|(i, c)| Recommendation {
            priority: i + 1,
            category: c.category,
            category_name: c.category_name,
            sub_issue: c.sub_issue,
            sub_issue_name: c.sub_issue_name,
            message: c.message,
            file: c.file,
            line: c.line,
            impact: round2(c.gain),
        })
        .collect();

    Aggregation {
        categories,
        overall_score,
        recommendations,
    }
}
