//! # agent-readiness - Codebase Readiness Scoring
//!
//! Scores how easily an automated agent can read and safely modify a
//! codebase, using a fixed rubric of categories and weighted sub-issues.
//!
//! ## Overview
//!
//! A run flows strictly forward:
//!
//! 1. **Source Model** - parsed files with imports, exports and syntax nodes
//! 2. **Import Graph** - intra-project file dependencies
//! 3. **Analyzers** - cycles, depth, locality, barrels, and metric checks,
//!    run in parallel
//! 4. **Aggregation** - category scores, overall score, ranked recommendations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! let report = agent_readiness::score_rust_project(Path::new(".")).unwrap();
//! println!("{}", report.to_json().unwrap());
//! ```
//!
//! ## Scoring
//!
//! Every category is worth 10 points, split equally among the sub-issues
//! that were actually evaluated:
//! ```text
//! category = round2(sum(score) * 10 / evaluated)
//! overall  = round2(sum(category))
//! ```
//!
//! Sub-issues evaluated outside the engine (by a language model, for
//! instance) are merged as ordinary results with [`Engine::run_with`].

pub mod analyzers;
pub mod ast;
pub mod config;
pub mod engine;
pub mod frontend;
pub mod graph;
pub mod model;
pub mod rubric;
pub mod scoring;

pub use analyzers::{AnalysisContext, AnalysisError, Analyzer, default_analyzers};
pub use ast::{Node, NodeVisitor};
pub use config::{
    AggregationConfig, AnalysisConfig, CompiledConfig, ConfigError, ReadinessConfig,
    ScoringPolicy, load_compiled_config, load_config,
};
pub use engine::{ENGINE_VERSION, Engine};
pub use frontend::{FrontendError, load_rust_project, parse_rust_source, score_rust_project};
pub use graph::{Cycle, CycleReport, DepthReport, ImportGraph, closure_size, compute_depths, find_cycles};
pub use model::{
    CategoryResult, Finding, ImportTarget, Recommendation, Report, ReportMetadata, Severity,
    SourceFile, SourceModel, SubIssueResult,
};
pub use rubric::{AnalysisType, CategoryDefinition, Rubric, SubIssueDefinition};
pub use scoring::{Aggregation, aggregate};
