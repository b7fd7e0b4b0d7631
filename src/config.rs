//! Configuration file support
//!
//! This module handles parsing `.readiness.toml` files, which customize
//! which files are analyzed and override the heuristic scoring policy.
//!
//! ## Configuration File Format
//!
//! ```toml
//! # .readiness.toml
//!
//! [analysis]
//! # Files to exclude from analysis entirely
//! exclude = ["src/generated/*", "vendor/*"]
//!
//! # Files treated as feature entry points for locality measurement
//! entry_patterns = ["*handler*", "*route*", "*controller*"]
//!
//! # File stems checked for barrel (re-export only) files
//! barrel_names = ["index", "mod", "__init__"]
//!
//! [policy]
//! cycle_cap = 50
//! cycle_penalty = 5.0
//! depth_buckets = [{ max = 5, score = 1.0 }, { max = 10, score = 0.7 }]
//! depth_floor = 0.2
//!
//! [scoring]
//! recommendation_threshold = 0.8
//! max_recommendations = 30
//! ```

use glob::Pattern;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur when loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(String),
}

/// Analysis configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Files to completely exclude from analysis
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Glob patterns (matched against the lower-cased relative path)
    /// identifying feature entry points
    #[serde(default = "default_entry_patterns")]
    pub entry_patterns: Vec<String>,

    /// File stems considered for barrel detection
    #[serde(default = "default_barrel_names")]
    pub barrel_names: Vec<String>,

    /// Type annotations counted as loose types
    #[serde(default = "default_loose_types")]
    pub loose_types: Vec<String>,

    /// Short identifiers that are still considered descriptive
    #[serde(default = "default_allowed_short_names")]
    pub allowed_short_names: Vec<String>,
}

fn default_entry_patterns() -> Vec<String> {
    [
        "*handler*",
        "*route*",
        "*controller*",
        "*endpoint*",
        "*/pages/*",
        "*/commands/*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_barrel_names() -> Vec<String> {
    ["index", "mod", "__init__"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_loose_types() -> Vec<String> {
    ["any", "Any", "object", "Object", "unknown", "dyn Any", "Box<dyn Any>"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_allowed_short_names() -> Vec<String> {
    ["i", "j", "k", "x", "y", "z", "id", "db", "io", "fs", "ok", "_"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            entry_patterns: default_entry_patterns(),
            barrel_names: default_barrel_names(),
            loose_types: default_loose_types(),
            allowed_short_names: default_allowed_short_names(),
        }
    }
}

/// One score band: values up to `max` (inclusive) score `score`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Bucket {
    pub max: f64,
    pub score: f64,
}

/// Good / acceptable / bad limits for a lower-is-better measurement
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ThresholdBands {
    pub good: f64,
    pub acceptable: f64,
    pub bad: f64,
}

impl ThresholdBands {
    pub const fn new(good: f64, acceptable: f64, bad: f64) -> Self {
        Self {
            good,
            acceptable,
            bad,
        }
    }
}

/// Heuristic scoring constants.
///
/// These are policy, not law; every one can be overridden in `[policy]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Stop cycle enumeration after this many cycles
    pub cycle_cap: usize,
    /// Multiplier on the fraction of files in cycles
    pub cycle_penalty: f64,
    pub depth_buckets: Vec<Bucket>,
    pub depth_floor: f64,
    pub locality_buckets: Vec<Bucket>,
    pub locality_floor: f64,
    /// Share of re-export statements at which an index file is a barrel
    pub barrel_ratio: f64,
    /// Multiplier on the fraction of files that are barrels
    pub barrel_penalty: f64,
    /// 90th-percentile file length bands
    pub file_length: ThresholdBands,
    /// Files longer than this are oversized
    pub oversized_file_lines: usize,
    pub oversized_penalty: f64,
    pub max_function_lines: usize,
    pub max_params: usize,
    pub min_name_length: usize,
    pub loose_type_penalty: f64,
    pub commented_code_penalty: f64,
    /// TODO markers per 1000 lines
    pub todo_density: ThresholdBands,
    pub debug_output_penalty: f64,
    /// Average exported symbols per file
    pub exports_per_file: ThresholdBands,
    /// Maximum findings kept per sub-issue
    pub findings_cap: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            cycle_cap: 50,
            cycle_penalty: 5.0,
            depth_buckets: vec![
                Bucket { max: 5.0, score: 1.0 },
                Bucket { max: 10.0, score: 0.7 },
                Bucket { max: 15.0, score: 0.4 },
            ],
            depth_floor: 0.2,
            locality_buckets: vec![
                Bucket { max: 5.0, score: 1.0 },
                Bucket { max: 10.0, score: 0.8 },
                Bucket { max: 20.0, score: 0.5 },
            ],
            locality_floor: 0.2,
            barrel_ratio: 0.5,
            barrel_penalty: 10.0,
            file_length: ThresholdBands::new(300.0, 500.0, 800.0),
            oversized_file_lines: 500,
            oversized_penalty: 5.0,
            max_function_lines: 50,
            max_params: 4,
            min_name_length: 3,
            loose_type_penalty: 2.0,
            commented_code_penalty: 1.0,
            todo_density: ThresholdBands::new(2.0, 5.0, 10.0),
            debug_output_penalty: 1.0,
            exports_per_file: ThresholdBands::new(10.0, 20.0, 40.0),
            findings_cap: 25,
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Sub-issues scoring strictly below this produce recommendations
    pub recommendation_threshold: f64,
    pub max_recommendations: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            recommendation_threshold: 0.8,
            max_recommendations: 30,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReadinessConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub policy: ScoringPolicy,

    #[serde(default)]
    pub scoring: AggregationConfig,
}

/// Compiled configuration with glob patterns
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    /// Patterns for files to exclude from analysis
    exclude_patterns: Vec<Pattern>,
    /// Patterns identifying entry files
    entry_patterns: Vec<Pattern>,
    pub barrel_names: Vec<String>,
    pub loose_types: Vec<String>,
    pub allowed_short_names: Vec<String>,
    pub policy: ScoringPolicy,
    pub scoring: AggregationConfig,
}

impl CompiledConfig {
    /// Create a compiled config from raw config
    pub fn from_config(config: ReadinessConfig) -> Result<Self, ConfigError> {
        let compile_patterns = |patterns: &[String]| -> Result<Vec<Pattern>, ConfigError> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p).map_err(|e| ConfigError::PatternError(format!("{}: {}", p, e)))
                })
                .collect()
        };

        Ok(Self {
            exclude_patterns: compile_patterns(&config.analysis.exclude)?,
            entry_patterns: compile_patterns(&config.analysis.entry_patterns)?,
            barrel_names: config.analysis.barrel_names,
            loose_types: config.analysis.loose_types,
            allowed_short_names: config.analysis.allowed_short_names,
            policy: config.policy,
            scoring: config.scoring,
        })
    }

    /// Check if a relative path should be excluded from analysis
    pub fn should_exclude(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|p| p.matches(path))
    }

    /// Check if a relative path names a feature entry point
    pub fn is_entry_file(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        self.entry_patterns.iter().any(|p| p.matches(&lowered))
    }

    pub fn is_barrel_name(&self, stem: &str) -> bool {
        self.barrel_names.iter().any(|n| n == stem)
    }

    pub fn is_loose_type(&self, annotation: &str) -> bool {
        let annotation = annotation.trim();
        self.loose_types.iter().any(|t| t == annotation)
    }
}

impl Default for CompiledConfig {
    fn default() -> Self {
        // The default patterns are known-valid globs
        Self::from_config(ReadinessConfig::default()).unwrap_or_else(|_| Self {
            exclude_patterns: Vec::new(),
            entry_patterns: Vec::new(),
            barrel_names: default_barrel_names(),
            loose_types: default_loose_types(),
            allowed_short_names: default_allowed_short_names(),
            policy: ScoringPolicy::default(),
            scoring: AggregationConfig::default(),
        })
    }
}

/// Load configuration from the project directory
///
/// Searches for `.readiness.toml` in the given directory and parent directories.
pub fn load_config(project_path: &Path) -> Result<ReadinessConfig, ConfigError> {
    match find_config_file(project_path) {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            let content = fs::read_to_string(&path)?;
            let config: ReadinessConfig = toml::from_str(&content)?;
            Ok(config)
        }
        None => Ok(ReadinessConfig::default()),
    }
}

/// Find the config file by searching up the directory tree
fn find_config_file(start_path: &Path) -> Option<PathBuf> {
    let config_names = [".readiness.toml", "readiness.toml"];

    let mut current = if start_path.is_file() {
        start_path.parent()?.to_path_buf()
    } else {
        start_path.to_path_buf()
    };

    loop {
        for name in &config_names {
            let config_path = current.join(name);
            if config_path.exists() {
                return Some(config_path);
            }
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            break;
        }
    }

    None
}

/// Load and compile configuration
pub fn load_compiled_config(project_path: &Path) -> Result<CompiledConfig, ConfigError> {
    let config = load_config(project_path)?;
    CompiledConfig::from_config(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReadinessConfig::default();
        assert!(config.analysis.exclude.is_empty());
        assert_eq!(config.policy.cycle_cap, 50);
        assert_eq!(config.policy.cycle_penalty, 5.0);
        assert_eq!(config.policy.depth_buckets.len(), 3);
        assert_eq!(config.scoring.max_recommendations, 30);
    }

    #[test]
    fn test_parse_partial_policy() {
        let toml = r#"
            [analysis]
            exclude = ["src/generated/*"]

            [policy]
            cycle_penalty = 3.0
            depth_buckets = [{ max = 3, score = 1.0 }]

            [scoring]
            max_recommendations = 10
        "#;

        let config: ReadinessConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.policy.cycle_penalty, 3.0);
        assert_eq!(config.policy.depth_buckets, vec![Bucket { max: 3.0, score: 1.0 }]);
        // Untouched fields keep their defaults
        assert_eq!(config.policy.cycle_cap, 50);
        assert_eq!(config.policy.depth_floor, 0.2);
        assert_eq!(config.scoring.max_recommendations, 10);
        assert_eq!(config.scoring.recommendation_threshold, 0.8);
        assert_eq!(config.analysis.barrel_names, default_barrel_names());
    }

    #[test]
    fn test_compiled_patterns() {
        let toml = r#"
            [analysis]
            exclude = ["src/generated/*"]
            entry_patterns = ["*handler*"]
        "#;

        let config: ReadinessConfig = toml::from_str(toml).unwrap();
        let compiled = CompiledConfig::from_config(config).unwrap();

        assert!(compiled.should_exclude("src/generated/schema.ts"));
        assert!(!compiled.should_exclude("src/app.ts"));
        assert!(compiled.is_entry_file("src/api/UserHandler.ts"));
        assert!(!compiled.is_entry_file("src/api/user.ts"));
    }

    #[test]
    fn test_default_entry_patterns() {
        let compiled = CompiledConfig::default();
        assert!(compiled.is_entry_file("src/routes/users.ts"));
        assert!(compiled.is_entry_file("app/pages/home.tsx"));
        assert!(compiled.is_entry_file("src/commands/deploy.rs"));
        assert!(!compiled.is_entry_file("src/db/pool.rs"));
    }

    #[test]
    fn test_invalid_pattern() {
        let toml = r#"
            [analysis]
            exclude = ["src/[unclosed"]
        "#;
        let config: ReadinessConfig = toml::from_str(toml).unwrap();
        assert!(matches!(
            CompiledConfig::from_config(config),
            Err(ConfigError::PatternError(_))
        ));
    }

    #[test]
    fn test_loose_type_matching() {
        let compiled = CompiledConfig::default();
        assert!(compiled.is_loose_type(" any "));
        assert!(!compiled.is_loose_type("User"));
    }

    #[test]
    fn test_load_config_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".readiness.toml"),
            "[policy]\ncycle_cap = 7\n",
        )
        .unwrap();
        let nested = dir.path().join("src");
        fs::create_dir(&nested).unwrap();

        let config = load_compiled_config(&nested).unwrap();
        assert_eq!(config.policy.cycle_cap, 7);
    }
}
