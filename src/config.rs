//! Analysis configuration.
//!
//! Configuration is an explicit value built once per run and handed to the
//! registry, scheduler and analyzers at construction time. It is loaded from
//! YAML and overridden by command-line flags.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::classify::Language;
use crate::error::{AnalysisError, Result};
use crate::graph::CycleLimits;

/// Config file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["codecensus.yaml", ".codecensus.yaml"];

/// God-class method limit for Python.
pub const PYTHON_GOD_CLASS_METHODS: usize = 15;
/// God-class method limit for brace-style languages.
pub const DEFAULT_GOD_CLASS_METHODS: usize = 20;

/// How the usage analyzer decides that a name refers to a class or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceMatching {
    /// A class is referenced when its name occurs anywhere in an import string,
    /// a method when the callee text occurs anywhere in its `Class.method` key.
    #[default]
    Substring,
    /// Names must match whole identifier tokens.
    ExactToken,
}

/// Fixed-threshold limits shared by every extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub complexity: u32,
    pub method_length: usize,
    pub class_length: usize,
    /// Overrides the per-language god-class limit when set.
    pub god_class: Option<usize>,
}

impl Thresholds {
    pub fn god_class_limit(&self, language: Language) -> usize {
        self.god_class.unwrap_or(match language {
            Language::Python => PYTHON_GOD_CLASS_METHODS,
            _ => DEFAULT_GOD_CLASS_METHODS,
        })
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        AnalysisConfig::default().thresholds()
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Method complexity above this is `COMPLEX_METHOD`.
    pub complexity_threshold: u32,
    /// Method bodies with more non-blank lines are `LONG_METHOD`.
    pub method_length_threshold: usize,
    /// Classes with more non-blank lines are `CLASS_TOO_LONG`.
    pub class_length_threshold: usize,
    /// Method count above which a class is a god class (default: per language).
    pub god_class_threshold: Option<usize>,
    /// Worker pool size (default: available hardware parallelism).
    pub worker_count: Option<usize>,
    pub reference_matching: ReferenceMatching,
    /// Per-file content is truncated to this many bytes before variable and
    /// style checks. Structural extraction always reads the whole file.
    pub max_content_bytes: usize,
    /// Glob patterns for paths to skip (e.g. `**/generated/**`).
    pub excluded_paths: Vec<String>,
    /// Whether test directories and test files are scanned.
    pub include_tests: bool,
    pub max_reported_cycles: usize,
    /// Cycle enumeration is skipped for graphs with more nodes than this.
    pub max_cycle_search_nodes: usize,
    /// Number of classes in the architecture projection.
    pub projection_class_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            complexity_threshold: 10,
            method_length_threshold: 50,
            class_length_threshold: 300,
            god_class_threshold: None,
            worker_count: None,
            reference_matching: ReferenceMatching::Substring,
            max_content_bytes: 1_000_000,
            excluded_paths: Vec::new(),
            include_tests: true,
            max_reported_cycles: 5,
            max_cycle_search_nodes: 5_000,
            projection_class_limit: 20,
        }
    }
}

impl AnalysisConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| AnalysisError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&content).map_err(|source| AnalysisError::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn parse_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Find a config file: working directory first, then the user config directory.
    pub fn discover() -> Option<PathBuf> {
        for name in DEFAULT_CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Some(path);
            }
        }

        directories::ProjectDirs::from("", "", "codecensus")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
            .filter(|path| path.exists())
    }

    /// Load the given file, a discovered file, or the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::parse_file(path),
            None => match Self::discover() {
                Some(path) => {
                    tracing::info!(path = %path.display(), "using discovered config");
                    Self::parse_file(path)
                }
                None => Ok(Self::default()),
            },
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            complexity: self.complexity_threshold,
            method_length: self.method_length_threshold,
            class_length: self.class_length_threshold,
            god_class: self.god_class_threshold,
        }
    }

    pub fn cycle_limits(&self) -> CycleLimits {
        CycleLimits {
            max_reported: self.max_reported_cycles,
            max_search_nodes: self.max_cycle_search_nodes,
        }
    }

    /// Effective worker count.
    pub fn workers(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }

    /// Compile `excluded_paths` into a matcher.
    pub fn exclusion_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                AnalysisError::InvalidConfig(format!("excluded_paths pattern {:?}: {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| AnalysisError::InvalidConfig(format!("excluded_paths: {}", e)))
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("complexity_threshold", self.complexity_threshold as usize),
            ("method_length_threshold", self.method_length_threshold),
            ("class_length_threshold", self.class_length_threshold),
            ("max_content_bytes", self.max_content_bytes),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(AnalysisError::InvalidConfig(format!("{} must be positive", name)));
            }
        }
        if self.worker_count == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "worker_count must be positive".to_string(),
            ));
        }
        if self.god_class_threshold == Some(0) {
            return Err(AnalysisError::InvalidConfig(
                "god_class_threshold must be positive".to_string(),
            ));
        }
        self.exclusion_set()?;
        Ok(())
    }
}
