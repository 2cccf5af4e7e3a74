//! codecensus - multi-language code census.
//!
//! Builds a uniform structural model (classes, methods, fields, variables)
//! from a source tree mixing Java, Python, JavaScript, HTML, CSS and SCSS,
//! then derives two diagnostics from it: cross-file usage ("dead code") and
//! the class dependency graph (cycles, density, DAG test).
//!
//! # Architecture
//!
//! - `classify`: extension to language tag and analysis class
//! - `walk`: file enumeration and per-file tallies
//! - `analysis`: the extractor contract, per-language extractors and registry
//! - `scheduler`: parallel per-file extraction with failure isolation
//! - `aggregate`: merging per-file results into one model
//! - `usage`: reference counting and unused-code reports
//! - `graph`: class dependency graph and its metrics
//! - `summary`, `projection`: derived metrics and read-only views
//! - `pipeline`: the end-to-end run
//! - `report`: output formatting (text, JSON)
//!
//! # Adding a New Language
//!
//! See `src/analysis/languages/` for examples. Implement the `Extractor`
//! trait, add a `Language` variant in `classify`, and wire it into
//! `ExtractorRegistry::resolve`.

pub mod aggregate;
pub mod analysis;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod projection;
pub mod report;
pub mod scheduler;
pub mod summary;
pub mod usage;
pub mod walk;

pub use aggregate::AnalysisModel;
pub use analysis::{Extractor, ExtractorRegistry, LanguageClass, LanguageMethod, VariableRecord};
pub use classify::{classify, Language, LanguageKind};
pub use config::{AnalysisConfig, ReferenceMatching, Thresholds};
pub use error::{AnalysisError, Result};
pub use graph::{DependencyGraph, DependencyMetrics};
pub use pipeline::{AnalysisReport, Pipeline};
pub use usage::{UsageAnalyzer, UsageIndex, UsageReport};
