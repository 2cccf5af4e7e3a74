//! End-to-end analysis run.
//!
//! ```text
//! walk ─▶ validate ─▶ scheduler (structure ∥ hygiene) ─▶ merge
//!                                                          │
//!              report ◀─ summary ◀─ graph ◀─ usage ◀───────┘
//! ```
//!
//! Only the scheduler runs concurrently. Everything after the merge is
//! single-threaded over the merged model.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::aggregate::AnalysisModel;
use crate::analysis::ExtractorRegistry;
use crate::config::{AnalysisConfig, ReferenceMatching};
use crate::error::Result;
use crate::graph::{DependencyEdge, DependencyGraph, DependencyMetrics};
use crate::projection::ArchitectureProjection;
use crate::scheduler::Scheduler;
use crate::summary::{self, CleanupMetrics, CodingStandardsSummary, QualitySummary, Suggestion};
use crate::usage::{UsageAnalyzer, UsageReport};
use crate::walk::{self, Inventory, LanguageValidation};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMetadata {
    pub tool_version: String,
    pub root: String,
    pub workers: usize,
    pub reference_matching: ReferenceMatching,
    pub total_files_discovered: usize,
    pub total_lines_discovered: usize,
}

/// Everything one run produces. Plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub validation: LanguageValidation,
    pub quality: QualitySummary,
    pub coding_standards: CodingStandardsSummary,
    pub usage: UsageReport,
    pub cleanup: CleanupMetrics,
    pub dependencies: DependencyMetrics,
    pub dependency_edges: Vec<DependencyEdge>,
    pub projection: ArchitectureProjection,
    pub suggestions: Vec<Suggestion>,
    pub model: AnalysisModel,
}

pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Walk and tally `root`.
    pub fn inventory(&self, root: &Path) -> Result<Inventory> {
        walk::collect(root, &self.config)
    }

    /// Analyze a collected inventory. Fails only when it holds no supported files.
    pub fn analyze(&self, inventory: Inventory) -> Result<AnalysisReport> {
        let validation = inventory.validate()?;
        let started = Instant::now();

        let registry = ExtractorRegistry::new(&self.config.thresholds());
        let scheduler = Scheduler::new(registry, self.config.workers(), self.config.max_content_bytes)?;

        let targets = inventory.analyzable();
        let (structure, hygiene) = scheduler.analyze_all(&targets);
        let files_analyzed = targets.len();
        info!(
            files = files_analyzed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extraction finished"
        );

        let metadata = ReportMetadata {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            root: inventory.root.display().to_string(),
            workers: scheduler.workers(),
            reference_matching: self.config.reference_matching,
            total_files_discovered: inventory.files.len(),
            total_lines_discovered: inventory.files.iter().map(|f| f.line_count).sum(),
        };

        let mut model = AnalysisModel::merge(inventory.files, structure, hygiene);

        UsageAnalyzer::new(self.config.reference_matching).annotate(&mut model.classes);
        let usage = UsageReport::collect(&model.classes, &model.variables);

        let graph = DependencyGraph::build(&model.classes);
        let dependencies = graph.metrics(&self.config.cycle_limits());
        info!(
            nodes = dependencies.total_classes,
            edges = dependencies.total_dependencies,
            cycles = dependencies.circular_dependencies,
            "dependency graph analyzed"
        );

        let report = AnalysisReport {
            quality: QualitySummary::build(&model, files_analyzed),
            coding_standards: CodingStandardsSummary::build(&model),
            cleanup: CleanupMetrics::build(&model, &usage),
            suggestions: summary::suggestions(&model, &usage, &validation.unsupported_languages),
            projection: ArchitectureProjection::build(&model.classes, self.config.projection_class_limit),
            dependency_edges: graph.edges(),
            dependencies,
            usage,
            validation,
            metadata,
            model,
        };
        info!(elapsed_ms = started.elapsed().as_millis() as u64, "analysis finished");
        Ok(report)
    }

    pub fn run(&self, root: &Path) -> Result<AnalysisReport> {
        let inventory = self.inventory(root)?;
        self.analyze(inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_supported_files_aborts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.go"), "package main\n").unwrap();
        fs::write(dir.path().join("logo.png"), [0u8, 1, 2]).unwrap();

        let pipeline = Pipeline::new(AnalysisConfig::default()).unwrap();
        let err = pipeline.run(dir.path()).unwrap_err();
        assert!(matches!(err, AnalysisError::NoSupportedFiles { total_files: 2, .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AnalysisConfig {
            complexity_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(Pipeline::new(config), Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_small_run() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("A.java"),
            "package app;\nimport app.B;\npublic class A {\n    public void run() { new B().go(); }\n}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("B.java"),
            "package app;\npublic class B {\n    public void go() {}\n}\n",
        )
        .unwrap();
        fs::write(dir.path().join("C.java"), "package app;\nclass C {}\n").unwrap();

        let config = AnalysisConfig {
            worker_count: Some(2),
            ..Default::default()
        };
        let report = Pipeline::new(config).unwrap().run(dir.path()).unwrap();

        assert_eq!(report.quality.total_classes, 3);
        assert_eq!(report.metadata.workers, 2);
        let unused: Vec<_> = report.usage.unused_classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(unused, vec!["A", "C"]);
        assert_eq!(report.dependencies.total_dependencies, 1);
        assert!(report.dependencies.is_dag);
        let b = report.model.classes.iter().find(|c| c.name == "B").unwrap();
        assert_eq!(b.used_count, 1);
        assert!(b.methods[0].is_used);
    }
}
