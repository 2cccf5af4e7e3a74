//! Output formatting for analysis reports.
//!
//! Two formats:
//! - Pretty: colored terminal summary for people
//! - JSON: the full report for programmatic consumers

use colored::*;
use serde::Serialize;

use crate::aggregate::AnalysisModel;
use crate::analysis::Severity;
use crate::graph::{DependencyEdge, DependencyMetrics};
use crate::pipeline::{AnalysisReport, ReportMetadata};
use crate::projection::ArchitectureProjection;
use crate::summary::{
    CleanupMetrics, CodingStandardsSummary, ComplexityLevel, QualitySummary, Suggestion,
};
use crate::usage::UsageReport;
use crate::walk::LanguageValidation;

/// Rows shown per section in pretty output unless details are requested.
const PRETTY_ROWS: usize = 10;

// =============================================================================
// JSON Format
// =============================================================================

/// Borrowed view of an [`AnalysisReport`] for serialization. The extracted
/// model is large, so it is only included on request.
#[derive(Serialize)]
pub struct JsonReport<'a> {
    pub metadata: &'a ReportMetadata,
    pub language_validation: &'a LanguageValidation,
    pub quality: &'a QualitySummary,
    pub coding_standards: &'a CodingStandardsSummary,
    pub usage_analysis: &'a UsageReport,
    pub cleanup: &'a CleanupMetrics,
    pub dependency_analysis: &'a DependencyMetrics,
    pub dependency_edges: &'a [DependencyEdge],
    pub architecture: &'a ArchitectureProjection,
    pub improvement_suggestions: &'a [Suggestion],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a AnalysisModel>,
}

impl<'a> JsonReport<'a> {
    pub fn new(report: &'a AnalysisReport, include_model: bool) -> Self {
        Self {
            metadata: &report.metadata,
            language_validation: &report.validation,
            quality: &report.quality,
            coding_standards: &report.coding_standards,
            usage_analysis: &report.usage,
            cleanup: &report.cleanup,
            dependency_analysis: &report.dependencies,
            dependency_edges: &report.dependency_edges,
            architecture: &report.projection,
            improvement_suggestions: &report.suggestions,
            model: include_model.then_some(&report.model),
        }
    }
}

pub fn to_json(report: &AnalysisReport, include_model: bool) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&JsonReport::new(report, include_model))?)
}

/// Write the report as JSON to stdout.
pub fn write_json(report: &AnalysisReport, include_model: bool) -> anyhow::Result<()> {
    println!("{}", to_json(report, include_model)?);
    Ok(())
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Write a human-readable summary to stdout.
pub fn write_pretty(report: &AnalysisReport, show_details: bool) {
    let rows = if show_details { usize::MAX } else { PRETTY_ROWS };

    // Header
    println!();
    print!("  ");
    print!("{}", "codecensus".cyan().bold());
    println!(" v{}", report.metadata.tool_version);
    println!();

    print!("  {}", "Scanning: ".dimmed());
    println!("{}", report.metadata.root);
    print!("  {}", "Workers:  ".dimmed());
    println!("{}", report.metadata.workers);
    println!();

    write_languages(&report.validation);
    println!();

    write_quality(&report.quality);
    println!();

    write_issues(report, rows);

    write_usage(&report.usage, &report.cleanup, rows);
    println!();

    write_dependencies(&report.dependencies);
    println!();

    write_standards(&report.coding_standards);
    println!();

    if !report.suggestions.is_empty() {
        write_suggestions(&report.suggestions);
        println!();
    }
}

fn write_languages(validation: &LanguageValidation) {
    println!("  {}", "Languages:".bold());
    for (language, count) in &validation.language_distribution {
        let label = format!("{:<12}", language.as_str());
        if language.is_supported() {
            println!("    {} {:>6}", label.green(), count);
        } else {
            println!("    {} {:>6}", label.dimmed(), count);
        }
    }
    print!("  {}", "Primary: ".dimmed());
    println!("{}", validation.primary_language);
    for warning in &validation.warnings {
        println!("  {} {}", "!".yellow(), warning.yellow());
    }
}

fn write_quality(quality: &QualitySummary) {
    print!("  {}", "Quality: ".bold());
    write_colored_quality(quality.quality_score);
    print!("/10  Maintainability: {:.0}  Complexity: ", quality.maintainability_index);
    match quality.estimated_complexity {
        ComplexityLevel::Low => print!("{}", "Low".green()),
        ComplexityLevel::Medium => print!("{}", "Medium".yellow()),
        ComplexityLevel::High => print!("{}", "High".red()),
    }
    println!();
    println!(
        "    {} files, {} classes, {} methods, {} lines, avg complexity {:.2}",
        quality.total_files_analyzed,
        quality.total_classes,
        quality.total_methods,
        quality.total_lines,
        quality.average_complexity
    );
}

fn write_colored_quality(score: f64) {
    let text = format!("{:.1}", score);
    match score {
        s if s >= 7.0 => print!("{}", text.green().bold()),
        s if s >= 5.0 => print!("{}", text.yellow()),
        _ => print!("{}", text.red()),
    }
}

fn write_issues(report: &AnalysisReport, rows: usize) {
    let issues = &report.model.issues;
    if issues.is_empty() {
        return;
    }

    println!("  {} ({}):", "Issues".bold(), issues.len());
    println!();
    for issue in issues.iter().take(rows) {
        write_severity_tag(issue.severity);
        print!("   ");
        print!("{:<18}", issue.rule.as_str().dimmed());
        print!("{}", issue.file_path.blue());
        print!("{}", format!(":{}", issue.line).dimmed());
        println!();
        println!("             {}", issue.message);
    }
    if issues.len() > rows {
        println!("    {}", format!("... {} more (use --details)", issues.len() - rows).dimmed());
    }
    println!();
}

fn write_severity_tag(severity: Severity) {
    match severity {
        Severity::Critical => print!("    {} ", "CRIT".red().bold()),
        Severity::High => print!("    {} ", "HIGH".red()),
        Severity::Medium => print!("    {} ", "MED ".yellow()),
        Severity::Low => print!("    {} ", "LOW ".blue()),
    }
}

fn write_usage(usage: &UsageReport, cleanup: &CleanupMetrics, rows: usize) {
    println!("  {}", "Unused code:".bold());
    println!(
        "    {} classes, {} methods, {} variables  ({} lines, {:.2}% cleanup potential)",
        usage.unused_classes.len(),
        usage.unused_methods.len(),
        usage.unused_variables.len(),
        cleanup.unused_loc,
        cleanup.potential_cleanup_percentage
    );
    for class in usage.unused_classes.iter().take(rows) {
        print!("    {:<8}", "class".dimmed());
        print!("{:<32}", class.name);
        println!("{}", format!("{}:{}", class.file_path, class.line).blue());
    }
    for method in usage.unused_methods.iter().take(rows) {
        print!("    {:<8}", "method".dimmed());
        print!("{:<32}", format!("{}.{}", method.class_name, method.method_name));
        println!("{}", format!("{}:{}", method.file_path, method.line).blue());
    }
}

fn write_dependencies(metrics: &DependencyMetrics) {
    println!("  {}", "Dependencies:".bold());
    println!(
        "    {} classes, {} edges, density {:.3}, clustering {:.3}, {} components",
        metrics.total_classes,
        metrics.total_dependencies,
        metrics.density,
        metrics.average_clustering,
        metrics.strongly_connected_components
    );
    if metrics.is_dag {
        println!("    {}", "acyclic".green());
        return;
    }

    let count = if metrics.cycle_search_truncated {
        format!("{}+", metrics.circular_dependencies)
    } else {
        metrics.circular_dependencies.to_string()
    };
    println!("    {} {}", count.red(), "circular dependencies".red());
    for cycle in &metrics.cycle_details {
        let mut path = cycle.join(" -> ");
        if let Some(first) = cycle.first() {
            path.push_str(" -> ");
            path.push_str(first);
        }
        println!("      {}", path);
    }
}

fn write_standards(standards: &CodingStandardsSummary) {
    println!("  {}", "Coding standards:".bold());
    println!(
        "    {} violations in {} files ({} clean), avg style score {:.2}",
        standards.total_violations,
        standards.files_analyzed,
        standards.clean_files,
        standards.average_style_score
    );

    let mut rules: Vec<(&String, &usize)> = standards.violations_by_rule.iter().collect();
    rules.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (rule, count) in rules {
        println!("    {:<24} {:>5}", rule.dimmed(), count);
    }
}

fn write_suggestions(suggestions: &[Suggestion]) {
    println!("  {}", "Suggestions:".bold());
    for suggestion in suggestions {
        write_severity_tag(suggestion.priority);
        println!("{}", suggestion.description);
        println!("             {}", suggestion.action.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::pipeline::Pipeline;
    use std::fs;
    use tempfile::TempDir;

    fn sample_report() -> AnalysisReport {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("shapes.py"),
            "class Shape:\n    def area(self):\n        return 0\n\nclass Square(Shape):\n    def area(self):\n        return 4\n",
        )
        .unwrap();
        Pipeline::new(AnalysisConfig::default())
            .unwrap()
            .run(dir.path())
            .unwrap()
    }

    #[test]
    fn test_json_sections() {
        let report = sample_report();
        let json: serde_json::Value = serde_json::from_str(&to_json(&report, false).unwrap()).unwrap();

        for key in [
            "metadata",
            "language_validation",
            "quality",
            "coding_standards",
            "usage_analysis",
            "cleanup",
            "dependency_analysis",
            "dependency_edges",
            "architecture",
            "improvement_suggestions",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json.get("model").is_none());
        assert_eq!(json["language_validation"]["primary_language"], "python");
        assert_eq!(json["dependency_analysis"]["is_dag"], true);
        assert_eq!(json["dependency_edges"][0]["kind"], "extends");
    }

    #[test]
    fn test_json_with_model() {
        let report = sample_report();
        let json: serde_json::Value = serde_json::from_str(&to_json(&report, true).unwrap()).unwrap();
        let classes = json["model"]["classes"].as_array().unwrap();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[1]["extends"], "Shape");
    }
}
