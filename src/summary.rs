//! Aggregate metrics over the analysis model.
//!
//! Everything here is derived from an annotated [`AnalysisModel`] and a
//! [`UsageReport`]; nothing is mutated.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::AnalysisModel;
use crate::analysis::{CodeIssue, IssueCategory, LanguageClass, Severity};
use crate::classify::Language;
use crate::usage::UsageReport;

/// Number of entries in the "most complex" lists.
pub const TOP_CLASSES: usize = 10;
pub const TOP_METHODS: usize = 20;

/// Methods above this complexity are named in the refactoring suggestion.
const SUGGESTION_COMPLEXITY: u32 = 8;
/// Items listed per suggestion.
const SUGGESTION_ITEMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

impl ComplexityLevel {
    pub fn from_average(avg_complexity: f64) -> Self {
        if avg_complexity > 7.0 {
            ComplexityLevel::High
        } else if avg_complexity > 4.0 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageComplexity {
    pub class_count: usize,
    pub average_complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexClass {
    pub name: String,
    pub language: Language,
    pub complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexMethod {
    pub class_name: String,
    pub method_name: String,
    pub complexity: u32,
}

/// Class-level quality numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_files_analyzed: usize,
    pub total_classes: usize,
    pub total_methods: usize,
    pub total_lines: usize,
    pub average_complexity: f64,
    /// 0 to 10, higher is better.
    pub quality_score: f64,
    pub maintainability_index: f64,
    pub estimated_complexity: ComplexityLevel,
    pub technical_debt_ratio: f64,
    pub total_issues: usize,
    pub issues_by_severity: BTreeMap<Severity, usize>,
    pub issues_by_category: BTreeMap<IssueCategory, usize>,
    pub complexity_by_language: BTreeMap<Language, LanguageComplexity>,
    pub most_complex_classes: Vec<ComplexClass>,
    pub most_complex_methods: Vec<ComplexMethod>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CodingStandardsSummary {
    pub files_analyzed: usize,
    pub clean_files: usize,
    pub total_violations: usize,
    pub average_style_score: f64,
    pub violations_by_severity: BTreeMap<Severity, usize>,
    pub violations_by_rule: BTreeMap<String, usize>,
    /// Files with at least one violation, per language.
    pub violations_by_language: BTreeMap<Language, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupMetrics {
    pub unused_loc: usize,
    /// Unused items as a share of all classes, methods and variables.
    pub potential_cleanup_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub category: String,
    pub priority: Severity,
    pub description: String,
    pub action: String,
    pub affected_items: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_loc_reduction: Option<usize>,
}

/// Mean class complexity, 0 without classes.
pub fn average_complexity(classes: &[LanguageClass]) -> f64 {
    if classes.is_empty() {
        return 0.0;
    }
    classes.iter().map(|c| c.complexity_score).sum::<f64>() / classes.len() as f64
}

/// Overall quality score in `[0, 10]`.
///
/// Starts at 8, loses up to 3 points for average complexity and up to 4 for
/// weighted issues per method. A run with no classes scores 5.
pub fn quality_score(classes: &[LanguageClass], issues: &[CodeIssue]) -> f64 {
    if classes.is_empty() {
        return 5.0;
    }

    let mut score = 8.0;
    score -= (average_complexity(classes) / 3.0).min(3.0);

    let total_methods: usize = classes.iter().map(|c| c.methods.len()).sum();
    if total_methods > 0 {
        let weighted: usize = issues
            .iter()
            .map(|i| match i.severity {
                Severity::Critical => 3,
                Severity::High => 2,
                Severity::Medium => 1,
                Severity::Low => 0,
            })
            .sum();
        let ratio = weighted as f64 / total_methods as f64;
        score -= (ratio * 2.0).min(4.0);
    }

    score.clamp(0.0, 10.0)
}

impl QualitySummary {
    pub fn build(model: &AnalysisModel, files_analyzed: usize) -> Self {
        let classes = &model.classes;
        let total_methods = model.total_methods();
        let avg = average_complexity(classes);

        let mut issues_by_severity = BTreeMap::new();
        let mut issues_by_category = BTreeMap::new();
        for issue in &model.issues {
            *issues_by_severity.entry(issue.severity).or_insert(0) += 1;
            *issues_by_category.entry(issue.category).or_insert(0) += 1;
        }

        let serious = model
            .issues
            .iter()
            .filter(|i| matches!(i.severity, Severity::Critical | Severity::High))
            .count();
        let technical_debt_ratio = if total_methods > 0 {
            serious as f64 / total_methods as f64
        } else {
            0.0
        };

        let mut per_language: BTreeMap<Language, (usize, f64)> = BTreeMap::new();
        for class in classes {
            let entry = per_language.entry(class.language).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += class.complexity_score;
        }
        let complexity_by_language = per_language
            .into_iter()
            .map(|(language, (count, total))| {
                (
                    language,
                    LanguageComplexity {
                        class_count: count,
                        average_complexity: round2(total / count as f64),
                    },
                )
            })
            .collect();

        let mut ranked_classes: Vec<&LanguageClass> = classes.iter().collect();
        ranked_classes.sort_by(|a, b| b.complexity_score.total_cmp(&a.complexity_score));
        let most_complex_classes = ranked_classes
            .into_iter()
            .take(TOP_CLASSES)
            .map(|c| ComplexClass {
                name: c.name.clone(),
                language: c.language,
                complexity: c.complexity_score,
            })
            .collect();

        let mut ranked_methods: Vec<_> = model.methods().collect();
        ranked_methods.sort_by(|a, b| b.cyclomatic_complexity.cmp(&a.cyclomatic_complexity));
        let most_complex_methods = ranked_methods
            .into_iter()
            .take(TOP_METHODS)
            .map(|m| ComplexMethod {
                class_name: m.class_name.clone(),
                method_name: m.name.clone(),
                complexity: m.cyclomatic_complexity,
            })
            .collect();

        Self {
            total_files_analyzed: files_analyzed,
            total_classes: classes.len(),
            total_methods,
            total_lines: classes.iter().map(|c| c.lines_of_code).sum(),
            average_complexity: round2(avg),
            quality_score: quality_score(classes, &model.issues),
            maintainability_index: (100.0 - avg * 10.0).max(0.0),
            estimated_complexity: ComplexityLevel::from_average(avg),
            technical_debt_ratio,
            total_issues: model.issues.len(),
            issues_by_severity,
            issues_by_category,
            complexity_by_language,
            most_complex_classes,
            most_complex_methods,
        }
    }
}

impl CodingStandardsSummary {
    pub fn build(model: &AnalysisModel) -> Self {
        let mut summary = CodingStandardsSummary {
            files_analyzed: model.style.len(),
            ..Default::default()
        };

        for validation in &model.style {
            if validation.is_valid {
                summary.clean_files += 1;
            } else if !validation.violations.is_empty() {
                *summary.violations_by_language.entry(validation.language).or_insert(0) += 1;
            }
            for violation in &validation.violations {
                summary.total_violations += 1;
                *summary.violations_by_severity.entry(violation.severity).or_insert(0) += 1;
                *summary.violations_by_rule.entry(violation.rule.clone()).or_insert(0) += 1;
            }
        }

        if !model.style.is_empty() {
            let total: f64 = model.style.iter().map(|s| s.style_score).sum();
            summary.average_style_score = round2(total / model.style.len() as f64);
        }
        summary
    }
}

impl CleanupMetrics {
    pub fn build(model: &AnalysisModel, usage: &UsageReport) -> Self {
        let population = model.classes.len() + model.total_methods() + model.variables.len();
        let potential_cleanup_percentage = if population > 0 {
            round2(usage.total_unused() as f64 / population as f64 * 100.0)
        } else {
            0.0
        };
        Self {
            unused_loc: usage.unused_loc(),
            potential_cleanup_percentage,
        }
    }
}

/// Improvement suggestions derived from usage and complexity findings.
pub fn suggestions(model: &AnalysisModel, usage: &UsageReport, unsupported: &[Language]) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if !usage.unused_classes.is_empty() {
        out.push(Suggestion {
            category: "Code Cleanup".to_string(),
            priority: Severity::Medium,
            description: format!(
                "Found {} unused classes that can be removed",
                usage.unused_classes.len()
            ),
            action: "Remove unused classes to reduce codebase size".to_string(),
            affected_items: usage
                .unused_classes
                .iter()
                .take(SUGGESTION_ITEMS)
                .map(|c| format!("{} ({})", c.name, c.language))
                .collect(),
            potential_loc_reduction: Some(usage.unused_classes.iter().map(|c| c.lines_of_code).sum()),
        });
    }

    if !usage.unused_methods.is_empty() {
        out.push(Suggestion {
            category: "Code Cleanup".to_string(),
            priority: Severity::Low,
            description: format!(
                "Found {} unused methods that can be removed",
                usage.unused_methods.len()
            ),
            action: "Remove unused methods".to_string(),
            affected_items: usage
                .unused_methods
                .iter()
                .take(SUGGESTION_ITEMS)
                .map(|m| format!("{}.{} ({})", m.class_name, m.method_name, m.language))
                .collect(),
            potential_loc_reduction: Some(usage.unused_methods.iter().map(|m| m.lines_of_code).sum()),
        });
    }

    let complex: Vec<String> = model
        .classes
        .iter()
        .flat_map(|c| c.methods.iter().map(move |m| (c, m)))
        .filter(|(_, m)| m.cyclomatic_complexity > SUGGESTION_COMPLEXITY)
        .map(|(c, m)| format!("{}.{} (complexity: {}, {})", c.name, m.name, m.cyclomatic_complexity, c.language))
        .collect();
    if !complex.is_empty() {
        out.push(Suggestion {
            category: "Code Complexity".to_string(),
            priority: Severity::High,
            description: format!("Found {} methods with high complexity", complex.len()),
            action: "Refactor complex methods by extracting smaller functions".to_string(),
            affected_items: complex.into_iter().take(SUGGESTION_ITEMS).collect(),
            potential_loc_reduction: None,
        });
    }

    if !unsupported.is_empty() {
        out.push(Suggestion {
            category: "Language Coverage".to_string(),
            priority: Severity::Low,
            description: format!("{} languages were counted but not analyzed", unsupported.len()),
            action: "Add extractors for the unsupported languages".to_string(),
            affected_items: unsupported.iter().map(|l| l.to_string()).collect(),
            potential_loc_reduction: None,
        });
    }

    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{IssueRule, LanguageMethod, Span, StyleValidation, StyleViolation};

    fn class(name: &str, complexities: &[u32]) -> LanguageClass {
        let mut class = LanguageClass::new(name, Language::Java, "A.java", Span::new(1, 40));
        class.lines_of_code = 30;
        for (i, c) in complexities.iter().enumerate() {
            let mut m = LanguageMethod::new(&format!("m{}", i), name, Span::new(i + 2, i + 3));
            m.cyclomatic_complexity = *c;
            class.methods.push(m);
        }
        class.update_complexity_score();
        class
    }

    #[test]
    fn test_quality_score() {
        assert_eq!(quality_score(&[], &[]), 5.0);

        // avg complexity 3 -> -1; one HIGH over 2 methods -> ratio 1 -> -2
        let classes = vec![class("A", &[3, 3])];
        let issues = vec![CodeIssue::new(IssueRule::ComplexMethod, "x", "A.java", 2)];
        assert!((quality_score(&classes, &issues) - 5.0).abs() < 1e-9);

        let issues: Vec<_> = (0..20)
            .map(|_| CodeIssue::new(IssueRule::GodClass, "x", "A.java", 1))
            .collect();
        let classes = vec![class("A", &[30])];
        assert_eq!(quality_score(&classes, &issues), 1.0);
    }

    #[test]
    fn test_complexity_level() {
        assert_eq!(ComplexityLevel::from_average(8.0), ComplexityLevel::High);
        assert_eq!(ComplexityLevel::from_average(7.0), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_average(4.0), ComplexityLevel::Low);
    }

    #[test]
    fn test_quality_summary() {
        let model = AnalysisModel {
            classes: vec![class("Calm", &[1, 1]), class("Busy", &[12, 6, 3])],
            issues: vec![
                CodeIssue::new(IssueRule::ComplexMethod, "x", "A.java", 3),
                CodeIssue::new(IssueRule::LongMethod, "x", "A.java", 3),
            ],
            ..Default::default()
        };
        let summary = QualitySummary::build(&model, 1);

        assert_eq!(summary.total_classes, 2);
        assert_eq!(summary.total_methods, 5);
        assert_eq!(summary.total_lines, 60);
        // (1 + 7) / 2
        assert_eq!(summary.average_complexity, 4.0);
        assert_eq!(summary.maintainability_index, 60.0);
        assert_eq!(summary.estimated_complexity, ComplexityLevel::Low);
        assert!((summary.technical_debt_ratio - 0.2).abs() < 1e-9);
        assert_eq!(summary.issues_by_severity[&Severity::High], 1);
        assert_eq!(summary.issues_by_severity[&Severity::Medium], 1);
        assert_eq!(summary.issues_by_category[&IssueCategory::Maintainability], 2);
        assert_eq!(summary.most_complex_classes[0].name, "Busy");
        assert_eq!(summary.most_complex_methods[0].complexity, 12);
        assert_eq!(summary.most_complex_methods.len(), 5);
        assert_eq!(summary.complexity_by_language[&Language::Java].class_count, 2);
    }

    #[test]
    fn test_coding_standards_summary() {
        let violation = StyleViolation {
            rule: "LINE_LENGTH".to_string(),
            severity: Severity::Low,
            message: "long".to_string(),
            file_path: "A.java".to_string(),
            line: 1,
            column: None,
            snippet: None,
            suggestion: None,
        };
        let model = AnalysisModel {
            style: vec![
                StyleValidation::from_violations("A.java", Language::Java, vec![violation.clone(), violation]),
                StyleValidation::from_violations("b.py", Language::Python, Vec::new()),
            ],
            ..Default::default()
        };
        let summary = CodingStandardsSummary::build(&model);
        assert_eq!(summary.files_analyzed, 2);
        assert_eq!(summary.clean_files, 1);
        assert_eq!(summary.total_violations, 2);
        assert_eq!(summary.violations_by_rule["LINE_LENGTH"], 2);
        assert_eq!(summary.violations_by_language[&Language::Java], 1);
        assert_eq!(summary.average_style_score, 9.5);
    }

    #[test]
    fn test_cleanup_and_suggestions() {
        let mut busy = class("Busy", &[9]);
        busy.is_used = true;
        let model = AnalysisModel {
            classes: vec![class("Idle", &[1]), busy],
            ..Default::default()
        };
        let usage = UsageReport::collect(&model.classes, &model.variables);
        let cleanup = CleanupMetrics::build(&model, &usage);
        // Idle plus both methods are unused out of 2 classes + 2 methods
        assert_eq!(usage.total_unused(), 3);
        assert_eq!(cleanup.potential_cleanup_percentage, 75.0);

        let suggestions = suggestions(&model, &usage, &[Language::Go]);
        let categories: Vec<_> = suggestions.iter().map(|s| s.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["Code Cleanup", "Code Cleanup", "Code Complexity", "Language Coverage"]
        );
        assert_eq!(suggestions[2].affected_items, vec!["Busy.m0 (complexity: 9, java)"]);
    }
}
