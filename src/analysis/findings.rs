//! Fixed-threshold findings shared by every extractor.

use crate::analysis::{CodeIssue, IssueRule, LanguageClass, LanguageMethod};
use crate::config::Thresholds;

/// `COMPLEX_METHOD` and `LONG_METHOD` checks for one method.
pub fn method_findings(method: &LanguageMethod, file_path: &str, thresholds: &Thresholds) -> Vec<CodeIssue> {
    let mut issues = Vec::new();

    if method.cyclomatic_complexity > thresholds.complexity {
        issues.push(
            CodeIssue::new(
                IssueRule::ComplexMethod,
                format!(
                    "Method complexity is {}, exceeds threshold of {}",
                    method.cyclomatic_complexity, thresholds.complexity
                ),
                file_path,
                method.span.start_line,
            )
            .with_method(&method.name)
            .with_suggestion("Break down into smaller methods"),
        );
    }

    if method.lines_of_code > thresholds.method_length {
        issues.push(
            CodeIssue::new(
                IssueRule::LongMethod,
                format!("Method has {} lines, consider refactoring", method.lines_of_code),
                file_path,
                method.span.start_line,
            )
            .with_method(&method.name)
            .with_suggestion("Extract functionality into separate methods"),
        );
    }

    issues
}

/// `CLASS_TOO_LONG` and `GOD_CLASS` checks for one class.
pub fn class_findings(class: &LanguageClass, thresholds: &Thresholds) -> Vec<CodeIssue> {
    let mut issues = Vec::new();

    if class.lines_of_code > thresholds.class_length {
        issues.push(
            CodeIssue::new(
                IssueRule::ClassTooLong,
                format!("Class has {} lines, consider splitting", class.lines_of_code),
                &class.file_path,
                class.span.start_line,
            )
            .with_suggestion("Split into smaller, focused classes"),
        );
    }

    if class.methods.len() > thresholds.god_class_limit(class.language) {
        issues.push(
            CodeIssue::new(
                IssueRule::GodClass,
                format!(
                    "Class has {} methods, violates Single Responsibility Principle",
                    class.methods.len()
                ),
                &class.file_path,
                class.span.start_line,
            )
            .with_suggestion("Decompose into multiple classes with single responsibilities"),
        );
    }

    issues
}

/// Compute derived class metrics and append all threshold findings.
pub fn finish_class(class: &mut LanguageClass, thresholds: &Thresholds, issues: &mut Vec<CodeIssue>) {
    class.update_complexity_score();
    for method in &class.methods {
        issues.extend(method_findings(method, &class.file_path, thresholds));
    }
    issues.extend(class_findings(class, thresholds));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Severity, Span};
    use crate::classify::Language;

    fn class_with_methods(language: Language, count: usize) -> LanguageClass {
        let mut class = LanguageClass::new("Big", language, "Big.src", Span::new(1, 200));
        class.methods = (0..count)
            .map(|i| LanguageMethod::new(&format!("m{}", i), "Big", Span::new(i + 2, i + 2)))
            .collect();
        class
    }

    #[test]
    fn test_god_class_java_threshold() {
        let thresholds = Thresholds::default();
        let issues = class_findings(&class_with_methods(Language::Java, 25), &thresholds);
        let god: Vec<_> = issues.iter().filter(|i| i.rule == IssueRule::GodClass).collect();
        assert_eq!(god.len(), 1);
        assert_eq!(god[0].severity, Severity::High);
        assert_eq!(
            god[0].message,
            "Class has 25 methods, violates Single Responsibility Principle"
        );

        assert!(class_findings(&class_with_methods(Language::Java, 20), &thresholds).is_empty());
    }

    #[test]
    fn test_god_class_python_threshold() {
        let thresholds = Thresholds::default();
        assert_eq!(
            class_findings(&class_with_methods(Language::Python, 16), &thresholds).len(),
            1
        );
        assert!(class_findings(&class_with_methods(Language::Python, 15), &thresholds).is_empty());
    }

    #[test]
    fn test_class_too_long() {
        let mut class = class_with_methods(Language::Java, 1);
        class.lines_of_code = 301;
        let issues = class_findings(&class, &Thresholds::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, IssueRule::ClassTooLong);
        assert_eq!(issues[0].severity, Severity::Medium);
    }

    #[test]
    fn test_method_findings() {
        let mut method = LanguageMethod::new("run", "Job", Span::new(10, 80));
        method.cyclomatic_complexity = 11;
        method.lines_of_code = 51;
        let issues = method_findings(&method, "Job.java", &Thresholds::default());
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].rule, IssueRule::ComplexMethod);
        assert_eq!(issues[0].message, "Method complexity is 11, exceeds threshold of 10");
        assert_eq!(issues[0].method.as_deref(), Some("run"));
        assert_eq!(issues[0].line, 10);
        assert_eq!(issues[1].rule, IssueRule::LongMethod);

        method.cyclomatic_complexity = 10;
        method.lines_of_code = 50;
        assert!(method_findings(&method, "Job.java", &Thresholds::default()).is_empty());
    }

    #[test]
    fn test_finish_class_sets_score() {
        let mut class = class_with_methods(Language::Java, 2);
        class.methods[0].cyclomatic_complexity = 3;
        let mut issues = Vec::new();
        finish_class(&mut class, &Thresholds::default(), &mut issues);
        assert_eq!(class.complexity_score, 2.0);
        assert!(issues.is_empty());
    }
}
