//! CSS extractor: custom properties and a few formatting rules.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::style::{match_window, numbered_lines, StyleChecker};
use crate::analysis::text::{count_identifier, is_markup_ident_char};
use crate::analysis::{ExtractionOutput, Extractor, Severity, StyleValidation, VariableRecord, VariableScope};
use crate::classify::Language;

lazy_static! {
    static ref CUSTOM_PROPERTY: Regex = Regex::new(r"(--[A-Za-z_-][A-Za-z0-9_-]*)\s*:[^;]+;").unwrap();
}

#[derive(Default)]
pub struct CssExtractor;

impl CssExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Collect `pattern` declarations (first capture group is the full name),
/// one record per distinct name.
pub(super) fn declared_names(
    content: &str,
    path: &str,
    pattern: &Regex,
    kind: &str,
) -> Vec<VariableRecord> {
    let mut seen = HashSet::new();
    let mut variables = Vec::new();

    for (i, line) in numbered_lines(content) {
        for caps in pattern.captures_iter(match_window(line)) {
            let name = &caps[1];
            if seen.insert(name.to_string()) {
                variables.push(VariableRecord::new(name, kind, VariableScope::Global, path, i));
            }
        }
    }

    for var in &mut variables {
        var.set_occurrences(count_identifier(content, &var.name, is_markup_ident_char));
    }
    variables
}

/// `AVOID_IMPORTANT`, shared by the style-sheet languages.
pub(super) fn check_important(checker: &mut StyleChecker, line_no: usize, line: &str) {
    if match_window(line).contains("!important") {
        checker.report_snippet(
            line_no,
            line,
            "AVOID_IMPORTANT",
            Severity::Medium,
            "Avoid using !important",
            "Use more specific selectors instead",
        );
    }
}

impl Extractor for CssExtractor {
    fn language(&self) -> Language {
        Language::Css
    }

    fn extract(&self, _path: &str, _content: &str) -> anyhow::Result<ExtractionOutput> {
        Ok(ExtractionOutput::default())
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        Ok(declared_names(content, path, &CUSTOM_PROPERTY, "css-variable"))
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);

        for (i, line) in numbered_lines(content) {
            if match_window(line).contains('{') && !line.trim().ends_with('{') {
                checker.report(
                    i,
                    "CSS_BRACE_PLACEMENT",
                    Severity::Low,
                    "Opening brace should be at end of line",
                    "Move opening brace to end of selector line",
                );
            }
            check_important(&mut checker, i, line);
        }

        checker.finish(Language::Css)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = ":root {\n  --accent: #f60;\n  --accent-dark: #c40;\n  --unused: 1px;\n}\n.button { color: var(--accent) !important; }\n.link {\n  color: var(--accent-dark);\n}\n";

    #[test]
    fn test_no_classes() {
        let output = CssExtractor::new().analyze_file("site.css", SHEET);
        assert!(output.classes.is_empty());
        assert!(output.issues.is_empty());
    }

    #[test]
    fn test_custom_properties() {
        let vars = CssExtractor::new().extract_variables(SHEET, "site.css").unwrap();
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["--accent", "--accent-dark", "--unused"]);
        assert!(vars.iter().all(|v| v.type_name == "css-variable"));

        assert_eq!(vars[0].usage_count, 1);
        assert!(vars[1].is_used);
        assert!(!vars[2].is_used);
        assert_eq!(vars[2].line, 4);
    }

    #[test]
    fn test_style_rules() {
        let validation = CssExtractor::new().validate_coding_standards(SHEET, "site.css");
        let rules: Vec<_> = validation.violations.iter().map(|v| (v.rule.as_str(), v.line)).collect();
        assert_eq!(rules, vec![("CSS_BRACE_PLACEMENT", 6), ("AVOID_IMPORTANT", 6)]);
        assert_eq!(validation.style_score, 9.0);
    }
}
