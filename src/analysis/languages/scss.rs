//! SCSS extractor: `$variables` plus SCSS formatting rules.

use lazy_static::lazy_static;
use regex::Regex;

use super::css::{check_important, declared_names};
use crate::analysis::style::{numbered_lines, StyleChecker};
use crate::analysis::{ExtractionOutput, Extractor, Severity, StyleValidation, VariableRecord};
use crate::classify::Language;

lazy_static! {
    static ref SCSS_VARIABLE: Regex = Regex::new(r"(\$[A-Za-z_-][A-Za-z0-9_-]*)\s*:[^;]+;").unwrap();
}

#[derive(Default)]
pub struct ScssExtractor;

impl ScssExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ScssExtractor {
    fn language(&self) -> Language {
        Language::Scss
    }

    fn extract(&self, _path: &str, _content: &str) -> anyhow::Result<ExtractionOutput> {
        Ok(ExtractionOutput::default())
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        Ok(declared_names(content, path, &SCSS_VARIABLE, "scss-variable"))
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);

        for (i, line) in numbered_lines(content) {
            let trimmed = line.trim();

            if trimmed.starts_with('$') && trimmed.contains(':') && !trimmed.ends_with(';') {
                checker.report(
                    i,
                    "SCSS_SEMICOLON",
                    Severity::Low,
                    "SCSS variable declaration should end with semicolon",
                    "Add semicolon at end of variable declaration",
                );
            }
            if trimmed.contains("@import") && !(trimmed.ends_with("';") || trimmed.ends_with("\";")) {
                checker.report(
                    i,
                    "SCSS_IMPORT_QUOTES",
                    Severity::Low,
                    "SCSS import should use quotes",
                    "Use quotes around import path",
                );
            }
            check_important(&mut checker, i, line);
        }

        checker.finish(Language::Scss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "@import 'base';\n@import mixins;\n$primary: #333;\n$spacing: 4px\n$primary-light: lighten($primary, 20%);\n.card {\n  color: $primary !important;\n}\n";

    #[test]
    fn test_scss_variables() {
        let vars = ScssExtractor::new().extract_variables(SHEET, "theme.scss").unwrap();
        let names: Vec<_> = vars.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["$primary", "$primary-light"]);
        assert_eq!(vars[0].type_name, "scss-variable");
        assert_eq!(vars[0].usage_count, 2);
        assert!(!vars[1].is_used);
    }

    #[test]
    fn test_style_rules() {
        let validation = ScssExtractor::new().validate_coding_standards(SHEET, "theme.scss");
        let rules: Vec<_> = validation.violations.iter().map(|v| (v.rule.as_str(), v.line)).collect();
        assert_eq!(
            rules,
            vec![
                ("SCSS_IMPORT_QUOTES", 2),
                ("SCSS_SEMICOLON", 4),
                ("AVOID_IMPORTANT", 7),
            ]
        );
    }

    #[test]
    fn test_no_classes() {
        assert!(ScssExtractor::new().analyze_file("theme.scss", SHEET).classes.is_empty());
    }
}
