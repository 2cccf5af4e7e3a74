//! HTML extractor. Markup declares no classes; only ids and class tokens are
//! collected, and the style pass checks a couple of accessibility rules.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::style::{match_window, numbered_lines, StyleChecker};
use crate::analysis::text::{count_identifier, is_markup_ident_char};
use crate::analysis::{ExtractionOutput, Extractor, Severity, StyleValidation, VariableRecord, VariableScope};
use crate::classify::Language;

lazy_static! {
    static ref ID_ATTR: Regex = Regex::new(r#"\bid\s*=\s*["']([^"']+)["']"#).unwrap();
    static ref CLASS_ATTR: Regex = Regex::new(r#"\bclass\s*=\s*["']([^"']+)["']"#).unwrap();
}

#[derive(Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn language(&self) -> Language {
        Language::Html
    }

    fn extract(&self, _path: &str, _content: &str) -> anyhow::Result<ExtractionOutput> {
        Ok(ExtractionOutput::default())
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        let mut seen = HashSet::new();
        let mut variables = Vec::new();

        for (i, line) in numbered_lines(content) {
            let window = match_window(line);

            let ids = ID_ATTR
                .captures_iter(window)
                .map(|caps| (caps[1].trim().to_string(), "html-id"));
            let classes = CLASS_ATTR.captures_iter(window).flat_map(|caps| {
                caps[1]
                    .split_whitespace()
                    .map(|token| (token.to_string(), "html-class"))
                    .collect::<Vec<_>>()
            });

            for (name, kind) in ids.chain(classes) {
                if !name.is_empty() && seen.insert((name.clone(), kind)) {
                    variables.push(VariableRecord::new(&name, kind, VariableScope::Global, path, i));
                }
            }
        }

        for var in &mut variables {
            var.set_occurrences(count_identifier(content, &var.name, is_markup_ident_char));
        }
        Ok(variables)
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);
        let has_label = content.to_lowercase().contains("label");

        for (i, line) in numbered_lines(content) {
            let window = match_window(line);

            if window.contains("<img") && !window.contains("alt=") {
                checker.report_snippet(
                    i,
                    line,
                    "IMG_ALT_REQUIRED",
                    Severity::High,
                    "img tag missing alt attribute",
                    "Add alt attribute for accessibility",
                );
            }
            if window.contains("<input") && window.contains("type=") && !has_label {
                checker.report_snippet(
                    i,
                    line,
                    "INPUT_LABEL_REQUIRED",
                    Severity::Medium,
                    "Input should have associated label",
                    "Associate input with label element",
                );
            }
        }

        checker.finish(Language::Html)
    }
}
