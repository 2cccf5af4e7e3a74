//! Line-local coding-standard checks.
//!
//! Every rule looks at one line at a time, clipped to
//! [`LINE_MATCH_CAP`](super::text::LINE_MATCH_CAP) bytes, so the cost of a
//! style pass stays linear in file size.

use crate::analysis::text::{capped, truncate_at_boundary};
use crate::analysis::{Severity, StyleValidation, StyleViolation};
use crate::classify::Language;

/// Iterate `(line_number, line)` pairs, 1-indexed.
pub fn numbered_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content.lines().enumerate().map(|(i, line)| (i + 1, line))
}

/// Accumulates violations for one file.
pub struct StyleChecker<'a> {
    file_path: &'a str,
    violations: Vec<StyleViolation>,
}

impl<'a> StyleChecker<'a> {
    pub fn new(file_path: &'a str) -> Self {
        Self {
            file_path,
            violations: Vec::new(),
        }
    }

    pub fn report(
        &mut self,
        line: usize,
        rule: &str,
        severity: Severity,
        message: impl Into<String>,
        suggestion: &str,
    ) {
        self.violations.push(StyleViolation {
            rule: rule.to_string(),
            severity,
            message: message.into(),
            file_path: self.file_path.to_string(),
            line,
            column: None,
            snippet: None,
            suggestion: Some(suggestion.to_string()),
        });
    }

    /// Report with the offending line (trimmed and clipped) attached.
    pub fn report_snippet(
        &mut self,
        line: usize,
        text: &str,
        rule: &str,
        severity: Severity,
        message: impl Into<String>,
        suggestion: &str,
    ) {
        self.report(line, rule, severity, message, suggestion);
        if let Some(last) = self.violations.last_mut() {
            last.snippet = Some(truncate_at_boundary(text.trim(), 120).to_string());
        }
    }

    /// Flag lines longer than `limit` characters.
    pub fn check_line_length(&mut self, line_no: usize, line: &str, limit: usize, rule: &str, suggestion: &str) {
        let len = line.chars().count();
        if len > limit {
            self.report(
                line_no,
                rule,
                Severity::Low,
                format!("Line exceeds {} characters ({} characters)", limit, len),
                suggestion,
            );
            if let Some(last) = self.violations.last_mut() {
                last.column = Some(limit + 1);
            }
        }
    }

    /// Flag trailing spaces or tabs.
    pub fn check_trailing_whitespace(&mut self, line_no: usize, line: &str) {
        if line.ends_with(' ') || line.ends_with('\t') {
            self.report(
                line_no,
                "TRAILING_WHITESPACE",
                Severity::Low,
                "Line has trailing whitespace",
                "Remove trailing whitespace",
            );
        }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn finish(self, language: Language) -> StyleValidation {
        StyleValidation::from_violations(self.file_path, language, self.violations)
    }
}

/// Clip a line for pattern matching.
pub fn match_window(line: &str) -> &str {
    capped(line)
}
