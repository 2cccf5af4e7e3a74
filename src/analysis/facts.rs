//! Fact structures produced by the extractors.
//!
//! These are plain serializable aggregates. Extractors create them; after
//! aggregation only the usage analyzer mutates them (the `used_count` and
//! `is_used` fields on classes and methods).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::Language;

/// Source location span with 1-indexed line positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start line (1-indexed).
    pub start_line: usize,
    /// End line (1-indexed, inclusive).
    pub end_line: usize,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        // tree-sitter rows are 0-indexed
        Self::new(node.start_position().row + 1, node.end_position().row + 1)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}

/// Severity of an issue or style violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Issue category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueCategory {
    Reliability,
    Maintainability,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Reliability => "RELIABILITY",
            IssueCategory::Maintainability => "MAINTAINABILITY",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule ids for static-analysis issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueRule {
    ParseError,
    FileReadError,
    ClassTooLong,
    GodClass,
    ComplexMethod,
    LongMethod,
}

impl IssueRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueRule::ParseError => "PARSE_ERROR",
            IssueRule::FileReadError => "FILE_READ_ERROR",
            IssueRule::ClassTooLong => "CLASS_TOO_LONG",
            IssueRule::GodClass => "GOD_CLASS",
            IssueRule::ComplexMethod => "COMPLEX_METHOD",
            IssueRule::LongMethod => "LONG_METHOD",
        }
    }

    /// Fixed severity for each rule.
    pub fn severity(&self) -> Severity {
        match self {
            IssueRule::ParseError
            | IssueRule::FileReadError
            | IssueRule::GodClass
            | IssueRule::ComplexMethod => Severity::High,
            IssueRule::ClassTooLong | IssueRule::LongMethod => Severity::Medium,
        }
    }

    pub fn category(&self) -> IssueCategory {
        match self {
            IssueRule::ParseError | IssueRule::FileReadError => IssueCategory::Reliability,
            _ => IssueCategory::Maintainability,
        }
    }
}

impl fmt::Display for IssueRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One static-analysis finding. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeIssue {
    pub severity: Severity,
    pub category: IssueCategory,
    pub rule: IssueRule,
    pub message: String,
    pub file_path: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl CodeIssue {
    /// Create an issue with the rule's fixed severity and category.
    pub fn new(rule: IssueRule, message: impl Into<String>, file_path: &str, line: usize) -> Self {
        Self {
            severity: rule.severity(),
            category: rule.category(),
            rule,
            message: message.into(),
            file_path: file_path.to_string(),
            line,
            method: None,
            suggestion: None,
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = Some(method.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// A `PARSE_ERROR` issue at line 1.
    pub fn parse_error(language: Language, file_path: &str, detail: &str) -> Self {
        Self::new(
            IssueRule::ParseError,
            format!("Failed to parse {} file: {}", language, detail),
            file_path,
            1,
        )
    }

    /// A `FILE_READ_ERROR` issue at line 1.
    pub fn file_read_error(file_path: &str, detail: &str) -> Self {
        Self::new(
            IssueRule::FileReadError,
            format!("Failed to read file: {}", detail),
            file_path,
            1,
        )
    }
}

/// Declared visibility of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    /// Java package-private; no modifier written.
    #[default]
    Package,
}

impl Visibility {
    /// Derive visibility from Java-style modifier keywords.
    pub fn from_modifiers<'a>(modifiers: impl IntoIterator<Item = &'a String>) -> Self {
        for m in modifiers {
            match m.as_str() {
                "public" => return Visibility::Public,
                "protected" => return Visibility::Protected,
                "private" => return Visibility::Private,
                _ => {}
            }
        }
        Visibility::Package
    }

    /// Python/JavaScript naming convention: a leading underscore or `#` is private.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("__") && name.ends_with("__") {
            Visibility::Public
        } else if name.starts_with('_') || name.starts_with('#') {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

/// A named, typed method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A field declared in a class body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub line: usize,
}

/// One extracted method or function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageMethod {
    pub name: String,
    /// Name of the owning class.
    pub class_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: String,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub visibility: Visibility,
    pub span: Span,
    /// Always >= 1.
    pub cyclomatic_complexity: u32,
    pub lines_of_code: usize,
    /// Raw callee identifiers as written in the source. Not resolved.
    pub calls: BTreeSet<String>,
    pub used_count: usize,
    pub is_used: bool,
}

impl LanguageMethod {
    pub fn new(name: &str, class_name: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            class_name: class_name.to_string(),
            parameters: Vec::new(),
            return_type: String::new(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            visibility: Visibility::default(),
            span,
            cyclomatic_complexity: 1,
            lines_of_code: 0,
            calls: BTreeSet::new(),
            used_count: 0,
            is_used: false,
        }
    }

    /// The composite `Class.method` key used by the usage index.
    pub fn key(&self) -> String {
        format!("{}.{}", self.class_name, self.name)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == self.class_name
    }
}

/// One extracted class, interface, enum or record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageClass {
    /// Never empty.
    pub name: String,
    /// Package or namespace; empty when the language has none.
    pub package: String,
    pub file_path: String,
    pub language: Language,
    pub span: Span,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Ordered, duplicate-free.
    pub implements: Vec<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub methods: Vec<LanguageMethod>,
    pub fields: Vec<FieldRecord>,
    pub imports: Vec<String>,
    pub inner_classes: Vec<String>,
    pub lines_of_code: usize,
    /// Mean method complexity, 0 without methods.
    pub complexity_score: f64,
    pub used_count: usize,
    pub is_used: bool,
}

impl LanguageClass {
    pub fn new(name: &str, language: Language, file_path: &str, span: Span) -> Self {
        Self {
            name: name.to_string(),
            package: String::new(),
            file_path: file_path.to_string(),
            language,
            span,
            extends: None,
            implements: Vec::new(),
            modifiers: Vec::new(),
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            imports: Vec::new(),
            inner_classes: Vec::new(),
            lines_of_code: 0,
            complexity_score: 0.0,
            used_count: 0,
            is_used: false,
        }
    }

    /// Add an implemented interface, keeping first-seen order.
    pub fn add_interface(&mut self, name: &str) {
        let name = name.trim();
        if !name.is_empty() && !self.implements.iter().any(|i| i == name) {
            self.implements.push(name.to_string());
        }
    }

    /// Recompute `complexity_score` from the current method list.
    pub fn update_complexity_score(&mut self) {
        self.complexity_score = if self.methods.is_empty() {
            0.0
        } else {
            let total: u32 = self.methods.iter().map(|m| m.cyclomatic_complexity).sum();
            f64::from(total) / self.methods.len() as f64
        };
    }
}

/// Scope kind of a declared variable. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableScope {
    Class,
    Method,
    Global,
    Parameter,
}

/// One declared variable, field, parameter, or markup/style name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    /// Best-effort declared type, or a kind label such as `html-id`.
    #[serde(rename = "type")]
    pub type_name: String,
    pub scope: VariableScope,
    pub file_path: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub usage_count: usize,
    pub is_used: bool,
}

impl VariableRecord {
    pub fn new(name: &str, type_name: &str, scope: VariableScope, file_path: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            scope,
            file_path: file_path.to_string(),
            line,
            owner: None,
            usage_count: 0,
            is_used: false,
        }
    }

    pub fn with_owner(mut self, owner: Option<&str>) -> Self {
        self.owner = owner.map(str::to_string);
        self
    }

    /// Record how many times the name occurs in its file, declaration included.
    pub fn set_occurrences(&mut self, occurrences: usize) {
        self.usage_count = occurrences.saturating_sub(1);
        self.is_used = self.usage_count > 0;
    }
}

/// One coding-standard finding. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleViolation {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub file_path: String,
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Style outcome for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleValidation {
    pub file_path: String,
    pub language: Language,
    pub is_valid: bool,
    pub style_score: f64,
    pub violations: Vec<StyleViolation>,
}

impl StyleValidation {
    pub fn from_violations(file_path: &str, language: Language, violations: Vec<StyleViolation>) -> Self {
        Self {
            file_path: file_path.to_string(),
            language,
            is_valid: violations.is_empty(),
            style_score: style_score(violations.len()),
            violations,
        }
    }

    /// A file whose style pass could not run.
    pub fn failed(file_path: &str, language: Language) -> Self {
        Self {
            file_path: file_path.to_string(),
            language,
            is_valid: false,
            style_score: 0.0,
            violations: Vec::new(),
        }
    }
}

/// `max(0, 10 - 0.5 * n)`.
pub fn style_score(violation_count: usize) -> f64 {
    (10.0 - 0.5 * violation_count as f64).max(0.0)
}

/// One scanned file as reported by the walk step. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: Language,
    pub size_bytes: u64,
    pub line_count: usize,
    pub class_count: usize,
    pub method_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_score_monotonic() {
        let mut previous = style_score(0);
        assert_eq!(previous, 10.0);
        for n in 1..40 {
            let score = style_score(n);
            assert!(score <= previous);
            assert!(score >= 0.0);
            previous = score;
        }
        assert_eq!(style_score(20), 0.0);
        assert_eq!(style_score(3), 8.5);
    }

    #[test]
    fn test_issue_rule_severity() {
        let issue = CodeIssue::new(IssueRule::GodClass, "too many", "A.java", 1);
        assert_eq!(issue.severity, Severity::High);
        assert_eq!(issue.category, IssueCategory::Maintainability);

        let issue = CodeIssue::file_read_error("A.java", "denied");
        assert_eq!(issue.category, IssueCategory::Reliability);
        assert_eq!(issue.message, "Failed to read file: denied");
        assert_eq!(issue.line, 1);
    }

    #[test]
    fn test_add_interface_dedupes_in_order() {
        let mut class = LanguageClass::new("A", Language::Java, "A.java", Span::new(1, 1));
        class.add_interface("Runnable");
        class.add_interface("Closeable");
        class.add_interface("Runnable");
        assert_eq!(class.implements, vec!["Runnable", "Closeable"]);
    }

    #[test]
    fn test_complexity_score_is_mean() {
        let mut class = LanguageClass::new("A", Language::Java, "A.java", Span::new(1, 10));
        class.update_complexity_score();
        assert_eq!(class.complexity_score, 0.0);

        let mut m1 = LanguageMethod::new("a", "A", Span::new(2, 3));
        m1.cyclomatic_complexity = 1;
        let mut m2 = LanguageMethod::new("b", "A", Span::new(4, 5));
        m2.cyclomatic_complexity = 4;
        class.methods = vec![m1, m2];
        class.update_complexity_score();
        assert_eq!(class.complexity_score, 2.5);
    }

    #[test]
    fn test_variable_occurrences() {
        let mut var = VariableRecord::new("x", "int", VariableScope::Method, "A.java", 3);
        var.set_occurrences(1);
        assert!(!var.is_used);
        assert_eq!(var.usage_count, 0);
        var.set_occurrences(4);
        assert!(var.is_used);
        assert_eq!(var.usage_count, 3);
        var.set_occurrences(0);
        assert_eq!(var.usage_count, 0);
    }

    #[test]
    fn test_visibility() {
        let mods = vec!["static".to_string(), "private".to_string()];
        assert_eq!(Visibility::from_modifiers(&mods), Visibility::Private);
        assert_eq!(Visibility::from_modifiers(&Vec::new()), Visibility::Package);
        assert_eq!(Visibility::from_name("_helper"), Visibility::Private);
        assert_eq!(Visibility::from_name("__init__"), Visibility::Public);
        assert_eq!(Visibility::from_name("run"), Visibility::Public);
    }
}
