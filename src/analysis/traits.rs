//! Core traits for per-language extraction.

use tree_sitter::{Language as Grammar, Node, Parser, Tree};

use crate::analysis::{CodeIssue, LanguageClass, StyleValidation, VariableRecord};
use crate::classify::Language;

/// Holds a parsed tree-sitter tree and associated metadata.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
    /// The file path (for error reporting).
    pub path: String,
}

impl ParsedFile {
    /// Parse `source` with the given grammar.
    pub fn parse(grammar: &Grammar, path: &str, source: &str) -> anyhow::Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(grammar)?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("parser produced no tree for {}", path))?;

        Ok(Self {
            tree,
            source: source.as_bytes().to_vec(),
            path: path.to_string(),
        })
    }

    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    /// Fail if the tree contains ERROR or MISSING nodes.
    ///
    /// The error names the first offending position.
    pub fn ensure_well_formed(&self) -> anyhow::Result<()> {
        let root = self.tree.root_node();
        if !root.has_error() {
            return Ok(());
        }
        match first_error(root) {
            Some(node) => {
                let pos = node.start_position();
                anyhow::bail!(
                    "syntax error at line {}, column {}",
                    pos.row + 1,
                    pos.column + 1
                )
            }
            None => anyhow::bail!("syntax error"),
        }
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(found) = first_error(child) {
                return Some(found);
            }
        }
    }
    None
}

/// Classes and issues produced by the structural pass over one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionOutput {
    pub classes: Vec<LanguageClass>,
    pub issues: Vec<CodeIssue>,
}

impl ExtractionOutput {
    /// Output for a file that could not be parsed: no classes, one `PARSE_ERROR`.
    pub fn parse_failure(language: Language, path: &str, error: &anyhow::Error) -> Self {
        Self {
            classes: Vec::new(),
            issues: vec![CodeIssue::parse_error(language, path, &error.to_string())],
        }
    }
}

/// Language-specific extractor.
///
/// Each supported language implements this trait. Implementations hold no
/// per-file state so one instance can serve every worker thread.
///
/// # Thread Safety
///
/// tree_sitter::Parser is not Sync, so grammar-backed implementations create a
/// parser per call.
pub trait Extractor: Send + Sync {
    /// The language tag this extractor handles.
    fn language(&self) -> Language;

    /// Extract classes, methods and fields.
    ///
    /// Returns an error for malformed input; callers normally go through
    /// [`Extractor::analyze_file`], which converts that error into an issue.
    fn extract(&self, path: &str, content: &str) -> anyhow::Result<ExtractionOutput>;

    /// Declared variables with file-local usage counts.
    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>>;

    /// Naming, formatting and best-practice checks.
    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation;

    /// Structural analysis of one file. Never fails: a parse failure yields no
    /// classes and exactly one `PARSE_ERROR` issue.
    fn analyze_file(&self, path: &str, content: &str) -> ExtractionOutput {
        match self.extract(path, content) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to parse {} file", self.language());
                ExtractionOutput::parse_failure(self.language(), path, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_output() {
        let err = anyhow::anyhow!("syntax error at line 3, column 1");
        let output = ExtractionOutput::parse_failure(Language::Java, "Broken.java", &err);
        assert!(output.classes.is_empty());
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].rule.as_str(), "PARSE_ERROR");
        assert_eq!(output.issues[0].line, 1);
        assert_eq!(
            output.issues[0].message,
            "Failed to parse java file: syntax error at line 3, column 1"
        );
    }

    #[test]
    fn test_ensure_well_formed() {
        let grammar: Grammar = tree_sitter_java::LANGUAGE.into();
        let ok = ParsedFile::parse(&grammar, "A.java", "class A {}").unwrap();
        assert!(ok.ensure_well_formed().is_ok());

        let broken = ParsedFile::parse(&grammar, "B.java", "class B { void f( { }").unwrap();
        let err = broken.ensure_well_formed().unwrap_err();
        assert!(err.to_string().starts_with("syntax error"));
    }
}
