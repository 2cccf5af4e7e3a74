//! Merging per-file slots into one model.

use serde::Serialize;

use crate::analysis::{
    CodeIssue, FileRecord, LanguageClass, LanguageMethod, StyleValidation, StyleViolation,
    VariableRecord,
};
use crate::scheduler::{HygieneSlot, StructureSlot};

/// Everything extracted in one run.
///
/// Collections are sorted by file path and position, so the same tree
/// always produces the same model regardless of task completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisModel {
    pub files: Vec<FileRecord>,
    pub classes: Vec<LanguageClass>,
    pub issues: Vec<CodeIssue>,
    pub variables: Vec<VariableRecord>,
    pub style: Vec<StyleValidation>,
}

impl AnalysisModel {
    pub fn merge(files: Vec<FileRecord>, structure: Vec<StructureSlot>, hygiene: Vec<HygieneSlot>) -> Self {
        let mut model = AnalysisModel {
            files,
            ..Default::default()
        };

        for slot in structure {
            model.classes.extend(slot.classes);
            model.issues.extend(slot.issues);
        }
        for slot in hygiene {
            model.variables.extend(slot.variables);
            model.style.extend(slot.style);
        }

        model.sort();
        model
    }

    fn sort(&mut self) {
        self.files.sort_by(|a, b| a.path.cmp(&b.path));
        self.classes.sort_by(|a, b| {
            (&a.file_path, a.span.start_line, &a.name).cmp(&(&b.file_path, b.span.start_line, &b.name))
        });
        self.issues.sort_by(|a, b| {
            (&a.file_path, a.line, a.rule.as_str(), &a.method, &a.message)
                .cmp(&(&b.file_path, b.line, b.rule.as_str(), &b.method, &b.message))
        });
        self.variables.sort_by(|a, b| {
            (&a.file_path, a.line, &a.name, a.scope).cmp(&(&b.file_path, b.line, &b.name, b.scope))
        });
        self.style.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    }

    pub fn methods(&self) -> impl Iterator<Item = &LanguageMethod> {
        self.classes.iter().flat_map(|c| c.methods.iter())
    }

    pub fn total_methods(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }

    pub fn violations(&self) -> impl Iterator<Item = &StyleViolation> {
        self.style.iter().flat_map(|s| s.violations.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Span, VariableScope};
    use crate::classify::Language;

    fn structure(path: &str, class_names: &[&str]) -> StructureSlot {
        StructureSlot {
            path: path.to_string(),
            language: Language::Java,
            classes: class_names
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    let mut class = LanguageClass::new(n, Language::Java, path, Span::new(i * 10 + 1, i * 10 + 5));
                    class.methods.push(LanguageMethod::new("run", n, Span::new(i * 10 + 2, i * 10 + 3)));
                    class
                })
                .collect(),
            issues: vec![CodeIssue::file_read_error(path, "x")],
        }
    }

    #[test]
    fn test_merge_is_order_independent() {
        let a = structure("a/A.java", &["A", "AHelper"]);
        let b = structure("b/B.java", &["B"]);
        let hygiene = |path: &str| HygieneSlot {
            path: path.to_string(),
            language: Language::Java,
            variables: vec![VariableRecord::new("x", "int", VariableScope::Method, path, 3)],
            style: Some(StyleValidation::from_violations(path, Language::Java, Vec::new())),
        };

        let forward = AnalysisModel::merge(
            Vec::new(),
            vec![a.clone(), b.clone()],
            vec![hygiene("a/A.java"), hygiene("b/B.java")],
        );
        let backward = AnalysisModel::merge(
            Vec::new(),
            vec![b, a],
            vec![hygiene("b/B.java"), hygiene("a/A.java")],
        );

        assert_eq!(forward, backward);
        let names: Vec<_> = forward.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "AHelper", "B"]);
        assert_eq!(forward.total_methods(), 3);
        assert_eq!(forward.methods().count(), 3);
        assert_eq!(forward.issues.len(), 2);
        assert_eq!(forward.variables.len(), 2);
        assert_eq!(forward.style.len(), 2);
        assert_eq!(forward.violations().count(), 0);
    }

    #[test]
    fn test_missing_style_is_skipped() {
        let slot = HygieneSlot {
            path: "x.go".to_string(),
            language: Language::Go,
            variables: Vec::new(),
            style: None,
        };
        let model = AnalysisModel::merge(Vec::new(), Vec::new(), vec![slot]);
        assert!(model.style.is_empty());
    }
}
