//! Cross-file usage analysis ("dead code").
//!
//! Runs single-threaded after extraction, over the fully merged class list.
//! References come from three places: import strings, raw callee names and
//! inheritance. None of them are resolved symbols; with the default
//! [`ReferenceMatching::Substring`] an import of `UserService` also counts as
//! a reference to `User`. That imprecision is deliberate and matches the
//! counts users of this tool already rely on. [`ReferenceMatching::ExactToken`]
//! is the stricter alternative.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::analysis::text::is_code_ident_char;
use crate::analysis::{LanguageClass, LanguageMethod, VariableRecord, VariableScope, Visibility};
use crate::classify::Language;
use crate::config::ReferenceMatching;

/// Methods that a runtime invokes; always considered used.
const ENTRY_POINTS: &[&str] = &["main", "__init__", "__new__"];

/// Methods never reported as unused even with zero references.
const SPECIAL_METHODS: &[&str] = &[
    "main", "toString", "equals", "hashCode", "clone", "finalize", "__init__", "__new__", "__str__",
    "__repr__", "__eq__", "__hash__",
];

/// Class-name suffixes marking test classes.
const TEST_SUFFIXES: &[&str] = &["Test", "Tests"];

/// Reference counts for one run. Rebuilt from scratch every time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsageIndex {
    /// class name -> references
    pub classes: BTreeMap<String, usize>,
    /// `Class.method` -> references
    pub methods: BTreeMap<String, usize>,
}

impl UsageIndex {
    pub fn class_count(&self, name: &str) -> usize {
        self.classes.get(name).copied().unwrap_or(0)
    }

    pub fn method_count(&self, key: &str) -> usize {
        self.methods.get(key).copied().unwrap_or(0)
    }
}

pub struct UsageAnalyzer {
    matching: ReferenceMatching,
}

impl UsageAnalyzer {
    pub fn new(matching: ReferenceMatching) -> Self {
        Self { matching }
    }

    /// Count references across `classes` without touching them.
    pub fn build_index(&self, classes: &[LanguageClass]) -> UsageIndex {
        let class_names: BTreeSet<&str> = classes.iter().map(|c| c.name.as_str()).collect();
        let method_keys: BTreeSet<String> = classes
            .iter()
            .flat_map(|c| c.methods.iter().map(LanguageMethod::key))
            .collect();
        let mut name_counts: HashMap<&str, usize> = HashMap::new();
        for class in classes {
            *name_counts.entry(class.name.as_str()).or_insert(0) += 1;
        }

        let mut index = UsageIndex::default();

        for class in classes {
            for import in &class.imports {
                for name in &class_names {
                    // a class only counts itself when another class shares its name
                    let is_other = *name != class.name || name_counts[name] > 1;
                    if is_other && self.import_mentions(import, name) {
                        *index.classes.entry(name.to_string()).or_insert(0) += 1;
                    }
                }
            }

            if let Some(parent) = class.extends.as_deref() {
                if class_names.contains(parent) {
                    *index.classes.entry(parent.to_string()).or_insert(0) += 1;
                }
            }
            for interface in &class.implements {
                if class_names.contains(interface.as_str()) {
                    *index.classes.entry(interface.clone()).or_insert(0) += 1;
                }
            }
        }

        // Identical callee texts hit the same keys, so match each distinct
        // callee once and add its multiplicity.
        let mut callees: HashMap<&str, usize> = HashMap::new();
        for method in classes.iter().flat_map(|c| c.methods.iter()) {
            for callee in method.calls.iter().filter(|c| !c.is_empty()) {
                *callees.entry(callee.as_str()).or_insert(0) += 1;
            }
        }

        match self.matching {
            ReferenceMatching::Substring => {
                for (callee, times) in &callees {
                    for key in method_keys.iter().filter(|k| k.contains(callee)) {
                        *index.methods.entry(key.clone()).or_insert(0) += times;
                    }
                }
            }
            ReferenceMatching::ExactToken => {
                for key in &method_keys {
                    let method_name = key.rsplit_once('.').map_or(key.as_str(), |(_, m)| m);
                    if let Some(times) = callees.get(method_name) {
                        index.methods.insert(key.clone(), *times);
                    }
                }
            }
        }

        index
    }

    /// Build the index and write `used_count`/`is_used` onto every class and method.
    pub fn annotate(&self, classes: &mut [LanguageClass]) -> UsageIndex {
        let index = self.build_index(classes);

        for class in classes.iter_mut() {
            class.used_count = index.class_count(&class.name);
            class.is_used = class.used_count > 0;

            for method in &mut class.methods {
                method.used_count = index.method_count(&method.key());
                method.is_used = method.used_count > 0 || is_entry_point(method);
            }
        }

        tracing::info!(
            classes = classes.len(),
            referenced_classes = index.classes.len(),
            referenced_methods = index.methods.len(),
            "usage annotated"
        );
        index
    }

    fn import_mentions(&self, import: &str, name: &str) -> bool {
        match self.matching {
            ReferenceMatching::Substring => import.contains(name),
            ReferenceMatching::ExactToken => import
                .split(|c: char| !is_code_ident_char(c))
                .any(|token| token == name),
        }
    }
}

impl Default for UsageAnalyzer {
    fn default() -> Self {
        Self::new(ReferenceMatching::default())
    }
}

fn is_entry_point(method: &LanguageMethod) -> bool {
    ENTRY_POINTS.contains(&method.name.as_str()) || method.is_constructor()
}

fn is_special_method(method: &LanguageMethod) -> bool {
    let name = method.name.as_str();
    let accessor = method.visibility == Visibility::Public && (name.starts_with("get") || name.starts_with("set"));
    SPECIAL_METHODS.contains(&name) || name.starts_with("test") || accessor
}

/// Unused classes, excluding test classes. Call after [`UsageAnalyzer::annotate`].
pub fn unused_classes(classes: &[LanguageClass]) -> Vec<&LanguageClass> {
    classes
        .iter()
        .filter(|c| !c.is_used && !TEST_SUFFIXES.iter().any(|s| c.name.ends_with(s)))
        .collect()
}

/// Unused methods with their class, excluding special methods.
pub fn unused_methods(classes: &[LanguageClass]) -> Vec<(&LanguageClass, &LanguageMethod)> {
    classes
        .iter()
        .flat_map(|c| c.methods.iter().map(move |m| (c, m)))
        .filter(|(_, m)| !m.is_used && !is_special_method(m))
        .collect()
}

/// Variables never referenced again in their own file. Parameters are excluded.
pub fn unused_variables(variables: &[VariableRecord]) -> Vec<&VariableRecord> {
    variables
        .iter()
        .filter(|v| !v.is_used && v.scope != VariableScope::Parameter)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusedClass {
    pub name: String,
    pub file_path: String,
    pub language: Language,
    pub line: usize,
    pub lines_of_code: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnusedMethod {
    pub class_name: String,
    pub method_name: String,
    pub file_path: String,
    pub language: Language,
    pub line: usize,
    pub complexity: u32,
    pub lines_of_code: usize,
}

/// Dead-code findings in serializable form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsageReport {
    pub unused_classes: Vec<UnusedClass>,
    pub unused_methods: Vec<UnusedMethod>,
    pub unused_variables: Vec<VariableRecord>,
}

impl UsageReport {
    pub fn collect(classes: &[LanguageClass], variables: &[VariableRecord]) -> Self {
        Self {
            unused_classes: unused_classes(classes)
                .into_iter()
                .map(|c| UnusedClass {
                    name: c.name.clone(),
                    file_path: c.file_path.clone(),
                    language: c.language,
                    line: c.span.start_line,
                    lines_of_code: c.lines_of_code,
                })
                .collect(),
            unused_methods: unused_methods(classes)
                .into_iter()
                .map(|(c, m)| UnusedMethod {
                    class_name: c.name.clone(),
                    method_name: m.name.clone(),
                    file_path: c.file_path.clone(),
                    language: c.language,
                    line: m.span.start_line,
                    complexity: m.cyclomatic_complexity,
                    lines_of_code: m.lines_of_code,
                })
                .collect(),
            unused_variables: unused_variables(variables).into_iter().cloned().collect(),
        }
    }

    /// Non-blank lines held by unused classes and unused methods.
    pub fn unused_loc(&self) -> usize {
        self.unused_classes.iter().map(|c| c.lines_of_code).sum::<usize>()
            + self.unused_methods.iter().map(|m| m.lines_of_code).sum::<usize>()
    }

    pub fn total_unused(&self) -> usize {
        self.unused_classes.len() + self.unused_methods.len() + self.unused_variables.len()
    }
}
