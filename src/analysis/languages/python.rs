//! Python extractor using tree-sitter.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language as Grammar, Node, Query, QueryCursor};

use crate::analysis::complexity::{cyclomatic_complexity, ComplexityProfile};
use crate::analysis::findings::finish_class;
use crate::analysis::style::{match_window, numbered_lines, StyleChecker};
use crate::analysis::text::{count_identifier, is_code_ident_char, last_segment, non_blank_lines};
use crate::analysis::{
    ExtractionOutput, Extractor, FieldRecord, LanguageClass, LanguageMethod, Parameter, ParsedFile,
    Severity, Span, StyleValidation, VariableRecord, VariableScope, Visibility,
};
use crate::classify::Language;
use crate::config::Thresholds;

/// Tree-sitter query for import statements.
const IMPORT_QUERY: &str = r#"
(import_statement) @import
(import_from_statement) @import
(future_import_statement) @import
"#;

/// Tree-sitter query for callee names inside a function body.
const CALL_QUERY: &str = r#"
; f()
(call
  function: (identifier) @callee
)

; obj.method()
(call
  function: (attribute attribute: (identifier) @callee)
)
"#;

/// PEP 8 line length.
const MAX_LINE_LENGTH: usize = 79;

/// Receiver parameter names left out of parameter lists.
const RECEIVERS: &[&str] = &["self", "cls"];

struct PythonQueries {
    import: Query,
    call: Query,
}

static QUERIES: OnceCell<PythonQueries> = OnceCell::new();

fn queries(grammar: &Grammar) -> anyhow::Result<&'static PythonQueries> {
    QUERIES.get_or_try_init(|| -> anyhow::Result<PythonQueries> {
        Ok(PythonQueries {
            import: Query::new(grammar, IMPORT_QUERY)?,
            call: Query::new(grammar, CALL_QUERY)?,
        })
    })
}

pub struct PythonExtractor {
    grammar: Grammar,
    thresholds: Thresholds,
}

impl PythonExtractor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            grammar: tree_sitter_python::LANGUAGE.into(),
            thresholds,
        }
    }

    /// Import statements as written, whitespace-normalized.
    fn extract_imports(&self, parsed: &ParsedFile, queries: &PythonQueries) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.import, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen = HashSet::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let statement = parsed
                    .node_text(capture.node)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ");
                if seen.insert(statement.clone()) {
                    imports.push(statement);
                }
            }
        }
        imports
    }

    fn collect_classes(
        &self,
        parsed: &ParsedFile,
        queries: &PythonQueries,
        node: Node,
        imports: &[String],
        output: &mut ExtractionOutput,
    ) {
        if node.kind() == "class_definition" {
            if let Some(mut class) = self.build_class(parsed, queries, node) {
                class.imports = imports.to_vec();
                finish_class(&mut class, &self.thresholds, &mut output.issues);
                output.classes.push(class);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_classes(parsed, queries, child, imports, output);
        }
    }

    fn build_class(&self, parsed: &ParsedFile, queries: &PythonQueries, node: Node) -> Option<LanguageClass> {
        let name = parsed.node_text(node.child_by_field_name("name")?);
        if name.is_empty() {
            return None;
        }

        let mut class = LanguageClass::new(name, Language::Python, &parsed.path, Span::from_node(node));
        class.annotations = decorators(parsed, node);
        class.lines_of_code = non_blank_lines(parsed.node_text(node));

        if let Some(bases) = node.child_by_field_name("superclasses") {
            let mut cursor = bases.walk();
            let names: Vec<String> = bases
                .named_children(&mut cursor)
                .filter(|b| matches!(b.kind(), "identifier" | "attribute" | "subscript"))
                .map(|b| base_name(parsed.node_text(b)))
                .filter(|b| b != "object")
                .collect();
            let mut names = names.into_iter();
            class.extends = names.next();
            for rest in names {
                class.add_interface(&rest);
            }
        }

        let Some(body) = node.child_by_field_name("body") else {
            return Some(class);
        };

        let mut field_names = HashSet::new();
        let mut cursor = body.walk();
        for stmt in body.named_children(&mut cursor) {
            let def = unwrap_decorated(stmt);
            match def.kind() {
                "function_definition" => {
                    class.methods.push(self.build_method(parsed, queries, def, name));
                }
                "class_definition" => {
                    if let Some(inner) = def.child_by_field_name("name") {
                        class.inner_classes.push(parsed.node_text(inner).to_string());
                    }
                }
                "expression_statement" => {
                    if let Some(field) = build_field(parsed, stmt) {
                        if field_names.insert(field.name.clone()) {
                            class.fields.push(field);
                        }
                    }
                }
                _ => {}
            }
        }

        Some(class)
    }

    fn build_method(&self, parsed: &ParsedFile, queries: &PythonQueries, node: Node, class_name: &str) -> LanguageMethod {
        let name = node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n))
            .unwrap_or_default();

        let mut method = LanguageMethod::new(name, class_name, Span::from_node(node));
        method.visibility = Visibility::from_name(name);
        method.annotations = decorators(parsed, node);
        if parsed.node_text(node).starts_with("async") {
            method.modifiers.push("async".to_string());
        }
        for decorator in &method.annotations {
            if decorator == "staticmethod" || decorator == "classmethod" {
                method.modifiers.push(decorator.clone());
            }
        }
        method.return_type = node
            .child_by_field_name("return_type")
            .map(|t| parsed.node_text(t).to_string())
            .unwrap_or_else(|| "None".to_string());

        if let Some(params) = node.child_by_field_name("parameters") {
            method.parameters = build_parameters(parsed, params)
                .into_iter()
                .filter(|p| !RECEIVERS.contains(&p.name.as_str()))
                .collect();
        }

        if let Some(body) = node.child_by_field_name("body") {
            let text = parsed.node_text(body);
            method.cyclomatic_complexity = cyclomatic_complexity(text, ComplexityProfile::Indent);
            method.lines_of_code = non_blank_lines(text);
            method.calls = self.extract_calls(parsed, queries, body);
        }

        method
    }

    fn extract_calls(&self, parsed: &ParsedFile, queries: &PythonQueries, body: Node) -> BTreeSet<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.call, body, &parsed.source[..]);

        let mut calls = BTreeSet::new();
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let text = parsed.node_text(capture.node);
                if !text.is_empty() {
                    calls.insert(text.to_string());
                }
            }
        }
        calls
    }

    fn collect_variables<'a>(
        &self,
        parsed: &'a ParsedFile,
        node: Node<'a>,
        class: Option<&'a str>,
        function: Option<&'a str>,
        out: &mut Vec<VariableRecord>,
    ) {
        let mut class = class;
        let mut function = function;
        let line = node.start_position().row + 1;

        match node.kind() {
            "class_definition" => {
                class = node.child_by_field_name("name").map(|n| parsed.node_text(n));
                function = None;
            }
            "function_definition" => {
                function = node.child_by_field_name("name").map(|n| parsed.node_text(n));
                if let Some(params) = node.child_by_field_name("parameters") {
                    for param in build_parameters(parsed, params) {
                        if RECEIVERS.contains(&param.name.as_str()) {
                            continue;
                        }
                        out.push(
                            VariableRecord::new(&param.name, &param.type_name, VariableScope::Parameter, &parsed.path, line)
                                .with_owner(function),
                        );
                    }
                }
            }
            "assignment" | "for_statement" => {
                let (scope, owner) = match (function, class) {
                    (Some(f), _) => (VariableScope::Method, Some(f)),
                    (None, Some(c)) => (VariableScope::Class, Some(c)),
                    (None, None) => (VariableScope::Global, None),
                };
                let ty = node
                    .child_by_field_name("type")
                    .map(|t| parsed.node_text(t))
                    .unwrap_or("Any");
                if let Some(target) = node.child_by_field_name("left") {
                    for name in target_names(parsed, target) {
                        out.push(VariableRecord::new(name, ty, scope, &parsed.path, line).with_owner(owner));
                    }
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_variables(parsed, child, class, function, out);
        }
    }
}

impl Default for PythonExtractor {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, path: &str, content: &str) -> anyhow::Result<ExtractionOutput> {
        let parsed = ParsedFile::parse(&self.grammar, path, content)?;
        parsed.ensure_well_formed()?;
        let queries = queries(&self.grammar)?;

        let imports = self.extract_imports(&parsed, queries);

        let mut output = ExtractionOutput::default();
        self.collect_classes(&parsed, queries, parsed.tree.root_node(), &imports, &mut output);
        Ok(output)
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        let parsed = ParsedFile::parse(&self.grammar, path, content)?;
        let mut variables = Vec::new();
        self.collect_variables(&parsed, parsed.tree.root_node(), None, None, &mut variables);

        // re-assignments in the same scope declare nothing new
        let mut seen = HashSet::new();
        variables.retain(|v| seen.insert((v.name.clone(), v.scope, v.owner.clone())));

        for var in &mut variables {
            var.set_occurrences(count_identifier(content, &var.name, is_code_ident_char));
        }
        Ok(variables)
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);

        for (i, line) in numbered_lines(content) {
            let window = match_window(line);
            let trimmed = window.trim_start();

            // naming
            if let Some(rest) = trimmed.strip_prefix("class ") {
                let name = identifier_prefix(rest);
                if !name.is_empty() && (!name.starts_with(|c: char| c.is_uppercase()) || name.contains('_')) {
                    checker.report(
                        i,
                        "PYTHON_CLASS_NAMING",
                        Severity::Medium,
                        format!("Class name \"{}\" should use PascalCase", name),
                        "Use PascalCase for class names",
                    );
                }
            }
            let def = trimmed
                .strip_prefix("def ")
                .or_else(|| trimmed.strip_prefix("async def "));
            if let Some(rest) = def {
                let name = identifier_prefix(rest);
                if name.chars().any(|c| c.is_uppercase()) && !name.starts_with("__") {
                    checker.report(
                        i,
                        "PYTHON_FUNCTION_NAMING",
                        Severity::Medium,
                        format!("Function name \"{}\" should use snake_case", name),
                        "Use snake_case for function names",
                    );
                }
            }

            // formatting
            checker.check_line_length(i, line, MAX_LINE_LENGTH, "PEP8_LINE_LENGTH", "Break line according to PEP 8");
            checker.check_trailing_whitespace(i, line);

            // best practices
            if window.contains("print(") && !window.to_lowercase().contains("debug") {
                checker.report_snippet(
                    i,
                    line,
                    "NO_PRINT_STATEMENTS",
                    Severity::Medium,
                    "Avoid using print() in production code",
                    "Use logging module instead",
                );
            }
            if trimmed.starts_with("except:") {
                checker.report_snippet(
                    i,
                    line,
                    "BARE_EXCEPT",
                    Severity::High,
                    "Bare except clause found",
                    "Catch specific exceptions instead",
                );
            }
        }

        checker.finish(Language::Python)
    }
}

/// The function or class wrapped by a `decorated_definition`, or the node itself.
fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}

/// Decorator names of a definition (`@app.route("/")` -> `app.route`).
fn decorators(parsed: &ParsedFile, def: Node) -> Vec<String> {
    let Some(parent) = def.parent().filter(|p| p.kind() == "decorated_definition") else {
        return Vec::new();
    };

    let mut cursor = parent.walk();
    parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|d| {
            let text = parsed.node_text(d).trim_start_matches('@').trim();
            text.split('(').next().unwrap_or(text).trim().to_string()
        })
        .collect()
}

/// `pkg.mod.Base` -> `Base`, `Generic[T]` -> `Generic`
fn base_name(text: &str) -> String {
    let base = text.split('[').next().unwrap_or(text).trim();
    last_segment(base).to_string()
}

fn identifier_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(s.len());
    &s[..end]
}

fn build_parameters(parsed: &ParsedFile, params: Node) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        let (name, ty) = match param.kind() {
            "identifier" => (Some(parsed.node_text(param)), None),
            "default_parameter" => (param.child_by_field_name("name").map(|n| parsed.node_text(n)), None),
            "typed_default_parameter" => (
                param.child_by_field_name("name").map(|n| parsed.node_text(n)),
                param.child_by_field_name("type").map(|t| parsed.node_text(t)),
            ),
            "typed_parameter" => {
                let name = param
                    .named_children(&mut param.walk())
                    .find(|c| c.kind() != "type")
                    .map(|n| parsed.node_text(n).trim_start_matches('*'));
                (name, param.child_by_field_name("type").map(|t| parsed.node_text(t)))
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                (Some(parsed.node_text(param).trim_start_matches('*')), None)
            }
            _ => (None, None),
        };

        if let Some(name) = name.filter(|n| !n.is_empty()) {
            out.push(Parameter {
                name: name.to_string(),
                type_name: ty.unwrap_or("Any").to_string(),
            });
        }
    }
    out
}

/// A class-body `name = value` or `name: T = value` statement as a field.
fn build_field(parsed: &ParsedFile, stmt: Node) -> Option<FieldRecord> {
    let assignment = stmt.named_child(0).filter(|n| n.kind() == "assignment")?;
    let target = assignment.child_by_field_name("left")?;
    if target.kind() != "identifier" {
        return None;
    }
    let name = parsed.node_text(target);
    Some(FieldRecord {
        name: name.to_string(),
        type_name: assignment
            .child_by_field_name("type")
            .map(|t| parsed.node_text(t).to_string())
            .unwrap_or_else(|| "Any".to_string()),
        visibility: Visibility::from_name(name),
        is_static: true,
        is_final: name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_ascii_digit()),
        line: stmt.start_position().row + 1,
    })
}

/// Identifiers bound by an assignment or loop target.
fn target_names<'a>(parsed: &'a ParsedFile, target: Node<'a>) -> Vec<&'a str> {
    match target.kind() {
        "identifier" => vec![parsed.node_text(target)],
        "pattern_list" | "tuple_pattern" | "list_pattern" => {
            let mut cursor = target.walk();
            target
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "identifier")
                .map(|c| parsed.node_text(c))
                .collect()
        }
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::IssueRule;

    fn analyze(source: &str) -> ExtractionOutput {
        PythonExtractor::default().analyze_file("app/models.py", source)
    }

    #[test]
    fn test_extract_classes_and_methods() {
        let source = r#"
import os
from app.base import Model, Serializer

@dataclass
class User(Model, Serializer, metaclass=Meta):
    table = "users"
    MAX_LEN: int = 20

    def __init__(self, name: str, age=0, *args, **kwargs):
        self.name = name
        validate(name)

    @property
    def display(self) -> str:
        return self.name.upper()

    async def _refresh(self):
        await self.db.reload()

    class Meta:
        ordering = ["name"]
"#;
        let output = analyze(source);
        assert!(output.issues.is_empty(), "{:?}", output.issues);
        assert_eq!(output.classes.len(), 2);

        let user = output.classes.iter().find(|c| c.name == "User").unwrap();
        assert_eq!(user.package, "");
        assert_eq!(user.extends.as_deref(), Some("Model"));
        assert_eq!(user.implements, vec!["Serializer"]);
        assert_eq!(user.annotations, vec!["dataclass"]);
        assert_eq!(user.imports, vec!["import os", "from app.base import Model, Serializer"]);
        assert_eq!(user.inner_classes, vec!["Meta"]);

        let field_names: Vec<_> = user.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(field_names, vec!["table", "MAX_LEN"]);
        assert_eq!(user.fields[1].type_name, "int");
        assert!(user.fields[1].is_final);

        let names: Vec<_> = user.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["__init__", "display", "_refresh"]);

        let init = &user.methods[0];
        let params: Vec<_> = init.parameters.iter().map(|p| (p.name.as_str(), p.type_name.as_str())).collect();
        assert_eq!(params, vec![("name", "str"), ("age", "Any"), ("args", "Any"), ("kwargs", "Any")]);
        assert_eq!(init.return_type, "None");
        assert!(init.calls.contains("validate"));

        let display = &user.methods[1];
        assert_eq!(display.annotations, vec!["property"]);
        assert_eq!(display.return_type, "str");
        assert!(display.calls.contains("upper"));

        let refresh = &user.methods[2];
        assert_eq!(refresh.visibility, Visibility::Private);
        assert!(refresh.modifiers.contains(&"async".to_string()));
        assert!(refresh.calls.contains("reload"));
    }

    #[test]
    fn test_complexity() {
        let source = r#"
class Gate:
    def check(self, a, b):
        if a and b:
            return True
        if a > 10:
            return False
        return None
"#;
        let output = analyze(source);
        assert_eq!(output.classes[0].methods[0].cyclomatic_complexity, 4);
    }

    #[test]
    fn test_god_class_threshold_is_fifteen() {
        let mut source = String::from("class Service:\n");
        for i in 0..16 {
            source.push_str(&format!("    def m{}(self):\n        pass\n", i));
        }
        let output = analyze(&source);
        let god: Vec<_> = output.issues.iter().filter(|i| i.rule == IssueRule::GodClass).collect();
        assert_eq!(god.len(), 1);
        assert_eq!(god[0].line, 1);
    }

    #[test]
    fn test_parse_error() {
        let output = analyze("class Broken(:\n    def f(self)\n        pass\n");
        assert!(output.classes.is_empty());
        assert_eq!(output.issues.len(), 1);
        assert_eq!(output.issues[0].rule, IssueRule::ParseError);
        assert!(output.issues[0].message.starts_with("Failed to parse python file"));
    }

    #[test]
    fn test_extract_variables_scopes() {
        let source = r#"
LIMIT = 10

class Cache:
    size = 0

    def get(self, key, default=None):
        value = self.store.get(key)
        for item in value:
            pass
        return value

unused_global = 1
"#;
        let vars = PythonExtractor::default().extract_variables(source, "cache.py").unwrap();
        let find = |name: &str| vars.iter().find(|v| v.name == name).unwrap();

        assert_eq!(find("LIMIT").scope, VariableScope::Global);
        assert_eq!(find("size").scope, VariableScope::Class);
        assert_eq!(find("size").owner.as_deref(), Some("Cache"));
        assert_eq!(find("key").scope, VariableScope::Parameter);
        assert_eq!(find("default").scope, VariableScope::Parameter);
        assert_eq!(find("value").scope, VariableScope::Method);
        assert_eq!(find("value").owner.as_deref(), Some("get"));
        assert_eq!(find("value").usage_count, 2);
        assert_eq!(find("item").scope, VariableScope::Method);
        assert!(!find("unused_global").is_used);
        assert!(vars.iter().all(|v| v.name != "self"));
    }

    #[test]
    fn test_coding_standards() {
        let source = "class bad_name:\n    def doThing(self):  \n        print('hello')\n        print('debug value')\n        try:\n            pass\n        except:\n            pass\n";
        let validation = PythonExtractor::default().validate_coding_standards(source, "bad.py");
        let rules: Vec<_> = validation.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![
                "PYTHON_CLASS_NAMING",
                "PYTHON_FUNCTION_NAMING",
                "TRAILING_WHITESPACE",
                "NO_PRINT_STATEMENTS",
                "BARE_EXCEPT",
            ]
        );
        assert_eq!(validation.style_score, 7.5);
    }

    #[test]
    fn test_dunder_methods_are_not_naming_violations() {
        let source = "class Good:\n    def __init__(self):\n        pass\n";
        let validation = PythonExtractor::default().validate_coding_standards(source, "good.py");
        assert!(validation.is_valid);
    }
}
