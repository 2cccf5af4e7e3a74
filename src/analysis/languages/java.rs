//! Java extractor using tree-sitter.

use std::collections::{BTreeSet, HashSet};

use lazy_static::lazy_static;
use once_cell::sync::OnceCell;
use regex::Regex;
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

/// Tree-sitter query for the package declaration.
const PACKAGE_QUERY: &str = r#"
(package_declaration
  [(scoped_identifier) (identifier)] @package_name
)
"#;

/// Tree-sitter query for import declarations.
const IMPORT_QUERY: &str = r#"
(import_declaration) @import
"#;

/// Tree-sitter query for callee names inside a method body.
const CALL_QUERY: &str = r#"
; foo(), obj.foo()
(method_invocation
  name: (identifier) @callee
)

; new Foo()
(object_creation_expression
  type: (type_identifier) @constructed
)

; new Foo<T>()
(object_creation_expression
  type: (generic_type (type_identifier) @constructed)
)
"#;

/// Node kinds that declare a class-like type.
const TYPE_KINDS: &[&str] = &[
    "class_declaration",
    "interface_declaration",
    "enum_declaration",
    "record_declaration",
];

/// Line length limit for brace-style languages.
const MAX_LINE_LENGTH: usize = 120;

lazy_static! {
    static ref CLASS_NAME: Regex = Regex::new(r"\bclass\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref METHOD_DECL: Regex =
        Regex::new(r"\b(?:public|private|protected)\b.*?\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*\(").unwrap();
    static ref EMPTY_CATCH: Regex = Regex::new(r"catch\s*\([^)]+\)\s*\{\s*\}").unwrap();
}

struct JavaQueries {
    package: Query,
    import: Query,
    call: Query,
}

static QUERIES: OnceCell<JavaQueries> = OnceCell::new();

fn queries(grammar: &Grammar) -> anyhow::Result<&'static JavaQueries> {
    QUERIES.get_or_try_init(|| -> anyhow::Result<JavaQueries> {
        Ok(JavaQueries {
            package: Query::new(grammar, PACKAGE_QUERY)?,
            import: Query::new(grammar, IMPORT_QUERY)?,
            call: Query::new(grammar, CALL_QUERY)?,
        })
    })
}

pub struct JavaExtractor {
    grammar: Grammar,
    thresholds: Thresholds,
}

impl JavaExtractor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            grammar: tree_sitter_java::LANGUAGE.into(),
            thresholds,
        }
    }

    fn extract_package(&self, parsed: &ParsedFile, queries: &JavaQueries) -> String {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.package, parsed.tree.root_node(), &parsed.source[..]);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = queries.package.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return parsed.node_text(capture.node).to_string();
                }
            }
        }
        String::new()
    }

    /// Imports as dotted paths (`java.util.List`, `java.util.*`, `java.lang.Math.PI`).
    fn extract_imports(&self, parsed: &ParsedFile, queries: &JavaQueries) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&queries.import, parsed.tree.root_node(), &parsed.source[..]);

        let mut imports = Vec::new();
        let mut seen = HashSet::new();

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let path = import_path(parsed.node_text(capture.node));
                if !path.is_empty() && seen.insert(path.clone()) {
                    imports.push(path);
                }
            }
        }
        imports
    }

    fn collect_types(
        &self,
        parsed: &ParsedFile,
        queries: &JavaQueries,
        node: Node,
        package: &str,
        imports: &[String],
        output: &mut ExtractionOutput,
    ) {
        if TYPE_KINDS.contains(&node.kind()) {
            if let Some(mut class) = self.build_class(parsed, queries, node) {
                class.package = package.to_string();
                class.imports = imports.to_vec();
                finish_class(&mut class, &self.thresholds, &mut output.issues);
                output.classes.push(class);
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_types(parsed, queries, child, package, imports, output);
        }
    }

    fn build_class(&self, parsed: &ParsedFile, queries: &JavaQueries, node: Node) -> Option<LanguageClass> {
        let name = parsed.node_text(node.child_by_field_name("name")?);
        if name.is_empty() {
            return None;
        }

        let mut class = LanguageClass::new(name, Language::Java, &parsed.path, Span::from_node(node));
        let (modifiers, annotations) = modifiers_and_annotations(parsed, node);
        class.modifiers = modifiers;
        class.annotations = annotations;
        class.lines_of_code = non_blank_lines(parsed.node_text(node));

        if let Some(superclass) = node.child_by_field_name("superclass") {
            if let Some(ty) = superclass.named_child(0) {
                class.extends = Some(simple_type_name(parsed.node_text(ty)));
            }
        }

        // `implements` on classes, enums and records; `extends` on interfaces
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                for ty in type_list(child) {
                    class.add_interface(&simple_type_name(parsed.node_text(ty)));
                }
            }
        }

        let is_interface = node.kind() == "interface_declaration";
        if let Some(body) = node.child_by_field_name("body") {
            for member in members(body) {
                match member.kind() {
                    "method_declaration" | "constructor_declaration" => {
                        class
                            .methods
                            .push(self.build_method(parsed, queries, member, name, is_interface));
                    }
                    "field_declaration" | "constant_declaration" => {
                        class.fields.extend(build_fields(parsed, member));
                    }
                    kind if TYPE_KINDS.contains(&kind) => {
                        if let Some(inner) = member.child_by_field_name("name") {
                            class.inner_classes.push(parsed.node_text(inner).to_string());
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(class)
    }

    fn build_method(
        &self,
        parsed: &ParsedFile,
        queries: &JavaQueries,
        node: Node,
        class_name: &str,
        in_interface: bool,
    ) -> LanguageMethod {
        let name = node
            .child_by_field_name("name")
            .map(|n| parsed.node_text(n))
            .unwrap_or_default();

        let mut method = LanguageMethod::new(name, class_name, Span::from_node(node));
        let (modifiers, annotations) = modifiers_and_annotations(parsed, node);
        method.visibility = if in_interface && !modifiers.iter().any(|m| m == "private") {
            Visibility::Public
        } else {
            Visibility::from_modifiers(&modifiers)
        };
        method.modifiers = modifiers;
        method.annotations = annotations;
        method.return_type = node
            .child_by_field_name("type")
            .map(|t| parsed.node_text(t).to_string())
            .unwrap_or_else(|| "void".to_string());

        if let Some(params) = node.child_by_field_name("parameters") {
            method.parameters = build_parameters(parsed, params);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let text = parsed.node_text(body);
            method.cyclomatic_complexity = cyclomatic_complexity(text, ComplexityProfile::Brace);
            method.lines_of_code = non_blank_lines(text);
            method.calls = self.extract_calls(parsed, queries, body);
        }

        method
    }

    fn extract_calls(&self, parsed: &ParsedFile, queries: &JavaQueries, body: Node) -> BTreeSet<String> {
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
        method: Option<&'a str>,
        out: &mut Vec<VariableRecord>,
    ) {
        let mut class = class;
        let mut method = method;
        let kind = node.kind();

        if TYPE_KINDS.contains(&kind) {
            class = node.child_by_field_name("name").map(|n| parsed.node_text(n));
            method = None;
        } else if matches!(kind, "method_declaration" | "constructor_declaration") {
            method = node.child_by_field_name("name").map(|n| parsed.node_text(n));
        }

        let line = node.start_position().row + 1;
        match kind {
            "field_declaration" | "constant_declaration" => {
                let ty = field_type(parsed, node);
                for name in declarator_names(parsed, node) {
                    out.push(
                        VariableRecord::new(name, &ty, VariableScope::Class, &parsed.path, line)
                            .with_owner(class),
                    );
                }
            }
            "local_variable_declaration" => {
                let ty = field_type(parsed, node);
                for name in declarator_names(parsed, node) {
                    out.push(
                        VariableRecord::new(name, &ty, VariableScope::Method, &parsed.path, line)
                            .with_owner(method.or(class)),
                    );
                }
            }
            "enhanced_for_statement" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ty = field_type(parsed, node);
                    out.push(
                        VariableRecord::new(parsed.node_text(name), &ty, VariableScope::Method, &parsed.path, line)
                            .with_owner(method.or(class)),
                    );
                }
            }
            "formal_parameters" => {
                for param in build_parameters(parsed, node) {
                    out.push(
                        VariableRecord::new(&param.name, &param.type_name, VariableScope::Parameter, &parsed.path, line)
                            .with_owner(method.or(class)),
                    );
                }
            }
            "catch_formal_parameter" => {
                if let Some(name) = node.child_by_field_name("name") {
                    let ty = node
                        .named_children(&mut node.walk())
                        .find(|c| c.kind() == "catch_type")
                        .map(|t| parsed.node_text(t).to_string())
                        .unwrap_or_default();
                    out.push(
                        VariableRecord::new(parsed.node_text(name), &ty, VariableScope::Parameter, &parsed.path, line)
                            .with_owner(method.or(class)),
                    );
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_variables(parsed, child, class, method, out);
        }
    }
}

impl Default for JavaExtractor {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

impl Extractor for JavaExtractor {
    fn language(&self) -> Language {
        Language::Java
    }

    fn extract(&self, path: &str, content: &str) -> anyhow::Result<ExtractionOutput> {
        let parsed = ParsedFile::parse(&self.grammar, path, content)?;
        parsed.ensure_well_formed()?;
        let queries = queries(&self.grammar)?;

        let package = self.extract_package(&parsed, queries);
        let imports = self.extract_imports(&parsed, queries);

        let mut output = ExtractionOutput::default();
        self.collect_types(&parsed, queries, parsed.tree.root_node(), &package, &imports, &mut output);
        Ok(output)
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        let parsed = ParsedFile::parse(&self.grammar, path, content)?;
        let mut variables = Vec::new();
        self.collect_variables(&parsed, parsed.tree.root_node(), None, None, &mut variables);

        for var in &mut variables {
            var.set_occurrences(count_identifier(content, &var.name, is_code_ident_char));
        }
        Ok(variables)
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);

        let class_names: HashSet<&str> = content
            .lines()
            .filter_map(|l| CLASS_NAME.captures(match_window(l)))
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();

        for (i, line) in numbered_lines(content) {
            let window = match_window(line);

            // naming
            if let Some(caps) = CLASS_NAME.captures(window) {
                let name = &caps[1];
                if !name.starts_with(|c: char| c.is_uppercase()) {
                    checker.report(
                        i,
                        "JAVA_CLASS_NAMING",
                        Severity::Medium,
                        format!("Class name \"{}\" should start with uppercase letter", name),
                        &format!("Rename to \"{}\"", capitalize(name)),
                    );
                }
            }
            if let Some(caps) = METHOD_DECL.captures(window) {
                let name = &caps[1];
                let is_constructor = class_names.contains(name);
                if !is_constructor && name.starts_with(|c: char| c.is_uppercase()) {
                    checker.report(
                        i,
                        "JAVA_METHOD_NAMING",
                        Severity::Medium,
                        format!("Method name \"{}\" should start with lowercase letter", name),
                        &format!("Rename to \"{}\"", decapitalize(name)),
                    );
                }
            }

            // formatting
            checker.check_line_length(i, line, MAX_LINE_LENGTH, "LINE_LENGTH", "Break line into multiple lines");
            checker.check_trailing_whitespace(i, line);

            // best practices
            if window.contains("System.out.print") {
                checker.report_snippet(
                    i,
                    line,
                    "NO_SYSTEM_OUT",
                    Severity::Medium,
                    "Avoid using System.out.println in production code",
                    "Use proper logging framework instead",
                );
            }
            if EMPTY_CATCH.is_match(window) {
                checker.report_snippet(
                    i,
                    line,
                    "EMPTY_CATCH_BLOCK",
                    Severity::High,
                    "Empty catch block found",
                    "Add proper exception handling or logging",
                );
            }
        }

        checker.finish(Language::Java)
    }
}

/// `import static a.b.C.d;` -> `a.b.C.d`
fn import_path(statement: &str) -> String {
    statement
        .trim()
        .trim_start_matches("import")
        .trim()
        .trim_start_matches("static ")
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<String>()
}

/// `java.util.List<String>` -> `List`
fn simple_type_name(text: &str) -> String {
    let base = text.split('<').next().unwrap_or(text).trim();
    last_segment(base).to_string()
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Members of a class, interface, enum or record body.
fn members(body: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        if child.kind() == "enum_body_declarations" {
            let mut inner = child.walk();
            out.extend(child.named_children(&mut inner));
        } else {
            out.push(child);
        }
    }
    out
}

/// Type nodes inside a `super_interfaces` / `extends_interfaces` clause.
fn type_list(clause: Node) -> Vec<Node> {
    let mut out = Vec::new();
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        if child.kind() == "type_list" {
            let mut inner = child.walk();
            out.extend(child.named_children(&mut inner));
        }
    }
    out
}

fn modifiers_and_annotations(parsed: &ParsedFile, node: Node) -> (Vec<String>, Vec<String>) {
    let mut modifiers = Vec::new();
    let mut annotations = Vec::new();

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "modifiers" {
            continue;
        }
        let mut inner = child.walk();
        for m in child.children(&mut inner) {
            match m.kind() {
                "marker_annotation" | "annotation" => {
                    let name = m
                        .child_by_field_name("name")
                        .map(|n| parsed.node_text(n))
                        .unwrap_or_else(|| parsed.node_text(m).trim_start_matches('@'));
                    annotations.push(name.to_string());
                }
                _ => modifiers.push(parsed.node_text(m).to_string()),
            }
        }
    }

    (modifiers, annotations)
}

fn build_parameters(parsed: &ParsedFile, params: Node) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for param in params.named_children(&mut cursor) {
        match param.kind() {
            "formal_parameter" => {
                let name = param.child_by_field_name("name").map(|n| parsed.node_text(n));
                let ty = param.child_by_field_name("type").map(|t| parsed.node_text(t));
                if let Some(name) = name {
                    out.push(Parameter {
                        name: name.to_string(),
                        type_name: ty.unwrap_or_default().to_string(),
                    });
                }
            }
            "spread_parameter" => {
                let text = parsed.node_text(param);
                let name = param
                    .named_children(&mut param.walk())
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| parsed.node_text(n).to_string());
                if let Some(name) = name {
                    let ty = text.split("...").next().unwrap_or_default().trim();
                    out.push(Parameter {
                        name,
                        type_name: format!("{}...", ty),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

fn field_type(parsed: &ParsedFile, node: Node) -> String {
    node.child_by_field_name("type")
        .map(|t| parsed.node_text(t).to_string())
        .unwrap_or_default()
}

fn declarator_names<'a>(parsed: &'a ParsedFile, node: Node<'a>) -> Vec<&'a str> {
    let mut cursor = node.walk();
    node.children_by_field_name("declarator", &mut cursor)
        .filter_map(|d| d.child_by_field_name("name"))
        .map(|n| parsed.node_text(n))
        .collect()
}

fn build_fields(parsed: &ParsedFile, node: Node) -> Vec<FieldRecord> {
    let (modifiers, _) = modifiers_and_annotations(parsed, node);
    let type_name = field_type(parsed, node);
    let visibility = Visibility::from_modifiers(&modifiers);
    let is_static = modifiers.iter().any(|m| m == "static");
    let is_final = modifiers.iter().any(|m| m == "final");

    declarator_names(parsed, node)
        .into_iter()
        .map(|name| FieldRecord {
            name: name.to_string(),
            type_name: type_name.clone(),
            visibility,
            is_static,
            is_final,
            line: node.start_position().row + 1,
        })
        .collect()
}
