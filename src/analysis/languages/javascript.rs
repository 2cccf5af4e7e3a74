//! JavaScript extractor built on line-local patterns.
//!
//! There is no grammar behind this extractor. Class and method extents come
//! from brace depth, which is tracked over a copy of each line with comments
//! removed and string contents blanked out.

use std::collections::{BTreeSet, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::complexity::{cyclomatic_complexity, ComplexityProfile};
use crate::analysis::findings::finish_class;
use crate::analysis::style::{match_window, numbered_lines, StyleChecker};
use crate::analysis::text::{count_identifier, is_code_ident_char, last_segment, non_blank_lines_in};
use crate::analysis::{
    ExtractionOutput, Extractor, FieldRecord, LanguageClass, LanguageMethod, Parameter, Severity,
    Span, StyleValidation, VariableRecord, VariableScope, Visibility,
};
use crate::classify::Language;
use crate::config::Thresholds;

/// Line length limit for script-style languages.
const MAX_LINE_LENGTH: usize = 100;

/// Words that look like calls or method headers but are not.
const KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "typeof", "await", "do", "else",
    "try", "finally", "with", "void", "delete", "in", "of", "instanceof", "super",
];

lazy_static! {
    static ref CLASS_HEADER: Regex =
        Regex::new(r"\bclass\s+([A-Za-z_$][\w$]*)(?:\s+extends\s+([A-Za-z_$][\w$.]*))?").unwrap();
    static ref METHOD_HEADER: Regex = Regex::new(
        r"^\s*((?:(?:static|async|get|set)\s+)*)\*?\s*(#?[A-Za-z_$][\w$]*)\s*\(([^)]*)\)\s*\{"
    )
    .unwrap();
    static ref ARROW_METHOD: Regex = Regex::new(
        r"^\s*((?:static\s+)?)(#?[A-Za-z_$][\w$]*)\s*=\s*(?:async\s*)?\(([^)]*)\)\s*=>\s*\{"
    )
    .unwrap();
    static ref FIELD: Regex = Regex::new(r"^\s*((?:static\s+)?)(#?[A-Za-z_$][\w$]*)\s*(?:=[^=>]|;|$)").unwrap();
    static ref CALL: Regex = Regex::new(r"([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref IMPORT_FROM: Regex = Regex::new(r#"\bimport\s+[^'"]*?\bfrom\s+['"]([^'"]+)['"]"#).unwrap();
    static ref IMPORT_BARE: Regex = Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap();
    static ref REQUIRE: Regex = Regex::new(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
    static ref DECLARATION: Regex = Regex::new(r"\b(let|const|var)\s+([A-Za-z_$][\w$]*)").unwrap();
    static ref FUNCTION_DECL: Regex = Regex::new(r"\bfunction\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(").unwrap();
    static ref UPPER_DECLARATION: Regex = Regex::new(r"\b(?:let|const|var)\s+([A-Z][\w$]*)").unwrap();
    static ref VAR_KEYWORD: Regex = Regex::new(r"\bvar\s").unwrap();
    static ref EMPTY_CATCH: Regex = Regex::new(r"catch\s*(?:\([^)]*\))?\s*\{\s*\}").unwrap();
}

pub struct JavaScriptExtractor {
    thresholds: Thresholds,
}

impl JavaScriptExtractor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl Default for JavaScriptExtractor {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

/// Removes comments and blanks string contents, carrying block-comment and
/// template-literal state across lines. Quotes are kept so the complexity
/// scanner still sees literals.
#[derive(Default)]
struct CodeFilter {
    in_block_comment: bool,
    in_template: bool,
}

impl CodeFilter {
    fn strip(&mut self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        let mut quote: Option<char> = self.in_template.then_some('`');

        while let Some(c) = chars.next() {
            if self.in_block_comment {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                }
                continue;
            }
            if let Some(q) = quote {
                if c == '\\' {
                    chars.next();
                } else if c == q {
                    out.push(c);
                    quote = None;
                }
                continue;
            }
            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    self.in_block_comment = true;
                }
                '"' | '\'' | '`' => {
                    out.push(c);
                    quote = Some(c);
                }
                _ => out.push(c),
            }
        }
        // only template literals span lines
        self.in_template = quote == Some('`');
        out
    }
}

struct OpenMethod {
    method: LanguageMethod,
    body_depth: Option<usize>,
    body: String,
}

struct OpenClass {
    class: LanguageClass,
    body_depth: Option<usize>,
    method: Option<OpenMethod>,
}

impl OpenClass {
    fn in_body(&self, depth: usize) -> bool {
        self.method.is_none() && self.body_depth == Some(depth)
    }
}

impl JavaScriptExtractor {
    fn close_method(&self, open: &mut OpenClass, end_line: usize, content: &str) {
        if let Some(OpenMethod { mut method, body, .. }) = open.method.take() {
            method.span.end_line = end_line;
            method.cyclomatic_complexity = cyclomatic_complexity(&body, ComplexityProfile::Brace);
            method.lines_of_code = non_blank_lines_in(content, method.span.start_line, end_line);
            method.calls = extract_calls(&body);
            open.class.methods.push(method);
        }
    }

    fn close_class(&self, mut open: OpenClass, end_line: usize, content: &str, output: &mut ExtractionOutput) {
        self.close_method(&mut open, end_line, content);
        let mut class = open.class;
        class.span.end_line = end_line;
        class.lines_of_code = non_blank_lines_in(content, class.span.start_line, end_line);
        finish_class(&mut class, &self.thresholds, &mut output.issues);
        output.classes.push(class);
    }

    fn open_member(&self, open: &mut OpenClass, code: &str, line_no: usize) {
        let header = METHOD_HEADER
            .captures(code)
            .or_else(|| ARROW_METHOD.captures(code))
            .filter(|caps| !KEYWORDS.contains(&&caps[2]));

        if let Some(caps) = header {
            let name = &caps[2];
            let mut method = LanguageMethod::new(name, &open.class.name, Span::new(line_no, line_no));
            method.modifiers = caps[1].split_whitespace().map(str::to_string).collect();
            method.visibility = Visibility::from_name(name);
            method.return_type = "any".to_string();
            method.parameters = parse_parameters(&caps[3]);
            open.method = Some(OpenMethod {
                method,
                body_depth: None,
                body: String::new(),
            });
            return;
        }

        if let Some(caps) = FIELD.captures(code) {
            let name = &caps[2];
            if KEYWORDS.contains(&name) || open.class.fields.iter().any(|f| f.name == name) {
                return;
            }
            open.class.fields.push(FieldRecord {
                name: name.trim_start_matches('#').to_string(),
                type_name: "any".to_string(),
                visibility: Visibility::from_name(name),
                is_static: !caps[1].is_empty(),
                is_final: false,
                line: line_no,
            });
        }
    }
}

impl Extractor for JavaScriptExtractor {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn extract(&self, path: &str, content: &str) -> anyhow::Result<ExtractionOutput> {
        let imports = extract_imports(content);

        let mut output = ExtractionOutput::default();
        let mut filter = CodeFilter::default();
        let mut stack: Vec<OpenClass> = Vec::new();
        let mut depth = 0usize;
        let mut last_line = 0;

        for (i, line) in numbered_lines(content) {
            last_line = i;
            let code = filter.strip(match_window(line));

            if let Some(open) = stack.last_mut() {
                if open.in_body(depth) {
                    self.open_member(open, &code, i);
                }
            }

            if let Some(caps) = CLASS_HEADER.captures(&code) {
                let name = &caps[1];
                if name != "extends" {
                    let mut class = LanguageClass::new(name, Language::JavaScript, path, Span::new(i, i));
                    class.extends = caps.get(2).map(|m| last_segment(m.as_str()).to_string());
                    class.imports = imports.clone();
                    stack.push(OpenClass {
                        class,
                        body_depth: None,
                        method: None,
                    });
                }
            }

            for c in code.chars() {
                match c {
                    '{' => {
                        depth += 1;
                        if let Some(open) = stack.last_mut() {
                            match open.method.as_mut() {
                                Some(m) if m.body_depth.is_none() => m.body_depth = Some(depth),
                                None if open.body_depth.is_none() => open.body_depth = Some(depth),
                                _ => {}
                            }
                        }
                    }
                    '}' => {
                        if let Some(mut open) = stack.pop() {
                            let method_closes = open.method.as_ref().and_then(|m| m.body_depth) == Some(depth);
                            if method_closes {
                                self.close_method(&mut open, i, content);
                            }
                            if open.body_depth == Some(depth) {
                                self.close_class(open, i, content, &mut output);
                            } else {
                                stack.push(open);
                            }
                        }
                        depth = depth.saturating_sub(1);
                    }
                    _ => {}
                }
            }

            if let Some(m) = stack.last_mut().and_then(|open| open.method.as_mut()) {
                if m.method.span.start_line == i {
                    // only the part after the header's opening brace is body
                    if let Some(pos) = code.find('{') {
                        m.body.push_str(&code[pos..]);
                    }
                } else {
                    m.body.push_str(&code);
                }
                m.body.push('\n');
            }
        }

        while let Some(open) = stack.pop() {
            self.close_class(open, last_line, content, &mut output);
        }

        output.classes.sort_by_key(|c| c.span.start_line);
        Ok(output)
    }

    fn extract_variables(&self, content: &str, path: &str) -> anyhow::Result<Vec<VariableRecord>> {
        let mut filter = CodeFilter::default();
        let mut variables = Vec::new();

        for (i, line) in numbered_lines(content) {
            let code = filter.strip(match_window(line));
            for caps in DECLARATION.captures_iter(&code) {
                variables.push(VariableRecord::new(&caps[2], &caps[1], VariableScope::Global, path, i));
            }
            for caps in FUNCTION_DECL.captures_iter(&code) {
                variables.push(VariableRecord::new(&caps[1], "function", VariableScope::Global, path, i));
            }
        }

        for var in &mut variables {
            var.set_occurrences(count_identifier(content, &var.name, is_code_ident_char));
        }
        Ok(variables)
    }

    fn validate_coding_standards(&self, content: &str, path: &str) -> StyleValidation {
        let mut checker = StyleChecker::new(path);

        for (i, line) in numbered_lines(content) {
            let window = match_window(line);

            // naming
            if let Some(caps) = UPPER_DECLARATION.captures(window) {
                let name = &caps[1];
                let is_constant = !name.chars().any(|c| c.is_lowercase());
                if !is_constant {
                    checker.report(
                        i,
                        "JS_VARIABLE_NAMING",
                        Severity::Medium,
                        format!("Variable \"{}\" should use camelCase", name),
                        "Use camelCase for variable names",
                    );
                }
            }

            // formatting
            checker.check_line_length(i, line, MAX_LINE_LENGTH, "JS_LINE_LENGTH", "Break line into multiple lines");
            checker.check_trailing_whitespace(i, line);

            // best practices
            if window.contains("console.log") {
                checker.report_snippet(
                    i,
                    line,
                    "NO_CONSOLE_LOG",
                    Severity::Medium,
                    "Avoid console.log in production code",
                    "Use proper logging library",
                );
            }
            if VAR_KEYWORD.is_match(window) {
                checker.report_snippet(
                    i,
                    line,
                    "NO_VAR_DECLARATION",
                    Severity::Medium,
                    "Use let or const instead of var",
                    "Replace var with let or const",
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

        checker.finish(Language::JavaScript)
    }
}

/// Module specifiers from `import ... from`, bare `import` and `require`, in
/// first-seen order.
fn extract_imports(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();

    for line in content.lines().map(match_window) {
        let found = IMPORT_FROM
            .captures_iter(line)
            .chain(IMPORT_BARE.captures_iter(line))
            .chain(REQUIRE.captures_iter(line));
        for caps in found {
            let module = caps[1].to_string();
            if seen.insert(module.clone()) {
                imports.push(module);
            }
        }
    }
    imports
}

fn extract_calls(body: &str) -> BTreeSet<String> {
    CALL.captures_iter(body)
        .map(|caps| caps[1].to_string())
        .filter(|name| !KEYWORDS.contains(&name.as_str()))
        .collect()
}

/// `a, b = 1, ...rest, { x }` -> `a`, `b`, `rest`
fn parse_parameters(list: &str) -> Vec<Parameter> {
    list.split(',')
        .filter_map(|raw| {
            let name = raw.split('=').next()?.trim().trim_start_matches("...");
            let valid = !name.is_empty() && name.chars().all(is_code_ident_char);
            valid.then(|| Parameter {
                name: name.to_string(),
                type_name: "any".to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::IssueRule;

    const SOURCE: &str = r#"import React from 'react';
import { api } from "./services/api";
import './styles.css';
const lodash = require('lodash');

// class Commented {}
export class UserList extends React.Component {
    static defaultProps = {};
    #cache = new Map();
    count;

    constructor(props) {
        super(props);
        this.state = { users: [] };
    }

    async load(page = 1, ...filters) {
        if (page > 1 && filters.length) {
            this.setState({ page });
        }
        const url = "/users?page=" + page + "{";
        return api.fetch(url);
    }

    render() {
        return this.state.users.map((u) => formatUser(u));
    }

    handleClick = (event) => {
        event.preventDefault();
    }
}

function formatUser(u) {
    return u.name;
}

class Empty {}
"#;

    #[test]
    fn test_extract_classes() {
        let output = JavaScriptExtractor::default().analyze_file("src/UserList.js", SOURCE);
        assert!(output.issues.is_empty(), "{:?}", output.issues);
        assert_eq!(output.classes.len(), 2);

        let list = &output.classes[0];
        assert_eq!(list.name, "UserList");
        assert_eq!(list.extends.as_deref(), Some("Component"));
        assert_eq!(list.imports, vec!["react", "./services/api", "./styles.css", "lodash"]);
        assert_eq!(list.span, Span::new(7, 32));

        let fields: Vec<_> = list.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["defaultProps", "cache", "count"]);
        assert!(list.fields[0].is_static);
        assert_eq!(list.fields[1].visibility, Visibility::Private);

        let methods: Vec<_> = list.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["constructor", "load", "render", "handleClick"]);

        let load = &list.methods[1];
        assert_eq!(load.span, Span::new(17, 23));
        assert_eq!(load.modifiers, vec!["async"]);
        let params: Vec<_> = load.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["page", "filters"]);
        assert_eq!(load.cyclomatic_complexity, 3);
        assert!(load.calls.contains("setState"));
        assert!(load.calls.contains("fetch"));

        let render = &list.methods[2];
        assert!(render.calls.contains("formatUser"));
        assert!(render.calls.contains("map"));

        let empty = &output.classes[1];
        assert_eq!(empty.name, "Empty");
        assert!(empty.methods.is_empty());
        assert_eq!(empty.complexity_score, 0.0);
    }

    #[test]
    fn test_complexity_scenario() {
        let source = "class Gate {\n  check(a, b) {\n    if (a && b) { return 1; }\n    if (a) { return 2; }\n    return 0;\n  }\n}\n";
        let output = JavaScriptExtractor::default().analyze_file("gate.js", source);
        assert_eq!(output.classes[0].methods[0].cyclomatic_complexity, 4);
    }

    #[test]
    fn test_god_class() {
        let mut source = String::from("class Service {\n");
        for i in 0..25 {
            source.push_str(&format!("  m{}() {{\n    return {};\n  }}\n", i, i));
        }
        source.push_str("}\n");
        let output = JavaScriptExtractor::default().analyze_file("service.js", &source);
        assert_eq!(output.classes[0].methods.len(), 25);
        let god: Vec<_> = output.issues.iter().filter(|i| i.rule == IssueRule::GodClass).collect();
        assert_eq!(god.len(), 1);
        assert_eq!(god[0].severity, Severity::High);
    }

    #[test]
    fn test_unclosed_class_runs_to_end_of_file() {
        let output = JavaScriptExtractor::default().analyze_file("broken.js", "class Half {\n  go() {\n    run();\n");
        assert_eq!(output.classes.len(), 1);
        assert_eq!(output.classes[0].span, Span::new(1, 3));
        assert!(output.classes[0].methods[0].calls.contains("run"));
    }

    #[test]
    fn test_multiline_template_braces_are_ignored() {
        let source = "class A {\n  render() {\n    return `\n      }\n    `;\n  }\n  other() {\n    return 1;\n  }\n}\n";
        let output = JavaScriptExtractor::default().analyze_file("a.js", source);
        assert_eq!(output.classes.len(), 1);

        let methods: Vec<_> = output.classes[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["render", "other"]);
        assert_eq!(output.classes[0].methods[0].span, Span::new(2, 6));
        assert_eq!(output.classes[0].span, Span::new(1, 10));
    }

    #[test]
    fn test_template_state_carries_across_lines() {
        let mut filter = CodeFilter::default();
        assert_eq!(filter.strip("const s = `a {"), "const s = `");
        assert_eq!(filter.strip("} b"), "");
        assert_eq!(filter.strip("c` + '{';"), "` + '';");
        assert_eq!(filter.strip("x {"), "x {");
    }

    #[test]
    fn test_extract_variables() {
        let source = "const total = 1;\nlet unused = 2;\nvar legacy = total + 1;\nfunction helper() { return legacy; }\nhelper();\n";
        let vars = JavaScriptExtractor::default().extract_variables(source, "vars.js").unwrap();
        let find = |name: &str| vars.iter().find(|v| v.name == name).unwrap();

        assert_eq!(find("total").type_name, "const");
        assert!(find("total").is_used);
        assert!(!find("unused").is_used);
        assert_eq!(find("legacy").usage_count, 1);
        assert_eq!(find("helper").type_name, "function");
        assert!(vars.iter().all(|v| v.scope == VariableScope::Global));
    }

    #[test]
    fn test_coding_standards() {
        let source = "const UserName = 'x';\nconst MAX_SIZE = 10;\nvar legacy = 1; \nconsole.log(legacy);\ntry { go(); } catch (e) {}\n";
        let validation = JavaScriptExtractor::default().validate_coding_standards(source, "app.js");
        let rules: Vec<_> = validation.violations.iter().map(|v| v.rule.as_str()).collect();
        assert_eq!(
            rules,
            vec![
                "JS_VARIABLE_NAMING",
                "TRAILING_WHITESPACE",
                "NO_VAR_DECLARATION",
                "NO_CONSOLE_LOG",
                "EMPTY_CATCH_BLOCK",
            ]
        );
        assert_eq!(validation.violations[0].message, "Variable \"UserName\" should use camelCase");
    }

    #[test]
    fn test_long_line() {
        let line = format!("const x = \"{}\";", "a".repeat(100));
        let validation = JavaScriptExtractor::default().validate_coding_standards(&line, "long.js");
        assert_eq!(validation.violations.len(), 1);
        assert_eq!(validation.violations[0].rule, "JS_LINE_LENGTH");
    }
}
