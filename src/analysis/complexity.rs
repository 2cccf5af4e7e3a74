//! Textual cyclomatic complexity.
//!
//! A McCabe approximation: 1 plus one increment per branching, loop,
//! exception-handling or boolean-combinator token found in a method body.
//! String literals and comments are skipped; no control-flow graph is built.

use serde::{Deserialize, Serialize};

/// Which keyword set and comment syntax to scan with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityProfile {
    /// C-family syntax (Java, JavaScript).
    Brace,
    /// Python.
    Indent,
}

/// Control flow information for cyclomatic complexity calculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowInfo {
    /// Number of `if` / `elif` tokens.
    pub if_count: usize,
    /// Number of `else` tokens.
    pub else_count: usize,
    /// Number of `for` / `while` tokens.
    pub loop_count: usize,
    /// Number of `case` clauses.
    pub case_count: usize,
    /// Number of `&&` / `and` operators.
    pub and_count: usize,
    /// Number of `||` / `or` operators.
    pub or_count: usize,
    /// Number of ternary `?:` operators.
    pub ternary_count: usize,
    /// Number of `catch` / `except` clauses.
    pub catch_count: usize,
}

impl ControlFlowInfo {
    /// Scan a method body.
    pub fn scan(body: &str, profile: ComplexityProfile) -> Self {
        let mut info = ControlFlowInfo::default();
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            // comments
            if profile == ComplexityProfile::Brace && c == '/' {
                match chars.get(i + 1) {
                    Some('/') => {
                        i = skip_to_line_end(&chars, i);
                        continue;
                    }
                    Some('*') => {
                        i = skip_block_comment(&chars, i + 2);
                        continue;
                    }
                    _ => {}
                }
            }
            if profile == ComplexityProfile::Indent && c == '#' {
                i = skip_to_line_end(&chars, i);
                continue;
            }

            // string and char literals
            if profile == ComplexityProfile::Indent && is_triple_quote(&chars, i) {
                i = skip_triple_quoted(&chars, i);
                continue;
            }
            if c == '"' || c == '\'' || (c == '`' && profile == ComplexityProfile::Brace) {
                i = skip_string(&chars, i);
                continue;
            }

            if is_word_char(c) {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                info.count_keyword(&word, profile);
                continue;
            }

            if profile == ComplexityProfile::Brace {
                match (c, chars.get(i + 1).copied()) {
                    ('&', Some('&')) => {
                        info.and_count += 1;
                        i += 2;
                        continue;
                    }
                    ('|', Some('|')) => {
                        info.or_count += 1;
                        i += 2;
                        continue;
                    }
                    ('?', next) => {
                        if is_ternary(&chars, i, next) {
                            info.ternary_count += 1;
                        }
                        // consume `??` and `?.` as a unit
                        i += if matches!(next, Some('?') | Some('.')) { 2 } else { 1 };
                        continue;
                    }
                    _ => {}
                }
            }

            i += 1;
        }

        info
    }

    fn count_keyword(&mut self, word: &str, profile: ComplexityProfile) {
        match (profile, word) {
            (_, "if") => self.if_count += 1,
            (ComplexityProfile::Indent, "elif") => self.if_count += 1,
            (_, "else") => self.else_count += 1,
            (_, "for") | (_, "while") => self.loop_count += 1,
            (_, "case") => self.case_count += 1,
            (ComplexityProfile::Brace, "catch") => self.catch_count += 1,
            (ComplexityProfile::Indent, "except") => self.catch_count += 1,
            (ComplexityProfile::Indent, "and") => self.and_count += 1,
            (ComplexityProfile::Indent, "or") => self.or_count += 1,
            _ => {}
        }
    }

    /// Calculate cyclomatic complexity.
    ///
    /// CC = 1 + decision_points
    pub fn cyclomatic_complexity(&self) -> u32 {
        let decision_points = self.if_count
            + self.else_count
            + self.loop_count
            + self.case_count
            + self.and_count
            + self.or_count
            + self.ternary_count
            + self.catch_count;

        1 + decision_points as u32
    }
}

/// Complexity of a method body under a profile.
pub fn cyclomatic_complexity(body: &str, profile: ComplexityProfile) -> u32 {
    ControlFlowInfo::scan(body, profile).cyclomatic_complexity()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn skip_to_line_end(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i] != '\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(chars: &[char], mut i: usize) -> usize {
    while i + 1 < chars.len() {
        if chars[i] == '*' && chars[i + 1] == '/' {
            return i + 2;
        }
        i += 1;
    }
    chars.len()
}

/// Skip a string literal starting at `start`. Unterminated literals end at the line break.
fn skip_string(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            '\n' if quote != '`' => return i,
            _ => i += 1,
        }
    }
    chars.len()
}

fn is_triple_quote(chars: &[char], i: usize) -> bool {
    let c = chars[i];
    (c == '"' || c == '\'') && chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c)
}

fn skip_triple_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 3;
    while i + 2 < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote && chars[i + 1] == quote && chars[i + 2] == quote {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

/// `?` counts as a ternary when it is not part of `??`, `?.` or a `<?` wildcard.
fn is_ternary(chars: &[char], i: usize, next: Option<char>) -> bool {
    if matches!(next, Some('?') | Some('.')) {
        return false;
    }
    let prev = chars[..i].iter().rev().find(|c| !c.is_whitespace());
    !matches!(prev, Some('<') | Some(','))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_complexity() {
        assert_eq!(cyclomatic_complexity("{ return 1; }", ComplexityProfile::Brace), 1);
        assert_eq!(cyclomatic_complexity("", ComplexityProfile::Indent), 1);
    }

    #[test]
    fn test_two_ifs_and_one_and() {
        let body = r#"{
            if (a > 0 && b > 0) {
                total += a;
            }
            if (c) {
                total += c;
            }
            return total;
        }"#;
        assert_eq!(cyclomatic_complexity(body, ComplexityProfile::Brace), 4);
    }

    #[test]
    fn test_brace_tokens() {
        let body = r#"{
            for (int i = 0; i < n; i++) {
                while (x || y) { x--; }
            }
            switch (k) { case 1: break; case 2: break; }
            try { run(); } catch (Exception e) { }
            int v = flag ? 1 : 2;
            if (a) { } else { }
        }"#;
        let info = ControlFlowInfo::scan(body, ComplexityProfile::Brace);
        assert_eq!(info.loop_count, 2);
        assert_eq!(info.or_count, 1);
        assert_eq!(info.case_count, 2);
        assert_eq!(info.catch_count, 1);
        assert_eq!(info.ternary_count, 1);
        assert_eq!(info.if_count, 1);
        assert_eq!(info.else_count, 1);
    }

    #[test]
    fn test_ignores_strings_and_comments() {
        let body = r#"{
            // if this were counted it would be wrong
            String s = "if (a && b) while";
            /* for for for */
            log(s);
        }"#;
        assert_eq!(cyclomatic_complexity(body, ComplexityProfile::Brace), 1);
    }

    #[test]
    fn test_identifiers_containing_keywords() {
        let body = "{ int format = 0; iff(notify); forEach(elsewhere); }";
        assert_eq!(cyclomatic_complexity(body, ComplexityProfile::Brace), 1);
    }

    #[test]
    fn test_generic_wildcards_and_optional_chaining() {
        let body = "{ List<?> xs = load(); let y = obj?.field ?? other; }";
        let info = ControlFlowInfo::scan(body, ComplexityProfile::Brace);
        assert_eq!(info.ternary_count, 0);
    }

    #[test]
    fn test_indent_profile() {
        let body = r#"
    if a and b:
        pass
    elif c or d:
        pass
    else:
        pass
    try:
        go()
    except ValueError:
        pass
    # if in a comment
    s = "while"
    """
    docstring mentioning if and for
    """
"#;
        let info = ControlFlowInfo::scan(body, ComplexityProfile::Indent);
        assert_eq!(info.if_count, 2);
        assert_eq!(info.else_count, 1);
        assert_eq!(info.and_count, 1);
        assert_eq!(info.or_count, 1);
        assert_eq!(info.catch_count, 1);
        assert_eq!(info.loop_count, 0);
        assert_eq!(info.cyclomatic_complexity(), 7);
    }
}
