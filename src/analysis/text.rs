//! Small text helpers shared by the extractors.

/// Maximum number of bytes of a single line that pattern rules look at.
pub const LINE_MATCH_CAP: usize = 2000;

/// Count non-blank lines.
pub fn non_blank_lines(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Count non-blank lines inside an inclusive, 1-indexed line range.
pub fn non_blank_lines_in(content: &str, start_line: usize, end_line: usize) -> usize {
    lines_in(content, start_line, end_line)
        .filter(|l| !l.trim().is_empty())
        .count()
}

/// Iterate over an inclusive, 1-indexed line range.
pub fn lines_in(content: &str, start_line: usize, end_line: usize) -> impl Iterator<Item = &str> {
    let skip = start_line.saturating_sub(1);
    let take = (end_line + 1).saturating_sub(start_line.max(1));
    content.lines().skip(skip).take(take)
}

/// Longest prefix of `s` that is at most `max_bytes` long and ends on a char boundary.
pub fn truncate_at_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// A line clipped to [`LINE_MATCH_CAP`] for pattern matching.
pub fn capped(line: &str) -> &str {
    truncate_at_boundary(line, LINE_MATCH_CAP)
}

/// Identifier characters for C-family and Python sources.
pub fn is_code_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Identifier characters for markup and style names (`main-nav`, `--accent`).
pub fn is_markup_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Count occurrences of `name` in `content` that are not part of a longer identifier.
pub fn count_identifier(content: &str, name: &str, is_ident: fn(char) -> bool) -> usize {
    if name.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut search_from = 0;
    while let Some(offset) = content[search_from..].find(name) {
        let start = search_from + offset;
        let end = start + name.len();

        let before_ok = content[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_ident(c));
        let after_ok = content[end..].chars().next().map_or(true, |c| !is_ident(c));

        if before_ok && after_ok {
            count += 1;
        }
        search_from = end;
    }
    count
}

/// Last `.`-separated segment of a dotted name.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_lines() {
        assert_eq!(non_blank_lines("a\n\n  \nb\n"), 2);
        assert_eq!(non_blank_lines(""), 0);
        assert_eq!(non_blank_lines_in("a\n\nb\nc\nd", 2, 4), 2);
    }

    #[test]
    fn test_lines_in_range() {
        let text = "one\ntwo\nthree\nfour";
        let lines: Vec<_> = lines_in(text, 2, 3).collect();
        assert_eq!(lines, vec!["two", "three"]);
        assert_eq!(lines_in(text, 4, 9).count(), 1);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_at_boundary("hello", 10), "hello");
        assert_eq!(truncate_at_boundary("hello", 3), "hel");
        // 'é' is two bytes
        assert_eq!(truncate_at_boundary("héllo", 2), "h");
    }

    #[test]
    fn test_count_identifier_word_bounded() {
        let src = "int count = 0; count++; recount(count); counter = 1;";
        assert_eq!(count_identifier(src, "count", is_code_ident_char), 3);
        assert_eq!(count_identifier(src, "", is_code_ident_char), 0);
    }

    #[test]
    fn test_count_identifier_markup() {
        let css = ":root { --accent: red; --accent-dark: blue; } a { color: var(--accent); }";
        assert_eq!(count_identifier(css, "--accent", is_markup_ident_char), 2);
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("com.example.UserService"), "UserService");
        assert_eq!(last_segment("Plain"), "Plain");
    }
}
