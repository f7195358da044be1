//! Delimiter-pair slicing primitives shared by every layout grammar.
//!
//! The bot renders each row by wrapping field values in literal markers
//! (backticks, `**`, bullet-and-asterisk runs). Fields are located by
//! slicing between those markers, never by position within the line.

/// Slice of `s` between the first occurrence of `open` and the next
/// occurrence of `close` after it.
pub fn between<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = s.find(open)? + open.len();
    let end = s[start..].find(close)? + start;
    Some(&s[start..end])
}

/// `n`-th piece (0-based) of `s` split on `sep`.
///
/// Piece 2 of `"**Series:** Wander"` split on `"**"` is `" Wander"`.
pub fn nth_piece<'a>(s: &'a str, sep: &str, n: usize) -> Option<&'a str> {
    s.split(sep).nth(n)
}

/// One field of a row grammar: the text between `open` and `close`.
pub struct FieldRule {
    pub field: &'static str,
    pub open: &'static str,
    pub close: &'static str,
}

/// Apply each rule to the whole line, in order. Returns the sliced values,
/// or the name of the first field whose delimiters did not match.
pub fn apply_rules<'a>(line: &'a str, rules: &[FieldRule]) -> Result<Vec<&'a str>, &'static str> {
    rules
        .iter()
        .map(|r| between(line, r.open, r.close).ok_or(r.field))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_slices_inner_text() {
        assert_eq!(between("> `12` **Aria**", "> `", "`"), Some("12"));
        assert_eq!(between("> `12` **Aria**", "**", "**"), Some("Aria"));
    }

    #[test]
    fn between_missing_delimiter_is_none() {
        assert_eq!(between("no markers here", "> `", "`"), None);
        assert_eq!(between("> `12 unclosed", "> `", "`"), None);
    }

    #[test]
    fn nth_piece_matches_split_indexing() {
        assert_eq!(nth_piece("**Series:** Wander", "**", 2), Some(" Wander"));
        assert_eq!(nth_piece("no markers", "**", 2), None);
    }

    #[test]
    fn apply_rules_reports_failing_field() {
        let rules = [
            FieldRule { field: "count", open: "> `", close: "`" },
            FieldRule { field: "name", open: "**", close: "**" },
        ];
        assert_eq!(apply_rules("> `3` **Nia**", &rules), Ok(vec!["3", "Nia"]));
        assert_eq!(apply_rules("> `3` no name", &rules), Err("name"));
        assert_eq!(apply_rules("plain text", &rules), Err("count"));
    }
}
