//! JSONC comment stripping.
//!
//! `.jsonc` config files may carry `//` line comments and `/* */` block
//! comments; this strips them ahead of the JSON parse, leaving string
//! literals (including escaped quotes) untouched.

/// Remove `//` and `/* */` comments from JSONC text.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if in_string {
            out.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            '/' if chars.peek() == Some(&'/') => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_passes_through() {
        let src = r#"{"a": 1, "b": [2, 3]}"#;
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn line_comments_are_removed() {
        let src = "{\n  // device names\n  \"a\": 1 // trailing\n}";
        let stripped = strip_comments(src);
        assert!(!stripped.contains("device"));
        assert!(!stripped.contains("trailing"));
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn block_comments_are_removed() {
        let src = "{ /* multi\nline */ \"a\": /* inline */ 1 }";
        let value: serde_json::Value =
            serde_json::from_str(&strip_comments(src)).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn slashes_inside_strings_survive() {
        let src = r#"{"url": "http://example.com", "glob": "a/*b*/c"}"#;
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn escaped_quotes_do_not_end_the_string() {
        let src = r#"{"quote": "say \"hi\" // not a comment"}"#;
        assert_eq!(strip_comments(src), src);
    }

    #[test]
    fn unterminated_block_comment_is_dropped() {
        let src = "{\"a\": 1} /* dangling";
        let value: serde_json::Value =
            serde_json::from_str(&strip_comments(src)).unwrap();
        assert_eq!(value["a"], 1);
    }
}
