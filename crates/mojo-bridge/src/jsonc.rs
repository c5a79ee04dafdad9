//! JSON with comments, as used by settings files and `launch.json`.
//!
//! Comments are blanked out and trailing commas before `}` or `]` are
//! dropped, so the result parses with `serde_json`. Line breaks inside
//! comments are kept so parse errors report the original line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    String,
    Escape,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

/// Rewrite JSONC text into plain JSON.
pub fn to_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut state = State::Code;
    // Byte offset in `out` of a comma not yet followed by a value.
    let mut pending_comma: Option<usize> = None;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        state = match state {
            State::String => {
                out.push(c);
                match c {
                    '\\' => State::Escape,
                    '"' => State::Code,
                    _ => State::String,
                }
            }
            State::Escape => {
                out.push(c);
                State::String
            }
            State::LineComment => {
                if c == '\n' {
                    out.push('\n');
                    State::Code
                } else {
                    State::LineComment
                }
            }
            State::BlockComment | State::BlockCommentStar => {
                if c == '\n' {
                    out.push('\n');
                }
                match (state, c) {
                    (State::BlockCommentStar, '/') => State::Code,
                    (_, '*') => State::BlockCommentStar,
                    _ => State::BlockComment,
                }
            }
            State::Code => match (c, chars.peek()) {
                ('/', Some('/')) => {
                    chars.next();
                    State::LineComment
                }
                ('/', Some('*')) => {
                    chars.next();
                    State::BlockComment
                }
                _ if c.is_whitespace() => {
                    out.push(c);
                    State::Code
                }
                _ => {
                    if let Some(at) = pending_comma.take() {
                        if c == '}' || c == ']' {
                            out.replace_range(at..at + 1, " ");
                        }
                    }
                    if c == ',' {
                        pending_comma = Some(out.len());
                    }
                    out.push(c);
                    if c == '"' {
                        State::String
                    } else {
                        State::Code
                    }
                }
            },
        };
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parse(input: &str) -> Value {
        serde_json::from_str(&to_json(input)).unwrap()
    }

    #[test]
    fn test_removes_comments() {
        let value = parse(
            r#"{
                // line comment
                "a": 1, /* block
                comment */ "b": "c"
            }"#,
        );
        assert_eq!(value, json!({"a": 1, "b": "c"}));
    }

    #[test]
    fn test_comment_markers_inside_strings() {
        let value = parse(r#"{"url": "http://x/*y*/", "q": "a\"//b", "e": "\\"} // tail"#);
        assert_eq!(
            value,
            json!({"url": "http://x/*y*/", "q": "a\"//b", "e": "\\"})
        );
    }

    #[test]
    fn test_drops_trailing_commas() {
        let value = parse(
            r#"{
                "configurations": [
                    {"name": "a", "args": ["x", "y",],},
                    // commented out
                ],
            }"#,
        );
        assert_eq!(
            value,
            json!({"configurations": [{"name": "a", "args": ["x", "y"]}]})
        );
    }

    #[test]
    fn test_keeps_commas_inside_strings() {
        assert_eq!(parse(r#"[",]", ",}"]"#), json!([",]", ",}"]));
    }

    #[test]
    fn test_keeps_line_numbers() {
        let input = "{\n/* one\ntwo */\n\"a\": }";
        let err = serde_json::from_str::<Value>(&to_json(input)).unwrap_err();
        assert_eq!(err.line(), 4);
    }
}
