//! Tolerant rewrite of almost-JSON into JSON.
//!
//! Fixes the malformations vision models actually produce: trailing commas,
//! unquoted keys, single-quoted strings, stray unescaped quotes and apostrophes,
//! raw newlines and invalid escapes inside strings, comments, Python-style
//! literals, missing commas between values, and output cut off mid-document.
//! Truncation is closed conservatively: an open string is terminated, a dangling
//! key gets a `null` value, and every open container is closed.

use crate::json_utils::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Key,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug)]
struct Container {
    kind: NodeType,
    expect: Expect,
}

/// Rewrite `input` into text that should parse as JSON. Returns `None` when no
/// object or array start exists at all. Everything after the first root closes
/// is discarded.
pub fn repair_json(input: &str) -> Option<String> {
    repair_prefix(input).map(|(repaired, _)| repaired)
}

/// Like [`repair_json`], also returning the byte offset in `input` just past
/// the text the first root consumed.
pub(crate) fn repair_prefix(input: &str) -> Option<(String, usize)> {
    let start = input.find(['{', '['])?;
    let chars: Vec<char> = input[start..].chars().collect();
    let mut repairer = Repairer { chars, pos: 0, out: String::with_capacity(input.len() + 16), stack: Vec::new() };
    repairer.run();
    let consumed: usize = repairer.chars[..repairer.pos.min(repairer.chars.len())].iter().map(|c| c.len_utf8()).sum();
    Some((repairer.out, start + consumed))
}

struct Repairer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    stack: Vec<Container>,
}

impl Repairer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                '{' | '[' => {
                    self.begin_value();
                    self.out.push(c);
                    let kind = if c == '{' { NodeType::Object } else { NodeType::Array };
                    let expect = if c == '{' { Expect::Key } else { Expect::Value };
                    self.stack.push(Container { kind, expect });
                    self.pos += 1;
                }
                '}' | ']' => {
                    self.pos += 1;
                    let kind = if c == '}' { NodeType::Object } else { NodeType::Array };
                    self.close(kind);
                    if self.stack.is_empty() {
                        return;
                    }
                }
                ',' => {
                    self.pos += 1;
                    if let Some(top) = self.stack.last_mut() {
                        if top.expect == Expect::CommaOrEnd {
                            self.out.push(',');
                            top.expect = match top.kind {
                                NodeType::Object => Expect::Key,
                                NodeType::Array => Expect::Value,
                            };
                        }
                    }
                }
                ':' => {
                    self.pos += 1;
                    if let Some(top) = self.stack.last_mut() {
                        if top.expect == Expect::Colon {
                            self.out.push(':');
                            top.expect = Expect::Value;
                        }
                    }
                }
                '"' | '\'' => {
                    self.pos += 1;
                    self.begin_key_or_value();
                    self.string(c);
                }
                '/' if matches!(self.peek(1), Some('/' | '*')) => self.skip_comment(),
                c if c.is_whitespace() => {
                    self.out.push(c);
                    self.pos += 1;
                }
                c if is_bare_char(c) => {
                    let token = self.bare_token();
                    self.emit_bare(&token);
                }
                _ => self.pos += 1,
            }
        }
        self.finish();
    }

    /// Account for a value starting in the current container, inserting
    /// whatever punctuation the model left out.
    fn begin_value(&mut self) {
        let Some(top) = self.stack.last_mut() else { return };
        match (top.kind, top.expect) {
            (NodeType::Array, Expect::CommaOrEnd) => self.out.push(','),
            (NodeType::Object, Expect::Colon) => self.out.push(':'),
            (NodeType::Object, Expect::Key) => self.out.push_str("\"\":"),
            (NodeType::Object, Expect::CommaOrEnd) => self.out.push_str(",\"\":"),
            _ => {}
        }
        top.expect = Expect::CommaOrEnd;
    }

    /// A string or bare word in key position becomes a key, anywhere else a value.
    /// Returns true for keys.
    fn begin_key_or_value(&mut self) -> bool {
        let in_key_position = matches!(
            self.stack.last(),
            Some(top) if top.kind == NodeType::Object && matches!(top.expect, Expect::Key | Expect::CommaOrEnd)
        );
        if !in_key_position {
            self.begin_value();
            return false;
        }
        if let Some(top) = self.stack.last_mut() {
            if top.expect == Expect::CommaOrEnd {
                self.out.push(',');
            }
            top.expect = Expect::Colon;
        }
        true
    }

    /// Copy a string body starting after its opening `quote`, emitting a
    /// double-quoted JSON string. Inside `$…$` or `$$…$$` a backslash before a
    /// letter is a literal LaTeX command, never an escape.
    fn string(&mut self, quote: char) {
        self.out.push('"');
        let mut in_math = false;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                c if c == quote => {
                    if self.closes_string(quote) {
                        self.out.push('"');
                        return;
                    }
                    self.push_string_char(c);
                }
                '\\' => self.escape(quote, in_math),
                '$' => {
                    self.out.push('$');
                    if self.peek(0) == Some('$') {
                        self.out.push('$');
                        self.pos += 1;
                    }
                    in_math = !in_math;
                }
                c => self.push_string_char(c),
            }
        }
        // Truncated inside the string.
        self.out.push('"');
    }

    /// A quote only ends a string when the next significant character could
    /// follow a complete string. Otherwise it is a stray quote inside the text.
    /// A value string directly followed by another string is a missing comma.
    fn closes_string(&self, quote: char) -> bool {
        let next = self.chars[self.pos..].iter().find(|c| !c.is_whitespace());
        match next {
            None | Some(',' | '}' | ']' | ':') => true,
            Some(&c) if c == '"' || c == quote => self.in_value_string(),
            _ => false,
        }
    }

    /// The string being read is an array element or an object value.
    fn in_value_string(&self) -> bool {
        match self.stack.last() {
            Some(top) if top.kind == NodeType::Array => true,
            Some(top) => top.expect == Expect::CommaOrEnd,
            None => false,
        }
    }

    fn escape(&mut self, quote: char, in_math: bool) {
        let Some(next) = self.peek(0) else { return };
        match next {
            c if in_math && c.is_ascii_alphabetic() => self.out.push_str("\\\\"),
            // `\beta`, `\frac`: LaTeX, not backspace or form feed.
            'b' | 'f' if self.peek(1).is_some_and(|c| c.is_ascii_alphabetic()) => self.out.push_str("\\\\"),
            '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => {
                self.out.push('\\');
                self.out.push(next);
                self.pos += 1;
            }
            'u' if self.has_hex4() => {
                self.out.push('\\');
                for _ in 0..5 {
                    if let Some(c) = self.peek(0) {
                        self.out.push(c);
                    }
                    self.pos += 1;
                }
            }
            '\'' => {
                self.out.push('\'');
                self.pos += 1;
            }
            c if c == quote => {
                self.push_string_char(c);
                self.pos += 1;
            }
            // Invalid escape such as LaTeX `\alpha`: keep the backslash literally.
            _ => self.out.push_str("\\\\"),
        }
    }

    fn has_hex4(&self) -> bool {
        (1..=4).all(|i| self.peek(i).is_some_and(|c| c.is_ascii_hexdigit()))
    }

    fn push_string_char(&mut self, c: char) {
        match c {
            '"' => self.out.push_str("\\\""),
            '\n' => self.out.push_str("\\n"),
            '\r' => self.out.push_str("\\r"),
            '\t' => self.out.push_str("\\t"),
            c if (c as u32) < 0x20 => self.out.push_str(&format!("\\u{:04x}", c as u32)),
            c => self.out.push(c),
        }
    }

    fn skip_comment(&mut self) {
        let block = self.peek(1) == Some('*');
        self.pos += 2;
        while let Some(c) = self.peek(0) {
            if block && c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                return;
            }
            if !block && c == '\n' {
                return;
            }
            self.pos += 1;
        }
    }

    fn bare_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.peek(0) {
            if !is_bare_char(c) {
                break;
            }
            token.push(c);
            self.pos += 1;
        }
        token
    }

    fn emit_bare(&mut self, token: &str) {
        if self.begin_key_or_value() {
            self.out.push_str(&quoted(token));
            return;
        }
        let literal = match token {
            "true" | "True" => "true".to_string(),
            "false" | "False" => "false".to_string(),
            "null" | "None" | "undefined" | "NaN" => "null".to_string(),
            t if serde_json::from_str::<serde_json::Number>(t).is_ok() => t.to_string(),
            t => match t.parse::<f64>() {
                Ok(n) if n.is_finite() => serde_json::Number::from_f64(n)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| quoted(t)),
                _ => quoted(t),
            },
        };
        self.out.push_str(&literal);
    }

    fn close(&mut self, kind: NodeType) {
        if !self.stack.iter().any(|c| c.kind == kind) {
            return;
        }
        while let Some(top) = self.stack.last() {
            let matched = top.kind == kind;
            self.close_top();
            if matched {
                break;
            }
        }
    }

    fn close_top(&mut self) {
        let Some(top) = self.stack.pop() else { return };
        let kept = self.out.trim_end().len();
        self.out.truncate(kept);
        if self.out.ends_with(',') {
            self.out.pop();
        }
        match (top.kind, top.expect) {
            (NodeType::Object, Expect::Colon) => {
                self.out.push_str(":null");
                self.out.push('}');
            }
            (NodeType::Object, Expect::Value) => {
                if !self.out.ends_with(':') {
                    self.out.push(':');
                }
                self.out.push_str("null}");
            }
            (NodeType::Object, _) => self.out.push('}'),
            (NodeType::Array, _) => self.out.push(']'),
        }
    }

    fn finish(&mut self) {
        while !self.stack.is_empty() {
            self.close_top();
        }
    }
}

fn is_bare_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '-' | '+' | '.')
}

fn quoted(token: &str) -> String {
    serde_json::Value::String(token.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn repaired(input: &str) -> Value {
        let text = repair_json(input).expect("has a root");
        serde_json::from_str(&text).unwrap_or_else(|e| panic!("not JSON after repair: {text} ({e})"))
    }

    #[test]
    fn valid_json_is_unchanged() {
        let input = r#"{"answers": [{"questionNumber": 1, "correctAnswer": "A"}], "n": -2.5e3, "ok": true}"#;
        assert_eq!(repaired(input), serde_json::from_str::<Value>(input).unwrap());
    }

    #[test]
    fn trailing_commas() {
        assert_eq!(repaired(r#"{"a": [1, 2, 3,],}"#), json!({"a": [1, 2, 3]}));
    }

    #[test]
    fn unquoted_keys_and_single_quotes() {
        assert_eq!(
            repaired("{questions: [{questionNumber:1, questionText:'Q', options:['A','B'],}]}"),
            json!({"questions": [{"questionNumber": 1, "questionText": "Q", "options": ["A", "B"]}]})
        );
    }

    #[test]
    fn apostrophe_inside_single_quoted_string() {
        assert_eq!(repaired("{'t': 'It's Newton's law'}"), json!({"t": "It's Newton's law"}));
    }

    #[test]
    fn stray_double_quote_inside_string() {
        assert_eq!(repaired(r#"{"t": "The "best" answer"}"#), json!({"t": "The \"best\" answer"}));
    }

    #[test]
    fn raw_newline_and_latex_escapes() {
        assert_eq!(
            repaired("{\"t\": \"line one\nwhere $\\alpha + \\frac{1}{2} \\beta$\"}"),
            json!({"t": "line one\nwhere $\\alpha + \\frac{1}{2} \\beta$"})
        );
    }

    #[test]
    fn latex_commands_inside_math_stay_verbatim() {
        assert_eq!(
            repaired(r"{t: 'Find $\theta$ if $x \neq \rho$', o: ['$\times$', '$$\nabla f \right)$$']}"),
            json!({"t": "Find $\\theta$ if $x \\neq \\rho$", "o": ["$\\times$", "$$\\nabla f \\right)$$"]})
        );
        assert_eq!(repaired("{\"t\": \"cost: 5\\n$\\tan x$\"}"), json!({"t": "cost: 5\n$\\tan x$"}));
    }

    #[test]
    fn truncated_inside_string() {
        assert_eq!(
            repaired(r#"{"questions":[{"questionNumber":1,"options":["A"]},{"questionNumber":2,"questionText":"Wh"#),
            json!({"questions":[{"questionNumber":1,"options":["A"]},{"questionNumber":2,"questionText":"Wh"}]})
        );
    }

    #[test]
    fn truncated_after_key_or_colon_or_comma() {
        assert_eq!(repaired(r#"{"a":1,"b""#), json!({"a": 1, "b": null}));
        assert_eq!(repaired(r#"{"a":1,"b":"#), json!({"a": 1, "b": null}));
        assert_eq!(repaired(r#"{"a":[1,2,"#), json!({"a": [1, 2]}));
        assert_eq!(repaired(r#"{"a":1,"ke"#), json!({"a": 1, "ke": null}));
    }

    #[test]
    fn python_literals_and_comments() {
        assert_eq!(
            repaired("{\"a\": True, // note\n \"b\": None /* gone */, \"c\": False}"),
            json!({"a": true, "b": null, "c": false})
        );
    }

    #[test]
    fn missing_commas_between_values() {
        assert_eq!(repaired(r#"[{"a":1} {"a":2}]"#), json!([{"a": 1}, {"a": 2}]));
        assert_eq!(repaired(r#"{"a":1 "b":2}"#), json!({"a": 1, "b": 2}));
        assert_eq!(repaired(r#"["A" "B"]"#), json!(["A", "B"]));
        assert_eq!(repaired(r#"{"a":"x" "b":2}"#), json!({"a": "x", "b": 2}));
        assert_eq!(repaired("['A' 'B']"), json!(["A", "B"]));
    }

    #[test]
    fn trailing_prose_is_dropped() {
        assert_eq!(repaired("Sure! {\"a\": 1} Hope that helps {\"b\": 2}"), json!({"a": 1}));
    }

    #[test]
    fn mismatched_closer_closes_inner_containers() {
        assert_eq!(repaired(r#"{"a":[1,2}"#), json!({"a": [1, 2]}));
    }

    #[test]
    fn prefix_reports_where_the_first_root_ended() {
        let input = "see [1]: {\"a\": 2";
        let (repaired, end) = repair_prefix(input).unwrap();
        assert_eq!(repaired, "[1]");
        assert_eq!(&input[end..], ": {\"a\": 2");
    }

    #[test]
    fn no_root_means_nothing_to_repair() {
        assert!(repair_json("I could not read this document.").is_none());
    }
}
