use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Type of a JSON node found by the structure scanner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// The text covered by this node.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..=self.end]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all closed JSON object/array structures in the given text. Coordinates are byte indices.
///
/// Brackets inside double-quoted strings are ignored. A structure that never closes
/// (truncated output) produces no node.
#[instrument(target = "pdf_quiz::json_scan", skip(text), fields(text_len = text.len()))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let bytes = text.as_bytes();
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        let closing = match b {
            b'"' => {
                in_string = true;
                continue;
            }
            b'{' => {
                stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() });
                continue;
            }
            b'[' => {
                stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() });
                continue;
            }
            b'}' => NodeType::Object,
            b']' => NodeType::Array,
            _ => continue,
        };

        // Unbalanced closers are dropped along with their frame.
        if let Some(frame) = stack.pop() {
            if frame.kind == closing {
                let node = ObjCoords::new(frame.start, i, closing, frame.children);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => results.push(node),
                }
            }
        }
    }

    debug!(target: "pdf_quiz::json_scan", count = results.len(), "found root structures");
    results
}

/// The largest closed root structure in `text`, if any. Used to recover JSON that
/// the model surrounded with prose.
pub fn largest_json_root(text: &str) -> Option<&str> {
    find_json_structures(text)
        .into_iter()
        .max_by_key(|node| node.end - node.start)
        .map(|node| &text[node.start..=node.end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_in_strings_are_ignored() {
        let text = r#"{"questionText":"Pick ] or }","options":["[a]"]}"#;
        let roots = find_json_structures(text);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].slice(text), text);
        assert_eq!(roots[0].children.len(), 1);
    }

    #[test]
    fn truncated_root_is_not_reported() {
        assert!(find_json_structures(r#"{"answers":[{"questionNumber":1}"#).is_empty());
    }

    #[test]
    fn largest_root_skips_small_prose_brackets() {
        let text = r#"Note [1]: here you go {"answers":[{"questionNumber":1,"correctAnswer":"A"}]} thanks"#;
        assert_eq!(
            largest_json_root(text),
            Some(r#"{"answers":[{"questionNumber":1,"correctAnswer":"A"}]}"#)
        );
    }
}
