use pdf_quiz::json_utils::{find_json_structures, largest_json_root, NodeType};

#[test]
fn finds_roots_between_prose() {
    let text = r#"prefix {"x":10} middle {"y":99} tail [1,2] end"#;
    let roots = find_json_structures(text);
    assert_eq!(roots.len(), 3);
    assert_eq!(roots[0].slice(text), r#"{"x":10}"#);
    assert_eq!(roots[2].kind, NodeType::Array);
}

#[test]
fn nested_structures_become_children() {
    let text = r#"noise {"questions":[{"questionNumber":1},{"questionNumber":2}]} more"#;
    let roots = find_json_structures(text);
    assert_eq!(roots.len(), 1);
    let array = &roots[0].children[0];
    assert_eq!(array.kind, NodeType::Array);
    assert_eq!(array.children.len(), 2);
    assert_eq!(array.children[1].slice(text), r#"{"questionNumber":2}"#);
}

#[test]
fn escaped_quotes_do_not_end_strings() {
    let text = r#"{"questionText":"He said \"}\" twice"}"#;
    let roots = find_json_structures(text);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].slice(text), text);
}

#[test]
fn mismatched_closer_drops_the_frame() {
    assert!(find_json_structures("{ ]").is_empty());
}

#[test]
fn largest_root_wins_over_earlier_small_one() {
    let text = r#"See [note] then {"answers":[{"questionNumber":1,"correctAnswer":"B"}]}"#;
    assert_eq!(
        largest_json_root(text),
        Some(r#"{"answers":[{"questionNumber":1,"correctAnswer":"B"}]}"#)
    );
    assert_eq!(largest_json_root("no structure here"), None);
}

#[test]
fn multibyte_text_keeps_byte_offsets_valid() {
    let text = "Réponse : {\"answers\":[{\"questionNumber\":1,\"correctAnswer\":\"é\"}]} ✓";
    let root = largest_json_root(text).unwrap();
    assert!(root.starts_with('{') && root.ends_with('}'));
}
