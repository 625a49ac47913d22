use pdf_quiz::normalize::{normalize, strip_fences};
use pdf_quiz::{AnswerKey, AnswerRecord, NormalizationError, QuestionSet, QuizExtraction};
use serde_json::json;

fn numbers(set: &QuestionSet) -> Vec<u32> {
    set.questions.iter().map(|q| q.question_number).collect()
}

#[test]
fn well_formed_payload_comes_back_unchanged() {
    let payload = json!({
        "questions": [
            {"questionNumber": 1, "questionText": "What is $\\frac{1}{2} + \\frac{1}{2}$?", "options": ["a) 1", "b) 2"]},
            {"questionNumber": 2, "questionText": "Evaluate $$\\int_0^1 x\\,dx$$", "options": ["a) 1/2", "b) 1"]}
        ]
    });
    let set: QuestionSet = normalize(&payload.to_string()).unwrap();
    assert_eq!(serde_json::to_value(&set).unwrap(), payload);
}

#[test]
fn fenced_payload_matches_unfenced() {
    let payload = r#"{"answers":[{"questionNumber":1,"correctAnswer":"A"},{"questionNumber":2,"correctAnswer":"D"}]}"#;
    let plain: AnswerKey = normalize(payload).unwrap();
    for wrapped in [
        format!("```json\n{}\n```", payload),
        format!("```\n{}\n```", payload),
        format!("  ```JSON\n{}```  \n", payload),
    ] {
        assert_eq!(normalize::<AnswerKey>(&wrapped).unwrap(), plain, "{wrapped}");
    }
}

#[test]
fn bad_records_are_dropped_and_order_kept() {
    let raw = json!({
        "questions": [
            {"questionNumber": 3, "questionText": "third", "options": ["x"]},
            {"questionNumber": 0, "questionText": "zero", "options": ["x"]},
            {"questionText": "no number", "options": ["x"]},
            {"questionNumber": 1, "questionText": "first", "options": ["x", "y"]},
            {"questionNumber": 4, "questionText": "empty options", "options": []},
            {"questionNumber": 5, "questionText": "options not a list", "options": "a, b"},
            {"questionNumber": "6", "questionText": "string number", "options": ["x"]},
            {"questionNumber": 7, "options": ["x"]},
            {"questionNumber": 2, "questionText": "second", "options": ["x"]},
            "not an object"
        ]
    })
    .to_string();
    let set: QuestionSet = normalize(&raw).unwrap();
    assert_eq!(numbers(&set), vec![3, 1, 2]);
}

#[test]
fn fenced_answer_key_example() {
    let text = "```json\n{\"answers\":[{\"questionNumber\":1,\"correctAnswer\":\"A\"}]}\n```";
    let key: AnswerKey = normalize(text).unwrap();
    assert_eq!(key.answers, vec![AnswerRecord { question_number: 1, correct_answer: "A".into() }]);
}

#[test]
fn empty_after_fences_is_empty_response() {
    for raw in ["", "   \n", "```json\n```", "```\n\n```"] {
        assert_eq!(normalize::<AnswerKey>(raw).unwrap_err(), NormalizationError::EmptyResponse, "{raw:?}");
    }
}

#[test]
fn repair_handles_unquoted_keys_single_quotes_and_trailing_comma() {
    let text = "{questions: [{questionNumber:1, questionText:'Q', options:['A','B'],}]}";
    let set: QuestionSet = normalize(text).unwrap();
    assert_eq!(set.questions.len(), 1);
    assert_eq!(set.questions[0].question_number, 1);
    assert_eq!(set.questions[0].options, vec!["A", "B"]);
}

#[test]
fn truncated_tail_keeps_complete_records() {
    let text = r#"```json
{"questions": [
  {"questionNumber": 1, "questionText": "Which gas do plants absorb?", "options": ["a) CO2", "b) O2"]},
  {"questionNumber": 2, "questionText": "Which organelle makes ATP?", "options": ["a) Mitochondria", "b) Nuc"#;
    let set: QuestionSet = normalize(text).unwrap();
    assert_eq!(numbers(&set), vec![1, 2]);
    assert_eq!(set.questions[1].options, vec!["a) Mitochondria", "b) Nuc"]);

    let cut_in_key = r#"{"questions": [{"questionNumber": 1, "questionText": "Q", "options": ["a"]}, {"questionNumber": 2, "questionTe"#;
    let set: QuestionSet = normalize(cut_in_key).unwrap();
    assert_eq!(numbers(&set), vec![1]);
}

#[test]
fn zero_question_number_is_filtered() {
    let text = r#"{"questions":[{"questionNumber":0,"questionText":"X","options":["a"]},{"questionNumber":1,"questionText":"Y","options":["a"]}]}"#;
    let set: QuestionSet = normalize(text).unwrap();
    assert_eq!(numbers(&set), vec![1]);
}

#[test]
fn all_records_bad_is_an_empty_set_not_an_error() {
    let set: QuestionSet = normalize(r#"{"questions":[{"questionNumber":0}]}"#).unwrap();
    assert!(set.questions.is_empty());
}

#[test]
fn missing_collection_is_schema_violation() {
    let err = normalize::<AnswerKey>(r#"{"questions":[]}"#).unwrap_err();
    assert!(matches!(err, NormalizationError::SchemaViolation { ref detail, .. } if detail.contains("answers")));
}

#[test]
fn schema_violation_display_hides_raw_text() {
    let raw = r#"{"answers": "SECRET RAW"}"#;
    let err = normalize::<AnswerKey>(raw).unwrap_err();
    assert!(!err.to_string().contains("SECRET RAW"));
    match err {
        NormalizationError::SchemaViolation { raw: kept, .. } => assert_eq!(kept, raw),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn quiz_defaults_for_missing_key_and_assessment() {
    let text = r#"{"questions":[
        {"questionNumber":1,"questionText":"Q1","options":["a","b"],"correctAnswer":"a"},
        {"questionNumber":2,"questionText":"Q2","options":["a","b"]},
        {"questionNumber":3,"questionText":"Q3","options":["a","b"],"correctAnswer":2}
    ]}"#;
    let quiz: QuizExtraction = normalize(text).unwrap();
    assert_eq!(quiz.questions.len(), 2);
    assert_eq!(quiz.questions[1].correct_answer, "");
    assert_eq!(quiz.accuracy_assessment, "");

    let bad = r#"{"questions":[{"questionNumber":1,"questionText":"Q","options":["a"]}],"accuracyAssessment":{"score":9}}"#;
    assert!(matches!(normalize::<QuizExtraction>(bad), Err(NormalizationError::SchemaViolation { .. })));
}

#[test]
fn bare_array_is_accepted() {
    let key: AnswerKey = normalize(r#"[{"questionNumber":1,"correctAnswer":"B"},{"questionNumber":2,"correctAnswer":""}]"#).unwrap();
    assert_eq!(key.answers.len(), 1);
}

#[test]
fn fence_stripping_leaves_bare_json_alone() {
    assert_eq!(strip_fences("  {\"a\":1}\n"), "{\"a\":1}");
    assert_eq!(strip_fences("```json\n[1]\n```"), "[1]");
}

#[test]
fn latex_survives_the_repair_path() {
    let text = r"{questions:[{questionNumber:1, questionText:'Find $\theta$ if $x \neq \rho$', options:['$\times$', '$\alpha$']}]}";
    let set: QuestionSet = normalize(text).unwrap();
    let question = &set.questions[0];
    assert_eq!(question.question_text, r"Find $\theta$ if $x \neq \rho$");
    assert_eq!(question.options, vec![r"$\times$", r"$\alpha$"]);
    assert!(!question.question_text.contains(['\t', '\n', '\r']));
}

#[test]
fn options_missing_a_comma_stay_separate() {
    let text = r#"{"questions":[{"questionNumber":1,"questionText":"Q","options":["A" "B"],}]}"#;
    let set: QuestionSet = normalize(text).unwrap();
    assert_eq!(set.questions[0].options, vec!["A", "B"]);
}

#[test]
fn prose_with_brackets_before_truncated_json() {
    let text = concat!(
        "Sure, see note [1]: ",
        r#"{"questions":[{"questionNumber":1,"questionText":"Which gas?","options":["a) CO2","b) O2"]},"#,
        r#"{"questionNumber":2,"questionTe"#
    );
    let set: QuestionSet = normalize(text).unwrap();
    assert_eq!(numbers(&set), vec![1]);
}
