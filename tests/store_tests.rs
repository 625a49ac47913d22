use pdf_quiz::store::{JsonFileStore, MemoryStore, QuizStore};
use pdf_quiz::{QuizDocument, ScoredQuestion};

fn document(title: &str, questions: u32) -> QuizDocument {
    QuizDocument {
        title: title.to_string(),
        questions: (1..=questions)
            .map(|n| ScoredQuestion {
                question_number: n,
                question_text: format!("Question {n}"),
                options: vec!["a) yes".into(), "b) no".into()],
                correct_answer: "a".into(),
            })
            .collect(),
        accuracy_assessment: "High".into(),
    }
}

async fn exercise(store: &dyn QuizStore) {
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.get("Biology").await.unwrap().is_none());

    assert!(!store.put(document("Biology", 2)).await.unwrap());
    assert!(!store.put(document("Chemistry", 1)).await.unwrap());
    assert!(store.put(document("Biology", 5)).await.unwrap());

    let titles: Vec<String> = store.list().await.unwrap().into_iter().map(|d| d.title).collect();
    assert_eq!(titles, vec!["Biology", "Chemistry"]);
    assert_eq!(store.get("Biology").await.unwrap().unwrap().questions.len(), 5);

    assert!(store.delete("Biology").await.unwrap());
    assert!(!store.delete("Biology").await.unwrap());
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn memory_store_keys_by_title() {
    exercise(&MemoryStore::new()).await;
}

#[tokio::test]
async fn file_store_keys_by_title() {
    let dir = tempfile::tempdir().unwrap();
    exercise(&JsonFileStore::new(dir.path().join("nested").join("quizzes.json"))).await;
}

#[tokio::test]
async fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quizzes.json");
    JsonFileStore::new(&path).put(document("Physics", 3)).await.unwrap();

    let reopened = JsonFileStore::new(&path);
    let doc = reopened.get("Physics").await.unwrap().unwrap();
    assert_eq!(doc, document("Physics", 3));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[0]["questions"][0]["correctAnswer"], "a");
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quizzes.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = JsonFileStore::new(&path).list().await.unwrap_err();
    assert!(matches!(err, pdf_quiz::error::StoreError::Corrupt(_)));
}
