use std::path::Path;

use docqa_core::ingest::IngestSettings;
use docqa_core::{DocQa, DocumentSource, Persona, RagError, RagSettings, Session};
use docqa_llm::Role;
use docqa_llm::mock::MockProvider;
use docqa_memory::document::SplitterConfig;
use tokio_util::sync::CancellationToken;

fn write_handbook(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("handbook.txt");
    let pages = [
        "Section 1: Annual leave. Permanent employees receive 20 days of annual leave per year.",
        "Section 2: Redundancy. Redundancy pay after 8 years is 14 weeks of base salary.",
        "Section 3: Parking. Staff parking is available on level two.",
    ];
    std::fs::write(&path, pages.join("\x0c")).unwrap();
    path
}

fn docqa(mock: &MockProvider) -> DocQa<MockProvider> {
    DocQa::new(
        mock.clone().with_dimension(512),
        RagSettings {
            ingest: IngestSettings {
                splitter: SplitterConfig {
                    chunk_size: 200,
                    chunk_overlap: 20,
                },
                ..IngestSettings::default()
            },
            top_k: 1,
            ..RagSettings::default()
        },
    )
    .unwrap()
}

#[tokio::test]
async fn conversation_over_ingested_handbook() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_handbook(dir.path());
    let mock = MockProvider::with_responses(vec![
        "14 weeks, per Section 2.".into(),
        "20 days.".into(),
    ]);
    let qa = docqa(&mock);
    let mut session = Session::new(Persona::StrictLegalAuditor);

    let collection = qa
        .ingest(&session, DocumentSource::from_path(&path))
        .await
        .unwrap();
    assert_eq!(collection.page_count, 3);
    assert_eq!(collection.chunk_count, 3);

    let answer = qa
        .ask(&mut session, "What is redundancy pay after 8 years?")
        .await
        .unwrap();
    assert_eq!(answer.answer, "14 weeks, per Section 2.");
    assert_eq!(answer.source_pages(), vec!["2"]);

    let system = &mock.last_messages()[0];
    assert_eq!(system.role, Role::System);
    assert!(system.content.starts_with("You are a strict legal auditor."));
    assert!(system.content.contains("Redundancy pay after 8 years"));

    let answer = qa
        .ask(&mut session, "How many days of annual leave?")
        .await
        .unwrap();
    assert_eq!(answer.source_pages(), vec!["1"]);
    assert_eq!(session.history().len(), 4);
    // history is never forwarded to the model
    assert_eq!(mock.last_messages().len(), 2);
}

#[tokio::test]
async fn replacing_document_replaces_answers_source() {
    let dir = tempfile::tempdir().unwrap();
    let handbook = write_handbook(dir.path());
    let other = dir.path().join("menu.md");
    std::fs::write(&other, "# Menu\nSoup of the day is tomato.").unwrap();

    let mock = MockProvider::default();
    let qa = docqa(&mock);
    let session = Session::default();

    qa.ingest(&session, DocumentSource::from_path(&handbook))
        .await
        .unwrap();
    let menu = qa
        .ingest(&session, DocumentSource::from_path(&other))
        .await
        .unwrap();

    let answer = qa.answer(&session, "annual leave").await.unwrap();
    assert_eq!(answer.collection_id, menu.id);
    assert!(answer.sources[0].text.contains("tomato"));
}

#[tokio::test]
async fn cancelled_ingest_leaves_session_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_handbook(dir.path());
    let mock = MockProvider::default();
    let qa = docqa(&mock);
    let session = Session::default();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (progress, _rx) = tokio::sync::watch::channel(docqa_core::IngestProgress::Loading);
    let err = qa
        .ingest_with(&session, DocumentSource::from_path(&path), &cancel, &progress)
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Cancelled));
    assert!(session.active().await.is_none());
}

#[tokio::test]
async fn missing_file_is_document_error() {
    let qa = docqa(&MockProvider::default());
    let session = Session::default();
    let err = qa
        .ingest(&session, DocumentSource::from_path("/nonexistent/policy.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, RagError::Document(_)));
    assert!(err.to_string().contains("/nonexistent/policy.pdf"));
}
