//! Ingestion tests: loading, chunking, embedding and publishing snapshots.

use std::path::Path;
use std::sync::Arc;

use crag_engine::{
    CorpusSlot, CragError, DirectoryLoader, Document, DocumentLoader, Embedder, HashingEmbedder,
    Ingestor, RecursiveChunker, Result, retrieve,
};

fn ingestor() -> Ingestor {
    Ingestor::new(Arc::new(HashingEmbedder::new(64)), Arc::new(RecursiveChunker::new(80, 10)))
}

fn write(dir: &Path, file: &str, contents: &[u8]) {
    std::fs::write(dir.join(file), contents).unwrap();
}

#[tokio::test]
async fn chunk_count_matches_index_size() {
    let documents = vec![
        Document::new("maya", "Chichen Itza was built by the Maya. ".repeat(10)),
        Document::new("paris", "Paris is the capital of France."),
    ];

    let corpus = ingestor().build(&documents).await.unwrap();

    assert!(corpus.len() > 2);
    assert_eq!(corpus.index().unwrap().size(), corpus.len());
    assert_eq!(corpus.index().unwrap().dimensions(), 64);
    for (position, chunk) in corpus.chunks().iter().enumerate() {
        assert_eq!(chunk.ordinal, position);
    }
    assert_eq!(corpus.chunks().last().unwrap().document_id, "paris");
}

#[tokio::test]
async fn documents_without_text_build_an_empty_corpus() {
    let corpus = ingestor().build(&[Document::new("blank", "  \n\n ")]).await.unwrap();
    assert!(corpus.is_empty());
    assert!(corpus.index().is_none());
}

#[tokio::test]
async fn ingested_text_is_retrievable() {
    let embedder = Arc::new(HashingEmbedder::new(256));
    let ingestor = Ingestor::new(embedder.clone(), Arc::new(RecursiveChunker::default()));
    let corpus = ingestor
        .build(&[
            Document::new("a", "Chichen Itza pyramid Maya Yucatan"),
            Document::new("b", "Sourdough bread flour water salt"),
        ])
        .await
        .unwrap();

    let query = embedder.embed("Chichen Itza pyramid Maya Yucatan").await.unwrap();
    let results = retrieve(&query, &corpus, 2).unwrap();

    assert_eq!(results[0].text, "Chichen Itza pyramid Maya Yucatan");
    assert!((results[0].similarity - 1.0).abs() < 1e-5);
    assert!(results[1].similarity < results[0].similarity);
}

#[tokio::test]
async fn publish_replaces_snapshot_wholesale() {
    let slot = CorpusSlot::new();
    let first = slot.publish(ingestor().build(&[Document::new("a", "first")]).await.unwrap()).await;
    let held = slot.current().await.unwrap();

    let second = slot
        .publish(ingestor().build(&[Document::new("b", "second text")]).await.unwrap())
        .await;

    assert_ne!(first.id(), second.id());
    assert_eq!(slot.current().await.unwrap().id(), second.id());
    // A reader holding the old snapshot still sees it unchanged.
    assert_eq!(held.id(), first.id());
    assert_eq!(held.chunks()[0].text, "first");
}

#[tokio::test]
async fn directory_loader_reads_text_files_in_name_order() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "b.md", b"# Second\nMarkdown content.");
    write(temp.path(), "a.txt", b"First document.");
    write(temp.path(), "ignored.pdf", b"%PDF-1.4");
    write(temp.path(), "broken.txt", &[0xff, 0xfe, 0x00]);

    let documents = DirectoryLoader::new().load(temp.path()).await.unwrap();

    let ids: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt", "b.md"]);
    assert_eq!(documents[0].text, "First document.");
    assert!(documents[0].source_uri.as_deref().unwrap().ends_with("a.txt"));
}

#[tokio::test]
async fn directory_loader_honours_custom_extensions() {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "notes.txt", b"plain");
    write(temp.path(), "data.csv", b"a,b");

    let documents =
        DirectoryLoader::new().with_extensions(["csv"]).load(temp.path()).await.unwrap();

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, "data.csv");
}

#[tokio::test]
async fn missing_directory_is_a_loader_error() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("missing");
    let err = DirectoryLoader::new().load(&missing).await.unwrap_err();
    assert!(matches!(err, CragError::LoaderError(_)));
}

#[tokio::test]
async fn build_from_loads_then_indexes() -> Result<()> {
    let temp = tempfile::tempdir().unwrap();
    write(temp.path(), "doc.txt", b"The Temple of Kukulcan dominates the site.");

    let corpus = ingestor().build_from(&DirectoryLoader::new(), temp.path()).await?;

    assert_eq!(corpus.len(), 1);
    assert_eq!(corpus.chunks()[0].document_id, "doc.txt");
    Ok(())
}
