//! End-to-end: CSV corpus → build → save → load → query, with a coordinate embedder.

use std::sync::Arc;

use shloka_core::{
    build_index, load, persist, save, BuildOptions, EmbedError, Embedder, PersistError, QueryError,
    SemanticIndex, StoreError,
};

/// Reads the text as comma-separated coordinates.
struct CoordEmbedder;

impl Embedder for CoordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        texts
            .iter()
            .map(|t| {
                t.split(',')
                    .map(|p| p.trim().parse::<f32>().map_err(|e| EmbedError::Backend(e.to_string())))
                    .collect::<Result<Vec<f32>, _>>()
            })
            .collect()
    }
}

const CORPUS: &str = "Canto,Chapter,Sanskrit,Transliteration,Translation,Purport\n\
    1,1,\"0,0\",-,A,First purport.\n\
    1,1,\"5,5\",-,,Dropped: no translation.\n\
    1,2,\"10,10\",-,B,\n\
    2,1,\"1,1\",-,C,Third purport.\n";

fn write_corpus(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("bhagavatam_data.csv");
    std::fs::write(&path, CORPUS).unwrap();
    path
}

fn opts() -> BuildOptions {
    BuildOptions {
        batch_size: 2,
        ..BuildOptions::default()
    }
}

#[tokio::test]
async fn build_save_load_query() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let prefix = dir.path().join("index/sb");

    let report = build_index(&corpus, &CoordEmbedder, opts()).await.unwrap();
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].row, 1);
    assert_eq!(report.store.len(), 3);
    assert_eq!(report.table.len(), 3);

    save(&report.store, &report.table, &prefix).unwrap();
    let (store, table) = load(&prefix).unwrap();
    assert_eq!(store, report.store);
    assert_eq!(table, report.table);

    let index = SemanticIndex::open(&prefix).unwrap();
    let results = index.query("0,1", &CoordEmbedder, 2).await.unwrap();
    let got: Vec<_> = results
        .iter()
        .map(|r| (r.row, r.record.translation.as_str(), r.distance))
        .collect();
    assert_eq!(got, vec![(0, "A", 1.0), (2, "C", 1.0)]);
    assert_eq!(results[1].record.purport.as_deref(), Some("Third purport."));
    assert_eq!(results[1].record.canto.to_string(), "2");
}

#[tokio::test]
async fn top_one_of_every_stored_verse_is_itself() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let report = build_index(&corpus, &CoordEmbedder, opts()).await.unwrap();
    let index = SemanticIndex::new(report.store, report.table).unwrap();

    for row in 0..index.len() {
        let text = index.table().get(row).unwrap().sanskrit.clone();
        let top = index.query(&text, &CoordEmbedder, 1).await.unwrap();
        assert_eq!((top[0].row, top[0].distance), (row, 0.0));
    }
}

#[test]
fn concurrent_queries_share_one_index() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let report = rt.block_on(build_index(&corpus, &CoordEmbedder, opts())).unwrap();
    let index = Arc::new(SemanticIndex::new(report.store, report.table).unwrap());

    let handles: Vec<_> = ["0,0", "10,10", "1,1", "9,9"]
        .into_iter()
        .map(|q| {
            let index = Arc::clone(&index);
            std::thread::spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
                rt.block_on(index.query(q, &CoordEmbedder, 1)).unwrap()[0].row
            })
        })
        .collect();
    let rows: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(rows, vec![0, 1, 2, 1]);
}

#[tokio::test]
async fn empty_index_query_fails() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("empty");
    SemanticIndex::default().save(&prefix).unwrap();

    let index = SemanticIndex::open(&prefix).unwrap();
    let err = index.query("0,0", &CoordEmbedder, 1).await.unwrap_err();
    assert!(matches!(err, QueryError::Store(StoreError::EmptyStore)));
}

#[tokio::test]
async fn vectors_without_metadata_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = write_corpus(dir.path());
    let prefix = dir.path().join("sb");
    let report = build_index(&corpus, &CoordEmbedder, opts()).await.unwrap();
    save(&report.store, &report.table, &prefix).unwrap();
    std::fs::remove_file(persist::artifact_paths(&prefix).1).unwrap();

    assert!(matches!(
        SemanticIndex::open(&prefix),
        Err(PersistError::IndexNotFound(_))
    ));
}

#[tokio::test]
async fn failed_embedding_aborts_build() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    std::fs::write(
        &path,
        "Canto,Chapter,Sanskrit,Translation\n1,1,\"0,0\",A\n1,2,not-a-vector,B\n",
    )
    .unwrap();

    let err = build_index(&path, &CoordEmbedder, opts()).await.unwrap_err();
    assert!(matches!(err, shloka_core::IndexError::Embedding { row: 0, .. }));
}
