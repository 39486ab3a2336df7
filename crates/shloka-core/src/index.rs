//! Index pipeline: read corpus → validate → embed → store. Builds the vector store
//! and its row-aligned metadata table.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_BATCH_SIZE};
use crate::corpus::{read_corpus, CorpusError};
use crate::embed::{EmbedError, Embedder};
use crate::metadata::MetadataTable;
use crate::record::{EmbedField, MetadataRecord, RawRow};
use crate::store::{StoreError, VectorStore};

/// Build settings.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub embed_field: EmbedField,
    /// Rows per embedding request. Treated as 1 if zero.
    pub batch_size: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            embed_field: EmbedField::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl From<&Config> for BuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            embed_field: config.embed_field(),
            batch_size: config.batch_size(),
        }
    }
}

/// A corpus row left out of the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRow {
    /// Position in the input corpus.
    pub row: usize,
    pub missing: Vec<&'static str>,
}

/// Output of a build: the aligned pair plus the rows that were dropped.
#[derive(Debug)]
pub struct BuildReport {
    pub store: VectorStore,
    pub table: MetadataTable,
    pub dropped: Vec<DroppedRow>,
}

/// Reads the corpus at `path` and builds the index from it.
pub async fn build_index<E: Embedder>(
    path: &Path,
    embedder: &E,
    options: BuildOptions,
) -> Result<BuildReport, IndexError> {
    let corpus = read_corpus(path)?;
    info!(rows = corpus.len(), path = %path.display(), "read corpus");
    build(corpus, embedder, options).await
}

/// Builds the vector store and metadata table from corpus rows, in corpus order.
///
/// Rows missing a required field are dropped and reported. Any embedding
/// failure aborts the whole build; nothing partial is returned.
pub async fn build<E: Embedder>(
    corpus: Vec<RawRow>,
    embedder: &E,
    options: BuildOptions,
) -> Result<BuildReport, IndexError> {
    let mut retained: Vec<(usize, MetadataRecord)> = Vec::with_capacity(corpus.len());
    let mut dropped = Vec::new();
    for (row, raw) in corpus.into_iter().enumerate() {
        match raw.into_record() {
            Ok(record) => retained.push((row, record)),
            Err(missing) => {
                warn!(row, missing = ?missing, "dropping incomplete corpus row");
                dropped.push(DroppedRow { row, missing });
            }
        }
    }
    if !dropped.is_empty() {
        warn!(dropped = dropped.len(), "dropped incomplete corpus rows");
    }

    let mut store = VectorStore::new();
    let mut table = MetadataTable::new();
    for batch in retained.chunks(options.batch_size.max(1)) {
        let first_row = batch[0].0;
        let texts: Vec<String> = batch
            .iter()
            .map(|(_, r)| options.embed_field.text(r).to_string())
            .collect();
        let vectors = embedder
            .embed_batch(&texts)
            .await
            .map_err(|source| IndexError::Embedding {
                row: first_row,
                batch_len: batch.len(),
                source,
            })?;
        if vectors.len() != texts.len() {
            return Err(IndexError::Embedding {
                row: first_row,
                batch_len: batch.len(),
                source: EmbedError::WrongCount {
                    expected: texts.len(),
                    actual: vectors.len(),
                },
            });
        }
        store.add(&vectors)?;
        for (_, record) in batch {
            table.append(record.clone());
        }
        debug!(first_row, rows = batch.len(), total = store.len(), "embedded batch");
    }

    debug_assert_eq!(store.len(), table.len());
    info!(
        rows = store.len(),
        dimension = ?store.dimension(),
        dropped = dropped.len(),
        "built index"
    );
    Ok(BuildReport {
        store,
        table,
        dropped,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
    /// `row` is the corpus position of the first row in the failing batch.
    #[error("embedding failed for batch of {batch_len} row(s) starting at corpus row {row}: {source}")]
    Embedding {
        row: usize,
        batch_len: usize,
        #[source]
        source: EmbedError,
    },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Embeds text as [length, first byte]. Records batch sizes it was called with.
    #[derive(Default)]
    struct StubEmbedder {
        batches: RefCell<Vec<usize>>,
        fail_on: Option<&'static str>,
    }

    impl Embedder for StubEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.batches.borrow_mut().push(texts.len());
            texts
                .iter()
                .map(|t| match self.fail_on {
                    Some(bad) if t == bad => Err(EmbedError::Backend("model offline".into())),
                    _ => Ok(vec![t.len() as f32, t.bytes().next().unwrap_or(0) as f32]),
                })
                .collect()
        }
    }

    struct ShortEmbedder;

    impl Embedder for ShortEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(vec![vec![0.0]])
        }
    }

    fn row(sanskrit: Option<&str>, translation: &str) -> RawRow {
        RawRow {
            canto: Some("1".into()),
            chapter: Some("1".into()),
            sanskrit: sanskrit.map(String::from),
            translation: Some(translation.into()),
            purport: None,
        }
    }

    fn options(batch_size: usize) -> BuildOptions {
        BuildOptions {
            batch_size,
            ..BuildOptions::default()
        }
    }

    #[tokio::test]
    async fn builds_aligned_pair_and_reports_drops() {
        let corpus = vec![
            row(Some("a"), "A"),
            row(None, "B"),
            row(Some("ccc"), "C"),
            row(Some("dd"), "D"),
        ];
        let embedder = StubEmbedder::default();
        let report = build(corpus, &embedder, options(2)).await.unwrap();

        assert_eq!(report.store.len(), 3);
        assert_eq!(report.table.len(), 3);
        assert_eq!(
            report.dropped,
            vec![DroppedRow { row: 1, missing: vec!["Sanskrit"] }]
        );
        assert_eq!(report.table.get(1).unwrap().translation, "C");
        assert_eq!(report.store.get(1), Some(&[3.0, b'c' as f32][..]));
        assert_eq!(*embedder.batches.borrow(), vec![2, 1]);
    }

    #[tokio::test]
    async fn embeds_selected_field() {
        let embedder = StubEmbedder::default();
        let opts = BuildOptions {
            embed_field: EmbedField::Translation,
            batch_size: 8,
        };
        let report = build(vec![row(Some("abc"), "Zz")], &embedder, opts).await.unwrap();
        assert_eq!(report.store.get(0), Some(&[2.0, b'Z' as f32][..]));
    }

    #[tokio::test]
    async fn embedding_failure_aborts_with_corpus_row() {
        let corpus = vec![row(None, "x"), row(Some("a"), "A"), row(Some("bad"), "B")];
        let embedder = StubEmbedder {
            fail_on: Some("bad"),
            ..StubEmbedder::default()
        };
        let err = build(corpus, &embedder, options(1)).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding { row: 2, batch_len: 1, .. }));
    }

    #[tokio::test]
    async fn wrong_vector_count_is_embedding_failure() {
        let corpus = vec![row(Some("a"), "A"), row(Some("b"), "B")];
        let err = build(corpus, &ShortEmbedder, options(4)).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::Embedding {
                row: 0,
                batch_len: 2,
                source: EmbedError::WrongCount { expected: 2, actual: 1 }
            }
        ));
    }

    #[tokio::test]
    async fn embedding_error_names_the_batch() {
        let corpus = vec![row(Some("a"), "A"), row(Some("bad"), "B"), row(Some("c"), "C")];
        let embedder = StubEmbedder {
            fail_on: Some("bad"),
            ..StubEmbedder::default()
        };
        let err = build(corpus, &embedder, options(32)).await.unwrap_err();
        assert!(matches!(err, IndexError::Embedding { row: 0, batch_len: 3, .. }));
        assert_eq!(
            err.to_string(),
            "embedding failed for batch of 3 row(s) starting at corpus row 0: \
             embedding backend failed: model offline"
        );
    }

    #[tokio::test]
    async fn empty_corpus_builds_empty_pair() {
        let report = build(Vec::new(), &StubEmbedder::default(), options(4)).await.unwrap();
        assert!(report.store.is_empty());
        assert!(report.table.is_empty());
        assert_eq!(report.store.dimension(), None);
    }
}
