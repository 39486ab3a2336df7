//! Query pipeline: embed a question, find the nearest verses, join with their metadata.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::embed::{EmbedError, Embedder};
use crate::metadata::MetadataTable;
use crate::persist::{self, PersistError};
use crate::record::MetadataRecord;
use crate::store::{StoreError, VectorStore};

/// One retrieved verse. `distance` is squared Euclidean; lower is closer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub row: usize,
    pub record: MetadataRecord,
    pub distance: f32,
}

/// Returns the `k` verses nearest to `text`, closest first.
pub async fn query<E: Embedder>(
    text: &str,
    embedder: &E,
    store: &VectorStore,
    table: &MetadataTable,
    k: usize,
) -> Result<Vec<QueryResult>, QueryError> {
    if k == 0 {
        return Err(QueryError::InvalidK);
    }
    if store.is_empty() {
        return Err(QueryError::Store(StoreError::EmptyStore));
    }
    let embedding = embedder.embed(text).await?;
    let hits = store.search(&embedding, k)?;
    debug!(k, hits = hits.len(), "searched vector store");

    hits.into_iter()
        .map(|hit| -> Result<QueryResult, QueryError> {
            let record = table.get(hit.row).map_err(|_| QueryError::CorruptIndex {
                row: hit.row,
                rows: table.len(),
            })?;
            Ok(QueryResult {
                row: hit.row,
                record: record.clone(),
                distance: hit.distance,
            })
        })
        .collect()
}

/// A vector store and its metadata table, held together.
///
/// Immutable once constructed; share it behind `&` or `Arc` for concurrent queries.
#[derive(Debug, Clone, Default)]
pub struct SemanticIndex {
    store: VectorStore,
    table: MetadataTable,
}

impl SemanticIndex {
    /// Pairs a store with its table. Fails if their sizes differ.
    pub fn new(store: VectorStore, table: MetadataTable) -> Result<Self, QueryError> {
        if store.len() != table.len() {
            return Err(QueryError::Misaligned {
                vectors: store.len(),
                records: table.len(),
            });
        }
        Ok(Self { store, table })
    }

    /// Loads the artifact pair saved under `prefix`.
    pub fn open(prefix: &Path) -> Result<Self, PersistError> {
        let (store, table) = persist::load(prefix)?;
        Ok(Self { store, table })
    }

    pub fn save(&self, prefix: &Path) -> Result<(), PersistError> {
        persist::save(&self.store, &self.table, prefix)
    }

    pub async fn query<E: Embedder>(
        &self,
        text: &str,
        embedder: &E,
        k: usize,
    ) -> Result<Vec<QueryResult>, QueryError> {
        query(text, embedder, &self.store, &self.table, k).await
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn table(&self) -> &MetadataTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("k must be at least 1")]
    InvalidK,
    #[error("failed to embed query: {0}")]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("corrupt index: row {row} has no metadata (table has {rows} rows); rebuild the index")]
    CorruptIndex { row: usize, rows: usize },
    #[error("vector store has {vectors} rows but metadata table has {records}")]
    Misaligned { vectors: usize, records: usize },
}
