//! Metadata table: verse records addressed by the same row id as the vector store.

use serde::{Deserialize, Serialize};

use crate::record::MetadataRecord;

/// Ordered verse records. Row `i` describes vector `i` in the paired store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataTable {
    rows: Vec<MetadataRecord>,
}

impl MetadataTable {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Append a record; returns its row id.
    pub fn append(&mut self, record: MetadataRecord) -> usize {
        self.rows.push(record);
        self.rows.len() - 1
    }

    pub fn get(&self, row: usize) -> Result<&MetadataRecord, MetadataError> {
        self.rows.get(row).ok_or(MetadataError::RowIdOutOfRange {
            row,
            len: self.rows.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetadataRecord> {
        self.rows.iter()
    }
}

impl FromIterator<MetadataRecord> for MetadataTable {
    fn from_iter<I: IntoIterator<Item = MetadataRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("row id {row} out of range (table has {len} rows)")]
    RowIdOutOfRange { row: usize, len: usize },
}
