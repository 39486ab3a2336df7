//! On-disk index: the vector store and metadata table saved as a matched pair.
//!
//! # Artifacts
//!
//! For a prefix `P`:
//!
//! ```text
//! P.vectors     binary vector data
//! P.meta.json   {"generation": G, "records": [verse records, one per vector]}
//! ```
//!
//! `P.vectors` layout:
//!
//! ```text
//! Offset   Size    Type        Description
//! ─────────────────────────────────────────────
//! 0x00     8       [u8; 8]     Magic: "SHLKVEC1"
//! 0x08     4       u32 LE      N: Number of vectors
//! 0x0C     4       u32 LE      D: Dimensions
//! 0x10     8       u64 LE      G: Generation of this save
//! 0x18     N*D*4   [f32]       Vector data (Little Endian)
//! ```
//!
//! Every save stamps both artifacts with the same generation. `load` refuses a
//! pair whose generations differ, even when the row counts agree.
//!
//! Both artifacts are written to `.tmp` siblings and renamed into place. If the
//! metadata rename fails, the previous vectors artifact is restored.

use std::collections::hash_map::DefaultHasher;
use std::ffi::OsString;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metadata::MetadataTable;
use crate::store::VectorStore;

/// Magic bytes identifying a vector artifact.
pub const MAGIC: [u8; 8] = *b"SHLKVEC1";

/// Header size in bytes: 8 (magic) + 4 (count) + 4 (dims) + 8 (generation).
pub const HEADER_SIZE: usize = 24;

pub const VECTORS_SUFFIX: &str = ".vectors";
pub const METADATA_SUFFIX: &str = ".meta.json";

/// Paths of the artifact pair for `prefix`.
pub fn artifact_paths(prefix: &Path) -> (PathBuf, PathBuf) {
    (with_suffix(prefix, VECTORS_SUFFIX), with_suffix(prefix, METADATA_SUFFIX))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

#[derive(Serialize)]
struct MetadataArtifact<'a> {
    generation: u64,
    records: &'a MetadataTable,
}

#[derive(Deserialize)]
struct StoredMetadata {
    generation: u64,
    records: MetadataTable,
}

/// Writes both artifacts under `prefix`, replacing any existing pair.
pub fn save(store: &VectorStore, table: &MetadataTable, prefix: &Path) -> Result<(), PersistError> {
    if store.len() != table.len() {
        return Err(PersistError::Misaligned {
            vectors: store.len(),
            records: table.len(),
        });
    }
    if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PersistError::io(parent, e))?;
    }

    let (vectors_path, meta_path) = artifact_paths(prefix);
    let vectors_tmp = with_suffix(&vectors_path, ".tmp");
    let meta_tmp = with_suffix(&meta_path, ".tmp");
    let generation = generation(store, table);

    let saved = write_vectors(store, generation, &vectors_tmp)
        .and_then(|()| write_metadata(table, generation, &meta_tmp))
        .and_then(|()| publish(&vectors_tmp, &vectors_path, &meta_tmp, &meta_path));
    if let Err(e) = saved {
        let _ = std::fs::remove_file(&vectors_tmp);
        let _ = std::fs::remove_file(&meta_tmp);
        return Err(e);
    }

    info!(prefix = %prefix.display(), rows = store.len(), generation, "saved index");
    Ok(())
}

/// Renames both temp files into place. On a failed metadata rename the previous
/// vectors artifact (if any) is put back.
fn publish(
    vectors_tmp: &Path,
    vectors_path: &Path,
    meta_tmp: &Path,
    meta_path: &Path,
) -> Result<(), PersistError> {
    let backup = with_suffix(vectors_path, ".bak");
    let has_previous = vectors_path.is_file();
    if has_previous {
        let _ = std::fs::remove_file(&backup);
        std::fs::hard_link(vectors_path, &backup)
            .or_else(|_| std::fs::copy(vectors_path, &backup).map(|_| ()))
            .map_err(|e| PersistError::io(&backup, e))?;
    }

    let renamed = std::fs::rename(vectors_tmp, vectors_path)
        .map_err(|e| PersistError::io(vectors_path, e))
        .and_then(|()| std::fs::rename(meta_tmp, meta_path).map_err(|e| PersistError::io(meta_path, e)));

    if let Err(e) = renamed {
        let restored = if has_previous {
            std::fs::rename(&backup, vectors_path)
        } else {
            std::fs::remove_file(vectors_path)
        };
        if let Err(restore) = restored {
            warn!(path = %vectors_path.display(), error = %restore, "could not restore previous vectors");
        }
        return Err(e);
    }
    if has_previous {
        let _ = std::fs::remove_file(&backup);
    }
    Ok(())
}

/// Token shared by the two artifacts of one save.
fn generation(store: &VectorStore, table: &MetadataTable) -> u64 {
    let mut h = DefaultHasher::new();
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
        .hash(&mut h);
    std::process::id().hash(&mut h);
    store.len().hash(&mut h);
    for v in store.as_raw() {
        v.to_bits().hash(&mut h);
    }
    for r in table.iter() {
        r.sanskrit.hash(&mut h);
        r.translation.hash(&mut h);
        r.purport.hash(&mut h);
    }
    h.finish()
}

/// Reads the artifact pair under `prefix`. Fails if either artifact is missing,
/// if they come from different saves, or if they disagree on row count.
pub fn load(prefix: &Path) -> Result<(VectorStore, MetadataTable), PersistError> {
    let (vectors_path, meta_path) = artifact_paths(prefix);
    for path in [&vectors_path, &meta_path] {
        if !path.is_file() {
            return Err(PersistError::IndexNotFound(path.clone()));
        }
    }

    let (vectors_generation, store) = read_vectors(&vectors_path)?;
    let (meta_generation, table) = read_metadata(&meta_path)?;
    if vectors_generation != meta_generation {
        return Err(PersistError::CorruptIndex(format!(
            "vectors are from save {vectors_generation:#018x} but metadata is from save {meta_generation:#018x}"
        )));
    }
    if store.len() != table.len() {
        return Err(PersistError::CorruptIndex(format!(
            "{} vectors but {} metadata rows",
            store.len(),
            table.len()
        )));
    }

    info!(
        prefix = %prefix.display(),
        rows = store.len(),
        dimension = ?store.dimension(),
        "loaded index"
    );
    Ok((store, table))
}

fn write_vectors(store: &VectorStore, generation: u64, path: &Path) -> Result<(), PersistError> {
    let count = u32::try_from(store.len()).map_err(|_| PersistError::TooLarge(store.len()))?;
    let dim = store.dimension().unwrap_or(0);
    let dimensions = u32::try_from(dim).map_err(|_| PersistError::TooLarge(dim))?;

    let file = File::create(path).map_err(|e| PersistError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let write = |writer: &mut BufWriter<File>| -> std::io::Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_all(&count.to_le_bytes())?;
        writer.write_all(&dimensions.to_le_bytes())?;
        writer.write_all(&generation.to_le_bytes())?;
        for &val in store.as_raw() {
            writer.write_all(&val.to_le_bytes())?;
        }
        writer.flush()?;
        writer.get_ref().sync_all()
    };
    write(&mut writer).map_err(|e| PersistError::io(path, e))
}

fn write_metadata(table: &MetadataTable, generation: u64, path: &Path) -> Result<(), PersistError> {
    let file = File::create(path).map_err(|e| PersistError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(
        &mut writer,
        &MetadataArtifact {
            generation,
            records: table,
        },
    )?;
    writer.flush().map_err(|e| PersistError::io(path, e))?;
    writer.get_ref().sync_all().map_err(|e| PersistError::io(path, e))
}

fn read_vectors(path: &Path) -> Result<(u64, VectorStore), PersistError> {
    let bytes = std::fs::read(path).map_err(|e| PersistError::io(path, e))?;
    if bytes.len() < HEADER_SIZE {
        return Err(PersistError::CorruptIndex(format!(
            "{} is too small for a header",
            path.display()
        )));
    }
    if bytes[0..8] != MAGIC {
        return Err(PersistError::CorruptIndex(format!(
            "{} has invalid magic bytes",
            path.display()
        )));
    }
    let count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let dim = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as usize;
    let mut generation = [0u8; 8];
    generation.copy_from_slice(&bytes[16..24]);
    let generation = u64::from_le_bytes(generation);

    let body = &bytes[HEADER_SIZE..];
    let expected = count
        .checked_mul(dim)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f32>()));
    if expected != Some(body.len()) {
        return Err(PersistError::CorruptIndex(format!(
            "{}: header says {count}x{dim} vectors but file has {} data bytes",
            path.display(),
            body.len()
        )));
    }

    let data = body
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    let store = VectorStore::from_raw(dim, count, data)
        .map_err(|e| PersistError::CorruptIndex(e.to_string()))?;
    Ok((generation, store))
}

fn read_metadata(path: &Path) -> Result<(u64, MetadataTable), PersistError> {
    let s = std::fs::read_to_string(path).map_err(|e| PersistError::io(path, e))?;
    let stored: StoredMetadata = serde_json::from_str(&s)
        .map_err(|e| PersistError::CorruptIndex(format!("{}: {e}", path.display())))?;
    Ok((stored.generation, stored.records))
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("index artifact not found: {0} (build the index first)")]
    IndexNotFound(PathBuf),
    #[error("corrupt index: {0} (rebuild the index)")]
    CorruptIndex(String),
    #[error("refusing to save misaligned index: {vectors} vectors, {records} metadata rows")]
    Misaligned { vectors: usize, records: usize },
    #[error("index too large for the on-disk format: {0}")]
    TooLarge(usize),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize metadata: {0}")]
    Json(#[from] serde_json::Error),
}

impl PersistError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        PersistError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
