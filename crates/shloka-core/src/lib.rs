//! All backend logic independent of how the app is run.
//!
//! The verse corpus lives wherever the user keeps it. Shloka stores only config
//! and the persisted index in its own app data directory (see [app_data]).
//!
//! Pipeline: corpus ([corpus]) → [index::build] → ([VectorStore], [MetadataTable])
//! → [persist::save] / [persist::load] → [query::query] → [enrich::enrich].

pub mod app_data;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod enrich;
pub mod index;
pub mod metadata;
pub mod ollama;
pub mod persist;
pub mod query;
pub mod record;
pub mod store;
pub mod watcher;

pub use app_data::{app_data_dir, default_index_prefix};
pub use config::{load_config, save_config, set_index_prefix, Config, ConfigError};
pub use corpus::{read_corpus, CorpusError};
pub use embed::{EmbedError, Embedder, GenerateError, Generator};
pub use enrich::{enrich, Enrichment};
pub use index::{build, build_index, BuildOptions, BuildReport, DroppedRow, IndexError};
pub use metadata::{MetadataError, MetadataTable};
pub use ollama::{OllamaClient, OllamaError};
pub use persist::{load, save, PersistError};
pub use query::{query, QueryError, QueryResult, SemanticIndex};
pub use record::{EmbedField, Identifier, MetadataRecord, RawRow};
pub use store::{Neighbor, StoreError, Vector, VectorStore};
pub use watcher::{watch_corpus, CorpusWatcher, WatchError};

/// Returns a short status string. Used to verify the backend is wired up.
pub fn status() -> &'static str {
    "shloka-core ready"
}
