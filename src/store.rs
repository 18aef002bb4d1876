//! Sources of archive entries that can also run aggregation pipelines.

mod memory;
mod mongo;

use async_trait::async_trait;
use mongodb::bson::Document;

use crate::{error::Result, model::ArchiveEntry};

pub use self::{memory::MemoryStore, mongo::MongoStore};

/// A read-only view of the entry collection.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Reads every entry, documents included.
    async fn fetch_entries(&self) -> Result<Vec<ArchiveEntry>>;

    /// Runs `pipeline` against the collection and returns every result row.
    async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>>;

    /// A short human-readable name for the store, used in log events.
    fn describe(&self) -> String;
}
