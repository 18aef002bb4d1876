//! Totals the page counts of archived documents stored in MongoDB.
//!
//! Each `ArchiveEntry` in the entry collection owns a list of documents, each with a page count.
//! The grand total over every document of every entry can be computed three equivalent ways,
//! selected with [`Strategy`](aggregator::Strategy):
//!
//! - `local`: fetch every entry and sum in process;
//! - `pipeline`: send a hand-written two-stage aggregation pipeline to the server;
//! - `builder`: send the pipeline lowered from a [`Query`](pipeline::Query).
//!
//! ```no_run
//! # async fn run() -> archive_page_count::error::Result<()> {
//! use archive_page_count::{
//!     aggregator::{PageCounter, Strategy},
//!     options::StoreOptions,
//!     store::MongoStore,
//! };
//!
//! let store = MongoStore::connect(&StoreOptions::from_env()?).await?;
//! let counter = PageCounter::new(store);
//! for strategy in Strategy::ALL {
//!     println!("{strategy}: {}", counter.total(strategy).await?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`MemoryStore`](store::MemoryStore) evaluates the same pipelines in process, so the
//! strategies can be compared without a server.

pub mod aggregator;
pub mod error;
pub mod measure;
pub mod model;
pub mod options;
pub mod pipeline;
pub mod store;
pub mod trace;

#[cfg(test)]
mod test;

pub use crate::{
    aggregator::{PageCounter, Strategy},
    error::{Error, ErrorKind, Result},
    model::{ArchiveDocument, ArchiveEntry},
};
