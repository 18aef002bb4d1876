//! Computes the total page count of an entry collection.

use std::str::FromStr;

use derive_more::Display;
use mongodb::bson::{Bson, Document};

use crate::{
    error::{Error, Result},
    model::ArchiveEntry,
    pipeline,
    store::EntryStore,
};

/// How a total is computed. Every strategy yields the same total for the same collection.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Fetch every entry and sum in process.
    #[display("local")]
    Local,

    /// Send the hand-written two-stage pipeline to the store.
    #[display("pipeline")]
    Pipeline,

    /// Send the pipeline lowered from [`pipeline::Query::total_page_count`] to the store.
    #[display("builder")]
    Builder,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Local, Strategy::Pipeline, Strategy::Builder];

    /// Whether the store computes the total.
    pub fn is_delegated(self) -> bool {
        !matches!(self, Strategy::Local)
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Strategy::Local),
            "pipeline" | "raw" => Ok(Strategy::Pipeline),
            "builder" | "query" => Ok(Strategy::Builder),
            other => Err(Error::invalid_configuration(format!(
                "unknown strategy {other:?}, expected one of local, pipeline, builder"
            ))),
        }
    }
}

/// Sums the page counts of every document of every entry. Absent document lists count as empty.
/// A total that does not fit in an `i64` is an error.
pub fn sum_page_counts<'a>(entries: impl IntoIterator<Item = &'a ArchiveEntry>) -> Result<i64> {
    entries.into_iter().try_fold(0_i64, |total, entry| {
        entry
            .page_count()
            .and_then(|count| total.checked_add(count))
            .ok_or_else(|| Error::invalid_response("total page count overflows i64"))
    })
}

/// Reads the total out of the rows returned by a delegated pipeline.
///
/// No rows means there was nothing to sum and yields zero. Otherwise there must be exactly one
/// row holding an integral number under `field`.
pub fn extract_total(rows: &[Document], field: &str) -> Result<i64> {
    let row = match rows {
        [] => return Ok(0),
        [row] => row,
        _ => {
            return Err(Error::invalid_response(format!(
                "expected a single result row, got {}",
                rows.len()
            )))
        }
    };

    match row.get(field) {
        Some(Bson::Int32(n)) => Ok(i64::from(*n)),
        Some(Bson::Int64(n)) => Ok(*n),
        Some(Bson::Double(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(*f as i64),
        Some(other) => Err(Error::invalid_response(format!(
            "expected an integral {field}, got {other}"
        ))),
        None => Err(Error::invalid_response(format!(
            "result row {row} has no {field} field"
        ))),
    }
}

/// Computes page totals over an [`EntryStore`].
#[derive(Clone, Debug)]
pub struct PageCounter<S> {
    store: S,
}

impl<S: EntryStore> PageCounter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Computes the total with `strategy`.
    pub async fn total(&self, strategy: Strategy) -> Result<i64> {
        let total = match strategy {
            Strategy::Local => self.total_local().await?,
            Strategy::Pipeline => {
                self.total_delegated(pipeline::raw_pipeline(), pipeline::TOTAL_PAGE_COUNT)
                    .await?
            }
            Strategy::Builder => {
                self.total_delegated(pipeline::builder_pipeline()?, pipeline::VALUE)
                    .await?
            }
        };
        tracing::debug!(
            store = %self.store.describe(),
            %strategy,
            total,
            "computed total page count"
        );
        Ok(total)
    }

    /// Fetches every entry and sums locally.
    pub async fn total_local(&self) -> Result<i64> {
        let entries = self.store.fetch_entries().await?;
        sum_page_counts(&entries)
    }

    /// Runs `pipeline` on the store and reads the total from `field`.
    pub async fn total_delegated(&self, pipeline: Vec<Document>, field: &str) -> Result<i64> {
        let rows = self.store.aggregate(pipeline).await?;
        extract_total(&rows, field)
    }
}
