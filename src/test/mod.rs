mod error;
mod measure;
mod model;
mod trace;

use rand::{rngs::SmallRng, Rng};

use crate::{
    aggregator::{PageCounter, Strategy},
    model::ArchiveEntry,
    store::EntryStore,
};

/// One named entry per slice of page counts.
pub(crate) fn entries(page_counts: &[&[i64]]) -> Vec<ArchiveEntry> {
    page_counts
        .iter()
        .enumerate()
        .map(|(i, counts)| ArchiveEntry::with_page_counts(format!("entry {i}"), counts))
        .collect()
}

/// A random collection of up to `max_entries` entries. Some entries have no document list at
/// all, some have an empty one.
pub(crate) fn random_entries(rng: &mut SmallRng, max_entries: usize) -> Vec<ArchiveEntry> {
    let n = rng.random_range(0..=max_entries);
    (0..n)
        .map(|i| {
            if rng.random_bool(0.1) {
                return ArchiveEntry {
                    id: None,
                    name: None,
                    documents: None,
                };
            }
            let docs = rng.random_range(0..6);
            let counts: Vec<i64> = (0..docs).map(|_| rng.random_range(0..500)).collect();
            ArchiveEntry::with_page_counts(format!("random {i}"), &counts)
        })
        .collect()
}

/// The total computed by every strategy, in [`Strategy::ALL`] order.
pub(crate) async fn totals<S: EntryStore>(counter: &PageCounter<S>) -> Vec<(Strategy, i64)> {
    let mut totals = Vec::new();
    for strategy in Strategy::ALL {
        let total = counter
            .total(strategy)
            .await
            .unwrap_or_else(|e| panic!("{strategy} failed: {e}"));
        totals.push((strategy, total));
    }
    totals
}

/// Asserts every strategy returns `expected`.
pub(crate) async fn assert_all_strategies<S: EntryStore>(counter: &PageCounter<S>, expected: i64) {
    for (strategy, total) in totals(counter).await {
        assert_eq!(total, expected, "{strategy} strategy disagreed");
    }
}
