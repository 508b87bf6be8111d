use indexmap::IndexMap;

use crate::record::{Record, ResultSet};

/// Outcome of merging a fresh scrape into the persisted history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merged {
    /// Every known record, newest rating first.
    pub records: Vec<Record>,
    /// Fresh ids that weren't in the history before.
    pub added: usize,
    /// Historical ids the fresh scrape didn't see, kept as they were.
    pub retained: usize,
}

/// Merges `fresh` into `previous`.
///
/// Fresh records replace historical ones with the same id. Historical records the scrape
/// didn't see (unrated since, or beyond `--max-pages`) are kept unchanged. The result is
/// sorted by `rated_at`, newest first. Ties keep listing order, then history order.
pub fn reconcile(fresh: &ResultSet, previous: &[Record]) -> Merged {
    // Later duplicates in the history win, same as rebuilding the id map would.
    let previous: IndexMap<u64, &Record> = previous.iter().map(|r| (r.id, r)).collect();

    let added = fresh.keys().filter(|&id| !previous.contains_key(id)).count();

    let mut records: Vec<Record> = fresh.values().cloned().collect();
    let before = records.len();
    records.extend(
        previous
            .iter()
            .filter(|&(&id, _)| !fresh.contains_key(&id))
            .map(|(_, record)| (*record).clone()),
    );
    let retained = records.len() - before;

    // `YYYY-MM-DD` sorts correctly as a string.
    records.sort_by(|a, b| b.rated_at.cmp(&a.rated_at));

    Merged {
        records,
        added,
        retained,
    }
}
