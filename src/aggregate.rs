//! Work aggregation
//!
//! The work listing comes back from the store as one row per
//! work × title × URI combination. A single forward pass folds consecutive
//! rows of the same work into one [`Work`], de-duplicating titles and URIs
//! while keeping the order they were first seen in.

use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::filters::{SortKey, SortOrder};
use crate::model::{Identifier, UriEntry, Work, WorkRow};
use crate::store::WorkStore;

static NON_LETTERS: LazyLock<Regex> = LazyLock::new(|| Regex::new("[^A-Za-z]+").unwrap());

#[derive(Debug)]
struct Accumulator {
    work_id: Uuid,
    work_type: String,
    titles: IndexSet<String>,
    uris: IndexSet<UriEntry>,
}

impl Accumulator {
    fn start(row: &WorkRow) -> Self {
        Self {
            work_id: row.work_id,
            work_type: row.work_type.clone(),
            titles: IndexSet::new(),
            uris: IndexSet::new(),
        }
    }

    fn absorb(&mut self, row: WorkRow) {
        if let Some(entry) = row.uri_entry() {
            self.uris.insert(entry);
        }
        if let Some(title) = row.title {
            self.titles.insert(title);
        }
    }

    fn into_work(self) -> Work {
        Work {
            id: self.work_id,
            work_type: self.work_type,
            titles: self.titles.into_iter().collect(),
            identifiers: self.uris.into_iter().map(Identifier::from).collect(),
            parents: None,
            children: None,
        }
    }
}

/// Streaming fold of work-ordered rows.
///
/// Feed rows with [`push`](Self::push); a finished [`Work`] is handed back
/// whenever the work id changes. Call [`finish`](Self::finish) for the last one.
#[derive(Debug, Default)]
pub struct WorkAggregator {
    current: Option<Accumulator>,
}

impl WorkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: WorkRow) -> Option<Work> {
        let flushed = match &self.current {
            Some(acc) if acc.work_id == row.work_id => None,
            _ => self
                .current
                .replace(Accumulator::start(&row))
                .map(Accumulator::into_work),
        };
        if let Some(acc) = self.current.as_mut() {
            acc.absorb(row);
        }
        flushed
    }

    pub fn finish(self) -> Option<Work> {
        self.current.map(Accumulator::into_work)
    }
}

/// Fold rows into works without touching the store.
///
/// Rows not grouped by work id are stably re-sorted first.
pub fn aggregate_rows(mut rows: Vec<WorkRow>) -> Vec<Work> {
    if !rows.windows(2).all(|pair| pair[0].work_id <= pair[1].work_id) {
        warn!(count = rows.len(), "Work rows arrived out of order, re-sorting");
        rows.sort_by_key(|row| row.work_id);
    }

    let mut aggregator = WorkAggregator::new();
    let mut works: Vec<Work> = rows
        .into_iter()
        .filter_map(|row| aggregator.push(row))
        .collect();
    works.extend(aggregator.finish());
    debug!(count = works.len(), "Aggregated works");
    works
}

/// Fold rows into works, attaching parent and child ids when
/// `include_relatives` is set.
pub async fn aggregate(
    rows: Vec<WorkRow>,
    include_relatives: bool,
    store: &dyn WorkStore,
) -> Result<Vec<Work>> {
    let mut works = aggregate_rows(rows);
    if include_relatives {
        for work in &mut works {
            work.children = Some(store.children(work.id).await?);
            work.parents = Some(store.parents(work.id).await?);
        }
    }
    Ok(works)
}

/// Order works by their first title (or type), letters only. Ties keep
/// store order in both directions.
pub fn sort_works(works: &mut [Work], order: SortOrder) {
    sort_by_letters(works, order.descending, |work| match order.key {
        SortKey::Title => work.first_title().unwrap_or_default(),
        SortKey::WorkType => work.work_type.as_str(),
    });
}

/// Stable sort on `key` with every non-letter character removed
pub fn sort_by_letters<T>(items: &mut [T], descending: bool, key: impl Fn(&T) -> &str) {
    let letters = |item: &T| NON_LETTERS.replace_all(key(item), "").into_owned();
    items.sort_by(|a, b| {
        let ordering = letters(a).cmp(&letters(b));
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}
