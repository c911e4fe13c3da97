//! In-process work store
//!
//! Mirrors the Postgres queries closely enough to exercise the resolver and
//! aggregator end to end without a database: the same four title tiers, the
//! same filter semantics, the same row ordering.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::{
    edit_distance_threshold, StoreError, WorkSelection, WorkStore, MAX_EDIT_DISTANCE_TITLE_LEN,
};
use crate::filters::Filters;
use crate::model::{CandidateRow, NewIdentifier, NewWork, UriEntry, WorkRow};
use crate::uri::UriParts;

#[derive(Debug, Default)]
struct Catalog {
    work_types: BTreeSet<String>,
    schemes: BTreeSet<String>,
    works: BTreeMap<Uuid, StoredWork>,
    /// (parent, child) edges in insertion order
    relations: Vec<(Uuid, Uuid)>,
}

#[derive(Debug, Clone)]
struct StoredWork {
    work_type: String,
    titles: Vec<String>,
    uris: Vec<UriEntry>,
}

impl StoredWork {
    fn attach_title(&mut self, title: &str) {
        if !self.titles.iter().any(|t| t == title) {
            self.titles.push(title.to_string());
        }
    }

    fn attach_uri(&mut self, identifier: &NewIdentifier) {
        let parts = &identifier.parts;
        if !self.owns(&parts.scheme, &parts.value) {
            self.uris.push(UriEntry {
                scheme: parts.scheme.clone(),
                value: parts.value.clone(),
                canonical: identifier.canonical,
            });
        }
    }

    fn owns(&self, scheme: &str, value: &str) -> bool {
        self.uris
            .iter()
            .any(|u| u.scheme == scheme && u.value == value)
    }

    /// Lowest score any of this work's titles reaches for `query`
    fn best_title_score(&self, query: &str, threshold: usize) -> Option<u32> {
        self.titles
            .iter()
            .filter_map(|title| title_score(&title.to_lowercase(), query, threshold))
            .min()
    }
}

/// Score one stored title (lowercased) against a lowercased query
fn title_score(stored: &str, query: &str, threshold: usize) -> Option<u32> {
    if stored.is_empty() {
        return None;
    }
    if stored == query {
        return Some(0);
    }
    if stored.starts_with(query) || query.starts_with(stored) {
        return Some(1);
    }
    if stored.len() >= MAX_EDIT_DISTANCE_TITLE_LEN {
        return None;
    }
    let distance = strsim::levenshtein(stored, query);
    (distance <= threshold).then(|| u32::try_from(distance).unwrap_or(u32::MAX))
}

/// Work store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryWorkStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryWorkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_work_type(mut self, work_type: impl Into<String>) -> Self {
        self.catalog_mut().work_types.insert(work_type.into());
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.catalog_mut().schemes.insert(scheme.into());
        self
    }

    /// Seed a work. Its type and URI schemes are registered as well.
    pub fn with_work<T, U>(mut self, work_id: Uuid, work_type: &str, titles: T, uris: U) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        U: IntoIterator<Item = (UriParts, bool)>,
    {
        let uris: Vec<UriEntry> = uris
            .into_iter()
            .map(|(parts, canonical)| UriEntry {
                scheme: parts.scheme,
                value: parts.value,
                canonical,
            })
            .collect();

        let catalog = self.catalog_mut();
        catalog.work_types.insert(work_type.to_string());
        catalog
            .schemes
            .extend(uris.iter().map(|u| u.scheme.clone()));
        catalog.works.insert(
            work_id,
            StoredWork {
                work_type: work_type.to_string(),
                titles: titles.into_iter().map(Into::into).collect(),
                uris,
            },
        );
        self
    }

    pub fn with_relation(mut self, parent: Uuid, child: Uuid) -> Self {
        self.catalog_mut().link(parent, child);
        self
    }

    fn catalog_mut(&mut self) -> &mut Catalog {
        self.catalog
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Catalog>, StoreError> {
        self.catalog
            .read()
            .map_err(|_| StoreError::Backend("work catalog lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Catalog>, StoreError> {
        self.catalog
            .write()
            .map_err(|_| StoreError::Backend("work catalog lock poisoned".to_string()))
    }
}

impl Catalog {
    fn link(&mut self, parent: Uuid, child: Uuid) {
        if !self.relations.contains(&(parent, child)) {
            self.relations.push((parent, child));
        }
    }

    fn work_mut(&mut self, work_id: Uuid) -> Result<&mut StoredWork, StoreError> {
        self.works
            .get_mut(&work_id)
            .ok_or_else(|| StoreError::Backend(format!("work {work_id} is not stored")))
    }
}

fn candidate(work_id: Uuid, work: &StoredWork, uri: &UriEntry, score: u32) -> CandidateRow {
    CandidateRow {
        work_id,
        work_type: work.work_type.clone(),
        uri_scheme: uri.scheme.clone(),
        uri_value: uri.value.clone(),
        canonical: uri.canonical,
        score,
    }
}

#[async_trait]
impl WorkStore for InMemoryWorkStore {
    async fn find_by_uri(
        &self,
        scheme: &str,
        value: &str,
        filters: &Filters,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        let catalog = self.read()?;
        let mut rows: Vec<CandidateRow> = catalog
            .works
            .iter()
            .filter(|(_, work)| filters.allows_work_type(&work.work_type))
            .filter(|(_, work)| work.owns(scheme, value))
            .flat_map(|(&work_id, work)| {
                work.uris
                    .iter()
                    .filter(move |uri| filters.allows_uri(&uri.scheme, uri.canonical))
                    .map(move |uri| candidate(work_id, work, uri, 0))
            })
            .collect();

        rows.sort_by(|a, b| b.canonical.cmp(&a.canonical));
        debug!(scheme, value, count = rows.len(), "URI lookup");
        Ok(rows)
    }

    async fn find_by_title(
        &self,
        title: &str,
        filters: &Filters,
        uri: Option<&UriParts>,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        let query = title.to_lowercase();
        let threshold = edit_distance_threshold(&query);
        let catalog = self.read()?;

        // keyed like DISTINCT ON (work_id, uri_scheme, uri_value)
        let mut best: BTreeMap<(Uuid, String, String), CandidateRow> = BTreeMap::new();
        for (&work_id, work) in &catalog.works {
            if !filters.allows_work_type(&work.work_type) {
                continue;
            }
            if let Some(uri) = uri {
                if !work.owns(&uri.scheme, &uri.value) {
                    continue;
                }
            }
            let Some(score) = work.best_title_score(&query, threshold) else {
                continue;
            };
            for entry in work.uris.iter().filter(|u| filters.allows_uri(&u.scheme, u.canonical)) {
                let key = (work_id, entry.scheme.clone(), entry.value.clone());
                let row = candidate(work_id, work, entry, score);
                match best.entry(key) {
                    Entry::Occupied(mut slot) => {
                        if row.score < slot.get().score {
                            slot.insert(row);
                        }
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(row);
                    }
                }
            }
        }

        let mut rows: Vec<CandidateRow> = best.into_values().collect();
        rows.sort_by(|a, b| {
            a.score
                .cmp(&b.score)
                .then_with(|| b.canonical.cmp(&a.canonical))
        });
        debug!(title, count = rows.len(), "Title lookup");
        Ok(rows)
    }

    async fn find_works(&self, selection: &WorkSelection) -> Result<Vec<WorkRow>, StoreError> {
        let catalog = self.read()?;
        let filters = &selection.filters;
        let mut rows = Vec::new();

        for (&work_id, work) in &catalog.works {
            if selection.work_id.is_some_and(|id| id != work_id) {
                continue;
            }
            if !filters.allows_work_type(&work.work_type) {
                continue;
            }
            let uris: Vec<Option<&UriEntry>> = work
                .uris
                .iter()
                .filter(|u| filters.allows_uri(&u.scheme, u.canonical))
                .map(Some)
                .collect();
            if uris.is_empty() && filters.restricts_uris() {
                continue;
            }
            let uris = if uris.is_empty() { vec![None] } else { uris };
            let titles: Vec<Option<&String>> = if work.titles.is_empty() {
                vec![None]
            } else {
                work.titles.iter().map(Some).collect()
            };

            // left join cross product, duplicates and all
            for title in &titles {
                for uri in &uris {
                    rows.push(WorkRow {
                        work_id,
                        work_type: work.work_type.clone(),
                        title: title.cloned(),
                        uri_scheme: uri.map(|u| u.scheme.clone()),
                        uri_value: uri.map(|u| u.value.clone()),
                        canonical: uri.map(|u| u.canonical),
                    });
                }
            }
        }

        Ok(rows)
    }

    async fn children(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let catalog = self.read()?;
        Ok(catalog
            .relations
            .iter()
            .filter(|(parent, _)| *parent == work_id)
            .map(|&(_, child)| child)
            .collect())
    }

    async fn parents(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let catalog = self.read()?;
        Ok(catalog
            .relations
            .iter()
            .filter(|(_, child)| *child == work_id)
            .map(|&(parent, _)| parent)
            .collect())
    }

    async fn work_exists(&self, work_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.read()?.works.contains_key(&work_id))
    }

    async fn type_exists(&self, work_type: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.work_types.contains(work_type))
    }

    async fn scheme_exists(&self, scheme: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.schemes.contains(scheme))
    }

    async fn work_types(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.work_types.iter().cloned().collect())
    }

    async fn insert_work(&self, work: &NewWork) -> Result<(), StoreError> {
        let mut catalog = self.write()?;

        let stored = catalog
            .works
            .entry(work.id)
            .or_insert_with(|| StoredWork {
                work_type: work.work_type.clone(),
                titles: Vec::new(),
                uris: Vec::new(),
            });
        for title in &work.titles {
            stored.attach_title(title);
        }
        for identifier in &work.identifiers {
            stored.attach_uri(identifier);
        }

        for &child in &work.children {
            catalog.link(work.id, child);
        }
        for &parent in &work.parents {
            catalog.link(parent, work.id);
        }

        debug!(work_id = %work.id, "Inserted work");
        Ok(())
    }

    async fn add_titles(&self, work_id: Uuid, titles: &[String]) -> Result<(), StoreError> {
        let mut catalog = self.write()?;
        let stored = catalog.work_mut(work_id)?;
        for title in titles {
            stored.attach_title(title);
        }
        Ok(())
    }

    async fn add_uri(&self, work_id: Uuid, identifier: &NewIdentifier) -> Result<(), StoreError> {
        self.write()?.work_mut(work_id)?.attach_uri(identifier);
        Ok(())
    }

    async fn add_relation(&self, parent: Uuid, child: Uuid) -> Result<(), StoreError> {
        self.write()?.link(parent, child);
        Ok(())
    }

    async fn delete_work(&self, work_id: Uuid) -> Result<bool, StoreError> {
        let mut catalog = self.write()?;
        if catalog.works.remove(&work_id).is_none() {
            return Ok(false);
        }
        catalog
            .relations
            .retain(|&(parent, child)| parent != work_id && child != work_id);
        debug!(%work_id, "Deleted work");
        Ok(true)
    }
}
