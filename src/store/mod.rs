//! Storage collaborator
//!
//! The core never talks to a database directly. Everything it needs from
//! persistent storage goes through the [`WorkStore`] trait so that different
//! backends (Postgres, in-memory) can be used interchangeably.
//!
//! Ordering contract: the URI and title lookups return rows sorted by
//! `(score asc, canonical desc)`; the work listing returns rows grouped by
//! work id. The core re-sorts defensively when a backend breaks this.

use async_trait::async_trait;
use uuid::Uuid;

use crate::filters::Filters;
use crate::model::{CandidateRow, NewIdentifier, NewWork, WorkRow};
use crate::uri::UriParts;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::InMemoryWorkStore;
#[cfg(feature = "database")]
pub use postgres::PgWorkStore;

/// Titles at least this long are skipped by the edit-distance tier.
///
/// Counted in bytes of UTF-8, like the column size Postgres reports; the
/// edit distance itself is computed over characters.
pub const MAX_EDIT_DISTANCE_TITLE_LEN: usize = 255;

/// Largest edit distance still accepted for a title query.
///
/// Counted in characters: `len(title) / 3 + 1`.
pub fn edit_distance_threshold(title: &str) -> usize {
    title.chars().count() / 3 + 1
}

/// Which works a listing should cover
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkSelection {
    pub work_id: Option<Uuid>,
    pub filters: Filters,
}

impl WorkSelection {
    pub fn by_id(work_id: Uuid) -> Self {
        Self {
            work_id: Some(work_id),
            filters: Filters::default(),
        }
    }

    pub fn filtered(filters: Filters) -> Self {
        Self {
            work_id: None,
            filters,
        }
    }
}

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Store backend failure: {0}")]
    Backend(String),
}

/// Read and write access to works, titles, URIs and relations.
///
/// Implementations must be Send + Sync; the service shares one instance
/// across concurrent requests.
#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Every URI of the works owning `(scheme, value)`, all at score 0,
    /// canonical rows first
    async fn find_by_uri(
        &self,
        scheme: &str,
        value: &str,
        filters: &Filters,
    ) -> Result<Vec<CandidateRow>, StoreError>;

    /// URIs of works whose titles match `title` in one of the four tiers
    /// (exact 0, prefix 1, containment 1, edit distance), lowest score kept
    /// per `(work, scheme, value)`. When `uri` is given, only works owning
    /// that URI are considered.
    async fn find_by_title(
        &self,
        title: &str,
        filters: &Filters,
        uri: Option<&UriParts>,
    ) -> Result<Vec<CandidateRow>, StoreError>;

    /// Work × title × URI join rows, ordered by work id
    async fn find_works(&self, selection: &WorkSelection) -> Result<Vec<WorkRow>, StoreError>;

    async fn children(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn parents(&self, work_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    async fn work_exists(&self, work_id: Uuid) -> Result<bool, StoreError>;

    /// Like [`WorkStore::work_exists`] for untrusted input; strings that are
    /// not UUIDs are reported as absent.
    async fn uuid_exists(&self, candidate: &str) -> Result<bool, StoreError> {
        match Uuid::parse_str(candidate.trim()) {
            Ok(work_id) => self.work_exists(work_id).await,
            Err(_) => Ok(false),
        }
    }

    async fn type_exists(&self, work_type: &str) -> Result<bool, StoreError>;

    async fn scheme_exists(&self, scheme: &str) -> Result<bool, StoreError>;

    /// Every registered work type, in store order
    async fn work_types(&self) -> Result<Vec<String>, StoreError>;

    /// Persist a validated work with its titles, URIs and relation edges
    /// atomically
    async fn insert_work(&self, work: &NewWork) -> Result<(), StoreError>;

    /// Attach titles to an existing work; titles it already has are kept once
    async fn add_titles(&self, work_id: Uuid, titles: &[String]) -> Result<(), StoreError>;

    /// Attach a normalized URI to an existing work
    async fn add_uri(&self, work_id: Uuid, identifier: &NewIdentifier) -> Result<(), StoreError>;

    /// Record a parent → child edge; an existing edge is left alone
    async fn add_relation(&self, parent: Uuid, child: Uuid) -> Result<(), StoreError>;

    /// Remove a work with its title, URI and relation links. Returns whether
    /// a work was removed.
    async fn delete_work(&self, work_id: Uuid) -> Result<bool, StoreError>;
}
