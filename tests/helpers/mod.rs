//! Shared catalog fixture for the integration tests
//!
//! | work | type      | title                  | URIs                                  |
//! |------|-----------|------------------------|---------------------------------------|
//! | A    | monograph | The Open Book          | doi (canonical), isbn, https          |
//! | B    | monograph | The Open Book Reader   | isbn (canonical)                      |
//! | C    | chapter   | Chapter One            | doi (canonical), child of A           |
//! | D    | monograph | Twin Title             | isbn 1111 (canonical)                 |
//! | E    | book      | Twin Title             | isbn 2222 (canonical)                 |
//! | F    | monograph | Loose Ends             | two DOIs, neither canonical           |
//!
//! [`FailingStore`] wraps the same catalog behind an unreachable backend.

#![allow(dead_code)]

use std::sync::Arc;

use identifier_translator::{
    CandidateRow, Filters, InMemoryWorkStore, NewIdentifier, NewWork, StoreError, Translator,
    UriParts, WorkRow, WorkSelection, WorkStore,
};
use uuid::Uuid;

pub const WORK_A: &str = "aaaaaaaa-0000-4000-8000-000000000001";
pub const WORK_B: &str = "bbbbbbbb-0000-4000-8000-000000000002";
pub const WORK_C: &str = "cccccccc-0000-4000-8000-000000000003";
pub const WORK_D: &str = "dddddddd-0000-4000-8000-000000000004";
pub const WORK_E: &str = "eeeeeeee-0000-4000-8000-000000000005";
pub const WORK_F: &str = "ffffffff-0000-4000-8000-000000000006";

pub fn id(work: &str) -> Uuid {
    Uuid::parse_str(work).unwrap()
}

fn doi(value: &str) -> UriParts {
    UriParts::new("info:doi", value)
}

fn isbn(value: &str) -> UriParts {
    UriParts::new("urn:isbn", value)
}

pub fn catalog() -> InMemoryWorkStore {
    InMemoryWorkStore::new()
        .with_work(
            id(WORK_A),
            "monograph",
            ["The Open Book"],
            [
                (doi("10.11647/obp.0001"), true),
                (isbn("9781783740000"), false),
                (
                    UriParts::new("https", "www.openbookpublishers.com/product/1"),
                    false,
                ),
            ],
        )
        .with_work(
            id(WORK_B),
            "monograph",
            ["The Open Book Reader"],
            [(isbn("9781783740017"), true)],
        )
        .with_work(
            id(WORK_C),
            "chapter",
            ["Chapter One"],
            [(doi("10.11647/obp.0001.01"), true)],
        )
        .with_work(id(WORK_D), "monograph", ["Twin Title"], [(isbn("1111"), true)])
        .with_work(id(WORK_E), "book", ["Twin Title"], [(isbn("2222"), true)])
        .with_work(
            id(WORK_F),
            "monograph",
            ["Loose Ends"],
            [(doi("10.1/loose.1"), false), (doi("10.1/loose.2"), false)],
        )
        .with_relation(id(WORK_A), id(WORK_C))
        .with_work_type("pamphlet-series")
        .with_scheme("tag")
}

pub fn translator() -> Translator {
    Translator::new(Arc::new(catalog()))
}

pub fn failing_translator(store: FailingStore) -> Translator {
    Translator::new(Arc::new(store))
}

// =============================================================================
// Failing backend
// =============================================================================

/// Store over the shared catalog whose backend is unreachable, either for
/// every call or only for relation lookups
pub struct FailingStore {
    catalog: InMemoryWorkStore,
    relations_only: bool,
}

impl FailingStore {
    pub fn everywhere() -> Self {
        Self {
            catalog: catalog(),
            relations_only: false,
        }
    }

    pub fn on_relations() -> Self {
        Self {
            catalog: catalog(),
            relations_only: true,
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.relations_only {
            Ok(())
        } else {
            Err(outage())
        }
    }
}

fn outage() -> StoreError {
    StoreError::Backend("connection refused by postgres://translator:secret@db".to_string())
}

#[async_trait::async_trait]
impl WorkStore for FailingStore {
    async fn find_by_uri(
        &self,
        scheme: &str,
        value: &str,
        filters: &Filters,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        self.check()?;
        self.catalog.find_by_uri(scheme, value, filters).await
    }

    async fn find_by_title(
        &self,
        title: &str,
        filters: &Filters,
        uri: Option<&UriParts>,
    ) -> Result<Vec<CandidateRow>, StoreError> {
        self.check()?;
        self.catalog.find_by_title(title, filters, uri).await
    }

    async fn find_works(&self, selection: &WorkSelection) -> Result<Vec<WorkRow>, StoreError> {
        self.check()?;
        self.catalog.find_works(selection).await
    }

    async fn children(&self, _work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Err(outage())
    }

    async fn parents(&self, _work_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        Err(outage())
    }

    async fn work_exists(&self, work_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        self.catalog.work_exists(work_id).await
    }

    async fn type_exists(&self, work_type: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.catalog.type_exists(work_type).await
    }

    async fn scheme_exists(&self, scheme: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.catalog.scheme_exists(scheme).await
    }

    async fn work_types(&self) -> Result<Vec<String>, StoreError> {
        self.check()?;
        self.catalog.work_types().await
    }

    async fn insert_work(&self, work: &NewWork) -> Result<(), StoreError> {
        self.check()?;
        self.catalog.insert_work(work).await
    }

    async fn add_titles(&self, work_id: Uuid, titles: &[String]) -> Result<(), StoreError> {
        self.check()?;
        self.catalog.add_titles(work_id, titles).await
    }

    async fn add_uri(&self, work_id: Uuid, identifier: &NewIdentifier) -> Result<(), StoreError> {
        self.check()?;
        self.catalog.add_uri(work_id, identifier).await
    }

    async fn add_relation(&self, parent: Uuid, child: Uuid) -> Result<(), StoreError> {
        self.check()?;
        self.catalog.add_relation(parent, child).await
    }

    async fn delete_work(&self, work_id: Uuid) -> Result<bool, StoreError> {
        self.check()?;
        self.catalog.delete_work(work_id).await
    }
}
