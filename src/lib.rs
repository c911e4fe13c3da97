//! Identifier Translator
//!
//! Resolves external identifiers (DOIs, ISBNs, web URLs) and free-text
//! titles to canonical work records, and translates between the URIs a work
//! is known by.
//!
//! ## Flow
//! Request -> URI normalization -> store lookup -> resolution (translate)
//! or aggregation (works listing)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use identifier_translator::{InMemoryWorkStore, TranslateRequest, Translator, UriParts};
//! use uuid::Uuid;
//!
//! # async fn run() -> identifier_translator::Result<()> {
//! let store = InMemoryWorkStore::new().with_work(
//!     Uuid::new_v4(),
//!     "monograph",
//!     ["Open Access Publishing"],
//!     [(UriParts::new("info:doi", "10.11647/obp.0001"), true)],
//! );
//! let translator = Translator::new(Arc::new(store));
//!
//! let identifiers = translator
//!     .translate(&TranslateRequest::by_title("open access publishing").strict())
//!     .await?;
//! assert_eq!(identifiers[0].uri, "info:doi:10.11647/obp.0001");
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// URI normalization and the entity model
pub mod model;
pub mod uri;

// Request filters and sorting
pub mod filters;

// Candidate resolution and work aggregation
pub mod aggregate;
pub mod resolver;

// Storage gateway (Postgres backend behind the `database` feature)
pub mod store;

// Orchestration
pub mod service;

// Ambient wiring
pub mod config;
pub mod telemetry;

// JSON envelopes, plus axum routes behind the `server` feature
pub mod api;

pub use aggregate::{aggregate, aggregate_rows, sort_by_letters, sort_works, WorkAggregator};
pub use config::{ConfigError, DatabaseConfig, TranslatorConfig};
pub use error::{ErrorKind, ReferenceKind, Result, TranslatorError};
pub use filters::{Filters, SortKey, SortOrder};
pub use model::{
    CandidateRow, Identifier, NewIdentifier, NewWork, UriEntry, Work, WorkRef, WorkRow,
    WorkTypeEntry,
};
pub use resolver::{resolve, ResolutionMode};
pub use service::{
    AddRelationRequest, AddTitlesRequest, AddUriRequest, NewUriRequest, NewWorkRequest, OneOrMany,
    TranslateRequest, Translator, WorkIdRequest, WorkTypesRequest, WorksRequest,
};
pub use store::{InMemoryWorkStore, StoreError, WorkSelection, WorkStore};
pub use uri::{denormalize, normalize, UriParts};

#[cfg(feature = "database")]
pub use store::PgWorkStore;

#[cfg(feature = "server")]
pub use api::create_translator_router;
