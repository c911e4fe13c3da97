//! Error handling for the identifier translator
//!
//! Every failure the core can produce is a [`TranslatorError`]. The
//! resolution failures (`Ambiguous`, `NonCanonical`) keep the full candidate
//! set so callers can render a diagnostic instead of a bare status.

use std::fmt;

use thiserror::Error;

use crate::model::Identifier;
use crate::store::StoreError;

/// Main error type for translation and work lookups
#[derive(Error, Debug)]
pub enum TranslatorError {
    #[error("Invalid URI '{input}'")]
    InvalidUri { input: String },

    #[error("No records have matched your search criteria")]
    NoResult,

    #[error("More than one work share the lowest search score ({} candidates)", candidates.len())]
    Ambiguous { candidates: Vec<Identifier> },

    #[error("There is no canonical URI for the fittest candidate ({} candidates)", candidates.len())]
    NonCanonical { candidates: Vec<Identifier> },

    #[error("Unknown {kind} '{id}'")]
    NotFound { kind: ReferenceKind, id: String },

    #[error("Invalid parameters: {0}")]
    BadParams(String),

    #[error("Invalid filters: {0}")]
    BadFilters(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

/// What a referential `NotFound` was looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Work,
    WorkType,
    UriScheme,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReferenceKind::Work => "work",
            ReferenceKind::WorkType => "work type",
            ReferenceKind::UriScheme => "URI scheme",
        };
        f.write_str(label)
    }
}

/// Fieldless classification of a [`TranslatorError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidUri,
    NoResult,
    Ambiguous,
    NonCanonical,
    NotFound,
    BadParams,
    BadFilters,
    StoreFailure,
}

impl ErrorKind {
    /// HTTP status code the transport layer should answer with
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::InvalidUri
            | ErrorKind::NotFound
            | ErrorKind::BadParams
            | ErrorKind::BadFilters => 400,
            ErrorKind::NoResult | ErrorKind::Ambiguous | ErrorKind::NonCanonical => 404,
            ErrorKind::StoreFailure => 500,
        }
    }

    /// Stable, user-facing message for this kind
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::InvalidUri | ErrorKind::NotFound | ErrorKind::BadParams => {
                "Invalid parameters provided."
            }
            ErrorKind::BadFilters => "Invalid filters supplied.",
            ErrorKind::NoResult => "No records have matched your search criteria.",
            ErrorKind::Ambiguous => "More than one work share the lowest search score.",
            ErrorKind::NonCanonical => "There is no canonical URI for the fittest candidate.",
            ErrorKind::StoreFailure => "Something terrible has happened.",
        }
    }
}

impl TranslatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslatorError::InvalidUri { .. } => ErrorKind::InvalidUri,
            TranslatorError::NoResult => ErrorKind::NoResult,
            TranslatorError::Ambiguous { .. } => ErrorKind::Ambiguous,
            TranslatorError::NonCanonical { .. } => ErrorKind::NonCanonical,
            TranslatorError::NotFound { .. } => ErrorKind::NotFound,
            TranslatorError::BadParams(_) => ErrorKind::BadParams,
            TranslatorError::BadFilters(_) => ErrorKind::BadFilters,
            TranslatorError::Store(_) => ErrorKind::StoreFailure,
        }
    }

    /// Candidate set attached to a resolution failure, empty otherwise
    pub fn candidates(&self) -> &[Identifier] {
        match self {
            TranslatorError::Ambiguous { candidates }
            | TranslatorError::NonCanonical { candidates } => candidates,
            _ => &[],
        }
    }

    /// Detail safe to show to a caller. Store failures stay opaque.
    pub fn description(&self) -> String {
        match self {
            TranslatorError::Store(_) | TranslatorError::NoResult => String::new(),
            TranslatorError::Ambiguous { .. } | TranslatorError::NonCanonical { .. } => {
                String::new()
            }
            TranslatorError::BadParams(detail) | TranslatorError::BadFilters(detail) => {
                detail.clone()
            }
            other => other.to_string(),
        }
    }

    pub(crate) fn not_found(kind: ReferenceKind, id: impl Into<String>) -> Self {
        TranslatorError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TranslatorError>;
