//! Identifier and work entity model
//!
//! Rows coming back from the store ([`CandidateRow`], [`WorkRow`]) are flat
//! tuples; [`Identifier`] and [`Work`] are the shapes handed back to callers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::uri::{denormalize, UriParts};

/// Back-reference from an identifier to the work that owns it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkRef {
    #[serde(rename = "UUID")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub work_type: String,
}

/// One `(scheme, value)` URI, optionally bound to a work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "URI_parts")]
    pub parts: UriParts,
    pub canonical: bool,
    /// Match rank, 0 is an exact or URI match
    pub score: u32,
    /// Full URI rebuilt from `parts`
    #[serde(rename = "URI")]
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkRef>,
}

impl Identifier {
    pub fn new(parts: UriParts, canonical: bool, score: u32, work: Option<WorkRef>) -> Self {
        let uri = denormalize(&parts.scheme, &parts.value);
        Self {
            parts,
            canonical,
            score,
            uri,
            work,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical
    }
}

/// De-duplication key for a work's URIs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriEntry {
    pub scheme: String,
    pub value: String,
    pub canonical: bool,
}

impl From<UriEntry> for Identifier {
    fn from(entry: UriEntry) -> Self {
        Identifier::new(UriParts::new(entry.scheme, entry.value), entry.canonical, 0, None)
    }
}

/// Aggregate of everything known about one work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Work {
    #[serde(rename = "UUID")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub work_type: String,
    #[serde(rename = "title")]
    pub titles: Vec<String>,
    #[serde(rename = "URI")]
    pub identifiers: Vec<Identifier>,
    /// Present only when relation expansion was requested
    #[serde(rename = "parent", skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<Uuid>>,
    #[serde(rename = "child", skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Uuid>>,
}

impl Work {
    pub fn first_title(&self) -> Option<&str> {
        self.titles.first().map(String::as_str)
    }
}

/// One registered work type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTypeEntry {
    pub work_type: String,
}

/// Candidate row returned by the URI and title lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub work_id: Uuid,
    pub work_type: String,
    pub uri_scheme: String,
    pub uri_value: String,
    pub canonical: bool,
    pub score: u32,
}

impl CandidateRow {
    pub fn work_ref(&self) -> WorkRef {
        WorkRef {
            id: self.work_id,
            work_type: self.work_type.clone(),
        }
    }

    pub fn to_identifier(&self) -> Identifier {
        Identifier::new(
            UriParts::new(self.uri_scheme.clone(), self.uri_value.clone()),
            self.canonical,
            self.score,
            Some(self.work_ref()),
        )
    }
}

/// One row of the work × title × URI join.
///
/// The join is a left join, so a work without titles or URIs still yields a
/// row with the missing side absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRow {
    pub work_id: Uuid,
    pub work_type: String,
    pub title: Option<String>,
    pub uri_scheme: Option<String>,
    pub uri_value: Option<String>,
    pub canonical: Option<bool>,
}

impl WorkRow {
    pub fn uri_entry(&self) -> Option<UriEntry> {
        match (&self.uri_scheme, &self.uri_value) {
            (Some(scheme), Some(value)) => Some(UriEntry {
                scheme: scheme.clone(),
                value: value.clone(),
                canonical: self.canonical.unwrap_or(false),
            }),
            _ => None,
        }
    }
}

/// A URI submitted for a new work, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentifier {
    pub parts: UriParts,
    pub canonical: bool,
}

/// A validated work ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWork {
    pub id: Uuid,
    pub work_type: String,
    pub titles: Vec<String>,
    pub identifiers: Vec<NewIdentifier>,
    pub parents: Vec<Uuid>,
    pub children: Vec<Uuid>,
}
