//! Request filters and sorting
//!
//! Filters arrive as a comma separated list of `field:value` pairs, e.g.
//! `work_type:monograph,uri_scheme:urn:isbn,canonical:true`. Only the first
//! colon splits, so scheme values may carry their own namespace colon. A comma
//! right after a `.xxx` top level domain belongs to a tag URI
//! (`tag:example.com,2009`) and does not separate entries.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TranslatorError};

const WORK_TYPE_FIELD: &str = "work_type";
const URI_SCHEME_FIELD: &str = "uri_scheme";
const CANONICAL_FIELD: &str = "canonical";

/// Restrictions applied to store lookups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    /// Only works of these types (any type when empty)
    pub work_types: Vec<String>,
    /// Only URIs with these schemes (any scheme when empty)
    pub uri_schemes: Vec<String>,
    /// Only URIs whose canonical flag is listed (any flag when empty)
    pub canonical: Vec<bool>,
}

impl Filters {
    /// Parse an optional filter string. Absent or blank input means no filters.
    pub fn parse(input: Option<&str>) -> Result<Self> {
        let mut filters = Filters::default();
        let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(filters);
        };

        for entry in split_entries(input) {
            let unknown = || TranslatorError::BadFilters(format!("Unknown filter '{entry}'"));
            let (field, value) = entry.split_once(':').ok_or_else(unknown)?;
            let value = value.trim();
            if value.is_empty() {
                return Err(unknown());
            }
            match field.trim() {
                WORK_TYPE_FIELD => filters.work_types.push(value.to_string()),
                URI_SCHEME_FIELD => filters.uri_schemes.push(value.to_lowercase()),
                CANONICAL_FIELD => filters.canonical.push(matches!(value, "true" | "True")),
                _ => return Err(unknown()),
            }
        }

        Ok(filters)
    }

    pub fn is_empty(&self) -> bool {
        self.work_types.is_empty() && self.uri_schemes.is_empty() && self.canonical.is_empty()
    }

    pub fn allows_work_type(&self, work_type: &str) -> bool {
        self.work_types.is_empty() || self.work_types.iter().any(|t| t == work_type)
    }

    pub fn allows_scheme(&self, scheme: &str) -> bool {
        self.uri_schemes.is_empty() || self.uri_schemes.iter().any(|s| s == scheme)
    }

    pub fn allows_canonical(&self, canonical: bool) -> bool {
        self.canonical.is_empty() || self.canonical.contains(&canonical)
    }

    /// Scheme and canonical restrictions together
    pub fn allows_uri(&self, scheme: &str, canonical: bool) -> bool {
        self.allows_scheme(scheme) && self.allows_canonical(canonical)
    }

    /// Whether any restriction applies to a work's URIs
    pub fn restricts_uris(&self) -> bool {
        !self.uri_schemes.is_empty() || !self.canonical.is_empty()
    }
}

/// Split on commas, except one that directly follows a `.` and three
/// lowercase letters.
fn split_entries(input: &str) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut entries = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b != b',' {
            continue;
        }
        let after_tld = i >= 4
            && bytes[i - 4] == b'.'
            && bytes[i - 3..i].iter().all(u8::is_ascii_lowercase);
        if !after_tld {
            entries.push(&input[start..i]);
            start = i + 1;
        }
    }
    entries.push(&input[start..]);
    entries
}

/// Field a work listing can be sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    WorkType,
}

/// Requested ordering of a work listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub key: SortKey,
    pub descending: bool,
}

impl SortOrder {
    /// Parse `sort` / `order` parameters of a work listing. No `sort` means
    /// store order.
    pub fn parse(sort: Option<&str>, order: Option<&str>) -> Result<Option<Self>> {
        Self::parse_with(sort, order, |name| (name == "title").then_some(SortKey::Title))
    }

    /// Same as [`SortOrder::parse`] for the work type listing
    pub fn parse_work_types(sort: Option<&str>, order: Option<&str>) -> Result<Option<Self>> {
        Self::parse_with(sort, order, |name| {
            (name == "work_type").then_some(SortKey::WorkType)
        })
    }

    fn parse_with(
        sort: Option<&str>,
        order: Option<&str>,
        key_for: impl Fn(&str) -> Option<SortKey>,
    ) -> Result<Option<Self>> {
        let Some(sort) = sort.filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        let order = order.unwrap_or("asc");
        let unknown =
            || TranslatorError::BadFilters(format!("Unknown sort '{sort}' '{order}'"));

        let Some(key) = key_for(sort) else {
            return Err(unknown());
        };
        let descending = match order {
            "asc" => false,
            "desc" => true,
            _ => return Err(unknown()),
        };

        Ok(Some(SortOrder { key, descending }))
    }
}
