//! Translator service
//!
//! Orchestrates a request end to end: parse parameters, normalize, ask the
//! store, then resolve or aggregate. Transport code only has to turn the
//! result into a response.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::aggregate::{aggregate, sort_by_letters, sort_works};
use crate::error::{ReferenceKind, Result, TranslatorError};
use crate::filters::{Filters, SortOrder};
use crate::model::{Identifier, NewIdentifier, NewWork, Work, WorkTypeEntry};
use crate::resolver::{resolve, ResolutionMode};
use crate::store::{StoreError, WorkSelection, WorkStore};
use crate::uri::normalize;

/// Parameters of a translation query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateRequest {
    #[serde(default, alias = "URI", skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<String>,
}

impl TranslateRequest {
    pub fn by_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = Some("true".to_string());
        self
    }

    pub fn mode(&self) -> ResolutionMode {
        ResolutionMode::from_strict(matches!(self.strict.as_deref(), Some("true" | "True")))
    }
}

/// Parameters of a work listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorksRequest {
    #[serde(default, alias = "UUID", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// A single value or a list of them
///
/// `Many` is tried first; a derived struct would otherwise accept an empty
/// list as a struct with every field defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// One URI of a work being created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUriRequest {
    #[serde(default, alias = "URI")]
    pub uri: Option<String>,
    /// `true`, `"true"` or `"True"`; anything else is false
    #[serde(default)]
    pub canonical: Option<Value>,
}

impl NewUriRequest {
    pub fn is_canonical(&self) -> bool {
        canonical_flag(self.canonical.as_ref())
    }
}

fn canonical_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => matches!(flag.as_str(), "true" | "True"),
        _ => false,
    }
}

/// Body of a work creation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewWorkRequest {
    #[serde(default, rename = "type")]
    pub work_type: Option<String>,
    #[serde(default)]
    pub title: Option<OneOrMany<String>>,
    #[serde(default, alias = "URI")]
    pub uri: Option<OneOrMany<NewUriRequest>>,
    #[serde(default)]
    pub parent: Option<OneOrMany<String>>,
    #[serde(default)]
    pub child: Option<OneOrMany<String>>,
}

/// Parameters naming one work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkIdRequest {
    #[serde(default, alias = "UUID", skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
}

/// Body of a request adding titles to a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddTitlesRequest {
    #[serde(default, alias = "UUID")]
    pub uuid: Option<String>,
    #[serde(default)]
    pub title: Option<OneOrMany<String>>,
}

/// Body of a request adding a URI to a work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddUriRequest {
    #[serde(default, alias = "UUID")]
    pub uuid: Option<String>,
    #[serde(default, alias = "URI")]
    pub uri: Option<String>,
    #[serde(default)]
    pub canonical: Option<Value>,
}

/// Body of a request linking a parent work to a child work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRelationRequest {
    #[serde(default, alias = "parent_UUID")]
    pub parent_uuid: Option<String>,
    #[serde(default, alias = "child_UUID")]
    pub child_uuid: Option<String>,
}

/// Parameters of the work type listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTypesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<String>,
}

/// Entry point for translation and for reading and editing works
#[derive(Clone)]
pub struct Translator {
    store: Arc<dyn WorkStore>,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator").finish_non_exhaustive()
    }
}

fn store_failure(err: StoreError) -> TranslatorError {
    error!("Store failure: {}", err);
    TranslatorError::Store(err)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn non_blank(titles: Option<OneOrMany<String>>) -> Vec<String> {
    titles
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .collect()
}

impl Translator {
    pub fn new(store: Arc<dyn WorkStore>) -> Self {
        Self { store }
    }

    /// Translate a URI or title into identifiers.
    ///
    /// With a URI only, every URI of the owning work is returned. With a
    /// title, works are matched by title; a URI given alongside restricts
    /// the match to works owning it.
    pub async fn translate(&self, request: &TranslateRequest) -> Result<Vec<Identifier>> {
        debug!(?request, "Translate");
        let uri = non_empty(&request.uri);
        let title = non_empty(&request.title);
        let filters = Filters::parse(request.filter.as_deref())?;

        let rows = match (uri, title) {
            (None, None) => {
                return Err(TranslatorError::BadParams(
                    "Invalid URI or title provided".to_string(),
                ))
            }
            (Some(uri), None) => {
                let parts = normalize(uri)?;
                self.store
                    .find_by_uri(&parts.scheme, &parts.value, &filters)
                    .await
                    .map_err(store_failure)?
            }
            (uri, Some(title)) => {
                let parts = uri.map(normalize).transpose()?;
                self.store
                    .find_by_title(title, &filters, parts.as_ref())
                    .await
                    .map_err(store_failure)?
            }
        };

        resolve(rows, request.mode())
    }

    /// List works, or a single work with its relatives when `uuid` is set
    pub async fn works(&self, request: &WorksRequest) -> Result<Vec<Work>> {
        debug!(?request, "List works");
        if let Some(candidate) = non_empty(&request.uuid) {
            let work_id = Uuid::parse_str(candidate)
                .map_err(|_| TranslatorError::not_found(ReferenceKind::Work, candidate))?;
            return Ok(vec![self.work(work_id).await?]);
        }

        let filters = Filters::parse(request.filter.as_deref())?;
        let order = SortOrder::parse(request.sort.as_deref(), request.order.as_deref())?;
        let rows = self
            .store
            .find_works(&WorkSelection::filtered(filters))
            .await
            .map_err(store_failure)?;

        let mut works = aggregate(rows, false, self.store.as_ref()).await?;
        if works.is_empty() {
            return Err(TranslatorError::NoResult);
        }
        if let Some(order) = order {
            sort_works(&mut works, order);
        }
        Ok(works)
    }

    /// One work with parents and children attached
    pub async fn work(&self, work_id: Uuid) -> Result<Work> {
        self.load(work_id, true).await
    }

    async fn load(&self, work_id: Uuid, include_relatives: bool) -> Result<Work> {
        let rows = self
            .store
            .find_works(&WorkSelection::by_id(work_id))
            .await
            .map_err(store_failure)?;
        aggregate(rows, include_relatives, self.store.as_ref())
            .await?
            .into_iter()
            .next()
            .ok_or(TranslatorError::NoResult)
    }

    /// Registered work types, optionally sorted by name
    pub async fn work_types(&self, request: &WorkTypesRequest) -> Result<Vec<WorkTypeEntry>> {
        let order = SortOrder::parse_work_types(request.sort.as_deref(), request.order.as_deref())?;
        let mut types: Vec<WorkTypeEntry> = self
            .store
            .work_types()
            .await
            .map_err(store_failure)?
            .into_iter()
            .map(|work_type| WorkTypeEntry { work_type })
            .collect();

        if types.is_empty() {
            return Err(TranslatorError::NoResult);
        }
        if let Some(order) = order {
            sort_by_letters(&mut types, order.descending, |entry| entry.work_type.as_str());
        }
        Ok(types)
    }

    /// Validate and persist a new work, returning it as stored
    pub async fn create_work(&self, request: NewWorkRequest) -> Result<Work> {
        let work = self.validate(request).await?;
        self.store
            .insert_work(&work)
            .await
            .map_err(store_failure)?;
        info!(work_id = %work.id, work_type = %work.work_type, "Created work");
        self.work(work.id).await
    }

    /// Remove a work and its links
    pub async fn delete_work(&self, request: &WorkIdRequest) -> Result<()> {
        let Some(candidate) = non_empty(&request.uuid) else {
            return Err(TranslatorError::BadParams(
                "You must provide a (work) UUID".to_string(),
            ));
        };
        let work_id = self.existing_work(candidate).await?;

        self.store
            .delete_work(work_id)
            .await
            .map_err(store_failure)?;
        info!(%work_id, "Deleted work");
        Ok(())
    }

    /// Attach titles to an existing work, returning it with its titles and URIs
    pub async fn add_titles(&self, request: AddTitlesRequest) -> Result<Work> {
        let titles = non_blank(request.title);
        let (Some(candidate), false) = (non_empty(&request.uuid), titles.is_empty()) else {
            return Err(TranslatorError::BadParams(
                "You must provide a (work) UUID and at least a title".to_string(),
            ));
        };
        let work_id = self.existing_work(candidate).await?;

        self.store
            .add_titles(work_id, &titles)
            .await
            .map_err(store_failure)?;
        info!(%work_id, count = titles.len(), "Added titles");
        self.load(work_id, false).await
    }

    /// Attach a URI to an existing work, returning it with its titles and URIs
    pub async fn add_uri(&self, request: AddUriRequest) -> Result<Work> {
        let (Some(candidate), Some(uri)) = (non_empty(&request.uuid), non_empty(&request.uri))
        else {
            return Err(TranslatorError::BadParams(
                "You must provide a (work) UUID and a URI".to_string(),
            ));
        };
        let parts = normalize(uri)?;
        self.ensure_scheme(&parts.scheme).await?;
        let work_id = self.existing_work(candidate).await?;

        let identifier = NewIdentifier {
            parts,
            canonical: canonical_flag(request.canonical.as_ref()),
        };
        self.store
            .add_uri(work_id, &identifier)
            .await
            .map_err(store_failure)?;
        info!(%work_id, uri = %identifier.parts.to_uri(), "Added URI");
        self.load(work_id, false).await
    }

    /// Link two existing works, returning the parent with its relatives
    pub async fn add_relation(&self, request: &AddRelationRequest) -> Result<Work> {
        let (Some(parent), Some(child)) = (
            non_empty(&request.parent_uuid),
            non_empty(&request.child_uuid),
        ) else {
            return Err(TranslatorError::BadParams(
                "You must provide a parent and a child UUID".to_string(),
            ));
        };
        let parent = self.find_work_id(parent).await?.ok_or_else(|| {
            TranslatorError::BadParams("Invalid parent UUID provided.".to_string())
        })?;
        let child = self.find_work_id(child).await?.ok_or_else(|| {
            TranslatorError::BadParams("Invalid child UUID provided.".to_string())
        })?;

        self.store
            .add_relation(parent, child)
            .await
            .map_err(store_failure)?;
        info!(%parent, %child, "Added work relation");
        self.work(parent).await
    }

    async fn validate(&self, request: NewWorkRequest) -> Result<NewWork> {
        let work_type = non_empty(&request.work_type).map(str::to_string);
        let titles = non_blank(request.title);
        let uris = request.uri.map(OneOrMany::into_vec).unwrap_or_default();

        let (Some(work_type), false, false) = (work_type, titles.is_empty(), uris.is_empty())
        else {
            return Err(TranslatorError::BadParams(
                "You must provide a (work) type, a title, and at least one URI".to_string(),
            ));
        };

        if !self
            .store
            .type_exists(&work_type)
            .await
            .map_err(store_failure)?
        {
            return Err(TranslatorError::not_found(ReferenceKind::WorkType, work_type));
        }

        let mut identifiers = Vec::with_capacity(uris.len());
        for uri in &uris {
            let parts = normalize(uri.uri.as_deref().unwrap_or_default())?;
            self.ensure_scheme(&parts.scheme).await?;
            identifiers.push(NewIdentifier {
                parts,
                canonical: uri.is_canonical(),
            });
        }

        let parents = self
            .existing_works(request.parent.map(OneOrMany::into_vec).unwrap_or_default())
            .await?;
        let children = self
            .existing_works(request.child.map(OneOrMany::into_vec).unwrap_or_default())
            .await?;

        Ok(NewWork {
            id: Uuid::new_v4(),
            work_type,
            titles,
            identifiers,
            parents,
            children,
        })
    }

    async fn ensure_scheme(&self, scheme: &str) -> Result<()> {
        if self
            .store
            .scheme_exists(scheme)
            .await
            .map_err(store_failure)?
        {
            Ok(())
        } else {
            Err(TranslatorError::not_found(ReferenceKind::UriScheme, scheme))
        }
    }

    /// `None` when `candidate` is not a UUID or names no stored work
    async fn find_work_id(&self, candidate: &str) -> Result<Option<Uuid>> {
        if !self
            .store
            .uuid_exists(candidate)
            .await
            .map_err(store_failure)?
        {
            return Ok(None);
        }
        Ok(Uuid::parse_str(candidate.trim()).ok())
    }

    async fn existing_work(&self, candidate: &str) -> Result<Uuid> {
        self.find_work_id(candidate)
            .await?
            .ok_or_else(|| TranslatorError::not_found(ReferenceKind::Work, candidate))
    }

    async fn existing_works(&self, candidates: Vec<String>) -> Result<Vec<Uuid>> {
        let mut ids = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            ids.push(self.existing_work(candidate).await?);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_flag_accepts_both_spellings() {
        assert_eq!(TranslateRequest::by_uri("x").mode(), ResolutionMode::Indulgent);
        assert_eq!(TranslateRequest::by_uri("x").strict().mode(), ResolutionMode::Strict);

        let mut request = TranslateRequest::by_title("x");
        request.strict = Some("True".into());
        assert_eq!(request.mode(), ResolutionMode::Strict);
        request.strict = Some("yes".into());
        assert_eq!(request.mode(), ResolutionMode::Indulgent);
    }

    #[test]
    fn work_body_accepts_strings_or_lists() {
        let body: NewWorkRequest = serde_json::from_value(serde_json::json!({
            "type": "monograph",
            "title": "A Single Title",
            "URI": [{"URI": "urn:isbn:9781783740000", "canonical": "True"}],
            "parent": ["aaaaaaaa-0000-4000-8000-000000000001"],
            "child": "bbbbbbbb-0000-4000-8000-000000000002"
        }))
        .unwrap();

        assert_eq!(body.title.unwrap().into_vec(), vec!["A Single Title"]);
        let uris = body.uri.unwrap().into_vec();
        assert_eq!(uris.len(), 1);
        assert!(uris[0].is_canonical());
        assert_eq!(body.parent.unwrap().into_vec().len(), 1);
        assert_eq!(body.child.unwrap().into_vec().len(), 1);
    }

    #[test]
    fn empty_uri_list_stays_empty() {
        let body: NewWorkRequest =
            serde_json::from_value(serde_json::json!({"type": "book", "uri": []})).unwrap();

        assert_eq!(body.uri.map(OneOrMany::into_vec), Some(vec![]));
    }

    #[test]
    fn canonical_flag_defaults_to_false() {
        let uri: NewUriRequest =
            serde_json::from_value(serde_json::json!({"uri": "info:doi:10.1/x"})).unwrap();
        assert!(!uri.is_canonical());

        let uri: NewUriRequest =
            serde_json::from_value(serde_json::json!({"uri": "info:doi:10.1/x", "canonical": true}))
                .unwrap();
        assert!(uri.is_canonical());
    }
}
