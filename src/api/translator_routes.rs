//! Translator HTTP endpoints
//!
//! ## Endpoints
//!
//! - `GET /translate` - Translate a URI or title into identifiers
//! - `GET /works` - List works, or one work with its relatives
//! - `POST /works` - Create a work
//! - `DELETE /works` - Delete a work
//! - `POST /titles` - Add titles to a work
//! - `POST /uris` - Add a URI to a work
//! - `POST /work_relations` - Link a parent work to a child work
//! - `GET /work_types` - List work types
//!
//! Every other route answers with a 404 envelope; other methods on known
//! routes answer 405.

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post, MethodRouter},
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{ErrorEnvelope, SuccessEnvelope};
use crate::error::{ErrorKind, TranslatorError};
use crate::model::{Identifier, Work, WorkTypeEntry};
use crate::service::{
    AddRelationRequest, AddTitlesRequest, AddUriRequest, NewWorkRequest, TranslateRequest,
    Translator, WorkIdRequest, WorkTypesRequest, WorksRequest,
};

// ============================================================================
// Errors
// ============================================================================

/// A failed request together with the parameters it was called with
#[derive(Debug)]
pub struct ApiError {
    envelope: ErrorEnvelope,
}

impl ApiError {
    fn new(error: TranslatorError, parameters: Value) -> Self {
        if error.kind() == ErrorKind::StoreFailure {
            tracing::error!("Request failed: {}", error);
        } else {
            tracing::debug!("Request rejected: {}", error);
        }
        Self {
            envelope: ErrorEnvelope::from_error(&error, parameters),
        }
    }

    fn from_envelope(envelope: ErrorEnvelope) -> Self {
        Self { envelope }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.envelope)).into_response()
    }
}

type ApiResult<T> = Result<Json<SuccessEnvelope<T>>, ApiError>;

fn parameters<T: serde::Serialize>(params: &T) -> Value {
    serde_json::to_value(params).unwrap_or(Value::Null)
}

fn respond<T>(result: crate::error::Result<Vec<T>>, params: Value) -> ApiResult<T> {
    result
        .and_then(SuccessEnvelope::new)
        .map(Json)
        .map_err(|e| ApiError::new(e, params))
}

/// Unwrap query parameters, answering malformed ones with a JSON envelope
fn query_params<T>(query: Result<Query<T>, QueryRejection>, uri: &Uri) -> Result<T, ApiError> {
    query.map(|Query(params)| params).map_err(|rejection| {
        ApiError::new(
            TranslatorError::BadParams(rejection.body_text()),
            Value::String(uri.query().unwrap_or_default().to_string()),
        )
    })
}

/// Parse a JSON body, keeping the raw payload as the echoed parameters
fn json_body<T: DeserializeOwned>(body: &str) -> Result<(T, Value), ApiError> {
    let params =
        serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string()));
    match serde_json::from_str(body) {
        Ok(request) => Ok((request, params)),
        Err(e) => Err(ApiError::new(
            TranslatorError::BadParams(format!("Invalid request body: {e}")),
            params,
        )),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /translate
///
/// ## Query Parameters
///
/// - `uri` / `URI`: URI to translate
/// - `title`: title to look up
/// - `filter`: e.g. `work_type:monograph,uri_scheme:urn:isbn`
/// - `strict`: `true` to require a single answer
async fn translate(
    State(translator): State<Arc<Translator>>,
    uri: Uri,
    query: Result<Query<TranslateRequest>, QueryRejection>,
) -> ApiResult<Identifier> {
    let request = query_params(query, &uri)?;
    let result = translator.translate(&request).await;
    respond(result, parameters(&request))
}

/// GET /works
///
/// ## Query Parameters
///
/// - `uuid` / `UUID`: a single work, relatives included
/// - `filter`, `sort` (`title`), `order` (`asc` | `desc`)
async fn list_works(
    State(translator): State<Arc<Translator>>,
    uri: Uri,
    query: Result<Query<WorksRequest>, QueryRejection>,
) -> ApiResult<Work> {
    let request = query_params(query, &uri)?;
    let result = translator.works(&request).await;
    respond(result, parameters(&request))
}

/// POST /works
///
/// Body: `{"type", "title", "uri": [{"uri", "canonical"}], "parent", "child"}`;
/// `title`, `parent` and `child` take a string or a list.
async fn create_work(State(translator): State<Arc<Translator>>, body: String) -> ApiResult<Work> {
    let (request, params) = json_body::<NewWorkRequest>(&body)?;
    let result = translator.create_work(request).await.map(|work| vec![work]);
    respond(result, params)
}

/// DELETE /works?uuid=
async fn delete_work(
    State(translator): State<Arc<Translator>>,
    uri: Uri,
    query: Result<Query<WorkIdRequest>, QueryRejection>,
) -> ApiResult<Work> {
    let request = query_params(query, &uri)?;
    match translator.delete_work(&request).await {
        Ok(()) => Ok(Json(SuccessEnvelope::empty())),
        Err(e) => Err(ApiError::new(e, parameters(&request))),
    }
}

/// POST /titles
///
/// Body: `{"uuid", "title"}`; `title` takes a string or a list.
async fn add_titles(State(translator): State<Arc<Translator>>, body: String) -> ApiResult<Work> {
    let (request, params) = json_body::<AddTitlesRequest>(&body)?;
    let result = translator.add_titles(request).await.map(|work| vec![work]);
    respond(result, params)
}

/// POST /uris
///
/// Body: `{"uuid", "uri", "canonical"}`
async fn add_uri(State(translator): State<Arc<Translator>>, body: String) -> ApiResult<Work> {
    let (request, params) = json_body::<AddUriRequest>(&body)?;
    let result = translator.add_uri(request).await.map(|work| vec![work]);
    respond(result, params)
}

/// POST /work_relations
///
/// Body: `{"parent_uuid", "child_uuid"}`
async fn add_relation(State(translator): State<Arc<Translator>>, body: String) -> ApiResult<Work> {
    let (request, params) = json_body::<AddRelationRequest>(&body)?;
    let result = translator.add_relation(&request).await.map(|work| vec![work]);
    respond(result, params)
}

/// GET /work_types
///
/// ## Query Parameters
///
/// - `sort` (`work_type`), `order` (`asc` | `desc`)
async fn list_work_types(
    State(translator): State<Arc<Translator>>,
    uri: Uri,
    query: Result<Query<WorkTypesRequest>, QueryRejection>,
) -> ApiResult<WorkTypeEntry> {
    let request = query_params(query, &uri)?;
    let result = translator.work_types(&request).await;
    respond(result, parameters(&request))
}

async fn not_allowed(uri: Uri) -> ApiError {
    ApiError::from_envelope(ErrorEnvelope::not_allowed(Value::String(uri.to_string())))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::from_envelope(ErrorEnvelope::not_found(Value::String(uri.to_string())))
}

// ============================================================================
// Router
// ============================================================================

type TranslatorRoutes = Router<Arc<Translator>>;

/// Mount `methods` on `path` with and without a trailing slash
fn mount(
    router: TranslatorRoutes,
    path: &str,
    methods: MethodRouter<Arc<Translator>>,
) -> TranslatorRoutes {
    router
        .route(path, methods.clone())
        .route(&format!("{path}/"), methods)
}

/// Create the translator router
pub fn create_translator_router(translator: Arc<Translator>) -> Router {
    let read_only = |methods: MethodRouter<Arc<Translator>>| {
        methods.post(not_allowed).put(not_allowed).delete(not_allowed)
    };
    let write_only = |methods: MethodRouter<Arc<Translator>>| {
        methods.get(not_allowed).put(not_allowed).delete(not_allowed)
    };

    let router = Router::new();
    let router = mount(router, "/translate", read_only(get(translate)));
    let router = mount(
        router,
        "/works",
        get(list_works)
            .post(create_work)
            .delete(delete_work)
            .put(not_allowed),
    );
    let router = mount(router, "/titles", write_only(post(add_titles)));
    let router = mount(router, "/uris", write_only(post(add_uri)));
    let router = mount(router, "/work_relations", write_only(post(add_relation)));
    let router = mount(router, "/work_types", read_only(get(list_work_types)));

    router.fallback(not_found).with_state(translator)
}
