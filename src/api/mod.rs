//! REST API surface
//!
//! The JSON envelopes live here and are always compiled; the axum routes
//! need the `server` feature.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TranslatorError;
use crate::model::Identifier;

#[cfg(feature = "server")]
pub mod translator_routes;

#[cfg(feature = "server")]
pub use translator_routes::create_translator_router;

pub const ROUTES_ONLY_MESSAGE: &str = "The only routes allowed are '/translate', '/works', \
     '/titles', '/uris', '/work_types' and '/work_relations'";

/// Successful response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    pub status: String,
    pub code: u16,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> SuccessEnvelope<T> {
    /// Wrap a result set. An empty set is reported as `NoResult`.
    pub fn new(data: Vec<T>) -> Result<Self, TranslatorError> {
        if data.is_empty() {
            return Err(TranslatorError::NoResult);
        }
        Ok(Self {
            status: "ok".to_string(),
            code: 200,
            count: data.len(),
            data,
        })
    }

    /// Acknowledge a write that has nothing to return
    pub fn empty() -> Self {
        Self {
            status: "ok".to_string(),
            code: 200,
            count: 0,
            data: Vec::new(),
        }
    }
}

/// Failure response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: String,
    pub code: u16,
    pub message: String,
    pub description: String,
    /// The request parameters as received
    pub parameters: Value,
    pub count: usize,
    /// Candidate set of an ambiguous or non-canonical resolution
    pub data: Vec<Identifier>,
}

impl ErrorEnvelope {
    pub fn new(code: u16, message: &str, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            status: "error".to_string(),
            code,
            message: message.to_string(),
            description: description.into(),
            parameters,
            count: 0,
            data: Vec::new(),
        }
    }

    pub fn from_error(err: &TranslatorError, parameters: Value) -> Self {
        let kind = err.kind();
        let data = err.candidates().to_vec();
        Self {
            count: data.len(),
            data,
            ..Self::new(kind.http_status(), kind.message(), err.description(), parameters)
        }
    }

    pub fn not_found(parameters: Value) -> Self {
        Self::new(404, "Not Found.", ROUTES_ONLY_MESSAGE, parameters)
    }

    pub fn not_allowed(parameters: Value) -> Self {
        Self::new(405, "Not Allowed.", "", parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CandidateRow;
    use uuid::Uuid;

    #[test]
    fn empty_success_is_no_result() {
        let err = SuccessEnvelope::<Identifier>::new(vec![]).unwrap_err();
        assert!(matches!(err, TranslatorError::NoResult));
    }

    #[test]
    fn success_counts_data() {
        let envelope = SuccessEnvelope::new(vec![1, 2, 3]).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["count"], 3);
    }

    #[test]
    fn empty_acknowledgement_is_ok() {
        let json = serde_json::to_value(SuccessEnvelope::<Identifier>::empty()).unwrap();

        assert_eq!(json["code"], 200);
        assert_eq!(json["count"], 0);
        assert_eq!(json["data"], serde_json::json!([]));
    }

    #[test]
    fn ambiguous_error_carries_candidates() {
        let row = CandidateRow {
            work_id: Uuid::nil(),
            work_type: "monograph".into(),
            uri_scheme: "urn:isbn".into(),
            uri_value: "1".into(),
            canonical: true,
            score: 0,
        };
        let err = TranslatorError::Ambiguous {
            candidates: vec![row.to_identifier()],
        };

        let envelope = ErrorEnvelope::from_error(&err, serde_json::json!({"title": "x"}));

        assert_eq!(envelope.code, 404);
        assert_eq!(envelope.message, "More than one work share the lowest search score.");
        assert_eq!(envelope.count, 1);
        assert_eq!(envelope.parameters["title"], "x");
    }

    #[test]
    fn store_failure_envelope_is_opaque() {
        let err = TranslatorError::from(crate::store::StoreError::Backend("secret dsn".into()));

        let envelope = ErrorEnvelope::from_error(&err, Value::Null);

        assert_eq!(envelope.code, 500);
        assert_eq!(envelope.message, "Something terrible has happened.");
        assert!(envelope.description.is_empty());
    }
}
