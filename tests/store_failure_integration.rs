//! Backend outages must reach the caller as opaque store failures

mod helpers;

use helpers::{failing_translator, id, FailingStore, WORK_A};
use identifier_translator::{
    AddRelationRequest, ErrorKind, TranslateRequest, TranslatorError, WorkIdRequest,
    WorkTypesRequest, WorksRequest,
};

fn assert_opaque_store_failure(err: TranslatorError) {
    assert_eq!(err.kind(), ErrorKind::StoreFailure);
    assert_eq!(err.kind().http_status(), 500);
    assert_eq!(err.description(), "");
    assert!(err.candidates().is_empty());
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn uri_lookup_outage_is_a_store_failure() {
    let err = failing_translator(FailingStore::everywhere())
        .translate(&TranslateRequest::by_uri("info:doi:10.11647/obp.0001"))
        .await
        .unwrap_err();

    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn title_lookup_outage_is_a_store_failure() {
    let err = failing_translator(FailingStore::everywhere())
        .translate(&TranslateRequest::by_title("The Open Book").strict())
        .await
        .unwrap_err();

    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn listing_outage_is_a_store_failure() {
    let err = failing_translator(FailingStore::everywhere())
        .works(&WorksRequest::default())
        .await
        .unwrap_err();

    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn single_work_outage_is_a_store_failure() {
    let err = failing_translator(FailingStore::everywhere())
        .work(id(WORK_A))
        .await
        .unwrap_err();

    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn relation_lookup_outage_fails_the_whole_work() {
    let translator = failing_translator(FailingStore::on_relations());

    // listings skip relatives and still succeed
    let works = translator.works(&WorksRequest::default()).await.unwrap();
    assert_eq!(works.len(), 6);

    let err = translator.work(id(WORK_A)).await.unwrap_err();
    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn work_type_listing_outage_is_a_store_failure() {
    let err = failing_translator(FailingStore::everywhere())
        .work_types(&WorkTypesRequest::default())
        .await
        .unwrap_err();

    assert_opaque_store_failure(err);
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn existence_check_outage_is_not_reported_as_unknown_work() {
    let translator = failing_translator(FailingStore::everywhere());

    let err = translator
        .delete_work(&WorkIdRequest {
            uuid: Some(WORK_A.to_string()),
        })
        .await
        .unwrap_err();
    assert_opaque_store_failure(err);

    let err = translator
        .add_relation(&AddRelationRequest {
            parent_uuid: Some(WORK_A.to_string()),
            child_uuid: Some(WORK_A.to_string()),
        })
        .await
        .unwrap_err();
    assert_opaque_store_failure(err);
}

#[tokio::test]
async fn store_failure_message_hides_backend_detail() {
    let err = failing_translator(FailingStore::everywhere())
        .works(&WorksRequest::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind().message(), "Something terrible has happened.");
    assert!(!err.description().contains("secret"));
}
