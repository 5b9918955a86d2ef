//! DMS HTTP adapter against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrivener::adapters::dms::{DmsClient, DmsClientConfig};
use scrivener::domain::errors::CoreError;
use scrivener::domain::models::EntityKind;
use scrivener::domain::ports::DocumentStore;

fn client(server: &MockServer) -> DmsClient {
    DmsClient::new(DmsClientConfig::new(server.uri(), "test-token")).unwrap()
}

fn doc_json(id: i64, tags: Vec<i64>) -> serde_json::Value {
    json!({
        "id": id,
        "title": format!("doc {id}"),
        "correspondent": null,
        "document_type": null,
        "tags": tags,
        "custom_fields": [],
        "content": "text",
        "created": null
    })
}

fn page(results: Vec<serde_json::Value>, next: Option<String>) -> serde_json::Value {
    json!({ "count": results.len(), "next": next, "previous": null, "results": results })
}

#[tokio::test]
async fn get_document_sends_token_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/17/"))
        .and(header("Authorization", "Token test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(17, vec![1, 2])))
        .mount(&server)
        .await;

    let doc = client(&server).get_document(17).await.unwrap();
    assert_eq!(doc.id, 17);
    assert_eq!(doc.tags, vec![1, 2]);
}

#[tokio::test]
async fn missing_document_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let error = client(&server).get_document(404).await.unwrap_err();
    assert!(matches!(error, CoreError::NotFound(_)));
}

#[tokio::test]
async fn server_errors_map_to_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/1/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let error = client(&server).get_document(1).await.unwrap_err();
    assert!(matches!(error, CoreError::Transport { .. }));
}

/// Case-insensitive lookup reuses the existing entity with its canonical
/// casing; nothing is created.
#[tokio::test]
async fn get_or_create_tag_reuses_case_insensitively() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 12, "name": "Invoices", "color": "#ff0000" })],
            None,
        )))
        .mount(&server)
        .await;

    let tag = client(&server).get_or_create_tag("invoices").await.unwrap();
    assert_eq!(tag.id, 12);
    assert_eq!(tag.name, "Invoices");
}

#[tokio::test]
async fn get_or_create_tag_creates_on_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/tags/"))
        .and(body_partial_json(json!({ "name": "Warranty" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 99, "name": "Warranty" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tag = client(&server).get_or_create_tag("Warranty").await.unwrap();
    assert_eq!(tag.id, 99);
}

/// The transition rewrites the tag set in a single PATCH: `from` out,
/// `to` in.
#[tokio::test]
async fn transition_tag_patches_once() {
    let server = MockServer::start().await;
    // Tag lookups: to = processed (id 8), from = tags_done (id 7).
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "llm:processed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 8, "name": "llm:processed" })],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "llm:tags-done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 7, "name": "llm:tags-done" })],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(1, vec![7, 3])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/1/"))
        .and(body_partial_json(json!({ "tags": [3, 8] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(1, vec![3, 8])))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .transition_tag(1, "llm:tags-done", "llm:processed")
        .await
        .unwrap();
}

/// Already in the target state: no write happens at all.
#[tokio::test]
async fn transition_tag_noops_when_already_there() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "llm:processed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 8, "name": "llm:processed" })],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "llm:tags-done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(vec![], None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(1, vec![8])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(1, vec![8])))
        .expect(0)
        .mount(&server)
        .await;

    client(&server)
        .transition_tag(1, "llm:tags-done", "llm:processed")
        .await
        .unwrap();
}

/// Paginated listings follow the `next` link to exhaustion.
#[tokio::test]
async fn list_tags_follows_next_links() {
    let server = MockServer::start().await;
    let page_two_url = format!("{}/api/tags/?page_size=100&page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 2, "name": "B" })],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 1, "name": "A" })],
            Some(page_two_url),
        )))
        .mount(&server)
        .await;

    let tags = client(&server).list_tags().await.unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "A");
    assert_eq!(tags[1].name, "B");
}

/// Merging reassigns every referring document, then deletes the source.
#[tokio::test]
async fn merge_entities_reassigns_then_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(query_param("correspondent", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![doc_json(10, vec![]), doc_json(11, vec![])],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/10/"))
        .and(body_partial_json(json!({ "correspondent": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(10, vec![])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/documents/11/"))
        .and(body_partial_json(json!({ "correspondent": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(doc_json(11, vec![])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/correspondents/2/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let moved = client(&server)
        .merge_entities(EntityKind::Correspondent, 2, 1)
        .await
        .unwrap();
    assert_eq!(moved, 2);
}

#[tokio::test]
async fn count_by_tag_uses_page_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags/"))
        .and(query_param("name__iexact", "Invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            vec![json!({ "id": 4, "name": "Invoices" })],
            None,
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(query_param("tags__id", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 37,
            "next": null,
            "previous": null,
            "results": [doc_json(1, vec![4])]
        })))
        .mount(&server)
        .await;

    let count = client(&server).count_by_tag("Invoices").await.unwrap();
    assert_eq!(count, 37);
}
