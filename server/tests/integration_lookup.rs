use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use tempfile::tempdir;
use textindex_core::{open_index_at, AnalyzerSettings, PostingStore};
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) -> Router {
    let index = open_index_at(dir, &AnalyzerSettings::default()).unwrap();
    index.add("photos/park.jpg", "Dogs must be kept on a leash").unwrap();
    index.add("photos/cafe.jpg", "Dogs welcome, cats too").unwrap();
    index.mark_empty("photos/sky.jpg").unwrap();
    server::build_app(Arc::new(index))
}

async fn call(app: Router, uri: &str) -> (StatusCode, Value) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn lookup_intersects_words() {
    let dir = tempdir().unwrap();
    let app = build_tiny_index(dir.path());

    let (status, json) = call(app.clone(), "/lookup?q=dog").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 2);

    let (status, json) = call(app, "/lookup?q=dogs%20cats").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["doc_id"], "photos/cafe.jpg");
    assert_eq!(arr[0]["text"], "Dogs welcome, cats too");
}

#[tokio::test]
async fn empty_query_has_no_hits() {
    let dir = tempdir().unwrap();
    let app = build_tiny_index(dir.path());
    let (status, json) = call(app, "/lookup?q=").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn doc_reports_state() {
    let dir = tempdir().unwrap();
    let app = build_tiny_index(dir.path());

    let (status, json) = call(app.clone(), "/doc/photos/sky.jpg").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "processed_no_text");
    assert_eq!(json["text"], "");

    let (status, _) = call(app, "/doc/photos/unknown.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn orphan_posting_is_a_server_error() {
    let dir = tempdir().unwrap();
    let index = open_index_at(dir.path(), &AnalyzerSettings::default()).unwrap();
    index.add("photos/park.jpg", "Dogs must be kept on a leash").unwrap();
    index.postings().add_member("ghost", "photos/missing.jpg").unwrap();
    let app = server::build_app(Arc::new(index));

    let (status, _) = call(app.clone(), "/lookup?q=ghost").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let (status, json) = call(app, "/lookup?q=leash").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 1);
}
