//! Development file server routes.

mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{fixture_path, options};
use s3_file_adapter::{
    DiskObjectStore, FileDescriptor, S3Options, Schema, StorageAdapter, naming::OriginalFilename,
    routes,
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

async fn store_with_file(dir: &TempDir, original_name: &str) -> DiskObjectStore {
    let store = DiskObjectStore::new(dir.path());
    let adapter = StorageAdapter::new(
        S3Options {
            generate_filename: Some(Arc::new(OriginalFilename)),
            ..options()
        },
        Schema::default(),
        Arc::new(store.clone()),
    )
    .unwrap();
    adapter
        .upload_file(FileDescriptor::new(fixture_path(), original_name, "text/plain", 18))
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn healthz_is_ok() {
    let dir = TempDir::new().unwrap();
    let app = routes::routes().with_state(DiskObjectStore::new(dir.path()));

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn readyz_checks_the_store_directory() {
    let dir = TempDir::new().unwrap();
    let app = routes::routes().with_state(DiskObjectStore::new(dir.path().join("data")));

    let response = app
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_serves_uploaded_object() {
    let dir = TempDir::new().unwrap();
    let store = store_with_file(&dir, "test-file.txt").await;
    let app = routes::routes().with_state(store);

    let response = app
        .oneshot(
            Request::get("/bucket/test-file.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert!(response.headers().contains_key(header::ETAG));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"Hello from a test\n");
}

#[tokio::test]
async fn get_resolves_encoded_urls() {
    let dir = TempDir::new().unwrap();
    let store = store_with_file(&dir, "hello world.txt").await;
    let app = routes::routes().with_state(store);

    let response = app
        .oneshot(
            Request::get("/bucket/hello%20world.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn head_returns_headers_only() {
    let dir = TempDir::new().unwrap();
    let store = store_with_file(&dir, "test-file.txt").await;
    let app = routes::routes().with_state(store);

    let response = app
        .oneshot(
            Request::head("/bucket/test-file.txt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "18");
}

#[tokio::test]
async fn missing_object_is_404() {
    let dir = TempDir::new().unwrap();
    let app = routes::routes().with_state(DiskObjectStore::new(dir.path()));

    let response = app
        .oneshot(Request::get("/bucket/nope.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
