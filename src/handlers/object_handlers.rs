//! HTTP handlers publishing objects from the disk store.
//! Streams object bodies to avoid buffering in memory.

use crate::{
    errors::AppError, models::object::ObjectMetadata, paths,
    services::disk_store::DiskObjectStore,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// Download an object `/{bucket}/{*key}` as a streaming response.
pub async fn get_object(
    State(store): State<DiskObjectStore>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (meta, file) = store.open_object(&bucket, &stored_key(&key)).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// HEAD `/{bucket}/{*key}`: same headers as GET but no body.
pub async fn head_object(
    State(store): State<DiskObjectStore>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let meta = store.read_metadata(&bucket, &stored_key(&key)).await?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;
    set_object_headers(response.headers_mut(), &meta);
    Ok(response)
}

/// The router hands us a percent-decoded key; stored keys keep the encoding
/// applied at upload time.
fn stored_key(decoded: &str) -> String {
    paths::encode_special_chars(decoded)
}

fn set_object_headers(headers: &mut HeaderMap, meta: &ObjectMetadata) {
    let content_type = meta
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(length) = meta.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    if let Some(value) = meta
        .etag
        .as_deref()
        .and_then(|etag| HeaderValue::from_str(etag).ok())
    {
        headers.insert(header::ETAG, value);
    }

    if let Some(value) = meta
        .last_modified
        .and_then(|ts| HeaderValue::from_str(&ts.to_rfc2822()).ok())
    {
        headers.insert(header::LAST_MODIFIED, value);
    }

    for (name, value) in &meta.metadata {
        let header_name = format!("x-amz-meta-{}", name.to_ascii_lowercase());
        if let (Ok(name), Ok(value)) = (
            header::HeaderName::from_bytes(header_name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
}
