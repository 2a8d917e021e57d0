//! Routes of the development file server.
//!
//! - `GET  /healthz`, `GET /readyz`: probes
//! - `GET  /{bucket}/{*key}`: download object
//! - `HEAD /{bucket}/{*key}`: headers only
//!
//! The wildcard `*key` allows nested keys like `avatars/2025/me.png`.
//! Combined with `--public-url http://host:port/{bucket}`, URLs produced by
//! the adapter resolve against this server.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        object_handlers::{get_object, head_object},
    },
    services::disk_store::DiskObjectStore,
};
use axum::{Router, routing::get};

pub fn routes() -> Router<DiskObjectStore> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/{bucket}/{*key}", get(get_object).head(head_object))
}
