//! Store files uploaded through a content-management host in an
//! S3-compatible object store.
//!
//! The host hands a [`FileDescriptor`] to [`StorageAdapter::upload_file`],
//! which streams the local bytes to the store and writes the stored filename,
//! etag, path and bucket back onto the descriptor. The same descriptor later
//! yields a public URL ([`StorageAdapter::file_url`]) or removes the object
//! ([`StorageAdapter::remove_file`]).
//!
//! ```no_run
//! use s3_file_adapter::{FileDescriptor, S3Options, Schema, StorageAdapter};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = S3Options {
//!     bucket: Some("uploads".into()),
//!     path: Some("/avatars".into()),
//!     ..S3Options::default()
//! }
//! .or(S3Options::from_env()?);
//! let adapter = StorageAdapter::connect_s3(options, Schema::default())?;
//!
//! let file = FileDescriptor::new("/tmp/upload-1234", "me.png", "image/png", 5120);
//! let stored = adapter.upload_file(file).await?;
//! println!("{}", adapter.file_url(&stored));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod naming;
pub mod paths;
pub mod routes;
pub mod services;

pub use config::{AdapterConfig, PublicUrl, S3Options};
pub use errors::{AdapterError, AdapterResult, ClientError, ConfigError};
pub use models::{
    file::FileDescriptor,
    object::ObjectMetadata,
    schema::{COMPATIBILITY_LEVEL, Schema, SchemaField},
};
pub use naming::FilenameGenerator;
pub use services::{
    client::ObjectStoreClient, disk_store::DiskObjectStore, s3_client::S3ObjectClient,
    storage_adapter::StorageAdapter,
};
