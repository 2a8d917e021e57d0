//! StorageAdapter: stores host-framework files in an object store.
//!
//! The adapter maps a [`FileDescriptor`] to a bucket and object key and
//! performs exactly one store call per operation (plus one existence check
//! per name attempt when overwriting is disabled). It holds no mutable
//! state, so one instance can serve concurrent requests.

use crate::{
    config::{AdapterConfig, PublicUrl, S3Options},
    errors::{AdapterError, AdapterResult, ConfigError},
    models::{file::FileDescriptor, object::ObjectMetadata, schema::Schema},
    paths,
    services::{
        client::{ObjectStoreClient, PutObjectRequest},
        s3_client::S3ObjectClient,
    },
};
use std::sync::Arc;
use tokio::fs::File;
use tracing::{debug, info, instrument};

/// How many names are tried before an upload with `overwrite = false` gives up.
pub const MAX_NAME_ATTEMPTS: u32 = 10;

#[derive(Clone)]
pub struct StorageAdapter {
    config: Arc<AdapterConfig>,
    schema: Schema,
    client: Arc<dyn ObjectStoreClient>,
}

impl StorageAdapter {
    /// Resolve `options` and build an adapter on top of `client`.
    ///
    /// Fails when credentials or the bucket are missing, the path is not
    /// absolute, or an upload parameter collides with one the adapter sets.
    pub fn new(
        options: S3Options,
        schema: Schema,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Result<Self, ConfigError> {
        let config = AdapterConfig::resolve(options)?;
        Ok(Self::from_config(config, schema, client))
    }

    /// Build an adapter talking to S3 with the resolved options.
    pub fn connect_s3(options: S3Options, schema: Schema) -> Result<Self, ConfigError> {
        let config = AdapterConfig::resolve(options)?;
        let client = Arc::new(S3ObjectClient::new(&config));
        Ok(Self::from_config(config, schema, client))
    }

    pub fn from_config(
        config: AdapterConfig,
        schema: Schema,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Self {
        debug!(?config, "storage adapter configured");
        Self {
            config: Arc::new(config),
            schema,
            client,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The extra fields the host persists for each file.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The prefix a file lives under: its own `path`, else the configured one.
    fn path_prefix(&self, file: &FileDescriptor) -> String {
        match file.path.as_deref() {
            Some(path) if !path.is_empty() => paths::ensure_leading_slash(path),
            _ => self.config.path.clone(),
        }
    }

    fn bucket_for<'a>(&'a self, file: &'a FileDescriptor) -> &'a str {
        file.bucket.as_deref().unwrap_or(&self.config.bucket)
    }

    /// Absolute, encoded store path of `filename` under `prefix`.
    fn store_path(prefix: &str, filename: &str) -> String {
        paths::encode_special_chars(&paths::resolve(prefix, filename))
    }

    /// Absolute, encoded store path of a file.
    pub fn resolve_filename(&self, file: &FileDescriptor) -> String {
        Self::store_path(&self.path_prefix(file), file.stored_name())
    }

    /// Upload the file and annotate it with filename, etag, path and bucket.
    #[instrument(skip(self, file), fields(original_name = %file.original_name))]
    pub async fn upload_file(&self, mut file: FileDescriptor) -> AdapterResult<FileDescriptor> {
        let prefix = self.path_prefix(&file);
        let filename = self.generate_filename(&file, &prefix).await?;
        let key = paths::object_key(&Self::store_path(&prefix, &filename)).to_string();

        let body = File::open(file.local_path())
            .await
            .map_err(|source| AdapterError::Source {
                path: file.local_path.clone(),
                source,
            })?;

        debug!(%filename, %key, "uploading file");
        let output = self
            .client
            .put_object(PutObjectRequest {
                bucket: self.config.bucket.clone(),
                key,
                body,
                content_type: file.mimetype.clone(),
                content_length: file.size,
                params: self.config.upload_params.clone(),
            })
            .await
            .map_err(AdapterError::store("putObject"))?;

        file.filename = Some(filename);
        file.etag = output.etag;
        file.path = Some(prefix);
        file.bucket = Some(self.config.bucket.clone());

        info!(filename = ?file.filename, "file upload successful");
        Ok(file)
    }

    async fn generate_filename(&self, file: &FileDescriptor, prefix: &str) -> AdapterResult<String> {
        let generator = &self.config.generate_filename;
        if self.config.overwrite {
            return generator
                .generate(file, 0)
                .await
                .map_err(AdapterError::FilenameGeneration);
        }

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = generator
                .generate(file, attempt)
                .await
                .map_err(AdapterError::FilenameGeneration)?;
            let key = Self::store_path(prefix, &filename);
            if self.head(&self.config.bucket, paths::object_key(&key)).await?.is_none() {
                return Ok(filename);
            }
            debug!(%filename, attempt, "filename taken");
        }
        Err(AdapterError::NameAttemptsExhausted {
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// Public URL of a stored file. Performs no I/O.
    ///
    /// The URL is only fetchable when the bucket or object is publicly
    /// readable.
    pub fn file_url(&self, file: &FileDescriptor) -> String {
        let resolved = self.resolve_filename(file);
        match &self.config.public_url {
            Some(PublicUrl::Prefix(prefix)) => {
                format!("{}{}", prefix.trim_end_matches('/'), resolved)
            }
            Some(PublicUrl::Resolver(resolve)) => {
                let mut annotated = file.clone();
                annotated.path = Some(self.path_prefix(file));
                annotated.bucket = Some(self.bucket_for(file).to_string());
                resolve(&annotated)
            }
            None => self.default_url(self.bucket_for(file), &resolved),
        }
    }

    fn default_url(&self, bucket: &str, resolved: &str) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        if self.config.force_path_style {
            return format!("{endpoint}/{bucket}{resolved}");
        }
        let (scheme, host) = endpoint.split_once("://").unwrap_or(("https", endpoint));
        format!("{scheme}://{bucket}.{host}{resolved}")
    }

    /// Delete a stored file from its bucket.
    #[instrument(skip(self, file), fields(filename = ?file.filename))]
    pub async fn remove_file(&self, file: &FileDescriptor) -> AdapterResult<()> {
        let resolved = self.resolve_filename(file);
        let key = paths::object_key(&resolved);
        let bucket = self.bucket_for(file);

        let output = self
            .client
            .delete_object(bucket, key)
            .await
            .map_err(AdapterError::store("deleteObject"))?;

        // Deletes answer 204, some stores answer 200.
        match output.status {
            200 | 204 => {
                info!(%bucket, %key, "file removed");
                Ok(())
            }
            status => Err(AdapterError::UnexpectedStatus {
                operation: "deleteObject",
                status,
            }),
        }
    }

    /// Metadata of `filename` under the configured path and bucket, or `None`
    /// when no such object exists.
    ///
    /// Not atomic with a later upload: another writer may create the object
    /// in between.
    #[instrument(skip(self))]
    pub async fn file_exists(&self, filename: &str) -> AdapterResult<Option<ObjectMetadata>> {
        let resolved = Self::store_path(&self.config.path, filename);
        self.head(&self.config.bucket, paths::object_key(&resolved))
            .await
    }

    async fn head(&self, bucket: &str, key: &str) -> AdapterResult<Option<ObjectMetadata>> {
        match self.client.head_object(bucket, key).await {
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(AdapterError::Store {
                operation: "headObject",
                source: err,
            }),
        }
    }
}
