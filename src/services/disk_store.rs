//! DiskObjectStore: an `ObjectStoreClient` that keeps objects on local disk.
//!
//! Payloads are sharded beneath `base_path/{bucket}/{shard}/{shard}/{key}`,
//! metadata lives in a JSON sidecar under `base_path/{bucket}/.meta/`. Buckets
//! are created on first write. Meant for development and tests, where a real
//! S3 endpoint is not available.

use crate::{
    config::{METADATA_PARAM_PREFIX, UploadParams},
    errors::ClientError,
    models::object::ObjectMetadata,
    services::client::{DeleteObjectOutput, ObjectStoreClient, PutObjectOutput, PutObjectRequest},
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};
use uuid::Uuid;

const MAX_OBJECT_KEY_LEN: usize = 1024;
const BUCKET_NAME_MIN_LEN: usize = 3;
const BUCKET_NAME_MAX_LEN: usize = 63;
const META_DIR: &str = ".meta";

pub type StoreResult<T> = Result<T, ClientError>;

#[derive(Clone, Debug)]
pub struct DiskObjectStore {
    /// Base directory on disk where buckets are stored.
    pub base_path: PathBuf,
}

impl DiskObjectStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Rejects keys that begin with `/`, contain `..` or control characters.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        let invalid = key.is_empty()
            || key.len() > MAX_OBJECT_KEY_LEN
            || key.starts_with('/')
            || key.split('/').any(|segment| segment == "..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if invalid {
            return Err(ClientError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    /// Validate bucket name format.
    ///
    /// Enforces S3-like naming rules:
    /// - 3–63 characters
    /// - lowercase letters, digits, dots, hyphens only
    /// - cannot start/end with dot or hyphen
    /// - cannot contain consecutive dots or dot-hyphen patterns
    /// - cannot look like an IPv4 address
    fn ensure_bucket_name_safe(&self, name: &str) -> StoreResult<()> {
        let reject = |reason: &str| {
            Err(ClientError::InvalidBucket {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };

        let len = name.len();
        if !(BUCKET_NAME_MIN_LEN..=BUCKET_NAME_MAX_LEN).contains(&len) {
            return reject("must be between 3 and 63 characters");
        }
        if !name
            .chars()
            .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '.' | '-'))
        {
            return reject("allowed characters are lowercase letters, digits, dots, and hyphens");
        }
        if name.starts_with(['.', '-']) || name.ends_with(['.', '-']) {
            return reject("must start and end with a lowercase letter or digit");
        }
        if name.contains("..") || name.contains("-.") || name.contains(".-") {
            return reject("cannot contain consecutive dots or dot-hyphen combinations");
        }
        if is_ipv4_like(name) {
            return reject("must not be formatted like an IP address");
        }
        Ok(())
    }

    fn bucket_root(&self, bucket: &str) -> PathBuf {
        self.base_path.join(bucket)
    }

    /// Two-level shard identifiers from MD5(bucket/key).
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, key);
        let mut path = self.bucket_root(bucket);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    fn meta_path(&self, bucket: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(bucket, key);
        let mut path = self.bucket_root(bucket);
        path.push(META_DIR);
        path.push(shard_a);
        path.push(shard_b);
        path.push(format!("{key}.json"));
        path
    }

    fn validate(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.ensure_bucket_name_safe(bucket)?;
        self.ensure_key_safe(key)
    }

    /// Stream an object to disk and record its metadata.
    ///
    /// Bytes go to a temporary file first; the MD5 etag and size are computed
    /// while streaming, then the file is synced and renamed into place.
    /// Existing objects are overwritten. When `expected_len` is given and the
    /// stream yields a different number of bytes, nothing is stored and an
    /// existing object is left untouched.
    pub async fn put_stream<S>(
        &self,
        bucket: &str,
        key: &str,
        content_type: Option<String>,
        params: &UploadParams,
        expected_len: Option<u64>,
        stream: S,
    ) -> StoreResult<ObjectMetadata>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.validate(bucket, key)?;

        let file_path = self.object_path(bucket, key);
        let parent = parent_dir(&file_path)?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let (size, etag) = match write_stream(&tmp_path, stream).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ClientError::Io(err));
            }
        };

        if let Some(declared) = expected_len.filter(|declared| *declared != size) {
            let _ = fs::remove_file(&tmp_path).await;
            prune_empty_dirs(&parent, &self.bucket_root(bucket)).await;
            debug!(declared, written = size, "content length mismatch");
            return Err(ClientError::LengthMismatch {
                declared,
                written: size,
            });
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ClientError::Io(err));
            }
        }

        let metadata = ObjectMetadata {
            key: key.to_string(),
            content_type,
            content_length: Some(size),
            etag: Some(format!("\"{etag}\"")),
            last_modified: Some(Utc::now()),
            metadata: params
                .iter()
                .filter_map(|(name, value)| {
                    name.strip_prefix(METADATA_PARAM_PREFIX)
                        .map(|meta| (meta.to_string(), value.clone()))
                })
                .collect(),
        };

        if let Err(err) = self.write_metadata(bucket, key, &metadata).await {
            let _ = fs::remove_file(&file_path).await;
            return Err(err);
        }

        Ok(metadata)
    }

    async fn write_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: &ObjectMetadata,
    ) -> StoreResult<()> {
        let meta_path = self.meta_path(bucket, key);
        let parent = parent_dir(&meta_path)?;
        fs::create_dir_all(&parent).await?;

        let json = serde_json::to_vec_pretty(metadata).map_err(io::Error::other)?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &meta_path).await?;
        Ok(())
    }

    /// Fetch only object metadata.
    pub async fn read_metadata(&self, bucket: &str, key: &str) -> StoreResult<ObjectMetadata> {
        self.validate(bucket, key)?;
        let raw = fs::read(self.meta_path(bucket, key))
            .await
            .map_err(|err| not_found_or_io(err, bucket, key))?;
        serde_json::from_slice(&raw).map_err(|err| ClientError::Io(io::Error::other(err)))
    }

    /// Metadata plus an open handle for streaming the payload out.
    pub async fn open_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> StoreResult<(ObjectMetadata, File)> {
        let metadata = self.read_metadata(bucket, key).await?;
        let file = File::open(self.object_path(bucket, key))
            .await
            .map_err(|err| not_found_or_io(err, bucket, key))?;
        Ok((metadata, file))
    }

    /// Remove payload and metadata. Missing objects are not an error.
    pub async fn remove_object(&self, bucket: &str, key: &str) -> StoreResult<()> {
        self.validate(bucket, key)?;
        let bucket_root = self.bucket_root(bucket);

        for path in [self.object_path(bucket, key), self.meta_path(bucket, key)] {
            match fs::remove_file(&path).await {
                Ok(_) => debug!("removed {}", path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    debug!("{} already missing", path.display());
                }
                Err(err) => return Err(ClientError::Io(err)),
            }
            if let Some(parent) = path.parent() {
                prune_empty_dirs(parent, &bucket_root).await;
            }
        }
        Ok(())
    }

    /// Write, read back and delete a probe file under `base_path`.
    pub async fn probe(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read_back = fs::read(&tmp_path).await;
        let removed = fs::remove_file(&tmp_path).await;
        if read_back? != b"readyz" {
            return Err(io::Error::other("file content mismatch"));
        }
        removed
    }
}

#[async_trait]
impl ObjectStoreClient for DiskObjectStore {
    #[instrument(skip(self, request), fields(bucket = %request.bucket, key = %request.key))]
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, ClientError> {
        let stream = ReaderStream::new(request.body);
        let metadata = self
            .put_stream(
                &request.bucket,
                &request.key,
                Some(request.content_type),
                &request.params,
                Some(request.content_length),
                stream,
            )
            .await?;
        Ok(PutObjectOutput {
            etag: metadata.etag,
        })
    }

    #[instrument(skip(self))]
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<DeleteObjectOutput, ClientError> {
        self.remove_object(bucket, key).await?;
        Ok(DeleteObjectOutput { status: 204 })
    }

    #[instrument(skip(self))]
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ClientError> {
        self.read_metadata(bucket, key).await
    }
}

async fn write_stream<S>(path: &Path, stream: S) -> io::Result<(u64, String)>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    let mut file = File::create(path).await?;
    let mut size: u64 = 0;
    let mut digest = Context::new();
    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        size += chunk.len() as u64;
        digest.consume(&chunk);
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok((size, format!("{:x}", digest.compute())))
}

fn parent_dir(path: &Path) -> StoreResult<PathBuf> {
    path.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ClientError::Io(io::Error::other("object path missing parent directory")))
}

fn not_found_or_io(err: io::Error, bucket: &str, key: &str) -> ClientError {
    if err.kind() == ErrorKind::NotFound {
        ClientError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    } else {
        ClientError::Io(err)
    }
}

/// Remove empty directories from `start` upwards, stopping below `stop`.
async fn prune_empty_dirs(start: &Path, stop: &Path) {
    let mut current = start.to_path_buf();
    while current.starts_with(stop) && current != stop {
        match fs::remove_dir(&current).await {
            Ok(_) => match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            },
            Err(err) if err.kind() == ErrorKind::NotFound => break,
            Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
            Err(err) => {
                debug!("failed to prune directory {}: {}", current.display(), err);
                break;
            }
        }
    }
}

/// Check if a string matches IPv4-like dotted decimal form.
fn is_ipv4_like(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() == 4
        && parts.iter().all(|segment| {
            !segment.is_empty()
                && segment.len() <= 3
                && segment.chars().all(|c| c.is_ascii_digit())
                && segment.parse::<u8>().is_ok()
        })
}
