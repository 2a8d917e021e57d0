//! Represents an uploaded file as exchanged with the host framework.

use crate::models::schema::{Schema, SchemaField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// An uploaded file.
///
/// The host creates the descriptor before upload. The adapter writes back
/// `filename`, `etag`, `path` and `bucket`; the host then decides which of
/// those to persist (see [`FileDescriptor::to_record`]).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FileDescriptor {
    /// Temporary location of the source bytes on the local filesystem.
    #[serde(skip)]
    pub local_path: PathBuf,

    /// Filename as supplied by the uploader.
    pub original_name: String,

    /// Filename the object is stored under.
    pub filename: Option<String>,

    /// Content type (MIME type).
    pub mimetype: String,

    /// Size in bytes.
    pub size: u64,

    /// Store-relative prefix the object lives under.
    pub path: Option<String>,

    /// Bucket the object lives in.
    pub bucket: Option<String>,

    /// Entity tag reported by the store.
    pub etag: Option<String>,
}

impl FileDescriptor {
    /// Descriptor for a freshly uploaded local file.
    pub fn new(
        local_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        mimetype: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            local_path: local_path.into(),
            original_name: original_name.into(),
            mimetype: mimetype.into(),
            size,
            ..Self::default()
        }
    }

    /// Descriptor for an already stored file, known only by name.
    pub fn stored(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Name the object is (or will be) stored under.
    ///
    /// Falls back to the original name for descriptors that were never
    /// uploaded through the adapter.
    pub fn stored_name(&self) -> &str {
        self.filename.as_deref().unwrap_or(&self.original_name)
    }

    /// The fields a host persists for this file under `schema`.
    pub fn to_record(&self, schema: &Schema) -> Value {
        let mut record = Map::new();
        record.insert("original_name".into(), Value::from(self.original_name.clone()));
        record.insert("mimetype".into(), Value::from(self.mimetype.clone()));
        record.insert("size".into(), Value::from(self.size));

        for field in schema.enabled_fields() {
            let value = match field {
                SchemaField::Filename => self.filename.clone(),
                SchemaField::Bucket => self.bucket.clone(),
                SchemaField::Path => self.path.clone(),
                SchemaField::Etag => self.etag.clone(),
            };
            record.insert(field.as_str().into(), value.map_or(Value::Null, Value::from));
        }

        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_follows_schema_selection() {
        let file = FileDescriptor {
            filename: Some("abc.txt".into()),
            etag: Some("\"123\"".into()),
            bucket: Some("bucket".into()),
            ..FileDescriptor::new("/tmp/upload", "a.txt", "text/plain", 3)
        };

        let record = file.to_record(&Schema::default());
        assert_eq!(record["filename"], "abc.txt");
        assert_eq!(record["size"], 3);
        assert!(record.get("etag").is_none());
        assert!(record.get("bucket").is_none());

        let record = file.to_record(&Schema::all());
        assert_eq!(record["etag"], "\"123\"");
        assert_eq!(record["bucket"], "bucket");
        assert_eq!(record["path"], Value::Null);
    }

    #[test]
    fn stored_name_prefers_generated_filename() {
        let file = FileDescriptor::new("/tmp/x", "original.txt", "text/plain", 1);
        assert_eq!(file.stored_name(), "original.txt");
        assert_eq!(FileDescriptor::stored("gen.txt").stored_name(), "gen.txt");
    }
}
