//! Extra schema fields the adapter can annotate a file with.
//!
//! A host decides which of these it stores alongside the core file fields.
//! Storing `path` and `bucket` per file lets old files stay where they are
//! while new uploads go to a different location.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version of the host storage contract this adapter implements.
pub const COMPATIBILITY_LEVEL: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaField {
    Filename,
    Bucket,
    Path,
    Etag,
}

impl SchemaField {
    pub const ALL: [SchemaField; 4] = [
        SchemaField::Filename,
        SchemaField::Bucket,
        SchemaField::Path,
        SchemaField::Etag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaField::Filename => "filename",
            SchemaField::Bucket => "bucket",
            SchemaField::Path => "path",
            SchemaField::Etag => "etag",
        }
    }

    /// Whether the field is persisted when the host does not say otherwise.
    pub fn enabled_by_default(&self) -> bool {
        matches!(self, SchemaField::Filename)
    }
}

impl fmt::Display for SchemaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The host's selection of extra fields to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub filename: bool,
    pub bucket: bool,
    pub path: bool,
    pub etag: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self::from_fields(
            SchemaField::ALL
                .into_iter()
                .filter(SchemaField::enabled_by_default),
        )
    }
}

impl Schema {
    /// Schema persisting exactly the given fields.
    pub fn from_fields(fields: impl IntoIterator<Item = SchemaField>) -> Self {
        let mut schema = Self {
            filename: false,
            bucket: false,
            path: false,
            etag: false,
        };
        for field in fields {
            match field {
                SchemaField::Filename => schema.filename = true,
                SchemaField::Bucket => schema.bucket = true,
                SchemaField::Path => schema.path = true,
                SchemaField::Etag => schema.etag = true,
            }
        }
        schema
    }

    /// Schema persisting every extra field.
    pub fn all() -> Self {
        Self::from_fields(SchemaField::ALL)
    }

    pub fn is_enabled(&self, field: SchemaField) -> bool {
        match field {
            SchemaField::Filename => self.filename,
            SchemaField::Bucket => self.bucket,
            SchemaField::Path => self.path,
            SchemaField::Etag => self.etag,
        }
    }

    pub fn enabled_fields(&self) -> impl Iterator<Item = SchemaField> + '_ {
        SchemaField::ALL
            .into_iter()
            .filter(|field| self.is_enabled(*field))
    }
}
