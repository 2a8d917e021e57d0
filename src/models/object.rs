//! Represents what the object store reports about a stored object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headers/metadata of a single object, as returned by a HEAD request.
///
/// The struct holds metadata only, never the content bytes.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ObjectMetadata {
    /// Object key (path-like identifier within the bucket).
    pub key: String,

    /// Content type (MIME type).
    pub content_type: Option<String>,

    /// Size in bytes.
    pub content_length: Option<u64>,

    /// Entity tag, quoted the way the store sends it.
    pub etag: Option<String>,

    /// Timestamp when the object was last written.
    pub last_modified: Option<DateTime<Utc>>,

    /// User-defined metadata (`x-amz-meta-*` without the prefix).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}
