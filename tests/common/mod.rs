//! Shared helpers for adapter integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use s3_file_adapter::{
    ClientError, FileDescriptor, ObjectMetadata, S3Options,
    config::UploadParams,
    services::client::{DeleteObjectOutput, ObjectStoreClient, PutObjectOutput, PutObjectRequest},
};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tokio::io::AsyncReadExt;

pub const FIXTURE_SIZE: u64 = 18;

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/test-file.txt")
}

pub fn fixture_descriptor() -> FileDescriptor {
    FileDescriptor::new(fixture_path(), "test-file.txt", "text/plain", FIXTURE_SIZE)
}

pub fn options() -> S3Options {
    S3Options {
        key: Some("key".into()),
        secret: Some("secret".into()),
        bucket: Some("bucket".into()),
        ..S3Options::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPut {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub content_length: u64,
    pub params: UploadParams,
    pub body: Vec<u8>,
}

/// What `head_object` answers.
#[derive(Debug, Clone)]
pub enum HeadAnswer {
    Found,
    NotFound,
    /// Found for keys in the list, not found otherwise.
    FoundFor(Vec<String>),
    Fail(u16),
}

/// In-memory client recording every call.
pub struct RecordingClient {
    pub etag: Option<String>,
    pub put_error: Option<String>,
    pub delete_status: u16,
    pub head_answer: HeadAnswer,
    pub puts: Mutex<Vec<RecordedPut>>,
    pub deletes: Mutex<Vec<(String, String)>>,
    pub heads: Mutex<Vec<(String, String)>>,
}

impl Default for RecordingClient {
    fn default() -> Self {
        Self {
            etag: Some("\"ABC123PPPOOO\"".into()),
            put_error: None,
            delete_status: 204,
            head_answer: HeadAnswer::Found,
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            heads: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingClient {
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<(String, String)> {
        self.deletes.lock().unwrap().clone()
    }

    pub fn heads(&self) -> Vec<(String, String)> {
        self.heads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStoreClient for RecordingClient {
    async fn put_object(&self, mut request: PutObjectRequest) -> Result<PutObjectOutput, ClientError> {
        let mut body = Vec::new();
        request.body.read_to_end(&mut body).await?;
        self.puts.lock().unwrap().push(RecordedPut {
            bucket: request.bucket,
            key: request.key,
            content_type: request.content_type,
            content_length: request.content_length,
            params: request.params,
            body,
        });

        match &self.put_error {
            Some(message) => Err(ClientError::Transport(message.clone())),
            None => Ok(PutObjectOutput {
                etag: self.etag.clone(),
            }),
        }
    }

    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<DeleteObjectOutput, ClientError> {
        self.deletes
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));
        Ok(DeleteObjectOutput {
            status: self.delete_status,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ClientError> {
        self.heads
            .lock()
            .unwrap()
            .push((bucket.to_string(), key.to_string()));

        let found = match &self.head_answer {
            HeadAnswer::Found => true,
            HeadAnswer::NotFound => false,
            HeadAnswer::FoundFor(keys) => keys.iter().any(|k| k == key),
            HeadAnswer::Fail(status) => {
                return Err(ClientError::Status {
                    status: *status,
                    message: "head failed".into(),
                });
            }
        };

        if found {
            Ok(ObjectMetadata {
                key: key.to_string(),
                content_type: Some("text/plain".into()),
                content_length: Some(FIXTURE_SIZE),
                etag: self.etag.clone(),
                ..ObjectMetadata::default()
            })
        } else {
            Err(ClientError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
        }
    }
}
