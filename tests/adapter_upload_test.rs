//! Tests for `StorageAdapter::upload_file` against a recording client.

mod common;

use common::{FIXTURE_SIZE, HeadAnswer, RecordingClient, fixture_descriptor, options};
use s3_file_adapter::{
    AdapterError, S3Options, Schema, StorageAdapter,
    naming::{self, OriginalFilename},
    services::storage_adapter::MAX_NAME_ATTEMPTS,
};
use std::sync::Arc;

fn original_name_options() -> S3Options {
    S3Options {
        generate_filename: Some(Arc::new(OriginalFilename)),
        ..options()
    }
}

#[tokio::test]
async fn uploads_the_file_to_the_store() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client.clone())
        .unwrap();

    adapter.upload_file(fixture_descriptor()).await.unwrap();

    let puts = client.puts();
    assert_eq!(puts.len(), 1);
    let put = &puts[0];
    assert_eq!(put.key, "test-file.txt");
    assert_eq!(put.bucket, "bucket");
    assert_eq!(put.content_type, "text/plain");
    assert_eq!(put.content_length, FIXTURE_SIZE);
    assert_eq!(put.body, b"Hello from a test\n");
}

#[tokio::test]
async fn annotates_the_returned_file() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client).unwrap();

    let file = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_eq!(file.filename.as_deref(), Some("test-file.txt"));
    assert_eq!(file.etag.as_deref(), Some("\"ABC123PPPOOO\""));
    assert_eq!(file.path.as_deref(), Some("/"));
    assert_eq!(file.bucket.as_deref(), Some("bucket"));
    assert_eq!(file.original_name, "test-file.txt");
    assert_eq!(file.size, FIXTURE_SIZE);
}

#[tokio::test]
async fn uses_the_configured_path_prefix() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(
        S3Options {
            path: Some("/uploads/docs".into()),
            ..original_name_options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let file = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_eq!(client.puts()[0].key, "uploads/docs/test-file.txt");
    assert_eq!(file.path.as_deref(), Some("/uploads/docs"));
}

#[tokio::test]
async fn per_file_path_overrides_configured_path() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client.clone())
        .unwrap();

    let file = adapter
        .upload_file(fixture_descriptor().with_path("legacy"))
        .await
        .unwrap();

    assert_eq!(client.puts()[0].key, "legacy/test-file.txt");
    assert_eq!(file.path.as_deref(), Some("/legacy"));
}

#[tokio::test]
async fn uses_the_filename_generator() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(
        S3Options {
            generate_filename: Some(naming::from_fn(|_file, _attempt| {
                Ok("GENERATED_FILENAME".to_string())
            })),
            ..options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let file = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_eq!(client.puts()[0].key, "GENERATED_FILENAME");
    assert_eq!(file.filename.as_deref(), Some("GENERATED_FILENAME"));
}

#[tokio::test]
async fn default_generator_produces_random_names() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(options(), Schema::default(), client.clone()).unwrap();

    let first = adapter.upload_file(fixture_descriptor()).await.unwrap();
    let second = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_ne!(first.filename, second.filename);
    assert!(first.filename.unwrap().ends_with(".txt"));
}

#[tokio::test]
async fn special_characters_are_encoded_in_the_key() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(
        S3Options {
            generate_filename: Some(naming::from_fn(|_file, _attempt| {
                Ok("my file (1)!.txt".to_string())
            })),
            ..options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let file = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_eq!(client.puts()[0].key, "my%20file%20%281%29%21.txt");
    assert_eq!(file.filename.as_deref(), Some("my file (1)!.txt"));
}

#[tokio::test]
async fn passes_upload_params_to_the_store() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(
        S3Options {
            upload_params: [
                ("ACL".to_string(), "public-read".to_string()),
                ("Metadata.owner".to_string(), "tests".to_string()),
            ]
            .into(),
            ..original_name_options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    adapter.upload_file(fixture_descriptor()).await.unwrap();

    let params = &client.puts()[0].params;
    assert_eq!(params["ACL"], "public-read");
    assert_eq!(params["Metadata.owner"], "tests");
}

#[tokio::test]
async fn store_errors_are_wrapped() {
    let client = RecordingClient {
        put_error: Some("Something broke".into()),
        ..RecordingClient::default()
    }
    .shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client).unwrap();

    let err = adapter.upload_file(fixture_descriptor()).await.unwrap_err();

    assert!(matches!(err, AdapterError::Store { operation: "putObject", .. }));
    assert!(err.to_string().contains("Something broke"));
}

#[tokio::test]
async fn missing_source_file_is_reported_before_upload() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client.clone())
        .unwrap();

    let mut file = fixture_descriptor();
    file.local_path = "/definitely/not/here.txt".into();
    let err = adapter.upload_file(file).await.unwrap_err();

    assert!(matches!(err, AdapterError::Source { .. }));
    assert!(client.puts().is_empty());
}

#[tokio::test]
async fn generator_errors_abort_the_upload() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(
        S3Options {
            generate_filename: Some(naming::from_fn(|_file, _attempt| {
                Err(anyhow::anyhow!("no names left"))
            })),
            ..options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let err = adapter.upload_file(fixture_descriptor()).await.unwrap_err();

    assert!(matches!(err, AdapterError::FilenameGeneration(_)));
    assert!(client.puts().is_empty());
}

#[tokio::test]
async fn overwrite_disabled_retries_taken_names() {
    let client = RecordingClient {
        head_answer: HeadAnswer::FoundFor(vec!["name-0.txt".into(), "name-1.txt".into()]),
        ..RecordingClient::default()
    }
    .shared();
    let adapter = StorageAdapter::new(
        S3Options {
            overwrite: Some(false),
            generate_filename: Some(naming::from_fn(|_file, attempt| {
                Ok(format!("name-{attempt}.txt"))
            })),
            ..options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let file = adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert_eq!(file.filename.as_deref(), Some("name-2.txt"));
    assert_eq!(client.heads().len(), 3);
    assert_eq!(client.puts()[0].key, "name-2.txt");
}

#[tokio::test]
async fn overwrite_disabled_gives_up_eventually() {
    let client = RecordingClient {
        head_answer: HeadAnswer::Found,
        ..RecordingClient::default()
    }
    .shared();
    let adapter = StorageAdapter::new(
        S3Options {
            overwrite: Some(false),
            ..original_name_options()
        },
        Schema::default(),
        client.clone(),
    )
    .unwrap();

    let err = adapter.upload_file(fixture_descriptor()).await.unwrap_err();

    assert!(matches!(
        err,
        AdapterError::NameAttemptsExhausted { attempts } if attempts == MAX_NAME_ATTEMPTS
    ));
    assert_eq!(client.heads().len() as u32, MAX_NAME_ATTEMPTS);
    assert!(client.puts().is_empty());
}

#[tokio::test]
async fn overwrite_enabled_skips_existence_check() {
    let client = RecordingClient::default().shared();
    let adapter = StorageAdapter::new(original_name_options(), Schema::default(), client.clone())
        .unwrap();

    adapter.upload_file(fixture_descriptor()).await.unwrap();

    assert!(client.heads().is_empty());
}
