//! `ObjectStoreClient` backed by `aws-sdk-s3`.
//!
//! One SDK client is built per adapter; the bucket travels with every call, so
//! files stored in another bucket do not need a client of their own.

use crate::{
    config::{AdapterConfig, DEFAULT_ENDPOINT, METADATA_PARAM_PREFIX},
    errors::ClientError,
    models::object::ObjectMetadata,
    services::client::{DeleteObjectOutput, ObjectStoreClient, PutObjectOutput, PutObjectRequest},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client, Config,
    config::{Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::put_object::builders::PutObjectFluentBuilder,
    primitives::{ByteStream, Length},
    types::{ObjectCannedAcl, ServerSideEncryption, StorageClass},
};
use chrono::DateTime;
use tracing::{debug, instrument, warn};

const CREDENTIALS_PROVIDER: &str = "s3-file-adapter";

#[derive(Debug, Clone)]
pub struct S3ObjectClient {
    client: Client,
}

impl S3ObjectClient {
    pub fn new(config: &AdapterConfig) -> Self {
        let credentials = Credentials::new(
            config.key.clone(),
            config.secret.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );

        let mut builder = Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.force_path_style);

        // AWS endpoints are derived from the region; only override for other services.
        if config.endpoint != DEFAULT_ENDPOINT {
            builder = builder.endpoint_url(config.endpoint.clone());
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Wrap an already configured SDK client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStoreClient for S3ObjectClient {
    #[instrument(skip(self, request), fields(bucket = %request.bucket, key = %request.key))]
    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput, ClientError> {
        let body = ByteStream::read_from()
            .file(request.body)
            .length(Length::Exact(request.content_length))
            .build()
            .await
            .map_err(|err| ClientError::Transport(err.to_string()))?;

        let mut put = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .content_length(request.content_length as i64)
            .body(body);
        for (name, value) in &request.params {
            put = apply_upload_param(put, name, value);
        }

        let output = put
            .send()
            .await
            .map_err(|err| classify(err, &request.bucket, &request.key))?;
        debug!(etag = ?output.e_tag(), "object stored");

        Ok(PutObjectOutput {
            etag: output.e_tag().map(str::to_owned),
        })
    }

    #[instrument(skip(self))]
    async fn delete_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<DeleteObjectOutput, ClientError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(err, bucket, key))?;

        // The SDK turns every non-2xx answer into an error; DeleteObject answers 204.
        Ok(DeleteObjectOutput { status: 204 })
    }

    #[instrument(skip(self))]
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, ClientError> {
        let output = match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(SdkError::ServiceError(error)) if error.err().is_not_found() => {
                return Err(ClientError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                });
            }
            Err(err) => return Err(classify(err, bucket, key)),
        };

        let last_modified = output
            .last_modified()
            .and_then(|ts| DateTime::from_timestamp(ts.secs(), ts.subsec_nanos()));

        Ok(ObjectMetadata {
            key: key.to_string(),
            content_type: output.content_type().map(str::to_owned),
            content_length: output.content_length().map(|len| len.max(0) as u64),
            etag: output.e_tag().map(str::to_owned),
            last_modified,
            metadata: output
                .metadata()
                .map(|meta| meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        })
    }
}

fn apply_upload_param(put: PutObjectFluentBuilder, name: &str, value: &str) -> PutObjectFluentBuilder {
    if let Some(meta_key) = name.strip_prefix(METADATA_PARAM_PREFIX) {
        return put.metadata(meta_key, value);
    }
    match name {
        "ACL" => put.acl(ObjectCannedAcl::from(value)),
        "CacheControl" => put.cache_control(value),
        "ContentDisposition" => put.content_disposition(value),
        "ContentEncoding" => put.content_encoding(value),
        "ContentLanguage" => put.content_language(value),
        "StorageClass" => put.storage_class(StorageClass::from(value)),
        "ServerSideEncryption" => put.server_side_encryption(ServerSideEncryption::from(value)),
        "SSEKMSKeyId" => put.ssekms_key_id(value),
        "Tagging" => put.tagging(value),
        other => {
            warn!(param = other, "ignoring unsupported upload parameter");
            put
        }
    }
}

fn classify<E>(err: SdkError<E>, bucket: &str, key: &str) -> ClientError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(service) => {
            let status = service.raw().status().as_u16();
            if status == 404 {
                return ClientError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                };
            }
            let message = service
                .err()
                .message()
                .or_else(|| service.err().code())
                .unwrap_or("no error message")
                .to_string();
            ClientError::Status { status, message }
        }
        other => ClientError::Transport(DisplayErrorContext(&other).to_string()),
    }
}
