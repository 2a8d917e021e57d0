//! Adapter configuration.
//!
//! Options come from three places, highest precedence first: explicit values
//! (CLI flags or code), process environment, built-in defaults. Environment
//! variables are read once, by [`S3Options::from_env`], and never inside the
//! adapter itself.

use crate::{
    errors::ConfigError,
    models::file::FileDescriptor,
    naming::{FilenameGenerator, RandomFilename},
    paths,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::{collections::BTreeMap, env, fmt, path::PathBuf, sync::Arc};

pub const DEFAULT_ENDPOINT: &str = "https://s3.amazonaws.com";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_PATH: &str = "/";

/// Upload parameters the adapter sets on every upload itself.
pub const RESERVED_UPLOAD_PARAMS: [&str; 5] = ["Key", "Body", "Bucket", "ContentType", "ContentLength"];

/// Upload parameters that are forwarded to the store.
pub const SUPPORTED_UPLOAD_PARAMS: [&str; 9] = [
    "ACL",
    "CacheControl",
    "ContentDisposition",
    "ContentEncoding",
    "ContentLanguage",
    "StorageClass",
    "ServerSideEncryption",
    "SSEKMSKeyId",
    "Tagging",
];

/// Prefix for user metadata entries in upload parameters (`Metadata.author`).
pub const METADATA_PARAM_PREFIX: &str = "Metadata.";

/// Extra parameters sent with every upload, keyed by S3 parameter name.
pub type UploadParams = BTreeMap<String, String>;

pub type UrlResolver = Arc<dyn Fn(&FileDescriptor) -> String + Send + Sync>;

/// How public URLs are built.
#[derive(Clone)]
pub enum PublicUrl {
    /// Literal prefix, the resolved store path is appended.
    Prefix(String),
    /// Called with the descriptor (path and bucket filled in).
    Resolver(UrlResolver),
}

impl PublicUrl {
    pub fn resolver<F>(f: F) -> Self
    where
        F: Fn(&FileDescriptor) -> String + Send + Sync + 'static,
    {
        PublicUrl::Resolver(Arc::new(f))
    }
}

impl fmt::Debug for PublicUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicUrl::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            PublicUrl::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

/// Unresolved adapter options. Every field may be left unset.
#[derive(Clone, Default)]
pub struct S3Options {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: Option<bool>,
    pub path: Option<String>,
    pub upload_params: UploadParams,
    pub public_url: Option<PublicUrl>,
    pub generate_filename: Option<Arc<dyn FilenameGenerator>>,
    pub overwrite: Option<bool>,
}

impl fmt::Debug for S3Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Options")
            .field("key", &self.key)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("path", &self.path)
            .field("upload_params", &self.upload_params)
            .field("public_url", &self.public_url)
            .field(
                "generate_filename",
                &self.generate_filename.as_ref().map(|_| ".."),
            )
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

impl S3Options {
    /// Options found in the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Options found through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| names.iter().find_map(|name| lookup(*name));

        let force_path_style = match lookup("S3_FORCEPATHSTYLE") {
            Some(value) => Some(parse_bool(&value).ok_or(ConfigError::InvalidValue {
                option: "S3_FORCEPATHSTYLE",
                value,
            })?),
            None => None,
        };

        Ok(Self {
            key: first(&["S3_KEY", "AWS_ACCESS_KEY_ID"]),
            secret: first(&["S3_SECRET", "AWS_SECRET_ACCESS_KEY"]),
            bucket: lookup("S3_BUCKET"),
            region: first(&["S3_REGION", "AWS_REGION"]),
            endpoint: lookup("S3_ENDPOINT"),
            force_path_style,
            path: lookup("S3_PATH"),
            ..Self::default()
        })
    }

    /// Fill every unset field of `self` from `fallback`.
    pub fn or(self, fallback: S3Options) -> S3Options {
        let upload_params = if self.upload_params.is_empty() {
            fallback.upload_params
        } else {
            self.upload_params
        };
        S3Options {
            key: self.key.or(fallback.key),
            secret: self.secret.or(fallback.secret),
            bucket: self.bucket.or(fallback.bucket),
            region: self.region.or(fallback.region),
            endpoint: self.endpoint.or(fallback.endpoint),
            force_path_style: self.force_path_style.or(fallback.force_path_style),
            path: self.path.or(fallback.path),
            upload_params,
            public_url: self.public_url.or(fallback.public_url),
            generate_filename: self.generate_filename.or(fallback.generate_filename),
            overwrite: self.overwrite.or(fallback.overwrite),
        }
    }
}

/// Validated, immutable adapter configuration.
#[derive(Clone)]
pub struct AdapterConfig {
    pub key: String,
    pub secret: String,
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub force_path_style: bool,
    pub path: String,
    pub upload_params: UploadParams,
    pub public_url: Option<PublicUrl>,
    pub generate_filename: Arc<dyn FilenameGenerator>,
    pub overwrite: bool,
}

impl fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("key", &self.key)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("path", &self.path)
            .field("upload_params", &self.upload_params)
            .field("public_url", &self.public_url)
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

impl AdapterConfig {
    /// Apply defaults to `options` and validate the result.
    pub fn resolve(options: S3Options) -> Result<Self, ConfigError> {
        let key = options.key.ok_or(ConfigError::MissingOption("key"))?;
        let secret = options.secret.ok_or(ConfigError::MissingOption("secret"))?;
        let bucket = options.bucket.ok_or(ConfigError::MissingOption("bucket"))?;

        let path = match options.path {
            Some(path) if !paths::is_absolute(&path) => {
                return Err(ConfigError::RelativePath(path));
            }
            Some(path) => path,
            None => DEFAULT_PATH.to_string(),
        };

        validate_upload_params(&options.upload_params)?;

        Ok(Self {
            key,
            secret,
            bucket,
            region: options.region.unwrap_or_else(|| DEFAULT_REGION.into()),
            endpoint: options.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.into()),
            force_path_style: options.force_path_style.unwrap_or(false),
            path,
            upload_params: options.upload_params,
            public_url: options.public_url,
            generate_filename: options
                .generate_filename
                .unwrap_or_else(|| Arc::new(RandomFilename)),
            overwrite: options.overwrite.unwrap_or(true),
        })
    }
}

fn validate_upload_params(params: &UploadParams) -> Result<(), ConfigError> {
    for name in params.keys() {
        if RESERVED_UPLOAD_PARAMS.contains(&name.as_str()) {
            return Err(ConfigError::ReservedUploadParam(name.clone()));
        }
        let is_metadata = name
            .strip_prefix(METADATA_PARAM_PREFIX)
            .is_some_and(|meta| !meta.is_empty());
        if !is_metadata && !SUPPORTED_UPLOAD_PARAMS.contains(&name.as_str()) {
            return Err(ConfigError::UnsupportedUploadParam(name.clone()));
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Which object-store client the CLI talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Any S3-compatible service.
    S3,
    /// Local directory, for development.
    Disk,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Store uploaded files in an S3-compatible object store")]
pub struct Args {
    /// Access key id (overrides S3_KEY / AWS_ACCESS_KEY_ID)
    #[arg(long, global = true)]
    pub key: Option<String>,

    /// Secret access key (overrides S3_SECRET / AWS_SECRET_ACCESS_KEY)
    #[arg(long, global = true)]
    pub secret: Option<String>,

    /// Bucket name (overrides S3_BUCKET)
    #[arg(long, global = true)]
    pub bucket: Option<String>,

    /// Region (overrides S3_REGION / AWS_REGION)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Endpoint URL for S3-compatible services (overrides S3_ENDPOINT)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Address buckets by path instead of by host name (overrides S3_FORCEPATHSTYLE).
    /// `--force-path-style=false` turns it off.
    #[arg(
        long,
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub force_path_style: Option<bool>,

    /// Absolute path prefix inside the bucket (overrides S3_PATH)
    #[arg(long, global = true)]
    pub path: Option<String>,

    /// Prefix for public URLs, e.g. a CDN origin
    #[arg(long, global = true)]
    pub public_url: Option<String>,

    /// Extra upload parameter, repeatable: `--upload-param ACL=public-read`
    #[arg(long = "upload-param", global = true, value_parser = parse_key_value)]
    pub upload_params: Vec<(String, String)>,

    /// Object store to talk to
    #[arg(long, global = true, value_enum, default_value_t = Backend::S3)]
    pub backend: Backend,

    /// Directory used by the disk backend and the `serve` command
    #[arg(long, global = true, default_value = "./data/objects")]
    pub storage_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a local file and print the annotated descriptor
    Upload {
        /// File to upload
        file: PathBuf,
        /// MIME type of the file
        #[arg(long, default_value = "application/octet-stream")]
        mimetype: String,
        /// Name to report as the original filename (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Filename strategy
        #[arg(long, value_enum, default_value_t = NamingStrategy::Random)]
        naming: NamingStrategy,
        /// Pick another name instead of overwriting an existing object
        #[arg(long)]
        no_overwrite: bool,
    },
    /// Print the public URL of a stored file
    Url {
        filename: String,
        /// Path the file was stored under
        #[arg(long)]
        file_path: Option<String>,
        /// Bucket the file was stored in
        #[arg(long)]
        file_bucket: Option<String>,
    },
    /// Delete a stored file
    Remove {
        filename: String,
        #[arg(long)]
        file_path: Option<String>,
        #[arg(long)]
        file_bucket: Option<String>,
    },
    /// Print the metadata of a stored file, or `null`
    Exists { filename: String },
    /// Serve files from the disk store over HTTP
    Serve {
        /// Host to bind to (overrides S3_ADAPTER_HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (overrides S3_ADAPTER_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NamingStrategy {
    Random,
    Original,
    ContentHash,
}

impl Args {
    /// Options given on the command line; unset flags stay `None`.
    pub fn s3_options(&self) -> S3Options {
        S3Options {
            key: self.key.clone(),
            secret: self.secret.clone(),
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            force_path_style: self.force_path_style,
            path: self.path.clone(),
            upload_params: self.upload_params.iter().cloned().collect(),
            public_url: self.public_url.clone().map(PublicUrl::Prefix),
            ..S3Options::default()
        }
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))
}
