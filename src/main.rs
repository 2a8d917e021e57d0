use anyhow::{Context, Result};
use clap::Parser;
use s3_file_adapter::{
    DiskObjectStore, FileDescriptor, S3ObjectClient, S3Options, Schema, StorageAdapter,
    config::{AdapterConfig, Args, Backend, Command, NamingStrategy},
    naming::{ContentHashFilename, FilenameGenerator, OriginalFilename, RandomFilename},
    routes,
    services::client::ObjectStoreClient,
};
use std::{env, io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // --- Options: CLI flags over environment over defaults ---
    let mut options = args
        .s3_options()
        .or(S3Options::from_env().context("reading S3 settings from the environment")?);

    match &args.command {
        Command::Upload {
            file,
            mimetype,
            name,
            naming,
            no_overwrite,
        } => {
            options.generate_filename = Some(generator(*naming));
            options.overwrite = Some(!no_overwrite);
            let adapter = build_adapter(&args, options)?;

            let size = tokio::fs::metadata(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?
                .len();
            let original_name = match name {
                Some(name) => name.clone(),
                None => file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .context("file name is not valid UTF-8")?
                    .to_string(),
            };

            let descriptor = FileDescriptor::new(file, original_name, mimetype, size);
            let stored = adapter.upload_file(descriptor).await?;
            let mut record = stored.to_record(&Schema::all());
            record["url"] = adapter.file_url(&stored).into();
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Url {
            filename,
            file_path,
            file_bucket,
        } => {
            let adapter = build_adapter(&args, options)?;
            println!("{}", adapter.file_url(&stored_file(filename, file_path, file_bucket)));
        }
        Command::Remove {
            filename,
            file_path,
            file_bucket,
        } => {
            let adapter = build_adapter(&args, options)?;
            adapter
                .remove_file(&stored_file(filename, file_path, file_bucket))
                .await?;
        }
        Command::Exists { filename } => {
            let adapter = build_adapter(&args, options)?;
            let metadata = adapter.file_exists(filename).await?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Serve { host, port } => serve(&args, host.clone(), *port).await?,
    }

    Ok(())
}

fn generator(strategy: NamingStrategy) -> Arc<dyn FilenameGenerator> {
    match strategy {
        NamingStrategy::Random => Arc::new(RandomFilename),
        NamingStrategy::Original => Arc::new(OriginalFilename),
        NamingStrategy::ContentHash => Arc::new(ContentHashFilename),
    }
}

fn build_adapter(args: &Args, options: S3Options) -> Result<StorageAdapter> {
    let config = AdapterConfig::resolve(options)?;
    let client: Arc<dyn ObjectStoreClient> = match args.backend {
        Backend::S3 => Arc::new(S3ObjectClient::new(&config)),
        Backend::Disk => Arc::new(DiskObjectStore::new(&args.storage_dir)),
    };
    Ok(StorageAdapter::from_config(config, Schema::all(), client))
}

fn stored_file(
    filename: &str,
    path: &Option<String>,
    bucket: &Option<String>,
) -> FileDescriptor {
    let mut file = FileDescriptor::stored(filename);
    file.path = path.clone();
    file.bucket = bucket.clone();
    file
}

/// Serve the disk store over HTTP until interrupted.
async fn serve(args: &Args, host: Option<String>, port: Option<u16>) -> Result<()> {
    // --- Environment fallback ---
    let host = host
        .or_else(|| env::var("S3_ADAPTER_HOST").ok())
        .unwrap_or_else(|| "0.0.0.0".into());
    let port = match port {
        Some(port) => port,
        None => match env::var("S3_ADAPTER_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing S3_ADAPTER_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading S3_ADAPTER_PORT"),
        },
    };

    // --- Ensure storage directory exists ---
    if !args.storage_dir.exists() {
        std::fs::create_dir_all(&args.storage_dir)?;
        tracing::info!("Created storage directory at {}", args.storage_dir.display());
    }

    let store = DiskObjectStore::new(&args.storage_dir);
    let app = routes::routes().with_state(store);

    let addr = format!("{}:{}", host, port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Serving {} on http://{}", args.storage_dir.display(), listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
