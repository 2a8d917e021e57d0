//! Filename generation strategies.
//!
//! Every strategy implements [`FilenameGenerator`]. Plain closures are wrapped
//! with [`from_fn`], closures returning a future with [`from_async_fn`].

use crate::models::file::FileDescriptor;
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use futures::future::BoxFuture;
use md5::Context as Md5Context;
use std::{path::Path, sync::Arc};
use tokio::{fs::File, io::AsyncReadExt};
use uuid::Uuid;

/// Produces the name an uploaded file is stored under.
///
/// `attempt` starts at 0 and increases each time a previously generated name
/// turned out to be taken.
#[async_trait]
pub trait FilenameGenerator: Send + Sync {
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> anyhow::Result<String>;
}

/// Random hex name keeping the original extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomFilename;

#[async_trait]
impl FilenameGenerator for RandomFilename {
    async fn generate(&self, file: &FileDescriptor, _attempt: u32) -> anyhow::Result<String> {
        let stem = Uuid::new_v4().simple().to_string();
        Ok(with_extension(stem, &file.original_name))
    }
}

/// The uploader's original filename, sanitized.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalFilename;

#[async_trait]
impl FilenameGenerator for OriginalFilename {
    async fn generate(&self, file: &FileDescriptor, _attempt: u32) -> anyhow::Result<String> {
        let name = sanitize(&file.original_name);
        if name.is_empty() {
            return Err(anyhow!(
                "original filename `{}` is empty after sanitizing",
                file.original_name
            ));
        }
        Ok(name)
    }
}

/// MD5 of the file contents, keeping the original extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHashFilename;

#[async_trait]
impl FilenameGenerator for ContentHashFilename {
    async fn generate(&self, file: &FileDescriptor, _attempt: u32) -> anyhow::Result<String> {
        let digest = md5_file(file.local_path())
            .await
            .with_context(|| format!("hashing {}", file.local_path().display()))?;
        Ok(with_extension(digest, &file.original_name))
    }
}

struct FnGenerator<F>(F);

#[async_trait]
impl<F> FilenameGenerator for FnGenerator<F>
where
    F: Fn(&FileDescriptor, u32) -> anyhow::Result<String> + Send + Sync,
{
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> anyhow::Result<String> {
        (self.0)(file, attempt)
    }
}

struct AsyncFnGenerator<F>(F);

#[async_trait]
impl<F> FilenameGenerator for AsyncFnGenerator<F>
where
    F: Fn(FileDescriptor, u32) -> BoxFuture<'static, anyhow::Result<String>> + Send + Sync,
{
    async fn generate(&self, file: &FileDescriptor, attempt: u32) -> anyhow::Result<String> {
        (self.0)(file.clone(), attempt).await
    }
}

/// Wrap a synchronous closure as a generator.
pub fn from_fn<F>(f: F) -> Arc<dyn FilenameGenerator>
where
    F: Fn(&FileDescriptor, u32) -> anyhow::Result<String> + Send + Sync + 'static,
{
    Arc::new(FnGenerator(f))
}

/// Wrap a closure returning a boxed future as a generator.
pub fn from_async_fn<F>(f: F) -> Arc<dyn FilenameGenerator>
where
    F: Fn(FileDescriptor, u32) -> BoxFuture<'static, anyhow::Result<String>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(AsyncFnGenerator(f))
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(str::to_ascii_lowercase)
}

fn with_extension(stem: String, original_name: &str) -> String {
    match extension(&sanitize(original_name)) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

/// Strip characters that are unsafe in filenames on common platforms.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control())
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"'))
        .collect();
    cleaned.trim().trim_start_matches('.').to_string()
}

async fn md5_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path).await?;
    let mut digest = Md5Context::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        digest.consume(&buf[..read]);
    }
    Ok(format!("{:x}", digest.compute()))
}
