//! DiskHandler - streams parts into files under a base directory

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{HandlerError, Part, PartHandler};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// Sequence numbers tried per part before giving up on a free name
const MAX_NAME_ATTEMPTS: u64 = 10_000;

/// Configuration for DiskHandler
#[derive(Debug, Clone)]
pub struct DiskHandlerConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl DiskHandlerConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./uploads"));

        Self { base_path }
    }
}

/// Handler that writes each part to `<base_path>/<seq>-<filename>`
///
/// Bytes land in a `.partial` file first; it is linked to its final name once the part
/// stream ends and removed if the stream fails or the handler is cancelled. Names taken
/// by other handlers or earlier runs in the same directory are skipped, and an existing
/// file is never replaced.
pub struct DiskHandler {
    name: String,
    config: DiskHandlerConfig,
    sequence: AtomicU64,
}

impl DiskHandler {
    /// Create a new DiskHandler
    pub fn new(name: impl Into<String>, config: DiskHandlerConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            sequence: AtomicU64::new(0),
        })
    }

    /// Create from params map (for the blueprint builder)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        Self::new(name, DiskHandlerConfig::from_params(params))
    }

    /// Output directory
    pub fn base_path(&self) -> &Path {
        &self.config.base_path
    }

    /// Claim the next free `<seq>-<filename>` in the base directory
    async fn claim(&self, raw_name: &str) -> std::io::Result<(PathBuf, PartialFile)> {
        let file_name = sanitize_filename(raw_name);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            let final_path = self.config.base_path.join(format!("{seq:04}-{file_name}"));
            if tokio::fs::try_exists(&final_path).await? {
                continue;
            }

            let partial_path = final_path.with_file_name(format!("{seq:04}-{file_name}.partial"));
            match PartialFile::create(partial_path).await {
                Ok(partial) => return Ok((final_path, partial)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!(
                "no free name for '{file_name}' in {}",
                self.config.base_path.display()
            ),
        ))
    }
}

impl PartHandler for DiskHandler {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "disk_handler_handle",
        skip(self, part),
        fields(handler = %self.name, part = %part.name())
    )]
    async fn handle(&self, mut part: Part) -> Result<(), HandlerError> {
        let raw_name = part.filename().unwrap_or(part.name()).to_owned();
        let (final_path, mut partial) = self.claim(&raw_name).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = part.chunk().await? {
            partial.write(&chunk).await?;
            written += chunk.len() as u64;
        }
        partial.commit(&final_path).await?;

        debug!(
            handler = %self.name,
            path = %final_path.display(),
            bytes = written,
            "Part written"
        );
        Ok(())
    }
}

/// Output file removed on drop unless committed
struct PartialFile {
    path: PathBuf,
    file: Option<tokio::fs::File>,
    committed: bool,
}

impl PartialFile {
    /// Fails with `AlreadyExists` if `path` is taken
    async fn create(path: PathBuf) -> std::io::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Some(file),
            committed: false,
        })
    }

    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.write_all(chunk).await,
            None => Err(std::io::Error::other("partial file already closed")),
        }
    }

    /// Publish under `target`; fails with `AlreadyExists` instead of replacing it
    async fn commit(&mut self, target: &Path) -> std::io::Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        tokio::fs::hard_link(&self.path, target).await?;
        self.committed = true;
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            warn!(path = %self.path.display(), error = %e, "Failed to remove partial file");
        }
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.file.take();
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "Failed to remove partial file");
        }
    }
}

/// Last path component of a client-supplied filename, restricted to `[A-Za-z0-9._-]`
fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
