use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{GatewayError, GatewayResult};
use crate::domain::{FileUpload, StoredFile};

/// Where uploaded files live. The desk keeps only the returned descriptor.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `upload` under `folder` and describes the stored file.
    async fn upload(&self, upload: FileUpload, folder: &str) -> GatewayResult<StoredFile>;

    /// Removes a previously stored file.
    async fn delete(&self, file: &StoredFile) -> GatewayResult<()>;
}

/// Local file system storage served under `public_base_url`.
///
/// Stored names are `<millis>-<seq>-<name>`, so two uploads never share a path.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_path: PathBuf,
    public_base_url: String,
    sequence: Arc<AtomicU64>,
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

impl LocalFileStorage {
    pub fn new(base_path: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            sequence: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Maps a public URL back to a path inside `base_path`; anything else is refused.
    fn path_for_url(&self, url: &str) -> GatewayResult<PathBuf> {
        let relative = url
            .strip_prefix(&self.public_base_url)
            .map(|rest| rest.trim_start_matches('/'))
            .ok_or_else(|| GatewayError::Io(format!("Not a local file: {}", url)))?;
        let relative = Path::new(relative);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(GatewayError::Io(format!("Refusing path outside storage: {}", url)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, upload: FileUpload, folder: &str) -> GatewayResult<StoredFile> {
        let folder = sanitize(folder);
        let stored_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            self.sequence.fetch_add(1, Ordering::Relaxed),
            sanitize(&upload.filename)
        );
        let dir = self.base_path.join(&folder);
        fs::create_dir_all(&dir).await?;
        let mut file = OpenOptions::new().write(true).create_new(true).open(dir.join(&stored_name)).await?;
        file.write_all(&upload.bytes).await?;
        file.flush().await?;
        debug!(folder = %folder, file = %stored_name, "File stored");

        Ok(StoredFile {
            url: format!("{}/{}/{}", self.public_base_url, folder, stored_name),
            filename: upload.filename,
            size: upload.bytes.len() as u64,
            mimetype: upload.mimetype,
        })
    }

    async fn delete(&self, file: &StoredFile) -> GatewayResult<()> {
        let path = self.path_for_url(&file.url)?;
        fs::remove_file(&path).await?;
        Ok(())
    }
}
