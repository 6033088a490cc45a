//! Content store for uploaded file bytes.
//!
//! Files are written under `{root}/{yyyy-mm-dd}/{file_uid}{extension}`.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a file relative to the store root.
    pub fn relative_path(file_uid: Uuid, extension: Option<&str>, date: NaiveDate) -> PathBuf {
        let mut name = file_uid.to_string();
        if let Some(ext) = extension {
            name.push_str(ext);
        }
        PathBuf::from(date.format("%Y-%m-%d").to_string()).join(name)
    }

    /// Write `bytes` and return the absolute path written.
    pub async fn write(
        &self,
        file_uid: Uuid,
        extension: Option<&str>,
        date: NaiveDate,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let path = self.root.join(Self::relative_path(file_uid, extension, date));
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove a previously written file, ignoring files already gone.
    pub async fn remove(&self, path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
