//! FsBlobStore - ディレクトリをバケットとして扱う BlobStore
//!
//! NFS / マウント済みオブジェクトストレージ上のアーカイブ用です。

use std::io::{self, SeekFrom};
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::ports::{BlobError, BlobRange, BlobStore};

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a key to a path under `root`; keys may not escape it.
    fn path_for(&self, key: &str) -> Result<PathBuf, BlobError> {
        let rel = Path::new(key.trim_start_matches('/'));
        let escapes = rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if key.trim().is_empty() || escapes {
            return Err(BlobError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read_range(
        &self,
        key: &str,
        start: u64,
        limit: u64,
    ) -> Result<Option<BlobRange>, BlobError> {
        let path = self.path_for(key)?;
        match read_file_range(&path, start, limit).await {
            Ok(range) => Ok(Some(range)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(BlobError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError> {
        let path = self.path_for(key)?;
        let io_err = |source: io::Error| BlobError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(io_err)
    }
}

async fn read_file_range(path: &Path, start: u64, limit: u64) -> io::Result<BlobRange> {
    let mut file = tokio::fs::File::open(path).await?;
    let total_len = file.metadata().await?.len();
    let mut bytes = Vec::new();
    if start < total_len {
        file.seek(SeekFrom::Start(start)).await?;
        file.take(limit).read_to_end(&mut bytes).await?;
    }
    Ok(BlobRange { bytes, total_len })
}
