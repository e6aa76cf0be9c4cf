//! ArchiveBackend - ローテーション済みログを BlobStore から読む
//!
//! ローカル / リモートで見つからなかった try のための最後の砦です。

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{BackendKind, ChunkError, LogChunk, LogLocation};
use crate::ports::{BlobError, BlobStore, LogBackend};

/// Reads archived logs; `location.address` is the object key.
pub struct ArchiveBackend<B> {
    store: B,
    max_chunk_bytes: u64,
}

impl<B: BlobStore> ArchiveBackend<B> {
    pub fn new(store: B, max_chunk_bytes: u64) -> Self {
        Self {
            store,
            max_chunk_bytes,
        }
    }
}

#[async_trait]
impl<B: BlobStore> LogBackend for ArchiveBackend<B> {
    fn kind(&self) -> BackendKind {
        BackendKind::Archive
    }

    async fn fetch(&self, location: &LogLocation, offset: Option<u64>) -> LogChunk {
        let start = offset.unwrap_or(0);
        match self
            .store
            .read_range(&location.address, start, self.max_chunk_bytes)
            .await
        {
            Ok(Some(range)) if range.reaches_end(start) => {
                LogChunk::complete(location.clone(), range.bytes, start)
            }
            Ok(Some(range)) => LogChunk::truncated(location.clone(), range.bytes, start),
            Ok(None) => LogChunk::failed(
                location.clone(),
                ChunkError::not_found(format!("log was never archived at {}", location.address)),
                start,
            ),
            Err(e) => {
                debug!(key = %location.address, error = %e, "archive read failed");
                LogChunk::failed(location.clone(), classify(&e), start)
            }
        }
    }
}

/// InvalidKey だけは retryable にしない
fn classify(e: &BlobError) -> ChunkError {
    match e {
        BlobError::InvalidKey(_) => ChunkError::unreachable(e.to_string(), false),
        BlobError::Io { .. } | BlobError::Unavailable(_) => ChunkError::unreachable(e.to_string(), true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FetchErrorKind;
    use crate::impls::InMemoryBlobStore;

    fn location(key: &str) -> LogLocation {
        LogLocation::new(BackendKind::Archive, key, 1)
    }

    #[tokio::test]
    async fn serves_archived_object() {
        let store = InMemoryBlobStore::new();
        store.put("wf/t/1.log", b"archived-log".to_vec()).await.unwrap();
        let backend = ArchiveBackend::new(store, 1024);

        let chunk = backend.fetch(&location("wf/t/1.log"), None).await;
        assert!(chunk.is_ok());
        assert_eq!(chunk.text(), "archived-log");
    }

    #[tokio::test]
    async fn supports_offsets() {
        let store = InMemoryBlobStore::new();
        store.put("k", b"archived-log".to_vec()).await.unwrap();
        let backend = ArchiveBackend::new(store, 1024);

        let chunk = backend.fetch(&location("k"), Some(9)).await;
        assert_eq!(chunk.text(), "log");
        assert_eq!(chunk.offset, 9);
    }

    #[tokio::test]
    async fn never_archived_is_not_found() {
        let backend = ArchiveBackend::new(InMemoryBlobStore::new(), 1024);
        let chunk = backend.fetch(&location("missing"), None).await;
        assert!(chunk.is_not_found());
    }

    #[tokio::test]
    async fn object_larger_than_cap_is_truncated() {
        let store = InMemoryBlobStore::new();
        store.put("big", vec![b'x'; 10_000]).await.unwrap();
        let backend = ArchiveBackend::new(store, 64);

        let chunk = backend.fetch(&location("big"), Some(100)).await;
        assert!(chunk.is_ok());
        assert!(!chunk.is_complete);
        assert_eq!(chunk.content.len(), 64);
        assert_eq!(chunk.next_offset(), 164);
    }

    #[tokio::test]
    async fn invalid_key_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ArchiveBackend::new(crate::impls::FsBlobStore::new(dir.path()), 1024);

        let err = backend.fetch(&location("../outside.log"), None).await.error.expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn store_outage_is_retryable() {
        let store = InMemoryBlobStore::new();
        store.set_unavailable(true);
        let backend = ArchiveBackend::new(store, 1024);

        let err = backend.fetch(&location("k"), None).await.error.expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(err.retryable);
    }
}
