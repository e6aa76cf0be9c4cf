//! LocalBackend - ワーカーのローカルファイルシステムから読む
//!
//! # 学習ポイント
//! - tokio::fs + AsyncSeekExt による offset 読み
//! - io::ErrorKind から ChunkError への変換

use std::io::{self, SeekFrom};
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use crate::domain::{BackendKind, ChunkError, LogChunk, LogLocation};
use crate::ports::LogBackend;

/// Reads log files from the local disk.
///
/// `max_chunk_bytes` を超える分は読まず、チャンクを truncated として返します。
pub struct LocalBackend {
    max_chunk_bytes: u64,
}

impl LocalBackend {
    pub fn new(max_chunk_bytes: u64) -> Self {
        Self { max_chunk_bytes }
    }
}

#[async_trait]
impl LogBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn fetch(&self, location: &LogLocation, offset: Option<u64>) -> LogChunk {
        let start = offset.unwrap_or(0);
        let path = Path::new(&location.address);
        match read_window(path, start, self.max_chunk_bytes).await {
            Ok((content, true)) => LogChunk::complete(location.clone(), content, start),
            Ok((content, false)) => LogChunk::truncated(location.clone(), content, start),
            Err(e) => {
                debug!(path = %location.address, error = %e, "local read failed");
                LogChunk::failed(location.clone(), classify(&location.address, &e), start)
            }
        }
    }
}

/// Read at most `limit` bytes starting at `start`. Returns (bytes, reached_eof).
async fn read_window(path: &Path, start: u64, limit: u64) -> io::Result<(Vec<u8>, bool)> {
    let mut file = tokio::fs::File::open(path).await?;
    let meta = file.metadata().await?;
    if meta.is_dir() {
        return Err(io::Error::other("is a directory"));
    }
    let len = meta.len();
    if start >= len {
        return Ok((Vec::new(), true));
    }

    file.seek(SeekFrom::Start(start)).await?;
    let mut buf = Vec::with_capacity((len - start).min(limit) as usize);
    file.take(limit).read_to_end(&mut buf).await?;

    let reached_eof = start + buf.len() as u64 >= len;
    Ok((buf, reached_eof))
}

fn classify(address: &str, e: &io::Error) -> ChunkError {
    match e.kind() {
        io::ErrorKind::NotFound => ChunkError::not_found(format!("no log file at {address}")),
        io::ErrorKind::PermissionDenied => {
            ChunkError::permission_denied(format!("cannot read {address}: {e}"))
        }
        // 他の I/O 失敗もローカル起因なのでリトライしない
        _ => ChunkError::permission_denied(format!("failed to read {address}: {e}")),
    }
}
