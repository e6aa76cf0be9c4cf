//! BlobStore port - ローテーション済みログの保存先（MinIO/S3/Local）
//!
//! Archive backend はこの port 越しにオブジェクトを読みます。

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob store I/O failed for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object key `{0}`")]
    InvalidKey(String),

    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Bytes `[start, start + bytes.len())` of one object plus its total size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRange {
    pub bytes: Vec<u8>,
    pub total_len: u64,
}

impl BlobRange {
    /// True when the range ends at (or past) the end of the object.
    pub fn reaches_end(&self, start: u64) -> bool {
        start.saturating_add(self.bytes.len() as u64) >= self.total_len
    }
}

/// Durable object storage.
///
/// - `read_range` は最大 `limit` バイトだけ読む（オブジェクト全体をバッファしない）
/// - 存在しないキーは `Ok(None)`（エラーではない）
/// - `put` はアーカイブ処理とテストのシード用
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read_range(
        &self,
        key: &str,
        start: u64,
        limit: u64,
    ) -> Result<Option<BlobRange>, BlobError>;

    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), BlobError>;
}
