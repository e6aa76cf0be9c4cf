//! LogBackend port - "read log chunk" の共通インターフェース
//!
//! 実装は backend の種類ごとに 1 つ（impls/local, impls/remote, impls/archive）。

use async_trait::async_trait;

use crate::domain::{BackendKind, LogChunk, LogLocation};

/// Fetches the log stored at one location.
///
/// # 設計原則
/// - 失敗しても raise しない: `LogChunk::error` に構造化して返す
/// - 副作用は I/O のみ（共有状態を書き換えない）
/// - `offset` は incremental read 用。`supports_offset()` が false の実装は無視してよい
#[async_trait]
pub trait LogBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn supports_offset(&self) -> bool {
        true
    }

    async fn fetch(&self, location: &LogLocation, offset: Option<u64>) -> LogChunk;
}
