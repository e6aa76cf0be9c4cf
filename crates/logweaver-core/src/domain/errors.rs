//! Errors - フェッチ結果のエラー分類
//!
//! アダプタのエラーは raise せず、`ChunkError` としてチャンクに載せます。
//! 呼び出し側に raise されるのは不正な入力と設定エラーだけです（`app::service::RetrievalError`）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed fetch.
///
/// - NotFound: 期待される失敗。次の backend にフォールスルー
/// - PermissionDenied: ローカル I/O 失敗。リトライしない
/// - Unreachable: リモート失敗。retryable ならリトライ上限まで再試行
/// - Timeout: リクエスト全体のタイムアウト（partial 結果になる）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FetchErrorKind {
    NotFound,
    PermissionDenied,
    Unreachable,
    Timeout,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::NotFound => "NOT_FOUND",
            FetchErrorKind::PermissionDenied => "PERMISSION_DENIED",
            FetchErrorKind::Unreachable => "UNREACHABLE",
            FetchErrorKind::Timeout => "TIMEOUT",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error attached to a `LogChunk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkError {
    pub kind: FetchErrorKind,
    pub message: String,

    #[serde(default)]
    pub retryable: bool,
}

impl ChunkError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::PermissionDenied,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn unreachable(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind: FetchErrorKind::Unreachable,
            message: message.into(),
            retryable,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FetchErrorKind::Timeout,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == FetchErrorKind::NotFound
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ChunkError {}
