//! RemoteHostBackend - ワーカーホストのログ配信エンドポイントから HTTP で読む
//!
//! # ステータスの扱い
//! - タイムアウト / 接続失敗 → Unreachable（retryable）
//! - 404 → NotFound
//! - 416 → offset が末尾以降。空の complete チャンク
//! - 5xx → Unreachable（retryable）
//! - その他 → Unreachable（リトライしない）
//!
//! 本文は chunk 単位で読み、`max_chunk_bytes` に達したら読むのをやめます。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RANGE;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::domain::{BackendKind, ChunkError, LogChunk, LogLocation};
use crate::ports::LogBackend;

pub struct RemoteHostBackend {
    client: Client,
    max_chunk_bytes: u64,
}

impl RemoteHostBackend {
    /// `timeout` bounds both connecting and the whole response read.
    pub fn new(timeout: Duration, max_chunk_bytes: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent("logweaver")
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            max_chunk_bytes,
        })
    }
}

#[async_trait]
impl LogBackend for RemoteHostBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::RemoteHost
    }

    async fn fetch(&self, location: &LogLocation, offset: Option<u64>) -> LogChunk {
        let start = offset.unwrap_or(0);
        let mut request = self.client.get(&location.address);
        if start > 0 {
            request = request.header(RANGE, format!("bytes={start}-"));
        }

        let mut resp = match request.send().await {
            Ok(resp) => resp,
            Err(e) => return LogChunk::failed(location.clone(), transport_error(&e), start),
        };

        let status = resp.status();
        debug!(url = %location.address, %status, "remote log response");
        match status {
            StatusCode::NOT_FOUND => LogChunk::failed(
                location.clone(),
                ChunkError::not_found(format!("{} returned 404", location.address)),
                start,
            ),
            StatusCode::RANGE_NOT_SATISFIABLE => LogChunk::complete(location.clone(), Vec::new(), start),
            s if s.is_server_error() => LogChunk::failed(
                location.clone(),
                ChunkError::unreachable(format!("{} returned {s}", location.address), true),
                start,
            ),
            s if s.is_success() => {
                // 206 なら本文は start から。200 ならサーバが Range を無視したので先頭を読み捨てる
                let skip = if s == StatusCode::PARTIAL_CONTENT { 0 } else { start };
                let (mut body, reached_end) =
                    match read_capped(&mut resp, skip.saturating_add(self.max_chunk_bytes)).await {
                        Ok(read) => read,
                        Err(e) => return LogChunk::failed(location.clone(), transport_error(&e), start),
                    };
                let skip = usize::try_from(skip).unwrap_or(usize::MAX).min(body.len());
                body.drain(..skip);
                if reached_end {
                    LogChunk::complete(location.clone(), body, start)
                } else {
                    LogChunk::truncated(location.clone(), body, start)
                }
            }
            s => LogChunk::failed(
                location.clone(),
                ChunkError::unreachable(format!("{} returned {s}", location.address), false),
                start,
            ),
        }
    }
}

/// Read at most `limit` bytes of the body. Returns (bytes, reached_end).
///
/// 上限ちょうどで止まった場合は次の 1 chunk だけ覗いて終端かどうかを判定する。
async fn read_capped(resp: &mut Response, limit: u64) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let mut buf = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        buf.extend_from_slice(&chunk);
        if buf.len() > limit {
            buf.truncate(limit);
            return Ok((buf, false));
        }
    }
    Ok((buf, true))
}

fn transport_error(e: &reqwest::Error) -> ChunkError {
    if e.is_timeout() {
        ChunkError::unreachable(format!("timed out: {e}"), true)
    } else {
        ChunkError::unreachable(format!("connection failed: {e}"), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FetchErrorKind;
    use httpmock::prelude::*;

    fn backend(timeout_ms: u64) -> RemoteHostBackend {
        RemoteHostBackend::new(Duration::from_millis(timeout_ms), 1024).unwrap()
    }

    fn location(url: String) -> LogLocation {
        LogLocation::new(BackendKind::RemoteHost, url, 1)
    }

    #[tokio::test]
    async fn serves_body_on_200() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/log/wf/t/1.log");
                then.status(200).body("line1\nline2\n");
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/log/wf/t/1.log")), None).await;
        mock.assert_async().await;
        assert!(chunk.is_ok());
        assert!(chunk.is_complete);
        assert_eq!(chunk.text(), "line1\nline2\n");
    }

    #[tokio::test]
    async fn sends_range_for_offsets() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log").header("range", "bytes=6-");
                then.status(206).body("line2\n");
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/1.log")), Some(6)).await;
        mock.assert_async().await;
        assert_eq!(chunk.text(), "line2\n");
        assert_eq!(chunk.offset, 6);
        assert_eq!(chunk.next_offset(), 12);
    }

    #[tokio::test]
    async fn slices_locally_when_range_is_ignored() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(200).body("line1\nline2\n");
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/1.log")), Some(6)).await;
        assert_eq!(chunk.text(), "line2\n");
        assert_eq!(chunk.offset, 6);
    }

    #[tokio::test]
    async fn body_larger_than_cap_is_truncated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/big.log");
                then.status(200).body("x".repeat(100_000));
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/big.log")), None).await;
        assert!(chunk.is_ok());
        assert!(!chunk.is_complete);
        assert_eq!(chunk.content.len(), 1024);
        assert_eq!(chunk.next_offset(), 1024);
    }

    #[tokio::test]
    async fn ignored_range_on_large_body_keeps_the_window() {
        let server = MockServer::start_async().await;
        let body: String = (0..5_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let expected = body.as_bytes()[2_000..3_024].to_vec();
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/big.log");
                then.status(200).body(body.clone());
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/big.log")), Some(2_000)).await;
        assert!(!chunk.is_complete);
        assert_eq!(chunk.offset, 2_000);
        assert_eq!(chunk.content, expected);
    }

    #[tokio::test]
    async fn body_exactly_at_cap_is_complete() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/exact.log");
                then.status(200).body("y".repeat(1024));
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/exact.log")), None).await;
        assert!(chunk.is_complete);
        assert_eq!(chunk.content.len(), 1024);
    }

    #[tokio::test]
    async fn range_past_end_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(416);
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/1.log")), Some(100)).await;
        assert!(chunk.is_ok());
        assert!(chunk.content.is_empty());
        assert_eq!(chunk.next_offset(), 100);
    }

    #[tokio::test]
    async fn not_found_on_404() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(404);
            })
            .await;

        let chunk = backend(2_000).fetch(&location(server.url("/1.log")), None).await;
        assert!(chunk.is_not_found());
    }

    #[tokio::test]
    async fn server_error_is_retryable_unreachable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(503);
            })
            .await;

        let err = backend(2_000)
            .fetch(&location(server.url("/1.log")), None)
            .await
            .error
            .expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn client_error_is_not_retryable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(403);
            })
            .await;

        let err = backend(2_000)
            .fetch(&location(server.url("/1.log")), None)
            .await
            .error
            .expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn slow_host_times_out_as_unreachable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/1.log");
                then.status(200).body("late").delay(Duration::from_millis(500));
            })
            .await;

        let err = backend(50)
            .fetch(&location(server.url("/1.log")), None)
            .await
            .error
            .expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(err.retryable);
        assert!(err.message.starts_with("timed out"));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let err = backend(500)
            .fetch(&location("http://127.0.0.1:1/1.log".to_string()), None)
            .await
            .error
            .expect("error");
        assert_eq!(err.kind, FetchErrorKind::Unreachable);
        assert!(err.retryable);
    }
}
