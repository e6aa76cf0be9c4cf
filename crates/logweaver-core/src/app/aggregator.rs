//! LogAggregator - location ごとに backend を呼び、try ごとに 1 チャンクへまとめる
//!
//! # 実行モデル
//! - try 同士は独立なので並行に取得する（FuturesUnordered）
//! - 1 つの try の中では backend を優先度順に直列で試す
//!   （local で取れたら remote / archive は呼ばない）
//! - 完了順に関係なく、最後に try_number 順でマージする
//! - deadline を過ぎたら未完了の取得は drop（キャンセル）し、Timeout チャンクで埋める

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::registry::BackendRegistry;
use super::retry::RetryPolicy;
use crate::domain::{
    ChunkError, KnownOffsets, LogChunk, LogLocation, LogResult, RequestId, TaskExecutionRef,
};
use crate::ports::LogBackend;

/// Resolved locations plus the caller's known offsets for one request.
#[derive(Debug, Clone, Default)]
pub struct FetchPlan {
    pub locations: Vec<LogLocation>,
    pub offsets: KnownOffsets,
}

pub struct LogAggregator {
    registry: Arc<BackendRegistry>,
    retry: RetryPolicy,
}

impl LogAggregator {
    pub fn new(registry: Arc<BackendRegistry>, retry: RetryPolicy) -> Self {
        Self { registry, retry }
    }

    pub async fn aggregate(
        &self,
        request_id: RequestId,
        task: &TaskExecutionRef,
        plan: FetchPlan,
        deadline: Option<Instant>,
    ) -> LogResult {
        let groups = group_by_try(request_id, plan.locations);
        if groups.is_empty() {
            return LogResult::new(request_id, task.clone(), Vec::new(), false);
        }

        // Timeout チャンクの source 用に各 try の先頭 location を覚えておく
        let heads: BTreeMap<u32, LogLocation> = groups
            .iter()
            .map(|(try_number, locations)| (*try_number, locations[0].clone()))
            .collect();

        let mut pending = FuturesUnordered::new();
        for (try_number, locations) in groups {
            let offset = plan.offsets.get(&try_number).copied();
            pending.push(async move { (try_number, self.fetch_try(request_id, locations, offset).await) });
        }

        let mut settled: BTreeMap<u32, LogChunk> = BTreeMap::new();
        let mut timed_out = false;
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => pending.next().await,
            };
            match next {
                Some((try_number, chunk)) => {
                    settled.insert(try_number, chunk);
                }
                None => break,
            }
        }
        // 未完了の取得をキャンセル
        drop(pending);

        if timed_out {
            for (try_number, head) in heads {
                if settled.contains_key(&try_number) {
                    continue;
                }
                warn!(%request_id, try_number, "request deadline elapsed before try resolved");
                let offset = plan.offsets.get(&try_number).copied().unwrap_or(0);
                settled.insert(
                    try_number,
                    LogChunk::failed(
                        head,
                        ChunkError::timeout("request deadline elapsed before this try resolved"),
                        offset,
                    ),
                );
            }
        }

        LogResult::new(request_id, task.clone(), settled.into_values().collect(), timed_out)
    }

    /// Fall through the backends of one try; first error-free chunk wins.
    async fn fetch_try(
        &self,
        request_id: RequestId,
        locations: Vec<LogLocation>,
        offset: Option<u64>,
    ) -> LogChunk {
        let mut failure: Option<LogChunk> = None;
        for location in &locations {
            let Some(backend) = self.registry.get(location.backend_kind) else {
                warn!(%request_id, backend = %location.backend_kind, "no adapter registered, skipping");
                continue;
            };

            let chunk = self.fetch_with_retry(request_id, backend, location, offset).await;
            if chunk.is_ok() {
                debug!(
                    %request_id,
                    try_number = location.try_number,
                    backend = %location.backend_kind,
                    bytes = chunk.content.len(),
                    "served"
                );
                return chunk;
            }

            debug!(
                %request_id,
                try_number = location.try_number,
                backend = %location.backend_kind,
                error = ?chunk.error,
                "falling through"
            );
            // NotFound より具体的なエラーを残す
            failure = match failure {
                Some(prev) if !prev.is_not_found() => Some(prev),
                _ => Some(chunk),
            };
        }

        failure.unwrap_or_else(|| {
            LogChunk::failed(
                locations[0].clone(),
                ChunkError::not_found("no adapter registered for any backend of this try"),
                offset.unwrap_or(0),
            )
        })
    }

    async fn fetch_with_retry(
        &self,
        request_id: RequestId,
        backend: &Arc<dyn LogBackend>,
        location: &LogLocation,
        offset: Option<u64>,
    ) -> LogChunk {
        let mut attempts = 1;
        loop {
            let chunk = if backend.supports_offset() {
                backend.fetch(location, offset).await
            } else {
                backend.fetch(location, None).await.skip_to(offset.unwrap_or(0))
            };

            match &chunk.error {
                Some(err) if self.retry.should_retry(attempts, err) => {
                    let delay = self.retry.next_delay(attempts);
                    debug!(
                        %request_id,
                        backend = %location.backend_kind,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying fetch"
                    );
                    tokio::time::sleep(delay).await;
                    attempts += 1;
                }
                _ => return chunk,
            }
        }
    }
}

/// Group by try_number (ascending), keeping location order within a try.
fn group_by_try(request_id: RequestId, locations: Vec<LogLocation>) -> BTreeMap<u32, Vec<LogLocation>> {
    let mut groups: BTreeMap<u32, Vec<LogLocation>> = BTreeMap::new();
    for location in locations {
        if !location.has_address() {
            warn!(
                %request_id,
                try_number = location.try_number,
                backend = %location.backend_kind,
                "template rendered an empty address, skipping location"
            );
            continue;
        }
        groups.entry(location.try_number).or_default().push(location);
    }
    groups
}
