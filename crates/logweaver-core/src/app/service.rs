//! RetrievalService - リクエスト側の入口
//!
//! fetch_full / fetch_incremental の 2 操作を提供します。
//! 想定内の失敗（not found / unreachable / timeout）は LogResult に載せて返し、
//! raise するのは不正な入力・タスク不在・lookup 失敗（時間切れを含む）・設定エラーだけです。

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use super::aggregator::{FetchPlan, LogAggregator};
use super::locator::LogLocator;
use crate::config::{ConfigError, LogConfig};
use crate::domain::{
    BackendKind, KnownOffsets, LogResult, MalformedRef, RequestId, TaskExecutionRef,
};
use crate::ports::{LookupError, TaskLookup, TaskRecord};

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("malformed task execution ref: {0}")]
    MalformedRef(#[from] MalformedRef),

    #[error("task not found: workflow_id={workflow_id} task_id={task_id} execution_timestamp={execution_timestamp}")]
    TaskNotFound {
        workflow_id: String,
        task_id: String,
        execution_timestamp: String,
    },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub struct RetrievalService {
    config: Arc<LogConfig>,
    locator: LogLocator,
    aggregator: LogAggregator,
    lookup: Arc<dyn TaskLookup>,
}

impl RetrievalService {
    /// Use `ServiceBuilder` unless the parts are already validated.
    pub fn new(
        config: Arc<LogConfig>,
        locator: LogLocator,
        aggregator: LogAggregator,
        lookup: Arc<dyn TaskLookup>,
    ) -> Self {
        Self {
            config,
            locator,
            aggregator,
            lookup,
        }
    }

    /// Fetch every requested try from the start.
    pub async fn fetch_full(&self, task: &TaskExecutionRef) -> Result<LogResult, RetrievalError> {
        self.fetch(task, KnownOffsets::new()).await
    }

    /// Fetch only bytes past `known_offsets` (per try), for tailing a running task.
    pub async fn fetch_incremental(
        &self,
        task: &TaskExecutionRef,
        known_offsets: &KnownOffsets,
    ) -> Result<LogResult, RetrievalError> {
        self.fetch(task, known_offsets.clone()).await
    }

    async fn fetch(
        &self,
        task: &TaskExecutionRef,
        offsets: KnownOffsets,
    ) -> Result<LogResult, RetrievalError> {
        task.validate()?;
        let request_id = RequestId::new();
        let deadline = Instant::now() + self.config.request_timeout();

        // lookup も request_timeout の内側
        let record = tokio::time::timeout_at(deadline, self.lookup.lookup_task(task))
            .await
            .map_err(|_| {
                warn!(%request_id, workflow_id = %task.workflow_id, "task lookup exceeded the request deadline");
                LookupError::TimedOut(self.config.request_timeout())
            })??;
        if !record.exists {
            info!(%request_id, workflow_id = %task.workflow_id, task_id = %task.task_id, "task not found");
            return Err(RetrievalError::TaskNotFound {
                workflow_id: task.workflow_id.clone(),
                task_id: task.task_id.clone(),
                execution_timestamp: task.timestamp_str(),
            });
        }

        let tries = plan_tries(task, &record);
        let backends = self.backends_for(&record);
        let locations = self.locator.resolve(task, &tries, &backends, record.latest_try)?;
        info!(
            %request_id,
            workflow_id = %task.workflow_id,
            task_id = %task.task_id,
            tries = tries.len(),
            locations = locations.len(),
            incremental = !offsets.is_empty(),
            "fetching task log"
        );

        let plan = FetchPlan { locations, offsets };
        let result = self
            .aggregator
            .aggregate(request_id, task, plan, Some(deadline))
            .await;

        info!(
            %request_id,
            status = ?result.overall_status,
            chunks = result.chunks.len(),
            "task log fetched"
        );
        Ok(result)
    }

    /// The task's own backend list, or the configured order when it has none.
    fn backends_for(&self, record: &TaskRecord) -> Vec<BackendKind> {
        if record.backends.is_empty() {
            self.config.backend_kinds()
        } else {
            record.backends.clone()
        }
    }
}

/// Explicit try ⇒ only that try; otherwise every try up to the latest.
fn plan_tries(task: &TaskExecutionRef, record: &TaskRecord) -> Vec<u32> {
    match task.try_number {
        Some(n) => vec![n],
        None => (1..=record.latest_try).collect(),
    }
}
