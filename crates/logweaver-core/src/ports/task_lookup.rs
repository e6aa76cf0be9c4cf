//! TaskLookup port - スケジューラのメタデータストアへの読み取り専用アクセス
//!
//! 本体（DB やタスクインスタンスモデル）は外部のものです。
//! ここでは「存在するか」「どの backend にログがあるか」「最新の try」だけを引きます。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{BackendKind, TaskExecutionRef};

/// What the metadata store knows about one task execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub exists: bool,

    /// Log backends in priority order. Empty means "use the configured order".
    #[serde(default)]
    pub backends: Vec<BackendKind>,

    /// Highest try_number that has started (0 = never ran).
    #[serde(default)]
    pub latest_try: u32,
}

impl TaskRecord {
    pub fn missing() -> Self {
        Self {
            exists: false,
            backends: Vec::new(),
            latest_try: 0,
        }
    }

    pub fn found(backends: Vec<BackendKind>, latest_try: u32) -> Self {
        Self {
            exists: true,
            backends,
            latest_try,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("task lookup did not answer within {0:?}")]
    TimedOut(std::time::Duration),
}

/// Read-only lookup keyed by (workflow_id, task_id, execution_timestamp).
///
/// `try_number` はキーに含めません。
#[async_trait]
pub trait TaskLookup: Send + Sync {
    async fn lookup_task(&self, task: &TaskExecutionRef) -> Result<TaskRecord, LookupError>;
}
