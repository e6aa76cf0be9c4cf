//! InMemoryTaskLookup - 開発用の TaskLookup
//!
//! 起動時に登録して、以降は読み取りのみ。
//! `with_default` を使うと未登録のタスクにも同じ record を返します（CLI 用）。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::TaskExecutionRef;
use crate::ports::{LookupError, TaskLookup, TaskRecord};

type TaskKey = (String, String, DateTime<Utc>);

#[derive(Debug, Default)]
pub struct InMemoryTaskLookup {
    records: HashMap<TaskKey, TaskRecord>,
    default: Option<TaskRecord>,
}

impl InMemoryTaskLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task (try_number of `task` is ignored).
    pub fn with_task(mut self, task: &TaskExecutionRef, record: TaskRecord) -> Self {
        self.records.insert(key_of(task), record);
        self
    }

    pub fn with_default(mut self, record: TaskRecord) -> Self {
        self.default = Some(record);
        self
    }
}

fn key_of(task: &TaskExecutionRef) -> TaskKey {
    (
        task.workflow_id.clone(),
        task.task_id.clone(),
        task.execution_timestamp,
    )
}

#[async_trait]
impl TaskLookup for InMemoryTaskLookup {
    async fn lookup_task(&self, task: &TaskExecutionRef) -> Result<TaskRecord, LookupError> {
        let record = self
            .records
            .get(&key_of(task))
            .or(self.default.as_ref())
            .cloned()
            .unwrap_or_else(TaskRecord::missing);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendKind;
    use chrono::TimeZone;

    fn task() -> TaskExecutionRef {
        TaskExecutionRef::new("wf", "t", Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn finds_registered_task_regardless_of_try() {
        let lookup = InMemoryTaskLookup::new()
            .with_task(&task(), TaskRecord::found(vec![BackendKind::Local], 2));
        let record = lookup.lookup_task(&task().with_try(1)).await.unwrap();
        assert!(record.exists);
        assert_eq!(record.latest_try, 2);
    }

    #[tokio::test]
    async fn unknown_task_is_missing() {
        let record = InMemoryTaskLookup::new().lookup_task(&task()).await.unwrap();
        assert_eq!(record, TaskRecord::missing());
    }

    #[tokio::test]
    async fn default_record_applies_to_unknown_tasks() {
        let lookup = InMemoryTaskLookup::new().with_default(TaskRecord::found(Vec::new(), 1));
        assert!(lookup.lookup_task(&task()).await.unwrap().exists);
    }
}
