//! TaskExecutionRef - ログ取得対象の「1 回の実行」を指す参照
//!
//! スケジューラ側が所有するタスクインスタンスを、このクレートは参照として受け取るだけです。
//! 永続化はしません。

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one concrete run of one task.
///
/// `try_number` が `None` の場合は「最新まで全ての try」を意味します。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskExecutionRef {
    pub workflow_id: String,
    pub task_id: String,
    pub execution_timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub try_number: Option<u32>,
}

/// Caller input that cannot name a task execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedRef {
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),

    #[error("invalid {field} `{value}`: must not contain path separators or be a relative component")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("invalid execution_timestamp `{value}`: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("try_number must be >= 1")]
    ZeroTryNumber,
}

impl TaskExecutionRef {
    pub fn new(
        workflow_id: impl Into<String>,
        task_id: impl Into<String>,
        execution_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            task_id: task_id.into(),
            execution_timestamp,
            try_number: None,
        }
    }

    pub fn with_try(mut self, try_number: u32) -> Self {
        self.try_number = Some(try_number);
        self
    }

    /// Build a ref from raw request parameters.
    ///
    /// 欠けている / 空のパラメータはここで弾きます（ページを出す前に 404 相当を返すため）。
    pub fn parse(
        workflow_id: Option<&str>,
        task_id: Option<&str>,
        execution_timestamp: Option<&str>,
        try_number: Option<u32>,
    ) -> Result<Self, MalformedRef> {
        let workflow_id = required("workflow_id", workflow_id)?;
        let task_id = required("task_id", task_id)?;
        let raw_ts = required("execution_timestamp", execution_timestamp)?;
        let execution_timestamp = parse_timestamp(raw_ts)?;

        let task = Self {
            workflow_id: workflow_id.to_string(),
            task_id: task_id.to_string(),
            execution_timestamp,
            try_number,
        };
        task.validate()?;
        Ok(task)
    }

    /// Check the invariants a ref must hold before it is used to derive paths.
    pub fn validate(&self) -> Result<(), MalformedRef> {
        check_identifier("workflow_id", &self.workflow_id)?;
        check_identifier("task_id", &self.task_id)?;
        if self.try_number == Some(0) {
            return Err(MalformedRef::ZeroTryNumber);
        }
        Ok(())
    }

    /// Timestamp as it appears in log paths: `2024-01-01T00:00:00+00:00`.
    pub fn timestamp_str(&self) -> String {
        self.execution_timestamp
            .to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, MalformedRef> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(MalformedRef::Missing(field)),
    }
}

fn check_identifier(field: &'static str, value: &str) -> Result<(), MalformedRef> {
    if value.trim().is_empty() {
        return Err(MalformedRef::Missing(field));
    }
    if value == "." || value == ".." || value.contains('/') || value.contains('\\') {
        return Err(MalformedRef::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, MalformedRef> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    // オフセットなしは UTC として扱う
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| MalformedRef::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}
