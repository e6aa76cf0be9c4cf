//! LogResult - 1 リクエスト分の集約結果
//!
//! # 状態（overall_status）
//! - complete: 全ての try がエラーなしのチャンクを返した
//! - partial: 一部だけ取得できた、またはリクエストがタイムアウトした
//! - failed: 何も取得できなかった（チャンク 0 件を含む）

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::chunk::LogChunk;
use super::ids::RequestId;
use super::location::BackendKind;
use super::task_ref::TaskExecutionRef;

/// Per-try byte offsets already seen by the caller (try_number -> offset).
pub type KnownOffsets = BTreeMap<u32, u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Complete,
    Partial,
    Failed,
}

impl OverallStatus {
    pub fn from_chunks(chunks: &[LogChunk], timed_out: bool) -> Self {
        let served = chunks.iter().filter(|c| c.is_ok()).count();
        if !chunks.is_empty() && served == chunks.len() && !timed_out {
            OverallStatus::Complete
        } else if served == 0 && !timed_out {
            OverallStatus::Failed
        } else {
            OverallStatus::Partial
        }
    }
}

/// Ordered chunks (ascending try_number) plus the overall status.
#[derive(Debug, Clone, PartialEq)]
pub struct LogResult {
    pub request_id: RequestId,
    pub task: TaskExecutionRef,
    pub chunks: Vec<LogChunk>,
    pub overall_status: OverallStatus,
}

impl LogResult {
    pub fn new(
        request_id: RequestId,
        task: TaskExecutionRef,
        mut chunks: Vec<LogChunk>,
        timed_out: bool,
    ) -> Self {
        // stable: backend priority order within a try is kept
        chunks.sort_by_key(LogChunk::try_number);
        let overall_status = OverallStatus::from_chunks(&chunks, timed_out);
        Self {
            request_id,
            task,
            chunks,
            overall_status,
        }
    }

    /// Offsets to pass to the next incremental fetch.
    pub fn offsets(&self) -> KnownOffsets {
        self.chunks
            .iter()
            .filter(|c| c.is_ok())
            .map(|c| (c.try_number(), c.next_offset()))
            .collect()
    }

    pub fn has_new_content(&self) -> bool {
        self.chunks.iter().any(|c| !c.content.is_empty())
    }

    pub fn view(&self) -> LogResultView {
        LogResultView {
            request_id: self.request_id,
            overall_status: self.overall_status,
            chunks: self.chunks.iter().map(ChunkView::from).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.view())
    }

    /// Plain-text rendering with one header line per try.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for chunk in &self.chunks {
            let source = &chunk.source;
            match &chunk.error {
                None => {
                    let verb = match source.backend_kind {
                        BackendKind::Local => "Reading local file",
                        BackendKind::RemoteHost => "Fetching from",
                        BackendKind::Archive => "Reading archived log",
                    };
                    out.push_str(&format!(
                        "*** try {}: {verb}: {}\n",
                        source.try_number, source.address
                    ));
                    out.push_str(&chunk.text());
                    if !chunk.content.ends_with(b"\n") && !chunk.content.is_empty() {
                        out.push('\n');
                    }
                    if !chunk.is_complete {
                        out.push_str(&format!(
                            "*** try {}: truncated at byte {}\n",
                            source.try_number,
                            chunk.next_offset()
                        ));
                    }
                }
                Some(err) => {
                    out.push_str(&format!(
                        "*** try {}: no log available (last tried {} {}): {err}\n",
                        source.try_number, source.backend_kind, source.address
                    ));
                }
            }
        }
        out
    }
}

/// Serializable form handed to an external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogResultView {
    pub request_id: RequestId,
    pub overall_status: OverallStatus,
    pub chunks: Vec<ChunkView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkView {
    pub try_number: u32,
    pub backend_kind: BackendKind,
    pub address: String,
    pub content: String,
    pub offset: u64,
    pub next_offset: u64,
    pub truncated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&LogChunk> for ChunkView {
    fn from(chunk: &LogChunk) -> Self {
        Self {
            try_number: chunk.try_number(),
            backend_kind: chunk.source.backend_kind,
            address: chunk.source.address.clone(),
            content: chunk.text().into_owned(),
            offset: chunk.offset,
            next_offset: chunk.next_offset(),
            truncated: chunk.is_ok() && !chunk.is_complete,
            error: chunk.error.as_ref().map(ToString::to_string),
        }
    }
}
