//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{BackendKind, ChunkError, LogChunk, LogLocation};
use crate::ports::LogBackend;

/// Serve `bytes[start..]` of an in-memory log, like a backend with offset support.
pub(crate) fn window(source: &LogLocation, bytes: &[u8], start: u64) -> LogChunk {
    let from = (start as usize).min(bytes.len());
    LogChunk::complete(source.clone(), bytes[from..].to_vec(), start)
}

type Behavior = Box<dyn Fn(&LogLocation, Option<u64>, usize) -> LogChunk + Send + Sync>;

/// LogBackend whose answers are scripted by a closure; counts its calls.
pub(crate) struct ScriptedBackend {
    kind: BackendKind,
    behavior: Behavior,
    delay: Option<Duration>,
    offsets: bool,
    calls: AtomicUsize,
    seen_offsets: Mutex<Vec<Option<u64>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(
        kind: BackendKind,
        behavior: impl Fn(&LogLocation, Option<u64>, usize) -> LogChunk + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            behavior: Box::new(behavior),
            delay: None,
            offsets: true,
            calls: AtomicUsize::new(0),
            seen_offsets: Mutex::new(Vec::new()),
        }
    }

    /// Serves `content` for every try.
    pub(crate) fn serving(kind: BackendKind, content: &str) -> Self {
        let content = content.as_bytes().to_vec();
        Self::new(kind, move |loc, offset, _| {
            window(loc, &content, offset.unwrap_or(0))
        })
    }

    /// Serves per-try content; tries without an entry are NotFound.
    pub(crate) fn serving_tries(kind: BackendKind, contents: &[(u32, &str)]) -> Self {
        let contents: HashMap<u32, Vec<u8>> = contents
            .iter()
            .map(|(t, c)| (*t, c.as_bytes().to_vec()))
            .collect();
        Self::new(kind, move |loc, offset, _| match contents.get(&loc.try_number) {
            Some(content) => {
                window(loc, content, offset.unwrap_or(0))
            }
            None => LogChunk::failed(loc.clone(), ChunkError::not_found("scripted miss"), 0),
        })
    }

    pub(crate) fn failing(kind: BackendKind, error: ChunkError) -> Self {
        Self::new(kind, move |loc, offset, _| {
            LogChunk::failed(loc.clone(), error.clone(), offset.unwrap_or(0))
        })
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn without_offsets(mut self) -> Self {
        self.offsets = false;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn seen_offsets(&self) -> Vec<Option<u64>> {
        self.seen_offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl LogBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn supports_offset(&self) -> bool {
        self.offsets
    }

    async fn fetch(&self, location: &LogLocation, offset: Option<u64>) -> LogChunk {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_offsets.lock().unwrap().push(offset);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.behavior)(location, offset, call)
    }
}
