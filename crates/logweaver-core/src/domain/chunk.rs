//! LogChunk: one backend's answer for one try.
//!
//! This module is backend-agnostic: it only defines the "shape" of what an
//! adapter returns, so the aggregator can merge and annotate it.

use std::borrow::Cow;

use super::errors::ChunkError;
use super::location::LogLocation;

/// Content (or the reason there is none) served by one location.
///
/// - `offset`: byte offset the content starts at.
/// - `is_complete`: false when the adapter stopped early (size cap) or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    pub source: LogLocation,
    pub content: Vec<u8>,
    pub is_complete: bool,
    pub error: Option<ChunkError>,
    pub offset: u64,
}

impl LogChunk {
    pub fn complete(source: LogLocation, content: Vec<u8>, offset: u64) -> Self {
        Self {
            source,
            content,
            is_complete: true,
            error: None,
            offset,
        }
    }

    pub fn truncated(source: LogLocation, content: Vec<u8>, offset: u64) -> Self {
        Self {
            source,
            content,
            is_complete: false,
            error: None,
            offset,
        }
    }

    pub fn failed(source: LogLocation, error: ChunkError, offset: u64) -> Self {
        Self {
            source,
            content: Vec::new(),
            is_complete: false,
            error: Some(error),
            offset,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_not_found(&self) -> bool {
        self.error.as_ref().is_some_and(ChunkError::is_not_found)
    }

    /// Offset to pass on the next incremental fetch.
    pub fn next_offset(&self) -> u64 {
        self.offset + self.content.len() as u64
    }

    pub fn try_number(&self) -> u32 {
        self.source.try_number
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Drop the bytes before `offset` from a chunk fetched from the start.
    ///
    /// Used for backends that cannot read from an offset themselves.
    pub fn skip_to(mut self, offset: u64) -> Self {
        if self.error.is_some() || offset <= self.offset {
            return self;
        }
        let skip = ((offset - self.offset) as usize).min(self.content.len());
        self.content.drain(..skip);
        self.offset = offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BackendKind;

    fn loc() -> LogLocation {
        LogLocation::new(BackendKind::Archive, "wf/t/1.log", 1)
    }

    #[test]
    fn skip_to_drops_prefix() {
        let chunk = LogChunk::complete(loc(), b"line1\nline2\n".to_vec(), 0).skip_to(6);
        assert_eq!(chunk.text(), "line2\n");
        assert_eq!(chunk.offset, 6);
        assert_eq!(chunk.next_offset(), 12);
    }

    #[test]
    fn skip_to_leaves_failed_chunks_alone() {
        let failed = LogChunk::failed(loc(), ChunkError::not_found("x"), 0);
        let after = failed.clone().skip_to(4);
        assert_eq!(after, failed);
        assert!(after.is_not_found());
    }
}
