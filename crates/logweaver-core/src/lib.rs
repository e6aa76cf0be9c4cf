//! logweaver-core
//!
//! Task log retrieval: find a task execution's log wherever it lives
//! (worker's local disk, the worker's log server, the archive) and merge it
//! into one annotated result.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskExecutionRef, LogLocation, LogChunk, LogResult, errors）
//! - **ports**: 抽象化レイヤー（LogBackend, TaskLookup, BlobStore）
//! - **impls**: 実装（local / remote_host / archive adapter、blob store、開発用 lookup）
//! - **app**: アプリケーションロジック（locator, aggregator, service, tailer, builder）
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

#[cfg(test)]
mod testing;

pub use app::{RetrievalError, RetrievalService, ServiceBuilder, Tailer, viewer_link};
pub use config::{BackendConfig, ConfigError, LogConfig};
pub use domain::{
    BackendKind, ChunkError, FetchErrorKind, KnownOffsets, LogChunk, LogLocation, LogResult,
    OverallStatus, TaskExecutionRef,
};
