//! App - アプリケーション層
//!
//! ports を組み合わせてログ取得のフローを組み立てます。
//!
//! # 主要コンポーネント
//! - **ServiceBuilder**: 設定と adapter のワイヤリング（起動時検証）
//! - **RetrievalService**: fetch_full / fetch_incremental
//! - **LogLocator**: TaskExecutionRef → LogLocation 群
//! - **LogAggregator**: backend 呼び出し、フォールバック、リトライ、マージ
//! - **Tailer**: incremental fetch のポーリングループ
//! - **viewer_link**: "Worker Logs" リンク

pub mod aggregator;
pub mod builder;
pub mod link;
pub mod locator;
pub mod registry;
pub mod retry;
pub mod service;
pub mod tailer;

// 主要な型を再エクスポート
pub use self::aggregator::{FetchPlan, LogAggregator};
pub use self::builder::{BuildError, ServiceBuilder};
pub use self::link::viewer_link;
pub use self::locator::{FilenameTemplate, LogLocator};
pub use self::registry::{BackendRegistry, RegistryError};
pub use self::retry::RetryPolicy;
pub use self::service::{RetrievalError, RetrievalService};
pub use self::tailer::{TailItem, Tailer};
