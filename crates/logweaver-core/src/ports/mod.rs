//! Ports - 抽象化レイヤー
//!
//! 外部システム（ワーカーのファイルシステム、ログサーバ、Blob storage、
//! スケジューラのメタデータストア）へのインターフェースです。

pub mod backend;
pub mod blob_store;
pub mod task_lookup;

pub use self::backend::LogBackend;
pub use self::blob_store::{BlobError, BlobRange, BlobStore};
pub use self::task_lookup::{LookupError, TaskLookup, TaskRecord};
