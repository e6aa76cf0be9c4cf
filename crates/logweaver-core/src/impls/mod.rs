//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **LocalBackend / RemoteHostBackend / ArchiveBackend**: LogBackend
//! - **FsBlobStore / InMemoryBlobStore**: BlobStore
//! - **InMemoryTaskLookup**: 開発用の TaskLookup
//!
//! スケジューラの DB に繋ぐ TaskLookup は利用側で実装します。

pub mod archive;
pub mod fs_blob;
pub mod inmem_lookup;
pub mod local;
pub mod memory_blob;
pub mod remote;

pub use self::archive::ArchiveBackend;
pub use self::fs_blob::FsBlobStore;
pub use self::inmem_lookup::InMemoryTaskLookup;
pub use self::local::LocalBackend;
pub use self::memory_blob::InMemoryBlobStore;
pub use self::remote::RemoteHostBackend;
