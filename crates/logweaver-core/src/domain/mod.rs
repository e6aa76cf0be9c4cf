//! Domain model (refs, locations, chunks, results).
//!
//! I/O を一切含まない層です。ports / impls / app から参照されます。

pub mod chunk;
pub mod errors;
pub mod ids;
pub mod location;
pub mod result;
pub mod task_ref;

pub use self::chunk::LogChunk;
pub use self::errors::{ChunkError, FetchErrorKind};
pub use self::ids::RequestId;
pub use self::location::{BackendKind, LogLocation};
pub use self::result::{ChunkView, KnownOffsets, LogResult, LogResultView, OverallStatus};
pub use self::task_ref::{MalformedRef, TaskExecutionRef};
