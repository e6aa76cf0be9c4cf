//! Backend kinds and resolved log locations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A storage location class for logs.
///
/// 並び順（Local → RemoteHost → Archive）はフォールスルーの既定の優先度と一致します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Worker-local filesystem.
    Local,
    /// Log-serving endpoint on the worker host.
    RemoteHost,
    /// Durable blob storage for rotated logs.
    Archive,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Local,
        BackendKind::RemoteHost,
        BackendKind::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::RemoteHost => "remote_host",
            BackendKind::Archive => "archive",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where one try's log is expected to live on one backend.
///
/// `address` の意味は backend ごとに異なります（ファイルパス / URL / object key）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogLocation {
    pub backend_kind: BackendKind,
    pub address: String,
    pub try_number: u32,

    /// "latest" alias location (rendered with `try_number = latest`).
    #[serde(default)]
    pub alias: bool,
}

impl LogLocation {
    pub fn new(backend_kind: BackendKind, address: impl Into<String>, try_number: u32) -> Self {
        Self {
            backend_kind,
            address: address.into(),
            try_number,
            alias: false,
        }
    }

    pub fn as_alias(mut self) -> Self {
        self.alias = true;
        self
    }

    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }
}
