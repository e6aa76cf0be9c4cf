//! BackendRegistry - backend 種別から LogBackend 実装へのマッピング
//!
//! 初期化時に登録（mutable）、実行時は読み取りのみ（immutable）。
//! ロック不要でシンプルに保てます。

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::BackendKind;
use crate::ports::LogBackend;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate backend adapter for kind={0}")]
    DuplicateBackend(BackendKind),
}

#[derive(Default)]
pub struct BackendRegistry {
    backends: HashMap<BackendKind, Arc<dyn LogBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Register an adapter under its own `kind()`.
    pub fn register(&mut self, backend: Arc<dyn LogBackend>) -> Result<(), RegistryError> {
        let kind = backend.kind();
        if self.backends.contains_key(&kind) {
            return Err(RegistryError::DuplicateBackend(kind));
        }
        self.backends.insert(kind, backend);
        Ok(())
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Arc<dyn LogBackend>> {
        self.backends.get(&kind)
    }

    pub fn contains(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
