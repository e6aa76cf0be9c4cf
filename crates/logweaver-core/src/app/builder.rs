//! ServiceBuilder - RetrievalService の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 設定された backend 種別 ⊆ 登録済み adapter を build() でチェック

use std::sync::Arc;

use super::aggregator::LogAggregator;
use super::locator::LogLocator;
use super::registry::{BackendRegistry, RegistryError};
use super::retry::RetryPolicy;
use super::service::RetrievalService;
use crate::config::{ConfigError, LogConfig};
use crate::domain::BackendKind;
use crate::impls::{ArchiveBackend, FsBlobStore, LocalBackend, RemoteHostBackend};
use crate::ports::{LogBackend, TaskLookup};

/// # 使用例
/// ```ignore
/// let service = ServiceBuilder::new(LogConfig::load("logweaver.toml")?)
///     .lookup(Arc::new(my_lookup))
///     .with_default_backends()?
///     .build()?;
/// ```
pub struct ServiceBuilder {
    config: LogConfig,
    registry: BackendRegistry,
    lookup: Option<Arc<dyn TaskLookup>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Missing backend adapters: {0:?}. These backends are configured but not registered.")]
    MissingBackends(Vec<BackendKind>),

    #[error("no TaskLookup was provided")]
    MissingLookup,

    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceBuilder {
    pub fn new(config: LogConfig) -> Self {
        Self {
            config,
            registry: BackendRegistry::new(),
            lookup: None,
        }
    }

    pub fn lookup(mut self, lookup: Arc<dyn TaskLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Register an adapter. Each kind may be registered once.
    pub fn register(mut self, backend: Arc<dyn LogBackend>) -> Result<Self, RegistryError> {
        self.registry.register(backend)?;
        Ok(self)
    }

    /// Register the bundled adapter for every configured backend not yet registered.
    ///
    /// - local: `LocalBackend`
    /// - remote_host: `RemoteHostBackend` with the backend's timeout
    /// - archive: `ArchiveBackend` over a `FsBlobStore` rooted at `base`
    pub fn with_default_backends(mut self) -> Result<Self, BuildError> {
        let max = self.config.max_chunk_bytes;
        for backend in self.config.backends.clone() {
            if self.registry.contains(backend.kind) {
                continue;
            }
            let adapter: Arc<dyn LogBackend> = match backend.kind {
                BackendKind::Local => Arc::new(LocalBackend::new(max)),
                BackendKind::RemoteHost => {
                    Arc::new(RemoteHostBackend::new(backend.timeout(), max)?)
                }
                BackendKind::Archive => {
                    Arc::new(ArchiveBackend::new(FsBlobStore::new(&backend.base), max))
                }
            };
            self.registry.register(adapter)?;
        }
        Ok(self)
    }

    /// # 検証
    /// - config の validate（テンプレート、値域、base URL）
    /// - 設定された backend 種別が全て登録されているか
    /// - TaskLookup が設定されているか
    pub fn build(self) -> Result<RetrievalService, BuildError> {
        self.config.validate()?;

        let missing: Vec<BackendKind> = self
            .config
            .backend_kinds()
            .into_iter()
            .filter(|kind| !self.registry.contains(*kind))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingBackends(missing));
        }

        let lookup = self.lookup.ok_or(BuildError::MissingLookup)?;
        let locator = LogLocator::from_config(&self.config)?;
        let retry = RetryPolicy::from(&self.config.retry);
        let aggregator = LogAggregator::new(Arc::new(self.registry), retry);

        Ok(RetrievalService::new(
            Arc::new(self.config),
            locator,
            aggregator,
            lookup,
        ))
    }
}
